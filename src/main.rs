//! seat-tracker: course enrollment prefetcher for the scheduling API.
//!
//! Startup orchestration: load the persisted snapshot, work out which
//! catalog courses it is missing, prefetch only those, merge, save, and
//! report the courses that are still absent. A single-course mode is
//! available for spot checks.

mod config;

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info, warn};

use common::config::TrackerConfig;
use enrollment::{
    BulkPrefetcher, CourseDataFetcher, PrefetchProgress, SnapshotStore, Strategy,
};
use schedule_client::ScheduleClient;

/// Course enrollment prefetcher.
#[derive(Parser)]
#[command(name = "seat-tracker", about = "Course enrollment prefetcher for the scheduler API")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Prefetch enrollment data for every catalog course missing from the snapshot.
    Prefetch {
        /// Fetch one course at a time instead of all at once.
        #[arg(long)]
        sequential: bool,

        /// Course catalog path (JSON object keyed by course id).
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Snapshot output path.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Ignore any existing snapshot and refetch everything.
        #[arg(long)]
        force: bool,
    },

    /// Fetch and print enrollment data for a single course.
    Course {
        /// Course id, e.g. "CS 1301".
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "seat_tracker=info,schedule_client=info,enrollment=info".into()
            }),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    let cfg = match config::load_config() {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let client = ScheduleClient::new(&cfg.endpoints, &cfg.fetch);
    let fetcher = Arc::new(CourseDataFetcher::new(
        client,
        Duration::from_secs(cfg.timing.course_ttl_secs),
    ));

    match cli.command {
        Command::Prefetch {
            sequential,
            catalog,
            out,
            force,
        } => run_prefetch(&cfg, fetcher, sequential, catalog, out, force).await,
        Command::Course { id } => run_course(fetcher, &id).await,
    }
}

async fn run_prefetch(
    cfg: &TrackerConfig,
    fetcher: Arc<CourseDataFetcher>,
    sequential: bool,
    catalog: Option<PathBuf>,
    out: Option<PathBuf>,
    force: bool,
) -> Result<()> {
    let catalog_path = catalog.unwrap_or_else(|| PathBuf::from(&cfg.paths.catalog));
    let snapshot_path = out.unwrap_or_else(|| PathBuf::from(&cfg.paths.snapshot));

    let catalog_ids = read_catalog(&catalog_path)?;
    info!(
        "Catalog: {} courses from {}",
        catalog_ids.len(),
        catalog_path.display()
    );

    let store = SnapshotStore::new(
        snapshot_path.clone(),
        Duration::from_secs(cfg.timing.snapshot_ttl_secs),
    );

    let existing = if force { None } else { store.load() };
    if let Some(ref snapshot) = existing {
        info!(
            "Loaded snapshot of {} courses from {}",
            snapshot.courses.len(),
            snapshot_path.display()
        );
    }

    let missing: Vec<String> = catalog_ids
        .iter()
        .filter(|id| {
            existing
                .as_ref()
                .map(|s| !s.courses.contains_key(*id))
                .unwrap_or(true)
        })
        .cloned()
        .collect();

    if missing.is_empty() {
        info!("Snapshot already covers the whole catalog; nothing to fetch");
        return Ok(());
    }

    let strategy = if sequential || !cfg.fetch.parallel {
        Strategy::Sequential
    } else {
        Strategy::Parallel
    };
    info!("Prefetching {} courses ({:?})", missing.len(), strategy);

    let pb = ProgressBar::new(missing.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );
    let pb_cb = pb.clone();
    let on_progress = move |p: PrefetchProgress| {
        pb_cb.set_position(p.completed as u64);
    };

    let prefetcher = BulkPrefetcher::new(fetcher, strategy);
    let outcome = prefetcher.prefetch_all(&missing, Some(&on_progress)).await;
    pb.finish_and_clear();

    if !outcome.failed.is_empty() {
        warn!(
            "{} course(s) could not be fetched: {}",
            outcome.failed.len(),
            outcome.failed.join(", ")
        );
    }

    let merged = match existing {
        Some(snapshot) => SnapshotStore::merge(&snapshot, &outcome.snapshot),
        None => outcome.snapshot,
    };
    store.save(&merged).context("failed to save snapshot")?;

    let absent: Vec<&String> = catalog_ids
        .iter()
        .filter(|id| !merged.courses.contains_key(*id))
        .collect();
    if absent.is_empty() {
        info!("Snapshot now covers all {} catalog courses", catalog_ids.len());
    } else {
        warn!(
            "{} catalog course(s) still absent from the snapshot",
            absent.len()
        );
    }

    Ok(())
}

async fn run_course(fetcher: Arc<CourseDataFetcher>, course_id: &str) -> Result<()> {
    let fetch = fetcher.fetch_course_data(course_id).await;

    if !fetch.degraded_terms.is_empty() {
        let terms: Vec<String> = fetch
            .degraded_terms
            .iter()
            .map(|t| t.to_string())
            .collect();
        warn!(
            "No data retrieved for term(s) {}; those fields read 0",
            terms.join(", ")
        );
    }

    println!("{}", serde_json::to_string_pretty(&fetch.record)?);
    Ok(())
}

/// Course ids from a catalog file: a JSON object keyed by course id, or a
/// plain array of ids.
fn read_catalog(path: &std::path::Path) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog {}", path.display()))?;
    let doc: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("catalog {} is not valid JSON", path.display()))?;

    let ids: BTreeSet<String> = match doc {
        serde_json::Value::Object(map) => map.keys().cloned().collect(),
        serde_json::Value::Array(items) => items
            .into_iter()
            .filter_map(|v| v.as_str().map(|s| s.to_string()))
            .collect(),
        _ => {
            anyhow::bail!(
                "catalog {} must be a JSON object keyed by course id or an array of ids",
                path.display()
            );
        }
    };

    Ok(ids.into_iter().collect())
}
