//! Configuration loader — merges config.toml with environment overrides.

use common::config::TrackerConfig;
use common::Error;
use std::path::Path;

pub fn load_config() -> Result<TrackerConfig, Error> {
    let path =
        std::env::var("SEAT_TRACKER_CONFIG").unwrap_or_else(|_| "config.toml".to_string());

    let mut cfg = if Path::new(&path).is_file() {
        let raw = std::fs::read_to_string(&path)?;
        toml::from_str(&raw).map_err(|e| Error::Config(format!("{path}: {e}")))?
    } else {
        TrackerConfig::default()
    };

    apply_env_overrides(&mut cfg)?;
    validate_config(&cfg)?;
    Ok(cfg)
}

fn apply_env_overrides(cfg: &mut TrackerConfig) -> Result<(), Error> {
    if let Ok(raw) = std::env::var("SEAT_TRACKER_TERM_JSON_BASE") {
        cfg.endpoints.term_json_base = raw.trim().to_string();
    }
    if let Ok(raw) = std::env::var("SEAT_TRACKER_SEATING_PROXY_BASE") {
        cfg.endpoints.seating_proxy_base = raw.trim().to_string();
    }
    if let Ok(raw) = std::env::var("SEAT_TRACKER_PARALLEL") {
        cfg.fetch.parallel = parse_bool(&raw);
    }
    if let Ok(raw) = std::env::var("SEAT_TRACKER_READS_PER_SEC") {
        cfg.fetch.reads_per_sec = parse_positive_u32(&raw, "SEAT_TRACKER_READS_PER_SEC")?;
    }
    if let Ok(raw) = std::env::var("SEAT_TRACKER_COURSE_TTL_SECS") {
        cfg.timing.course_ttl_secs = parse_positive_u64(&raw, "SEAT_TRACKER_COURSE_TTL_SECS")?;
    }
    if let Ok(raw) = std::env::var("SEAT_TRACKER_SNAPSHOT_TTL_SECS") {
        cfg.timing.snapshot_ttl_secs =
            parse_positive_u64(&raw, "SEAT_TRACKER_SNAPSHOT_TTL_SECS")?;
    }
    if let Ok(raw) = std::env::var("SEAT_TRACKER_CATALOG") {
        cfg.paths.catalog = raw.trim().to_string();
    }
    if let Ok(raw) = std::env::var("SEAT_TRACKER_SNAPSHOT") {
        cfg.paths.snapshot = raw.trim().to_string();
    }
    Ok(())
}

fn parse_bool(raw: &str) -> bool {
    let lowered = raw.trim().to_ascii_lowercase();
    lowered != "0" && lowered != "false" && lowered != "no" && lowered != "off"
}

fn parse_positive_u32(raw: &str, env_name: &str) -> Result<u32, Error> {
    let parsed = raw
        .trim()
        .parse::<u32>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer > 0")))?;
    if parsed == 0 {
        return Err(Error::Config(format!("{env_name} must be an integer > 0")));
    }
    Ok(parsed)
}

fn parse_positive_u64(raw: &str, env_name: &str) -> Result<u64, Error> {
    let parsed = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer > 0")))?;
    if parsed == 0 {
        return Err(Error::Config(format!("{env_name} must be an integer > 0")));
    }
    Ok(parsed)
}

fn validate_config(cfg: &TrackerConfig) -> Result<(), Error> {
    let mut issues: Vec<String> = Vec::new();

    if !cfg.endpoints.term_json_base.starts_with("http") {
        issues.push("endpoints.term_json_base must be an http(s) URL".into());
    }
    if !cfg.endpoints.seating_proxy_base.starts_with("http") {
        issues.push("endpoints.seating_proxy_base must be an http(s) URL".into());
    }
    if cfg.timing.course_ttl_secs == 0 {
        issues.push("timing.course_ttl_secs must be > 0".into());
    }
    if cfg.timing.snapshot_ttl_secs == 0 {
        issues.push("timing.snapshot_ttl_secs must be > 0".into());
    }
    if cfg.fetch.reads_per_sec == 0 {
        issues.push("fetch.reads_per_sec must be > 0".into());
    }
    if cfg.fetch.request_timeout_secs == 0 {
        issues.push("fetch.request_timeout_secs must be > 0".into());
    }
    if cfg.paths.catalog.trim().is_empty() {
        issues.push("paths.catalog must not be empty".into());
    }
    if cfg.paths.snapshot.trim().is_empty() {
        issues.push("paths.snapshot must not be empty".into());
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(issues.join("; ")))
    }
}
