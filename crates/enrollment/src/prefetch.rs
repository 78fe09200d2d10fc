//! Bulk prefetching across the course catalog.
//!
//! Drives a `CourseSource` over an arbitrary list of course ids, reporting
//! incremental progress and tolerating individual failures. Two strategies:
//! parallel (everything at once, progress in settlement order, higher peak
//! load on the upstream) and sequential (one at a time, deterministic
//! progress, gentler on the upstream).

use std::collections::HashMap;
use std::sync::Arc;

use common::{CourseEnrollmentRecord, Error, PrefetchedSnapshot};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::fetcher::{CourseFetch, CourseSource};

/// Completed-course count out of a target total for one prefetch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefetchProgress {
    pub completed: usize,
    pub total: usize,
}

impl PrefetchProgress {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.completed as f64 * 100.0 / self.total as f64
        }
    }
}

/// Progress callback invoked after every course, success or failure.
pub type ProgressFn = dyn Fn(PrefetchProgress) + Send + Sync;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Parallel,
    Sequential,
}

/// Result of one prefetch run. The snapshot contains only the courses that
/// succeeded; `failed` lists the rest — absence is never conflated with
/// zero enrollment.
#[derive(Debug)]
pub struct PrefetchOutcome {
    pub snapshot: PrefetchedSnapshot,
    pub failed: Vec<String>,
}

/// Batch driver over a course source.
pub struct BulkPrefetcher<S: CourseSource + 'static> {
    source: Arc<S>,
    strategy: Strategy,
}

impl<S: CourseSource + 'static> BulkPrefetcher<S> {
    pub fn new(source: Arc<S>, strategy: Strategy) -> Self {
        Self { source, strategy }
    }

    /// Fetch every course in the list, never aborting on a single failure.
    ///
    /// The callback sees a strictly increasing completed count, reaching
    /// `course_ids.len()` exactly once at the end.
    pub async fn prefetch_all(
        &self,
        course_ids: &[String],
        on_progress: Option<&ProgressFn>,
    ) -> PrefetchOutcome {
        let outcome = match self.strategy {
            Strategy::Sequential => self.run_sequential(course_ids, on_progress).await,
            Strategy::Parallel => self.run_parallel(course_ids, on_progress).await,
        };

        info!(
            "Prefetched {} courses ({} ok, {} failed)",
            course_ids.len(),
            outcome.snapshot.courses.len(),
            outcome.failed.len()
        );
        outcome
    }

    async fn run_sequential(
        &self,
        course_ids: &[String],
        on_progress: Option<&ProgressFn>,
    ) -> PrefetchOutcome {
        let total = course_ids.len();
        let mut courses = HashMap::new();
        let mut failed = Vec::new();

        for (done, course_id) in course_ids.iter().enumerate() {
            match self.source.course_enrollment(course_id).await {
                Ok(fetch) => record_success(&mut courses, course_id, fetch),
                Err(e) => {
                    warn!("Prefetch failed for {}: {}", course_id, e);
                    failed.push(course_id.clone());
                }
            }

            if let Some(cb) = on_progress {
                cb(PrefetchProgress {
                    completed: done + 1,
                    total,
                });
            }
        }

        PrefetchOutcome {
            snapshot: PrefetchedSnapshot::new(courses),
            failed,
        }
    }

    async fn run_parallel(
        &self,
        course_ids: &[String],
        on_progress: Option<&ProgressFn>,
    ) -> PrefetchOutcome {
        let total = course_ids.len();
        let (tx, mut rx) = mpsc::channel::<(String, Result<CourseFetch, Error>)>(16.max(total));

        for course_id in course_ids {
            let source = Arc::clone(&self.source);
            let tx = tx.clone();
            let course_id = course_id.clone();
            tokio::spawn(async move {
                let result = source.course_enrollment(&course_id).await;
                let _ = tx.send((course_id, result)).await;
            });
        }
        // Close our copy so the receiver drains once every task finishes.
        drop(tx);

        let mut courses = HashMap::new();
        let mut failed = Vec::new();
        let mut completed = 0usize;

        while let Some((course_id, result)) = rx.recv().await {
            match result {
                Ok(fetch) => record_success(&mut courses, &course_id, fetch),
                Err(e) => {
                    warn!("Prefetch failed for {}: {}", course_id, e);
                    failed.push(course_id);
                }
            }

            completed += 1;
            if let Some(cb) = on_progress {
                cb(PrefetchProgress { completed, total });
            }
        }

        PrefetchOutcome {
            snapshot: PrefetchedSnapshot::new(courses),
            failed,
        }
    }
}

fn record_success(
    courses: &mut HashMap<String, CourseEnrollmentRecord>,
    course_id: &str,
    fetch: CourseFetch,
) {
    if !fetch.degraded_terms.is_empty() {
        warn!(
            "Course {} fetched with {} degraded term(s)",
            course_id,
            fetch.degraded_terms.len()
        );
    }
    courses.insert(course_id.to_string(), fetch.record);
}
