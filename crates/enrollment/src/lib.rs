//! Enrollment domain logic: term resolution, per-term aggregation, the
//! cached course data fetcher, bulk prefetching, and snapshot persistence.

pub mod aggregate;
pub mod fetcher;
pub mod prefetch;
pub mod snapshot;
pub mod terms;

pub use fetcher::{CourseDataFetcher, CourseFetch, CourseSource, TermEnrollmentSource};
pub use prefetch::{BulkPrefetcher, PrefetchOutcome, PrefetchProgress, Strategy};
pub use snapshot::SnapshotStore;
pub use terms::{Semester, Term, TermWindow};
