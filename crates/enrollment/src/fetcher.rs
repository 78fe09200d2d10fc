//! Cached course data fetching.
//!
//! `CourseDataFetcher` is the single owner of the in-memory course cache;
//! it is constructed once per process and shared by reference. On a cache
//! miss it fans out to the four terms of the window independently, each
//! degraded to a zero contribution on failure rather than failing the
//! course — the degraded terms are reported back through a side channel so
//! callers can tell "legitimately zero" from "fetch failed".

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use common::{CourseEnrollmentRecord, Error, TermEnrollment};
use dashmap::DashMap;
use futures_util::future::join_all;
use schedule_client::ScheduleClient;
use tracing::{debug, warn};

use crate::aggregate::term_total_enrollment;
use crate::terms::{Term, TermWindow};

/// A cached fetch with its creation time.
///
/// The degraded-term list is cached alongside the record so a cache hit
/// reports the same degradation the original fetch did.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    fetch: CourseFetch,
    created: Instant,
}

impl CacheEntry {
    fn new(fetch: CourseFetch) -> Self {
        Self {
            fetch,
            created: Instant::now(),
        }
    }

    fn is_fresh_at(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.created) < ttl
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.is_fresh_at(Instant::now(), ttl)
    }
}

/// One course fetch: the assembled record plus the terms whose data could
/// not be retrieved (and therefore contributed zero).
#[derive(Debug, Clone)]
pub struct CourseFetch {
    pub record: CourseEnrollmentRecord,
    pub degraded_terms: Vec<Term>,
}

impl CourseFetch {
    /// True when every term degraded — the record carries no real data.
    pub fn fully_degraded(&self) -> bool {
        self.degraded_terms.len() == 4
    }
}

/// Per-term enrollment provider, the seam between the fetcher and the
/// live schedule client.
#[async_trait]
pub trait TermEnrollmentSource: Send + Sync {
    async fn term_enrollment(&self, term: Term, course_id: &str) -> Result<TermEnrollment, Error>;
}

#[async_trait]
impl TermEnrollmentSource for ScheduleClient {
    async fn term_enrollment(&self, term: Term, course_id: &str) -> Result<TermEnrollment, Error> {
        term_total_enrollment(self, term, course_id).await
    }
}

/// Fetches per-course enrollment records with a time-boxed in-memory cache.
pub struct CourseDataFetcher<S = ScheduleClient> {
    client: S,
    cache: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl<S: TermEnrollmentSource> CourseDataFetcher<S> {
    pub fn new(client: S, ttl: Duration) -> Self {
        Self {
            client,
            cache: DashMap::new(),
            ttl,
        }
    }

    /// Enrollment record for a course.
    ///
    /// A live cache entry is returned without any network activity. On a
    /// miss, the four term aggregations run concurrently with per-term
    /// failure isolation; this never fails for the course as a whole.
    pub async fn fetch_course_data(&self, course_id: &str) -> CourseFetch {
        if let Some(entry) = self.cache.get(course_id) {
            if entry.is_fresh(self.ttl) {
                debug!("Cache hit for {}", course_id);
                return entry.fetch.clone();
            }
        }

        let window = TermWindow::resolve(Utc::now());
        let fetches = window.terms().map(|term| async move {
            (term, self.client.term_enrollment(term, course_id).await)
        });
        let results = join_all(fetches).await;

        let mut totals = [0u32; 4];
        let mut degraded = Vec::new();
        for (slot, (term, result)) in totals.iter_mut().zip(results) {
            match result {
                Ok(enrollment) => *slot = enrollment.actual,
                Err(e) => {
                    warn!("Term {} failed for {}: {}", term, course_id, e);
                    degraded.push(term);
                }
            }
        }

        let record = CourseEnrollmentRecord {
            current_enrollment: totals[0],
            past_enrollment: totals[1],
            one_year_back_enrollment: totals[2],
            one_year_one_sem_back_enrollment: totals[3],
        };

        let fetch = CourseFetch {
            record,
            degraded_terms: degraded,
        };

        // A record with no real data would otherwise mask the failure for a
        // full TTL; leave it uncached so the next request retries.
        if !fetch.fully_degraded() {
            self.cache
                .insert(course_id.to_string(), CacheEntry::new(fetch.clone()));
        }

        fetch
    }

    /// Drop every cached record.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

/// Source of course enrollment data, the seam between the bulk prefetcher
/// and the live fetcher.
#[async_trait]
pub trait CourseSource: Send + Sync {
    async fn course_enrollment(&self, course_id: &str) -> Result<CourseFetch, Error>;
}

#[async_trait]
impl<S: TermEnrollmentSource> CourseSource for CourseDataFetcher<S> {
    async fn course_enrollment(&self, course_id: &str) -> Result<CourseFetch, Error> {
        let fetch = self.fetch_course_data(course_id).await;
        if fetch.fully_degraded() {
            return Err(Error::Other(format!(
                "no term data retrievable for {course_id}"
            )));
        }
        Ok(fetch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubTerms {
        values: HashMap<String, u32>,
        failing: Option<Term>,
        calls: AtomicUsize,
    }

    impl StubTerms {
        fn new(terms: &[Term; 4], failing: Option<Term>) -> Self {
            // Distinct actuals per window slot: 10, 20, 30, 40.
            let values = terms
                .iter()
                .enumerate()
                .map(|(i, term)| (term.to_string(), (i as u32 + 1) * 10))
                .collect();
            Self {
                values,
                failing,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TermEnrollmentSource for StubTerms {
        async fn term_enrollment(
            &self,
            term: Term,
            _course_id: &str,
        ) -> Result<TermEnrollment, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing == Some(term) {
                return Err(Error::Http("seating proxy down".to_string()));
            }
            let actual = self.values[&term.to_string()];
            Ok(TermEnrollment {
                actual,
                maximum: actual,
            })
        }
    }

    fn window_terms() -> [Term; 4] {
        TermWindow::resolve(Utc::now()).terms()
    }

    #[tokio::test]
    async fn test_terms_fill_their_window_slots() {
        let fetcher = CourseDataFetcher::new(
            StubTerms::new(&window_terms(), None),
            Duration::from_secs(3600),
        );

        let fetch = fetcher.fetch_course_data("CS 1301").await;
        assert!(fetch.degraded_terms.is_empty());
        assert_eq!(fetch.record.current_enrollment, 10);
        assert_eq!(fetch.record.past_enrollment, 20);
        assert_eq!(fetch.record.one_year_back_enrollment, 30);
        assert_eq!(fetch.record.one_year_one_sem_back_enrollment, 40);
    }

    #[tokio::test]
    async fn test_fresh_entry_answers_without_term_fetches() {
        let fetcher = CourseDataFetcher::new(
            StubTerms::new(&window_terms(), None),
            Duration::from_secs(3600),
        );

        let first = fetcher.fetch_course_data("CS 1301").await;
        assert_eq!(fetcher.client.calls(), 4);

        let second = fetcher.fetch_course_data("CS 1301").await;
        assert_eq!(fetcher.client.calls(), 4);
        assert_eq!(second.record, first.record);
    }

    #[tokio::test]
    async fn test_expired_entry_refetches_all_terms() {
        let fetcher =
            CourseDataFetcher::new(StubTerms::new(&window_terms(), None), Duration::ZERO);

        fetcher.fetch_course_data("CS 1301").await;
        fetcher.fetch_course_data("CS 1301").await;
        assert_eq!(fetcher.client.calls(), 8);
    }

    #[tokio::test]
    async fn test_degraded_term_zeroes_its_slot_only() {
        let terms = window_terms();
        let fetcher = CourseDataFetcher::new(
            StubTerms::new(&terms, Some(terms[1])),
            Duration::from_secs(3600),
        );

        let fetch = fetcher.fetch_course_data("CS 1301").await;
        assert_eq!(fetch.degraded_terms, vec![terms[1]]);
        assert_eq!(fetch.record.past_enrollment, 0);
        assert_eq!(fetch.record.current_enrollment, 10);
        assert_eq!(fetch.record.one_year_back_enrollment, 30);
    }

    #[tokio::test]
    async fn test_cache_hit_keeps_reporting_degraded_terms() {
        let terms = window_terms();
        let fetcher = CourseDataFetcher::new(
            StubTerms::new(&terms, Some(terms[2])),
            Duration::from_secs(3600),
        );

        fetcher.fetch_course_data("CS 1301").await;
        let hit = fetcher.fetch_course_data("CS 1301").await;

        assert_eq!(fetcher.client.calls(), 4);
        // Zeroed-by-failure must stay distinguishable from real zeros for
        // the whole life of the cached entry.
        assert_eq!(hit.degraded_terms, vec![terms[2]]);
    }

    #[test]
    fn test_entry_fresh_just_under_ttl_and_stale_just_over() {
        let entry = CacheEntry::new(empty_fetch());
        let ttl = Duration::from_secs(60 * 60);

        let at_59m = entry.created + Duration::from_secs(59 * 60);
        let at_61m = entry.created + Duration::from_secs(61 * 60);

        assert!(entry.is_fresh_at(at_59m, ttl));
        assert!(!entry.is_fresh_at(at_61m, ttl));
    }

    #[test]
    fn test_entry_stale_exactly_at_ttl() {
        let entry = CacheEntry::new(empty_fetch());
        let ttl = Duration::from_secs(3600);
        assert!(!entry.is_fresh_at(entry.created + ttl, ttl));
    }

    #[test]
    fn test_fully_degraded_requires_all_four_terms() {
        let mut fetch = empty_fetch();
        assert!(!fetch.fully_degraded());

        let term = Term {
            year: 2026,
            semester: crate::terms::Semester::Fall,
        };
        fetch.degraded_terms = vec![term; 3];
        assert!(!fetch.fully_degraded());

        fetch.degraded_terms = vec![term; 4];
        assert!(fetch.fully_degraded());
    }

    fn empty_fetch() -> CourseFetch {
        CourseFetch {
            record: CourseEnrollmentRecord::default(),
            degraded_terms: Vec::new(),
        }
    }
}
