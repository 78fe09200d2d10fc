//! In-flight request deduplication.
//!
//! At most one network operation per key is active at any instant.
//! Callers that arrive while a fetch for the same key is pending await the
//! same shared future instead of issuing a second call. The registration is
//! removed the moment the operation settles — success or failure — so a
//! later call for the same key starts a fresh generation. This is not a
//! cache: it only collapses redundant *concurrent* calls.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use common::Error;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;

type InFlight = Shared<BoxFuture<'static, Result<Arc<Value>, Arc<Error>>>>;
type Registry = Arc<Mutex<HashMap<String, InFlight>>>;

/// Registry of pending fetches keyed by logical request identity.
#[derive(Default)]
pub struct RequestDeduper {
    in_flight: Registry,
}

impl RequestDeduper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `producer` under `key`, or join the pending run for that key.
    ///
    /// Every caller observing the same generation receives the same value
    /// (behind an `Arc`) or the same failure.
    pub async fn run<F, Fut>(&self, key: &str, producer: F) -> Result<Arc<Value>, Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, Error>> + Send + 'static,
    {
        let pending = {
            let mut map = lock_registry(&self.in_flight);
            if let Some(existing) = map.get(key) {
                existing.clone()
            } else {
                let registry = Arc::clone(&self.in_flight);
                let owned_key = key.to_string();
                let work = producer();

                let fut: InFlight = async move {
                    let result = work.await.map(Arc::new).map_err(Arc::new);
                    // Deregister before any waiter observes the outcome.
                    lock_registry(&registry).remove(&owned_key);
                    result
                }
                .boxed()
                .shared();

                map.insert(key.to_string(), fut.clone());
                fut
            }
        };

        pending.await.map_err(|e| Error::Shared(e.to_string()))
    }

    /// Number of fetches currently pending.
    pub fn pending(&self) -> usize {
        lock_registry(&self.in_flight).len()
    }
}

fn lock_registry(registry: &Registry) -> MutexGuard<'_, HashMap<String, InFlight>> {
    registry.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_concurrent_callers_share_one_producer_run() {
        let deduper = RequestDeduper::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let producer = |calls: Arc<AtomicUsize>| {
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                // Yield so the other callers can observe the pending entry.
                tokio::task::yield_now().await;
                Ok(json!({"courses": {}}))
            }
        };

        let f1 = deduper.run("term-doc-202608", producer(calls.clone()));
        let f2 = deduper.run("term-doc-202608", producer(calls.clone()));
        let f3 = deduper.run("term-doc-202608", producer(calls.clone()));

        let (r1, r2, r3) = tokio::join!(f1, f2, f3);
        let (v1, v2, v3) = (
            r1.expect("first caller succeeds"),
            r2.expect("second caller succeeds"),
            r3.expect("third caller succeeds"),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&v1, &v2));
        assert!(Arc::ptr_eq(&v2, &v3));
        assert_eq!(deduper.pending(), 0);
    }

    #[tokio::test]
    async fn test_sequential_calls_are_separate_generations() {
        let deduper = RequestDeduper::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let calls = calls.clone();
            deduper
                .run("term-doc-202602", move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(json!({}))
                })
                .await
                .expect("fetch succeeds");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_clears_registration_and_reaches_all_waiters() {
        let deduper = RequestDeduper::new();

        let failing = || async move {
            tokio::task::yield_now().await;
            Err(Error::Upstream {
                status: 503,
                message: "unavailable".into(),
            })
        };

        let f1 = deduper.run("term-doc-202508", failing);
        let f2 = deduper.run("term-doc-202508", failing);
        let (r1, r2) = tokio::join!(f1, f2);

        assert!(r1.is_err());
        assert!(r2.is_err());
        assert_eq!(deduper.pending(), 0);

        // A retry after settlement runs a new producer.
        let retry = deduper
            .run("term-doc-202508", || async move { Ok(json!(1)) })
            .await;
        assert!(retry.is_ok());
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_share() {
        let deduper = RequestDeduper::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let mk = |calls: Arc<AtomicUsize>| {
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                Ok(json!({}))
            }
        };

        let f1 = deduper.run("term-doc-202608", mk(calls.clone()));
        let f2 = deduper.run("term-doc-202602", mk(calls.clone()));
        let (r1, r2) = tokio::join!(f1, f2);

        assert!(r1.is_ok() && r2.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
