//! HTTP client for the course scheduling API.
//!
//! Covers the two upstream resources: the bulk per-term JSON document
//! (one fetch shared across every course lookup in that term) and the
//! seating proxy that serves per-section enrollment figures as an HTML
//! fragment. All reads are rate-limited; the term document additionally
//! goes through an in-flight request deduplicator.

pub mod dedup;
pub mod rate_limit;
pub mod seating;
pub mod sections;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use common::config::{EndpointConfig, FetchConfig};
use common::Error;
use serde_json::Value;
use tracing::debug;

use crate::dedup::RequestDeduper;
use crate::rate_limit::ReadLimiter;

/// Async client for the scheduling endpoints with connection pooling.
pub struct ScheduleClient {
    client: reqwest::Client,
    term_json_base: String,
    seating_proxy_base: String,
    limiter: ReadLimiter,
    deduper: RequestDeduper,
}

impl ScheduleClient {
    pub fn new(endpoints: &EndpointConfig, fetch: &FetchConfig) -> Self {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .tcp_keepalive(Duration::from_secs(30))
            .timeout(Duration::from_secs(fetch.request_timeout_secs))
            .build()
            .expect("failed to build schedule HTTP client");

        Self {
            client,
            term_json_base: endpoints.term_json_base.trim_end_matches('/').to_string(),
            seating_proxy_base: endpoints.seating_proxy_base.trim_end_matches('/').to_string(),
            limiter: ReadLimiter::new(fetch.reads_per_sec),
            deduper: RequestDeduper::new(),
        }
    }

    /// Fetch the bulk JSON document for a term.
    ///
    /// Concurrent callers for the same term share one network call; the
    /// parsed document is handed out behind an `Arc` so every course lookup
    /// in that term reads the same copy.
    pub async fn fetch_term_document(&self, term: &str) -> Result<Arc<Value>, Error> {
        let url = format!("{}/{}.json", self.term_json_base, term);
        let key = format!("term-doc-{term}");
        let client = self.client.clone();
        let limiter = self.limiter.clone();

        self.deduper
            .run(&key, move || async move {
                limiter.acquire().await;
                debug!("Fetching term document: {}", url);

                let resp = client
                    .get(&url)
                    .send()
                    .await
                    .map_err(|e| Error::Http(e.to_string()))?;

                let status = resp.status().as_u16();
                if status != 200 {
                    let body = resp.text().await.unwrap_or_default();
                    return Err(Error::Upstream {
                        status,
                        message: truncate_body(&body),
                    });
                }

                resp.json::<Value>()
                    .await
                    .map_err(|e| Error::Http(e.to_string()))
            })
            .await
    }

    /// CRNs of the offered sections of a course in a term, keyed by section
    /// label. Empty when the course does not appear in the term document.
    pub async fn section_crns(
        &self,
        term: &str,
        course_id: &str,
    ) -> Result<BTreeMap<String, String>, Error> {
        let doc = self.fetch_term_document(term).await?;
        sections::section_crns(&doc, course_id)
    }

    /// Seating figures for one section, as the label/value pairs rendered by
    /// the proxy. Callers validate which labels are present.
    pub async fn fetch_section_seating(
        &self,
        term: &str,
        crn: &str,
    ) -> Result<HashMap<String, String>, Error> {
        self.limiter.acquire().await;

        let url = format!(
            "{}/proxy/class_section?term={}&crn={}",
            self.seating_proxy_base, term, crn
        );
        debug!("Fetching seating info: {}", url);

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Upstream {
                status,
                message: truncate_body(&body),
            });
        }

        let html = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;
        seating::parse_seating_spans(&html)
    }
}

fn truncate_body(body: &str) -> String {
    body.chars().take(500).collect()
}
