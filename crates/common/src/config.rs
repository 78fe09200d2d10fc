//! Tracker configuration types.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Upstream endpoints.
    #[serde(default)]
    pub endpoints: EndpointConfig,

    /// Cache lifetimes (seconds).
    #[serde(default)]
    pub timing: TimingConfig,

    /// Fetch behavior.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// File locations.
    #[serde(default)]
    pub paths: PathConfig,
}

/// Base URLs for the two upstream services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Base URL serving the bulk per-term JSON documents (`{base}/{term}.json`).
    #[serde(default = "default_term_json_base")]
    pub term_json_base: String,

    /// Base URL of the seating proxy (`{base}/proxy/class_section?term=&crn=`).
    #[serde(default = "default_seating_proxy_base")]
    pub seating_proxy_base: String,
}

/// Cache TTLs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// In-memory per-course cache lifetime.
    #[serde(default = "default_course_ttl")]
    pub course_ttl_secs: u64,

    /// Persisted snapshot lifetime.
    #[serde(default = "default_snapshot_ttl")]
    pub snapshot_ttl_secs: u64,
}

/// Fetch strategy and pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Prefetch all courses concurrently (true) or one at a time (false).
    #[serde(default = "default_true")]
    pub parallel: bool,

    /// Read requests per second against the upstream API.
    #[serde(default = "default_reads_per_sec")]
    pub reads_per_sec: u32,

    /// Per-request timeout.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Catalog and snapshot locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathConfig {
    /// Course catalog: a JSON object keyed by course id.
    #[serde(default = "default_catalog_path")]
    pub catalog: String,

    /// Persisted snapshot file.
    #[serde(default = "default_snapshot_path")]
    pub snapshot: String,
}

fn default_term_json_base() -> String {
    "https://gt-scheduler.github.io/crawler-v2".to_string()
}

fn default_seating_proxy_base() -> String {
    "https://gt-scheduler.azurewebsites.net".to_string()
}

fn default_course_ttl() -> u64 {
    60 * 60
}

fn default_snapshot_ttl() -> u64 {
    24 * 60 * 60
}

fn default_true() -> bool {
    true
}

fn default_reads_per_sec() -> u32 {
    20
}

fn default_request_timeout() -> u64 {
    30
}

fn default_catalog_path() -> String {
    "data/courses.json".to_string()
}

fn default_snapshot_path() -> String {
    "data/prefetched-courses.json".to_string()
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            term_json_base: default_term_json_base(),
            seating_proxy_base: default_seating_proxy_base(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            course_ttl_secs: default_course_ttl(),
            snapshot_ttl_secs: default_snapshot_ttl(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            parallel: default_true(),
            reads_per_sec: default_reads_per_sec(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            catalog: default_catalog_path(),
            snapshot: default_snapshot_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_document() {
        let cfg: TrackerConfig = serde_json::from_str("{}").expect("empty config parses");
        assert_eq!(cfg.timing.course_ttl_secs, 3600);
        assert_eq!(cfg.timing.snapshot_ttl_secs, 86_400);
        assert!(cfg.fetch.parallel);
        assert_eq!(cfg.fetch.reads_per_sec, 20);
        assert!(cfg.endpoints.term_json_base.starts_with("https://"));
    }
}
