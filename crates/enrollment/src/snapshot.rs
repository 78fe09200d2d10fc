//! Persisted snapshot store.
//!
//! A single JSON file holds the full set of previously prefetched course
//! records plus an epoch-ms timestamp. There is no schema version field:
//! any shape change is absorbed by the 24h TTL expiring the old file.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use common::{Error, PrefetchedSnapshot};
use tracing::{info, warn};

/// Loads, merges, and saves prefetched snapshots at a fixed path.
pub struct SnapshotStore {
    path: PathBuf,
    ttl: Duration,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            path: path.into(),
            ttl,
        }
    }

    /// The snapshot on disk, if present, readable, and within TTL.
    ///
    /// A missing file, unreadable JSON, or an expired timestamp all yield
    /// `None` — the caller prefetches from scratch either way.
    pub fn load(&self) -> Option<PrefetchedSnapshot> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Could not read snapshot {}: {}", self.path.display(), e);
                return None;
            }
        };

        let snapshot: PrefetchedSnapshot = match serde_json::from_str(&raw) {
            Ok(s) => s,
            Err(e) => {
                warn!(
                    "Discarding unreadable snapshot {}: {}",
                    self.path.display(),
                    e
                );
                return None;
            }
        };

        if self.is_expired(&snapshot, Utc::now().timestamp_millis()) {
            info!(
                "Snapshot {} is older than {}s; ignoring",
                self.path.display(),
                self.ttl.as_secs()
            );
            return None;
        }

        Some(snapshot)
    }

    /// Union of two snapshots with fresh entries winning per key, stamped
    /// "now".
    pub fn merge(existing: &PrefetchedSnapshot, fresh: &PrefetchedSnapshot) -> PrefetchedSnapshot {
        let mut courses = existing.courses.clone();
        courses.extend(
            fresh
                .courses
                .iter()
                .map(|(id, record)| (id.clone(), record.clone())),
        );
        PrefetchedSnapshot::new(courses)
    }

    /// Persist the snapshot, overwriting any prior file.
    pub fn save(&self, snapshot: &PrefetchedSnapshot) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| Error::Snapshot(format!("{}: {}", parent.display(), e)))?;
            }
        }
        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| Error::Snapshot(format!("could not encode snapshot: {e}")))?;
        fs::write(&self.path, json)
            .map_err(|e| Error::Snapshot(format!("{}: {}", self.path.display(), e)))?;
        info!(
            "Saved snapshot of {} courses to {}",
            snapshot.courses.len(),
            self.path.display()
        );
        Ok(())
    }

    fn is_expired(&self, snapshot: &PrefetchedSnapshot, now_ms: i64) -> bool {
        snapshot.age_ms(now_ms) >= self.ttl.as_millis() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::CourseEnrollmentRecord;
    use std::collections::HashMap;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    fn record(current: u32) -> CourseEnrollmentRecord {
        CourseEnrollmentRecord {
            current_enrollment: current,
            ..Default::default()
        }
    }

    fn snapshot_with(entries: &[(&str, u32)]) -> PrefetchedSnapshot {
        let courses: HashMap<_, _> = entries
            .iter()
            .map(|(id, n)| (id.to_string(), record(*n)))
            .collect();
        PrefetchedSnapshot::new(courses)
    }

    #[test]
    fn test_merge_fresh_wins_per_key_union_of_keys() {
        let existing = snapshot_with(&[("A", 1)]);
        let fresh = snapshot_with(&[("A", 2), ("B", 3)]);

        let merged = SnapshotStore::merge(&existing, &fresh);

        assert_eq!(merged.courses.len(), 2);
        assert_eq!(merged.courses["A"], record(2));
        assert_eq!(merged.courses["B"], record(3));
        assert!(merged.timestamp >= fresh.timestamp);
    }

    #[test]
    fn test_round_trip_on_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SnapshotStore::new(dir.path().join("snapshot.json"), DAY);

        let snapshot = snapshot_with(&[("CS 1301", 140), ("MATH 1554", 0)]);
        store.save(&snapshot).expect("save succeeds");

        let loaded = store.load().expect("fresh snapshot loads");
        assert_eq!(loaded.courses, snapshot.courses);
        // Zero is a stored value, not an absent key.
        assert_eq!(loaded.courses["MATH 1554"], record(0));
    }

    #[test]
    fn test_expired_snapshot_treated_as_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SnapshotStore::new(dir.path().join("snapshot.json"), DAY);

        let mut snapshot = snapshot_with(&[("A", 1)]);
        snapshot.timestamp = Utc::now().timestamp_millis() - (25 * 60 * 60 * 1000);
        store.save(&snapshot).expect("save succeeds");

        assert!(store.load().is_none());
    }

    #[test]
    fn test_snapshot_within_ttl_is_present() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SnapshotStore::new(dir.path().join("snapshot.json"), DAY);

        let mut snapshot = snapshot_with(&[("A", 1)]);
        snapshot.timestamp = Utc::now().timestamp_millis() - (23 * 60 * 60 * 1000);
        store.save(&snapshot).expect("save succeeds");

        assert!(store.load().is_some());
    }

    #[test]
    fn test_missing_file_is_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SnapshotStore::new(dir.path().join("nope.json"), DAY);
        assert!(store.load().is_none());
    }

    #[test]
    fn test_corrupt_file_is_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("snapshot.json");
        fs::write(&path, "{not json").expect("write corrupt file");

        let store = SnapshotStore::new(path, DAY);
        assert!(store.load().is_none());
    }

    #[test]
    fn test_unwritable_path_reports_snapshot_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        // The target path is an existing directory, so the write must fail.
        let store = SnapshotStore::new(dir.path().to_path_buf(), DAY);
        let err = store
            .save(&snapshot_with(&[("A", 1)]))
            .expect_err("save into a directory fails");
        assert!(matches!(err, Error::Snapshot(_)));
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SnapshotStore::new(dir.path().join("data").join("snapshot.json"), DAY);
        store
            .save(&snapshot_with(&[("A", 1)]))
            .expect("save succeeds");
        assert!(store.load().is_some());
    }
}
