//! Domain types shared across the tracker.

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Normalized enrollment totals for one course across the four tracked terms.
///
/// Field names stay camelCase on the wire so snapshots written by earlier
/// versions of the tool remain readable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseEnrollmentRecord {
    #[serde(rename = "currentEnrollment", default)]
    pub current_enrollment: u32,

    #[serde(rename = "pastEnrollment", default)]
    pub past_enrollment: u32,

    #[serde(rename = "oneYearBackEnrollment", default)]
    pub one_year_back_enrollment: u32,

    #[serde(rename = "oneYearOneSemBackEnrollment", default)]
    pub one_year_one_sem_back_enrollment: u32,
}

/// Summed seating figures for one course in one term.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TermEnrollment {
    pub actual: u32,
    pub maximum: u32,
}

/// The full set of known course records plus a freshness timestamp.
///
/// A course id absent from `courses` means "not yet successfully fetched",
/// never "zero enrollment" — zero is a valid stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrefetchedSnapshot {
    /// Epoch milliseconds at creation time.
    pub timestamp: i64,
    #[serde(default)]
    pub courses: HashMap<String, CourseEnrollmentRecord>,
}

impl PrefetchedSnapshot {
    /// Build a snapshot timestamped "now".
    pub fn new(courses: HashMap<String, CourseEnrollmentRecord>) -> Self {
        Self {
            timestamp: Utc::now().timestamp_millis(),
            courses,
        }
    }

    /// Milliseconds elapsed since the snapshot was created.
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms.saturating_sub(self.timestamp)
    }
}
