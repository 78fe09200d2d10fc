//! Per-term enrollment aggregation.

use std::collections::HashMap;

use common::{Error, TermEnrollment};
use futures_util::future::join_all;
use schedule_client::ScheduleClient;
use tracing::warn;

use crate::terms::Term;

pub const ENROLLMENT_ACTUAL: &str = "Enrollment Actual";
pub const ENROLLMENT_MAXIMUM: &str = "Enrollment Maximum";

/// Total enrolled seats and capacity for a course in one term.
///
/// All per-section seating fetches are issued together and awaited jointly;
/// their sums are commutative so no ordering is needed. Any single section
/// failure fails the whole term — the caller decides how to degrade.
pub async fn term_total_enrollment(
    client: &ScheduleClient,
    term: Term,
    course_id: &str,
) -> Result<TermEnrollment, Error> {
    let term_code = term.to_string();
    let crns = client.section_crns(&term_code, course_id).await?;

    let term_code = &term_code;
    let fetches = crns.iter().map(|(label, crn)| async move {
        let seating = client.fetch_section_seating(term_code, crn).await;
        (label.as_str(), seating)
    });

    let mut sections = Vec::with_capacity(crns.len());
    for (label, seating) in join_all(fetches).await {
        sections.push((label, seating?));
    }

    Ok(sum_sections(&sections, term_code))
}

/// Sum seating figures across a term's sections.
///
/// A section reporting zero capacity is treated as full at its current
/// enrollment, so unpublished caps do not undercount the total maximum.
fn sum_sections(sections: &[(&str, HashMap<String, String>)], term: &str) -> TermEnrollment {
    let mut totals = TermEnrollment::default();
    for (label, seating) in sections {
        let actual = seat_count(seating, ENROLLMENT_ACTUAL, term, label);
        let maximum = seat_count(seating, ENROLLMENT_MAXIMUM, term, label);

        totals.actual += actual;
        totals.maximum += if maximum == 0 { actual } else { maximum };
    }
    totals
}

/// Numeric value of a seating field, clamped to 0 when missing or
/// non-numeric. The clamp is logged so bad upstream data stays observable.
fn seat_count(seating: &HashMap<String, String>, field: &str, term: &str, section: &str) -> u32 {
    match seating.get(field) {
        Some(raw) => match raw.trim().parse::<u32>() {
            Ok(n) => n,
            Err(_) => {
                warn!(
                    "Non-numeric {:?} ({:?}) for term {} section {}; counting as 0",
                    field, raw, term, section
                );
                0
            }
        },
        None => {
            warn!(
                "Missing {:?} for term {} section {}; counting as 0",
                field, term, section
            );
            0
        }
    }
}
