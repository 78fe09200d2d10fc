//! Section extraction from the bulk per-term document.
//!
//! The document is keyed by course id under a top-level `courses` table.
//! A course entry encodes its section table in one of two shapes, which are
//! normalized here so nothing downstream ever sees the raw layout:
//!
//! - a direct mapping of section label → section tuple, or
//! - a two-element tuple whose second element is that mapping.
//!
//! Each section tuple is `[crn, meta, weight, ...]`; a zero weight marks a
//! cancelled/unoffered section and is filtered out.

use std::collections::BTreeMap;

use common::Error;
use serde_json::{Map, Value};
use tracing::debug;

/// The two accepted encodings of a course's section table.
enum SectionShape<'a> {
    /// Section label → tuple, directly.
    Mapping(&'a Map<String, Value>),
    /// `[meta, { label: tuple, ... }]`.
    Tagged(&'a Map<String, Value>),
}

fn detect_shape(entry: &Value) -> Option<SectionShape<'_>> {
    match entry {
        Value::Object(map) => Some(SectionShape::Mapping(map)),
        Value::Array(items) => items.get(1).and_then(Value::as_object).map(SectionShape::Tagged),
        _ => None,
    }
}

/// Extract the offered sections of `course_id` as a label → CRN mapping.
///
/// An absent course key yields an empty mapping — the course simply was not
/// offered that term. A document without a `courses` table is a hard error.
pub fn section_crns(doc: &Value, course_id: &str) -> Result<BTreeMap<String, String>, Error> {
    let courses = doc
        .get("courses")
        .and_then(Value::as_object)
        .ok_or_else(|| Error::Document("term document has no courses table".to_string()))?;

    let mut crns = BTreeMap::new();

    let Some(entry) = courses.get(course_id) else {
        debug!("Course {} not present in term document", course_id);
        return Ok(crns);
    };

    let sections = match detect_shape(entry) {
        Some(SectionShape::Mapping(map)) | Some(SectionShape::Tagged(map)) => map,
        None => return Ok(crns),
    };

    for (label, section) in sections {
        let Some(tuple) = section.as_array() else {
            continue;
        };
        if tuple.len() < 3 || !is_offered(&tuple[2]) {
            continue;
        }
        if let Some(crn) = crn_text(&tuple[0]) {
            crns.insert(label.clone(), crn);
        }
    }

    Ok(crns)
}

fn is_offered(weight: &Value) -> bool {
    match weight {
        Value::Number(n) => n.as_f64().map(|v| v != 0.0).unwrap_or(false),
        _ => false,
    }
}

fn crn_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
