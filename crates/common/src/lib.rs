//! Shared types, errors, and configuration for the seat tracker.

pub mod config;
pub mod error;
pub mod types;

pub use error::Error;
pub use types::{CourseEnrollmentRecord, PrefetchedSnapshot, TermEnrollment};
