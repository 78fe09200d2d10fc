//! Academic term resolution.
//!
//! Terms use a 6-digit wire code `YYYYMM` with exactly two canonical month
//! codes: `02` (spring) and `08` (fall). August onward counts as the fall
//! term of that year, anything earlier as its spring term.

use std::fmt;

use chrono::{DateTime, Datelike, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Semester {
    Spring,
    Fall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Term {
    pub year: i32,
    pub semester: Semester,
}

impl Term {
    /// The term containing the given instant.
    pub fn current(now: DateTime<Utc>) -> Self {
        if now.month() >= 8 {
            Term {
                year: now.year(),
                semester: Semester::Fall,
            }
        } else {
            Term {
                year: now.year(),
                semester: Semester::Spring,
            }
        }
    }

    /// The immediately preceding canonical term.
    pub fn prev(self) -> Self {
        match self.semester {
            Semester::Fall => Term {
                year: self.year,
                semester: Semester::Spring,
            },
            Semester::Spring => Term {
                year: self.year - 1,
                semester: Semester::Fall,
            },
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self.semester {
            Semester::Spring => "02",
            Semester::Fall => "08",
        };
        write!(f, "{}{}", self.year, code)
    }
}

/// The four terms of interest for a course lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermWindow {
    pub current: Term,
    pub previous: Term,
    pub one_year_back: Term,
    pub one_year_one_sem_back: Term,
}

impl TermWindow {
    /// Resolve the window from wall-clock time by stepping back from the
    /// current term zero to three times.
    pub fn resolve(now: DateTime<Utc>) -> Self {
        let current = Term::current(now);
        let previous = current.prev();
        let one_year_back = previous.prev();
        let one_year_one_sem_back = one_year_back.prev();
        Self {
            current,
            previous,
            one_year_back,
            one_year_one_sem_back,
        }
    }

    /// The window in record order: current, previous, one year back,
    /// one year and one semester back.
    pub fn terms(&self) -> [Term; 4] {
        [
            self.current,
            self.previous,
            self.one_year_back,
            self.one_year_one_sem_back,
        ]
    }
}
