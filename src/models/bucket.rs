//! Start-date bucket classification.
//!
//! A project's start date, measured in calendar months from today, selects one
//! of three planning windows. The window index then picks the default
//! initiative and release from their ordered reference lists.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Forward-looking planning window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    /// Fewer than 3 months ahead, including dates in the past
    Imminent,
    /// 3 to 5 months ahead
    Next,
    /// 6 or more months ahead
    Later,
}

impl Bucket {
    /// Position of this bucket in the initiative/release lists.
    pub fn index(self) -> usize {
        match self {
            Bucket::Imminent => 0,
            Bucket::Next => 1,
            Bucket::Later => 2,
        }
    }

    /// Pick this bucket's entry from an ordered list.
    ///
    /// Lists shorter than the bucket index fall back to the first entry;
    /// an empty list yields `None`.
    pub fn pick<T>(self, list: &[T]) -> Option<&T> {
        list.get(self.index()).or_else(|| list.first())
    }
}

/// Calendar-month difference `start - today`, ignoring the day of month.
pub fn months_between(today: NaiveDate, start: NaiveDate) -> i32 {
    (start.year() - today.year()) * 12 + start.month() as i32 - today.month() as i32
}

/// Classify a candidate start date relative to today.
pub fn classify(start: NaiveDate, today: NaiveDate) -> Bucket {
    match months_between(today, start) {
        m if m < 3 => Bucket::Imminent,
        m if m < 6 => Bucket::Next,
        _ => Bucket::Later,
    }
}
