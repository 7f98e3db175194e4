use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use thiserror::Error;

/// A calendar month. Orders chronologically and prints as `YYYY-MM`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid month '{input}', expected YYYY-MM")]
pub struct MonthParseError {
    input: String,
}

impl YearMonth {
    /// The latest month that still prints and parses as `YYYY-MM`.
    pub const LAST: YearMonth = YearMonth {
        year: 9999,
        month: 12,
    };

    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) && (0..=9999).contains(&year) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The month containing the local wall-clock date.
    pub fn current() -> Self {
        Self::from_date(Local::now().date_naive())
    }

    fn ordinal(self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }

    fn from_ordinal(ordinal: i64) -> Self {
        Self {
            year: ordinal.div_euclid(12) as i32,
            month: ordinal.rem_euclid(12) as u32 + 1,
        }
    }

    pub fn add_months(self, months: i64) -> Self {
        Self::from_ordinal(self.ordinal() + months)
    }

    /// Signed whole-month distance; negative when `other` is earlier.
    pub fn months_until(self, other: YearMonth) -> i64 {
        other.ordinal() - self.ordinal()
    }

    /// Every month from `self` through `end` inclusive; empty when `end`
    /// precedes `self`.
    pub fn range_inclusive(self, end: YearMonth) -> impl Iterator<Item = YearMonth> {
        let span = self.months_until(end);
        (0..=span).map(move |offset| self.add_months(offset))
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = MonthParseError;

    /// Accepts `YYYY-MM`, `YYYY-MM-DD`, or an RFC 3339 timestamp.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let err = || MonthParseError {
            input: s.to_string(),
        };

        let date = match trimmed.len() {
            7 => NaiveDate::parse_from_str(&format!("{trimmed}-01"), "%Y-%m-%d").ok(),
            10 => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok(),
            n if n > 10 => chrono::DateTime::parse_from_rfc3339(trimmed)
                .map(|dt| dt.date_naive())
                .ok()
                .or_else(|| {
                    trimmed
                        .get(..10)
                        .filter(|_| trimmed.as_bytes()[10] == b'T')
                        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
                }),
            _ => None,
        };

        date.and_then(|d| Self::new(d.year(), d.month()))
            .ok_or_else(err)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
