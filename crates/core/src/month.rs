//! Calendar month value object.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A calendar month, e.g. the month a reconciliation covers.
///
/// Parsed from and rendered as `YYYY-MM`. Compared by value.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    pub fn new(year: i32, month: u32) -> Result<Self, DomainError> {
        if !(1..=12).contains(&month) {
            return Err(DomainError::validation(format!(
                "month must be 1-12, got {month}"
            )));
        }
        if !(1970..=9999).contains(&year) {
            return Err(DomainError::validation(format!(
                "year out of range: {year}"
            )));
        }
        Ok(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Month {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (y, m) = s
            .split_once('-')
            .ok_or_else(|| DomainError::validation(format!("expected YYYY-MM, got '{s}'")))?;
        let year: i32 = y
            .parse()
            .map_err(|_| DomainError::validation(format!("invalid year in '{s}'")))?;
        let month: u32 = m
            .parse()
            .map_err(|_| DomainError::validation(format!("invalid month in '{s}'")))?;
        Self::new(year, month)
    }
}

impl TryFrom<String> for Month {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Month> for String {
    fn from(value: Month) -> Self {
        value.to_string()
    }
}
