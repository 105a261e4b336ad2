//! Compact time-range strings for data queries.
//!
//! The remote API accepts history windows as strings like `24h` or `7d`
//! (`timeRange` query parameter). This module parses and formats that
//! vocabulary and converts it to a concrete duration for display logic.

use core::fmt;

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`TimeRange`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeRangeError {
    /// The input string is empty.
    #[error("time range cannot be empty")]
    Empty,
    /// The input has no leading digits or trailing unit.
    #[error("time range must be an amount followed by a unit, e.g. `24h`")]
    Malformed,
    /// The unit suffix is not one of `m`, `h`, `d`, `w`, `y`.
    #[error("unknown time unit `{0}`")]
    UnknownUnit(char),
    /// The amount is zero.
    #[error("time range amount must be greater than zero")]
    Zero,
}

/// Units accepted by the API's `timeRange` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeUnit {
    Minutes,
    Hours,
    Days,
    Weeks,
    Years,
}

impl TimeUnit {
    /// The single-character suffix used on the wire.
    #[must_use]
    pub const fn suffix(self) -> char {
        match self {
            Self::Minutes => 'm',
            Self::Hours => 'h',
            Self::Days => 'd',
            Self::Weeks => 'w',
            Self::Years => 'y',
        }
    }

    const fn from_suffix(c: char) -> Option<Self> {
        match c {
            'm' => Some(Self::Minutes),
            'h' => Some(Self::Hours),
            'd' => Some(Self::Days),
            'w' => Some(Self::Weeks),
            'y' => Some(Self::Years),
            _ => None,
        }
    }
}

/// A history window such as `24h` or `7d`.
///
/// ```
/// use garge_core::TimeRange;
///
/// let range: TimeRange = "24h".parse().unwrap();
/// assert_eq!(range.to_string(), "24h");
/// assert_eq!(range.duration(), chrono::Duration::hours(24));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeRange {
    amount: u32,
    unit: TimeUnit,
}

impl TimeRange {
    /// Create a range from an amount and unit.
    #[must_use]
    pub const fn new(amount: u32, unit: TimeUnit) -> Self {
        Self { amount, unit }
    }

    /// The default window shown on data pages.
    pub const DEFAULT: Self = Self::new(24, TimeUnit::Hours);

    /// Parse a range string like `24h`.
    ///
    /// Leading and trailing whitespace is ignored. The amount must be a
    /// positive integer and the unit one of `m`, `h`, `d`, `w`, `y`.
    ///
    /// # Errors
    ///
    /// Returns a [`TimeRangeError`] describing what was wrong with the input.
    pub fn parse(s: &str) -> Result<Self, TimeRangeError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TimeRangeError::Empty);
        }

        let digits_end = s
            .char_indices()
            .find(|(_, c)| !c.is_ascii_digit())
            .map_or(s.len(), |(i, _)| i);

        let (digits, rest) = s.split_at(digits_end);
        if digits.is_empty() {
            return Err(TimeRangeError::Malformed);
        }

        let mut rest_chars = rest.chars();
        let (Some(suffix), None) = (rest_chars.next(), rest_chars.next()) else {
            return Err(TimeRangeError::Malformed);
        };

        let unit = TimeUnit::from_suffix(suffix).ok_or(TimeRangeError::UnknownUnit(suffix))?;
        let amount: u32 = digits.parse().map_err(|_| TimeRangeError::Malformed)?;
        if amount == 0 {
            return Err(TimeRangeError::Zero);
        }

        Ok(Self { amount, unit })
    }

    /// The numeric amount.
    #[must_use]
    pub const fn amount(&self) -> u32 {
        self.amount
    }

    /// The unit.
    #[must_use]
    pub const fn unit(&self) -> TimeUnit {
        self.unit
    }

    /// The window as a concrete duration. Years count as 365 days.
    #[must_use]
    pub fn duration(&self) -> Duration {
        let amount = i64::from(self.amount);
        match self.unit {
            TimeUnit::Minutes => Duration::minutes(amount),
            TimeUnit::Hours => Duration::hours(amount),
            TimeUnit::Days => Duration::days(amount),
            TimeUnit::Weeks => Duration::weeks(amount),
            TimeUnit::Years => Duration::days(amount * 365),
        }
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.unit.suffix())
    }
}

impl std::str::FromStr for TimeRange {
    type Err = TimeRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_units() {
        assert_eq!(
            TimeRange::parse("30m").unwrap(),
            TimeRange::new(30, TimeUnit::Minutes)
        );
        assert_eq!(
            TimeRange::parse("24h").unwrap(),
            TimeRange::new(24, TimeUnit::Hours)
        );
        assert_eq!(
            TimeRange::parse("7d").unwrap(),
            TimeRange::new(7, TimeUnit::Days)
        );
        assert_eq!(
            TimeRange::parse("2w").unwrap(),
            TimeRange::new(2, TimeUnit::Weeks)
        );
        assert_eq!(
            TimeRange::parse("1y").unwrap(),
            TimeRange::new(1, TimeUnit::Years)
        );
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert_eq!(
            TimeRange::parse(" 24h ").unwrap(),
            TimeRange::new(24, TimeUnit::Hours)
        );
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(TimeRange::parse(""), Err(TimeRangeError::Empty));
        assert_eq!(TimeRange::parse("   "), Err(TimeRangeError::Empty));
    }

    #[test]
    fn test_parse_malformed() {
        assert_eq!(TimeRange::parse("h"), Err(TimeRangeError::Malformed));
        assert_eq!(TimeRange::parse("24"), Err(TimeRangeError::Malformed));
        assert_eq!(TimeRange::parse("24hh"), Err(TimeRangeError::Malformed));
        assert_eq!(TimeRange::parse("24 h"), Err(TimeRangeError::Malformed));
    }

    #[test]
    fn test_parse_unknown_unit() {
        assert_eq!(
            TimeRange::parse("24x"),
            Err(TimeRangeError::UnknownUnit('x'))
        );
    }

    #[test]
    fn test_parse_zero() {
        assert_eq!(TimeRange::parse("0h"), Err(TimeRangeError::Zero));
    }

    #[test]
    fn test_display_roundtrip() {
        for input in ["30m", "24h", "7d", "2w", "1y"] {
            assert_eq!(TimeRange::parse(input).unwrap().to_string(), input);
        }
    }

    #[test]
    fn test_duration() {
        assert_eq!(
            TimeRange::parse("90m").unwrap().duration(),
            Duration::minutes(90)
        );
        assert_eq!(
            TimeRange::parse("1y").unwrap().duration(),
            Duration::days(365)
        );
    }

    #[test]
    fn test_default() {
        assert_eq!(TimeRange::default().to_string(), "24h");
    }
}
