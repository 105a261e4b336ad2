//! Vocabulary shared by the rule editor and the remote automation API.
//!
//! These enums serialize to the exact strings the API stores (`"<="`,
//! `"AND"`, `"on"`, ...) and parse back from form submissions.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Threshold comparison operator for a rule condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Comparator {
    #[default]
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">=")]
    Ge,
}

impl Comparator {
    /// All comparators, in the order the editor lists them.
    pub const ALL: [Self; 5] = [Self::Eq, Self::Lt, Self::Gt, Self::Le, Self::Ge];

    /// The wire/display symbol.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
        }
    }

    /// Editor option label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Eq => "Equals",
            Self::Lt => "Less than",
            Self::Gt => "Greater than",
            Self::Le => "Less than or equal",
            Self::Ge => "Greater than or equal",
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a comparator string is not recognized.
#[derive(thiserror::Error, Debug, Clone)]
#[error("unknown comparator `{0}`")]
pub struct ParseComparatorError(String);

impl std::str::FromStr for Comparator {
    type Err = ParseComparatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "==" => Ok(Self::Eq),
            "<" => Ok(Self::Lt),
            ">" => Ok(Self::Gt),
            "<=" => Ok(Self::Le),
            ">=" => Ok(Self::Ge),
            other => Err(ParseComparatorError(other.to_owned())),
        }
    }
}

/// How multiple conditions combine within one rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOperator {
    #[default]
    And,
    Or,
}

impl LogicalOperator {
    /// The wire string (`AND`/`OR`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }

    /// Editor option label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::And => "AND (All conditions must be true)",
            Self::Or => "OR (Any condition can be true)",
        }
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a logical operator string is not recognized.
#[derive(thiserror::Error, Debug, Clone)]
#[error("unknown logical operator `{0}`")]
pub struct ParseLogicalOperatorError(String);

impl std::str::FromStr for LogicalOperator {
    type Err = ParseLogicalOperatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "AND" => Ok(Self::And),
            "OR" => Ok(Self::Or),
            other => Err(ParseLogicalOperatorError(other.to_owned())),
        }
    }
}

/// What a rule does to its target switch when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchAction {
    #[default]
    On,
    Off,
}

impl SwitchAction {
    /// The wire string (`on`/`off`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }

    /// Editor option label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::On => "On",
            Self::Off => "Off",
        }
    }
}

impl fmt::Display for SwitchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a switch action string is not recognized.
#[derive(thiserror::Error, Debug, Clone)]
#[error("unknown switch action `{0}`")]
pub struct ParseSwitchActionError(String);

impl std::str::FromStr for SwitchAction {
    type Err = ParseSwitchActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "on" => Ok(Self::On),
            "off" => Ok(Self::Off),
            other => Err(ParseSwitchActionError(other.to_owned())),
        }
    }
}

/// Current state of a switch, derived from its most recent sample.
///
/// Sample values are free-form strings; anything that is not `ON` or `OFF`
/// after trimming and uppercasing counts as unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwitchState {
    On,
    Off,
    Unknown,
}

impl SwitchState {
    /// Derive a state from a raw sample value.
    #[must_use]
    pub fn from_value(value: &str) -> Self {
        match value.trim().to_uppercase().as_str() {
            "ON" => Self::On,
            "OFF" => Self::Off,
            _ => Self::Unknown,
        }
    }

    /// The badge text shown in the dashboard.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Whether the switch is known to be on.
    #[must_use]
    pub const fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

impl fmt::Display for SwitchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
