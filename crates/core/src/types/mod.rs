//! Core types for Garge.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod price;
pub mod rules;
pub mod time_range;

pub use email::{Email, EmailError};
pub use id::*;
pub use price::Price;
pub use rules::{Comparator, LogicalOperator, SwitchAction, SwitchState};
pub use time_range::{TimeRange, TimeRangeError, TimeUnit};
