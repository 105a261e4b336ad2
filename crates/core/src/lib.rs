//! Garge Core - Shared domain types.
//!
//! This crate provides common types used across the Garge web tier:
//! - `web` - Server-rendered dashboard and shop
//! - `integration-tests` - Cross-module test suite
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no HTTP
//! clients, no session handling. Everything here mirrors records owned by
//! the remote Garge API; nothing is persisted locally.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, prices, time ranges, and rule enums

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
