//! Garge web front end library.
//!
//! Server-rendered dashboard and shop over the remote Garge REST API. The
//! binary in `main.rs` assembles the router from these modules; everything
//! else lives here so it can be tested.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod content;
pub mod error;
pub mod filters;
pub mod garge;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
