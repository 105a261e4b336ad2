//! Cross-crate tests for the Garge web front end.
//!
//! These tests exercise `garge-web` as a library: the rule editor's
//! form-to-payload pipeline, cart and order shapes, spot-price math, and
//! content-page loading. They are plain `#[test]` functions with no running
//! server or network; the remote API's wire shapes are asserted through
//! serde instead.
//!
//! ```bash
//! cargo test -p garge-integration-tests
//! ```
