//! Remote Garge API client.
//!
//! Everything the dashboard shows lives behind the Garge REST API; this
//! module is the only place that talks to it. Structure:
//!
//! - [`client`] - HTTP plumbing and one method per endpoint (`reqwest`)
//! - [`types`] - wire records, camelCase JSON
//! - [`wire`] - tolerance for the API's .NET serializer quirks
//! - [`jwt`] - claim extraction from the opaque access token
//! - [`electricity`] - spot-price shaping (VAT, unit conversion, aggregation)
//!
//! Catalog and price reads are cached in-memory via `moka` (5 minute TTL).
//! Authenticated per-user reads are never cached.

mod cache;
pub mod client;
pub mod electricity;
pub mod jwt;
pub mod types;
pub mod wire;

use thiserror::Error;

pub use client::GargeClient;

/// Errors that can occur when talking to the Garge API.
#[derive(Debug, Error)]
pub enum GargeError {
    /// HTTP transport failed (connect, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Token missing, expired, or rejected.
    #[error("Unauthorized")]
    Unauthorized,

    /// API asked us to back off.
    #[error("Rate limited, retry after {0}s")]
    RateLimited(u64),

    /// Response body did not match the expected shape.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl GargeError {
    /// The line shown inline when a page catches this error.
    ///
    /// API-provided messages are surfaced as-is; transport and parse
    /// failures collapse to a generic line.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } if !message.is_empty() => message.clone(),
            Self::Api { status, .. } => format!("The service returned an error ({status})."),
            Self::NotFound(what) => format!("{what} was not found."),
            Self::Unauthorized => "Your session has expired. Please log in again.".to_string(),
            Self::RateLimited(_) => "Too many requests. Please wait a moment.".to_string(),
            Self::Http(_) => "Could not reach the service. Please try again.".to_string(),
            Self::Parse(_) => "The service returned an unexpected response.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_prefers_api_text() {
        let err = GargeError::Api {
            status: 400,
            message: "Registration code already used".to_string(),
        };
        assert_eq!(err.user_message(), "Registration code already used");
    }

    #[test]
    fn test_user_message_falls_back_on_empty_body() {
        let err = GargeError::Api {
            status: 502,
            message: String::new(),
        };
        assert_eq!(err.user_message(), "The service returned an error (502).");
    }

    #[test]
    fn test_user_message_hides_parse_details() {
        let parse_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err = GargeError::Parse(parse_err);
        assert_eq!(
            err.user_message(),
            "The service returned an unexpected response."
        );
    }
}
