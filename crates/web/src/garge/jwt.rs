//! Access-token claim extraction.
//!
//! The API signs its own tokens and verifies them on every request; this
//! front end only needs the subject, display name, and expiry out of the
//! token it was handed, so it decodes without checking the signature.

use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

/// Claims carried by the API's access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// User id; path parameter for `/users/{sub}/profile`.
    pub sub: String,
    /// Display name as issued at login.
    #[serde(default)]
    pub unique_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Expiry as a unix timestamp.
    pub exp: i64,
}

impl AccessClaims {
    /// Decode claims without verifying the signature.
    ///
    /// Expiry is not enforced here either; callers compare
    /// [`Self::expires_at`] against the clock so they can refresh
    /// shortly before it passes.
    pub fn decode_unverified(token: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;

        let data = decode::<Self>(token, &DecodingKey::from_secret(&[]), &validation)?;
        Ok(data.claims)
    }

    /// Expiry instant of the token.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Name to greet the user with, falling back to email, then subject.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.unique_name
            .clone()
            .or_else(|| self.email.clone())
            .unwrap_or_else(|| self.sub.clone())
    }
}
