//! Session-related types.
//!
//! Types stored in the session for authentication state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use garge_core::Email;

use crate::garge::jwt::AccessClaims;

/// Session-stored user identity.
///
/// Built from the API's access token at login; carries the token itself so
/// every API call on behalf of the user can present it.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Token subject; path parameter for the profile endpoint.
    pub sub: String,
    /// Name shown in the navigation bar.
    pub name: String,
    /// Email claim, when the token carried a usable one.
    pub email: Option<Email>,
    /// Bearer token for API calls.
    pub access_token: String,
    /// Token expiry; refreshed shortly before this passes.
    pub expires_at: DateTime<Utc>,
}

// The session layer needs Serialize, which rules out SecretString for the
// token field; redact it here instead so a formatted CurrentUser never
// leaks the bearer token into logs or error context.
impl core::fmt::Debug for CurrentUser {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CurrentUser")
            .field("sub", &self.sub)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("access_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl CurrentUser {
    /// Build the session identity from a freshly issued token.
    ///
    /// # Errors
    ///
    /// Returns an error when the token cannot be decoded at all.
    pub fn from_token(access_token: String) -> Result<Self, jsonwebtoken::errors::Error> {
        let claims = AccessClaims::decode_unverified(&access_token)?;
        Ok(Self {
            sub: claims.sub.clone(),
            name: claims.display_name(),
            email: claims
                .email
                .as_deref()
                .and_then(|raw| Email::parse(raw).ok()),
            access_token,
            expires_at: claims.expires_at(),
        })
    }

    /// Whether the token is within `leeway` of expiring (or past it).
    #[must_use]
    pub fn expires_within(&self, leeway: chrono::Duration, now: DateTime<Utc>) -> bool {
        self.expires_at - now <= leeway
    }
}

/// Session keys for authentication and cart data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for storing the cart.
    pub const CART: &str = "cart";
}
