//! Authentication middleware and extractors.
//!
//! Provides extractors for requiring a logged-in Garge user in route handlers.
//! `RequireUser` also refreshes the API token transparently when it is about
//! to expire, so handlers never see a stale token.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::{debug, warn};

use crate::error::set_sentry_user;
use crate::models::{CurrentUser, session::keys};
use crate::state::AppState;

/// Tokens expiring within this window are refreshed before the handler runs.
const REFRESH_LEEWAY_MINUTES: i64 = 5;

/// Extractor that requires a logged-in user.
///
/// If the user is not logged in, HTML requests are redirected to the login
/// page with a `next` parameter pointing back at the requested path; `/api/`
/// requests get a plain 401.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireUser(user): RequireUser,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireUser(pub CurrentUser);

/// Error returned when authentication is required but the user is not logged in.
pub enum AuthRejection {
    /// Redirect to the login page, returning here afterwards (HTML requests).
    RedirectToLogin { next: String },
    /// Unauthorized response (API requests).
    Unauthorized,
}

impl AuthRejection {
    fn for_request(parts: &Parts) -> Self {
        let path = parts.uri.path();
        if wants_unauthorized(path) {
            Self::Unauthorized
        } else {
            Self::RedirectToLogin {
                next: path.to_string(),
            }
        }
    }
}

/// Paths fetched by scripts rather than navigated to; a login redirect
/// would hand the fetch an HTML page, so these get a plain 401.
fn wants_unauthorized(path: &str) -> bool {
    path.starts_with("/api/") || path == "/cart/count"
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin { next } => {
                let target = format!("/login?next={}", urlencoding::encode(&next));
                Redirect::to(&target).into_response()
            }
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::Unauthorized)?
            .clone();

        // Get the current user from the session
        let user: CurrentUser = session
            .get(keys::CURRENT_USER)
            .await
            .ok()
            .flatten()
            .ok_or_else(|| AuthRejection::for_request(parts))?;

        let user = if user.expires_within(
            chrono::Duration::minutes(REFRESH_LEEWAY_MINUTES),
            chrono::Utc::now(),
        ) {
            refresh_session_user(state, &session, user)
                .await
                .map_err(|()| AuthRejection::for_request(parts))?
        } else {
            user
        };

        set_sentry_user(&user.sub, user.email.as_ref().map(garge_core::Email::as_str));

        Ok(Self(user))
    }
}

/// Swap a near-expiry token for a fresh one, updating the session.
///
/// On refresh failure the stale identity is removed from the session so the
/// next request starts from a clean logged-out state.
async fn refresh_session_user(
    state: &AppState,
    session: &Session,
    user: CurrentUser,
) -> Result<CurrentUser, ()> {
    match state.garge().refresh_token(&user.access_token).await {
        Ok(auth) => match CurrentUser::from_token(auth.token) {
            Ok(refreshed) => {
                debug!(sub = %refreshed.sub, "refreshed access token");
                if let Err(e) = set_current_user(session, &refreshed).await {
                    warn!("failed to store refreshed user in session: {e}");
                }
                Ok(refreshed)
            }
            Err(e) => {
                warn!("refreshed token is not decodable: {e}");
                let _ = clear_current_user(session).await;
                Err(())
            }
        },
        Err(e) => {
            debug!(sub = %user.sub, "token refresh failed: {e}");
            let _ = clear_current_user(session).await;
            Err(())
        }
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireUser`, this does not reject the request if the user is not
/// logged in, and it never attempts a token refresh.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(
///     OptionalUser(user): OptionalUser,
/// ) -> impl IntoResponse {
///     match user {
///         Some(u) => format!("Hello, {}!", u.name),
///         None => "Hello, guest!".to_string(),
///     }
/// }
/// ```
pub struct OptionalUser(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<CurrentUser>(keys::CURRENT_USER)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(user))
    }
}

/// Helper to set the current user in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(keys::CURRENT_USER, user).await
}

/// Helper to clear the current user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove::<CurrentUser>(keys::CURRENT_USER).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_fetched_paths_get_401_not_redirect() {
        assert!(wants_unauthorized("/api/anything"));
        assert!(wants_unauthorized("/cart/count"));

        assert!(!wants_unauthorized("/sensors"));
        assert!(!wants_unauthorized("/cart"));
        assert!(!wants_unauthorized("/cart/counters"));
    }
}
