//! Account profile route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use axum::response::IntoResponse;
use tracing::instrument;

use crate::filters;
use crate::garge::types::UserProfile;
use crate::middleware::RequireUser;
use crate::state::AppState;

/// Profile display data for the template.
pub struct ProfileView {
    pub name: String,
    pub email: Option<String>,
    pub user_name: Option<String>,
    pub email_confirmed: bool,
}

impl From<UserProfile> for ProfileView {
    fn from(profile: UserProfile) -> Self {
        Self {
            name: profile.display_name(),
            email: profile.email.clone(),
            user_name: profile.user_name.clone(),
            email_confirmed: profile.email_confirmed.unwrap_or(false),
        }
    }
}

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    /// Name from the session, always present even when the fetch fails.
    pub session_name: String,
    pub profile: Option<ProfileView>,
    pub error: Option<String>,
}

/// Display the account profile.
#[instrument(skip(state, user))]
pub async fn show(State(state): State<AppState>, RequireUser(user): RequireUser) -> impl IntoResponse {
    match state
        .garge()
        .user_profile(&user.access_token, &user.sub)
        .await
    {
        Ok(profile) => ProfileTemplate {
            session_name: user.name,
            profile: Some(ProfileView::from(profile)),
            error: None,
        },
        Err(e) => {
            tracing::warn!("Failed to fetch profile: {e}");
            ProfileTemplate {
                session_name: user.name,
                profile: None,
                error: Some(e.user_message()),
            }
        }
    }
}
