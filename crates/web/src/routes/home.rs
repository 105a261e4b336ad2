//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::response::IntoResponse;
use tracing::instrument;

use crate::filters;
use crate::middleware::OptionalUser;
use crate::models::CurrentUser;

// =============================================================================
// Landing Page Content
// =============================================================================

/// One card in the landing page feature grid.
#[derive(Clone)]
pub struct FeatureCard {
    pub title: &'static str,
    pub text: &'static str,
    pub href: &'static str,
    pub link_text: &'static str,
}

/// Static feature grid shown to everyone.
fn feature_cards() -> Vec<FeatureCard> {
    vec![
        FeatureCard {
            title: "Sensors",
            text: "Live readings and history charts for every sensor in your home, \
                   from garage temperature to greenhouse humidity.",
            href: "/sensors",
            link_text: "View sensors",
        },
        FeatureCard {
            title: "Sockets",
            text: "See which smart sockets are on right now and browse their \
                   switching history.",
            href: "/sockets",
            link_text: "View sockets",
        },
        FeatureCard {
            title: "Automations",
            text: "Turn sockets on or off automatically when sensor readings or \
                   the electricity spot price cross your thresholds.",
            href: "/automations",
            link_text: "Manage rules",
        },
        FeatureCard {
            title: "Electricity",
            text: "Hourly spot prices for your area with VAT included, so the \
                   heater runs when power is cheap.",
            href: "/electricity",
            link_text: "See prices",
        },
    ]
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    /// Logged-in user, when there is one.
    pub user: Option<CurrentUser>,
    /// Feature grid content.
    pub features: Vec<FeatureCard>,
}

/// Display the home page.
#[instrument(skip(user))]
pub async fn home(OptionalUser(user): OptionalUser) -> impl IntoResponse {
    HomeTemplate {
        user,
        features: feature_cards(),
    }
}
