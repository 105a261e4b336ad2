//! HTTP route handlers for the Garge dashboard.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                          - Home page
//! GET  /healthz                   - Liveness probe
//! GET  /readyz                    - Readiness probe (pings the API)
//!
//! # Auth (rate limited)
//! GET  /login                     - Login page
//! POST /login                     - Login action
//! GET  /register                  - Registration page
//! POST /register                  - Registration action
//! GET  /verify-email              - Email verification page
//! POST /verify-email              - Submit verification code
//! POST /verify-email/resend       - Resend verification code
//! GET  /forgot-password           - Request a reset code
//! POST /forgot-password           - Send the reset code
//! GET  /reset-password            - Reset page
//! POST /reset-password            - Submit the new password
//! POST /logout                    - Log out
//!
//! # Dashboard (requires login)
//! GET  /profile                   - Account profile
//! GET  /sensors                   - Sensor dashboard (?range, ?refresh)
//! GET  /sensors/claim             - Claim form
//! POST /sensors/claim             - Claim a sensor
//! POST /sensors/{id}/rename       - Rename a sensor
//! GET  /sockets                   - Sockets with current state
//! GET  /sockets/compare           - Overlay comparison (?ids=1,2)
//! GET  /sockets/{id}              - State history (?range)
//! GET  /automations               - Rule list
//! GET  /automations/new           - Rule editor (blank)
//! POST /automations               - Create rule / editor round-trip
//! GET  /automations/{id}/edit     - Rule editor (prefilled)
//! POST /automations/{id}          - Update rule / editor round-trip
//! POST /automations/{id}/delete   - Delete rule
//! GET  /electricity               - Spot prices (?view=today|week|month|year)
//!
//! # Shop
//! GET  /shop                      - Catalog
//! GET  /shop/products/{id}        - Product detail
//! GET  /shop/subscriptions/{id}   - Subscription detail
//!
//! # Cart
//! GET  /cart                      - Cart page
//! POST /cart/products/{id}        - Add product
//! POST /cart/subscriptions/{id}   - Add subscription
//! POST /cart/items/{key}/quantity - Set line quantity
//! POST /cart/items/{key}/remove   - Remove line
//! GET  /cart/count                - Count badge fragment (rate limited)
//!
//! # Checkout
//! GET  /checkout                  - Checkout form
//! POST /checkout                  - Place the order
//!
//! # Content
//! GET  /privacy, /terms, /cookies, /docs - Markdown content pages
//! ```

pub mod auth;
pub mod automations;
pub mod cart;
pub mod checkout;
pub mod electricity;
pub mod health;
pub mod home;
pub mod pages;
pub mod profile;
pub mod sensors;
pub mod shop;
pub mod sockets;

use axum::{
    Router,
    routing::{get, post},
};
use serde::Serialize;

use crate::state::AppState;

/// One point in a chart data island.
///
/// Serialized into the page as JSON and drawn by `static/js/charts.js`;
/// labels arrive preformatted so the script never touches dates.
#[derive(Debug, Clone, Serialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

/// Create the auth routes router. Mounted at the root and rate limited
/// separately from the rest of the site.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route(
            "/verify-email",
            get(auth::verify_email_page).post(auth::verify_email),
        )
        .route("/verify-email/resend", post(auth::resend_verification))
        .route(
            "/forgot-password",
            get(auth::forgot_password_page).post(auth::forgot_password),
        )
        .route(
            "/reset-password",
            get(auth::reset_password_page).post(auth::reset_password),
        )
        .route("/logout", post(auth::logout))
}

/// Create the sensor routes router.
pub fn sensor_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(sensors::index))
        .route("/claim", get(sensors::claim_page).post(sensors::claim))
        .route("/{id}/rename", post(sensors::rename))
}

/// Create the socket routes router.
pub fn socket_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(sockets::index))
        .route("/compare", get(sockets::compare))
        .route("/{id}", get(sockets::show))
}

/// Create the automation routes router.
pub fn automation_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(automations::index).post(automations::create))
        .route("/new", get(automations::new_page))
        .route("/{id}", post(automations::update))
        .route("/{id}/edit", get(automations::edit_page))
        .route("/{id}/delete", post(automations::delete))
}

/// Create the shop routes router.
pub fn shop_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(shop::index))
        .route("/products/{id}", get(shop::product))
        .route("/subscriptions/{id}", get(shop::subscription))
}

/// Create the cart routes router. The count fragment lives in
/// [`fragment_routes`] so it can carry the API rate limit.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/products/{id}", post(cart::add_product))
        .route("/subscriptions/{id}", post(cart::add_subscription))
        .route("/items/{key}/quantity", post(cart::set_quantity))
        .route("/items/{key}/remove", post(cart::remove_item))
}

/// Create the fragment routes router: endpoints polled by page scripts.
pub fn fragment_routes() -> Router<AppState> {
    Router::new().route("/cart/count", get(cart::count))
}

/// Create all page routes. Auth and fragment routes are separate so the
/// binary can wrap them in their own rate limiters.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/profile", get(profile::show))
        .nest("/sensors", sensor_routes())
        .nest("/sockets", socket_routes())
        .nest("/automations", automation_routes())
        .route("/electricity", get(electricity::index))
        .nest("/shop", shop_routes())
        .nest("/cart", cart_routes())
        .route("/checkout", get(checkout::show).post(checkout::submit))
        .merge(pages::router())
}
