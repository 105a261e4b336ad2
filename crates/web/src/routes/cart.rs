//! Cart route handlers.
//!
//! The cart itself lives in the session and stores only ids and quantities;
//! names and prices are joined against the cached catalog at render time.
//! Mutations are plain form posts that redirect back to the referring page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::{HeaderMap, header},
    response::Redirect,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use garge_core::{Price, ProductId, SubscriptionId};

use crate::error::AppError;
use crate::filters;
use crate::models::session::keys;
use crate::models::{Cart, CartLine};
use crate::state::AppState;

// =============================================================================
// View Types
// =============================================================================

/// One cart line, resolved against the catalog. Lines whose id has left the
/// catalog keep a placeholder name and no price so they can still be removed.
#[derive(Clone)]
pub struct CartItemView {
    /// Route key for mutations: `p{id}` for products, `s{id}` for subscriptions.
    pub key: String,
    pub name: String,
    pub detail: Option<String>,
    pub quantity: Option<u32>,
    pub unit_price: Option<String>,
    pub line_total: Option<String>,
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub total: Option<String>,
    pub count: u32,
}

impl CartView {
    /// Create an empty cart view.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: None,
            count: 0,
        }
    }
}

/// Resolve the session cart against the catalog.
///
/// Catalog fetch failures degrade to placeholder lines rather than hiding
/// the cart; the total covers priced lines only, with the currency taken
/// from the first priced line.
pub async fn build_cart_view(state: &AppState, cart: &Cart) -> CartView {
    if cart.is_empty() {
        return CartView::empty();
    }

    let (products, subscriptions) = tokio::join!(
        state.garge().products(),
        state.garge().subscriptions(),
    );
    let products = products.unwrap_or_else(|e| {
        tracing::warn!("Failed to fetch products for cart: {e}");
        Vec::new()
    });
    let subscriptions = subscriptions.unwrap_or_else(|e| {
        tracing::warn!("Failed to fetch subscriptions for cart: {e}");
        Vec::new()
    });

    let mut items = Vec::with_capacity(cart.lines.len());
    let mut total = Decimal::ZERO;
    let mut currency: Option<String> = None;
    let mut priced_any = false;

    for line in &cart.lines {
        match line {
            CartLine::Product { id, quantity } => {
                if let Some(product) = products.iter().find(|product| product.id == *id) {
                    let line_total = product.price * Decimal::from(*quantity);
                    total += line_total;
                    priced_any = true;
                    if currency.is_none() {
                        currency = product.currency.clone();
                    }
                    items.push(CartItemView {
                        key: format!("p{id}"),
                        name: product.name.clone(),
                        detail: None,
                        quantity: Some(*quantity),
                        unit_price: Some(product.price_display().to_string()),
                        line_total: Some(
                            Price::new(line_total, product.currency.clone()).to_string(),
                        ),
                    });
                } else {
                    items.push(CartItemView {
                        key: format!("p{id}"),
                        name: "Unavailable product".to_string(),
                        detail: None,
                        quantity: Some(*quantity),
                        unit_price: None,
                        line_total: None,
                    });
                }
            }
            CartLine::Subscription { id } => {
                if let Some(subscription) = subscriptions
                    .iter()
                    .find(|subscription| subscription.id == *id)
                {
                    total += subscription.price;
                    priced_any = true;
                    if currency.is_none() {
                        currency = subscription.currency.clone();
                    }
                    let term = subscription.term_display();
                    items.push(CartItemView {
                        key: format!("s{id}"),
                        name: subscription.name.clone(),
                        detail: (!term.is_empty()).then_some(term),
                        quantity: None,
                        unit_price: Some(subscription.price_display().to_string()),
                        line_total: Some(subscription.price_display().to_string()),
                    });
                } else {
                    items.push(CartItemView {
                        key: format!("s{id}"),
                        name: "Unavailable subscription".to_string(),
                        detail: None,
                        quantity: None,
                        unit_price: None,
                        line_total: None,
                    });
                }
            }
        }
    }

    CartView {
        items,
        total: priced_any.then(|| Price::new(total, currency).to_string()),
        count: cart.total_quantity(),
    }
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Get the cart from the session; a missing or unreadable cart is empty.
pub async fn get_cart(session: &Session) -> Cart {
    session
        .get::<Cart>(keys::CART)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Persist the cart to the session.
pub async fn save_cart(
    session: &Session,
    cart: &Cart,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(keys::CART, cart).await
}

// =============================================================================
// Helpers
// =============================================================================

/// A line key addresses one cart line in mutation routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKey {
    Product(ProductId),
    Subscription(SubscriptionId),
}

fn parse_line_key(key: &str) -> Option<LineKey> {
    let id = key.get(1..)?.parse::<i64>().ok()?;
    match key.as_bytes().first()? {
        b'p' => Some(LineKey::Product(ProductId::new(id))),
        b's' => Some(LineKey::Subscription(SubscriptionId::new(id))),
        _ => None,
    }
}

/// Where a cart mutation returns to: the referring page when it is one of
/// ours, otherwise the cart page.
fn back_target(headers: &HeaderMap) -> String {
    let Some(referer) = headers
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok())
    else {
        return "/cart".to_string();
    };

    if referer.starts_with('/') && !referer.starts_with("//") {
        return referer.to_string();
    }

    // Browsers send absolute referers; keep only path and query.
    if let Ok(parsed) = url::Url::parse(referer) {
        let mut target = parsed.path().to_string();
        if let Some(query) = parsed.query() {
            target.push('?');
            target.push_str(query);
        }
        return target;
    }

    "/cart".to_string()
}

/// Set-quantity form data.
#[derive(Debug, Deserialize)]
pub struct QuantityForm {
    pub quantity: u32,
}

// =============================================================================
// Templates
// =============================================================================

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub cart: CartView,
}

/// Cart count badge fragment, fetched by the nav script.
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

// =============================================================================
// Routes
// =============================================================================

/// Display the cart page.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> CartShowTemplate {
    let cart = get_cart(&session).await;
    CartShowTemplate {
        cart: build_cart_view(&state, &cart).await,
    }
}

/// Add one unit of a product.
#[instrument(skip(session, headers))]
pub async fn add_product(
    session: Session,
    headers: HeaderMap,
    Path(id): Path<ProductId>,
) -> Result<Redirect, AppError> {
    let mut cart = get_cart(&session).await;
    cart.add_product(id);
    save_cart(&session, &cart).await?;
    Ok(Redirect::to(&back_target(&headers)))
}

/// Add a subscription; re-adding one already in the cart is a no-op.
#[instrument(skip(session, headers))]
pub async fn add_subscription(
    session: Session,
    headers: HeaderMap,
    Path(id): Path<SubscriptionId>,
) -> Result<Redirect, AppError> {
    let mut cart = get_cart(&session).await;
    cart.add_subscription(id);
    save_cart(&session, &cart).await?;
    Ok(Redirect::to(&back_target(&headers)))
}

/// Set a product line's quantity. Quantities clamp to at least one;
/// removal stays a separate, explicit action.
#[instrument(skip(session, headers, form))]
pub async fn set_quantity(
    session: Session,
    headers: HeaderMap,
    Path(key): Path<String>,
    Form(form): Form<QuantityForm>,
) -> Result<Redirect, AppError> {
    let Some(line) = parse_line_key(&key) else {
        return Err(AppError::BadRequest(format!("unknown cart line `{key}`")));
    };

    if let LineKey::Product(id) = line {
        let mut cart = get_cart(&session).await;
        cart.set_quantity(id, form.quantity);
        save_cart(&session, &cart).await?;
    }

    Ok(Redirect::to(&back_target(&headers)))
}

/// Remove one cart line.
#[instrument(skip(session, headers))]
pub async fn remove_item(
    session: Session,
    headers: HeaderMap,
    Path(key): Path<String>,
) -> Result<Redirect, AppError> {
    let Some(line) = parse_line_key(&key) else {
        return Err(AppError::BadRequest(format!("unknown cart line `{key}`")));
    };

    let mut cart = get_cart(&session).await;
    match line {
        LineKey::Product(id) => cart.remove_product(id),
        LineKey::Subscription(id) => cart.remove_subscription(id),
    }
    save_cart(&session, &cart).await?;

    Ok(Redirect::to(&back_target(&headers)))
}

/// Cart count badge fragment for the nav.
#[instrument(skip(session))]
pub async fn count(session: Session) -> CartCountTemplate {
    let cart = get_cart(&session).await;
    CartCountTemplate {
        count: cart.total_quantity(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_parse_line_key() {
        assert_eq!(
            parse_line_key("p3"),
            Some(LineKey::Product(ProductId::new(3)))
        );
        assert_eq!(
            parse_line_key("s12"),
            Some(LineKey::Subscription(SubscriptionId::new(12)))
        );
        assert_eq!(parse_line_key("x3"), None);
        assert_eq!(parse_line_key("p"), None);
        assert_eq!(parse_line_key(""), None);
        assert_eq!(parse_line_key("pabc"), None);
    }

    #[test]
    fn test_back_target_keeps_local_path() {
        let mut headers = HeaderMap::new();
        headers.insert(header::REFERER, HeaderValue::from_static("/shop?page=2"));
        assert_eq!(back_target(&headers), "/shop?page=2");
    }

    #[test]
    fn test_back_target_strips_origin_from_absolute_referer() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::REFERER,
            HeaderValue::from_static("https://garge.example/shop/products/3"),
        );
        assert_eq!(back_target(&headers), "/shop/products/3");
    }

    #[test]
    fn test_back_target_defaults_to_cart() {
        assert_eq!(back_target(&HeaderMap::new()), "/cart");

        let mut headers = HeaderMap::new();
        headers.insert(header::REFERER, HeaderValue::from_static("//evil.example"));
        assert_eq!(back_target(&headers), "/cart");
    }
}
