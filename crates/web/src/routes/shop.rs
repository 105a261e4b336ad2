//! Shop catalog routes.
//!
//! The catalog is public and served from the client's cache of the remote
//! API; detail pages 404 when the API does not know the id.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, State};
use tracing::instrument;

use garge_core::{ProductId, SubscriptionId};

use crate::error::AppError;
use crate::filters;
use crate::garge::types::{Product, Subscription};
use crate::state::AppState;

// =============================================================================
// View Types
// =============================================================================

/// Catalog template with products and subscription plans.
#[derive(Template, WebTemplate)]
#[template(path = "shop/index.html")]
pub struct ShopTemplate {
    pub products: Vec<Product>,
    pub subscriptions: Vec<Subscription>,
    pub error: Option<String>,
}

/// Product detail template.
#[derive(Template, WebTemplate)]
#[template(path = "shop/product.html")]
pub struct ProductTemplate {
    pub product: Product,
}

/// Subscription detail template.
#[derive(Template, WebTemplate)]
#[template(path = "shop/subscription.html")]
pub struct SubscriptionTemplate {
    pub subscription: Subscription,
}

// =============================================================================
// Routes
// =============================================================================

/// The catalog: products and subscription plans side by side.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> ShopTemplate {
    let (products, subscriptions) = tokio::join!(
        state.garge().products(),
        state.garge().subscriptions(),
    );

    let mut error = None;
    let products = products.unwrap_or_else(|e| {
        tracing::warn!("Failed to fetch products: {e}");
        error = Some(e.user_message());
        Vec::new()
    });
    let subscriptions = subscriptions.unwrap_or_else(|e| {
        tracing::warn!("Failed to fetch subscriptions: {e}");
        error = Some(e.user_message());
        Vec::new()
    });

    ShopTemplate {
        products,
        subscriptions,
        error,
    }
}

/// Product detail page.
#[instrument(skip(state))]
pub async fn product(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<ProductTemplate, AppError> {
    let product = state.garge().product(id).await?;
    Ok(ProductTemplate { product })
}

/// Subscription detail page.
#[instrument(skip(state))]
pub async fn subscription(
    State(state): State<AppState>,
    Path(id): Path<SubscriptionId>,
) -> Result<SubscriptionTemplate, AppError> {
    let subscription = state.garge().subscription(id).await?;
    Ok(SubscriptionTemplate { subscription })
}
