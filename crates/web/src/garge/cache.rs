//! Cache types for API responses.

use super::types::{PricePoint, Product, Subscription};

/// Cached value types. Only catalog and spot-price responses are cached;
/// everything keyed to a user token is fetched fresh.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(Vec<Product>),
    Subscription(Box<Subscription>),
    Subscriptions(Vec<Subscription>),
    Prices(Vec<PricePoint>),
}
