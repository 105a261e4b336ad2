//! Session-stored shopping cart.
//!
//! The cart keeps only ids and quantities; names and prices are joined
//! against the catalog at render time so stale carts pick up price changes.

use serde::{Deserialize, Serialize};

use garge_core::{ProductId, SubscriptionId};

use crate::garge::types::{OrderProductLine, OrderSubscriptionLine};

/// One cart entry, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CartLine {
    Product { id: ProductId, quantity: u32 },
    Subscription { id: SubscriptionId },
}

/// The cart itself. Products can repeat in quantity but occupy one line;
/// each subscription appears at most once.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cart {
    pub lines: Vec<CartLine>,
}

impl Cart {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Badge count: product quantities plus one per subscription.
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.lines
            .iter()
            .map(|line| match line {
                CartLine::Product { quantity, .. } => *quantity,
                CartLine::Subscription { .. } => 1,
            })
            .sum()
    }

    /// Add one unit of a product; an existing line gains quantity instead
    /// of a duplicate line.
    pub fn add_product(&mut self, product_id: ProductId) {
        for line in &mut self.lines {
            if let CartLine::Product { id, quantity } = line {
                if *id == product_id {
                    *quantity += 1;
                    return;
                }
            }
        }
        self.lines.push(CartLine::Product {
            id: product_id,
            quantity: 1,
        });
    }

    /// Add a subscription. Only one of each is allowed; re-adding is a no-op.
    pub fn add_subscription(&mut self, subscription_id: SubscriptionId) {
        let exists = self
            .lines
            .iter()
            .any(|line| matches!(line, CartLine::Subscription { id } if *id == subscription_id));
        if !exists {
            self.lines.push(CartLine::Subscription {
                id: subscription_id,
            });
        }
    }

    pub fn remove_product(&mut self, product_id: ProductId) {
        self.lines
            .retain(|line| !matches!(line, CartLine::Product { id, .. } if *id == product_id));
    }

    pub fn remove_subscription(&mut self, subscription_id: SubscriptionId) {
        self.lines
            .retain(|line| !matches!(line, CartLine::Subscription { id } if *id == subscription_id));
    }

    pub fn increase_quantity(&mut self, product_id: ProductId) {
        self.with_product(product_id, |quantity| quantity + 1);
    }

    /// Decrease a product's quantity, never below one. Removal is explicit.
    pub fn decrease_quantity(&mut self, product_id: ProductId) {
        self.with_product(product_id, |quantity| quantity.saturating_sub(1).max(1));
    }

    /// Set a product's quantity, clamped to at least one.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: u32) {
        self.with_product(product_id, |_| quantity.max(1));
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    fn with_product(&mut self, product_id: ProductId, update: impl Fn(u32) -> u32) {
        for line in &mut self.lines {
            if let CartLine::Product { id, quantity } = line {
                if *id == product_id {
                    *quantity = update(*quantity);
                }
            }
        }
    }

    /// Split into the order payload's line shapes.
    #[must_use]
    pub fn order_lines(&self) -> (Vec<OrderProductLine>, Vec<OrderSubscriptionLine>) {
        let products = self
            .lines
            .iter()
            .filter_map(|line| match line {
                CartLine::Product { id, quantity } => Some(OrderProductLine {
                    product_id: *id,
                    quantity: *quantity,
                }),
                CartLine::Subscription { .. } => None,
            })
            .collect();
        let subscriptions = self
            .lines
            .iter()
            .filter_map(|line| match line {
                CartLine::Subscription { id } => Some(OrderSubscriptionLine {
                    subscription_id: *id,
                }),
                CartLine::Product { .. } => None,
            })
            .collect();
        (products, subscriptions)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_add_product_increments_existing_line() {
        let mut cart = Cart::default();
        cart.add_product(ProductId::new(1));
        cart.add_product(ProductId::new(2));
        cart.add_product(ProductId::new(1));

        assert_eq!(cart.lines.len(), 2);
        assert_eq!(
            cart.lines[0],
            CartLine::Product {
                id: ProductId::new(1),
                quantity: 2
            }
        );
        assert_eq!(cart.total_quantity(), 3);
    }

    #[test]
    fn test_add_subscription_is_unique() {
        let mut cart = Cart::default();
        cart.add_subscription(SubscriptionId::new(9));
        cart.add_subscription(SubscriptionId::new(9));

        assert_eq!(cart.lines.len(), 1);
    }

    #[test]
    fn test_insertion_order_is_preserved() {
        let mut cart = Cart::default();
        cart.add_product(ProductId::new(1));
        cart.add_subscription(SubscriptionId::new(9));
        cart.add_product(ProductId::new(2));

        assert!(matches!(cart.lines[1], CartLine::Subscription { .. }));
    }

    #[test]
    fn test_decrease_quantity_floors_at_one() {
        let mut cart = Cart::default();
        cart.add_product(ProductId::new(1));
        cart.decrease_quantity(ProductId::new(1));

        assert_eq!(
            cart.lines[0],
            CartLine::Product {
                id: ProductId::new(1),
                quantity: 1
            }
        );
    }

    #[test]
    fn test_set_quantity_clamps_to_one() {
        let mut cart = Cart::default();
        cart.add_product(ProductId::new(1));
        cart.set_quantity(ProductId::new(1), 0);
        assert_eq!(cart.total_quantity(), 1);

        cart.set_quantity(ProductId::new(1), 12);
        assert_eq!(cart.total_quantity(), 12);
    }

    #[test]
    fn test_remove_by_kind_and_id() {
        let mut cart = Cart::default();
        cart.add_product(ProductId::new(1));
        cart.add_subscription(SubscriptionId::new(1));
        cart.remove_product(ProductId::new(1));

        assert_eq!(cart.lines.len(), 1);
        assert!(matches!(cart.lines[0], CartLine::Subscription { .. }));
    }

    #[test]
    fn test_order_lines_split() {
        let mut cart = Cart::default();
        cart.add_product(ProductId::new(1));
        cart.add_product(ProductId::new(1));
        cart.add_subscription(SubscriptionId::new(9));

        let (products, subscriptions) = cart.order_lines();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].quantity, 2);
        assert_eq!(subscriptions.len(), 1);
    }

    #[test]
    fn test_round_trips_through_session_json() {
        let mut cart = Cart::default();
        cart.add_product(ProductId::new(3));
        cart.add_subscription(SubscriptionId::new(7));

        let json = serde_json::to_string(&cart).unwrap();
        let back: Cart = serde_json::from_str(&json).unwrap();
        assert_eq!(back.lines, cart.lines);
    }
}
