//! Tests for the session cart and the order payload it becomes at checkout.

use garge_core::{ProductId, SubscriptionId};
use garge_web::garge::types::OrderRequest;
use garge_web::models::Cart;

fn shopping_trip() -> Cart {
    let mut cart = Cart::default();
    cart.add_product(ProductId::new(1)); // temperature sensor
    cart.add_product(ProductId::new(1)); // a second one
    cart.add_product(ProductId::new(4)); // smart socket
    cart.add_subscription(SubscriptionId::new(9)); // premium plan
    cart
}

#[test]
fn cart_counts_and_lines_reflect_the_trip() {
    let cart = shopping_trip();
    assert_eq!(cart.lines.len(), 3, "repeat product shares a line");
    assert_eq!(cart.total_quantity(), 4);
}

#[test]
fn re_added_subscription_stays_unique_through_the_session_round_trip() {
    let mut cart = shopping_trip();
    cart.add_subscription(SubscriptionId::new(9));

    // The cart crosses the session store as JSON.
    let json = serde_json::to_string(&cart).expect("cart should serialize");
    let mut restored: Cart = serde_json::from_str(&json).expect("cart should deserialize");
    assert_eq!(restored.total_quantity(), 4);

    restored.add_subscription(SubscriptionId::new(9));
    assert_eq!(restored.total_quantity(), 4, "re-add is a no-op");
}

#[test]
fn order_payload_matches_the_api_wire_shape() {
    let cart = shopping_trip();
    let (products, subscriptions) = cart.order_lines();
    let order = OrderRequest {
        name: "Kari Nordmann".to_string(),
        email: "kari@example.com".to_string(),
        mobile: "+47 99 88 77 66".to_string(),
        street: "Storgata 1".to_string(),
        postal_code: "0155".to_string(),
        city: "Oslo".to_string(),
        products,
        subscriptions,
    };

    let json = serde_json::to_value(&order).expect("order should serialize");
    assert_eq!(json["postalCode"], "0155");
    assert_eq!(json["products"][0]["productId"], 1);
    assert_eq!(json["products"][0]["quantity"], 2);
    assert_eq!(json["products"][1]["productId"], 4);
    assert_eq!(json["subscriptions"][0]["subscriptionId"], 9);
}

#[test]
fn quantity_edits_clamp_and_removal_is_explicit() {
    let mut cart = shopping_trip();

    cart.set_quantity(ProductId::new(1), 0);
    assert_eq!(cart.total_quantity(), 3, "quantity clamps to one");

    cart.remove_product(ProductId::new(1));
    cart.remove_subscription(SubscriptionId::new(9));
    assert_eq!(cart.total_quantity(), 1);

    cart.clear();
    assert!(cart.is_empty());
}
