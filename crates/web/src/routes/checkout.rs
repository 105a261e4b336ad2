//! Checkout routes.
//!
//! One form, one POST. The order payload is built from the session cart and
//! submitted to the remote API; the cart is only cleared once the API has
//! accepted the order.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use garge_core::Email;

use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::garge::types::OrderRequest;
use crate::state::AppState;

use super::auth::FieldErrors;
use super::cart::{CartView, build_cart_view, get_cart, save_cart};

// =============================================================================
// Form Types
// =============================================================================

/// Checkout form data.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutForm {
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub street: String,
    pub postal_code: String,
    pub city: String,
}

fn require(value: &str, field: &'static str, label: &str, errors: &mut FieldErrors) {
    if value.trim().is_empty() {
        errors.push(field, format!("{label} is required."));
    }
}

fn validate_checkout(form: &CheckoutForm) -> FieldErrors {
    let mut errors = FieldErrors::default();
    require(&form.name, "name", "Name", &mut errors);
    if Email::parse(form.email.trim()).is_err() {
        errors.push("email", "Enter a valid email address.");
    }
    require(&form.mobile, "mobile", "Mobile number", &mut errors);
    require(&form.street, "street", "Street address", &mut errors);
    require(&form.postal_code, "postal_code", "Postal code", &mut errors);
    require(&form.city, "city", "City", &mut errors);
    errors
}

// =============================================================================
// Templates
// =============================================================================

/// Checkout form template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/form.html")]
pub struct CheckoutTemplate {
    pub cart: CartView,
    pub form: CheckoutForm,
    pub errors: FieldErrors,
    pub error: Option<String>,
}

/// Order confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/confirmation.html")]
pub struct ConfirmationTemplate {
    pub order_id: Option<String>,
    pub message: Option<String>,
    pub email: String,
}

// =============================================================================
// Routes
// =============================================================================

/// Checkout form; an empty cart has nothing to check out.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Response {
    let cart = get_cart(&session).await;
    if cart.is_empty() {
        return Redirect::to("/shop").into_response();
    }

    CheckoutTemplate {
        cart: build_cart_view(&state, &cart).await,
        form: CheckoutForm::default(),
        errors: FieldErrors::default(),
        error: None,
    }
    .into_response()
}

/// Validate, place the order, and clear the cart on success.
#[instrument(skip(state, session, form))]
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CheckoutForm>,
) -> Result<Response, AppError> {
    let mut cart = get_cart(&session).await;
    if cart.is_empty() {
        return Ok(Redirect::to("/shop").into_response());
    }

    let errors = validate_checkout(&form);
    if !errors.is_empty() {
        return Ok(CheckoutTemplate {
            cart: build_cart_view(&state, &cart).await,
            form,
            errors,
            error: None,
        }
        .into_response());
    }

    let item_count = cart.total_quantity();
    let (products, subscriptions) = cart.order_lines();
    let order = OrderRequest {
        name: form.name.trim().to_string(),
        email: form.email.trim().to_string(),
        mobile: form.mobile.trim().to_string(),
        street: form.street.trim().to_string(),
        postal_code: form.postal_code.trim().to_string(),
        city: form.city.trim().to_string(),
        products,
        subscriptions,
    };

    match state.garge().place_order(&order).await {
        Ok(receipt) => {
            cart.clear();
            save_cart(&session, &cart).await?;
            add_breadcrumb(
                "shop",
                "Placed order",
                Some(&[("items", &item_count.to_string())]),
            );
            tracing::info!(order_id = ?receipt.id, "Order placed");

            Ok(ConfirmationTemplate {
                order_id: receipt.id.map(|id| id.to_string()),
                message: receipt.message,
                email: order.email,
            }
            .into_response())
        }
        Err(e) => {
            tracing::warn!("Failed to place order: {e}");
            Ok(CheckoutTemplate {
                cart: build_cart_view(&state, &cart).await,
                form,
                errors: FieldErrors::default(),
                error: Some(e.user_message()),
            }
            .into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> CheckoutForm {
        CheckoutForm {
            name: "Kari Nordmann".to_string(),
            email: "kari@example.com".to_string(),
            mobile: "+47 99 88 77 66".to_string(),
            street: "Storgata 1".to_string(),
            postal_code: "0155".to_string(),
            city: "Oslo".to_string(),
        }
    }

    #[test]
    fn test_valid_form_passes() {
        assert!(validate_checkout(&valid_form()).is_empty());
    }

    #[test]
    fn test_every_field_is_required() {
        let errors = validate_checkout(&CheckoutForm::default());
        for field in ["name", "email", "mobile", "street", "postal_code", "city"] {
            assert!(!errors.for_field(field).is_empty(), "missing error: {field}");
        }
    }

    #[test]
    fn test_whitespace_only_is_empty() {
        let form = CheckoutForm {
            city: "   ".to_string(),
            ..valid_form()
        };
        assert_eq!(
            validate_checkout(&form).for_field("city"),
            vec!["City is required."]
        );
    }

    #[test]
    fn test_email_must_parse() {
        let form = CheckoutForm {
            email: "not-an-email".to_string(),
            ..valid_form()
        };
        assert_eq!(
            validate_checkout(&form).for_field("email"),
            vec!["Enter a valid email address."]
        );
    }
}
