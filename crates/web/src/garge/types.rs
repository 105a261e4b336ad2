//! Wire records for the Garge API.
//!
//! Field names follow the API's camelCase JSON. Everything optional on the
//! wire is optional here; display fallbacks live on the types so templates
//! never deal with raw `Option`s.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use garge_core::{
    Comparator, LogicalOperator, OrderId, Price, ProductId, RuleId, SensorId, SubscriptionId,
    SwitchAction, SwitchId, SwitchState,
};

use super::wire::{ValueList, utc_timestamp};

// =============================================================================
// Auth
// =============================================================================

/// Response to a successful login or token refresh.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthToken {
    pub token: String,
}

/// Generic message body many auth endpoints return.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiMessage {
    #[serde(default)]
    pub message: Option<String>,
}

/// Registration payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub user_name: String,
    pub email: String,
    pub password: String,
}

/// Account profile as served by `/users/{sub}/profile`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub email_confirmed: Option<bool>,
}

impl UserProfile {
    /// Full name, falling back to the username, then the email.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.clone(),
            (None, Some(last)) => last.clone(),
            (None, None) => String::new(),
        };
        if !full.trim().is_empty() {
            return full;
        }
        if let Some(user_name) = &self.user_name {
            return user_name.clone();
        }
        self.email.clone().unwrap_or_default()
    }
}

// =============================================================================
// Sensors
// =============================================================================

/// A sensor claimed by the current user.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sensor {
    pub id: SensorId,
    #[serde(rename = "type", default)]
    pub sensor_type: Option<String>,
    #[serde(default)]
    pub custom_name: Option<String>,
    #[serde(default)]
    pub default_name: Option<String>,
    #[serde(default)]
    pub registration_code: Option<String>,
}

impl Sensor {
    /// Custom name, falling back to the factory name, then `Sensor {id}`.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.custom_name
            .as_deref()
            .or(self.default_name.as_deref())
            .map_or_else(|| format!("Sensor {}", self.id), ToOwned::to_owned)
    }
}

/// One timestamped reading.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    #[serde(with = "utc_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

// =============================================================================
// Switches
// =============================================================================

/// A switch ("socket") assigned to the current user.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Switch {
    pub id: SwitchId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub switch_type: Option<String>,
}

impl Switch {
    /// Name, falling back to `Socket {id}`.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.name
            .as_deref()
            .map_or_else(|| format!("Socket {}", self.id), ToOwned::to_owned)
    }
}

/// One timestamped state sample.
///
/// `switch_id` is only populated by the combined `/switches/data` endpoint,
/// which returns one flat list covering every requested switch.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchSample {
    #[serde(default)]
    pub switch_id: Option<SwitchId>,
    #[serde(with = "utc_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub value: String,
}

impl SwitchSample {
    /// The sample's value as a dashboard state.
    #[must_use]
    pub fn state(&self) -> SwitchState {
        SwitchState::from_value(&self.value)
    }
}

/// Current state of a switch: the sample with the latest timestamp wins;
/// no samples means [`SwitchState::Unknown`].
#[must_use]
pub fn current_state(samples: &[SwitchSample]) -> SwitchState {
    samples
        .iter()
        .max_by_key(|sample| sample.timestamp)
        .map_or(SwitchState::Unknown, SwitchSample::state)
}

// =============================================================================
// Automation rules
// =============================================================================

/// One threshold condition inside a rule.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationCondition {
    #[serde(default)]
    pub sensor_type: String,
    pub sensor_id: SensorId,
    pub condition: Comparator,
    pub threshold: f64,
}

/// A rule as served by `/automation`.
///
/// Older rules carry a single flat condition (`sensorType`/`sensorId`/
/// `condition`/`threshold`) instead of a condition list;
/// [`Self::effective_conditions`] migrates them on read.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationRule {
    pub id: RuleId,
    pub target_id: SwitchId,
    #[serde(default)]
    pub target_type: Option<String>,
    #[serde(default)]
    pub conditions: ValueList<AutomationCondition>,
    #[serde(default)]
    pub logical_operator: Option<LogicalOperator>,
    pub action: SwitchAction,
    #[serde(default)]
    pub sensor_type: Option<String>,
    #[serde(default)]
    pub sensor_id: Option<SensorId>,
    #[serde(default)]
    pub condition: Option<Comparator>,
    #[serde(default)]
    pub threshold: Option<f64>,
}

impl AutomationRule {
    /// Conditions in canonical form.
    ///
    /// Legacy flat rules become a one-element list; rules with neither shape
    /// yield an empty list.
    #[must_use]
    pub fn effective_conditions(&self) -> Vec<AutomationCondition> {
        if !self.conditions.is_empty() {
            return self.conditions.0.clone();
        }

        self.sensor_id.map_or_else(Vec::new, |sensor_id| {
            vec![AutomationCondition {
                sensor_type: self.sensor_type.clone().unwrap_or_default(),
                sensor_id,
                condition: self.condition.unwrap_or_default(),
                threshold: self.threshold.unwrap_or(0.0),
            }]
        })
    }

    /// The operator joining this rule's conditions; legacy rules default to AND.
    #[must_use]
    pub fn effective_operator(&self) -> LogicalOperator {
        self.logical_operator.unwrap_or_default()
    }
}

/// Payload for creating or updating a rule.
///
/// Always the canonical multi-condition shape; saving a legacy rule through
/// the editor upgrades it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RulePayload {
    pub target_type: String,
    pub target_id: SwitchId,
    pub conditions: Vec<AutomationCondition>,
    pub logical_operator: LogicalOperator,
    pub action: SwitchAction,
}

// =============================================================================
// Shop
// =============================================================================

/// A product in the shop catalog.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Product {
    /// Price with currency, ready for display.
    #[must_use]
    pub fn price_display(&self) -> Price {
        Price::new(self.price, self.currency.clone())
    }
}

/// A subscription plan in the shop catalog.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: SubscriptionId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub duration_months: Option<i32>,
    #[serde(default)]
    pub is_recurring: Option<bool>,
}

impl Subscription {
    /// Price with currency, ready for display.
    #[must_use]
    pub fn price_display(&self) -> Price {
        Price::new(self.price, self.currency.clone())
    }

    /// One-line term description (`12 months`, `Recurring`, or empty).
    #[must_use]
    pub fn term_display(&self) -> String {
        match (self.duration_months, self.is_recurring) {
            (Some(months), _) => format!("{months} months"),
            (None, Some(true)) => "Recurring".to_string(),
            _ => String::new(),
        }
    }
}

/// Order submission payload for `/orders`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub street: String,
    pub postal_code: String,
    pub city: String,
    pub products: Vec<OrderProductLine>,
    pub subscriptions: Vec<OrderSubscriptionLine>,
}

/// One product line in an order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderProductLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// One subscription line in an order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSubscriptionLine {
    pub subscription_id: SubscriptionId,
}

/// Whatever the API returns for a placed order; both fields are optional
/// so the confirmation page works with any deployment.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderReceipt {
    #[serde(default)]
    pub id: Option<OrderId>,
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// Electricity
// =============================================================================

/// Raw spot-price response: one series per price area.
#[derive(Debug, Clone, Deserialize)]
pub struct PriceSeriesResponse {
    #[serde(default)]
    pub areas: HashMap<String, AreaSeries>,
}

/// The series for one price area.
#[derive(Debug, Clone, Deserialize)]
pub struct AreaSeries {
    #[serde(default)]
    pub values: ValueList<PricePoint>,
}

/// One raw price point (per MWh, before VAT and unit conversion).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePoint {
    #[serde(with = "utc_timestamp")]
    pub start: DateTime<Utc>,
    pub value: f64,
}
