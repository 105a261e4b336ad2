//! Garge REST API client.
//!
//! One method per endpoint, `reqwest` 0.13 underneath. Catalog and
//! spot-price responses are cached using `moka` (5-minute TTL); anything
//! fetched with a user token is not cached.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use reqwest::Method;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, instrument, warn};

use garge_core::{ProductId, RuleId, SensorId, SubscriptionId, SwitchId, TimeRange};

use crate::config::GargeApiConfig;

use super::GargeError;
use super::cache::CacheValue;
use super::electricity::PriceResolution;
use super::types::{
    ApiMessage, AuthToken, AutomationRule, OrderReceipt, OrderRequest, PricePoint,
    PriceSeriesResponse, Product, RegisterRequest, RulePayload, Sensor, SensorReading,
    Subscription, Switch, SwitchSample, UserProfile,
};
use super::wire::ValueList;

// =============================================================================
// GargeClient
// =============================================================================

/// Client for the Garge REST API.
///
/// Cheap to clone; all clones share one connection pool and cache.
#[derive(Clone)]
pub struct GargeClient {
    inner: Arc<GargeClientInner>,
}

struct GargeClientInner {
    client: reqwest::Client,
    base_url: String,
    cache: Cache<String, CacheValue>,
}

impl GargeClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &GargeApiConfig) -> Result<Self, GargeError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Ok(Self {
            inner: Arc::new(GargeClientInner {
                client,
                base_url: config.url.clone(),
                cache,
            }),
        })
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{path}", self.inner.base_url);
        self.inner.client.request(method, url)
    }

    /// Send a request and return the response body on success.
    ///
    /// Status handling is uniform across endpoints: 429 becomes
    /// [`GargeError::RateLimited`], 401 becomes [`GargeError::Unauthorized`],
    /// and any other non-success status becomes [`GargeError::Api`] with
    /// whatever message the body carried.
    async fn execute_text(&self, request: reqwest::RequestBuilder) -> Result<String, GargeError> {
        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(GargeError::RateLimited(retry_after));
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(GargeError::Unauthorized);
        }

        // Body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %response_text.chars().take(500).collect::<String>(),
                "Garge API returned non-success status"
            );
            return Err(GargeError::Api {
                status: status.as_u16(),
                message: extract_message(&response_text),
            });
        }

        Ok(response_text)
    }

    /// Execute a request and parse the JSON body.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, GargeError> {
        let response_text = self.execute_text(request).await?;
        parse_body(&response_text)
    }

    /// Like [`Self::execute`], but an empty success body parses as
    /// `T::default()`. Used where deployments disagree on whether the
    /// endpoint returns a body at all.
    async fn execute_or_default<T: DeserializeOwned + Default>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, GargeError> {
        let response_text = self.execute_text(request).await?;
        if response_text.trim().is_empty() {
            return Ok(T::default());
        }
        parse_body(&response_text)
    }

    /// Execute a request, discarding any response body.
    async fn execute_no_content(&self, request: reqwest::RequestBuilder) -> Result<(), GargeError> {
        self.execute_text(request).await.map(drop)
    }

    // =========================================================================
    // Auth
    // =========================================================================

    /// Exchange credentials for an access token.
    ///
    /// # Errors
    ///
    /// Returns [`GargeError::Unauthorized`] on bad credentials.
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthToken, GargeError> {
        let body = json!({ "email": email, "password": password });
        self.execute(self.request(Method::POST, "auth/login").json(&body))
            .await
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns an error if registration is rejected or the request fails.
    #[instrument(skip_all)]
    pub async fn register(&self, request: &RegisterRequest) -> Result<ApiMessage, GargeError> {
        self.execute_or_default(self.request(Method::POST, "auth/register").json(request))
            .await
    }

    /// Exchange a still-valid token for a fresh one.
    ///
    /// # Errors
    ///
    /// Returns [`GargeError::Unauthorized`] when the token is no longer
    /// accepted; callers should end the session.
    #[instrument(skip_all)]
    pub async fn refresh_token(&self, token: &str) -> Result<AuthToken, GargeError> {
        let body = json!({ "token": token });
        self.execute(self.request(Method::POST, "auth/refresh").json(&body))
            .await
    }

    /// Ask for a fresh verification mail.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the address or the request fails.
    #[instrument(skip_all)]
    pub async fn resend_email_verification(&self, email: &str) -> Result<ApiMessage, GargeError> {
        let body = json!({ "email": email });
        self.execute_or_default(
            self.request(Method::POST, "auth/resend-email-verification")
                .json(&body),
        )
        .await
    }

    /// Confirm an email address with the mailed code.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is rejected or the request fails.
    #[instrument(skip_all)]
    pub async fn verify_email(&self, email: &str, code: &str) -> Result<ApiMessage, GargeError> {
        let body = json!({ "email": email, "code": code });
        self.execute_or_default(self.request(Method::POST, "auth/verify-email").json(&body))
            .await
    }

    /// Ask for a password reset code.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the address or the request fails.
    #[instrument(skip_all)]
    pub async fn request_password_reset(&self, email: &str) -> Result<ApiMessage, GargeError> {
        let body = json!({ "email": email });
        self.execute_or_default(
            self.request(Method::POST, "auth/request-password-reset")
                .json(&body),
        )
        .await
    }

    /// Set a new password using a mailed reset code.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is rejected or the request fails.
    #[instrument(skip_all)]
    pub async fn reset_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<ApiMessage, GargeError> {
        let body = json!({ "email": email, "code": code, "newPassword": new_password });
        self.execute_or_default(self.request(Method::POST, "auth/reset-password").json(&body))
            .await
    }

    // =========================================================================
    // Profile
    // =========================================================================

    /// Fetch the profile for the subject of the given token.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn user_profile(&self, token: &str, sub: &str) -> Result<UserProfile, GargeError> {
        let path = format!("users/{}/profile", urlencoding::encode(sub));
        self.execute(self.request(Method::GET, &path).bearer_auth(token))
            .await
    }

    // =========================================================================
    // Sensors
    // =========================================================================

    /// List the user's sensors.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn sensors(&self, token: &str) -> Result<Vec<Sensor>, GargeError> {
        let list: ValueList<Sensor> = self
            .execute(self.request(Method::GET, "sensor").bearer_auth(token))
            .await?;
        Ok(list.into_inner())
    }

    /// Fetch readings for one sensor, optionally limited to a history window.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(sensor_id = %sensor_id))]
    pub async fn sensor_data(
        &self,
        token: &str,
        sensor_id: SensorId,
        time_range: Option<TimeRange>,
    ) -> Result<Vec<SensorReading>, GargeError> {
        let path = format!("sensor/{sensor_id}/data");
        let mut request = self.request(Method::GET, &path).bearer_auth(token);
        if let Some(range) = time_range {
            request = request.query(&[("timeRange", range.to_string())]);
        }
        let list: ValueList<SensorReading> = self.execute(request).await?;
        Ok(list.into_inner())
    }

    /// Claim a sensor by registration code, optionally naming it.
    ///
    /// Returns the claimed sensor as the API recorded it.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is unknown, already claimed, or the
    /// request fails.
    #[instrument(skip(self, token, registration_code, custom_name))]
    pub async fn claim_sensor(
        &self,
        token: &str,
        registration_code: &str,
        custom_name: Option<&str>,
    ) -> Result<Sensor, GargeError> {
        let mut body = json!({ "registrationCode": registration_code });
        if let Some(name) = custom_name {
            body["customName"] = json!(name);
        }
        self.execute(
            self.request(Method::POST, "sensor/claim")
                .bearer_auth(token)
                .json(&body),
        )
        .await
    }

    /// Set a sensor's custom name.
    ///
    /// Returns the updated sensor.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token, custom_name), fields(sensor_id = %sensor_id))]
    pub async fn rename_sensor(
        &self,
        token: &str,
        sensor_id: SensorId,
        custom_name: &str,
    ) -> Result<Sensor, GargeError> {
        let path = format!("sensor/{sensor_id}/name");
        let body = json!({ "customName": custom_name });
        self.execute(
            self.request(Method::PUT, &path)
                .bearer_auth(token)
                .json(&body),
        )
        .await
    }

    // =========================================================================
    // Switches
    // =========================================================================

    /// List the user's switches.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn switches(&self, token: &str) -> Result<Vec<Switch>, GargeError> {
        let list: ValueList<Switch> = self
            .execute(self.request(Method::GET, "switches").bearer_auth(token))
            .await?;
        Ok(list.into_inner())
    }

    /// Fetch the state samples behind a switch's current state.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(switch_id = %switch_id))]
    pub async fn switch_state(
        &self,
        token: &str,
        switch_id: SwitchId,
    ) -> Result<Vec<SwitchSample>, GargeError> {
        let path = format!("switches/{switch_id}/state");
        let list: ValueList<SwitchSample> = self
            .execute(self.request(Method::GET, &path).bearer_auth(token))
            .await?;
        Ok(list.into_inner())
    }

    /// Fetch state samples for one switch over a time range.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(switch_id = %switch_id, time_range = %time_range))]
    pub async fn switch_data(
        &self,
        token: &str,
        switch_id: SwitchId,
        time_range: TimeRange,
    ) -> Result<Vec<SwitchSample>, GargeError> {
        let path = format!("switches/{switch_id}/data");
        let list: ValueList<SwitchSample> = self
            .execute(
                self.request(Method::GET, &path)
                    .bearer_auth(token)
                    .query(&[("timeRange", time_range.to_string())]),
            )
            .await?;
        Ok(list.into_inner())
    }

    /// Fetch state samples for several switches at once, grouped by switch.
    ///
    /// The endpoint returns one flat list with a `switchId` on each sample;
    /// samples missing it are dropped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token, switch_ids), fields(count = switch_ids.len(), time_range = %time_range))]
    pub async fn switches_data(
        &self,
        token: &str,
        switch_ids: &[SwitchId],
        time_range: TimeRange,
        average: Option<bool>,
        group_by: Option<&str>,
    ) -> Result<HashMap<SwitchId, Vec<SwitchSample>>, GargeError> {
        let mut params: Vec<(String, String)> =
            vec![("timeRange".to_string(), time_range.to_string())];
        for (index, id) in switch_ids.iter().enumerate() {
            params.push((format!("switchIds[{index}]"), id.to_string()));
        }
        if let Some(average) = average {
            params.push(("average".to_string(), average.to_string()));
        }
        if let Some(group_by) = group_by {
            params.push(("groupBy".to_string(), group_by.to_string()));
        }

        let list: ValueList<SwitchSample> = self
            .execute(
                self.request(Method::GET, "switches/data")
                    .bearer_auth(token)
                    .query(&params),
            )
            .await?;

        Ok(group_switch_samples(list.into_inner()))
    }

    // =========================================================================
    // Automation rules
    // =========================================================================

    /// List the user's automation rules.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn automation_rules(&self, token: &str) -> Result<Vec<AutomationRule>, GargeError> {
        let list: ValueList<AutomationRule> = self
            .execute(self.request(Method::GET, "automation").bearer_auth(token))
            .await?;
        Ok(list.into_inner())
    }

    /// Create an automation rule.
    ///
    /// # Errors
    ///
    /// Returns an error if the rule is rejected or the request fails.
    #[instrument(skip(self, token, payload))]
    pub async fn create_rule(
        &self,
        token: &str,
        payload: &RulePayload,
    ) -> Result<AutomationRule, GargeError> {
        self.execute(
            self.request(Method::POST, "automation")
                .bearer_auth(token)
                .json(payload),
        )
        .await
    }

    /// Replace an automation rule.
    ///
    /// # Errors
    ///
    /// Returns an error if the rule is rejected or the request fails.
    #[instrument(skip(self, token, payload), fields(rule_id = %rule_id))]
    pub async fn update_rule(
        &self,
        token: &str,
        rule_id: RuleId,
        payload: &RulePayload,
    ) -> Result<AutomationRule, GargeError> {
        let path = format!("automation/{rule_id}");
        self.execute(
            self.request(Method::PUT, &path)
                .bearer_auth(token)
                .json(payload),
        )
        .await
    }

    /// Delete an automation rule.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(rule_id = %rule_id))]
    pub async fn delete_rule(&self, token: &str, rule_id: RuleId) -> Result<(), GargeError> {
        let path = format!("automation/{rule_id}");
        self.execute_no_content(self.request(Method::DELETE, &path).bearer_auth(token))
            .await
    }

    // =========================================================================
    // Shop
    // =========================================================================

    /// List the product catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn products(&self) -> Result<Vec<Product>, GargeError> {
        let cache_key = "products".to_string();

        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let list: ValueList<Product> = self.execute(self.request(Method::GET, "products")).await?;
        let products = list.into_inner();

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns [`GargeError::NotFound`] for unknown ids.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn product(&self, product_id: ProductId) -> Result<Product, GargeError> {
        let cache_key = format!("product:{product_id}");

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let path = format!("products/{product_id}");
        let product: Product = match self.execute(self.request(Method::GET, &path)).await {
            Ok(product) => product,
            Err(GargeError::Api { status: 404, .. }) => {
                return Err(GargeError::NotFound(format!("Product {product_id}")));
            }
            Err(err) => return Err(err),
        };

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// List the subscription catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn subscriptions(&self) -> Result<Vec<Subscription>, GargeError> {
        let cache_key = "subscriptions".to_string();

        if let Some(CacheValue::Subscriptions(subscriptions)) =
            self.inner.cache.get(&cache_key).await
        {
            debug!("Cache hit for subscriptions");
            return Ok(subscriptions);
        }

        let list: ValueList<Subscription> = self
            .execute(self.request(Method::GET, "subscriptions"))
            .await?;
        let subscriptions = list.into_inner();

        self.inner
            .cache
            .insert(cache_key, CacheValue::Subscriptions(subscriptions.clone()))
            .await;

        Ok(subscriptions)
    }

    /// Get a subscription by id.
    ///
    /// # Errors
    ///
    /// Returns [`GargeError::NotFound`] for unknown ids.
    #[instrument(skip(self), fields(subscription_id = %subscription_id))]
    pub async fn subscription(
        &self,
        subscription_id: SubscriptionId,
    ) -> Result<Subscription, GargeError> {
        let cache_key = format!("subscription:{subscription_id}");

        if let Some(CacheValue::Subscription(subscription)) =
            self.inner.cache.get(&cache_key).await
        {
            debug!("Cache hit for subscription");
            return Ok(*subscription);
        }

        let path = format!("subscriptions/{subscription_id}");
        let subscription: Subscription = match self.execute(self.request(Method::GET, &path)).await
        {
            Ok(subscription) => subscription,
            Err(GargeError::Api { status: 404, .. }) => {
                return Err(GargeError::NotFound(format!(
                    "Subscription {subscription_id}"
                )));
            }
            Err(err) => return Err(err),
        };

        self.inner
            .cache
            .insert(
                cache_key,
                CacheValue::Subscription(Box::new(subscription.clone())),
            )
            .await;

        Ok(subscription)
    }

    /// Submit an order.
    ///
    /// # Errors
    ///
    /// Returns an error if the order is rejected or the request fails.
    #[instrument(skip(self, order))]
    pub async fn place_order(&self, order: &OrderRequest) -> Result<OrderReceipt, GargeError> {
        self.execute_or_default(self.request(Method::POST, "orders").json(order))
            .await
    }

    // =========================================================================
    // Electricity
    // =========================================================================

    /// Fetch raw spot prices for one price area.
    ///
    /// Values are per MWh before VAT; see
    /// [`super::electricity::to_kwh_price`] for the user-facing conversion.
    /// Responses are cached per resolution, area, currency, and date.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(resolution = resolution.as_str(), area = %area))]
    pub async fn electricity_prices(
        &self,
        resolution: PriceResolution,
        area: &str,
        currency: &str,
        date: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>, GargeError> {
        let cache_key = format!(
            "prices:{}:{area}:{currency}:{}",
            resolution.as_str(),
            date.format("%Y-%m-%d")
        );

        if let Some(CacheValue::Prices(points)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for prices");
            return Ok(points);
        }

        let response: PriceSeriesResponse = self
            .execute(self.request(Method::GET, "electricity/prices").query(&[
                ("type", resolution.as_str()),
                ("area", area),
                ("currency", currency),
                ("date", &date.to_rfc3339()),
            ]))
            .await?;

        let points = response
            .areas
            .get(area)
            .map(|series| series.values.0.clone())
            .unwrap_or_else(|| {
                warn!(area = %area, "Price response has no series for requested area");
                Vec::new()
            });

        self.inner
            .cache
            .insert(cache_key, CacheValue::Prices(points.clone()))
            .await;

        Ok(points)
    }

    // =========================================================================
    // Health
    // =========================================================================

    /// Probe the API. Any HTTP response counts as reachable; only transport
    /// failures are errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the API cannot be reached at all.
    pub async fn ping(&self) -> Result<(), GargeError> {
        self.inner
            .client
            .get(&self.inner.base_url)
            .send()
            .await
            .map(drop)
            .map_err(GargeError::Http)
    }

    // =========================================================================
    // Cache Management
    // =========================================================================

    /// Invalidate all cached data.
    pub async fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }
}

/// Parse a JSON body, logging the (truncated) payload on failure.
fn parse_body<T: DeserializeOwned>(response_text: &str) -> Result<T, GargeError> {
    match serde_json::from_str(response_text) {
        Ok(value) => Ok(value),
        Err(e) => {
            tracing::error!(
                error = %e,
                body = %response_text.chars().take(500).collect::<String>(),
                "Failed to parse Garge API response"
            );
            Err(GargeError::Parse(e))
        }
    }
}

/// Best-effort error message from a failure body. The API mostly returns
/// `{"message": ...}`, but proxies and framework defaults also show up.
fn extract_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error", "title"] {
            if let Some(message) = value.get(key).and_then(|v| v.as_str()) {
                if !message.is_empty() {
                    return message.to_string();
                }
            }
        }
    }
    body.trim().chars().take(200).collect()
}

/// Group a flat sample list by the switch each sample belongs to.
fn group_switch_samples(samples: Vec<SwitchSample>) -> HashMap<SwitchId, Vec<SwitchSample>> {
    let mut grouped: HashMap<SwitchId, Vec<SwitchSample>> = HashMap::new();
    for sample in samples {
        match sample.switch_id {
            Some(switch_id) => grouped.entry(switch_id).or_default().push(sample),
            None => warn!("Dropping switch sample without a switchId"),
        }
    }
    grouped
}
