//! Automation rule routes.
//!
//! The editor is a plain HTML form with repeating condition rows. Add and
//! remove buttons post back with an `intent` value and re-render the form
//! without touching the API; only Save resolves the form into a payload.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, RawForm, State},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;

use garge_core::{Comparator, LogicalOperator, RuleId, SwitchAction};

use crate::error::AppError;
use crate::filters;
use crate::garge::electricity::{PriceResolution, current_price};
use crate::garge::types::{Sensor, Switch};
use crate::middleware::RequireUser;
use crate::models::{RuleForm, SensorOption, condition_sensor_name, sensor_options, sorted_switches};
use crate::state::AppState;

// =============================================================================
// View Types
// =============================================================================

/// One condition line in the rules list.
pub struct ConditionView {
    pub sensor_name: String,
    pub comparator: &'static str,
    pub threshold: f64,
}

/// One rule in the list, resolved to display names.
pub struct RuleSummaryView {
    pub id: RuleId,
    pub target_name: String,
    pub conditions: Vec<ConditionView>,
    pub operator: &'static str,
    pub action: &'static str,
}

/// Rules list template.
#[derive(Template, WebTemplate)]
#[template(path = "automations/index.html")]
pub struct AutomationsTemplate {
    pub rules: Vec<RuleSummaryView>,
    pub error: Option<String>,
}

/// Rule editor template, shared by the new and edit pages.
#[derive(Template, WebTemplate)]
#[template(path = "automations/form.html")]
pub struct RuleEditorTemplate {
    pub title: &'static str,
    pub action_url: String,
    pub delete_url: Option<String>,
    pub form: RuleForm,
    pub switches: Vec<Switch>,
    pub sensors: Vec<SensorOption>,
    pub spot_price: Option<String>,
    pub comparators: [Comparator; 5],
    pub operators: [LogicalOperator; 2],
    pub actions: [SwitchAction; 2],
    pub error: Option<String>,
}

// =============================================================================
// Helpers
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct IndexQuery {
    pub error: Option<String>,
}

fn index_error_message(code: &str) -> String {
    match code {
        "delete_failed" => "Could not delete the rule. Please try again.".to_string(),
        "not_found" => "That rule no longer exists.".to_string(),
        _ => "Something went wrong. Please try again.".to_string(),
    }
}

/// Which button submitted the editor form.
enum EditorIntent {
    Save,
    AddCondition,
    RemoveCondition(usize),
}

fn editor_intent(pairs: &[(String, String)]) -> EditorIntent {
    for (key, value) in pairs {
        if key != "intent" {
            continue;
        }
        if value == "add" {
            return EditorIntent::AddCondition;
        }
        if let Some(index) = value.strip_prefix("remove:") {
            if let Ok(index) = index.parse() {
                return EditorIntent::RemoveCondition(index);
            }
        }
    }
    EditorIntent::Save
}

fn form_pairs(bytes: &[u8]) -> Vec<(String, String)> {
    url::form_urlencoded::parse(bytes)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
}

/// Dropdown data for the editor.
struct EditorContext {
    switches: Vec<Switch>,
    sensors: Vec<SensorOption>,
    sensor_list: Vec<Sensor>,
    spot_price: Option<String>,
}

async fn editor_context(state: &AppState, token: &str) -> Result<EditorContext, AppError> {
    let (switches, sensors) = tokio::join!(
        state.garge().switches(token),
        state.garge().sensors(token),
    );
    let switches = sorted_switches(&switches?);
    let sensor_list = sensors?;
    let sensors = sensor_options(&sensor_list);
    let spot_price = fetch_spot_price(state).await;
    Ok(EditorContext {
        switches,
        sensors,
        sensor_list,
        spot_price,
    })
}

/// Current spot price formatted for the editor, or `None` when unavailable.
/// A missing price never blocks the editor.
async fn fetch_spot_price(state: &AppState) -> Option<String> {
    let electricity = &state.config().electricity;
    let now = Utc::now();
    match state
        .garge()
        .electricity_prices(
            PriceResolution::Hourly,
            &electricity.area,
            &electricity.currency,
            now,
        )
        .await
    {
        Ok(points) => current_price(&points, &electricity.area, now)
            .map(|price| format!("{price:.2} {}/kWh", electricity.currency)),
        Err(e) => {
            tracing::warn!("Failed to fetch spot price for rule editor: {e}");
            None
        }
    }
}

fn editor(
    title: &'static str,
    action_url: String,
    delete_url: Option<String>,
    form: RuleForm,
    context: EditorContext,
    error: Option<String>,
) -> RuleEditorTemplate {
    RuleEditorTemplate {
        title,
        action_url,
        delete_url,
        form,
        switches: context.switches,
        sensors: context.sensors,
        spot_price: context.spot_price,
        comparators: Comparator::ALL,
        operators: [LogicalOperator::And, LogicalOperator::Or],
        actions: [SwitchAction::On, SwitchAction::Off],
        error,
    }
}

// =============================================================================
// Routes
// =============================================================================

/// List the user's automation rules.
#[instrument(skip(state, user, query))]
pub async fn index(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Query(query): Query<IndexQuery>,
) -> AutomationsTemplate {
    let error = query.error.as_deref().map(index_error_message);

    let (rules, switches, sensors) = tokio::join!(
        state.garge().automation_rules(&user.access_token),
        state.garge().switches(&user.access_token),
        state.garge().sensors(&user.access_token),
    );

    let rules = match rules {
        Ok(rules) => rules,
        Err(e) => {
            tracing::warn!("Failed to list automation rules: {e}");
            return AutomationsTemplate {
                rules: Vec::new(),
                error: Some(e.user_message()),
            };
        }
    };
    let switches = switches.unwrap_or_else(|e| {
        tracing::warn!("Failed to list switches for rule names: {e}");
        Vec::new()
    });
    let sensors = sensors.unwrap_or_else(|e| {
        tracing::warn!("Failed to list sensors for rule names: {e}");
        Vec::new()
    });

    let summaries = rules
        .iter()
        .map(|rule| RuleSummaryView {
            id: rule.id,
            target_name: switches
                .iter()
                .find(|switch| switch.id == rule.target_id)
                .map_or_else(|| format!("Socket {}", rule.target_id), Switch::display_name),
            conditions: rule
                .effective_conditions()
                .iter()
                .map(|condition| ConditionView {
                    sensor_name: condition_sensor_name(condition, &sensors),
                    comparator: condition.condition.as_str(),
                    threshold: condition.threshold,
                })
                .collect(),
            operator: rule.effective_operator().as_str(),
            action: rule.action.label(),
        })
        .collect();

    AutomationsTemplate {
        rules: summaries,
        error,
    }
}

/// Blank rule editor.
#[instrument(skip(state, user))]
pub async fn new_page(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<RuleEditorTemplate, AppError> {
    let context = editor_context(&state, &user.access_token).await?;
    Ok(editor(
        "New Rule",
        "/automations".to_string(),
        None,
        RuleForm::default(),
        context,
        None,
    ))
}

/// Handle the new-rule form: add/remove rows re-render, Save creates.
#[instrument(skip(state, user, body))]
pub async fn create(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    RawForm(body): RawForm,
) -> Result<Response, AppError> {
    let pairs = form_pairs(&body);
    let mut form = RuleForm::from_pairs(&pairs);

    match editor_intent(&pairs) {
        EditorIntent::AddCondition => form.add_condition(),
        EditorIntent::RemoveCondition(index) => form.remove_condition(index),
        EditorIntent::Save => {
            let context = editor_context(&state, &user.access_token).await?;
            let payload = match form.to_payload(&context.switches, &context.sensor_list) {
                Ok(payload) => payload,
                Err(message) => {
                    return Ok(editor(
                        "New Rule",
                        "/automations".to_string(),
                        None,
                        form,
                        context,
                        Some(message),
                    )
                    .into_response());
                }
            };
            return match state.garge().create_rule(&user.access_token, &payload).await {
                Ok(rule) => {
                    tracing::info!(rule_id = %rule.id, "Automation rule created");
                    Ok(Redirect::to("/automations").into_response())
                }
                Err(e) => {
                    tracing::warn!("Failed to create automation rule: {e}");
                    Ok(editor(
                        "New Rule",
                        "/automations".to_string(),
                        None,
                        form,
                        context,
                        Some(e.user_message()),
                    )
                    .into_response())
                }
            };
        }
    }

    let context = editor_context(&state, &user.access_token).await?;
    Ok(editor(
        "New Rule",
        "/automations".to_string(),
        None,
        form,
        context,
        None,
    )
    .into_response())
}

/// Editor prefilled from an existing rule.
#[instrument(skip(state, user))]
pub async fn edit_page(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<RuleId>,
) -> Result<RuleEditorTemplate, AppError> {
    let rules = state.garge().automation_rules(&user.access_token).await?;
    let rule = rules
        .iter()
        .find(|rule| rule.id == id)
        .ok_or_else(|| AppError::NotFound(format!("rule {id}")))?;

    let context = editor_context(&state, &user.access_token).await?;
    Ok(editor(
        "Edit Rule",
        format!("/automations/{id}"),
        Some(format!("/automations/{id}/delete")),
        RuleForm::from_rule(rule),
        context,
        None,
    ))
}

/// Handle the edit form: add/remove rows re-render, Save replaces the rule.
#[instrument(skip(state, user, body))]
pub async fn update(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<RuleId>,
    RawForm(body): RawForm,
) -> Result<Response, AppError> {
    let pairs = form_pairs(&body);
    let mut form = RuleForm::from_pairs(&pairs);
    let action_url = format!("/automations/{id}");
    let delete_url = Some(format!("/automations/{id}/delete"));

    match editor_intent(&pairs) {
        EditorIntent::AddCondition => form.add_condition(),
        EditorIntent::RemoveCondition(index) => form.remove_condition(index),
        EditorIntent::Save => {
            let context = editor_context(&state, &user.access_token).await?;
            let payload = match form.to_payload(&context.switches, &context.sensor_list) {
                Ok(payload) => payload,
                Err(message) => {
                    return Ok(editor(
                        "Edit Rule",
                        action_url,
                        delete_url,
                        form,
                        context,
                        Some(message),
                    )
                    .into_response());
                }
            };
            return match state
                .garge()
                .update_rule(&user.access_token, id, &payload)
                .await
            {
                Ok(_) => {
                    tracing::info!(rule_id = %id, "Automation rule updated");
                    Ok(Redirect::to("/automations").into_response())
                }
                Err(e) => {
                    tracing::warn!(rule_id = %id, "Failed to update automation rule: {e}");
                    Ok(editor(
                        "Edit Rule",
                        action_url,
                        delete_url,
                        form,
                        context,
                        Some(e.user_message()),
                    )
                    .into_response())
                }
            };
        }
    }

    let context = editor_context(&state, &user.access_token).await?;
    Ok(editor("Edit Rule", action_url, delete_url, form, context, None).into_response())
}

/// Delete a rule and return to the list.
#[instrument(skip(state, user))]
pub async fn delete(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<RuleId>,
) -> Redirect {
    match state.garge().delete_rule(&user.access_token, id).await {
        Ok(()) => {
            tracing::info!(rule_id = %id, "Automation rule deleted");
            Redirect::to("/automations")
        }
        Err(e) => {
            tracing::warn!(rule_id = %id, "Failed to delete automation rule: {e}");
            Redirect::to("/automations?error=delete_failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(entries: &[(&str, &str)]) -> Vec<(String, String)> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_editor_intent_defaults_to_save() {
        assert!(matches!(
            editor_intent(&pairs(&[("target_id", "2")])),
            EditorIntent::Save
        ));
        assert!(matches!(
            editor_intent(&pairs(&[("intent", "save")])),
            EditorIntent::Save
        ));
    }

    #[test]
    fn test_editor_intent_add_and_remove() {
        assert!(matches!(
            editor_intent(&pairs(&[("intent", "add")])),
            EditorIntent::AddCondition
        ));
        assert!(matches!(
            editor_intent(&pairs(&[("intent", "remove:2")])),
            EditorIntent::RemoveCondition(2)
        ));
        // A malformed index falls back to save rather than guessing a row.
        assert!(matches!(
            editor_intent(&pairs(&[("intent", "remove:x")])),
            EditorIntent::Save
        ));
    }

    #[test]
    fn test_form_pairs_decodes_url_encoding() {
        let decoded = form_pairs(b"threshold=2.5&comparator=%3C%3D");
        assert_eq!(decoded[0], ("threshold".to_string(), "2.5".to_string()));
        assert_eq!(decoded[1], ("comparator".to_string(), "<=".to_string()));
    }

    #[test]
    fn test_index_error_messages() {
        assert!(index_error_message("delete_failed").contains("delete"));
        assert!(index_error_message("weird").contains("Something went wrong"));
    }
}
