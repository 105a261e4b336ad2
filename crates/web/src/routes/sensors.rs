//! Sensor route handlers.
//!
//! The index renders one card per sensor with a line chart of recent
//! readings; series are embedded as JSON data islands and drawn by the
//! first-party chart script. Claiming and renaming post back here.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Duration;
use futures::future::join_all;
use serde::Deserialize;
use tracing::instrument;

use garge_core::{SensorId, TimeRange};

use crate::error::AppError;
use crate::filters;
use crate::garge::types::{Sensor, SensorReading};
use crate::middleware::RequireUser;
use crate::state::AppState;

use super::ChartPoint;

/// Allowed auto-refresh intervals, in seconds.
const REFRESH_OPTIONS: [u32; 4] = [10, 30, 60, 300];

/// Interval used when the query asks for anything else.
const DEFAULT_REFRESH_SECS: u32 = 10;

// =============================================================================
// Query & Form Types
// =============================================================================

/// Query parameters for the sensor index.
#[derive(Debug, Deserialize)]
pub struct SensorsQuery {
    pub range: Option<String>,
    pub refresh: Option<u32>,
    pub error: Option<String>,
}

/// Claim form data.
#[derive(Debug, Deserialize)]
pub struct ClaimForm {
    pub registration_code: String,
    pub name: Option<String>,
}

/// Rename form data.
#[derive(Debug, Deserialize)]
pub struct RenameForm {
    pub name: String,
}

// =============================================================================
// View Types
// =============================================================================

/// One sensor card with chart data.
pub struct SensorCardView {
    pub id: SensorId,
    pub name: String,
    pub latest_value: String,
    pub latest_time: String,
    pub reading_count: usize,
    pub series: Vec<ChartPoint>,
}

/// A sensor without readings in the selected range.
pub struct SensorStubView {
    pub id: SensorId,
    pub name: String,
}

/// One auto-refresh choice in the toolbar.
pub struct RefreshOption {
    pub secs: u32,
    pub selected: bool,
}

/// Sensor index template.
#[derive(Template, WebTemplate)]
#[template(path = "sensors/index.html")]
pub struct SensorsTemplate {
    pub cards: Vec<SensorCardView>,
    pub no_data: Vec<SensorStubView>,
    pub range: String,
    pub refresh: u32,
    pub refresh_options: Vec<RefreshOption>,
    pub error: Option<String>,
}

/// Claim page template.
#[derive(Template, WebTemplate)]
#[template(path = "sensors/claim.html")]
pub struct ClaimTemplate {
    pub error: Option<String>,
    pub registration_code: String,
    pub name: String,
}

// =============================================================================
// Helpers
// =============================================================================

/// Parse the `range` query parameter, defaulting to 24 hours.
fn parse_range(raw: Option<&str>) -> Result<TimeRange, AppError> {
    raw.map(TimeRange::parse)
        .transpose()
        .map_err(|e| AppError::BadRequest(format!("invalid range: {e}")))
        .map(Option::unwrap_or_default)
}

/// Clamp the requested refresh interval to the supported set.
fn clamp_refresh(requested: Option<u32>) -> u32 {
    requested
        .filter(|value| REFRESH_OPTIONS.contains(value))
        .unwrap_or(DEFAULT_REFRESH_SECS)
}

/// Toolbar choices with the active interval marked.
fn refresh_choices(selected: u32) -> Vec<RefreshOption> {
    REFRESH_OPTIONS
        .iter()
        .map(|&secs| RefreshOption {
            secs,
            selected: secs == selected,
        })
        .collect()
}

/// Chart axis label for a reading: clock time inside two days, date beyond.
fn point_label(reading: &SensorReading, range: TimeRange) -> String {
    if range.duration() <= Duration::hours(48) {
        reading.timestamp.format("%H:%M").to_string()
    } else {
        reading.timestamp.format("%d.%m").to_string()
    }
}

/// Human text for the PRG error codes the mutation routes redirect with.
fn index_error_message(code: &str) -> String {
    match code {
        "name_required" => "Enter a name for the sensor.".to_string(),
        "rename_failed" => "Could not rename the sensor, please try again.".to_string(),
        _ => "Something went wrong, please try again.".to_string(),
    }
}

fn card_from_readings(sensor: &Sensor, mut readings: Vec<SensorReading>, range: TimeRange) -> SensorCardView {
    readings.sort_by_key(|r| r.timestamp);
    let latest = readings.last();
    SensorCardView {
        id: sensor.id,
        name: sensor.display_name(),
        latest_value: latest.map_or_else(String::new, |r| format!("{:.1}", r.value)),
        latest_time: latest
            .map_or_else(String::new, |r| r.timestamp.format("%d.%m %H:%M").to_string()),
        reading_count: readings.len(),
        series: readings
            .iter()
            .map(|r| ChartPoint {
                label: point_label(r, range),
                value: r.value,
            })
            .collect(),
    }
}

// =============================================================================
// Routes
// =============================================================================

/// Display all sensors with charts for the selected range.
#[instrument(skip(state, user, query))]
pub async fn index(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Query(query): Query<SensorsQuery>,
) -> Result<SensorsTemplate, AppError> {
    let range = parse_range(query.range.as_deref())?;
    let refresh = clamp_refresh(query.refresh);
    let error = query.error.as_deref().map(index_error_message);

    let sensors = match state.garge().sensors(&user.access_token).await {
        Ok(sensors) => sensors,
        Err(e) => {
            tracing::warn!("Failed to list sensors: {e}");
            return Ok(SensorsTemplate {
                cards: Vec::new(),
                no_data: Vec::new(),
                range: range.to_string(),
                refresh,
                refresh_options: refresh_choices(refresh),
                error: Some(e.user_message()),
            });
        }
    };

    // One concurrent fetch per sensor; a failed or empty fetch parks the
    // sensor in the "no data yet" list instead of sinking the page.
    let fetches = sensors.iter().map(|sensor| {
        state
            .garge()
            .sensor_data(&user.access_token, sensor.id, Some(range))
    });
    let results = join_all(fetches).await;

    let mut cards = Vec::new();
    let mut no_data = Vec::new();
    for (sensor, result) in sensors.iter().zip(results) {
        match result {
            Ok(readings) if !readings.is_empty() => {
                cards.push(card_from_readings(sensor, readings, range));
            }
            Ok(_) => no_data.push(SensorStubView {
                id: sensor.id,
                name: sensor.display_name(),
            }),
            Err(e) => {
                tracing::warn!(sensor_id = %sensor.id, "Failed to fetch readings: {e}");
                no_data.push(SensorStubView {
                    id: sensor.id,
                    name: sensor.display_name(),
                });
            }
        }
    }

    cards.sort_by_key(|card| card.name.to_lowercase());
    no_data.sort_by_key(|stub| stub.name.to_lowercase());

    Ok(SensorsTemplate {
        cards,
        no_data,
        range: range.to_string(),
        refresh,
        refresh_options: refresh_choices(refresh),
        error,
    })
}

/// Display the claim form.
pub async fn claim_page(RequireUser(_user): RequireUser) -> impl IntoResponse {
    ClaimTemplate {
        error: None,
        registration_code: String::new(),
        name: String::new(),
    }
}

/// Handle the claim form: bind a sensor to the account by its code.
#[instrument(skip(state, user, form))]
pub async fn claim(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Form(form): Form<ClaimForm>,
) -> Response {
    let code = form.registration_code.trim().to_string();
    let name = form
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(ToString::to_string);

    if code.is_empty() {
        return ClaimTemplate {
            error: Some("Enter the registration code printed on the sensor.".to_string()),
            registration_code: code,
            name: name.unwrap_or_default(),
        }
        .into_response();
    }

    match state
        .garge()
        .claim_sensor(&user.access_token, &code, name.as_deref())
        .await
    {
        Ok(sensor) => {
            tracing::info!(sensor_id = %sensor.id, "Claimed sensor");
            Redirect::to("/sensors").into_response()
        }
        Err(e) => {
            tracing::warn!("Failed to claim sensor: {e}");
            ClaimTemplate {
                error: Some(e.user_message()),
                registration_code: code,
                name: name.unwrap_or_default(),
            }
            .into_response()
        }
    }
}

/// Set a sensor's custom name, then return to the index.
#[instrument(skip(state, user, form))]
pub async fn rename(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<SensorId>,
    Form(form): Form<RenameForm>,
) -> Redirect {
    let name = form.name.trim();
    if name.is_empty() {
        return Redirect::to("/sensors?error=name_required");
    }

    match state.garge().rename_sensor(&user.access_token, id, name).await {
        Ok(_) => Redirect::to("/sensors"),
        Err(e) => {
            tracing::warn!(sensor_id = %id, "Failed to rename sensor: {e}");
            Redirect::to("/sensors?error=rename_failed")
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn reading(day: u32, hour: u32, value: f64) -> SensorReading {
        SensorReading {
            timestamp: Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap(),
            value,
        }
    }

    #[test]
    fn test_clamp_refresh() {
        assert_eq!(clamp_refresh(None), 10);
        assert_eq!(clamp_refresh(Some(30)), 30);
        assert_eq!(clamp_refresh(Some(300)), 300);
        assert_eq!(clamp_refresh(Some(7)), 10);
        assert_eq!(clamp_refresh(Some(0)), 10);
    }

    #[test]
    fn test_refresh_choices_mark_selected() {
        let choices = refresh_choices(60);
        assert_eq!(choices.len(), 4);
        assert!(choices.iter().any(|c| c.secs == 60 && c.selected));
        assert_eq!(choices.iter().filter(|c| c.selected).count(), 1);
    }

    #[test]
    fn test_parse_range_default_and_errors() {
        assert_eq!(parse_range(None).unwrap(), TimeRange::DEFAULT);
        assert_eq!(parse_range(Some("7d")).unwrap().to_string(), "7d");
        assert!(parse_range(Some("soon")).is_err());
    }

    #[test]
    fn test_point_label_switches_with_range() {
        let r = reading(15, 9, 1.0);
        assert_eq!(point_label(&r, TimeRange::parse("24h").unwrap()), "09:00");
        assert_eq!(point_label(&r, TimeRange::parse("7d").unwrap()), "15.05");
    }

    #[test]
    fn test_card_sorts_readings_and_picks_latest() {
        let sensor = Sensor {
            id: SensorId::new(4),
            sensor_type: Some("temperature".to_string()),
            custom_name: Some("Garage".to_string()),
            default_name: None,
            registration_code: None,
        };
        let readings = vec![reading(15, 12, 21.52), reading(15, 8, 19.0)];

        let card = card_from_readings(&sensor, readings, TimeRange::DEFAULT);
        assert_eq!(card.name, "Garage");
        assert_eq!(card.reading_count, 2);
        assert_eq!(card.latest_value, "21.5");
        assert_eq!(card.latest_time, "15.05 12:00");
        assert_eq!(card.series[0].label, "08:00");
    }
}
