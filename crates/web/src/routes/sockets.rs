//! Socket (switch) route handlers.
//!
//! Sockets render as an index of current states, a per-socket state history
//! (step chart + sample table), and an overlay comparison across several
//! sockets using the multi-switch endpoint's hourly averages.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::Redirect,
    response::Response,
};
use axum::response::IntoResponse;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use garge_core::{SwitchId, SwitchState, TimeRange};

use crate::error::AppError;
use crate::filters;
use crate::garge::types::{Switch, SwitchSample, current_state};
use crate::middleware::RequireUser;
use crate::state::AppState;

use super::ChartPoint;

// =============================================================================
// Query Types
// =============================================================================

/// Query parameters carrying an optional history range.
#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub range: Option<String>,
}

/// Query parameters for the comparison view.
#[derive(Debug, Deserialize)]
pub struct CompareQuery {
    /// Comma-separated switch ids.
    pub ids: Option<String>,
    pub range: Option<String>,
}

// =============================================================================
// View Types
// =============================================================================

/// One socket in the index, with its derived current state.
pub struct SocketCardView {
    pub id: SwitchId,
    pub name: String,
    pub state: SwitchState,
    pub last_seen: Option<String>,
}

/// One history row in the per-socket table.
pub struct SampleRow {
    pub time: String,
    pub state: &'static str,
}

/// One overlaid series in the comparison chart.
#[derive(Debug, Clone, Serialize)]
pub struct CompareSeries {
    pub name: String,
    pub points: Vec<ChartPoint>,
}

/// Socket index template.
#[derive(Template, WebTemplate)]
#[template(path = "sockets/index.html")]
pub struct SocketsTemplate {
    pub cards: Vec<SocketCardView>,
    pub error: Option<String>,
}

/// Per-socket history template.
#[derive(Template, WebTemplate)]
#[template(path = "sockets/show.html")]
pub struct SocketShowTemplate {
    pub id: SwitchId,
    pub name: String,
    pub range: String,
    pub series: Vec<ChartPoint>,
    pub rows: Vec<SampleRow>,
    pub error: Option<String>,
}

/// Comparison template.
#[derive(Template, WebTemplate)]
#[template(path = "sockets/compare.html")]
pub struct SocketCompareTemplate {
    pub series: Vec<CompareSeries>,
    pub range: String,
    pub error: Option<String>,
}

// =============================================================================
// Helpers
// =============================================================================

fn parse_range(raw: Option<&str>) -> Result<TimeRange, AppError> {
    raw.map(TimeRange::parse)
        .transpose()
        .map_err(|e| AppError::BadRequest(format!("invalid range: {e}")))
        .map(Option::unwrap_or_default)
}

/// Parse the comma-separated `ids` parameter.
fn parse_ids(raw: &str) -> Result<Vec<SwitchId>, AppError> {
    raw.split(',')
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| {
            chunk
                .parse::<i64>()
                .map(SwitchId::new)
                .map_err(|_| AppError::BadRequest(format!("invalid switch id: {chunk}")))
        })
        .collect()
}

/// Numeric chart level for a sample.
///
/// Averaged responses carry fractional duty cycles as numeric strings;
/// plain history carries on/off states. Unknown states are skipped.
fn sample_level(sample: &SwitchSample) -> Option<f64> {
    if let Ok(value) = sample.value.parse::<f64>() {
        return Some(value);
    }
    match sample.state() {
        SwitchState::On => Some(1.0),
        SwitchState::Off => Some(0.0),
        SwitchState::Unknown => None,
    }
}

fn step_points(samples: &[SwitchSample]) -> Vec<ChartPoint> {
    samples
        .iter()
        .filter_map(|sample| {
            sample_level(sample).map(|value| ChartPoint {
                label: sample.timestamp.format("%d.%m %H:%M").to_string(),
                value,
            })
        })
        .collect()
}

// =============================================================================
// Routes
// =============================================================================

/// List all sockets with their current state.
#[instrument(skip(state, user))]
pub async fn index(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> SocketsTemplate {
    let switches = match state.garge().switches(&user.access_token).await {
        Ok(switches) => switches,
        Err(e) => {
            tracing::warn!("Failed to list switches: {e}");
            return SocketsTemplate {
                cards: Vec::new(),
                error: Some(e.user_message()),
            };
        }
    };

    let fetches = switches
        .iter()
        .map(|switch| state.garge().switch_state(&user.access_token, switch.id));
    let results = join_all(fetches).await;

    let mut cards: Vec<SocketCardView> = switches
        .iter()
        .zip(results)
        .map(|(switch, result)| {
            let samples = result.unwrap_or_else(|e| {
                tracing::warn!(switch_id = %switch.id, "Failed to fetch state: {e}");
                Vec::new()
            });
            SocketCardView {
                id: switch.id,
                name: switch.display_name(),
                state: current_state(&samples),
                last_seen: samples
                    .iter()
                    .map(|sample| sample.timestamp)
                    .max()
                    .map(|ts| ts.format("%d.%m %H:%M").to_string()),
            }
        })
        .collect();
    cards.sort_by_key(|card| card.name.to_lowercase());

    SocketsTemplate { cards, error: None }
}

/// State history for one socket.
#[instrument(skip(state, user, query))]
pub async fn show(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<SwitchId>,
    Query(query): Query<RangeQuery>,
) -> Result<SocketShowTemplate, AppError> {
    let range = parse_range(query.range.as_deref())?;

    let (switches, data) = tokio::join!(
        state.garge().switches(&user.access_token),
        state.garge().switch_data(&user.access_token, id, range),
    );

    let name = switches
        .ok()
        .and_then(|list| list.into_iter().find(|s| s.id == id))
        .map_or_else(|| format!("Socket {id}"), |s| s.display_name());

    match data {
        Ok(mut samples) => {
            samples.sort_by_key(|sample| sample.timestamp);
            let series = step_points(&samples);
            let rows = samples
                .iter()
                .rev()
                .map(|sample| SampleRow {
                    time: sample.timestamp.format("%d.%m.%Y %H:%M").to_string(),
                    state: sample.state().as_str(),
                })
                .collect();
            Ok(SocketShowTemplate {
                id,
                name,
                range: range.to_string(),
                series,
                rows,
                error: None,
            })
        }
        Err(e) => {
            tracing::warn!(switch_id = %id, "Failed to fetch history: {e}");
            Ok(SocketShowTemplate {
                id,
                name,
                range: range.to_string(),
                series: Vec::new(),
                rows: Vec::new(),
                error: Some(e.user_message()),
            })
        }
    }
}

/// Overlay several sockets' hourly-averaged levels in one chart.
#[instrument(skip(state, user, query))]
pub async fn compare(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Query(query): Query<CompareQuery>,
) -> Result<Response, AppError> {
    let range = parse_range(query.range.as_deref())?;
    let ids = match query.ids.as_deref() {
        Some(raw) => parse_ids(raw)?,
        None => Vec::new(),
    };
    if ids.is_empty() {
        return Ok(Redirect::to("/sockets").into_response());
    }

    let (switches, grouped) = tokio::join!(
        state.garge().switches(&user.access_token),
        state
            .garge()
            .switches_data(&user.access_token, &ids, range, Some(true), Some("hour")),
    );
    let switches = switches.unwrap_or_else(|e| {
        tracing::warn!("Failed to list switches for naming: {e}");
        Vec::new()
    });

    match grouped {
        Ok(mut grouped) => {
            let mut series: Vec<CompareSeries> = ids
                .iter()
                .filter_map(|id| grouped.remove(id).map(|samples| (id, samples)))
                .map(|(id, mut samples)| {
                    samples.sort_by_key(|sample| sample.timestamp);
                    CompareSeries {
                        name: switch_name(&switches, *id),
                        points: samples
                            .iter()
                            .filter_map(|sample| {
                                sample_level(sample).map(|value| ChartPoint {
                                    label: sample.timestamp.format("%d.%m %H:00").to_string(),
                                    value,
                                })
                            })
                            .collect(),
                    }
                })
                .collect();
            series.sort_by_key(|s| s.name.to_lowercase());

            Ok(SocketCompareTemplate {
                series,
                range: range.to_string(),
                error: None,
            }
            .into_response())
        }
        Err(e) => {
            tracing::warn!("Failed to fetch comparison data: {e}");
            Ok(SocketCompareTemplate {
                series: Vec::new(),
                range: range.to_string(),
                error: Some(e.user_message()),
            }
            .into_response())
        }
    }
}

fn switch_name(switches: &[Switch], id: SwitchId) -> String {
    switches
        .iter()
        .find(|s| s.id == id)
        .map_or_else(|| format!("Socket {id}"), Switch::display_name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample(hour: u32, value: &str) -> SwitchSample {
        SwitchSample {
            switch_id: None,
            timestamp: Utc.with_ymd_and_hms(2024, 5, 15, hour, 0, 0).unwrap(),
            value: value.to_string(),
        }
    }

    #[test]
    fn test_parse_ids() {
        assert_eq!(
            parse_ids("1, 2,3").unwrap(),
            vec![SwitchId::new(1), SwitchId::new(2), SwitchId::new(3)]
        );
        assert!(parse_ids("1,x").is_err());
        assert!(parse_ids("").unwrap().is_empty());
    }

    #[test]
    fn test_sample_level_parses_averages_and_states() {
        assert_eq!(sample_level(&sample(1, "0.5")), Some(0.5));
        assert_eq!(sample_level(&sample(1, "on")), Some(1.0));
        assert_eq!(sample_level(&sample(1, "OFF")), Some(0.0));
        assert_eq!(sample_level(&sample(1, "???")), None);
    }

    #[test]
    fn test_step_points_skips_unknown() {
        let samples = vec![sample(8, "on"), sample(9, "???"), sample(10, "0")];
        let points = step_points(&samples);
        assert_eq!(points.len(), 2);
        assert!((points[0].value - 1.0).abs() < f64::EPSILON);
        assert!((points[1].value - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_switch_name_falls_back_to_id() {
        let switches = vec![Switch {
            id: SwitchId::new(2),
            name: Some("Heater".to_string()),
            switch_type: None,
        }];
        assert_eq!(switch_name(&switches, SwitchId::new(2)), "Heater");
        assert_eq!(switch_name(&switches, SwitchId::new(9)), "Socket 9");
    }
}
