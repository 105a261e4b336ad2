//! Spot-price page.
//!
//! One window at a time, selected with `?view=`. The chart series comes from
//! the API pre-aggregated at the window's resolution; the current price is
//! always derived from the hourly series.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Query, State};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::instrument;

use crate::filters;
use crate::garge::electricity::{
    PriceResolution, PriceWindow, current_price, shape_series, window_end,
};
use crate::garge::types::PricePoint;
use crate::middleware::RequireUser;
use crate::state::AppState;

use super::ChartPoint;

// =============================================================================
// View Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ElectricityQuery {
    pub view: Option<String>,
}

/// Min/max/average over the shown series, formatted for display.
pub struct PriceStats {
    pub min: String,
    pub max: String,
    pub avg: String,
}

/// Spot-price page template.
#[derive(Template, WebTemplate)]
#[template(path = "electricity.html")]
pub struct ElectricityTemplate {
    pub window: PriceWindow,
    pub windows: [PriceWindow; 4],
    pub area: String,
    pub currency: String,
    pub current: Option<String>,
    pub stats: Option<PriceStats>,
    pub points: Vec<ChartPoint>,
    pub error: Option<String>,
}

// =============================================================================
// Helpers
// =============================================================================

fn point_label(window: PriceWindow, timestamp: DateTime<Utc>) -> String {
    match window {
        PriceWindow::Today => timestamp.format("%H:%M").to_string(),
        PriceWindow::LastSevenDays | PriceWindow::ThisMonth => {
            timestamp.format("%d.%m").to_string()
        }
        PriceWindow::ThisYear => timestamp.format("%b").to_string(),
    }
}

#[allow(clippy::cast_precision_loss)]
fn series_stats(points: &[PricePoint]) -> Option<PriceStats> {
    if points.is_empty() {
        return None;
    }
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    for point in points {
        min = min.min(point.value);
        max = max.max(point.value);
        sum += point.value;
    }
    Some(PriceStats {
        min: format!("{min:.2}"),
        max: format!("{max:.2}"),
        avg: format!("{:.2}", sum / points.len() as f64),
    })
}

// =============================================================================
// Routes
// =============================================================================

/// Spot prices for the configured area, one window at a time.
#[instrument(skip(state, query))]
pub async fn index(
    State(state): State<AppState>,
    RequireUser(_user): RequireUser,
    Query(query): Query<ElectricityQuery>,
) -> ElectricityTemplate {
    let window = query
        .view
        .as_deref()
        .map_or(PriceWindow::Today, PriceWindow::from_view);
    let electricity = state.config().electricity.clone();
    let now = Utc::now();

    let raw = match state
        .garge()
        .electricity_prices(
            window.resolution(),
            &electricity.area,
            &electricity.currency,
            now,
        )
        .await
    {
        Ok(points) => points,
        Err(e) => {
            tracing::warn!("Failed to fetch electricity prices: {e}");
            return ElectricityTemplate {
                window,
                windows: PriceWindow::ALL,
                area: electricity.area,
                currency: electricity.currency,
                current: None,
                stats: None,
                points: Vec::new(),
                error: Some(e.user_message()),
            };
        }
    };

    let shaped = shape_series(&raw, &electricity.area, window.start(now), window_end(now));

    // The current price needs hourly points; every view but today fetches
    // its own (cached) hourly series for it.
    let current = if window == PriceWindow::Today {
        current_price(&raw, &electricity.area, now)
    } else {
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
            Ok(hourly) => current_price(&hourly, &electricity.area, now),
            Err(e) => {
                tracing::warn!("Failed to fetch hourly prices for current price: {e}");
                None
            }
        }
    };

    let stats = series_stats(&shaped);
    let points = shaped
        .iter()
        .map(|point| ChartPoint {
            label: point_label(window, point.start),
            value: point.value,
        })
        .collect();

    ElectricityTemplate {
        window,
        windows: PriceWindow::ALL,
        area: electricity.area,
        currency: electricity.currency,
        current: current.map(|price| format!("{price:.2}")),
        stats,
        points,
        error: None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn point(day: u32, hour: u32, value: f64) -> PricePoint {
        PricePoint {
            start: Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap(),
            value,
        }
    }

    #[test]
    fn test_point_label_per_window() {
        let timestamp = Utc.with_ymd_and_hms(2024, 5, 15, 13, 0, 0).unwrap();
        assert_eq!(point_label(PriceWindow::Today, timestamp), "13:00");
        assert_eq!(point_label(PriceWindow::LastSevenDays, timestamp), "15.05");
        assert_eq!(point_label(PriceWindow::ThisMonth, timestamp), "15.05");
        assert_eq!(point_label(PriceWindow::ThisYear, timestamp), "May");
    }

    #[test]
    fn test_series_stats() {
        let stats =
            series_stats(&[point(15, 10, 0.5), point(15, 11, 1.5), point(15, 12, 1.0)]).unwrap();
        assert_eq!(stats.min, "0.50");
        assert_eq!(stats.max, "1.50");
        assert_eq!(stats.avg, "1.00");
    }

    #[test]
    fn test_series_stats_empty() {
        assert!(series_stats(&[]).is_none());
    }
}
