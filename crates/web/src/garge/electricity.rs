//! Spot-price shaping.
//!
//! The API serves raw day-ahead prices per MWh, one series per price area.
//! Everything user-facing is NOK/kWh with VAT where it applies, so the
//! conversion lives here in one place.

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, Utc};

use super::types::PricePoint;

/// Southern Norway price areas carry 25% VAT on electricity; NO4 historically
/// tracked the same multiplier in the upstream data.
const VAT_AREAS: [&str; 4] = ["NO1", "NO2", "NO3", "NO4"];

/// Sensor name shown wherever the virtual spot-price source is selectable.
pub const PRICE_SENSOR_NAME: &str = "Electricity Price (NOK/kWh)";

/// Sensor type string carried by rules conditioned on the spot price.
pub const PRICE_SENSOR_TYPE: &str = "electricity_price";

/// Aggregation level understood by the prices endpoint's `type` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceResolution {
    Hourly,
    Daily,
    Monthly,
}

impl PriceResolution {
    /// Wire value for the `type` query parameter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hourly => "HOURLY",
            Self::Daily => "DAILY",
            Self::Monthly => "MONTHLY",
        }
    }
}

/// One section of the prices page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceWindow {
    Today,
    LastSevenDays,
    ThisMonth,
    ThisYear,
}

impl PriceWindow {
    /// View order, left to right.
    pub const ALL: [Self; 4] = [
        Self::Today,
        Self::LastSevenDays,
        Self::ThisMonth,
        Self::ThisYear,
    ];

    /// Section heading.
    #[must_use]
    pub const fn heading(self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::LastSevenDays => "Last 7 Days",
            Self::ThisMonth => "This Month",
            Self::ThisYear => "This Year",
        }
    }

    /// The `?view=` query value selecting this window.
    #[must_use]
    pub const fn view(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::LastSevenDays => "week",
            Self::ThisMonth => "month",
            Self::ThisYear => "year",
        }
    }

    /// Window for a `?view=` query value; anything unrecognized shows today.
    #[must_use]
    pub fn from_view(view: &str) -> Self {
        match view.trim() {
            "week" => Self::LastSevenDays,
            "month" => Self::ThisMonth,
            "year" => Self::ThisYear,
            _ => Self::Today,
        }
    }

    /// Resolution to request for this window. The API pre-aggregates, so the
    /// weekly and monthly views ask for daily values and the yearly view for
    /// monthly ones.
    #[must_use]
    pub const fn resolution(self) -> PriceResolution {
        match self {
            Self::Today => PriceResolution::Hourly,
            Self::LastSevenDays | Self::ThisMonth => PriceResolution::Daily,
            Self::ThisYear => PriceResolution::Monthly,
        }
    }

    /// Inclusive start of the window.
    #[must_use]
    pub fn start(self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.date_naive();
        let date = match self {
            Self::Today => today,
            Self::LastSevenDays => today - Days::new(7),
            Self::ThisMonth => today.with_day(1).unwrap_or(today),
            Self::ThisYear => {
                NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today)
            }
        };
        day_start(date)
    }
}

/// Exclusive end of every window: the coming midnight. The API publishes
/// tomorrow's day-ahead prices in the afternoon, so asking up to end of day
/// keeps today's chart complete without leaking the next day in.
#[must_use]
pub fn window_end(now: DateTime<Utc>) -> DateTime<Utc> {
    day_start(now.date_naive() + Days::new(1))
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// VAT multiplier for a price area.
#[must_use]
pub fn vat_multiplier(area: &str) -> f64 {
    if VAT_AREAS.contains(&area) { 1.25 } else { 1.0 }
}

/// Raw per-MWh value to a user-facing per-kWh price, VAT included.
#[must_use]
pub fn to_kwh_price(raw: f64, area: &str) -> f64 {
    raw * vat_multiplier(area) / 1000.0
}

/// Points inside `[start, end)`, converted to per-kWh and sorted by time.
#[must_use]
pub fn shape_series(
    points: &[PricePoint],
    area: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<PricePoint> {
    let mut shaped: Vec<PricePoint> = points
        .iter()
        .filter(|point| point.start >= start && point.start < end)
        .map(|point| PricePoint {
            start: point.start,
            value: to_kwh_price(point.value, area),
        })
        .collect();
    shaped.sort_by_key(|point| point.start);
    shaped
}

/// The price in effect right now: the latest point that has started, in
/// per-kWh terms. `None` when the series has no started points yet.
#[must_use]
pub fn current_price(points: &[PricePoint], area: &str, now: DateTime<Utc>) -> Option<f64> {
    points
        .iter()
        .filter(|point| point.start <= now)
        .max_by_key(|point| point.start)
        .map(|point| to_kwh_price(point.value, area))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn point(hour: u32, value: f64) -> PricePoint {
        PricePoint {
            start: Utc.with_ymd_and_hms(2024, 5, 15, hour, 0, 0).unwrap(),
            value,
        }
    }

    #[test]
    fn test_vat_applies_to_southern_areas_only() {
        assert!((vat_multiplier("NO1") - 1.25).abs() < f64::EPSILON);
        assert!((vat_multiplier("NO4") - 1.25).abs() < f64::EPSILON);
        assert!((vat_multiplier("NO5") - 1.0).abs() < f64::EPSILON);
        assert!((vat_multiplier("SE3") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_to_kwh_price_converts_and_taxes() {
        // 800 NOK/MWh in NO2 -> 1.00 NOK/kWh after VAT.
        assert!((to_kwh_price(800.0, "NO2") - 1.0).abs() < 1e-9);
        assert!((to_kwh_price(800.0, "NO5") - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_window_bounds() {
        let now = Utc.with_ymd_and_hms(2024, 5, 15, 13, 45, 0).unwrap();

        assert_eq!(
            PriceWindow::Today.start(now),
            Utc.with_ymd_and_hms(2024, 5, 15, 0, 0, 0).unwrap()
        );
        assert_eq!(
            PriceWindow::LastSevenDays.start(now),
            Utc.with_ymd_and_hms(2024, 5, 8, 0, 0, 0).unwrap()
        );
        assert_eq!(
            PriceWindow::ThisMonth.start(now),
            Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            PriceWindow::ThisYear.start(now),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            window_end(now),
            Utc.with_ymd_and_hms(2024, 5, 16, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_window_resolutions() {
        assert_eq!(PriceWindow::Today.resolution().as_str(), "HOURLY");
        assert_eq!(PriceWindow::LastSevenDays.resolution().as_str(), "DAILY");
        assert_eq!(PriceWindow::ThisMonth.resolution().as_str(), "DAILY");
        assert_eq!(PriceWindow::ThisYear.resolution().as_str(), "MONTHLY");
    }

    #[test]
    fn test_view_round_trip() {
        for window in PriceWindow::ALL {
            assert_eq!(PriceWindow::from_view(window.view()), window);
        }
        assert_eq!(PriceWindow::from_view("yesterday"), PriceWindow::Today);
        assert_eq!(PriceWindow::from_view(" week "), PriceWindow::LastSevenDays);
    }

    #[test]
    fn test_shape_series_filters_converts_and_sorts() {
        let now = Utc.with_ymd_and_hms(2024, 5, 15, 13, 0, 0).unwrap();
        let points = vec![
            point(12, 500.0),
            point(10, 400.0),
            PricePoint {
                start: Utc.with_ymd_and_hms(2024, 5, 14, 23, 0, 0).unwrap(),
                value: 999.0,
            },
        ];

        let shaped = shape_series(
            &points,
            "NO2",
            PriceWindow::Today.start(now),
            window_end(now),
        );

        assert_eq!(shaped.len(), 2);
        assert_eq!(shaped[0].start, point(10, 0.0).start);
        assert!((shaped[0].value - 0.5).abs() < 1e-9);
        assert!((shaped[1].value - 0.625).abs() < 1e-9);
    }

    #[test]
    fn test_current_price_latest_started_point() {
        let now = Utc.with_ymd_and_hms(2024, 5, 15, 12, 30, 0).unwrap();
        let points = vec![point(10, 400.0), point(12, 500.0), point(14, 900.0)];

        let price = current_price(&points, "NO2", now).unwrap();
        assert!((price - 0.625).abs() < 1e-9);
    }

    #[test]
    fn test_current_price_empty_series() {
        let now = Utc.with_ymd_and_hms(2024, 5, 15, 12, 30, 0).unwrap();
        assert_eq!(current_price(&[], "NO2", now), None);

        // A series that only has future points has no current price either.
        let future = vec![point(14, 900.0)];
        assert_eq!(current_price(&future, "NO2", now), None);
    }
}
