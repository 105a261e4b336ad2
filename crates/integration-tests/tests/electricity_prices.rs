//! Tests for the spot-price pipeline: raw API series -> displayed series.

use chrono::{TimeZone, Utc};
use garge_web::garge::electricity::{
    PriceWindow, current_price, shape_series, to_kwh_price, window_end,
};
use garge_web::garge::types::{AreaSeries, PricePoint, PriceSeriesResponse};

fn point(day: u32, hour: u32, per_mwh: f64) -> PricePoint {
    PricePoint {
        start: Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).single().expect("valid date"),
        value: per_mwh,
    }
}

#[test]
fn todays_chart_covers_midnight_to_midnight_in_kwh_terms() {
    let now = Utc.with_ymd_and_hms(2024, 5, 15, 13, 30, 0).single().expect("valid date");
    let raw = vec![
        point(14, 23, 900.0), // yesterday, excluded
        point(15, 0, 800.0),
        point(15, 13, 1000.0),
        point(15, 23, 600.0), // published but not started, still shown
        point(16, 0, 700.0),  // tomorrow, excluded
    ];

    let shaped = shape_series(
        &raw,
        "NO2",
        PriceWindow::Today.start(now),
        window_end(now),
    );

    assert_eq!(shaped.len(), 3);
    // 800 NOK/MWh -> 1.00 NOK/kWh with 25% VAT in NO2.
    assert!((shaped[0].value - 1.0).abs() < 1e-9);
    assert!(shaped.windows(2).all(|w| w[0].start < w[1].start));
}

#[test]
fn current_price_is_the_latest_started_hour() {
    let now = Utc.with_ymd_and_hms(2024, 5, 15, 13, 30, 0).single().expect("valid date");
    let raw = vec![point(15, 12, 800.0), point(15, 13, 1200.0), point(15, 14, 400.0)];

    let current = current_price(&raw, "NO2", now).expect("a started point exists");
    assert!((current - to_kwh_price(1200.0, "NO2")).abs() < 1e-9);

    let early = Utc.with_ymd_and_hms(2024, 5, 15, 1, 0, 0).single().expect("valid date");
    assert!(current_price(&raw, "NO2", early).is_none());
}

#[test]
fn area_series_deserializes_the_api_envelope() {
    let response: PriceSeriesResponse = serde_json::from_str(
        r#"{
            "areas": {
                "NO2": {"values": {"$values": [
                    {"start": "2024-05-15T12:00:00", "value": 800.0}
                ]}}
            }
        }"#,
    )
    .expect("enveloped response should deserialize");

    let series: &AreaSeries = response.areas.get("NO2").expect("area present");
    assert_eq!(series.values.len(), 1);
    // The offset-less timestamp is read as UTC.
    assert_eq!(
        series.values[0].start,
        Utc.with_ymd_and_hms(2024, 5, 15, 12, 0, 0).single().expect("valid date")
    );
}
