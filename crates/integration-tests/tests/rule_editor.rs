//! End-to-end tests for the automation rule editor pipeline:
//! API JSON -> form state -> edits -> API payload.

use garge_core::{Comparator, LogicalOperator, SensorId, SwitchAction, SwitchId};
use garge_web::garge::types::{AutomationRule, Sensor, Switch};
use garge_web::models::RuleForm;

fn sensor(id: i64, sensor_type: &str, name: &str) -> Sensor {
    Sensor {
        id: SensorId::new(id),
        sensor_type: Some(sensor_type.to_string()),
        custom_name: Some(name.to_string()),
        default_name: None,
        registration_code: None,
    }
}

fn switch(id: i64, switch_type: &str, name: &str) -> Switch {
    Switch {
        id: SwitchId::new(id),
        name: Some(name.to_string()),
        switch_type: Some(switch_type.to_string()),
    }
}

fn pairs(entries: &[(&str, &str)]) -> Vec<(String, String)> {
    entries
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

#[test]
fn legacy_rule_upgrades_to_multi_condition_payload_on_save() {
    // A rule created before the multi-condition editor existed.
    let rule: AutomationRule = serde_json::from_str(
        r#"{
            "id": 4,
            "targetId": 2,
            "action": "on",
            "sensorType": "temperature",
            "sensorId": 3,
            "condition": "<",
            "threshold": 5.0
        }"#,
    )
    .expect("legacy rule should deserialize");

    let form = RuleForm::from_rule(&rule);
    let payload = form
        .to_payload(
            &[switch(2, "socket", "Heater")],
            &[sensor(3, "temperature", "Greenhouse")],
        )
        .expect("prefilled form should resolve");

    let json = serde_json::to_value(&payload).expect("payload should serialize");
    assert_eq!(json["targetId"], 2);
    assert_eq!(json["targetType"], "socket");
    assert_eq!(json["logicalOperator"], "AND");
    assert_eq!(json["action"], "on");
    assert_eq!(json["conditions"].as_array().map(Vec::len), Some(1));
    assert_eq!(json["conditions"][0]["sensorId"], 3);
    assert_eq!(json["conditions"][0]["condition"], "<");
    assert!(json.get("sensorId").is_none(), "no legacy fields on write");
}

#[test]
fn modern_rule_round_trips_through_the_editor() {
    let rule: AutomationRule = serde_json::from_str(
        r#"{
            "id": 7,
            "targetId": 2,
            "targetType": "socket",
            "conditions": {"$values": [
                {"sensorType": "temperature", "sensorId": 3, "condition": ">=", "threshold": 21.0},
                {"sensorType": "electricity_price", "sensorId": -1, "condition": ">", "threshold": 2.5}
            ]},
            "logicalOperator": "OR",
            "action": "off"
        }"#,
    )
    .expect("enveloped rule should deserialize");

    let form = RuleForm::from_rule(&rule);
    assert_eq!(form.conditions.len(), 2);
    assert_eq!(form.logical_operator, LogicalOperator::Or);
    assert!(form.shows_operator());

    let payload = form
        .to_payload(
            &[switch(2, "socket", "Heater")],
            &[sensor(3, "temperature", "Greenhouse")],
        )
        .expect("round trip should resolve");

    assert_eq!(payload.conditions.len(), 2);
    assert_eq!(payload.conditions[0].condition, Comparator::Ge);
    assert_eq!(payload.conditions[1].sensor_id, SensorId::ELECTRICITY_PRICE);
    assert_eq!(payload.conditions[1].sensor_type, "electricity_price");
    assert_eq!(payload.action, SwitchAction::Off);
}

#[test]
fn form_submission_with_row_edits_builds_the_expected_payload() {
    // Simulates: fill one condition, press "add", fill the second, save.
    let mut form = RuleForm::from_pairs(&pairs(&[
        ("target_id", "2"),
        ("sensor_id", "3"),
        ("comparator", "<"),
        ("threshold", "5"),
    ]));
    form.add_condition();

    // The re-rendered form posts back with both rows populated.
    let resubmitted = RuleForm::from_pairs(&pairs(&[
        ("target_id", "2"),
        ("sensor_id", "3"),
        ("comparator", "<"),
        ("threshold", "5"),
        ("sensor_id", "-1"),
        ("comparator", "<="),
        ("threshold", "1.5"),
        ("logical_operator", "AND"),
        ("action", "on"),
    ]));

    let payload = resubmitted
        .to_payload(
            &[switch(2, "socket", "Heater")],
            &[sensor(3, "temperature", "Greenhouse")],
        )
        .expect("complete form should resolve");

    assert_eq!(payload.conditions.len(), 2);
    assert!((payload.conditions[1].threshold - 1.5).abs() < f64::EPSILON);
}

#[test]
fn incomplete_forms_come_back_with_inline_messages() {
    let no_target = RuleForm::from_pairs(&pairs(&[("sensor_id", "3")]));
    assert_eq!(
        no_target.to_payload(&[], &[]).unwrap_err(),
        "A target must be selected"
    );

    let no_sensor = RuleForm::from_pairs(&pairs(&[("target_id", "2")]));
    assert_eq!(
        no_sensor
            .to_payload(&[switch(2, "socket", "Heater")], &[])
            .unwrap_err(),
        "All conditions must have a sensor selected"
    );
}
