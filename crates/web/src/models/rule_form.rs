//! Form state for the automation rule editor.
//!
//! The editor is a plain HTML form: condition rows repeat the same field
//! names, and the add/remove buttons round-trip through the server. State
//! therefore lives in the submitted pairs, not in page script, and this
//! module turns those pairs back into a structured form.

use serde::{Deserialize, Serialize};

use garge_core::{Comparator, LogicalOperator, SensorId, SwitchAction, SwitchId};

use crate::garge::electricity::{PRICE_SENSOR_NAME, PRICE_SENSOR_TYPE};
use crate::garge::types::{AutomationCondition, AutomationRule, RulePayload, Sensor, Switch};

/// One condition row in the editor. `sensor_id` is `None` while the row
/// still shows "Select Sensor".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionRow {
    pub sensor_id: Option<SensorId>,
    pub comparator: Comparator,
    pub threshold: f64,
}

impl Default for ConditionRow {
    fn default() -> Self {
        Self {
            sensor_id: None,
            comparator: Comparator::default(),
            threshold: 0.0,
        }
    }
}

impl ConditionRow {
    /// Threshold input placeholder; the spot-price sensor hints at the unit.
    #[must_use]
    pub fn threshold_placeholder(&self) -> &'static str {
        if self.sensor_id == Some(SensorId::ELECTRICITY_PRICE) {
            "e.g., 3.0 (NOK/kWh)"
        } else {
            "Threshold"
        }
    }

    /// Whether this row's sensor select should mark `id` as selected.
    #[must_use]
    pub fn is_sensor(&self, id: SensorId) -> bool {
        self.sensor_id == Some(id)
    }
}

/// The whole editor form. Always carries at least one condition row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleForm {
    pub target_id: Option<SwitchId>,
    pub conditions: Vec<ConditionRow>,
    pub logical_operator: LogicalOperator,
    pub action: SwitchAction,
}

impl Default for RuleForm {
    fn default() -> Self {
        Self {
            target_id: None,
            conditions: vec![ConditionRow::default()],
            logical_operator: LogicalOperator::default(),
            action: SwitchAction::default(),
        }
    }
}

impl RuleForm {
    /// Rebuild the form from submitted pairs, in submission order.
    ///
    /// Condition fields repeat per row; rows are zipped positionally and
    /// missing values fall back to row defaults. Unknown keys are ignored.
    #[must_use]
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let mut form = Self {
            conditions: Vec::new(),
            ..Self::default()
        };
        let mut sensor_ids: Vec<Option<SensorId>> = Vec::new();
        let mut comparators: Vec<Comparator> = Vec::new();
        let mut thresholds: Vec<f64> = Vec::new();

        for (key, value) in pairs {
            match key.as_str() {
                "target_id" => form.target_id = parse_selection(value).map(SwitchId::new),
                "sensor_id" => sensor_ids.push(parse_selection(value).map(SensorId::new)),
                "comparator" => comparators.push(value.parse().unwrap_or_default()),
                "threshold" => thresholds.push(value.trim().parse().unwrap_or(0.0)),
                "logical_operator" => {
                    form.logical_operator = value.parse().unwrap_or_default();
                }
                "action" => form.action = value.parse().unwrap_or_default(),
                _ => {}
            }
        }

        let rows = sensor_ids
            .len()
            .max(comparators.len())
            .max(thresholds.len())
            .max(1);
        for index in 0..rows {
            form.conditions.push(ConditionRow {
                sensor_id: sensor_ids.get(index).copied().flatten(),
                comparator: comparators.get(index).copied().unwrap_or_default(),
                threshold: thresholds.get(index).copied().unwrap_or(0.0),
            });
        }

        form
    }

    /// Prefill the editor from an existing rule; legacy single-condition
    /// rules come back as one row.
    #[must_use]
    pub fn from_rule(rule: &AutomationRule) -> Self {
        let conditions = rule.effective_conditions();
        let rows = if conditions.is_empty() {
            vec![ConditionRow::default()]
        } else {
            conditions
                .into_iter()
                .map(|condition| ConditionRow {
                    sensor_id: Some(condition.sensor_id),
                    comparator: condition.condition,
                    threshold: condition.threshold,
                })
                .collect()
        };

        Self {
            target_id: Some(rule.target_id),
            conditions: rows,
            logical_operator: rule.effective_operator(),
            action: rule.action,
        }
    }

    /// Append an empty condition row.
    pub fn add_condition(&mut self) {
        self.conditions.push(ConditionRow::default());
    }

    /// Remove a condition row; the last remaining row always stays.
    pub fn remove_condition(&mut self, index: usize) {
        if self.conditions.len() > 1 && index < self.conditions.len() {
            self.conditions.remove(index);
        }
    }

    /// Whether the operator select should be shown at all.
    #[must_use]
    pub fn shows_operator(&self) -> bool {
        self.conditions.len() > 1
    }

    /// Whether the target select should mark `id` as selected.
    #[must_use]
    pub fn is_target(&self, id: SwitchId) -> bool {
        self.target_id == Some(id)
    }

    /// Resolve the form into the API payload, deriving the type strings
    /// from the current switch and sensor lists.
    ///
    /// # Errors
    ///
    /// Returns the message to show inline when the form is incomplete.
    pub fn to_payload(
        &self,
        switches: &[Switch],
        sensors: &[Sensor],
    ) -> Result<RulePayload, String> {
        let target_id = self
            .target_id
            .ok_or_else(|| "A target must be selected".to_string())?;
        let target_type = switches
            .iter()
            .find(|switch| switch.id == target_id)
            .and_then(|switch| switch.switch_type.clone())
            .unwrap_or_default();

        let mut conditions = Vec::with_capacity(self.conditions.len());
        for row in &self.conditions {
            let Some(sensor_id) = row.sensor_id else {
                return Err("All conditions must have a sensor selected".to_string());
            };
            let sensor_type = if sensor_id.is_electricity_price() {
                PRICE_SENSOR_TYPE.to_string()
            } else {
                sensors
                    .iter()
                    .find(|sensor| sensor.id == sensor_id)
                    .and_then(|sensor| sensor.sensor_type.clone())
                    .unwrap_or_default()
            };
            conditions.push(AutomationCondition {
                sensor_type,
                sensor_id,
                condition: row.comparator,
                threshold: row.threshold,
            });
        }

        Ok(RulePayload {
            target_type,
            target_id,
            conditions,
            logical_operator: self.logical_operator,
            action: self.action,
        })
    }
}

/// A `<select>` with a placeholder posts `0` (or nothing) for "no choice".
fn parse_selection(value: &str) -> Option<i64> {
    match value.trim().parse::<i64>() {
        Ok(0) | Err(_) => None,
        Ok(id) => Some(id),
    }
}

/// One entry in the editor's sensor dropdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorOption {
    pub id: SensorId,
    pub name: String,
}

/// Dropdown entries: the user's sensors sorted by name, with the virtual
/// spot-price sensor appended last.
#[must_use]
pub fn sensor_options(sensors: &[Sensor]) -> Vec<SensorOption> {
    let mut options: Vec<SensorOption> = sensors
        .iter()
        .map(|sensor| SensorOption {
            id: sensor.id,
            name: sensor.display_name(),
        })
        .collect();
    options.sort_by_key(|option| option.name.to_lowercase());
    options.push(SensorOption {
        id: SensorId::ELECTRICITY_PRICE,
        name: PRICE_SENSOR_NAME.to_string(),
    });
    options
}

/// Switches sorted by display name for the target dropdown.
#[must_use]
pub fn sorted_switches(switches: &[Switch]) -> Vec<Switch> {
    let mut sorted = switches.to_vec();
    sorted.sort_by_key(|switch| switch.display_name().to_lowercase());
    sorted
}

/// Name shown for a condition's sensor in the rules list.
#[must_use]
pub fn condition_sensor_name(condition: &AutomationCondition, sensors: &[Sensor]) -> String {
    if condition.sensor_id.is_electricity_price() {
        return PRICE_SENSOR_NAME.to_string();
    }
    sensors
        .iter()
        .find(|sensor| sensor.id == condition.sensor_id)
        .map_or_else(
            || format!("Sensor {}", condition.sensor_id),
            Sensor::display_name,
        )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn pairs(entries: &[(&str, &str)]) -> Vec<(String, String)> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

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

    #[test]
    fn test_from_pairs_builds_rows_in_order() {
        let form = RuleForm::from_pairs(&pairs(&[
            ("target_id", "2"),
            ("sensor_id", "3"),
            ("comparator", "<"),
            ("threshold", "5"),
            ("sensor_id", "-1"),
            ("comparator", ">="),
            ("threshold", "2.5"),
            ("logical_operator", "OR"),
            ("action", "off"),
        ]));

        assert_eq!(form.target_id, Some(SwitchId::new(2)));
        assert_eq!(form.conditions.len(), 2);
        assert_eq!(form.conditions[0].comparator, Comparator::Lt);
        assert_eq!(form.conditions[1].sensor_id, Some(SensorId::new(-1)));
        assert!((form.conditions[1].threshold - 2.5).abs() < f64::EPSILON);
        assert_eq!(form.logical_operator, LogicalOperator::Or);
        assert_eq!(form.action, SwitchAction::Off);
    }

    #[test]
    fn test_from_pairs_empty_submission_yields_one_blank_row() {
        let form = RuleForm::from_pairs(&[]);
        assert_eq!(form.conditions.len(), 1);
        assert_eq!(form.conditions[0], ConditionRow::default());
        assert!(form.target_id.is_none());
    }

    #[test]
    fn test_from_pairs_placeholder_selection_is_none() {
        let form = RuleForm::from_pairs(&pairs(&[("target_id", "0"), ("sensor_id", "0")]));
        assert!(form.target_id.is_none());
        assert!(form.conditions[0].sensor_id.is_none());
    }

    #[test]
    fn test_from_rule_migrates_legacy_shape() {
        let rule: AutomationRule = serde_json::from_str(
            r#"{
                "id": 7,
                "targetId": 2,
                "action": "off",
                "sensorType": "temperature",
                "sensorId": 3,
                "condition": "<=",
                "threshold": 2.5
            }"#,
        )
        .unwrap();

        let form = RuleForm::from_rule(&rule);
        assert_eq!(form.target_id, Some(SwitchId::new(2)));
        assert_eq!(form.conditions.len(), 1);
        assert_eq!(form.conditions[0].comparator, Comparator::Le);
        assert_eq!(form.logical_operator, LogicalOperator::And);
    }

    #[test]
    fn test_remove_condition_keeps_last_row() {
        let mut form = RuleForm::default();
        form.remove_condition(0);
        assert_eq!(form.conditions.len(), 1);

        form.add_condition();
        form.remove_condition(0);
        assert_eq!(form.conditions.len(), 1);
    }

    #[test]
    fn test_to_payload_requires_sensors_on_every_row() {
        let mut form = RuleForm {
            target_id: Some(SwitchId::new(2)),
            ..RuleForm::default()
        };
        form.conditions[0].sensor_id = Some(SensorId::new(3));
        form.add_condition();

        let err = form.to_payload(&[], &[]).unwrap_err();
        assert_eq!(err, "All conditions must have a sensor selected");
    }

    #[test]
    fn test_to_payload_requires_target() {
        let err = RuleForm::default().to_payload(&[], &[]).unwrap_err();
        assert_eq!(err, "A target must be selected");
    }

    #[test]
    fn test_to_payload_derives_type_strings() {
        let mut form = RuleForm {
            target_id: Some(SwitchId::new(2)),
            ..RuleForm::default()
        };
        form.conditions[0] = ConditionRow {
            sensor_id: Some(SensorId::new(3)),
            comparator: Comparator::Gt,
            threshold: 21.0,
        };
        form.add_condition();
        form.conditions[1].sensor_id = Some(SensorId::ELECTRICITY_PRICE);

        let payload = form
            .to_payload(
                &[switch(2, "socket", "Heater")],
                &[sensor(3, "temperature", "Greenhouse")],
            )
            .unwrap();

        assert_eq!(payload.target_type, "socket");
        assert_eq!(payload.conditions[0].sensor_type, "temperature");
        assert_eq!(payload.conditions[1].sensor_type, PRICE_SENSOR_TYPE);
    }

    #[test]
    fn test_sensor_options_sorted_with_price_last() {
        let options = sensor_options(&[
            sensor(1, "temperature", "zeta probe"),
            sensor(2, "humidity", "Alpha probe"),
        ]);

        assert_eq!(options[0].name, "Alpha probe");
        assert_eq!(options[1].name, "zeta probe");
        assert_eq!(options[2].id, SensorId::ELECTRICITY_PRICE);
        assert_eq!(options[2].name, PRICE_SENSOR_NAME);
    }

    #[test]
    fn test_condition_sensor_name_fallbacks() {
        let condition = AutomationCondition {
            sensor_type: String::new(),
            sensor_id: SensorId::new(9),
            condition: Comparator::Eq,
            threshold: 0.0,
        };
        assert_eq!(condition_sensor_name(&condition, &[]), "Sensor 9");

        let priced = AutomationCondition {
            sensor_id: SensorId::ELECTRICITY_PRICE,
            ..condition
        };
        assert_eq!(condition_sensor_name(&priced, &[]), PRICE_SENSOR_NAME);
    }

    #[test]
    fn test_threshold_placeholder_hints_price_unit() {
        let mut row = ConditionRow::default();
        assert_eq!(row.threshold_placeholder(), "Threshold");

        row.sensor_id = Some(SensorId::ELECTRICITY_PRICE);
        assert_eq!(row.threshold_placeholder(), "e.g., 3.0 (NOK/kWh)");
    }

    #[test]
    fn test_selection_helpers() {
        let mut form = RuleForm::default();
        assert!(!form.is_target(SwitchId::new(2)));
        form.target_id = Some(SwitchId::new(2));
        assert!(form.is_target(SwitchId::new(2)));
        assert!(!form.is_target(SwitchId::new(3)));

        let mut row = ConditionRow::default();
        assert!(!row.is_sensor(SensorId::new(1)));
        row.sensor_id = Some(SensorId::new(1));
        assert!(row.is_sensor(SensorId::new(1)));
    }
}
