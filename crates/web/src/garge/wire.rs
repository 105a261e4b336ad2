//! Tolerance for the remote API's .NET serializer quirks.
//!
//! Two things vary between API deployments and have to be absorbed here:
//!
//! 1. Arrays are sometimes wrapped in a reference-preserving envelope
//!    (`{"$values": [...]}`), sometimes nested under `data` or an
//!    OData-style `value`, and sometimes plain. [`ValueList`]
//!    deserializes all four forms.
//! 2. Timestamps sometimes arrive without a UTC offset
//!    (`2024-05-01T12:00:00`). [`utc_timestamp`] reads both RFC 3339 and
//!    naive forms, treating naive values as UTC.

use std::ops::Deref;

use serde::{Deserialize, Deserializer, Serialize};

/// A list that tolerates every envelope the API is known to produce.
///
/// Serializes back as a plain array; the envelope is read-side only.
/// `#[serde(default)]` on a `ValueList` field makes an absent list empty.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(transparent)]
pub struct ValueList<T>(pub Vec<T>);

impl<T> ValueList<T> {
    /// Unwrap into the inner vector.
    #[must_use]
    pub fn into_inner(self) -> Vec<T> {
        self.0
    }
}

impl<T> Default for ValueList<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> From<Vec<T>> for ValueList<T> {
    fn from(values: Vec<T>) -> Self {
        Self(values)
    }
}

impl<T> Deref for ValueList<T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> IntoIterator for ValueList<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a ValueList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<'de, T> Deserialize<'de> for ValueList<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Envelope<T> {
            Wrapped {
                #[serde(rename = "$values")]
                values: Vec<T>,
            },
            Data {
                data: Vec<T>,
            },
            Value {
                value: Vec<T>,
            },
            Bare(Vec<T>),
        }

        let envelope = Envelope::deserialize(deserializer)?;
        Ok(Self(match envelope {
            Envelope::Wrapped { values }
            | Envelope::Data { data: values }
            | Envelope::Value { value: values }
            | Envelope::Bare(values) => values,
        }))
    }
}

/// Serde adapter for API timestamps that may lack a UTC offset.
///
/// Use as `#[serde(with = "crate::garge::wire::utc_timestamp")]`.
pub mod utc_timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Parse an API timestamp, interpreting offset-less values as UTC.
    ///
    /// # Errors
    ///
    /// Returns the naive-format parse error when neither form matches.
    pub fn parse(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").map(|naive| naive.and_utc())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(serde::de::Error::custom)
    }

    #[allow(clippy::trivially_copy_pass_by_ref)] // signature fixed by serde
    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Reading {
        value: f64,
    }

    #[test]
    fn test_value_list_bare_array() {
        let list: ValueList<Reading> = serde_json::from_str(r#"[{"value": 1.5}]"#).unwrap();
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_value_list_dotnet_envelope() {
        let list: ValueList<Reading> =
            serde_json::from_str(r#"{"$id": "1", "$values": [{"value": 1.5}, {"value": 2.0}]}"#)
                .unwrap();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_value_list_data_envelope() {
        let list: ValueList<Reading> =
            serde_json::from_str(r#"{"data": [{"value": 3.0}]}"#).unwrap();
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_value_list_odata_envelope() {
        let list: ValueList<Reading> =
            serde_json::from_str(r#"{"value": [{"value": 3.0}, {"value": 4.0}]}"#).unwrap();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_value_list_empty_forms() {
        let bare: ValueList<Reading> = serde_json::from_str("[]").unwrap();
        assert!(bare.is_empty());

        let wrapped: ValueList<Reading> = serde_json::from_str(r#"{"$values": []}"#).unwrap();
        assert!(wrapped.is_empty());
    }

    #[test]
    fn test_value_list_default_when_absent() {
        #[derive(Debug, Deserialize)]
        struct Rule {
            #[serde(default)]
            conditions: ValueList<Reading>,
        }

        let rule: Rule = serde_json::from_str("{}").unwrap();
        assert!(rule.conditions.is_empty());
    }

    #[test]
    fn test_value_list_serializes_bare() {
        let list = ValueList::from(vec![1, 2, 3]);
        assert_eq!(serde_json::to_string(&list).unwrap(), "[1,2,3]");
    }

    #[test]
    fn test_utc_timestamp_with_offset() {
        let parsed = utc_timestamp::parse("2024-05-01T12:00:00Z").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());

        let offset = utc_timestamp::parse("2024-05-01T14:00:00+02:00").unwrap();
        assert_eq!(offset, Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_utc_timestamp_naive_treated_as_utc() {
        let parsed = utc_timestamp::parse("2024-05-01T12:00:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_utc_timestamp_fractional_seconds() {
        let parsed = utc_timestamp::parse("2024-05-01T12:00:00.5").unwrap();
        assert_eq!(
            parsed.timestamp_millis(),
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
                .unwrap()
                .timestamp_millis()
                + 500
        );
    }

    #[test]
    fn test_utc_timestamp_rejects_garbage() {
        assert!(utc_timestamp::parse("yesterday").is_err());
    }
}
