//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different entity types. The remote Garge API
//! identifies every entity with a JSON number, so the wrappers are `i64` and
//! serialize transparently.

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `i64` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_i64()`
/// - `From<i64>`, `Into<i64>`, and `FromStr` implementations
///
/// # Example
///
/// ```rust
/// # use garge_core::define_id;
/// define_id!(SensorId);
/// define_id!(SwitchId);
///
/// let sensor_id = SensorId::new(1);
/// let switch_id = SwitchId::new(1);
///
/// // These are different types, so this won't compile:
/// // let _: SensorId = switch_id;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Create a new ID from an i64 value.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the underlying i64 value.
            #[must_use]
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::core::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<i64>().map(Self)
            }
        }
    };
}

// Define standard entity IDs
define_id!(SensorId);
define_id!(SwitchId);
define_id!(RuleId);
define_id!(ProductId);
define_id!(SubscriptionId);
define_id!(OrderId);

impl SensorId {
    /// The virtual sensor exposed to the rule editor for the electricity
    /// spot price. It has no backing device; the remote API resolves it
    /// against the configured price area.
    pub const ELECTRICITY_PRICE: Self = Self::new(-1);

    /// Whether this id refers to the virtual spot-price sensor.
    #[must_use]
    pub const fn is_electricity_price(&self) -> bool {
        self.0 == Self::ELECTRICITY_PRICE.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_roundtrip() {
        let id = SensorId::new(42);
        assert_eq!(id.as_i64(), 42);
        assert_eq!(i64::from(id), 42);
        assert_eq!(SensorId::from(42), id);
    }

    #[test]
    fn test_id_display() {
        assert_eq!(SwitchId::new(7).to_string(), "7");
    }

    #[test]
    fn test_id_from_str() {
        let id: SensorId = "42".parse().unwrap();
        assert_eq!(id, SensorId::new(42));

        let negative: SensorId = "-1".parse().unwrap();
        assert!(negative.is_electricity_price());

        assert!("seven".parse::<SwitchId>().is_err());
    }

    #[test]
    fn test_id_serde_transparent() {
        let id = ProductId::new(3);
        assert_eq!(serde_json::to_string(&id).unwrap(), "3");

        let parsed: ProductId = serde_json::from_str("3").unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_electricity_price_sensor() {
        assert_eq!(SensorId::ELECTRICITY_PRICE.as_i64(), -1);
        assert!(SensorId::ELECTRICITY_PRICE.is_electricity_price());
        assert!(!SensorId::new(1).is_electricity_price());
    }
}
