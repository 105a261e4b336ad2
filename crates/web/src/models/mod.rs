//! View-side models: the session user, the session-backed cart, and the
//! automation rule editor form.
//!
//! Everything here lives in the session or in a request; durable state
//! belongs to the remote Garge API.

pub mod cart;
pub mod rule_form;
pub mod session;

pub use cart::{Cart, CartLine};
pub use rule_form::{
    ConditionRow, RuleForm, SensorOption, condition_sensor_name, sensor_options, sorted_switches,
};
pub use session::CurrentUser;
