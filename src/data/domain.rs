use std::fmt;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::{impl_add_sub_mul_div_primitive, impl_from_primitive};

// ================================================================================================
// Domain Strong Types (NewTypes)
// ================================================================================================

/// Represents a close price in the quote currency.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Price(pub f64);
impl_from_primitive!(Price, f64);
impl_add_sub_mul_div_primitive!(Price, f64);

/// Represents a single-step reward: the fractional change in portfolio value.
///
/// A reward of `0.20` means the portfolio gained 20% of its value over the step.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Reward(pub f64);
impl_from_primitive!(Reward, f64);
impl_add_sub_mul_div_primitive!(Reward, f64);

/// Represents a learned action-value estimate in the Q-table.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct QValue(pub f64);
impl_from_primitive!(QValue, f64);
impl_add_sub_mul_div_primitive!(QValue, f64);

// ================================================================================================
// Feature Values
// ================================================================================================

/// A single discretized market feature, either numeric or categorical.
///
/// Numeric values are wrapped in [`OrderedFloat`] so features are fully ordered and hashable,
/// which is what makes state keys structural rather than string-coupled. Non-finite numeric
/// values are rejected at table construction, so `Num` is always a real number in practice.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Num(OrderedFloat<f64>),
    Text(String),
}

impl FeatureValue {
    pub fn num(value: f64) -> Self {
        Self::Num(OrderedFloat(value))
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn is_finite(&self) -> bool {
        match self {
            Self::Num(v) => v.is_finite(),
            Self::Text(_) => true,
        }
    }

    /// The JSON representation used inside canonical state keys.
    pub fn as_json(&self) -> serde_json::Value {
        match self {
            Self::Num(v) => serde_json::Value::from(v.0),
            Self::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(value: f64) -> Self {
        Self::num(value)
    }
}

impl From<&str> for FeatureValue {
    fn from(value: &str) -> Self {
        Self::text(value)
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(v) => write!(f, "{}", v.0),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}
