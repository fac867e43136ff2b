//! Controller parameters and the conditions that gate transitions.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// A typed parameter value. Triggers are booleans consumed by the
/// transition that reads them.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum AnimParam {
    Float(f32),
    Integer(i32),
    Boolean(bool),
    Trigger(bool),
}

impl AnimParam {
    #[inline]
    pub fn as_f32(self) -> f32 {
        match self {
            Self::Float(v) => v,
            Self::Integer(v) => v as f32,
            Self::Boolean(b) | Self::Trigger(b) => {
                if b {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    #[inline]
    pub fn is_trigger(self) -> bool {
        matches!(self, Self::Trigger(_))
    }
}

/// Right-hand side of a condition as written in a state graph.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Boolean(bool),
    Integer(i32),
    Float(f32),
}

impl ConditionValue {
    #[inline]
    pub fn as_f32(self) -> f32 {
        match self {
            Self::Boolean(b) => {
                if b {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Integer(v) => v as f32,
            Self::Float(v) => v,
        }
    }
}

impl Default for ConditionValue {
    fn default() -> Self {
        Self::Boolean(true)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    GreaterThan,
    LessThan,
    GreaterThanEqual,
    LessThanEqual,
    Equal,
    NotEqual,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub parameter: String,
    pub predicate: Predicate,
    #[serde(default)]
    pub value: ConditionValue,
}

impl Condition {
    /// A missing parameter never satisfies a condition.
    pub fn holds(&self, params: &AnimParameters) -> bool {
        let Some(param) = params.get(&self.parameter) else {
            return false;
        };
        let lhs = param.as_f32();
        let rhs = self.value.as_f32();
        match self.predicate {
            Predicate::GreaterThan => lhs > rhs,
            Predicate::LessThan => lhs < rhs,
            Predicate::GreaterThanEqual => lhs >= rhs,
            Predicate::LessThanEqual => lhs <= rhs,
            Predicate::Equal => lhs == rhs,
            Predicate::NotEqual => lhs != rhs,
        }
    }
}

/// Named parameter store owned by a controller.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnimParameters {
    values: HashMap<String, AnimParam>,
}

impl AnimParameters {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<AnimParam> {
        self.values.get(name).copied()
    }

    #[inline]
    pub fn set(&mut self, name: impl Into<String>, value: AnimParam) {
        self.values.insert(name.into(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, AnimParam)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Reset a trigger after the transition that read it fired.
    pub fn consume_trigger(&mut self, name: &str) {
        if let Some(p) = self.values.get_mut(name) {
            if p.is_trigger() {
                *p = AnimParam::Trigger(false);
            }
        }
    }

    /// Drop pending triggers; other values are retained.
    pub fn clear_triggers(&mut self) {
        for p in self.values.values_mut() {
            if p.is_trigger() {
                *p = AnimParam::Trigger(false);
            }
        }
    }
}
