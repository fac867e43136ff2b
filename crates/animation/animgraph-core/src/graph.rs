//! Declarative per-layer state graph.
//!
//! Addressing: a plain state is a single leaf addressed by its name
//! (`"Idle"`); a blend-tree state has one leaf per child addressed as
//! `"State.Child"`. State names therefore may not contain `.`.

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};

use crate::error::AnimError;
use crate::parameters::{AnimParam, Condition};

/// Source name matching every state in `AnimTransition::from`.
pub const ANY_STATE: &str = "ANY";

/// Separator between a state and a blend-tree child in a node path.
pub const PATH_SEPARATOR: char = '.';

fn one() -> f32 {
    1.0
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlendChild {
    pub name: String,
    #[serde(default = "one")]
    pub weight: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateDesc {
    pub name: String,
    #[serde(default)]
    pub speed: Option<f32>,
    #[serde(default, rename = "loop")]
    pub looping: Option<bool>,
    /// Children of a blend-tree state; `None` for a plain state.
    #[serde(default)]
    pub blend_tree: Option<Vec<BlendChild>>,
}

impl StateDesc {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            speed: None,
            looping: None,
            blend_tree: None,
        }
    }
}

/// Directed edge of the state graph. `duration == 0` switches instantly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnimTransition {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub duration: f32,
    /// Normalized start position in the destination state, in `[0, 1]`.
    #[serde(default)]
    pub offset: Option<f32>,
    /// Normalized progress of the source state at which the edge may fire.
    #[serde(default)]
    pub exit_time: Option<f32>,
    /// Lower values are considered first; unset sorts last.
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl AnimTransition {
    pub fn new(from: impl Into<String>, to: impl Into<String>, duration: f32) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            duration,
            offset: None,
            exit_time: None,
            priority: None,
            conditions: Vec::new(),
        }
    }

    /// Edges with neither conditions nor an exit time are only taken on
    /// explicit request.
    #[inline]
    pub fn is_automatic(&self) -> bool {
        !self.conditions.is_empty() || self.exit_time.is_some()
    }
}

/// State graph of one layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerGraph {
    pub name: String,
    pub states: Vec<StateDesc>,
    #[serde(default)]
    pub transitions: Vec<AnimTransition>,
    /// State entered by `play()` from idle; defaults to the first state.
    #[serde(default)]
    pub default_state: Option<String>,
    #[serde(default)]
    pub parameters: HashMap<String, AnimParam>,
}

impl LayerGraph {
    pub fn new(name: impl Into<String>, states: Vec<StateDesc>) -> Self {
        Self {
            name: name.into(),
            states,
            transitions: Vec::new(),
            default_state: None,
            parameters: HashMap::new(),
        }
    }

    pub fn with_transition(mut self, transition: AnimTransition) -> Self {
        self.transitions.push(transition);
        self
    }

    pub fn from_json(s: &str) -> Result<Self, AnimError> {
        let graph: Self = serde_json::from_str(s)?;
        graph.validate()?;
        Ok(graph)
    }

    /// Check names, references and ranges.
    pub fn validate(&self) -> Result<(), AnimError> {
        let invalid = |reason: String| -> Result<(), AnimError> { Err(AnimError::InvalidGraph { reason }) };

        if self.states.is_empty() {
            return invalid(format!("layer '{}' declares no states", self.name));
        }
        let mut names = HashSet::new();
        for state in &self.states {
            if state.name.is_empty() || state.name.contains(PATH_SEPARATOR) {
                return invalid(format!("state name '{}' is empty or contains '.'", state.name));
            }
            if state.name == ANY_STATE {
                return invalid(format!("'{ANY_STATE}' is reserved"));
            }
            if !names.insert(state.name.as_str()) {
                return invalid(format!("duplicate state '{}'", state.name));
            }
            if let Some(children) = &state.blend_tree {
                if children.is_empty() {
                    return invalid(format!("blend tree '{}' has no children", state.name));
                }
                let mut child_names = HashSet::new();
                for child in children {
                    if !child_names.insert(child.name.as_str()) {
                        return invalid(format!(
                            "duplicate child '{}' in '{}'",
                            child.name, state.name
                        ));
                    }
                    if !(child.weight >= 0.0) {
                        return invalid(format!("negative weight on '{}'", child.name));
                    }
                }
                if children.iter().all(|c| c.weight == 0.0) {
                    return invalid(format!("blend tree '{}' has only zero weights", state.name));
                }
            }
        }
        if let Some(default) = &self.default_state {
            if !names.contains(default.as_str()) {
                return invalid(format!("default state '{default}' is not declared"));
            }
        }
        for t in &self.transitions {
            if t.from != ANY_STATE && !names.contains(t.from.as_str()) {
                return invalid(format!("transition from unknown state '{}'", t.from));
            }
            if !names.contains(t.to.as_str()) {
                return invalid(format!("transition to unknown state '{}'", t.to));
            }
            if !(t.duration >= 0.0) {
                return invalid(format!("transition {} -> {} has negative duration", t.from, t.to));
            }
            if let Some(offset) = t.offset {
                if !(0.0..=1.0).contains(&offset) {
                    return invalid(format!("transition offset {offset} outside [0, 1]"));
                }
            }
        }
        Ok(())
    }
}

/// Split a node path into its state name and optional blend-tree child.
pub fn split_node_path(path: &str) -> (&str, Option<&str>) {
    match path.split_once(PATH_SEPARATOR) {
        Some((state, child)) => (state, Some(child)),
        None => (path, None),
    }
}
