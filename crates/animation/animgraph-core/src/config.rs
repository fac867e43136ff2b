//! Runtime configuration for controllers and the layer aggregator.

use serde::{Deserialize, Serialize};

/// Defaults applied when a state graph leaves a field unspecified, plus
/// queue sizing. Keep this minimal; expand without breaking the API.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// State speed when the graph omits it.
    pub default_speed: f32,
    /// State loop flag when the graph omits it.
    pub default_loop: bool,
    /// Fade length for `transition(name)` when no edge declares one.
    pub default_transition_duration: f32,
    /// Auto-play a layer once `assign_animation` makes it playable.
    pub activate: bool,
    /// Maximum queued notifications before the oldest are dropped.
    pub max_notifications: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_speed: 1.0,
            default_loop: true,
            default_transition_duration: 0.0,
            activate: true,
            max_notifications: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg: Config = serde_json::from_str(r#"{ "activate": false }"#).unwrap();
        assert!(!cfg.activate);
        assert_eq!(cfg.default_speed, 1.0);
        assert_eq!(cfg.max_notifications, 1024);
    }
}
