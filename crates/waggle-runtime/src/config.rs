//! Engine tuning knobs.
//!
//! Every table deserializes with defaults for missing keys, so a config file
//! only needs to name what it changes:
//!
//! ```toml
//! [navigation]
//! curve_height = 0.8
//!
//! [fov]
//! half_angle_deg = 30.0
//! ```

use serde::{Deserialize, Serialize};
use waggle_hal::HeadTurn;
use waggle_perception::{DEFAULT_REFERENCE_TAG, FovConstraint};

/// Requests are never issued more often than this, whatever the config says.
pub const MIN_REQUEST_INTERVAL_SECS: f32 = 0.5;

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub navigation: NavigationConfig,
    pub actions: ActionConfig,
    pub fov: FovConfig,
    pub controller: ControllerConfig,
    pub agent: AgentConfig,
}

/// Timing and shape of body translation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Full rotate + translate window at speed scale 1.0.
    pub base_duration_secs: f32,
    /// Share of the window spent turning to face the target.
    pub rotation_ratio: f32,
    /// Peak sideways offset of an S-curve (capped at a quarter of the
    /// travel distance).
    pub curve_height: f32,
    /// Duration of the post-arrival turn towards the look-at point.
    pub facing_duration_secs: f32,
    /// Hard cap on motion time per decision; phases snap when it runs out.
    pub decision_window_secs: f32,
    /// Targets closer than this are not navigated to.
    pub min_travel_distance: f32,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            base_duration_secs: 5.0,
            rotation_ratio: 0.3,
            curve_height: 0.5,
            facing_duration_secs: 0.5,
            decision_window_secs: waggle_types::DECISION_WINDOW_SECS,
            min_travel_distance: 0.1,
        }
    }
}

/// Gesture playback parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionConfig {
    pub head_max_angle_deg: f32,
    /// Reference actors farther than this are not tracked by the head.
    pub head_range: f32,
    pub continuous_wave_cycles: u32,
    pub continuous_wave_peak_deg: f32,
}

impl Default for ActionConfig {
    fn default() -> Self {
        let head = HeadTurn::default();
        Self {
            head_max_angle_deg: head.max_angle_deg,
            head_range: head.range,
            continuous_wave_cycles: 4,
            continuous_wave_peak_deg: 100.0,
        }
    }
}

impl ActionConfig {
    pub fn head_turn(&self) -> HeadTurn {
        HeadTurn {
            max_angle_deg: self.head_max_angle_deg,
            range: self.head_range,
        }
    }
}

/// Reference actor field of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FovConfig {
    pub enabled: bool,
    pub half_angle_deg: f32,
    pub max_radius: f32,
}

impl Default for FovConfig {
    fn default() -> Self {
        let fov = FovConstraint::default();
        Self {
            enabled: true,
            half_angle_deg: fov.half_angle_deg(),
            max_radius: fov.max_radius(),
        }
    }
}

impl FovConfig {
    pub fn constraint(&self) -> FovConstraint {
        FovConstraint::new(self.half_angle_deg, self.max_radius)
    }
}

/// Decision controller parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Targets nearer than this are pushed forward so the body always moves.
    pub min_move_separation: f32,
    pub memory_capacity: usize,
    /// Identical consecutive reasons before the prompt asks for variety.
    pub repeat_threshold: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            min_move_separation: 0.3,
            memory_capacity: 5,
            repeat_threshold: 3,
        }
    }
}

/// Request scheduling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Issue a new request automatically once the previous one completed.
    pub auto_request: bool,
    /// Simulated seconds between a response and the next request.
    pub request_interval_secs: f32,
    pub request_timeout_secs: u64,
    /// Perception tag of the reference actor.
    pub reference_tag: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            auto_request: false,
            request_interval_secs: MIN_REQUEST_INTERVAL_SECS,
            request_timeout_secs: 30,
            reference_tag: DEFAULT_REFERENCE_TAG.to_string(),
        }
    }
}

impl AgentConfig {
    /// Configured interval, never below [`MIN_REQUEST_INTERVAL_SECS`].
    pub fn effective_interval(&self) -> f32 {
        self.request_interval_secs.max(MIN_REQUEST_INTERVAL_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.navigation.base_duration_secs, 5.0);
        assert_eq!(cfg.navigation.rotation_ratio, 0.3);
        assert_eq!(cfg.fov.half_angle_deg, 45.0);
        assert_eq!(cfg.fov.max_radius, 2.0);
        assert_eq!(cfg.controller.memory_capacity, 5);
        assert_eq!(cfg.actions.head_range, 3.0);
    }

    #[test]
    fn request_interval_has_a_floor() {
        let cfg = AgentConfig {
            request_interval_secs: 0.1,
            ..AgentConfig::default()
        };
        assert_eq!(cfg.effective_interval(), MIN_REQUEST_INTERVAL_SECS);
    }

    #[test]
    fn partial_json_uses_defaults() {
        let cfg: EngineConfig =
            serde_json::from_str(r#"{"navigation":{"curve_height":0.8},"fov":{"enabled":false}}"#).unwrap();
        assert_eq!(cfg.navigation.curve_height, 0.8);
        assert_eq!(cfg.navigation.rotation_ratio, 0.3);
        assert!(!cfg.fov.enabled);
        assert_eq!(cfg.agent.reference_tag, "Human");
    }
}
