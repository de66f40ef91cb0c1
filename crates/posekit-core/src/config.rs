//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::mirror::{MirrorConfig, MirrorResolver};
use crate::pose::IkSettings;
use crate::transform::{TransformComponents, DEFAULT_SCALE_EPSILON};

/// Default number of undoable steps.
pub const DEFAULT_HISTORY_DEPTH: usize = 64;

/// Default IK convergence distance.
pub const DEFAULT_IK_EPSILON: f32 = 1e-3;

/// Tunables of a [`PosingCapability`](crate::PosingCapability).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PosingConfig {
    /// Undoable steps kept before the oldest is dropped.
    #[serde(default = "default_history_depth")]
    pub history_depth: usize,
    /// Previous-scale magnitude treated as degenerate when diffing.
    #[serde(default = "default_scale_epsilon")]
    pub scale_epsilon: f32,
    /// Effector distance at which IK counts as converged.
    #[serde(default = "default_ik_epsilon")]
    pub ik_epsilon: f32,
    /// IK settings given to new bone poses.
    #[serde(default)]
    pub default_ik: IkSettings,
    /// Propagation mask given to new bone poses.
    #[serde(default)]
    pub default_propagation: TransformComponents,
    /// Mirror naming rules.
    #[serde(default)]
    pub mirror: MirrorConfig,
}

fn default_history_depth() -> usize {
    DEFAULT_HISTORY_DEPTH
}

fn default_scale_epsilon() -> f32 {
    DEFAULT_SCALE_EPSILON
}

fn default_ik_epsilon() -> f32 {
    DEFAULT_IK_EPSILON
}

impl Default for PosingConfig {
    fn default() -> Self {
        Self {
            history_depth: DEFAULT_HISTORY_DEPTH,
            scale_epsilon: DEFAULT_SCALE_EPSILON,
            ik_epsilon: DEFAULT_IK_EPSILON,
            default_ik: IkSettings::default(),
            default_propagation: TransformComponents::all(),
            mirror: MirrorConfig::default(),
        }
    }
}

impl PosingConfig {
    /// Parses and validates a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: PosingConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration to pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks value ranges and compiles the mirror rules.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_depth == 0 {
            return Err(ConfigError::invalid(
                "history_depth",
                "must be at least 1",
            ));
        }
        if !(self.scale_epsilon.is_finite() && self.scale_epsilon > 0.0) {
            return Err(ConfigError::invalid(
                "scale_epsilon",
                format!("must be a positive number, got {}", self.scale_epsilon),
            ));
        }
        if !(self.ik_epsilon.is_finite() && self.ik_epsilon > 0.0) {
            return Err(ConfigError::invalid(
                "ik_epsilon",
                format!("must be a positive number, got {}", self.ik_epsilon),
            ));
        }
        let ik = &self.default_ik;
        for (value, field) in [(ik.depth, "default_ik.depth"), (ik.iterations, "default_ik.iterations")] {
            if !(IkSettings::MIN..=IkSettings::MAX).contains(&value) {
                return Err(ConfigError::invalid(
                    field,
                    format!(
                        "must be between {} and {}, got {}",
                        IkSettings::MIN,
                        IkSettings::MAX,
                        value
                    ),
                ));
            }
        }
        self.build_mirror_resolver()?;
        Ok(())
    }

    /// Compiles the mirror rules.
    pub fn build_mirror_resolver(&self) -> Result<MirrorResolver, ConfigError> {
        MirrorResolver::new(&self.mirror)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::PoseSlot;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_json_gives_defaults() {
        let config = PosingConfig::from_json("{}").unwrap();
        assert_eq!(config, PosingConfig::default());
    }

    #[test]
    fn test_partial_json() {
        let json = r#"{
            "history_depth": 8,
            "default_ik": {"enabled": true, "depth": 4},
            "default_propagation": "ROTATION",
            "mirror": {"rules": [{"left": "Left", "right": "Right", "anchor": "prefix"}]}
        }"#;
        let config = PosingConfig::from_json(json).unwrap();

        assert_eq!(config.history_depth, 8);
        assert!(config.default_ik.enabled);
        assert_eq!(config.default_ik.depth, 4);
        assert_eq!(config.default_ik.iterations, 8);
        assert_eq!(config.default_propagation, TransformComponents::ROTATION);
        let resolver = config.build_mirror_resolver().unwrap();
        let found = resolver.mirror_name("LeftArm", PoseSlot::Character).unwrap();
        assert_eq!(found.name, "RightArm");
    }

    #[test]
    fn test_validation_errors() {
        let err = PosingConfig::from_json(r#"{"history_depth": 0}"#).unwrap_err();
        assert!(err.to_string().contains("history_depth"));

        let err = PosingConfig::from_json(r#"{"default_ik": {"iterations": 40}}"#).unwrap_err();
        assert!(err.to_string().contains("default_ik.iterations"));

        let err = PosingConfig::from_json(r#"{"ik_epsilon": -1.0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "ik_epsilon", .. }));

        assert!(matches!(
            PosingConfig::from_json(r#"{"history": 3}"#),
            Err(ConfigError::JsonParse(_))
        ));
    }

    #[test]
    fn test_json_round_trip() {
        let config = PosingConfig {
            history_depth: 5,
            ..PosingConfig::default()
        };
        let json = config.to_json_pretty().unwrap();
        assert_eq!(PosingConfig::from_json(&json).unwrap(), config);
    }
}
