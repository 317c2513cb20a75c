use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Numeric policy of the matching engine.
///
/// None of these values is structural; they are tuned against real answer data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Step size applied to `loading * score` on each answer
    pub learning_rate: f32,

    /// Uncertainty removed per unit of absolute loading on each answer
    pub decay_rate: f32,

    /// Lower bound for per-dimension uncertainty; reaching it everywhere ends the cluster
    pub uncertainty_floor: f32,

    /// Maximum questions asked per cluster
    pub question_cap: usize,

    /// Matches returned as live feedback after each answer
    pub live_top_n: usize,

    /// Importance (1-5) of a cluster the user did not rate
    pub default_importance: u8,

    /// Idle time after which a session is discarded
    pub session_ttl_secs: u64,

    /// Maximum sessions kept by the in-memory store
    pub session_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.3,
            decay_rate: 0.6,
            uncertainty_floor: 0.05,
            question_cap: 20,
            live_top_n: 5,
            default_importance: 3,
            session_ttl_secs: 60 * 60,
            session_capacity: 1024,
        }
    }
}

impl EngineConfig {
    /// Short questionnaires: fewer questions, faster convergence
    pub fn quick() -> Self {
        Self {
            decay_rate: 0.8,
            question_cap: 8,
            ..Default::default()
        }
    }

    /// Long questionnaires: slower uncertainty decay, more questions
    pub fn thorough() -> Self {
        Self {
            learning_rate: 0.2,
            decay_rate: 0.4,
            uncertainty_floor: 0.02,
            question_cap: 50,
            ..Default::default()
        }
    }

    /// Load a TOML file; missing keys keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("Loading engine config from {}", path.display());
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate().map_err(EngineError::invalid_config)?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(format!(
                "learning_rate ({}) must be in (0, 1]",
                self.learning_rate
            ));
        }

        if !(self.decay_rate > 0.0 && self.decay_rate <= 1.0) {
            return Err(format!("decay_rate ({}) must be in (0, 1]", self.decay_rate));
        }

        if !(self.uncertainty_floor > 0.0 && self.uncertainty_floor < 1.0) {
            return Err(format!(
                "uncertainty_floor ({}) must be in (0, 1)",
                self.uncertainty_floor
            ));
        }

        if self.question_cap == 0 {
            return Err("question_cap must be > 0".to_string());
        }

        if !(1..=5).contains(&self.default_importance) {
            return Err(format!(
                "default_importance ({}) must be between 1 and 5",
                self.default_importance
            ));
        }

        if self.session_capacity == 0 {
            return Err("session_capacity must be > 0".to_string());
        }

        Ok(())
    }

    /// Number of questions a cluster with `total_bills` bills can ask.
    pub fn question_limit(&self, total_bills: usize) -> usize {
        total_bills.min(self.question_cap)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_preset_configs_valid() {
        assert!(EngineConfig::quick().validate().is_ok());
        assert!(EngineConfig::thorough().validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = EngineConfig::default();

        config.learning_rate = 0.0;
        assert!(config.validate().is_err());

        config.learning_rate = 0.3;
        config.decay_rate = f32::NAN;
        assert!(config.validate().is_err());

        config.decay_rate = 0.6;
        config.uncertainty_floor = 1.0;
        assert!(config.validate().is_err());

        config.uncertainty_floor = 0.05;
        config.question_cap = 0;
        assert!(config.validate().is_err());

        config.question_cap = 10;
        config.default_importance = 6;
        assert!(config.validate().is_err());

        config.default_importance = 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str("question_cap = 12\nlearning_rate = 0.5\n").unwrap();
        assert_eq!(config.question_cap, 12);
        assert_eq!(config.learning_rate, 0.5);
        assert_eq!(config.decay_rate, EngineConfig::default().decay_rate);
    }

    #[test]
    fn toml_rejects_unknown_keys_and_bad_values() {
        assert!(matches!(
            EngineConfig::from_toml_str("learnin_rate = 0.5"),
            Err(EngineError::ConfigParse(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("decay_rate = 2.0"),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        std::fs::write(&path, "live_top_n = 3\n").unwrap();
        assert_eq!(EngineConfig::load(&path).unwrap().live_top_n, 3);
    }

    #[test]
    fn question_limit_is_min_of_bills_and_cap() {
        let config = EngineConfig::default();
        assert_eq!(config.question_limit(3), 3);
        assert_eq!(config.question_limit(300), 20);
    }
}
