//! Learning configuration
//!
//! Constants that drive reinforcement, decay, suggestion thresholds and the
//! metrics report.
//!
//! ## Configuration Resolution
//!
//! Config is loaded with a three-step resolution:
//! 1. An explicit path (e.g. the CLI `--config` flag)
//! 2. Override in the data dir (~/.local/share/tagwise/config/learning.toml)
//! 3. Embedded defaults (compiled into binary)

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/learning.toml");

/// Constants for the classification engine
#[derive(Debug, Clone, PartialEq)]
pub struct LearningConfig {
    /// Reinforcement step: confidence += learning_rate * (1 - confidence)
    pub learning_rate: f64,
    /// Confidence assigned to a newly created pattern
    pub initial_confidence: f64,
    /// Amount subtracted from confidence on rejection
    pub decay_rate: f64,
    /// Patterns at or below this confidence are deleted
    pub retirement_floor: f64,
    /// Minimum suggestion score (inclusive)
    pub min_confidence: f64,
    /// Patterns at or above this confidence count as active
    pub activity_threshold: f64,
    /// Length of the top patterns list in metrics
    pub top_patterns: usize,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.2,
            initial_confidence: 0.5,
            decay_rate: 0.15,
            retirement_floor: 0.05,
            min_confidence: 0.3,
            activity_threshold: 0.3,
            top_patterns: 10,
        }
    }
}

/// TOML file layout
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    learning: LearningSection,
    suggestions: SuggestionsSection,
    metrics: MetricsSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LearningSection {
    learning_rate: Option<f64>,
    initial_confidence: Option<f64>,
    decay_rate: Option<f64>,
    retirement_floor: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SuggestionsSection {
    min_confidence: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MetricsSection {
    activity_threshold: Option<f64>,
    top_patterns: Option<usize>,
}

impl LearningConfig {
    /// Load config, preferring `path`, then the data dir override, then defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            debug!("Loading learning config from {}", path.display());
            let content = fs::read_to_string(path)?;
            return Self::from_toml(&content);
        }

        if let Some(override_path) = default_config_path() {
            if override_path.exists() {
                debug!(
                    "Loading learning config override from {}",
                    override_path.display()
                );
                let content = fs::read_to_string(&override_path)?;
                return Self::from_toml(&content);
            }
        }

        Self::from_toml(DEFAULT_CONFIG)
    }

    /// Parse config from TOML; missing keys fall back to defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content)?;
        let defaults = Self::default();

        let config = Self {
            learning_rate: file.learning.learning_rate.unwrap_or(defaults.learning_rate),
            initial_confidence: file
                .learning
                .initial_confidence
                .unwrap_or(defaults.initial_confidence),
            decay_rate: file.learning.decay_rate.unwrap_or(defaults.decay_rate),
            retirement_floor: file
                .learning
                .retirement_floor
                .unwrap_or(defaults.retirement_floor),
            min_confidence: file
                .suggestions
                .min_confidence
                .unwrap_or(defaults.min_confidence),
            activity_threshold: file
                .metrics
                .activity_threshold
                .unwrap_or(defaults.activity_threshold),
            top_patterns: file.metrics.top_patterns.unwrap_or(defaults.top_patterns),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check that the constants keep the learning rules well-behaved
    pub fn validate(&self) -> Result<()> {
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);

        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(Error::Config(format!(
                "learning_rate must be in (0, 1], got {}",
                self.learning_rate
            )));
        }
        if !(self.decay_rate > 0.0 && self.decay_rate <= 1.0) {
            return Err(Error::Config(format!(
                "decay_rate must be in (0, 1], got {}",
                self.decay_rate
            )));
        }
        for (name, value) in [
            ("initial_confidence", self.initial_confidence),
            ("retirement_floor", self.retirement_floor),
            ("min_confidence", self.min_confidence),
            ("activity_threshold", self.activity_threshold),
        ] {
            if !in_unit(value) {
                return Err(Error::Config(format!(
                    "{} must be in [0, 1], got {}",
                    name, value
                )));
            }
        }
        // A new pattern must not be born retired
        if self.retirement_floor >= self.initial_confidence {
            return Err(Error::Config(format!(
                "retirement_floor ({}) must be below initial_confidence ({})",
                self.retirement_floor, self.initial_confidence
            )));
        }
        Ok(())
    }
}

/// Data dir location of the override file
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("tagwise").join("config").join("learning.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_embedded_defaults_match_default_impl() {
        let config = LearningConfig::from_toml(DEFAULT_CONFIG).unwrap();
        assert_eq!(config, LearningConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = LearningConfig::from_toml(
            r#"
            [learning]
            learning_rate = 0.1

            [metrics]
            top_patterns = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.learning_rate, 0.1);
        assert_eq!(config.top_patterns, 3);
        assert_eq!(config.initial_confidence, 0.5);
        assert_eq!(config.min_confidence, 0.3);
    }

    #[test]
    fn test_empty_file_is_defaults() {
        let config = LearningConfig::from_toml("").unwrap();
        assert_eq!(config, LearningConfig::default());
    }

    #[test]
    fn test_rejects_bad_rates() {
        let err = LearningConfig::from_toml("[learning]\nlearning_rate = 0.0\n").unwrap_err();
        assert!(err.to_string().contains("learning_rate"));

        let err = LearningConfig::from_toml("[learning]\ndecay_rate = 1.5\n").unwrap_err();
        assert!(err.to_string().contains("decay_rate"));

        let err =
            LearningConfig::from_toml("[suggestions]\nmin_confidence = -0.1\n").unwrap_err();
        assert!(err.to_string().contains("min_confidence"));
    }

    #[test]
    fn test_rejects_floor_above_initial() {
        let err = LearningConfig::from_toml(
            "[learning]\ninitial_confidence = 0.2\nretirement_floor = 0.3\n",
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let err = LearningConfig::from_toml("[learning\nlearning_rate = ").unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }

    #[test]
    fn test_load_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[learning]\ndecay_rate = 0.25").unwrap();

        let config = LearningConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.decay_rate, 0.25);
        assert_eq!(config.learning_rate, 0.2);
    }

    #[test]
    fn test_load_missing_path_errors() {
        let result = LearningConfig::load(Some(Path::new("/nonexistent/tagwise.toml")));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
