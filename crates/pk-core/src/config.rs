//! Kernel configuration
//!
//! Tolerances and evaluation settings that the session hands to the geometry
//! layer. Stored on disk as RON; every section falls back to its defaults when
//! omitted.

use std::path::Path;

use pk_cad::ErrorCode;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_COINCIDENCE_TOLERANCE, DEFAULT_CONSTRAINT_TOLERANCE, DEFAULT_PLANARITY_TOLERANCE,
    DEFAULT_SWEEP_SAMPLES,
};

/// Geometric tolerances
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToleranceConfig {
    /// Distance below which two vertices are the same point
    pub coincidence: f64,
    /// Max distance of a face vertex from its plane, relative to loop size
    pub planarity: f64,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            coincidence: DEFAULT_COINCIDENCE_TOLERANCE,
            planarity: DEFAULT_PLANARITY_TOLERANCE,
        }
    }
}

/// Curve evaluation settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationConfig {
    /// Number of sections produced by profile sweeping
    pub sweep_samples: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            sweep_samples: DEFAULT_SWEEP_SAMPLES,
        }
    }
}

/// Constraint rule settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConstraintConfig {
    /// Tolerance used when a rule is created without an explicit one
    pub default_tolerance: f64,
}

impl Default for ConstraintConfig {
    fn default() -> Self {
        Self {
            default_tolerance: DEFAULT_CONSTRAINT_TOLERANCE,
        }
    }
}

/// Complete kernel configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct KernelConfig {
    #[serde(default)]
    pub tolerance: ToleranceConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub constraints: ConstraintConfig,
}

impl KernelConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and validate a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let config = Self::from_ron_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded kernel config");
        Ok(config)
    }

    /// Save the configuration as pretty-printed RON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = self.to_ron_string()?;
        std::fs::write(path, content).map_err(|e| ConfigError::Io(e.to_string()))?;
        Ok(())
    }

    /// Parse and validate RON text
    pub fn from_ron_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            ron::from_str(content).map_err(|e| ConfigError::Deserialize(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Reject tolerances that are negative or not finite, and empty sweeps
    pub fn validate(&self) -> Result<(), ConfigError> {
        let tolerances = [
            ("tolerance.coincidence", self.tolerance.coincidence),
            ("tolerance.planarity", self.tolerance.planarity),
            ("constraints.default_tolerance", self.constraints.default_tolerance),
        ];
        for (field, value) in tolerances {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{} must be a non-negative number, got {}",
                    field, value
                )));
            }
        }
        if self.evaluation.sweep_samples < 2 {
            return Err(ConfigError::Invalid(format!(
                "evaluation.sweep_samples must be at least 2, got {}",
                self.evaluation.sweep_samples
            )));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialize(String),
    #[error("Deserialization error: {0}")]
    Deserialize(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ConfigError::Io(_) => ErrorCode::SystemError,
            _ => ErrorCode::InvalidArgument,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = KernelConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.evaluation.sweep_samples, 16);
        assert_eq!(config.tolerance.coincidence, 1e-9);
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let config = KernelConfig::from_ron_str("(evaluation: (sweep_samples: 8))").unwrap();
        assert_eq!(config.evaluation.sweep_samples, 8);
        assert_eq!(config.tolerance, ToleranceConfig::default());
        assert_eq!(config.constraints, ConstraintConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = KernelConfig::from_ron_str("(tolerance: (coincidence: -1.0, planarity: 1e-6))")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert_eq!(err.code(), ErrorCode::InvalidArgument);

        let mut config = KernelConfig::default();
        config.evaluation.sweep_samples = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_ron() {
        let err = KernelConfig::from_ron_str("(tolerance: ").unwrap_err();
        assert!(matches!(err, ConfigError::Deserialize(_)));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kernel.ron");

        let mut config = KernelConfig::default();
        config.tolerance.planarity = 1e-4;
        config.evaluation.sweep_samples = 32;
        config.save(&path).unwrap();

        let loaded = KernelConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = KernelConfig::load(dir.path().join("missing.ron")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::SystemError);
    }
}
