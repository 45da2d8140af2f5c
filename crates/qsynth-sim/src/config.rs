//! Simulator configuration.
//!
//! Loaded from (highest precedence first):
//! 1. Environment variables with the `QSYNTH_SIM_` prefix
//! 2. A YAML file
//! 3. Default values

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Whether and where a progress bar is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressMode {
    /// No progress bar.
    #[default]
    Off,
    /// A bar on stderr.
    Stderr,
    /// A bar that is tracked but never drawn.
    Hidden,
}

impl std::str::FromStr for ProgressMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" => Ok(ProgressMode::Off),
            "stderr" => Ok(ProgressMode::Stderr),
            "hidden" => Ok(ProgressMode::Hidden),
            other => Err(ConfigError::ValidationError(format!(
                "Invalid progress mode: {other}"
            ))),
        }
    }
}

/// Simulator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Seed for sampling; a request seed takes precedence.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Widest circuit accepted.
    #[serde(default = "default_max_qubits")]
    pub max_qubits: u32,

    /// Width from which gate updates run on the rayon pool.
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: u32,

    /// Size of a dedicated worker pool (global rayon pool if unset)
    #[serde(default)]
    pub num_threads: Option<usize>,

    /// Norm drift above this is logged as a warning.
    #[serde(default = "default_norm_tolerance")]
    pub norm_tolerance: f64,

    /// Progress reporting.
    #[serde(default)]
    pub progress: ProgressMode,
}

fn default_max_qubits() -> u32 {
    24
}

fn default_parallel_threshold() -> u32 {
    14
}

fn default_norm_tolerance() -> f64 {
    1e-9
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: None,
            max_qubits: default_max_qubits(),
            parallel_threshold: default_parallel_threshold(),
            num_threads: None,
            norm_tolerance: default_norm_tolerance(),
            progress: ProgressMode::Off,
        }
    }
}

impl SimulatorConfig {
    /// Parse a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: SimulatorConfig =
            serde_yaml_ng::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_yaml_str(&contents)
    }

    /// Defaults overridden by environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().merge_env()
    }

    /// Override fields from `QSYNTH_SIM_*` variables that are set.
    ///
    /// A variable that is set but does not parse is an error.
    pub fn merge_env(mut self) -> Result<Self, ConfigError> {
        if let Some(v) = env_var("QSYNTH_SIM_SEED")? {
            self.seed = Some(v);
        }
        if let Some(v) = env_var("QSYNTH_SIM_MAX_QUBITS")? {
            self.max_qubits = v;
        }
        if let Some(v) = env_var("QSYNTH_SIM_PARALLEL_THRESHOLD")? {
            self.parallel_threshold = v;
        }
        if let Some(v) = env_var("QSYNTH_SIM_THREADS")? {
            self.num_threads = Some(v);
        }
        if let Some(v) = env_var("QSYNTH_SIM_NORM_TOLERANCE")? {
            self.norm_tolerance = v;
        }
        if let Some(v) = env_var("QSYNTH_SIM_PROGRESS")? {
            self.progress = v;
        }
        self.validate()?;
        Ok(self)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_qubits == 0 || self.max_qubits > 34 {
            return Err(ConfigError::ValidationError(format!(
                "max_qubits must be between 1 and 34, got {}",
                self.max_qubits
            )));
        }
        if self.num_threads == Some(0) {
            return Err(ConfigError::ValidationError(
                "num_threads must be greater than 0".to_string(),
            ));
        }
        if !self.norm_tolerance.is_finite() || self.norm_tolerance < 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "norm_tolerance must be a non-negative number, got {}",
                self.norm_tolerance
            )));
        }
        Ok(())
    }

    /// Builder: fix the sampling seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builder: set the progress mode.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressMode) -> Self {
        self.progress = progress;
        self
    }
}

fn env_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::ValidationError(format!("Invalid value for {name}: {raw}"))),
        Err(_) => Ok(None),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SimulatorConfig::default();
        assert_eq!(config.max_qubits, 24);
        assert_eq!(config.parallel_threshold, 14);
        assert_eq!(config.progress, ProgressMode::Off);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = SimulatorConfig::from_yaml_str("seed: 7\nprogress: hidden\n").unwrap();
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.progress, ProgressMode::Hidden);
        assert_eq!(config.max_qubits, 24);
    }

    #[test]
    fn test_validate_zero_threads() {
        let config = SimulatorConfig {
            num_threads: Some(0),
            ..SimulatorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            SimulatorConfig::from_yaml_str("max_qubits: [1, 2]"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_progress_mode_parse() {
        assert_eq!("Stderr".parse::<ProgressMode>().unwrap(), ProgressMode::Stderr);
        assert!("loud".parse::<ProgressMode>().is_err());
    }
}
