//! Configuration system for ModelForge.
//!
//! Load linearization, goal-programming and rational-conversion settings
//! from TOML or YAML without code changes.
//!
//! # Examples
//!
//! Load configuration from TOML string:
//!
//! ```
//! use modelforge_config::{GoalMode, ModelConfig};
//! use modelforge_core::PiecewiseMethod;
//!
//! let config = ModelConfig::from_toml_str(r#"
//!     random_seed = 7
//!
//!     [linearization]
//!     big_m = 5000.0
//!
//!     [linearization.piecewise]
//!     segments = 20
//!     method = "incremental"
//!
//!     [goal_programming]
//!     mode = "sequential"
//! "#).unwrap();
//!
//! assert_eq!(config.linearization.big_m, 5000.0);
//! assert_eq!(config.linearization.piecewise.method, PiecewiseMethod::Incremental);
//! assert_eq!(config.goal_programming.mode, GoalMode::Sequential);
//! assert_eq!(config.rational.max_denominator, 10_000);
//! ```
//!
//! Use default config when file is missing:
//!
//! ```
//! use modelforge_config::ModelConfig;
//!
//! let config = ModelConfig::load("model.toml").unwrap_or_default();
//! // Proceeds with defaults if file doesn't exist
//! ```

use std::path::Path;

use modelforge_core::{PiecewiseMethod, RationalAlgorithm, RationalConverter};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main model-transformation configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ModelConfig {
    /// Random seed for adaptive breakpoint sampling.
    #[serde(default)]
    pub random_seed: Option<u64>,

    /// Linearization settings.
    #[serde(default)]
    pub linearization: LinearizationConfig,

    /// Goal-programming settings.
    #[serde(default)]
    pub goal_programming: GoalProgrammingConfig,

    /// Rational conversion settings.
    #[serde(default)]
    pub rational: RationalConfig,
}

impl ModelConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file, YAML for `.yaml`/`.yml`, TOML otherwise.
    ///
    /// # Errors
    ///
    /// Returns error if the file doesn't exist, fails to parse or fails
    /// validation.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_file(path),
            _ => Self::from_toml_file(path),
        }
    }

    /// Loads configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Parses configuration from a YAML string.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the random seed.
    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// Sets the fallback Big-M constant.
    pub fn with_big_m(mut self, big_m: f64) -> Self {
        self.linearization.big_m = big_m;
        self
    }

    /// Sets the default piecewise method.
    pub fn with_piecewise_method(mut self, method: PiecewiseMethod) -> Self {
        self.linearization.piecewise.method = method;
        self
    }

    /// Sets the default number of piecewise segments.
    pub fn with_segments(mut self, segments: usize) -> Self {
        self.linearization.piecewise.segments = segments;
        self
    }

    /// Sets the goal-programming mode.
    pub fn with_goal_mode(mut self, mode: GoalMode) -> Self {
        self.goal_programming.mode = mode;
        self
    }

    /// Sets how deviations are fixed between sequential stages.
    pub fn with_deviation_fixing(mut self, fixing: DeviationFixing) -> Self {
        self.goal_programming.deviation_fixing = fixing;
        self
    }

    /// Sets the rational search algorithm.
    pub fn with_rational_algorithm(mut self, algorithm: RationalAlgorithm) -> Self {
        self.rational.algorithm = algorithm;
        self
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let lin = &self.linearization;
        if !(lin.big_m.is_finite() && lin.big_m > 0.0) {
            return Err(invalid(format!("big_m must be positive, got {}", lin.big_m)));
        }
        if lin.aux_prefix.is_empty() {
            return Err(invalid("aux_prefix must not be empty"));
        }
        let pw = &lin.piecewise;
        if pw.segments == 0 {
            return Err(invalid("piecewise segments must be at least 1"));
        }
        if pw.adaptive_samples < pw.segments + 1 {
            return Err(invalid(format!(
                "adaptive_samples ({}) must be at least segments + 1 ({})",
                pw.adaptive_samples,
                pw.segments + 1
            )));
        }
        let gp = &self.goal_programming;
        if !(gp.priority_base.is_finite() && gp.priority_base > 1.0) {
            return Err(invalid(format!(
                "priority_base must be greater than 1, got {}",
                gp.priority_base
            )));
        }
        if !(gp.fixing_tolerance.is_finite() && gp.fixing_tolerance >= 0.0) {
            return Err(invalid("fixing_tolerance must be non-negative"));
        }
        let rat = &self.rational;
        if rat.max_denominator < 1 {
            return Err(invalid("max_denominator must be at least 1"));
        }
        if !(rat.tolerance.is_finite() && rat.tolerance >= 0.0) {
            return Err(invalid("rational tolerance must be non-negative"));
        }
        Ok(())
    }

    /// Builds a rational converter from the `[rational]` section.
    pub fn rational_converter(&self) -> RationalConverter {
        RationalConverter::new(self.rational.max_denominator)
            .with_tolerance(self.rational.tolerance)
            .with_algorithm(self.rational.algorithm)
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}

/// Linearization settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct LinearizationConfig {
    /// Big-M used when a variable bound is missing.
    pub big_m: f64,

    /// Prefix of generated auxiliary names.
    pub aux_prefix: String,

    /// Piecewise-linear approximation settings.
    pub piecewise: PiecewiseConfig,
}

impl Default for LinearizationConfig {
    fn default() -> Self {
        Self {
            big_m: 1e6,
            aux_prefix: "aux".to_string(),
            piecewise: PiecewiseConfig::default(),
        }
    }
}

/// Piecewise-linear approximation settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct PiecewiseConfig {
    /// Default number of segments.
    pub segments: usize,

    /// Default reformulation.
    pub method: PiecewiseMethod,

    /// Use curvature-adaptive breakpoints by default.
    pub adaptive: bool,

    /// Dense sample count for adaptive breakpoint placement.
    pub adaptive_samples: usize,
}

impl Default for PiecewiseConfig {
    fn default() -> Self {
        Self {
            segments: 10,
            method: PiecewiseMethod::Sos2,
            adaptive: false,
            adaptive_samples: 1000,
        }
    }
}

/// How goals are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalMode {
    /// One solve with priority-scaled weights.
    #[default]
    Weighted,

    /// One solve per priority level, most important first.
    Sequential,
}

/// How deviations achieved at one priority are held in later stages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviationFixing {
    /// `dev <= achieved + fixing_tolerance`.
    #[default]
    Tolerance,

    /// `dev == achieved`.
    Exact,
}

/// Goal-programming settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct GoalProgrammingConfig {
    /// Weighted or sequential.
    pub mode: GoalMode,

    /// Base of the priority weight `base^(offset - priority + 1)`.
    pub priority_base: f64,

    /// Exponent offset of the priority weight.
    pub priority_exponent_offset: i32,

    /// Fixing strategy between sequential stages.
    pub deviation_fixing: DeviationFixing,

    /// Slack used by [`DeviationFixing::Tolerance`].
    pub fixing_tolerance: f64,
}

impl Default for GoalProgrammingConfig {
    fn default() -> Self {
        Self {
            mode: GoalMode::Weighted,
            priority_base: 10.0,
            priority_exponent_offset: 6,
            deviation_fixing: DeviationFixing::Tolerance,
            fixing_tolerance: 1e-6,
        }
    }
}

/// Rational conversion settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct RationalConfig {
    /// Largest allowed denominator.
    pub max_denominator: i64,

    /// Tolerance for integer short-circuits and batch reconstruction.
    pub tolerance: f64,

    /// Search algorithm.
    pub algorithm: RationalAlgorithm,
}

impl Default for RationalConfig {
    fn default() -> Self {
        Self {
            max_denominator: 10_000,
            tolerance: 1e-9,
            algorithm: RationalAlgorithm::Farey,
        }
    }
}

#[cfg(test)]
mod tests;
