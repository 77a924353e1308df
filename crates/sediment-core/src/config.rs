use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SedimentError;
use crate::weights::Weights;

/// Top-level configuration loaded from `.sediment.toml`.
///
/// Out-of-range values are clamped on load and the weight vector is
/// renormalized, so a loaded config is always safe to score with.
///
/// # Examples
///
/// ```
/// use sediment_core::SedimentConfig;
///
/// let config = SedimentConfig::default();
/// assert_eq!(config.analysis.history_days, 90);
/// assert_eq!(config.thresholds.warning, 65.0);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SedimentConfig {
    /// History window and worker settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// Score thresholds.
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    /// Composite component weights.
    #[serde(default)]
    pub weights: Weights,
}

impl SedimentConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SedimentError::Io`] if the file cannot be read, or
    /// [`SedimentError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use sediment_core::SedimentConfig;
    /// use std::path::Path;
    ///
    /// let config = SedimentConfig::from_file(Path::new(".sediment.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, SedimentError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string, clamping ranges and
    /// renormalizing weights.
    ///
    /// # Errors
    ///
    /// Returns [`SedimentError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use sediment_core::SedimentConfig;
    ///
    /// let toml = r#"
    /// [analysis]
    /// history_days = 30
    /// "#;
    /// let config = SedimentConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.analysis.history_days, 30);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, SedimentError> {
        let mut config: Self = toml::from_str(content)?;
        config.sanitize();
        Ok(config)
    }

    /// Serialize the configuration back to TOML, for writing adjusted
    /// weights to disk.
    ///
    /// # Errors
    ///
    /// Returns [`SedimentError::Config`] if serialization fails.
    pub fn to_toml(&self) -> Result<String, SedimentError> {
        toml::to_string_pretty(self)
            .map_err(|e| SedimentError::Config(format!("failed to serialize config: {e}")))
    }

    /// Clamp every setting into its documented range and renormalize the
    /// weight vector. Idempotent.
    pub fn sanitize(&mut self) {
        self.analysis.history_days = self.analysis.history_days.clamp(7, 365);
        self.analysis.churn_percentile = self.analysis.churn_percentile.clamp(50, 99);
        self.analysis.max_files_per_commit = self.analysis.max_files_per_commit.clamp(1, 100);
        self.analysis.max_workers = self.analysis.max_workers.clamp(1, 32);
        self.thresholds.warning = self.thresholds.warning.clamp(30.0, 90.0);
        self.thresholds.critical = self.thresholds.critical.clamp(50.0, 100.0);
        self.thresholds.bus_factor = self.thresholds.bus_factor.clamp(50, 95);
        self.weights.normalize();
    }
}

/// History window and worker settings.
///
/// # Examples
///
/// ```
/// use sediment_core::AnalysisConfig;
///
/// let config = AnalysisConfig::default();
/// assert_eq!(config.churn_percentile, 90);
/// assert_eq!(config.max_workers, 8);
/// assert!(config.exclude.is_empty());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Days of history to mine (clamped 7–365, default 90).
    #[serde(default = "default_history_days")]
    pub history_days: u64,
    /// Churn percentile that maps to a raw score of 100 (clamped 50–99,
    /// default 90).
    #[serde(default = "default_churn_percentile")]
    pub churn_percentile: u8,
    /// Commits touching more files than this are skipped (default 25).
    #[serde(default = "default_max_files_per_commit")]
    pub max_files_per_commit: usize,
    /// Parallel per-file workers (clamped 1–32, default 8).
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    /// Glob patterns excluded from scoring, on top of gitignore.
    #[serde(default)]
    pub exclude: Vec<String>,
}

fn default_history_days() -> u64 {
    90
}

fn default_churn_percentile() -> u8 {
    90
}

fn default_max_files_per_commit() -> usize {
    25
}

fn default_max_workers() -> usize {
    8
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            history_days: default_history_days(),
            churn_percentile: default_churn_percentile(),
            max_files_per_commit: default_max_files_per_commit(),
            max_workers: default_max_workers(),
            exclude: Vec::new(),
        }
    }
}

/// Score thresholds.
///
/// # Examples
///
/// ```
/// use sediment_core::ThresholdConfig;
///
/// let config = ThresholdConfig::default();
/// assert_eq!(config.critical, 80.0);
/// assert!((config.bus_factor_ratio() - 0.70).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Composite score above which a file counts as high-debt
    /// (clamped 30–90, default 65).
    #[serde(default = "default_warning")]
    pub warning: f64,
    /// Composite score treated as critical (clamped 50–100, default 80).
    #[serde(default = "default_critical")]
    pub critical: f64,
    /// Ownership percentage above which knowledge concentration starts
    /// scoring (clamped 50–95, default 70).
    #[serde(default = "default_bus_factor")]
    pub bus_factor: u8,
}

fn default_warning() -> f64 {
    65.0
}

fn default_critical() -> f64 {
    80.0
}

fn default_bus_factor() -> u8 {
    70
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            warning: default_warning(),
            critical: default_critical(),
            bus_factor: default_bus_factor(),
        }
    }
}

impl ThresholdConfig {
    /// The bus-factor threshold as a ratio in `[0.5, 0.95]`.
    pub fn bus_factor_ratio(&self) -> f64 {
        f64::from(self.bus_factor) / 100.0
    }
}
