//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.tabsight.toml` files. The engine sections are handed to the analysis
//! functions explicitly; nothing here is global.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".tabsight.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Chart aggregation settings.
    #[serde(default)]
    pub chart: ChartConfig,

    /// Insight report thresholds.
    #[serde(default)]
    pub insights: InsightsConfig,

    /// Forecast settings.
    #[serde(default)]
    pub forecast: ForecastConfig,
}

/// Output format of rendered results.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory holding uploaded datasets and their metadata.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Default output format.
    #[serde(default)]
    pub output_format: OutputFormat,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            output_format: OutputFormat::default(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("uploads")
}

/// Chart aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    /// Histogram bins when a request does not name a count.
    #[serde(default = "default_bins")]
    pub default_bins: usize,

    /// Reduction used when a request does not name one.
    #[serde(default)]
    pub default_aggregation: crate::models::Aggregation,

    /// Rows shown by `preview`.
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            default_bins: default_bins(),
            default_aggregation: crate::models::Aggregation::Mean,
            preview_rows: default_preview_rows(),
        }
    }
}

fn default_bins() -> usize {
    10
}

fn default_preview_rows() -> usize {
    200
}

/// Thresholds used by the insight reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightsConfig {
    /// Entries in the top and bottom rankings.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Multiplier of the interquartile range for outlier fences.
    #[serde(default = "default_iqr_multiplier")]
    pub iqr_multiplier: f64,

    /// std/mean above which bar values are flagged as highly variable.
    #[serde(default = "default_variability_threshold")]
    pub variability_threshold: f64,

    /// Combined top-3 share (percent) flagged as concentrated.
    #[serde(default = "default_concentration_threshold")]
    pub concentration_threshold: f64,

    /// Single-segment share (percent) flagged as dominant.
    #[serde(default = "default_dominance_threshold")]
    pub dominance_threshold: f64,

    /// Coefficient of variation (percent) below which variability is low.
    #[serde(default = "default_cv_low")]
    pub cv_low: f64,

    /// Coefficient of variation (percent) below which variability is moderate.
    #[serde(default = "default_cv_moderate")]
    pub cv_moderate: f64,

    /// Record a failing report and keep going instead of failing the analysis.
    #[serde(default = "default_true")]
    pub isolate_failures: bool,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            iqr_multiplier: default_iqr_multiplier(),
            variability_threshold: default_variability_threshold(),
            concentration_threshold: default_concentration_threshold(),
            dominance_threshold: default_dominance_threshold(),
            cv_low: default_cv_low(),
            cv_moderate: default_cv_moderate(),
            isolate_failures: true,
        }
    }
}

fn default_top_n() -> usize {
    3
}

fn default_iqr_multiplier() -> f64 {
    1.5
}

fn default_variability_threshold() -> f64 {
    0.5
}

fn default_concentration_threshold() -> f64 {
    70.0
}

fn default_dominance_threshold() -> f64 {
    50.0
}

fn default_cv_low() -> f64 {
    15.0
}

fn default_cv_moderate() -> f64 {
    30.0
}

fn default_true() -> bool {
    true
}

/// Forecast settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Horizon used when a request does not name one.
    #[serde(default = "default_horizon")]
    pub default_horizon: usize,

    /// x ranges narrower than this extrapolate in unit steps.
    #[serde(default = "default_unit_step_range")]
    pub unit_step_range: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            default_horizon: default_horizon(),
            unit_step_range: default_unit_step_range(),
        }
    }
}

fn default_horizon() -> usize {
    3
}

fn default_unit_step_range() -> f64 {
    100.0
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref data_dir) = args.data_dir {
            self.general.data_dir = data_dir.clone();
        }
        if let Some(format) = args.format {
            self.general.output_format = format;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
