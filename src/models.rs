//! Data models for the analysis engine.
//!
//! Every type here is a request-scoped value object: computed fresh from a
//! table for each call and never mutated afterwards.

use crate::table::ColumnKind;
use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Sample value of a column, kept as a number when the column is numeric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampleValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for SampleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleValue::Number(n) => write!(f, "{}", crate::table::format_number(*n)),
            SampleValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Metadata of a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    /// Column name.
    pub name: String,
    /// Storage label (`int64`, `float64`, `object`, `unknown`).
    pub dtype: String,
    /// Inferred kind.
    pub kind: ColumnKind,
    /// Whether numeric-only operations accept the column.
    pub is_numeric: bool,
    /// Up to five distinct non-missing values in first-seen order.
    pub unique_sample: Vec<SampleValue>,
    /// Number of distinct non-missing values.
    pub unique_count: usize,
}

/// Schema of a whole table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaProfile {
    pub columns: Vec<ColumnProfile>,
    pub rows: usize,
    pub cols: usize,
}

/// Chart kinds the engine can aggregate for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    #[default]
    Bar,
    Line,
    Pie,
    Histogram,
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartKind::Bar => write!(f, "bar"),
            ChartKind::Line => write!(f, "line"),
            ChartKind::Pie => write!(f, "pie"),
            ChartKind::Histogram => write!(f, "histogram"),
        }
    }
}

/// Reduction applied to each group.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Sum,
    #[default]
    Mean,
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregation::Sum => write!(f, "sum"),
            Aggregation::Mean => write!(f, "mean"),
        }
    }
}

/// A request for chart-ready aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartRequest {
    pub x: String,
    #[serde(default)]
    pub y: Option<String>,
    #[serde(default)]
    pub kind: ChartKind,
    #[serde(default)]
    pub aggregation: Aggregation,
    /// Histogram bin count; the configured default applies when absent.
    #[serde(default)]
    pub bins: Option<usize>,
}

/// Labels with parallel values, ready to plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub labels: Vec<String>,
    /// `None` where a reduction is undefined (mean of an all-missing group).
    pub values: Vec<Option<f64>>,
    #[serde(rename = "type")]
    pub kind: ChartKind,
}

impl AggregateResult {
    /// Label/value pairs whose value is defined, in result order.
    pub fn defined(&self) -> Vec<(String, f64)> {
        self.labels
            .iter()
            .zip(&self.values)
            .filter_map(|(label, value)| value.map(|v| (label.clone(), v)))
            .collect()
    }
}

/// Named report statistics in insertion order. Undefined values serialize
/// as `null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statistics(Vec<(String, Option<f64>)>);

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: f64) {
        self.insert_opt(name, Some(value));
    }

    pub fn insert_opt(&mut self, name: &str, value: Option<f64>) {
        let value = value.filter(|v| v.is_finite());
        match self.0.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value,
            None => self.0.push((name.to_string(), value)),
        }
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, value)| *value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, Option<f64>)> {
        self.0.iter()
    }
}

impl Serialize for Statistics {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// A ranked group in a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub label: String,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
}

/// Direction of a fitted trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

impl TrendDirection {
    /// Classifies a slope by its sign; exactly zero is stable.
    pub fn from_slope(slope: f64) -> Self {
        if slope > 0.0 {
            TrendDirection::Increasing
        } else if slope < 0.0 {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        }
    }
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendDirection::Increasing => write!(f, "increasing"),
            TrendDirection::Decreasing => write!(f, "decreasing"),
            TrendDirection::Stable => write!(f, "stable"),
        }
    }
}

/// Shape of a distribution relative to its center.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Skewness {
    Symmetric,
    RightSkewed,
    LeftSkewed,
}

impl fmt::Display for Skewness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Skewness::Symmetric => write!(f, "approximately symmetric"),
            Skewness::RightSkewed => write!(f, "right-skewed"),
            Skewness::LeftSkewed => write!(f, "left-skewed"),
        }
    }
}

/// Coefficient-of-variation band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Variability {
    Low,
    Moderate,
    High,
    /// The mean is zero, so the coefficient is not defined.
    Undefined,
}

impl fmt::Display for Variability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variability::Low => write!(f, "low"),
            Variability::Moderate => write!(f, "moderate"),
            Variability::High => write!(f, "high"),
            Variability::Undefined => write!(f, "undefined"),
        }
    }
}

/// Statistical insight report for one chart type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightReport {
    pub chart_type: ChartKind,
    pub summary: String,
    pub statistics: Statistics,
    pub top: Vec<RankedEntry>,
    pub bottom: Vec<RankedEntry>,
    pub key_insights: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<TrendDirection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skewness: Option<Skewness>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variability: Option<Variability>,
}

impl InsightReport {
    pub fn new(chart_type: ChartKind, summary: String) -> Self {
        Self {
            chart_type,
            summary,
            statistics: Statistics::new(),
            top: Vec::new(),
            bottom: Vec::new(),
            key_insights: Vec::new(),
            trend: None,
            skewness: None,
            variability: None,
        }
    }
}

/// One predicted point of a forecast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub x: f64,
    pub y: f64,
    /// 1-based position after the last observation.
    pub step: usize,
}

/// Fitted line and its quality.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub r_squared: f64,
    pub slope: f64,
    pub intercept: f64,
    pub trend: TrendDirection,
}

/// Bounds of the observed points, for axis scaling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservedSummary {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub count: usize,
}

/// Linear-trend forecast over two numeric columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResult {
    pub x_column: String,
    pub y_column: String,
    pub step_size: f64,
    pub predictions: Vec<ForecastPoint>,
    pub model: ModelInfo,
    pub observed: ObservedSummary,
}

/// Dataset section of an analysis response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub name: String,
    pub rows: usize,
    pub cols: usize,
    pub x_column: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_column: Option<String>,
}

/// Result of a single report generator within an analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ReportOutcome {
    Ready { report: InsightReport },
    Failed { error_kind: String, message: String },
}

/// A numbered report in an analysis response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    pub serial: usize,
    pub chart_type: ChartKind,
    #[serde(flatten)]
    pub outcome: ReportOutcome,
}

/// Multi-report analysis of an (x, y) selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub dataset: DatasetSummary,
    pub reports: Vec<ReportEntry>,
}

/// Stored dataset metadata, persisted next to the data file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    /// Stored file name, also the dataset identifier.
    pub id: String,
    pub original_name: String,
    pub upload_time: DateTime<Utc>,
    pub rows: usize,
    pub cols: usize,
    pub metadata: SchemaProfile,
}

/// First rows of a dataset, missing cells rendered as empty strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Preview {
    pub columns: Vec<String>,
    pub rows: Vec<serde_json::Map<String, serde_json::Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trend_direction_from_slope() {
        assert_eq!(TrendDirection::from_slope(0.3), TrendDirection::Increasing);
        assert_eq!(TrendDirection::from_slope(-1e-9), TrendDirection::Decreasing);
        assert_eq!(TrendDirection::from_slope(0.0), TrendDirection::Stable);
    }

    #[test]
    fn test_statistics_serialize_in_order_with_nulls() {
        let mut stats = Statistics::new();
        stats.insert("count", 3.0);
        stats.insert_opt("cv", None);
        stats.insert("mean", f64::NAN);

        let json = serde_json::to_string(&stats).unwrap();
        assert_eq!(json, r#"{"count":3.0,"cv":null,"mean":null}"#);
        assert_eq!(stats.get("count"), Some(3.0));
        assert_eq!(stats.get("cv"), None);
    }

    #[test]
    fn test_aggregate_result_serializes_type_tag() {
        let result = AggregateResult {
            labels: vec!["a".to_string(), "b".to_string()],
            values: vec![Some(1.5), None],
            kind: ChartKind::Line,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["type"], "line");
        assert!(json["values"][1].is_null());
        assert_eq!(result.defined(), vec![("a".to_string(), 1.5)]);
    }

    #[test]
    fn test_report_entry_flattens_outcome() {
        let entry = ReportEntry {
            serial: 2,
            chart_type: ChartKind::Pie,
            outcome: ReportOutcome::Failed {
                error_kind: "InvalidColumnError".to_string(),
                message: "bad".to_string(),
            },
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["serial"], 2);
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error_kind"], "InvalidColumnError");
    }
}
