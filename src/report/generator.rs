//! Report rendering.
//!
//! This module renders command results as Markdown documents or as the
//! JSON payloads an HTTP layer would return.

use crate::models::{
    AggregateResult, AnalysisReport, ChartRequest, ColumnProfile, DatasetRecord, ForecastResult,
    InsightReport, Preview, RankedEntry, ReportOutcome, SchemaProfile,
};
use anyhow::Result;
use chrono::Utc;
use serde_json::{json, Value};
use std::io::Write;
use std::path::Path;

/// Result of one command, ready to render.
#[derive(Debug, Clone)]
pub enum Output {
    Uploaded(DatasetRecord),
    Datasets(Vec<DatasetRecord>),
    Columns {
        dataset: String,
        columns: Vec<ColumnProfile>,
    },
    Profile {
        name: String,
        profile: SchemaProfile,
    },
    Preview {
        dataset: String,
        preview: Preview,
    },
    Chart {
        dataset: String,
        request: ChartRequest,
        result: AggregateResult,
    },
    Analysis(AnalysisReport),
    Forecast {
        dataset: String,
        result: ForecastResult,
    },
    Deleted {
        id: String,
    },
}

/// Generate the JSON payload of a result.
pub fn generate_json_report(output: &Output) -> Result<String> {
    let value: Value = match output {
        Output::Uploaded(record) => json!({ "success": true, "dataset": record }),
        Output::Datasets(records) => serde_json::to_value(records)?,
        Output::Columns { columns, .. } => serde_json::to_value(columns)?,
        Output::Profile { profile, .. } => serde_json::to_value(profile)?,
        Output::Preview { preview, .. } => serde_json::to_value(preview)?,
        Output::Chart { result, .. } => serde_json::to_value(result)?,
        Output::Analysis(report) => serde_json::to_value(report)?,
        Output::Forecast { result, .. } => serde_json::to_value(result)?,
        Output::Deleted { id } => json!({
            "success": true,
            "id": id,
            "message": "Dataset deleted successfully",
        }),
    };
    serde_json::to_string_pretty(&value).map_err(Into::into)
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(output: &Output) -> String {
    let mut doc = String::new();

    doc.push_str("# Tabsight Report\n\n");
    doc.push_str(&format!(
        "*Generated {}*\n\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));

    match output {
        Output::Uploaded(record) => {
            doc.push_str("## Upload\n\n");
            doc.push_str(&generate_record_section(record));
            doc.push_str(&generate_columns_table(&record.metadata.columns));
        }
        Output::Datasets(records) => doc.push_str(&generate_datasets_section(records)),
        Output::Columns { dataset, columns } => {
            doc.push_str(&format!("## Columns of `{}`\n\n", dataset));
            doc.push_str(&generate_columns_table(columns));
        }
        Output::Profile { name, profile } => {
            doc.push_str(&format!("## Profile of `{}`\n\n", name));
            doc.push_str(&format!(
                "- **Rows:** {}\n- **Columns:** {}\n\n",
                profile.rows, profile.cols
            ));
            doc.push_str(&generate_columns_table(&profile.columns));
        }
        Output::Preview { dataset, preview } => {
            doc.push_str(&generate_preview_section(dataset, preview))
        }
        Output::Chart {
            dataset,
            request,
            result,
        } => doc.push_str(&generate_chart_section(dataset, request, result)),
        Output::Analysis(report) => doc.push_str(&generate_analysis_section(report)),
        Output::Forecast { dataset, result } => {
            doc.push_str(&generate_forecast_section(dataset, result))
        }
        Output::Deleted { id } => {
            doc.push_str(&format!("Dataset `{}` deleted successfully.\n\n", id))
        }
    }

    doc.push_str(&generate_footer());
    doc
}

fn fmt_opt(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "n/a".to_string(),
    }
}

/// Escape pipe characters so cell text does not break a table row.
fn cell(text: &str) -> String {
    text.replace('|', "\\|")
}

fn generate_record_section(record: &DatasetRecord) -> String {
    let mut section = String::new();
    section.push_str(&format!("- **Id:** `{}`\n", record.id));
    section.push_str(&format!("- **Original Name:** {}\n", record.original_name));
    section.push_str(&format!(
        "- **Uploaded:** {}\n",
        record.upload_time.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Rows:** {}\n", record.rows));
    section.push_str(&format!("- **Columns:** {}\n\n", record.cols));
    section
}

fn generate_datasets_section(records: &[DatasetRecord]) -> String {
    let mut section = String::new();
    section.push_str("## Datasets\n\n");

    if records.is_empty() {
        section.push_str("No datasets uploaded yet.\n\n");
        return section;
    }

    section.push_str("| Id | Original Name | Uploaded | Rows | Columns |\n");
    section.push_str("|:---|:---|:---|:---:|:---:|\n");
    for record in records {
        section.push_str(&format!(
            "| `{}` | {} | {} | {} | {} |\n",
            record.id,
            cell(&record.original_name),
            record.upload_time.format("%Y-%m-%d %H:%M:%S"),
            record.rows,
            record.cols
        ));
    }
    section.push('\n');
    section
}

fn generate_columns_table(columns: &[ColumnProfile]) -> String {
    let mut section = String::new();
    section.push_str("| Column | Type | Kind | Distinct | Sample |\n");
    section.push_str("|:---|:---|:---|:---:|:---|\n");

    for column in columns {
        let sample: Vec<String> = column
            .unique_sample
            .iter()
            .map(|v| cell(&v.to_string()))
            .collect();
        section.push_str(&format!(
            "| {} | `{}` | {} | {} | {} |\n",
            cell(&column.name),
            column.dtype,
            column.kind,
            column.unique_count,
            sample.join(", ")
        ));
    }
    section.push('\n');
    section
}

fn generate_preview_section(dataset: &str, preview: &Preview) -> String {
    let mut section = String::new();
    section.push_str(&format!(
        "## Preview of `{}` ({} rows)\n\n",
        dataset,
        preview.rows.len()
    ));

    let header: Vec<String> = preview.columns.iter().map(|c| cell(c)).collect();
    section.push_str(&format!("| {} |\n", header.join(" | ")));
    section.push_str(&format!("|{}\n", ":---|".repeat(preview.columns.len())));

    for row in &preview.rows {
        let cells: Vec<String> = preview
            .columns
            .iter()
            .map(|c| match row.get(c) {
                Some(Value::String(s)) => cell(s),
                Some(other) => other.to_string(),
                None => String::new(),
            })
            .collect();
        section.push_str(&format!("| {} |\n", cells.join(" | ")));
    }
    section.push('\n');
    section
}

fn generate_chart_section(
    dataset: &str,
    request: &ChartRequest,
    result: &AggregateResult,
) -> String {
    let mut section = String::new();
    section.push_str(&format!("## {} chart of `{}`\n\n", result.kind, dataset));
    section.push_str(&format!("- **X:** {}\n", request.x));
    if let Some(ref y) = request.y {
        section.push_str(&format!("- **Y:** {} ({})\n", y, request.aggregation));
    }
    section.push_str(&format!("- **Groups:** {}\n\n", result.labels.len()));

    section.push_str("| Label | Value |\n");
    section.push_str("|:---|---:|\n");
    for (label, value) in result.labels.iter().zip(&result.values) {
        section.push_str(&format!("| {} | {} |\n", cell(label), fmt_opt(*value)));
    }
    section.push('\n');
    section
}

fn generate_analysis_section(report: &AnalysisReport) -> String {
    let mut section = String::new();
    let dataset = &report.dataset;

    section.push_str("## Dataset\n\n");
    section.push_str(&format!("- **Name:** `{}`\n", dataset.name));
    section.push_str(&format!(
        "- **Rows:** {} | **Columns:** {}\n",
        dataset.rows, dataset.cols
    ));
    section.push_str(&format!("- **X:** {}\n", dataset.x_column));
    if let Some(ref y) = dataset.y_column {
        section.push_str(&format!("- **Y:** {}\n", y));
    }
    section.push('\n');

    if report.reports.is_empty() {
        section.push_str("No report applies to this column selection.\n\n");
        return section;
    }

    for entry in &report.reports {
        section.push_str(&format!(
            "## {}. {} report\n\n",
            entry.serial, entry.chart_type
        ));
        match &entry.outcome {
            ReportOutcome::Ready { report } => section.push_str(&generate_insight_block(report)),
            ReportOutcome::Failed {
                error_kind,
                message,
            } => section.push_str(&format!("> **{}:** {}\n\n", error_kind, message)),
        }
    }

    section
}

/// Generate a single insight report block.
fn generate_insight_block(report: &InsightReport) -> String {
    let mut block = String::new();

    block.push_str(&format!("{}\n\n", report.summary));

    block.push_str("| Statistic | Value |\n");
    block.push_str("|:---|---:|\n");
    for (name, value) in report.statistics.iter() {
        block.push_str(&format!("| {} | {} |\n", name, fmt_opt(*value)));
    }
    block.push('\n');

    if !report.top.is_empty() {
        block.push_str(&generate_ranking("Top", &report.top));
    }
    if !report.bottom.is_empty() {
        block.push_str(&generate_ranking("Bottom", &report.bottom));
    }

    if !report.key_insights.is_empty() {
        block.push_str("**Key insights:**\n\n");
        for insight in &report.key_insights {
            block.push_str(&format!("- {}\n", insight));
        }
        block.push('\n');
    }

    block
}

fn generate_ranking(title: &str, entries: &[RankedEntry]) -> String {
    let mut ranking = format!("**{}:**\n\n", title);
    for (i, entry) in entries.iter().enumerate() {
        match entry.percentage {
            Some(p) => ranking.push_str(&format!(
                "{}. {}: {:.2} ({:.2}%)\n",
                i + 1,
                entry.label,
                entry.value,
                p
            )),
            None => ranking.push_str(&format!("{}. {}: {:.2}\n", i + 1, entry.label, entry.value)),
        }
    }
    ranking.push('\n');
    ranking
}

fn generate_forecast_section(dataset: &str, result: &ForecastResult) -> String {
    let mut section = String::new();
    let model = &result.model;
    let observed = &result.observed;

    section.push_str(&format!(
        "## Forecast of {} by {} in `{}`\n\n",
        result.y_column, result.x_column, dataset
    ));
    section.push_str(&format!(
        "- **Model:** y = {:.4} * x + {:.4}\n",
        model.slope, model.intercept
    ));
    section.push_str(&format!("- **R²:** {:.4}\n", model.r_squared));
    section.push_str(&format!("- **Trend:** {}\n", model.trend));
    section.push_str(&format!(
        "- **Observed:** {} points, x in [{:.2}, {:.2}], y in [{:.2}, {:.2}]\n",
        observed.count, observed.min_x, observed.max_x, observed.min_y, observed.max_y
    ));
    section.push_str(&format!("- **Step:** {:.2}\n\n", result.step_size));

    section.push_str("| Step | X | Predicted Y |\n");
    section.push_str("|:---:|---:|---:|\n");
    for point in &result.predictions {
        section.push_str(&format!(
            "| {} | {:.2} | {:.2} |\n",
            point.step, point.x, point.y
        ));
    }
    section.push('\n');
    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    "---\n\n*Report generated by Tabsight*\n".to_string()
}

/// Write a rendered report to a file.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{analyze, forecast};
    use crate::config::{ForecastConfig, InsightsConfig};
    use crate::models::{Aggregation, ChartKind};
    use crate::table::{parse_str, Delimiter, Table};

    fn create_test_table() -> Table {
        parse_str(
            "shop.csv",
            "month,region,sales\n1,north,10\n2,south,20\n3,north,30\n4,east,25\n",
            Delimiter::Comma,
        )
        .unwrap()
    }

    #[test]
    fn test_generate_analysis_markdown() {
        let table = create_test_table();
        let report = analyze(&table, "region", Some("sales"), &InsightsConfig::default()).unwrap();
        let markdown = generate_markdown_report(&Output::Analysis(report));

        assert!(markdown.contains("# Tabsight Report"));
        assert!(markdown.contains("## 1. bar report"));
        assert!(markdown.contains("## 3. pie report"));
        assert!(markdown.contains("**Key insights:**"));
        assert!(markdown.contains("Largest segment: north"));
        assert!(markdown.contains("*Report generated by Tabsight*"));
    }

    #[test]
    fn test_generate_chart_markdown_and_json() {
        let output = Output::Chart {
            dataset: "shop.csv".to_string(),
            request: ChartRequest {
                x: "region".to_string(),
                y: Some("sales".to_string()),
                kind: ChartKind::Bar,
                aggregation: Aggregation::Mean,
                bins: None,
            },
            result: AggregateResult {
                labels: vec!["a|b".to_string(), "c".to_string()],
                values: vec![Some(1.0), None],
                kind: ChartKind::Bar,
            },
        };

        let markdown = generate_markdown_report(&output);
        assert!(markdown.contains("| a\\|b | 1.00 |"));
        assert!(markdown.contains("| c | n/a |"));

        let json = generate_json_report(&output).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "bar");
        assert!(value["values"][1].is_null());
    }

    #[test]
    fn test_generate_forecast_markdown() {
        let table = parse_str("t.csv", "x,y\n1,2\n2,4\n3,6\n", Delimiter::Comma).unwrap();
        let result = forecast(&table, "x", "y", 3, &ForecastConfig::default()).unwrap();
        let markdown = generate_markdown_report(&Output::Forecast {
            dataset: "t.csv".to_string(),
            result,
        });

        assert!(markdown.contains("- **Trend:** increasing"));
        assert!(markdown.contains("| 1 | 4.00 | 8.00 |"));
    }

    #[test]
    fn test_deleted_json_payload() {
        let json = generate_json_report(&Output::Deleted {
            id: "20240101000000_a.csv".to_string(),
        })
        .unwrap();
        assert!(json.contains("\"success\": true"));
        assert!(json.contains("Dataset deleted successfully"));
    }

    #[test]
    fn test_empty_datasets_section() {
        let markdown = generate_markdown_report(&Output::Datasets(Vec::new()));
        assert!(markdown.contains("No datasets uploaded yet."));
    }

    #[test]
    fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.md");
        write_report("# hello\n", &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# hello\n");
    }
}
