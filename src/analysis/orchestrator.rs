//! Multi-report analysis of an (x, y) column selection.

use super::insights::{bar_report, histogram_report, line_report, pie_report};
use crate::config::InsightsConfig;
use crate::error::EngineResult;
use crate::models::{AnalysisReport, ChartKind, DatasetSummary, ReportEntry, ReportOutcome};
use crate::table::Table;
use tracing::{info, warn};

/// Runs every applicable insight report.
///
/// Bar, line and pie reports run when `y` is given; the histogram report
/// runs when `x` is numeric. With `isolate_failures` a failing generator is
/// recorded as a failed entry and the rest still run; otherwise the first
/// failure aborts the whole analysis.
pub fn analyze(
    table: &Table,
    x: &str,
    y: Option<&str>,
    cfg: &InsightsConfig,
) -> EngineResult<AnalysisReport> {
    let x_column = table.column(x)?;
    if let Some(y) = y {
        table.column(y)?;
    }

    let mut planned: Vec<ChartKind> = Vec::new();
    if y.is_some() {
        planned.extend([ChartKind::Bar, ChartKind::Line, ChartKind::Pie]);
    }
    if x_column.is_numeric() {
        planned.push(ChartKind::Histogram);
    }

    let mut reports = Vec::with_capacity(planned.len());
    for kind in planned {
        let result = match (kind, y) {
            (ChartKind::Bar, Some(y)) => bar_report(table, x, y, cfg),
            (ChartKind::Line, Some(y)) => line_report(table, x, y, cfg),
            (ChartKind::Pie, Some(y)) => pie_report(table, x, y, cfg),
            _ => histogram_report(table, x, cfg),
        };

        let outcome = match result {
            Ok(report) => ReportOutcome::Ready { report },
            Err(e) if cfg.isolate_failures => {
                warn!("{} report failed: {}", kind, e);
                ReportOutcome::Failed {
                    error_kind: e.kind().to_string(),
                    message: e.to_string(),
                }
            }
            Err(e) => return Err(e),
        };

        reports.push(ReportEntry {
            serial: reports.len() + 1,
            chart_type: kind,
            outcome,
        });
    }

    info!(
        "Analysis of {} (x={}, y={}): {} reports",
        table.name(),
        x,
        y.unwrap_or("-"),
        reports.len()
    );

    Ok(AnalysisReport {
        dataset: DatasetSummary {
            name: table.name().to_string(),
            rows: table.row_count(),
            cols: table.column_count(),
            x_column: x.to_string(),
            y_column: y.map(String::from),
        },
        reports,
    })
}
