//! Statistical insight reports per chart type.
//!
//! Each generator is a pure function of the table: it aggregates the
//! selected columns, computes descriptive statistics and annotates them
//! with short key-insight sentences.

use super::aggregator::{group_reduce, group_reduce_present};
use super::stats::{self, LinearFit};
use crate::config::InsightsConfig;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    Aggregation, ChartKind, InsightReport, RankedEntry, Skewness, TrendDirection, Variability,
};
use crate::table::Table;
use std::cmp::Ordering;

/// Defined (label, value) pairs of a grouped reduction, failing when no
/// group has a usable value. Line reports leave out the missing-x group,
/// since it has no position on the x axis.
fn grouped_series(
    table: &Table,
    x: &str,
    y: &str,
    agg: Aggregation,
    report: ChartKind,
) -> EngineResult<(Vec<String>, Vec<f64>)> {
    let grouped = match report {
        ChartKind::Line => group_reduce_present(table, x, y, agg)?,
        _ => group_reduce(table, x, y, agg)?,
    };
    let series = grouped.defined();
    if series.is_empty() {
        return Err(EngineError::insufficient(
            format!("{} report of '{}' by '{}'", report, y, x),
            1,
            0,
        ));
    }
    Ok(series.into_iter().unzip())
}

/// Entries sorted by value; the sort is stable so ties keep group order.
fn rank(labels: &[String], values: &[f64], descending: bool, n: usize) -> Vec<RankedEntry> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| {
        let cmp = values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal);
        if descending {
            cmp.reverse()
        } else {
            cmp
        }
    });
    order
        .into_iter()
        .take(n)
        .map(|i| RankedEntry {
            label: labels[i].clone(),
            value: values[i],
            percentage: None,
        })
        .collect()
}

/// Index of the first maximum / minimum.
fn arg_extreme(values: &[f64], want: Ordering) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if v.partial_cmp(&values[best]) == Some(want) {
            best = i;
        }
    }
    best
}

fn outlier_sentence(count: usize, what: &str) -> String {
    match count {
        0 => format!("No {} outliers detected (1.5x IQR rule)", what),
        1 => format!("1 {} outlier detected (1.5x IQR rule)", what),
        n => format!("{} {} outliers detected (1.5x IQR rule)", n, what),
    }
}

/// Bar report: mean of `y` per `x` category.
pub fn bar_report(
    table: &Table,
    x: &str,
    y: &str,
    cfg: &InsightsConfig,
) -> EngineResult<InsightReport> {
    let (labels, values) = grouped_series(table, x, y, Aggregation::Mean, ChartKind::Bar)?;

    let max_i = arg_extreme(&values, Ordering::Greater);
    let min_i = arg_extreme(&values, Ordering::Less);
    let mean = stats::mean(&values).unwrap_or_default();
    let std = stats::std_dev(&values).unwrap_or_default();
    let outliers = stats::iqr_outlier_count(&values, cfg.iqr_multiplier);

    let mut report = InsightReport::new(
        ChartKind::Bar,
        format!(
            "Average {} across {} categories of {}",
            y,
            values.len(),
            x
        ),
    );
    report.statistics.insert("categories", values.len() as f64);
    report.statistics.insert("max", values[max_i]);
    report.statistics.insert("min", values[min_i]);
    report.statistics.insert("mean", mean);
    report.statistics.insert_opt("median", stats::median(&values));
    report.statistics.insert("std_dev", std);
    report.statistics.insert("outliers", outliers as f64);

    report.top = rank(&labels, &values, true, cfg.top_n);
    report.bottom = rank(&labels, &values, false, cfg.top_n);

    report.key_insights.push(format!(
        "Values range from {:.2} ({}) to {:.2} ({})",
        values[min_i], labels[min_i], values[max_i], labels[max_i]
    ));
    match stats::ratio(std, mean) {
        Some(r) if r.abs() > cfg.variability_threshold => report.key_insights.push(format!(
            "High variability across categories (std/mean = {:.2})",
            r.abs()
        )),
        Some(_) => report
            .key_insights
            .push("Values are fairly consistent across categories".to_string()),
        None => report
            .key_insights
            .push("Variability is undefined because the mean is zero".to_string()),
    }
    report
        .key_insights
        .push(outlier_sentence(outliers, "category"));

    Ok(report)
}

/// Line report: mean of `y` per `x`, read in ascending `x` order.
pub fn line_report(
    table: &Table,
    x: &str,
    y: &str,
    _cfg: &InsightsConfig,
) -> EngineResult<InsightReport> {
    let (labels, values) = grouped_series(table, x, y, Aggregation::Mean, ChartKind::Line)?;

    let first = values[0];
    let last = values[values.len() - 1];
    let max_i = arg_extreme(&values, Ordering::Greater);
    let min_i = arg_extreme(&values, Ordering::Less);
    let mean = stats::mean(&values).unwrap_or_default();

    let slope = LinearFit::fit_indexed(&values).map(|fit| fit.slope);
    let trend = TrendDirection::from_slope(slope.unwrap_or(0.0));
    let percent_change = stats::ratio(last - first, first).map(|r| r * 100.0);
    let volatility = stats::std_dev(&values)
        .and_then(|std| stats::ratio(std, mean))
        .map(|r| r * 100.0);

    let mut report = InsightReport::new(
        ChartKind::Line,
        format!(
            "Average {} over {} points of {}, trending {}",
            y,
            values.len(),
            x,
            trend
        ),
    );
    report.statistics.insert("points", values.len() as f64);
    report.statistics.insert("first", first);
    report.statistics.insert("last", last);
    report.statistics.insert("max", values[max_i]);
    report.statistics.insert("min", values[min_i]);
    report.statistics.insert("mean", mean);
    report.statistics.insert_opt("slope", slope);
    report.statistics.insert_opt("percent_change", percent_change);
    report.statistics.insert_opt("volatility_index", volatility);
    report.trend = Some(trend);

    report.key_insights.push(match slope {
        Some(s) => format!("Overall trend is {} (slope {:.2} per step)", trend, s),
        None => "A single point has no trend".to_string(),
    });
    report.key_insights.push(match percent_change {
        Some(p) => format!("Changed by {:+.2}% from first to last point", p),
        None => "Percent change is undefined because the first value is zero".to_string(),
    });
    report.key_insights.push(match volatility {
        Some(v) => format!("Volatility index: {:.2}%", v.abs()),
        None => "Volatility index is undefined because the mean is zero".to_string(),
    });
    report.key_insights.push(format!(
        "Peak of {:.2} at {}; trough of {:.2} at {}",
        values[max_i], labels[max_i], values[min_i], labels[min_i]
    ));

    Ok(report)
}

/// Pie report: each `x` group's share of the summed `y`.
pub fn pie_report(
    table: &Table,
    x: &str,
    y: &str,
    cfg: &InsightsConfig,
) -> EngineResult<InsightReport> {
    let (labels, values) = grouped_series(table, x, y, Aggregation::Sum, ChartKind::Pie)?;
    let total: f64 = values.iter().sum();

    let mut segments = rank(&labels, &values, true, values.len());
    for segment in &mut segments {
        segment.percentage = stats::ratio(segment.value, total).map(|r| r * 100.0);
    }

    let mut report = InsightReport::new(
        ChartKind::Pie,
        format!("Share of total {} by {} across {} segments", y, x, segments.len()),
    );
    report.statistics.insert("segments", segments.len() as f64);
    report.statistics.insert("total", total);

    let shares: Option<Vec<f64>> = segments.iter().map(|s| s.percentage).collect();
    match shares {
        Some(shares) => {
            let largest = &segments[0];
            let top3: f64 = shares.iter().take(3).sum();
            report.statistics.insert("largest_share", shares[0]);
            report.statistics.insert("top3_share", top3);

            report.key_insights.push(format!(
                "Largest segment: {} with {:.2}% of the total",
                largest.label, shares[0]
            ));
            if top3 > cfg.concentration_threshold {
                report.key_insights.push(format!(
                    "Highly concentrated: the top 3 segments hold {:.2}% of the total",
                    top3
                ));
            }
            if let Some(dominant) = segments
                .iter()
                .find(|s| s.percentage.unwrap_or_default() > cfg.dominance_threshold)
            {
                report.key_insights.push(format!(
                    "{} dominates with {:.2}% of the total",
                    dominant.label,
                    dominant.percentage.unwrap_or_default()
                ));
            }
        }
        None => {
            report.statistics.insert_opt("largest_share", None);
            report.statistics.insert_opt("top3_share", None);
            report
                .key_insights
                .push("Shares are undefined because the total is zero".to_string());
        }
    }

    report.top = segments;
    Ok(report)
}

/// Histogram report: distribution of the raw values of numeric column `x`.
pub fn histogram_report(
    table: &Table,
    x: &str,
    cfg: &InsightsConfig,
) -> EngineResult<InsightReport> {
    let column = table.numeric_column(x)?;
    let values = column.present_numbers().unwrap_or_default();
    let (Some(quart), Some(mean), Some(std)) = (
        stats::quartiles(&values),
        stats::mean(&values),
        stats::std_dev(&values),
    ) else {
        return Err(EngineError::insufficient(
            format!("histogram report of '{}'", x),
            1,
            0,
        ));
    };

    let min = stats::min(&values).unwrap_or_default();
    let max = stats::max(&values).unwrap_or_default();
    let median = quart.q2;
    let outliers = stats::iqr_outlier_count(&values, cfg.iqr_multiplier);
    let cv = stats::coefficient_of_variation(&values);

    let skewness = if std == 0.0 || (mean - median).abs() < 0.1 * std {
        Skewness::Symmetric
    } else if mean > median {
        Skewness::RightSkewed
    } else {
        Skewness::LeftSkewed
    };

    let variability = match cv.map(f64::abs) {
        None => Variability::Undefined,
        Some(c) if c < cfg.cv_low => Variability::Low,
        Some(c) if c < cfg.cv_moderate => Variability::Moderate,
        Some(_) => Variability::High,
    };

    let mut report = InsightReport::new(
        ChartKind::Histogram,
        format!("Distribution of {} over {} values", x, values.len()),
    );
    let s = &mut report.statistics;
    s.insert("count", values.len() as f64);
    s.insert("mean", mean);
    s.insert("median", median);
    s.insert_opt("mode", stats::mode(&values));
    s.insert("std_dev", std);
    s.insert("min", min);
    s.insert("max", max);
    s.insert("range", max - min);
    s.insert("q1", quart.q1);
    s.insert("q2", quart.q2);
    s.insert("q3", quart.q3);
    s.insert("outliers", outliers as f64);
    s.insert_opt("cv", cv);
    report.skewness = Some(skewness);
    report.variability = Some(variability);

    report.key_insights.push(format!(
        "Distribution is {} (mean {:.2}, median {:.2})",
        skewness, mean, median
    ));
    report.key_insights.push(format!(
        "Middle 50% of values lie between {:.2} and {:.2}",
        quart.q1, quart.q3
    ));
    report.key_insights.push(outlier_sentence(outliers, "value"));
    report.key_insights.push(match cv {
        Some(c) => format!(
            "Coefficient of variation {:.2}% indicates {} variability",
            c.abs(),
            variability
        ),
        None => "Coefficient of variation is undefined because the mean is zero".to_string(),
    });

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{parse_str, Delimiter};

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn table(csv: &str) -> Table {
        parse_str("t.csv", csv, Delimiter::Comma).unwrap()
    }

    fn cfg() -> InsightsConfig {
        InsightsConfig::default()
    }

    #[test]
    fn test_bar_report_statistics_and_ranking() {
        let t = table("team,score\na,1\nb,2\nc,3\nd,4\ne,100\na,1\n");
        let report = bar_report(&t, "team", "score", &cfg()).unwrap();

        assert_eq!(report.chart_type, ChartKind::Bar);
        assert_eq!(report.statistics.get("categories"), Some(5.0));
        assert_eq!(report.statistics.get("max"), Some(100.0));
        assert_eq!(report.statistics.get("min"), Some(1.0));
        assert_eq!(report.statistics.get("median"), Some(3.0));
        assert_eq!(report.statistics.get("outliers"), Some(1.0));

        let top: Vec<_> = report.top.iter().map(|e| e.label.as_str()).collect();
        let bottom: Vec<_> = report.bottom.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(top, vec!["e", "d", "c"]);
        assert_eq!(bottom, vec!["a", "b", "c"]);
        assert!(report.key_insights.iter().any(|s| s.contains("High variability")));
        assert!(report.key_insights.iter().any(|s| s.contains("1 category outlier")));
    }

    #[test]
    fn test_bar_report_ties_keep_group_order() {
        let t = table("k,v\nb,5\na,5\nc,1\n");
        let report = bar_report(&t, "k", "v", &cfg()).unwrap();
        let top: Vec<_> = report.top.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(top, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_line_report_trend_and_change() {
        let t = table("year,v\n2021,30\n2019,10\n2020,20\n2020,20\n");
        let report = line_report(&t, "year", "v", &cfg()).unwrap();

        assert_eq!(report.trend, Some(TrendDirection::Increasing));
        assert_eq!(report.statistics.get("first"), Some(10.0));
        assert_eq!(report.statistics.get("last"), Some(30.0));
        assert!(approx(report.statistics.get("slope").unwrap(), 10.0));
        assert!(approx(report.statistics.get("percent_change").unwrap(), 200.0));
        assert!(report
            .key_insights
            .iter()
            .any(|s| s == "Peak of 30.00 at 2021; trough of 10.00 at 2019"));
    }

    #[test]
    fn test_line_report_ignores_rows_without_x() {
        let t = table("year,v\n2019,10\n2020,20\n2021,30\n,1\n");
        let report = line_report(&t, "year", "v", &cfg()).unwrap();

        assert_eq!(report.trend, Some(TrendDirection::Increasing));
        assert_eq!(report.statistics.get("points"), Some(3.0));
        assert_eq!(report.statistics.get("last"), Some(30.0));
        assert!(approx(report.statistics.get("percent_change").unwrap(), 200.0));
        assert!(report
            .key_insights
            .iter()
            .any(|s| s == "Peak of 30.00 at 2021; trough of 10.00 at 2019"));
    }

    #[test]
    fn test_line_report_without_any_x_is_insufficient() {
        let t = table("year,v\n,1\n,2\n");
        assert!(matches!(
            line_report(&t, "year", "v", &cfg()),
            Err(EngineError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_line_report_guards_zero_first_value() {
        let t = table("x,v\n1,0\n2,0\n3,0\n");
        let report = line_report(&t, "x", "v", &cfg()).unwrap();
        assert_eq!(report.trend, Some(TrendDirection::Stable));
        assert_eq!(report.statistics.get("percent_change"), None);
        assert_eq!(report.statistics.get("volatility_index"), None);
        assert!(report
            .key_insights
            .iter()
            .any(|s| s.contains("first value is zero")));
    }

    #[test]
    fn test_pie_report_shares() {
        let t = table("k,v\nA,10\nB,30\nA,20\nB,40\n");
        let report = pie_report(&t, "k", "v", &cfg()).unwrap();

        assert_eq!(report.top.len(), 2);
        assert_eq!(report.top[0].label, "B");
        assert_eq!(report.top[1].label, "A");
        assert!(approx(report.top[0].percentage.unwrap(), 70.0));
        assert!(approx(report.top[1].percentage.unwrap(), 30.0));
        let sum: f64 = report.top.iter().filter_map(|e| e.percentage).sum();
        assert!(approx(sum, 100.0));
        assert_eq!(
            report.key_insights[0],
            "Largest segment: B with 70.00% of the total"
        );
        assert!(report.key_insights.iter().any(|s| s.contains("concentrated")));
        assert!(report.key_insights.iter().any(|s| s.starts_with("B dominates")));
    }

    #[test]
    fn test_pie_report_zero_total() {
        let t = table("k,v\nA,0\nB,0\n");
        let report = pie_report(&t, "k", "v", &cfg()).unwrap();
        assert!(report.top.iter().all(|e| e.percentage.is_none()));
        assert_eq!(report.statistics.get("largest_share"), None);
        assert!(report.key_insights[0].contains("total is zero"));
    }

    #[test]
    fn test_histogram_report() {
        let t = table("v\n1\n2\n2\n3\n4\n100\n\n");
        let report = histogram_report(&t, "v", &cfg()).unwrap();

        assert_eq!(report.statistics.get("count"), Some(6.0));
        assert_eq!(report.statistics.get("median"), Some(2.5));
        assert_eq!(report.statistics.get("mode"), Some(2.0));
        assert_eq!(report.statistics.get("range"), Some(99.0));
        assert_eq!(report.statistics.get("outliers"), Some(1.0));
        assert_eq!(report.skewness, Some(Skewness::RightSkewed));
        assert_eq!(report.variability, Some(Variability::High));
    }

    #[test]
    fn test_histogram_report_symmetric_constant() {
        let t = table("v\n5\n5\n5\n");
        let report = histogram_report(&t, "v", &cfg()).unwrap();
        assert_eq!(report.skewness, Some(Skewness::Symmetric));
        assert_eq!(report.variability, Some(Variability::Low));
    }

    #[test]
    fn test_histogram_report_requires_numeric() {
        let t = table("k,v\na,1\n");
        assert!(matches!(
            histogram_report(&t, "k", &cfg()),
            Err(EngineError::InvalidColumn { .. })
        ));
    }

    #[test]
    fn test_reports_reject_unusable_y() {
        let text_y = table("k,v\na,x\n");
        assert!(matches!(
            bar_report(&text_y, "k", "v", &cfg()),
            Err(EngineError::InvalidColumn { .. })
        ));

        let header_only = table("k,v\n");
        assert!(matches!(
            pie_report(&header_only, "k", "v", &cfg()),
            Err(EngineError::InvalidColumn { .. })
        ));
    }

    #[test]
    fn test_reports_are_idempotent() {
        let t = table("k,v\nA,1\nB,2\nC,4\n");
        assert_eq!(
            bar_report(&t, "k", "v", &cfg()).unwrap(),
            bar_report(&t, "k", "v", &cfg()).unwrap()
        );
        assert_eq!(
            line_report(&t, "k", "v", &cfg()).unwrap(),
            line_report(&t, "k", "v", &cfg()).unwrap()
        );
        assert_eq!(
            pie_report(&t, "k", "v", &cfg()).unwrap(),
            pie_report(&t, "k", "v", &cfg()).unwrap()
        );
        assert_eq!(
            histogram_report(&t, "v", &cfg()).unwrap(),
            histogram_report(&t, "v", &cfg()).unwrap()
        );
    }
}
