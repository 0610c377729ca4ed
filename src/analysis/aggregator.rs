//! Grouping and aggregation.
//!
//! This module turns a table into chart-ready label/value series: grouped
//! reductions, value counts and equal-width histograms.

use crate::config::ChartConfig;
use crate::error::{EngineError, EngineResult};
use crate::models::{AggregateResult, Aggregation, ChartKind, ChartRequest};
use crate::table::{format_number, Column, ColumnValues, Table};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Label given to the group of rows whose key is missing.
pub const MISSING_LABEL: &str = "nan";

/// Grouping key of a row. Numeric keys order numerically, text keys
/// lexicographically, and the missing key sorts last.
#[derive(Debug, Clone)]
pub enum GroupKey {
    Number(f64),
    Text(String),
    Missing,
}

impl GroupKey {
    fn of(column: &Column, row: usize) -> Self {
        match column.values() {
            ColumnValues::Numeric { values, .. } => match values[row] {
                // -0.0 and 0.0 are the same group
                Some(v) if v == 0.0 => GroupKey::Number(0.0),
                Some(v) => GroupKey::Number(v),
                None => GroupKey::Missing,
            },
            ColumnValues::Text(values) => match &values[row] {
                Some(s) => GroupKey::Text(s.clone()),
                None => GroupKey::Missing,
            },
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, GroupKey::Missing)
    }

    pub fn label(&self) -> String {
        match self {
            GroupKey::Number(v) => format_number(*v),
            GroupKey::Text(s) => s.clone(),
            GroupKey::Missing => MISSING_LABEL.to_string(),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            GroupKey::Number(_) => 0,
            GroupKey::Text(_) => 1,
            GroupKey::Missing => 2,
        }
    }
}

impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (GroupKey::Number(a), GroupKey::Number(b)) => a.total_cmp(b),
            (GroupKey::Text(a), GroupKey::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for GroupKey {}

impl std::hash::Hash for GroupKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            GroupKey::Number(v) => (0u8, v.to_bits()).hash(state),
            GroupKey::Text(s) => (1u8, s).hash(state),
            GroupKey::Missing => 2u8.hash(state),
        }
    }
}

#[derive(Debug, Default)]
struct Accumulator {
    sum: f64,
    count: usize,
}

impl Accumulator {
    fn reduce(&self, agg: Aggregation) -> Option<f64> {
        match agg {
            Aggregation::Sum => Some(self.sum),
            Aggregation::Mean if self.count == 0 => None,
            Aggregation::Mean => Some(self.sum / self.count as f64),
        }
    }
}

/// Groups rows by column `x` and reduces numeric column `y` per group.
///
/// Missing y-values are ignored. A group with no y-values sums to 0.0 and
/// has an undefined (`None`) mean. Groups come back in ascending key order
/// and the result is tagged as a bar chart.
pub fn group_reduce(
    table: &Table,
    x: &str,
    y: &str,
    agg: Aggregation,
) -> EngineResult<AggregateResult> {
    reduce_groups(table, x, y, agg, true)
}

/// Like [`group_reduce`], but rows with a missing `x` are left out. Used by
/// reports that read the groups as positions along an ordered axis.
pub fn group_reduce_present(
    table: &Table,
    x: &str,
    y: &str,
    agg: Aggregation,
) -> EngineResult<AggregateResult> {
    reduce_groups(table, x, y, agg, false)
}

fn reduce_groups(
    table: &Table,
    x: &str,
    y: &str,
    agg: Aggregation,
    keep_missing: bool,
) -> EngineResult<AggregateResult> {
    let key_column = table.column(x)?;
    let value_column = table.numeric_column(y)?;
    let values = value_column.numbers().unwrap_or_default();

    let mut groups: BTreeMap<GroupKey, Accumulator> = BTreeMap::new();
    for (row, value) in values.iter().enumerate() {
        let key = GroupKey::of(key_column, row);
        if !keep_missing && key.is_missing() {
            continue;
        }
        let acc = groups.entry(key).or_default();
        if let Some(v) = value {
            acc.sum += v;
            acc.count += 1;
        }
    }

    debug!("Grouped {} by {}: {} groups ({})", y, x, groups.len(), agg);

    let (labels, values) = groups
        .iter()
        .map(|(key, acc)| (key.label(), acc.reduce(agg)))
        .unzip();

    Ok(AggregateResult {
        labels,
        values,
        kind: ChartKind::Bar,
    })
}

/// Counts occurrences of each non-missing value of `x`, most frequent
/// first; ties keep first-appearance order.
pub fn value_counts(table: &Table, x: &str) -> EngineResult<AggregateResult> {
    let column = table.column(x)?;

    let mut counts: HashMap<GroupKey, (usize, usize)> = HashMap::new();
    for row in 0..column.len() {
        let key = GroupKey::of(column, row);
        if key.is_missing() {
            continue;
        }
        counts.entry(key).or_insert((row, 0)).1 += 1;
    }

    let mut ranked: Vec<(GroupKey, usize, usize)> = counts
        .into_iter()
        .map(|(key, (first, count))| (key, first, count))
        .collect();
    ranked.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.1.cmp(&b.1)));

    Ok(AggregateResult {
        labels: ranked.iter().map(|(key, _, _)| key.label()).collect(),
        values: ranked.iter().map(|(_, _, count)| Some(*count as f64)).collect(),
        kind: ChartKind::Bar,
    })
}

/// Equal-width histogram of numeric column `x` over `[min, max]`.
///
/// The last bin includes the maximum. A constant column spans
/// `[v - 0.5, v + 0.5]`.
pub fn histogram(table: &Table, x: &str, bins: usize) -> EngineResult<AggregateResult> {
    let column = table.numeric_column(x)?;
    if bins == 0 {
        return Err(EngineError::invalid_parameter("bins", bins, "at least 1"));
    }

    let data = column.present_numbers().unwrap_or_default();
    let (Some(min), Some(max)) = (super::stats::min(&data), super::stats::max(&data)) else {
        return Err(EngineError::insufficient(
            format!("histogram of '{}'", x),
            1,
            0,
        ));
    };

    let (lo, hi) = if min == max {
        (min - 0.5, max + 0.5)
    } else {
        (min, max)
    };
    let width = (hi - lo) / bins as f64;
    let edges: Vec<f64> = (0..=bins)
        .map(|i| if i == bins { hi } else { lo + width * i as f64 })
        .collect();

    let mut counts = vec![0usize; bins];
    for v in &data {
        counts[bin_index(*v, &edges)] += 1;
    }

    let labels = edges
        .windows(2)
        .map(|pair| format!("{:.2}-{:.2}", pair[0], pair[1]))
        .collect();

    Ok(AggregateResult {
        labels,
        values: counts.into_iter().map(|c| Some(c as f64)).collect(),
        kind: ChartKind::Histogram,
    })
}

/// Bin of `v` given ascending edges; intervals are half-open except the
/// last, which is closed.
fn bin_index(v: f64, edges: &[f64]) -> usize {
    let bins = edges.len() - 1;
    let lo = edges[0];
    let hi = edges[bins];
    let mut idx = (((v - lo) / (hi - lo)) * bins as f64).floor().max(0.0) as usize;
    idx = idx.min(bins - 1);

    // Correct for rounding at interval boundaries.
    if idx > 0 && v < edges[idx] {
        idx -= 1;
    } else if idx + 1 < bins && v >= edges[idx + 1] {
        idx += 1;
    }
    idx
}

/// Computes the aggregate series behind one chart request.
///
/// Histograms bin `x`. Bar and line charts need `y`; a pie chart without
/// `y` falls back to value counts, tagged as a bar chart.
pub fn chart(
    table: &Table,
    request: &ChartRequest,
    cfg: &ChartConfig,
) -> EngineResult<AggregateResult> {
    table.column(&request.x)?;

    if request.kind == ChartKind::Histogram {
        return histogram(table, &request.x, request.bins.unwrap_or(cfg.default_bins));
    }

    match &request.y {
        Some(y) => {
            let mut result = group_reduce(table, &request.x, y, request.aggregation)?;
            result.kind = request.kind;
            Ok(result)
        }
        None if matches!(request.kind, ChartKind::Bar | ChartKind::Line) => {
            Err(EngineError::invalid_parameter(
                "y",
                "<none>",
                format!("a y column for {} charts", request.kind),
            ))
        }
        None => value_counts(table, &request.x),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{parse_str, Delimiter};

    fn create_test_table() -> Table {
        parse_str(
            "sales.csv",
            "region,year,units\n\
             south,2020,5\n\
             north,2019,10\n\
             south,2019,\n\
             ,2021,4\n\
             east,2020,6\n\
             north,2021,2\n\
             west,2022,\n",
            Delimiter::Comma,
        )
        .unwrap()
    }

    fn request(x: &str, y: Option<&str>, kind: ChartKind) -> ChartRequest {
        ChartRequest {
            x: x.to_string(),
            y: y.map(String::from),
            kind,
            aggregation: Aggregation::Mean,
            bins: None,
        }
    }

    #[test]
    fn test_group_reduce_orders_keys_and_keeps_missing_group() {
        let table = create_test_table();
        let result = group_reduce(&table, "region", "units", Aggregation::Sum).unwrap();

        assert_eq!(result.labels, vec!["east", "north", "south", "west", "nan"]);
        assert_eq!(
            result.values,
            vec![Some(6.0), Some(12.0), Some(5.0), Some(0.0), Some(4.0)]
        );
    }

    #[test]
    fn test_group_reduce_mean_of_empty_group_is_undefined() {
        let table = create_test_table();
        let result = group_reduce(&table, "region", "units", Aggregation::Mean).unwrap();

        assert_eq!(result.values[1], Some(6.0));
        assert_eq!(result.values[3], None);
    }

    #[test]
    fn test_group_reduce_present_drops_missing_keys() {
        let table = create_test_table();
        let result = group_reduce_present(&table, "region", "units", Aggregation::Sum).unwrap();

        assert_eq!(result.labels, vec!["east", "north", "south", "west"]);
        assert_eq!(
            result.values,
            vec![Some(6.0), Some(12.0), Some(5.0), Some(0.0)]
        );
    }

    #[test]
    fn test_group_reduce_numeric_keys_order_numerically() {
        let table = parse_str(
            "t.csv",
            "k,v\n10,1\n9,2\n100,3\n9,4\n",
            Delimiter::Comma,
        )
        .unwrap();
        let result = group_reduce(&table, "k", "v", Aggregation::Sum).unwrap();
        assert_eq!(result.labels, vec!["9", "10", "100"]);
        assert_eq!(result.values, vec![Some(6.0), Some(1.0), Some(3.0)]);
    }

    #[test]
    fn test_group_reduce_errors() {
        let table = create_test_table();
        assert!(matches!(
            group_reduce(&table, "nope", "units", Aggregation::Sum),
            Err(EngineError::ColumnNotFound { .. })
        ));
        assert!(matches!(
            group_reduce(&table, "year", "region", Aggregation::Sum),
            Err(EngineError::InvalidColumn { .. })
        ));
    }

    #[test]
    fn test_value_counts_ranks_by_count_then_first_seen() {
        let table = create_test_table();
        let result = value_counts(&table, "region").unwrap();

        assert_eq!(result.labels, vec!["south", "north", "east", "west"]);
        assert_eq!(
            result.values,
            vec![Some(2.0), Some(2.0), Some(1.0), Some(1.0)]
        );
    }

    #[test]
    fn test_histogram_counts_every_value() {
        let csv: String = std::iter::once("v".to_string())
            .chain((0..=20).map(|i| (i as f64 * 0.5).to_string()))
            .collect::<Vec<_>>()
            .join("\n");
        let table = parse_str("h.csv", &csv, Delimiter::Comma).unwrap();

        let result = histogram(&table, "v", 10).unwrap();
        assert_eq!(result.labels.len(), 10);
        assert_eq!(result.values.len(), 10);
        assert_eq!(result.labels[0], "0.00-1.00");
        assert_eq!(result.labels[9], "9.00-10.00");

        let total: f64 = result.values.iter().flatten().sum();
        assert_eq!(total, 21.0);
        // 9.0, 9.5 and the maximum 10.0 share the last bin
        assert_eq!(result.values[9], Some(3.0));
    }

    #[test]
    fn test_histogram_constant_column() {
        let table = parse_str("c.csv", "v\n3\n3\n", Delimiter::Comma).unwrap();
        let result = histogram(&table, "v", 2).unwrap();
        assert_eq!(result.labels, vec!["2.50-3.00", "3.00-3.50"]);
        assert_eq!(result.values, vec![Some(0.0), Some(2.0)]);
    }

    #[test]
    fn test_histogram_rejects_non_numeric_and_zero_bins() {
        let table = create_test_table();
        assert!(matches!(
            histogram(&table, "region", 10),
            Err(EngineError::InvalidColumn { .. })
        ));
        assert!(matches!(
            histogram(&table, "units", 0),
            Err(EngineError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_chart_dispatch() {
        let table = create_test_table();
        let cfg = ChartConfig::default();

        let line = chart(&table, &request("region", Some("units"), ChartKind::Line), &cfg).unwrap();
        assert_eq!(line.kind, ChartKind::Line);

        let pie = chart(&table, &request("region", None, ChartKind::Pie), &cfg).unwrap();
        assert_eq!(pie.kind, ChartKind::Bar);
        assert_eq!(pie.labels[0], "south");

        let hist = chart(&table, &request("units", None, ChartKind::Histogram), &cfg).unwrap();
        assert_eq!(hist.labels.len(), cfg.default_bins);

        assert!(matches!(
            chart(&table, &request("region", None, ChartKind::Bar), &cfg),
            Err(EngineError::InvalidParameter { .. })
        ));
        assert!(matches!(
            chart(&table, &request("nope", None, ChartKind::Pie), &cfg),
            Err(EngineError::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn test_chart_is_idempotent() {
        let table = create_test_table();
        let cfg = ChartConfig::default();
        let req = request("region", Some("units"), ChartKind::Bar);
        assert_eq!(
            chart(&table, &req, &cfg).unwrap(),
            chart(&table, &req, &cfg).unwrap()
        );
    }
}
