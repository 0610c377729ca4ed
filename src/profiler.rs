//! Schema profiling.
//!
//! Derives per-column metadata once, at ingestion time.

use crate::models::{ColumnProfile, SampleValue, SchemaProfile};
use crate::table::{Column, ColumnValues, Table};
use std::collections::HashSet;
use tracing::debug;

/// Maximum number of distinct sample values kept per column.
pub const SAMPLE_SIZE: usize = 5;

/// Profiles every column of a table.
pub fn profile(table: &Table) -> SchemaProfile {
    let columns: Vec<ColumnProfile> = table.columns().iter().map(profile_column).collect();

    debug!(
        "Profiled {}: {} rows x {} columns",
        table.name(),
        table.row_count(),
        table.column_count()
    );

    SchemaProfile {
        columns,
        rows: table.row_count(),
        cols: table.column_count(),
    }
}

/// Profiles one column: dtype, distinct count and a first-seen sample.
pub fn profile_column(column: &Column) -> ColumnProfile {
    let (unique_sample, unique_count) = match column.values() {
        ColumnValues::Numeric { values, .. } => {
            // Bit patterns identify distinct floats; -0.0 is folded into 0.0.
            let present = values.iter().flatten().map(|v| if *v == 0.0 { 0.0 } else { *v });
            distinct(present, |v| v.to_bits(), SampleValue::Number)
        }
        ColumnValues::Text(values) => distinct(
            values.iter().flatten().cloned(),
            |s| s.clone(),
            SampleValue::Text,
        ),
    };

    ColumnProfile {
        name: column.name().to_string(),
        dtype: column.dtype_label().to_string(),
        kind: column.kind(),
        is_numeric: column.is_numeric(),
        unique_sample,
        unique_count,
    }
}

fn distinct<T, K, I>(
    values: I,
    key: impl Fn(&T) -> K,
    wrap: impl Fn(T) -> SampleValue,
) -> (Vec<SampleValue>, usize)
where
    I: Iterator<Item = T>,
    K: std::hash::Hash + Eq,
{
    let mut seen = HashSet::new();
    let mut sample = Vec::new();

    for value in values {
        if seen.insert(key(&value)) && sample.len() < SAMPLE_SIZE {
            sample.push(wrap(value));
        }
    }

    (sample, seen.len())
}
