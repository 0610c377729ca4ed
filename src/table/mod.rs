//! In-memory columnar table.
//!
//! A [`Table`] is an ordered set of uniquely named, equally long columns.
//! Each column's kind is inferred once when the table is built and carried
//! with it afterwards; operations never re-infer it.

pub mod loader;

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

pub use loader::load_path;
#[cfg(test)]
pub use loader::{parse_str, Delimiter};

/// Cell spellings treated as missing values.
pub const MISSING_MARKERS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "null", "NULL", "None", "#N/A", "<NA>",
];

/// Returns true if a raw cell denotes a missing value.
pub fn is_missing(raw: &str) -> bool {
    MISSING_MARKERS.contains(&raw.trim())
}

/// Formats a number the way labels and previews show it: integral values
/// without a fractional part, everything else in shortest round-trip form.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Kind of a column, inferred from its observed values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// Every non-missing value is a finite real number.
    Numeric,
    /// At least one non-missing value is not a number.
    Categorical,
    /// The column holds no non-missing values.
    Unknown,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::Numeric => write!(f, "numeric"),
            ColumnKind::Categorical => write!(f, "categorical"),
            ColumnKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// Typed storage of a column's cells. `None` marks a missing cell.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Numeric {
        values: Vec<Option<f64>>,
        /// All values are whole numbers and none is missing.
        integral: bool,
    },
    Text(Vec<Option<String>>),
}

/// A named column of a [`Table`].
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    kind: ColumnKind,
    values: ColumnValues,
}

impl Column {
    /// Builds a column from raw cells, inferring its kind.
    pub fn from_raw(name: impl Into<String>, raw: Vec<String>) -> Self {
        let cells: Vec<Option<String>> = raw
            .into_iter()
            .map(|cell| {
                let trimmed = cell.trim();
                if is_missing(trimmed) {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
            .collect();

        let present = cells.iter().flatten().count();
        if present == 0 {
            return Self {
                name: name.into(),
                kind: ColumnKind::Unknown,
                values: ColumnValues::Text(cells),
            };
        }

        let parsed: Option<Vec<Option<f64>>> = cells
            .iter()
            .map(|cell| match cell {
                None => Some(None),
                Some(s) => s.parse::<f64>().ok().filter(|v| v.is_finite()).map(Some),
            })
            .collect();

        match parsed {
            Some(values) => {
                let integral = values.iter().all(|v| matches!(v, Some(x) if x.fract() == 0.0));
                Self {
                    name: name.into(),
                    kind: ColumnKind::Numeric,
                    values: ColumnValues::Numeric { values, integral },
                }
            }
            None => Self {
                name: name.into(),
                kind: ColumnKind::Categorical,
                values: ColumnValues::Text(cells),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    pub fn is_numeric(&self) -> bool {
        self.kind == ColumnKind::Numeric
    }

    pub fn values(&self) -> &ColumnValues {
        &self.values
    }

    /// Storage label in the familiar dataframe vocabulary.
    pub fn dtype_label(&self) -> &'static str {
        match (&self.kind, &self.values) {
            (ColumnKind::Numeric, ColumnValues::Numeric { integral: true, .. }) => "int64",
            (ColumnKind::Numeric, _) => "float64",
            (ColumnKind::Categorical, _) => "object",
            (ColumnKind::Unknown, _) => "unknown",
        }
    }

    pub fn len(&self) -> usize {
        match &self.values {
            ColumnValues::Numeric { values, .. } => values.len(),
            ColumnValues::Text(values) => values.len(),
        }
    }

    /// Numeric cells, if the column is numeric.
    pub fn numbers(&self) -> Option<&[Option<f64>]> {
        match &self.values {
            ColumnValues::Numeric { values, .. } => Some(values),
            ColumnValues::Text(_) => None,
        }
    }

    /// Non-missing numeric values in row order.
    pub fn present_numbers(&self) -> Option<Vec<f64>> {
        self.numbers().map(|values| values.iter().flatten().copied().collect())
    }

    /// Display form of a cell, `None` when missing.
    pub fn display(&self, row: usize) -> Option<String> {
        match &self.values {
            ColumnValues::Numeric { values, .. } => values[row].map(format_number),
            ColumnValues::Text(values) => values[row].clone(),
        }
    }
}

/// An ordered sequence of named, equally long columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
    rows: usize,
}

impl Table {
    /// Builds a table, checking that names are unique and lengths equal.
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> EngineResult<Self> {
        let name = name.into();
        let rows = columns.first().map(Column::len).unwrap_or(0);

        if let Some(col) = columns.iter().find(|c| c.len() != rows) {
            return Err(EngineError::parse(
                &name,
                format!(
                    "column '{}' has {} rows, expected {}",
                    col.name(),
                    col.len(),
                    rows
                ),
            ));
        }

        let mut seen = HashSet::new();
        if let Some(col) = columns.iter().find(|c| !seen.insert(c.name().to_string())) {
            return Err(EngineError::parse(
                &name,
                format!("duplicate column name '{}'", col.name()),
            ));
        }

        Ok(Self {
            name,
            columns,
            rows,
        })
    }

    /// Builds a table from a header and row-major raw cells. Short rows are
    /// padded with missing cells.
    #[cfg(test)]
    pub fn from_rows(
        name: impl Into<String>,
        headers: &[&str],
        rows: &[Vec<&str>],
    ) -> EngineResult<Self> {
        let columns = headers
            .iter()
            .enumerate()
            .map(|(idx, header)| {
                let raw = rows
                    .iter()
                    .map(|row| row.get(idx).copied().unwrap_or("").to_string())
                    .collect();
                Column::from_raw(*header, raw)
            })
            .collect();
        Self::new(name, columns)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name().to_string()).collect()
    }

    /// Looks up a column by name.
    pub fn column(&self, name: &str) -> EngineResult<&Column> {
        self.columns
            .iter()
            .find(|c| c.name() == name)
            .ok_or_else(|| EngineError::ColumnNotFound {
                column: name.to_string(),
                available: self.column_names(),
            })
    }

    /// Looks up a column that must be numeric.
    pub fn numeric_column(&self, name: &str) -> EngineResult<&Column> {
        let column = self.column(name)?;
        if !column.is_numeric() {
            return Err(EngineError::InvalidColumn {
                column: name.to_string(),
                expected: ColumnKind::Numeric.to_string(),
                actual: column.kind().to_string(),
            });
        }
        Ok(column)
    }
}
