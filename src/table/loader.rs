//! Delimited text loading.
//!
//! Parses CSV/TSV text into a [`Table`]. Any tokenization failure surfaces
//! as a single [`EngineError::Parse`].

use super::{Column, Table};
use crate::error::{EngineError, EngineResult};
use csv::{ReaderBuilder, Trim};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Field delimiter of a delimited file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Comma,
    Tab,
}

impl Delimiter {
    /// Picks the delimiter from a file name: tab for `.tsv`, comma otherwise.
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tsv") => Delimiter::Tab,
            _ => Delimiter::Comma,
        }
    }

    fn byte(self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Tab => b'\t',
        }
    }
}

/// Loads a table from a file, choosing the delimiter from its extension.
pub fn load_path(path: &Path) -> EngineResult<Table> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    let file = File::open(path)
        .map_err(|e| EngineError::parse(&name, format!("cannot open file: {}", e)))?;

    parse_reader(&name, file, Delimiter::for_path(path))
}

/// Parses delimited text held in memory.
#[cfg(test)]
pub fn parse_str(name: &str, text: &str, delimiter: Delimiter) -> EngineResult<Table> {
    parse_reader(name, text.as_bytes(), delimiter)
}

/// Parses delimited text from any reader. The first row is the header.
pub fn parse_reader<R: Read>(name: &str, reader: R, delimiter: Delimiter) -> EngineResult<Table> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter.byte())
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let raw_headers: Vec<String> = rdr
        .headers()
        .map_err(|e| EngineError::parse(name, e.to_string()))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let blank_header = raw_headers.len() == 1 && raw_headers[0].is_empty();
    if raw_headers.is_empty() || blank_header {
        return Err(EngineError::parse(name, "no columns to parse from file"));
    }

    let headers = dedupe_headers(&raw_headers);
    let width = headers.len();
    let mut cells: Vec<Vec<String>> = vec![Vec::new(); width];

    for result in rdr.records() {
        let record = result.map_err(|e| EngineError::parse(name, e.to_string()))?;

        if record.len() > width {
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            return Err(EngineError::parse(
                name,
                format!(
                    "expected {} fields in line {}, saw {}",
                    width,
                    line,
                    record.len()
                ),
            ));
        }

        for (idx, column) in cells.iter_mut().enumerate() {
            column.push(record.get(idx).unwrap_or("").to_string());
        }
    }

    debug!(
        "Parsed {}: {} columns, {} rows",
        name,
        width,
        cells.first().map(Vec::len).unwrap_or(0)
    );

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(header, raw)| Column::from_raw(header, raw))
        .collect();

    Table::new(name, columns)
}

/// Names blank headers `Unnamed: {index}` and suffixes repeated names with
/// `.1`, `.2`, ... so every column name is unique.
fn dedupe_headers(raw: &[String]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(raw.len());

    for (idx, header) in raw.iter().enumerate() {
        let base = if header.is_empty() {
            format!("Unnamed: {}", idx)
        } else {
            header.clone()
        };

        let mut candidate = base.clone();
        let mut suffix = 1;
        while seen.contains(&candidate) {
            candidate = format!("{}.{}", base, suffix);
            suffix += 1;
        }

        seen.insert(candidate.clone());
        out.push(candidate);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::ColumnKind;
    use std::path::PathBuf;

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("fixtures")
            .join(name)
    }

    #[test]
    fn test_parse_basic_csv() {
        let table = parse_str(
            "sales.csv",
            "region,units\nnorth,10\nsouth,\neast,7\n",
            Delimiter::Comma,
        )
        .unwrap();

        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column_count(), 2);
        let units = table.column("units").unwrap();
        assert_eq!(units.kind(), ColumnKind::Numeric);
        assert_eq!(units.numbers().unwrap(), &[Some(10.0), None, Some(7.0)]);
    }

    #[test]
    fn test_short_rows_are_padded() {
        let table = parse_str("t.csv", "a,b\n1\n2,3\n", Delimiter::Comma).unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column("b").unwrap().display(0), None);
    }

    #[test]
    fn test_long_rows_fail() {
        let err = parse_str("t.csv", "a,b\n1,2,3\n", Delimiter::Comma).unwrap_err();
        assert_eq!(err.kind(), "ParseError");
        assert!(err.to_string().contains("expected 2 fields"));
    }

    #[test]
    fn test_empty_input_fails() {
        let err = parse_str("empty.csv", "", Delimiter::Comma).unwrap_err();
        assert!(matches!(err, EngineError::Parse { .. }));
    }

    #[test]
    fn test_duplicate_and_blank_headers() {
        let table = parse_str("t.csv", "a,a,,a\n1,2,3,4\n", Delimiter::Comma).unwrap();
        assert_eq!(
            table.column_names(),
            vec!["a", "a.1", "Unnamed: 2", "a.2"]
        );
    }

    #[test]
    fn test_tab_delimiter_from_extension() {
        assert_eq!(
            Delimiter::for_path(Path::new("data.TSV")),
            Delimiter::Tab
        );
        assert_eq!(
            Delimiter::for_path(Path::new("data.csv")),
            Delimiter::Comma
        );
    }

    #[test]
    fn test_load_tsv_fixture() {
        let table = load_path(&fixture("weather.tsv")).unwrap();
        assert_eq!(table.column_names(), vec!["city", "month", "temp"]);
        assert!(table.column("temp").unwrap().is_numeric());
    }

    #[test]
    fn test_load_missing_file_is_parse_error() {
        let err = load_path(&fixture("does-not-exist.csv")).unwrap_err();
        assert_eq!(err.kind(), "ParseError");
    }
}
