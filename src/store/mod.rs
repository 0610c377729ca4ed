//! Dataset workspace.
//!
//! Uploaded files live in a single data directory. Each one is stored as
//! `{timestamp}_{name}` next to a `{stored}.meta.json` sidecar holding its
//! [`DatasetRecord`].

use crate::models::{ColumnProfile, DatasetRecord, Preview};
use crate::profiler;
use crate::table::{self, Table};
use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File extensions accepted for upload.
pub const ALLOWED_EXTENSIONS: &[&str] = &["csv", "tsv"];

const META_SUFFIX: &str = ".meta.json";

/// Returns true if the file name carries an accepted extension.
pub fn allowed_file(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((_, ext)) => ALLOWED_EXTENSIONS
            .iter()
            .any(|allowed| ext.eq_ignore_ascii_case(allowed)),
        None => false,
    }
}

/// Reduces a file name to a safe form: ASCII alphanumerics, `.`, `-` and
/// `_` only, spaces turned into `_`, no leading dots.
pub fn secure_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') => Some(c),
            c if c.is_whitespace() => Some('_'),
            _ => None,
        })
        .collect();
    cleaned.trim_start_matches(['.', '_']).to_string()
}

/// First `rows` rows of a table as ordered records. Missing cells become
/// empty strings.
pub fn preview_table(table: &Table, rows: usize) -> Preview {
    let limit = rows.min(table.row_count());
    let records = (0..limit)
        .map(|row| {
            table
                .columns()
                .iter()
                .map(|column| {
                    let cell = match column.display(row) {
                        None => Value::String(String::new()),
                        Some(text) if column.is_numeric() => text
                            .parse::<f64>()
                            .ok()
                            .and_then(serde_json::Number::from_f64)
                            .map(Value::Number)
                            .unwrap_or(Value::String(text)),
                        Some(text) => Value::String(text),
                    };
                    (column.name().to_string(), cell)
                })
                .collect::<Map<String, Value>>()
        })
        .collect();

    Preview {
        columns: table.column_names(),
        rows: records,
    }
}

/// Stored datasets in one directory.
pub struct DatasetStore {
    root: PathBuf,
}

impl DatasetStore {
    /// Opens the store, creating its directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create data directory: {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Copies a CSV/TSV file into the store, profiles it and records its
    /// metadata.
    pub fn upload(&self, source: &Path) -> Result<DatasetRecord> {
        let original_name = source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| anyhow!("No file name in path: {}", source.display()))?;

        if !allowed_file(&original_name) {
            bail!("File type not allowed: {} (expected .csv or .tsv)", original_name);
        }

        let safe_name = secure_filename(&original_name);
        if safe_name.is_empty() || !allowed_file(&safe_name) {
            bail!("Unusable file name: {}", original_name);
        }

        let upload_time = Utc::now();
        let id = self.unique_id(&upload_time.format("%Y%m%d%H%M%S").to_string(), &safe_name);
        let stored = self.root.join(&id);

        fs::copy(source, &stored).with_context(|| {
            format!("Failed to copy {} into {}", source.display(), stored.display())
        })?;
        debug!("Stored {} as {}", source.display(), stored.display());

        let table = match table::load_path(&stored) {
            Ok(t) => t,
            Err(e) => {
                if let Err(rm) = fs::remove_file(&stored) {
                    warn!("Failed to remove unparsable upload {}: {}", stored.display(), rm);
                }
                return Err(anyhow::Error::new(e)
                    .context(format!("Failed parsing {}", original_name)));
            }
        };

        let metadata = profiler::profile(&table);
        let record = DatasetRecord {
            id: id.clone(),
            original_name: safe_name,
            upload_time,
            rows: metadata.rows,
            cols: metadata.cols,
            metadata,
        };

        self.write_record(&stored, &record)?;

        info!(
            "Uploaded {} ({} rows x {} columns)",
            record.id, record.rows, record.cols
        );
        Ok(record)
    }

    /// All stored datasets, newest upload first.
    pub fn list(&self) -> Result<Vec<DatasetRecord>> {
        let mut records = Vec::new();

        let entries = fs::read_dir(&self.root)
            .with_context(|| format!("Failed to read data directory: {}", self.root.display()))?;

        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.ends_with(META_SUFFIX) {
                continue;
            }
            match read_record(&entry.path()) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping unreadable metadata {}: {:#}", name, e),
            }
        }

        records.sort_by(|a, b| {
            b.upload_time
                .cmp(&a.upload_time)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(records)
    }

    /// Metadata of one dataset.
    pub fn get(&self, id: &str) -> Result<DatasetRecord> {
        self.check_id(id)?;
        let meta_path = self.meta_path(id);
        if !meta_path.exists() {
            bail!("Dataset not found: {}", id);
        }
        read_record(&meta_path)
    }

    /// Stored column profiles of one dataset.
    pub fn columns(&self, id: &str) -> Result<Vec<ColumnProfile>> {
        Ok(self.get(id)?.metadata.columns)
    }

    /// Parses a stored dataset.
    pub fn load_table(&self, id: &str) -> Result<Table> {
        self.get(id)?;
        let path = self.root.join(id);
        if !path.exists() {
            bail!("Data file missing for dataset {}: {}", id, path.display());
        }
        table::load_path(&path).with_context(|| format!("Failed reading dataset {}", id))
    }

    /// First `rows` rows of a stored dataset.
    pub fn preview(&self, id: &str, rows: usize) -> Result<Preview> {
        let table = self.load_table(id)?;
        Ok(preview_table(&table, rows))
    }

    /// Removes a dataset's file and metadata.
    pub fn delete(&self, id: &str) -> Result<()> {
        self.get(id)?;

        let data_path = self.root.join(id);
        if data_path.exists() {
            fs::remove_file(&data_path)
                .with_context(|| format!("Failed to delete file: {}", data_path.display()))?;
        }

        let meta_path = self.meta_path(id);
        fs::remove_file(&meta_path)
            .with_context(|| format!("Failed to delete metadata: {}", meta_path.display()))?;

        info!("Deleted dataset {}", id);
        Ok(())
    }

    /// Writes the metadata sidecar of a stored file. On failure the stored
    /// file is removed as well.
    fn write_record(&self, stored: &Path, record: &DatasetRecord) -> Result<()> {
        let meta_path = self.meta_path(&record.id);
        let written = serde_json::to_string_pretty(record)
            .map_err(anyhow::Error::from)
            .and_then(|json| {
                fs::write(&meta_path, json).with_context(|| {
                    format!("Failed to write metadata: {}", meta_path.display())
                })
            });

        if written.is_err() {
            if let Err(rm) = fs::remove_file(stored) {
                warn!("Failed to remove {} after metadata error: {}", stored.display(), rm);
            }
        }
        written
    }

    fn meta_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{}{}", id, META_SUFFIX))
    }

    /// Identifiers are bare file names; anything that could leave the data
    /// directory is rejected.
    fn check_id(&self, id: &str) -> Result<()> {
        if id.is_empty() || id.starts_with('.') || id.contains(['/', '\\']) {
            bail!("Invalid dataset id: {}", id);
        }
        Ok(())
    }

    fn unique_id(&self, timestamp: &str, name: &str) -> String {
        let mut id = format!("{}_{}", timestamp, name);
        let mut n = 1;
        while self.root.join(&id).exists() || self.meta_path(&id).exists() {
            id = format!("{}_{}_{}", timestamp, n, name);
            n += 1;
        }
        id
    }
}

fn read_record(path: &Path) -> Result<DatasetRecord> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read metadata: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse metadata: {}", path.display()))
}
