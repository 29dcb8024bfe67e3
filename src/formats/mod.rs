//! File formats that can stand in for a table.
//!
//! Every parser produces the same [`ParsedTable`] shape: an ordered list of
//! column names plus rows of text cells. [`detect_format`] picks the parser
//! for a reference from its extension, falling back to the file contents.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use serde::{Deserialize, Serialize};

use crate::config::FormatConfig;
use crate::error::FormatError;

mod csv_format;
mod json_format;
pub use csv_format::DelimitedFormat;
pub use json_format::JsonFormat;

/// Turns raw file bytes into a [`ParsedTable`].
pub trait DataFormat: Send + Sync {
    fn parse(&self, data: &[u8]) -> Result<ParsedTable, FormatError>;

    fn format(&self) -> FileFormat;
}

/// Chooses the engine schema for an imported table.
pub trait SchemaInference: Send + Sync {
    fn infer_schema(&self, table: &ParsedTable) -> SchemaRef;
}

/// Types every column as nullable text.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextInference;

impl SchemaInference for TextInference {
    fn infer_schema(&self, table: &ParsedTable) -> SchemaRef {
        let fields: Vec<Field> = table
            .columns()
            .iter()
            .map(|name| Field::new(name, DataType::Utf8, true))
            .collect();
        Arc::new(Schema::new(fields))
    }
}

/// A single value read from a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Text(String),
    /// The source had no value at all, as opposed to an empty string.
    Absent,
}

impl Cell {
    pub fn as_deref(&self) -> Option<&str> {
        match self {
            Cell::Text(text) => Some(text),
            Cell::Absent => None,
        }
    }
}

impl From<&str> for Cell {
    fn from(text: &str) -> Self {
        Cell::Text(text.to_string())
    }
}

/// One row, positionally aligned with the table's columns.
///
/// Rows may be shorter than the column list; missing trailing cells are
/// [`Cell::Absent`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    cells: Vec<Cell>,
}

impl Row {
    pub fn get(&self, index: usize) -> Option<&str> {
        self.cells.get(index).and_then(Cell::as_deref)
    }

    fn set(&mut self, index: usize, cell: Cell) {
        if self.cells.len() <= index {
            self.cells.resize(index + 1, Cell::Absent);
        }
        self.cells[index] = cell;
    }
}

/// The uniform in-memory shape of an imported file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTable {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl ParsedTable {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Look up a value by row number and column name.
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(index)
    }
}

/// Accumulates columns in first-seen order while rows are added.
#[derive(Debug, Default)]
pub(crate) struct TableBuilder {
    columns: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Row>,
}

impl TableBuilder {
    /// Position of `name`, registering it as a new column if unseen.
    pub(crate) fn column(&mut self, name: &str) -> usize {
        if let Some(&index) = self.index.get(name) {
            return index;
        }
        let index = self.columns.len();
        self.columns.push(name.to_string());
        self.index.insert(name.to_string(), index);
        index
    }

    /// Add a row from `(column index, cell)` pairs; later pairs overwrite
    /// earlier ones for the same column.
    pub(crate) fn push_row(&mut self, cells: impl IntoIterator<Item = (usize, Cell)>) {
        let mut row = Row::default();
        for (index, cell) in cells {
            row.set(index, cell);
        }
        self.rows.push(row);
    }

    pub(crate) fn finish(self) -> ParsedTable {
        ParsedTable {
            columns: self.columns,
            rows: self.rows,
        }
    }
}

/// Supported file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Csv,
    Tsv,
    Json,
}

impl std::fmt::Display for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileFormat::Csv => write!(f, "CSV"),
            FileFormat::Tsv => write!(f, "TSV"),
            FileFormat::Json => write!(f, "JSON"),
        }
    }
}

impl FileFormat {
    /// Built-in extension table.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "csv" => Some(FileFormat::Csv),
            "tsv" | "tab" => Some(FileFormat::Tsv),
            _ => None,
        }
    }

    /// Create the parser for this format.
    pub fn parser(self, config: &FormatConfig) -> Result<Box<dyn DataFormat>, FormatError> {
        match config.delimited(self) {
            Some(dialect) => Ok(Box::new(DelimitedFormat::new(self, dialect)?)),
            None => Ok(Box::new(JsonFormat)),
        }
    }
}

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Pick the format for `path` whose contents are `data`.
///
/// Detection rules (applied in order):
/// 1. Extension listed in `config.extensions`
/// 2. Built-in extension: `.json`, `.csv`, `.tsv` / `.tab`
/// 3. First non-whitespace byte is `[` or `{` → [`FileFormat::Json`]
/// 4. First line contains a tab → [`FileFormat::Tsv`]
/// 5. Otherwise → [`FileFormat::Csv`]
pub fn detect_format(path: &Path, data: &[u8], config: &FormatConfig) -> FileFormat {
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        let configured = config
            .extensions
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(ext))
            .map(|(_, format)| *format);
        if let Some(format) = configured.or_else(|| FileFormat::from_extension(ext)) {
            return format;
        }
    }
    sniff_format(data)
}

/// Content-only detection for references without a usable extension.
pub fn sniff_format(data: &[u8]) -> FileFormat {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);

    if let Some(first) = data.iter().find(|b| !b.is_ascii_whitespace()) {
        if *first == b'[' || *first == b'{' {
            return FileFormat::Json;
        }
    }

    let first_line = data.split(|&b| b == b'\n').next().unwrap_or_default();
    if first_line.contains(&b'\t') {
        FileFormat::Tsv
    } else {
        FileFormat::Csv
    }
}
