use std::io::{self, Write};

use arrow::csv::WriterBuilder as CsvWriterBuilder;
use arrow::error::ArrowError;
use arrow::json::writer::JsonArray;
use arrow::json::WriterBuilder as JsonWriterBuilder;
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::execution::QueryResult;

/// Output format for query results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Aligned columns separated by ` | `
    #[default]
    Table,
    /// Comma separated values with a header row
    Csv,
    /// A pretty-printed array of objects
    Json,
}

/// Renders query results in one output format.
#[derive(Debug, Clone)]
pub struct Printer {
    format: OutputFormat,
    null_text: String,
}

impl Printer {
    pub fn new(format: OutputFormat, null_text: impl Into<String>) -> Self {
        Self {
            format,
            null_text: null_text.into(),
        }
    }

    /// Write `result` to `out`. Results without columns print nothing.
    pub fn print<W: Write>(&self, result: &QueryResult, out: &mut W) -> Result<()> {
        if result.schema.fields().is_empty() {
            return Ok(());
        }
        match self.format {
            OutputFormat::Table => write_table(result, &self.null_text, out),
            OutputFormat::Csv => write_csv(&result.batches, out),
            OutputFormat::Json => write_json(&result.batches, out),
        }
    }
}

fn write_table<W: Write>(result: &QueryResult, null_text: &str, out: &mut W) -> Result<()> {
    let options = FormatOptions::default().with_null(null_text);
    let headers: Vec<String> = result
        .schema
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();

    let mut rows: Vec<Vec<String>> = Vec::new();
    for batch in &result.batches {
        let formatters = batch
            .columns()
            .iter()
            .map(|column| ArrayFormatter::try_new(column.as_ref(), &options))
            .collect::<Result<Vec<_>, ArrowError>>()?;
        for row in 0..batch.num_rows() {
            rows.push(formatters.iter().map(|f| f.value(row).to_string()).collect());
        }
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    write_row(out, &headers, &widths)?;
    let divider: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    writeln!(out, "{}", divider.join("-+-"))?;
    for row in &rows {
        write_row(out, row, &widths)?;
    }
    Ok(())
}

fn write_row<W: Write>(out: &mut W, cells: &[String], widths: &[usize]) -> io::Result<()> {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect();
    writeln!(out, "{}", padded.join(" | "))
}

fn write_csv<W: Write>(batches: &[RecordBatch], out: &mut W) -> Result<()> {
    let mut writer = CsvWriterBuilder::new().with_header(true).build(out);
    for batch in batches {
        writer.write(batch)?;
    }
    Ok(())
}

fn write_json<W: Write>(batches: &[RecordBatch], out: &mut W) -> Result<()> {
    let mut buf = Vec::new();
    {
        let mut writer = JsonWriterBuilder::new()
            .with_explicit_nulls(true)
            .build::<_, JsonArray>(&mut buf);
        let refs: Vec<&RecordBatch> = batches.iter().collect();
        writer.write_batches(&refs)?;
        writer.finish()?;
    }

    let value = if buf.is_empty() {
        serde_json::Value::Array(Vec::new())
    } else {
        serde_json::from_slice(&buf).map_err(io::Error::from)?
    };
    serde_json::to_writer_pretty(&mut *out, &value).map_err(io::Error::from)?;
    writeln!(out)?;
    Ok(())
}
