use serde_json::Value;

use super::{Cell, DataFormat, FileFormat, ParsedTable, TableBuilder};
use crate::error::FormatError;

/// A top-level JSON array of objects, one object per row.
///
/// Columns are the union of all object keys in first-seen order. Nested
/// arrays and objects are kept as their JSON text.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFormat;

impl DataFormat for JsonFormat {
    fn parse(&self, data: &[u8]) -> Result<ParsedTable, FormatError> {
        let elements = match serde_json::from_slice::<Value>(data)? {
            Value::Array(elements) => elements,
            other => return Err(FormatError::NotAnArray(kind(&other))),
        };

        let mut builder = TableBuilder::default();
        for (index, element) in elements.into_iter().enumerate() {
            let object = match element {
                Value::Object(object) => object,
                other => {
                    return Err(FormatError::NotAnObject {
                        index,
                        found: kind(&other),
                    })
                }
            };
            let cells: Vec<(usize, Cell)> = object
                .into_iter()
                .map(|(key, value)| (builder.column(&key), to_cell(value)))
                .collect();
            builder.push_row(cells);
        }

        Ok(builder.finish())
    }

    fn format(&self) -> FileFormat {
        FileFormat::Json
    }
}

fn to_cell(value: Value) -> Cell {
    match value {
        Value::Null => Cell::Absent,
        Value::String(text) => Cell::Text(text),
        Value::Bool(b) => Cell::Text(b.to_string()),
        Value::Number(n) => Cell::Text(n.to_string()),
        nested @ (Value::Array(_) | Value::Object(_)) => Cell::Text(nested.to_string()),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
