//! Turns a [`ParsedTable`] into an in-memory engine table.

use std::sync::Arc;

use arrow::array::{ArrayRef, StringBuilder};
use arrow::compute::cast;
use arrow::datatypes::{DataType, SchemaRef};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use datafusion::datasource::MemTable;

use crate::error::Result;
use crate::formats::{ParsedTable, SchemaInference};

/// Build a single-partition [`MemTable`] holding every row of `table` in
/// file order, `batch_size` rows per record batch.
pub fn to_mem_table(
    table: &ParsedTable,
    inference: &dyn SchemaInference,
    batch_size: usize,
) -> Result<MemTable> {
    let schema = inference.infer_schema(table);
    let batches = to_record_batches(table, &schema, batch_size)?;
    Ok(MemTable::try_new(schema, vec![batches])?)
}

/// Convert rows into record batches matching `schema`.
///
/// Columns are built as text and cast to the schema's types, so a schema
/// that is not all `Utf8` only changes the cast.
pub fn to_record_batches(
    table: &ParsedTable,
    schema: &SchemaRef,
    batch_size: usize,
) -> Result<Vec<RecordBatch>> {
    let batch_size = batch_size.max(1);
    let mut batches = Vec::with_capacity(table.num_rows().div_ceil(batch_size));

    for chunk in table.rows().chunks(batch_size) {
        let columns = schema
            .fields()
            .iter()
            .enumerate()
            .map(|(index, field)| {
                let mut builder = StringBuilder::with_capacity(chunk.len(), chunk.len() * 8);
                for row in chunk {
                    builder.append_option(row.get(index));
                }
                let text: ArrayRef = Arc::new(builder.finish());
                if field.data_type() == &DataType::Utf8 {
                    Ok(text)
                } else {
                    cast(&text, field.data_type())
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        // Tables without columns still carry a row count.
        let options = RecordBatchOptions::new().with_row_count(Some(chunk.len()));
        batches.push(RecordBatch::try_new_with_options(
            schema.clone(),
            columns,
            &options,
        )?);
    }

    Ok(batches)
}
