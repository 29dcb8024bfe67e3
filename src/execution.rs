//! Query session: imports the files a query references and runs it.

use std::path::Path;
use std::sync::Arc;

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use datafusion::datasource::MemTable;
use datafusion::error::DataFusionError;
use datafusion::prelude::{SessionConfig, SessionContext};
use datafusion::sql::parser::DFParser;
use datafusion::sql::sqlparser::dialect::GenericDialect;
use datafusion::sql::TableReference;
use futures::future::try_join_all;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{FormatError, Result, ShelectError};
use crate::extract::extract_references;
use crate::formats::{detect_format, SchemaInference, TextInference};
use crate::storage::Storage;
use crate::table_provider::to_mem_table;

/// Output of one statement.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub schema: SchemaRef,
    pub batches: Vec<RecordBatch>,
}

impl QueryResult {
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.schema
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .collect()
    }
}

/// An engine instance plus the tables imported for the current query.
///
/// Imported tables only live until the next call to [`Session::run`] or
/// [`Session::prepare`], which tears them down before importing again.
/// Tables created by statements (`CREATE TABLE`, `CREATE VIEW`) persist.
pub struct Session {
    ctx: SessionContext,
    storage: Arc<dyn Storage>,
    config: Config,
    inference: Arc<dyn SchemaInference>,
    imported: Vec<String>,
}

impl Session {
    pub fn new(config: Config, storage: Arc<dyn Storage>) -> Self {
        let session_config = SessionConfig::new()
            .with_target_partitions(config.engine.target_partitions)
            .with_batch_size(config.engine.batch_size)
            .set_bool(
                "datafusion.sql_parser.enable_ident_normalization",
                config.engine.enable_ident_normalization,
            );

        Self {
            ctx: SessionContext::new_with_config(session_config),
            storage,
            config,
            inference: Arc::new(TextInference),
            imported: Vec::new(),
        }
    }

    /// Replace the column typing strategy used for imports.
    pub fn with_inference(mut self, inference: Arc<dyn SchemaInference>) -> Self {
        self.inference = inference;
        self
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Names of the tables imported for the last query, in extraction order.
    pub fn imported_tables(&self) -> &[String] {
        &self.imported
    }

    /// Import every file `sql` references, then run each of its statements.
    pub async fn run(&mut self, sql: &str) -> Result<Vec<QueryResult>> {
        let mut results = Vec::new();
        self.run_with(sql, |result| {
            results.push(result);
            Ok(())
        })
        .await?;
        Ok(results)
    }

    /// Like [`Session::run`], but hands each statement's result to `sink`
    /// as soon as it completes, so earlier output survives a later failure.
    pub async fn run_with<F>(&mut self, sql: &str, sink: F) -> Result<()>
    where
        F: FnMut(QueryResult) -> Result<()>,
    {
        self.prepare(sql).await?;
        self.execute_with(sql, sink).await
    }

    /// Replace the imported tables with the files `sql` references.
    ///
    /// Either every reference is registered or none is: the previous set
    /// is always removed first and nothing new is registered until all
    /// imports have succeeded.
    pub async fn prepare(&mut self, sql: &str) -> Result<Vec<String>> {
        self.teardown()?;

        let references = extract_references(sql);
        if references.is_empty() {
            debug!("query references no files");
            return Ok(references);
        }

        let tables = try_join_all(references.iter().map(|r| self.import(r))).await?;

        for reference in &references {
            if self.ctx.table_exist(TableReference::bare(reference.as_str()))? {
                return Err(ShelectError::TableExists(reference.clone()));
            }
        }

        for (reference, table) in references.iter().zip(tables) {
            self.ctx
                .register_table(TableReference::bare(reference.as_str()), Arc::new(table))?;
            debug!(table = %reference, "registered table");
            self.imported.push(reference.clone());
        }

        Ok(references)
    }

    /// Read, parse and convert one reference. Nothing is registered.
    pub async fn import(&self, reference: &str) -> Result<MemTable> {
        let data = self
            .storage
            .get(reference)
            .await
            .map_err(|source| ShelectError::NotFound {
                path: reference.to_string(),
                source,
            })?;

        let format = detect_format(Path::new(reference), &data, &self.config.formats);
        debug!(reference, %format, bytes = data.len(), "detected format");

        let format_error = |source: FormatError| ShelectError::Format {
            path: reference.to_string(),
            source,
        };
        let parser = format
            .parser(&self.config.formats)
            .map_err(&format_error)?;
        let table = parser.parse(&data).map_err(&format_error)?;
        info!(
            reference,
            format = %parser.format(),
            rows = table.num_rows(),
            columns = table.columns().len(),
            "imported table file"
        );

        to_mem_table(&table, self.inference.as_ref(), self.config.engine.batch_size)
    }

    /// Run every statement of `sql` against the current tables.
    pub async fn execute(&self, sql: &str) -> Result<Vec<QueryResult>> {
        let mut results = Vec::new();
        self.execute_with(sql, |result| {
            results.push(result);
            Ok(())
        })
        .await?;
        Ok(results)
    }

    async fn execute_with<F>(&self, sql: &str, mut sink: F) -> Result<()>
    where
        F: FnMut(QueryResult) -> Result<()>,
    {
        let dialect = GenericDialect {};
        let statements = DFParser::parse_sql_with_dialect(sql, &dialect)
            .map_err(|e| DataFusionError::SQL(e, None))?;

        for statement in statements {
            let plan = self.ctx.state().statement_to_plan(statement).await?;
            let df = self.ctx.execute_logical_plan(plan).await?;
            let schema = df.schema().inner().clone();
            let batches = df.collect().await?;
            sink(QueryResult { schema, batches })?;
        }
        Ok(())
    }

    fn teardown(&mut self) -> Result<()> {
        for name in self.imported.drain(..) {
            self.ctx.deregister_table(TableReference::bare(name.as_str()))?;
        }
        Ok(())
    }
}
