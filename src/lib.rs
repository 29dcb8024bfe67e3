pub mod config;
pub mod error;
pub mod execution;
pub mod extract;
pub mod formats;
pub mod output;
pub mod repl;
pub mod storage;
pub mod table_provider;
pub mod validation;

// Re-export key traits and types
pub use config::Config;
pub use error::{FormatError, Result, ShelectError};
pub use execution::{QueryResult, Session};
pub use extract::extract_references;
pub use formats::{DataFormat, FileFormat, ParsedTable, SchemaInference, TextInference};
pub use output::{OutputFormat, Printer};
pub use storage::{LocalStorage, MemoryStorage, Storage};
