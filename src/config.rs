use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::formats::FileFormat;
use crate::output::OutputFormat;

/// Global configuration for the system
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Format-specific configurations
    pub formats: FormatConfig,
    /// Where table files are read from
    pub storage: StorageConfig,
    /// Query engine configuration
    pub engine: EngineConfig,
    /// Result rendering configuration
    pub output: OutputConfig,
}

/// Configuration for the supported file formats
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    /// Comma separated values
    pub csv: DelimitedConfig,
    /// Tab separated values
    pub tsv: DelimitedConfig,
    /// Extra file extension mappings, checked before the built-in ones
    pub extensions: HashMap<String, FileFormat>,
}

/// Dialect of a delimited text format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelimitedConfig {
    /// Field delimiter
    pub delimiter: char,
    /// Quote character
    pub quote: char,
    /// Whether quoted fields are recognized at all
    pub quoting: bool,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory relative references are resolved against
    pub base_dir: PathBuf,
    /// References that read standard input instead of a file
    pub stdin_aliases: Vec<String>,
}

/// Query engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Rows per record batch when importing a table
    pub batch_size: usize,
    /// Number of partitions the engine plans queries with
    pub target_partitions: usize,
    /// Lowercase unquoted identifiers before resolving them
    pub enable_ident_normalization: bool,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format; chosen from the terminal when unset
    pub format: Option<OutputFormat>,
    /// Text printed for absent values in table output
    pub null_text: String,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            csv: DelimitedConfig::default(),
            tsv: DelimitedConfig {
                delimiter: '\t',
                ..DelimitedConfig::default()
            },
            extensions: HashMap::new(),
        }
    }
}

impl Default for DelimitedConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            quote: '"',
            quoting: true,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            stdin_aliases: vec!["-".to_string(), "stdin".to_string()],
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: 8192,
            target_partitions: num_cpus::get(),
            enable_ident_normalization: true,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: None,
            null_text: "NULL".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl FormatConfig {
    /// Get the dialect configuration for a delimited format
    pub fn delimited(&self, format: FileFormat) -> Option<&DelimitedConfig> {
        match format {
            FileFormat::Csv => Some(&self.csv),
            FileFormat::Tsv => Some(&self.tsv),
            FileFormat::Json => None,
        }
    }
}
