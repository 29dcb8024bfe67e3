use crate::config::*;
use crate::formats::FileFormat;
use anyhow::{anyhow, Result};

/// Validates the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_formats(&config.formats)?;
    validate_storage(&config.storage)?;
    validate_engine(&config.engine)?;
    Ok(())
}

/// Validates format-specific configurations
fn validate_formats(config: &FormatConfig) -> Result<()> {
    validate_delimited(FileFormat::Csv, &config.csv)?;
    validate_delimited(FileFormat::Tsv, &config.tsv)?;

    for ext in config.extensions.keys() {
        if ext.is_empty() || ext.starts_with('.') {
            return Err(anyhow!(
                "Invalid extension mapping '{}': give the extension without a leading dot",
                ext
            ));
        }
    }

    Ok(())
}

fn validate_delimited(format: FileFormat, config: &DelimitedConfig) -> Result<()> {
    if !config.delimiter.is_ascii() {
        return Err(anyhow!("{} delimiter must be an ASCII character", format));
    }
    if !config.quote.is_ascii() {
        return Err(anyhow!("{} quote must be an ASCII character", format));
    }
    if matches!(config.delimiter, '\n' | '\r') {
        return Err(anyhow!("{} delimiter cannot be a line break", format));
    }
    if config.quoting && config.delimiter == config.quote {
        return Err(anyhow!("{} delimiter and quote cannot be the same character", format));
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage(config: &StorageConfig) -> Result<()> {
    if config.stdin_aliases.iter().any(String::is_empty) {
        return Err(anyhow!("Stdin aliases cannot be empty strings"));
    }

    Ok(())
}

/// Validates engine configuration
fn validate_engine(config: &EngineConfig) -> Result<()> {
    if config.batch_size == 0 {
        return Err(anyhow!("Batch size cannot be zero"));
    }
    if config.target_partitions == 0 {
        return Err(anyhow!("Target partitions cannot be zero"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        let config = Config::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_invalid_batch_size() {
        let mut config = Config::default();
        config.engine.batch_size = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_invalid_target_partitions() {
        let mut config = Config::default();
        config.engine.target_partitions = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_invalid_delimiter() {
        let mut config = Config::default();
        config.formats.csv.delimiter = '§';
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.formats.tsv.delimiter = '\n';
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_delimiter_equal_to_quote() {
        let mut config = Config::default();
        config.formats.csv.delimiter = '"';
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("CSV"));

        // Without quoting the quote character is never looked at
        config.formats.csv.quoting = false;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_invalid_extension_mapping() {
        let mut config = Config::default();
        config.formats.extensions.insert(".txt".to_string(), FileFormat::Csv);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_empty_stdin_alias() {
        let mut config = Config::default();
        config.storage.stdin_aliases.push(String::new());
        assert!(validate_config(&config).is_err());
    }
}
