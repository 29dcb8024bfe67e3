use csv::{ReaderBuilder, StringRecord};

use super::{Cell, DataFormat, FileFormat, ParsedTable, TableBuilder};
use crate::config::DelimitedConfig;
use crate::error::FormatError;

/// Header-driven delimited text (CSV, TSV).
///
/// The first record names the columns. Short records leave their trailing
/// columns absent; long records are rejected.
#[derive(Debug, Clone)]
pub struct DelimitedFormat {
    format: FileFormat,
    delimiter: u8,
    quote: u8,
    quoting: bool,
}

impl DelimitedFormat {
    /// Fails when the delimiter or quote is not a single ASCII byte.
    pub fn new(format: FileFormat, config: &DelimitedConfig) -> Result<Self, FormatError> {
        Ok(Self {
            format,
            delimiter: ascii_byte(format, "delimiter", config.delimiter)?,
            quote: ascii_byte(format, "quote", config.quote)?,
            quoting: config.quoting,
        })
    }

    pub fn csv() -> Self {
        Self {
            format: FileFormat::Csv,
            delimiter: b',',
            quote: b'"',
            quoting: true,
        }
    }

    pub fn tsv() -> Self {
        Self {
            format: FileFormat::Tsv,
            delimiter: b'\t',
            ..Self::csv()
        }
    }
}

fn ascii_byte(format: FileFormat, setting: &'static str, found: char) -> Result<u8, FormatError> {
    u8::try_from(found)
        .ok()
        .filter(u8::is_ascii)
        .ok_or(FormatError::Dialect {
            format,
            setting,
            found,
        })
}

impl DataFormat for DelimitedFormat {
    fn parse(&self, data: &[u8]) -> Result<ParsedTable, FormatError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter)
            .quote(self.quote)
            .quoting(self.quoting)
            .from_reader(data);

        let mut records = reader.records();
        let header = records.next().ok_or(FormatError::MissingHeader)??;

        let mut builder = TableBuilder::default();
        // Duplicate names share one column; the last field wins.
        let slots: Vec<usize> = header.iter().map(|name| builder.column(name)).collect();

        for record in records {
            let record = record?;
            if record.len() > slots.len() {
                return Err(FormatError::TooManyFields {
                    line: line_of(&record),
                    expected: slots.len(),
                    found: record.len(),
                });
            }
            builder.push_row(
                record
                    .iter()
                    .zip(&slots)
                    .map(|(value, &slot)| (slot, Cell::from(value))),
            );
        }

        Ok(builder.finish())
    }

    fn format(&self) -> FileFormat {
        self.format
    }
}

fn line_of(record: &StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_and_rows_in_order() {
        let table = DelimitedFormat::csv()
            .parse(b"id,name\n1,Alice\n2,Bob\n")
            .unwrap();
        assert_eq!(table.columns(), ["id", "name"]);
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.value(0, "id"), Some("1"));
        assert_eq!(table.value(0, "name"), Some("Alice"));
        assert_eq!(table.value(1, "name"), Some("Bob"));
    }

    #[test]
    fn test_empty_field_is_not_absent() {
        let table = DelimitedFormat::csv()
            .parse(b"name,value\nbaz,\n,4\n")
            .unwrap();
        assert_eq!(table.value(0, "value"), Some(""));
        assert_eq!(table.value(1, "name"), Some(""));
    }

    #[test]
    fn test_short_row_leaves_trailing_columns_absent() {
        let table = DelimitedFormat::csv().parse(b"a,b,c\n1\n1,2\n").unwrap();
        assert_eq!(table.value(0, "a"), Some("1"));
        assert_eq!(table.value(0, "b"), None);
        assert_eq!(table.value(0, "c"), None);
        assert_eq!(table.value(1, "b"), Some("2"));
        assert_eq!(table.value(1, "c"), None);
    }

    #[test]
    fn test_long_row_names_line() {
        let err = DelimitedFormat::csv()
            .parse(b"a,b\n1,2\n3,4,5\n")
            .unwrap_err();
        match err {
            FormatError::TooManyFields {
                line,
                expected,
                found,
            } => {
                assert_eq!(line, 3);
                assert_eq!(expected, 2);
                assert_eq!(found, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_quoted_fields() {
        let table = DelimitedFormat::csv()
            .parse(b"id,text\n1,\"a, b\"\n2,\"multi\nline\"\n3,\"say \"\"hi\"\"\"\n")
            .unwrap();
        assert_eq!(table.num_rows(), 3);
        assert_eq!(table.value(0, "text"), Some("a, b"));
        assert_eq!(table.value(1, "text"), Some("multi\nline"));
        assert_eq!(table.value(2, "text"), Some("say \"hi\""));
    }

    #[test]
    fn test_duplicate_headers_collapse() {
        let table = DelimitedFormat::csv().parse(b"a,b,a\n1,2,3\n4,5\n").unwrap();
        assert_eq!(table.columns(), ["a", "b"]);
        assert_eq!(table.value(0, "a"), Some("3"));
        assert_eq!(table.value(1, "a"), Some("4"));
        assert_eq!(table.value(1, "b"), Some("5"));
    }

    #[test]
    fn test_tsv() {
        let table = DelimitedFormat::tsv()
            .parse(b"id\tnote\n1\tcommas, stay\n")
            .unwrap();
        assert_eq!(table.columns(), ["id", "note"]);
        assert_eq!(table.value(0, "note"), Some("commas, stay"));
        assert_eq!(DelimitedFormat::tsv().format(), FileFormat::Tsv);
    }

    #[test]
    fn test_crlf_and_no_trailing_newline() {
        let table = DelimitedFormat::csv().parse(b"id,name\r\n1,Alice\r\n2,Bob").unwrap();
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.value(1, "name"), Some("Bob"));
    }

    #[test]
    fn test_header_only() {
        let table = DelimitedFormat::csv().parse(b"id,name\n").unwrap();
        assert_eq!(table.columns(), ["id", "name"]);
        assert_eq!(table.num_rows(), 0);
    }

    #[test]
    fn test_empty_input_is_error() {
        let err = DelimitedFormat::csv().parse(b"").unwrap_err();
        assert!(matches!(err, FormatError::MissingHeader));
    }

    #[test]
    fn test_invalid_utf8_is_error() {
        let err = DelimitedFormat::csv().parse(b"a,b\n\xff\xfe,1\n").unwrap_err();
        assert!(matches!(err, FormatError::Csv(_)));
    }

    #[test]
    fn test_quoting_disabled() {
        let config = DelimitedConfig {
            quoting: false,
            ..DelimitedConfig::default()
        };
        let table = DelimitedFormat::new(FileFormat::Csv, &config)
            .unwrap()
            .parse(b"a\n\"x\"\n")
            .unwrap();
        assert_eq!(table.value(0, "a"), Some("\"x\""));
    }

    #[test]
    fn test_non_ascii_dialect_is_rejected() {
        let config = DelimitedConfig {
            delimiter: '§',
            ..DelimitedConfig::default()
        };
        let err = DelimitedFormat::new(FileFormat::Csv, &config).unwrap_err();
        assert!(matches!(
            err,
            FormatError::Dialect { format: FileFormat::Csv, setting: "delimiter", found: '§' }
        ));
        assert!(err.to_string().contains("delimiter"));

        let config = DelimitedConfig {
            delimiter: ';',
            quote: '\'',
            quoting: true,
        };
        let table = DelimitedFormat::new(FileFormat::Csv, &config)
            .unwrap()
            .parse(b"a;b\n'x;y';2\n")
            .unwrap();
        assert_eq!(table.value(0, "a"), Some("x;y"));
    }
}
