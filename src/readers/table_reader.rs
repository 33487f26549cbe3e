use crate::error::{open_error, ProcessingError, Result};
use crate::models::{Cell, Table};
use encoding_rs::Encoding;
use std::path::Path;
use tracing::{debug, info, warn};

/// Reads delimited text files into a [`Table`].
pub struct TableReader {
    encoding: &'static Encoding,
}

impl TableReader {
    pub fn new() -> Self {
        Self {
            encoding: encoding_rs::UTF_8,
        }
    }

    /// Reader for a named encoding label such as `latin1` or `utf-8`
    pub fn with_encoding(label: &str) -> Result<Self> {
        let encoding = Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| {
            ProcessingError::Encoding(format!("Unknown encoding label '{}'", label))
        })?;
        Ok(Self { encoding })
    }

    /// Read a whole file. A leading BOM overrides the configured encoding.
    pub fn read_table(&self, path: &Path) -> Result<Table> {
        let bytes = std::fs::read(path).map_err(|e| open_error(e, path))?;
        let (text, used_encoding, had_errors) = self.encoding.decode(&bytes);
        if had_errors {
            warn!(
                path = %path.display(),
                encoding = used_encoding.name(),
                "Input contained byte sequences invalid for the encoding; replaced them"
            );
        }

        let table = self.parse_str(&text)?;
        info!(
            path = %path.display(),
            rows = table.len(),
            columns = table.columns().len(),
            "Loaded table"
        );
        Ok(table)
    }

    /// Parse already-decoded CSV text.
    ///
    /// Short records are padded with missing cells; records with more fields
    /// than the header are dropped and counted.
    pub fn parse_str(&self, text: &str) -> Result<Table> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let columns: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();
        let mut table = Table::new(columns);

        let width = table.columns().len();
        let mut padded = 0;
        let mut dropped = 0;
        for (index, record) in reader.records().enumerate() {
            let record = record?;
            if record.len() > width {
                dropped += 1;
                debug!(
                    record = index + 1,
                    fields = record.len(),
                    width,
                    "Dropping record with more fields than the header"
                );
                continue;
            }

            let mut row: Vec<Cell> = record.iter().map(Cell::from_raw).collect();
            if row.len() < width {
                padded += 1;
                row.resize(width, Cell::Missing);
            }
            table.push_row(row)?;
        }

        if padded > 0 || dropped > 0 {
            warn!(padded, dropped, "Input had records with the wrong number of fields");
        }
        Ok(table)
    }
}

impl Default for TableReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_quoted_json_column() {
        let text = "lat,lon,city,pfas_values\n\
                    52.3,4.9,Amsterdam,\"[{\"\"cas_id\"\":\"\"A1\"\",\"\"value\"\":1}]\"\n\
                    52.1,5.1,Utrecht,\n";
        let table = TableReader::new().parse_str(text).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(
            table.cell(0, "pfas_values"),
            Some(&Cell::text(r#"[{"cas_id":"A1","value":1}]"#))
        );
        assert_eq!(table.cell(1, "pfas_values"), Some(&Cell::Missing));
    }

    #[test]
    fn test_read_latin1_file() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        // "Zürich" in ISO-8859-1
        file.write_all(b"city,value\nZ\xfcrich,3\n")?;

        let table = TableReader::with_encoding("latin1")?.read_table(file.path())?;
        assert_eq!(table.cell(0, "city"), Some(&Cell::text("Zürich")));
        Ok(())
    }

    #[test]
    fn test_ragged_records_padded_or_dropped() {
        let text = "lat,lon,city,pfas_values\n\
                    52.3,4.9,Amsterdam,\"[{\"\"value\"\":1}]\"\n\
                    52.1,5.1\n\
                    52.0,5.0,Utrecht,,extra\n\
                    51.9,4.4,Rotterdam,\n";
        let table = TableReader::new().parse_str(text).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.cell(0, "city"), Some(&Cell::text("Amsterdam")));
        assert_eq!(table.cell(1, "lon"), Some(&Cell::text("5.1")));
        assert_eq!(table.cell(1, "city"), Some(&Cell::Missing));
        assert_eq!(table.cell(1, "pfas_values"), Some(&Cell::Missing));
        assert_eq!(table.cell(2, "city"), Some(&Cell::text("Rotterdam")));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let result = TableReader::new().read_table(Path::new("does/not/exist.csv"));
        match result {
            Err(ProcessingError::FileNotFound { path }) => {
                assert_eq!(path, Path::new("does/not/exist.csv"))
            }
            other => panic!("expected FileNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_encoding() {
        assert!(TableReader::with_encoding("klingon").is_err());
    }
}
