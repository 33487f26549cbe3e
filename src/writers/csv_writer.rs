use crate::error::Result;
use crate::models::Table;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Writes a [`Table`] as UTF-8 CSV with a header row.
pub struct CsvWriter;

impl CsvWriter {
    pub fn new() -> Self {
        Self
    }

    /// Write to `path`, creating parent directories. Returns the number of data rows written.
    pub fn write_table(&self, table: &Table, path: &Path) -> Result<usize> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = std::fs::File::create(path)?;
        let rows = self.write_to(table, file)?;
        info!(path = %path.display(), rows, "Wrote table");
        Ok(rows)
    }

    pub fn write_to<W: Write>(&self, table: &Table, sink: W) -> Result<usize> {
        let mut writer = csv::Writer::from_writer(sink);

        writer.write_record(table.columns())?;
        for row in table.rows() {
            writer.write_record(row.iter().map(|cell| cell.to_string()))?;
        }
        writer.flush()?;

        Ok(table.len())
    }
}

impl Default for CsvWriter {
    fn default() -> Self {
        Self::new()
    }
}
