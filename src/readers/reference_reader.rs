use crate::error::{ProcessingError, Result};
use crate::models::Table;
use crate::readers::TableReader;
use crate::settings::MergeSettings;
use std::path::Path;
use tracing::info;

/// Loads the substance reference table and normalises its key column name.
pub struct ReferenceReader {
    key_column: String,
    key_aliases: Vec<String>,
    table_reader: TableReader,
}

impl ReferenceReader {
    pub fn new(settings: &MergeSettings, encoding: &str) -> Result<Self> {
        Ok(Self {
            key_column: settings.key_column.clone(),
            key_aliases: settings.key_aliases.clone(),
            table_reader: TableReader::with_encoding(encoding)?,
        })
    }

    pub fn read_reference(&self, path: &Path) -> Result<Table> {
        let mut table = self.table_reader.read_table(path)?;
        self.normalize_key_column(&mut table)?;
        Ok(table)
    }

    /// Rename the first alias present to the canonical key name, unless the
    /// canonical name is already there.
    pub fn normalize_key_column(&self, table: &mut Table) -> Result<()> {
        if table.has_column(&self.key_column) {
            return Ok(());
        }

        for alias in &self.key_aliases {
            if table.rename_column(alias, &self.key_column) {
                info!(from = %alias, to = %self.key_column, "Renamed reference key column");
                return Ok(());
            }
        }

        Err(ProcessingError::missing_column(
            &self.key_column,
            &format!(
                "reference table has neither '{}' nor any of {:?}",
                self.key_column, self.key_aliases
            ),
        ))
    }
}
