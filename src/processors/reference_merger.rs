use crate::error::Result;
use crate::models::{Cell, Table};
use crate::settings::MergeSettings;
use std::collections::{HashMap, HashSet};
use tracing::info;

/// Left-joins tidy rows with a substance reference table.
pub struct ReferenceMerger {
    key_column: String,
    reference_suffix: String,
}

impl ReferenceMerger {
    pub fn new(settings: &MergeSettings) -> Self {
        Self {
            key_column: settings.key_column.clone(),
            reference_suffix: settings.reference_suffix.clone(),
        }
    }

    /// Every left row is kept; each matching reference row yields one output
    /// row and unmatched rows get missing reference columns.
    pub fn left_join(&self, left: &Table, reference: &Table) -> Result<Table> {
        let left_key = left.require_column(&self.key_column, "tidy table, reference merge")?;
        let right_key =
            reference.require_column(&self.key_column, "reference table, reference merge")?;

        let right_indices: Vec<usize> = (0..reference.columns().len())
            .filter(|&i| i != right_key)
            .collect();

        let mut taken: HashSet<String> = left.columns().iter().cloned().collect();
        let mut columns = left.columns().to_vec();
        for &i in &right_indices {
            let mut name = reference.columns()[i].clone();
            while taken.contains(&name) {
                name.push_str(&self.reference_suffix);
            }
            taken.insert(name.clone());
            columns.push(name);
        }

        let mut lookup: HashMap<String, Vec<usize>> = HashMap::new();
        for (row_index, row) in reference.rows().iter().enumerate() {
            if let Some(key) = row[right_key].join_key() {
                lookup.entry(key).or_default().push(row_index);
            }
        }

        let mut joined = Table::new(columns);
        let mut unmatched = 0;
        for row in left.rows() {
            let matches = row[left_key]
                .join_key()
                .and_then(|key| lookup.get(&key))
                .map(Vec::as_slice)
                .unwrap_or_default();

            if matches.is_empty() {
                unmatched += 1;
                let mut out = row.clone();
                out.extend(std::iter::repeat(Cell::Missing).take(right_indices.len()));
                joined.push_row(out)?;
                continue;
            }

            for &match_index in matches {
                let source = &reference.rows()[match_index];
                let mut out = row.clone();
                out.extend(right_indices.iter().map(|&i| source[i].clone()));
                joined.push_row(out)?;
            }
        }

        info!(
            rows = joined.len(),
            unmatched,
            reference_rows = reference.len(),
            "Merged reference information"
        );
        Ok(joined)
    }
}

impl Default for ReferenceMerger {
    fn default() -> Self {
        Self::new(&MergeSettings::default())
    }
}
