use crate::error::Result;
use crate::models::{format_number, Cell, Observation, ParsedObservations, Table};
use crate::settings::UnpackSettings;
use crate::utils::progress::ProgressReporter;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Row counts gathered while unpacking
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnpackReport {
    pub input_rows: usize,
    pub source_column_present: bool,
    pub absent_payloads: usize,
    pub malformed_payloads: usize,
    pub observations: usize,
    pub dropped_missing_value: usize,
    pub dropped_outliers: usize,
    pub outlier_threshold: Option<f64>,
    pub output_rows: usize,
}

impl UnpackReport {
    pub fn summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("=== Unpack Report ===\n");
        summary.push_str(&format!("Input Rows: {}\n", self.input_rows));
        if !self.source_column_present {
            summary.push_str("Observation column absent: explode step skipped\n");
        }
        summary.push_str(&format!("Rows Without Payload: {}\n", self.absent_payloads));
        summary.push_str(&format!("Malformed Payloads: {}\n", self.malformed_payloads));
        summary.push_str(&format!("Observations Found: {}\n", self.observations));
        summary.push_str(&format!(
            "Dropped (missing value): {}\n",
            self.dropped_missing_value
        ));
        match self.outlier_threshold {
            Some(threshold) => summary.push_str(&format!(
                "Dropped (value > {}): {}\n",
                format_number(threshold),
                self.dropped_outliers
            )),
            None => summary.push_str("Outlier filter: off\n"),
        }
        summary.push_str(&format!("Output Rows: {}\n", self.output_rows));

        summary
    }
}

/// Explodes a JSON observation column into one tidy row per observation.
pub struct TidyUnpacker {
    settings: UnpackSettings,
}

impl TidyUnpacker {
    pub fn new(settings: UnpackSettings) -> Self {
        Self { settings }
    }

    pub fn with_max_value(mut self, max_value: Option<f64>) -> Self {
        self.settings.max_value = max_value;
        self
    }

    /// Unpack `wide` into a tidy table.
    ///
    /// Every returned row has a numeric value column. Rows whose payload is
    /// missing, malformed, or an empty array contribute nothing. Row order
    /// follows input order, then array order.
    pub fn unpack(
        &self,
        wide: &Table,
        progress: Option<&ProgressReporter>,
    ) -> Result<(Table, UnpackReport)> {
        let mut report = UnpackReport {
            input_rows: wide.len(),
            outlier_threshold: self.settings.max_value,
            ..UnpackReport::default()
        };

        let mut table = match wide.column_index(&self.settings.json_column) {
            Some(json_index) => {
                report.source_column_present = true;
                self.explode(wide, json_index, &mut report, progress)?
            }
            None => {
                warn!(
                    column = %self.settings.json_column,
                    "Observation column not found; skipping explode step"
                );
                wide.clone()
            }
        };

        for column in &self.settings.numeric_columns {
            table.map_column(column, Cell::coerce_numeric);
        }

        report.dropped_missing_value = self.drop_missing_values(&mut table);
        info!(
            kept = table.len(),
            dropped = report.dropped_missing_value,
            "Filtered out rows without a numeric value"
        );

        if let Some(threshold) = self.settings.max_value {
            report.dropped_outliers = self.drop_outliers(&mut table, threshold);
            info!(
                threshold,
                dropped = report.dropped_outliers,
                "Filtered out rows above the outlier threshold"
            );
        }

        report.output_rows = table.len();
        info!(
            rows = report.output_rows,
            "Unpacking complete: single-observation rows"
        );
        Ok((table, report))
    }

    fn explode(
        &self,
        wide: &Table,
        json_index: usize,
        report: &mut UnpackReport,
        progress: Option<&ProgressReporter>,
    ) -> Result<Table> {
        let mut exploded: Vec<(usize, Observation)> = Vec::new();

        for (row_index, row) in wide.rows().iter().enumerate() {
            match ParsedObservations::parse(&row[json_index]) {
                ParsedObservations::Absent => report.absent_payloads += 1,
                ParsedObservations::Malformed(reason) => {
                    report.malformed_payloads += 1;
                    debug!(row = row_index, %reason, "Dropping malformed observation payload");
                }
                ParsedObservations::Parsed(observations) => {
                    exploded.extend(observations.into_iter().map(|o| (row_index, o)));
                }
            }

            if let Some(progress) = progress {
                progress.increment(1);
            }
        }
        report.observations = exploded.len();

        let base_indices: Vec<usize> = (0..wide.columns().len())
            .filter(|&i| i != json_index)
            .collect();
        let base_columns: Vec<String> = base_indices
            .iter()
            .map(|&i| wide.columns()[i].clone())
            .collect();

        let keys = observation_keys(&exploded);
        let names = self.resolve_column_names(&base_columns, &keys);

        let mut columns = base_columns;
        columns.extend(names);
        let mut table = Table::new(columns);

        for (row_index, observation) in &exploded {
            let source = &wide.rows()[*row_index];
            let mut row: Vec<Cell> = base_indices.iter().map(|&i| source[i].clone()).collect();
            row.extend(keys.iter().map(|key| observation.cell(key)));
            table.push_row(row)?;
        }

        info!(
            rows = wide.len(),
            observations = report.observations,
            malformed = report.malformed_payloads,
            "Exploded observation payloads"
        );
        Ok(table)
    }

    /// Output names for observation keys; keys clashing with an existing column get the suffix.
    fn resolve_column_names(&self, base_columns: &[String], keys: &[String]) -> Vec<String> {
        let mut taken: HashSet<String> = base_columns.iter().cloned().collect();

        keys.iter()
            .map(|key| {
                let mut name = key.clone();
                while taken.contains(&name) {
                    name.push_str(&self.settings.collision_suffix);
                }
                if &name != key {
                    debug!(key = %key, column = %name, "Renamed colliding observation field");
                }
                taken.insert(name.clone());
                name
            })
            .collect()
    }

    fn drop_missing_values(&self, table: &mut Table) -> usize {
        match table.column_index(&self.settings.value_column) {
            Some(index) => table.retain_rows(|row| row[index].to_number().is_some()),
            None => {
                warn!(
                    column = %self.settings.value_column,
                    "Value column not found; no row can be kept"
                );
                table.retain_rows(|_| false)
            }
        }
    }

    fn drop_outliers(&self, table: &mut Table, threshold: f64) -> usize {
        match table.column_index(&self.settings.value_column) {
            Some(index) => table.retain_rows(|row| {
                row[index]
                    .to_number()
                    .map_or(false, |value| value <= threshold)
            }),
            None => 0,
        }
    }
}

impl Default for TidyUnpacker {
    fn default() -> Self {
        Self::new(UnpackSettings::default())
    }
}

/// Distinct observation keys in order of first appearance
fn observation_keys(exploded: &[(usize, Observation)]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut keys = Vec::new();
    for (_, observation) in exploded {
        for key in observation.keys() {
            if seen.insert(key.to_string()) {
                keys.push(key.to_string());
            }
        }
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readers::TableReader;
    use pretty_assertions::assert_eq;

    fn wide(csv: &str) -> Table {
        TableReader::new().parse_str(csv).unwrap()
    }

    #[test]
    fn test_example_row_yields_single_tidy_row() {
        let input = wide(
            "lat,lon,pfas_values\n\
             52.3,4.9,\"[{\"\"cas_id\"\":\"\"A1\"\",\"\"value\"\":\"\"12.5\"\",\"\"unit\"\":\"\"ng/L\"\"},{\"\"cas_id\"\":\"\"A2\"\",\"\"value\"\":\"\"bad\"\"}]\"\n",
        );
        let (tidy, report) = TidyUnpacker::default().unpack(&input, None).unwrap();

        assert_eq!(tidy.len(), 1);
        assert_eq!(tidy.cell(0, "cas_id"), Some(&Cell::text("A1")));
        assert_eq!(tidy.cell(0, "value"), Some(&Cell::Number(12.5)));
        assert_eq!(tidy.cell(0, "unit"), Some(&Cell::text("ng/L")));
        assert_eq!(tidy.cell(0, "lat"), Some(&Cell::text("52.3")));
        assert!(!tidy.has_column("pfas_values"));
        assert_eq!(report.observations, 2);
        assert_eq!(report.dropped_missing_value, 1);
        assert_eq!(report.output_rows, 1);
    }

    #[test]
    fn test_missing_empty_and_malformed_payloads_contribute_nothing() {
        let input = wide(
            "city,pfas_values\n\
             A,\n\
             B,[]\n\
             C,\"[{\"\"value\"\":\"\n\
             D,\"{\"\"value\"\":1}\"\n\
             E,\"[{\"\"value\"\":2}]\"\n",
        );
        let (tidy, report) = TidyUnpacker::default().unpack(&input, None).unwrap();

        assert_eq!(tidy.len(), 1);
        assert_eq!(tidy.cell(0, "city"), Some(&Cell::text("E")));
        assert_eq!(report.absent_payloads, 1);
        assert_eq!(report.malformed_payloads, 2);
        assert_eq!(report.observations, 1);
    }

    #[test]
    fn test_colliding_unit_column_gets_suffix() {
        let input = wide(
            "unit,pfas_values\n\
             site-unit,\"[{\"\"cas_id\"\":\"\"A1\"\",\"\"value\"\":1,\"\"unit\"\":\"\"ng/g\"\"}]\"\n",
        );
        let (tidy, _) = TidyUnpacker::default().unpack(&input, None).unwrap();

        assert_eq!(
            tidy.columns(),
            &["unit", "cas_id", "value", "unit_pfas"].map(String::from)
        );
        assert_eq!(tidy.cell(0, "unit"), Some(&Cell::text("site-unit")));
        assert_eq!(tidy.cell(0, "unit_pfas"), Some(&Cell::text("ng/g")));
    }

    #[test]
    fn test_observation_keys_in_first_appearance_order() {
        let input = wide(
            "id,pfas_values\n\
             1,\"[{\"\"cas_id\"\":\"\"A\"\",\"\"value\"\":1},{\"\"value\"\":2,\"\"less_than\"\":\"\"1\"\",\"\"lab\"\":{\"\"name\"\":\"\"X\"\"}}]\"\n",
        );
        let (tidy, _) = TidyUnpacker::default().unpack(&input, None).unwrap();

        assert_eq!(
            tidy.columns(),
            &["id", "cas_id", "value", "less_than", "lab.name"].map(String::from)
        );
        assert_eq!(tidy.cell(0, "less_than"), Some(&Cell::Missing));
        assert_eq!(tidy.cell(1, "cas_id"), Some(&Cell::Missing));
        assert_eq!(tidy.cell(1, "less_than"), Some(&Cell::Number(1.0)));
        assert_eq!(tidy.cell(1, "lab.name"), Some(&Cell::text("X")));
    }

    #[test]
    fn test_boolean_less_than_flag_kept_as_number() {
        let input = wide(
            "id,pfas_values\n\
             1,\"[{\"\"value\"\":0.2,\"\"less_than\"\":true},{\"\"value\"\":3,\"\"less_than\"\":false}]\"\n",
        );
        let (tidy, _) = TidyUnpacker::default().unpack(&input, None).unwrap();

        assert_eq!(tidy.cell(0, "less_than"), Some(&Cell::Number(1.0)));
        assert_eq!(tidy.cell(1, "less_than"), Some(&Cell::Number(0.0)));
    }

    #[test]
    fn test_outlier_policy() {
        let input = wide(
            "id,pfas_values\n\
             1,\"[{\"\"value\"\":5},{\"\"value\"\":250000},{\"\"value\"\":100000}]\"\n",
        );

        let (kept, report) = TidyUnpacker::default().unpack(&input, None).unwrap();
        assert_eq!(kept.len(), 3);
        assert_eq!(report.dropped_outliers, 0);

        let (filtered, report) = TidyUnpacker::default()
            .with_max_value(Some(100_000.0))
            .unpack(&input, None)
            .unwrap();
        assert_eq!(filtered.len(), 2);
        assert_eq!(report.dropped_outliers, 1);
        assert_eq!(report.dropped_missing_value, 0);
        assert!(report.summary().contains("Dropped (value > 100000): 1"));
    }

    #[test]
    fn test_rerun_on_tidy_output_is_identity() {
        let input = wide(
            "lat,pfas_values\n\
             52.3,\"[{\"\"cas_id\"\":\"\"A1\"\",\"\"value\"\":1.5,\"\"less_than\"\":0}]\"\n\
             52.4,\"[{\"\"cas_id\"\":\"\"A2\"\",\"\"value\"\":\"\"2\"\"}]\"\n",
        );
        let unpacker = TidyUnpacker::default();
        let (tidy, _) = unpacker.unpack(&input, None).unwrap();
        let (again, report) = unpacker.unpack(&tidy, None).unwrap();

        assert_eq!(again, tidy);
        assert!(!report.source_column_present);
        assert_eq!(report.dropped_missing_value, 0);
    }

    #[test]
    fn test_no_value_column_yields_empty_table() {
        let input = wide("id,pfas_values\n1,\"[{\"\"cas_id\"\":\"\"A\"\"}]\"\n");
        let (tidy, report) = TidyUnpacker::default().unpack(&input, None).unwrap();
        assert!(tidy.is_empty());
        assert_eq!(report.dropped_missing_value, 1);
    }

    #[test]
    fn test_output_never_exceeds_valid_elements() {
        let input = wide(
            "id,pfas_values\n\
             1,\"[{\"\"value\"\":1}, null, 7, {\"\"value\"\":2}]\"\n\
             2,\"[{\"\"value\"\":3}]\"\n",
        );
        let (tidy, report) = TidyUnpacker::default().unpack(&input, None).unwrap();
        assert_eq!(report.observations, 3);
        assert!(tidy.len() <= report.observations);
        assert!(tidy
            .column_cells(tidy.column_index("value").unwrap())
            .all(|cell| matches!(cell, Cell::Number(_))));
    }
}
