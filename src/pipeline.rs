//! The two pipeline stages, wired from [`PipelineSettings`].
//!
//! `tidy_table` is the in-memory core of the unpack stage; the `run_*`
//! functions add the file I/O around it.

use crate::error::{ProcessingError, Result};
use crate::models::Table;
use crate::processors::{
    filter_city, select_columns, ProximityFilter, ProximityOutcome, ReferenceMerger, TidyUnpacker,
    UnpackReport,
};
use crate::readers::{AreaReader, ReferenceReader, TableReader};
use crate::settings::PipelineSettings;
use crate::utils::progress::ProgressReporter;
use crate::writers::CsvWriter;
use std::path::{Path, PathBuf};
use tracing::warn;

/// What the unpack stage produced
#[derive(Debug)]
pub struct UnpackStage {
    pub table: Table,
    pub report: UnpackReport,
    pub merged: bool,
    pub city_rows_removed: Option<usize>,
}

/// What the proximity stage produced; `written` is `None` for an empty result
#[derive(Debug)]
pub struct ProximityStage {
    pub outcome: ProximityOutcome,
    pub written: Option<PathBuf>,
}

/// Unpack, merge, filter by city and project onto the output columns.
///
/// Missing-column problems in the optional steps are logged and the step is
/// skipped.
pub fn tidy_table(
    settings: &PipelineSettings,
    wide: &Table,
    reference: Option<&Table>,
    progress: Option<&ProgressReporter>,
) -> Result<UnpackStage> {
    let (mut table, report) = TidyUnpacker::new(settings.unpack.clone()).unpack(wide, progress)?;

    let mut merged = false;
    if let Some(reference) = reference {
        match ReferenceMerger::new(&settings.merge).left_join(&table, reference) {
            Ok(joined) => {
                table = joined;
                merged = true;
            }
            Err(e) if e.is_recoverable() => warn!("Skipping reference merge: {}", e),
            Err(e) => return Err(e),
        }
    }

    let mut city_rows_removed = None;
    if let Some(city) = &settings.selection.city {
        match filter_city(&mut table, city) {
            Ok(removed) => city_rows_removed = Some(removed),
            Err(e) if e.is_recoverable() => warn!("Skipping city filter: {}", e),
            Err(e) => return Err(e),
        }
    }

    let table = select_columns(&table, &settings.selection.columns);

    Ok(UnpackStage {
        table,
        report,
        merged,
        city_rows_removed,
    })
}

/// Load the reference table if one is configured. A missing reference file
/// or key column only disables the merge.
pub fn load_reference(settings: &PipelineSettings) -> Result<Option<Table>> {
    let Some(path) = &settings.paths.reference else {
        return Ok(None);
    };

    let reader = ReferenceReader::new(&settings.merge, &settings.paths.reference_encoding)?;
    match reader.read_reference(path) {
        Ok(table) => Ok(Some(table)),
        Err(e) if e.is_recoverable() || matches!(e, ProcessingError::FileNotFound { .. }) => {
            warn!("Continuing without reference information: {}", e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Read the wide measurements, tidy them and write the result to `output`
pub fn run_unpack_stage(
    settings: &PipelineSettings,
    output: &Path,
    silent: bool,
) -> Result<UnpackStage> {
    let wide = TableReader::with_encoding(&settings.paths.measurements_encoding)?
        .read_table(&settings.paths.measurements)?;
    let reference = load_reference(settings)?;

    let progress = ProgressReporter::new(wide.len() as u64, "Unpacking observations...", silent);
    let stage = tidy_table(settings, &wide, reference.as_ref(), Some(&progress))?;
    progress.finish_with_message(&format!(
        "Unpacked {} single-observation rows",
        stage.report.output_rows
    ));

    CsvWriter::new().write_table(&stage.table, output)?;
    Ok(stage)
}

/// Filter the points in `input` against the area in `area_path`.
///
/// An empty result writes no file.
pub fn run_proximity_stage(
    settings: &PipelineSettings,
    input: &Path,
    area_path: &Path,
    output: &Path,
    silent: bool,
) -> Result<ProximityStage> {
    let area = AreaReader::with_crs_override(settings.proximity.area_crs).read_area(area_path)?;
    let points = TableReader::new().read_table(input)?;

    let spinner = ProgressReporter::new_spinner("Filtering points by distance...", silent);
    let outcome = ProximityFilter::new(&settings.proximity).filter_near(
        &points,
        &area,
        settings.proximity.distance_meters,
    )?;
    spinner.finish_with_message(&format!(
        "Found {} points within {} m",
        outcome.matched(),
        outcome.distance_meters
    ));

    let written = if outcome.is_empty() {
        None
    } else {
        CsvWriter::new().write_table(&outcome.points, output)?;
        Some(output.to_path_buf())
    };

    Ok(ProximityStage { outcome, written })
}
