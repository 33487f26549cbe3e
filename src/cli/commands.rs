use crate::cli::args::{Cli, Commands};
use crate::error::{ProcessingError, Result};
use crate::models::{Crs, Table};
use crate::pipeline::{run_proximity_stage, run_unpack_stage, ProximityStage, UnpackStage};
use crate::settings::PipelineSettings;
use crate::utils::constants::VARIANT_OUTLIER_THRESHOLD;
use crate::utils::filename::{generate_default_filtered_filename, generate_default_tidy_filename};
use crate::utils::logging::init_logging;
use std::path::{Path, PathBuf};
use tracing::info;
use validator::Validate;

const PREVIEW_ROWS: usize = 5;

pub fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;

    let mut settings = PipelineSettings::load(cli.config.as_deref())?;
    let from_config = cli.config.is_some();
    let silent = cli.quiet;

    match cli.command {
        Commands::Unpack {
            input,
            reference,
            no_reference,
            output,
            city,
            max_value,
            drop_outliers,
            encoding,
        } => {
            if let Some(input) = input {
                settings.paths.measurements = input;
            }
            if let Some(reference) = reference {
                settings.paths.reference = Some(reference);
            }
            if no_reference {
                settings.paths.reference = None;
            }
            if let Some(encoding) = encoding {
                settings.paths.measurements_encoding = encoding;
            }
            apply_unpack_overrides(&mut settings, city, outlier_bound(max_value, drop_outliers));
            settings.validate()?;

            let output = resolve_output(
                output,
                from_config,
                &settings.paths.tidy_output,
                generate_default_tidy_filename,
            );
            println!(
                "Unpacking observations from {}",
                settings.paths.measurements.display()
            );

            let stage = run_unpack_stage(&settings, &output, silent)?;
            report_unpack(&stage, &output);
        }

        Commands::FilterNear {
            input,
            area,
            output,
            distance,
            lat_column,
            lon_column,
            area_crs,
        } => {
            if let Some(lat_column) = lat_column {
                settings.proximity.lat_column = lat_column;
            }
            if let Some(lon_column) = lon_column {
                settings.proximity.lon_column = lon_column;
            }
            if let Some(area_crs) = area_crs {
                settings.proximity.area_crs = Some(area_crs.parse::<Crs>()?);
            }
            apply_distance_override(&mut settings, distance);
            settings.validate()?;

            let input = input.unwrap_or_else(|| settings.paths.tidy_output.clone());
            let area = require_area(area, &settings)?;
            let output = resolve_output(
                output,
                from_config,
                &settings.paths.filtered_output,
                generate_default_filtered_filename,
            );
            println!(
                "Filtering {} against {}",
                input.display(),
                area.display()
            );

            let stage = run_proximity_stage(&settings, &input, &area, &output, silent)?;
            report_proximity(&stage);
        }

        Commands::Pipeline {
            area,
            city,
            max_value,
            drop_outliers,
            distance,
        } => {
            apply_unpack_overrides(&mut settings, city, outlier_bound(max_value, drop_outliers));
            apply_distance_override(&mut settings, distance);
            settings.validate()?;

            let area = require_area(area, &settings)?;
            let tidy_output = resolve_output(
                None,
                from_config,
                &settings.paths.tidy_output,
                generate_default_tidy_filename,
            );
            let filtered_output = resolve_output(
                None,
                from_config,
                &settings.paths.filtered_output,
                generate_default_filtered_filename,
            );

            println!("Step 1/2: unpacking observations");
            let unpacked = run_unpack_stage(&settings, &tidy_output, silent)?;
            report_unpack(&unpacked, &tidy_output);

            println!("\nStep 2/2: filtering points near {}", area.display());
            let filtered =
                run_proximity_stage(&settings, &tidy_output, &area, &filtered_output, silent)?;
            report_proximity(&filtered);

            info!("Pipeline finished");
        }
    }

    Ok(())
}

fn apply_unpack_overrides(
    settings: &mut PipelineSettings,
    city: Option<String>,
    max_value: Option<f64>,
) {
    if city.is_some() {
        settings.selection.city = city;
    }
    if max_value.is_some() {
        settings.unpack.max_value = max_value;
    }
}

/// An explicit bound wins; `--drop-outliers` selects the standard one
fn outlier_bound(max_value: Option<f64>, drop_outliers: bool) -> Option<f64> {
    max_value.or_else(|| drop_outliers.then_some(VARIANT_OUTLIER_THRESHOLD))
}

fn apply_distance_override(settings: &mut PipelineSettings, distance: Option<f64>) {
    if let Some(distance) = distance {
        settings.proximity.distance_meters = distance;
    }
}

fn require_area(area: Option<PathBuf>, settings: &PipelineSettings) -> Result<PathBuf> {
    area.or_else(|| settings.paths.area.clone()).ok_or_else(|| {
        ProcessingError::Config(
            "No reference area given: pass --area or set paths.area in the configuration"
                .to_string(),
        )
    })
}

/// CLI value first, then the configured path, then a dated default name
fn resolve_output(
    cli_value: Option<PathBuf>,
    from_config: bool,
    configured: &Path,
    dated_default: fn() -> PathBuf,
) -> PathBuf {
    match cli_value {
        Some(path) => path,
        None if from_config => configured.to_path_buf(),
        None => dated_default(),
    }
}

fn report_unpack(stage: &UnpackStage, output: &Path) {
    println!("\n{}", stage.report.summary());
    if !stage.merged {
        println!("Reference information was not merged");
    }
    if let Some(removed) = stage.city_rows_removed {
        println!("City filter removed {} rows", removed);
    }

    print_preview(&stage.table);
    println!(
        "Wrote {} rows to {}",
        stage.table.len(),
        output.display()
    );
}

fn report_proximity(stage: &ProximityStage) {
    println!("\n{}", stage.outcome.summary());
    match &stage.written {
        Some(path) => {
            print_preview(&stage.outcome.points);
            println!(
                "Wrote {} points to {}",
                stage.outcome.matched(),
                path.display()
            );
        }
        None => println!(
            "No points were found within {} m of the area. No output file was created.",
            stage.outcome.distance_meters
        ),
    }
}

fn print_preview(table: &Table) {
    if table.is_empty() {
        return;
    }

    let shown = table.len().min(PREVIEW_ROWS);
    println!("\nFirst {} of {} rows:", shown, table.len());
    println!("{}", table.columns().join(" | "));
    for row in table.rows().iter().take(shown) {
        let cells: Vec<String> = row.iter().map(|cell| cell.to_string()).collect();
        println!("{}", cells.join(" | "));
    }
    println!();
}
