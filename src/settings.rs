use crate::error::{ProcessingError, Result};
use crate::models::Crs;
use crate::utils::constants::*;
use config::{Config, File, FileFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use validator::Validate;

/// Everything a pipeline run needs, loaded from an optional configuration file.
///
/// Missing keys fall back to the defaults below; CLI flags are applied on top
/// by the command layer.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct PipelineSettings {
    #[validate(nested)]
    pub paths: PathSettings,

    #[validate(nested)]
    pub unpack: UnpackSettings,

    #[validate(nested)]
    pub merge: MergeSettings,

    pub selection: SelectionSettings,

    #[validate(nested)]
    pub proximity: ProximitySettings,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct PathSettings {
    pub measurements: PathBuf,
    pub reference: Option<PathBuf>,
    pub area: Option<PathBuf>,
    pub tidy_output: PathBuf,
    pub filtered_output: PathBuf,

    #[validate(length(min = 1))]
    pub measurements_encoding: String,

    #[validate(length(min = 1))]
    pub reference_encoding: String,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            measurements: PathBuf::from(DEFAULT_MEASUREMENTS_FILE),
            reference: Some(PathBuf::from(DEFAULT_REFERENCE_FILE)),
            area: None,
            tidy_output: PathBuf::from(DEFAULT_TIDY_OUTPUT_FILE),
            filtered_output: PathBuf::from(DEFAULT_FILTERED_OUTPUT_FILE),
            measurements_encoding: DEFAULT_MEASUREMENTS_ENCODING.to_string(),
            reference_encoding: DEFAULT_REFERENCE_ENCODING.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct UnpackSettings {
    #[validate(length(min = 1))]
    pub json_column: String,

    #[validate(length(min = 1))]
    pub value_column: String,

    pub numeric_columns: Vec<String>,

    #[validate(length(min = 1))]
    pub collision_suffix: String,

    /// Drop rows whose value exceeds this bound; `None` keeps every row
    #[validate(range(exclusive_min = 0.0))]
    pub max_value: Option<f64>,
}

impl Default for UnpackSettings {
    fn default() -> Self {
        Self {
            json_column: PFAS_VALUES_COLUMN.to_string(),
            value_column: VALUE_COLUMN.to_string(),
            numeric_columns: vec![VALUE_COLUMN.to_string(), LESS_THAN_COLUMN.to_string()],
            collision_suffix: OBSERVATION_SUFFIX.to_string(),
            max_value: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct MergeSettings {
    #[validate(length(min = 1))]
    pub key_column: String,

    /// Alternative names for the key column in the reference table
    pub key_aliases: Vec<String>,

    #[validate(length(min = 1))]
    pub reference_suffix: String,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            key_column: CAS_ID_COLUMN.to_string(),
            key_aliases: vec![CAS_ALIAS_COLUMN.to_string()],
            reference_suffix: REFERENCE_SUFFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectionSettings {
    /// Keep only rows from this city (case-insensitive)
    pub city: Option<String>,

    /// Output column allow-list; empty keeps every column
    pub columns: Vec<String>,
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            city: None,
            columns: DEFAULT_OUTPUT_COLUMNS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct ProximitySettings {
    #[validate(length(min = 1))]
    pub lat_column: String,

    #[validate(length(min = 1))]
    pub lon_column: String,

    #[validate(range(min = 0.0))]
    pub distance_meters: f64,

    pub points_crs: Crs,
    pub metric_crs: Crs,

    /// Overrides the CRS declared by (or defaulted for) the area file
    pub area_crs: Option<Crs>,
}

impl Default for ProximitySettings {
    fn default() -> Self {
        Self {
            lat_column: LAT_COLUMN.to_string(),
            lon_column: LON_COLUMN.to_string(),
            distance_meters: DEFAULT_DISTANCE_METERS,
            points_crs: Crs::Wgs84,
            metric_crs: Crs::RdNew,
            area_crs: None,
        }
    }
}

impl PipelineSettings {
    /// Load settings from a TOML/JSON/YAML file (format by extension), or defaults when `None`
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let settings = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ProcessingError::FileNotFound {
                        path: path.to_path_buf(),
                    });
                }
                Config::builder()
                    .add_source(File::from(path))
                    .build()?
                    .try_deserialize::<PipelineSettings>()?
            }
            None => PipelineSettings::default(),
        };

        settings.validate()?;
        Ok(settings)
    }

    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize::<PipelineSettings>()?;

        settings.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_valid() {
        let settings = PipelineSettings::load(None).unwrap();
        assert_eq!(settings.unpack.json_column, "pfas_values");
        assert_eq!(settings.unpack.max_value, None);
        assert_eq!(settings.proximity.metric_crs, Crs::RdNew);
        assert_eq!(settings.proximity.distance_meters, 1000.0);
        assert_eq!(settings.selection.columns.len(), DEFAULT_OUTPUT_COLUMNS.len());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = PipelineSettings::from_toml_str(
            r#"
            [unpack]
            max_value = 100000

            [selection]
            city = "amsterdam"

            [proximity]
            distance_meters = 50
            area_crs = "EPSG:28992"
            "#,
        )
        .unwrap();

        assert_eq!(settings.unpack.max_value, Some(100_000.0));
        assert_eq!(settings.unpack.collision_suffix, "_pfas");
        assert_eq!(settings.selection.city.as_deref(), Some("amsterdam"));
        assert_eq!(settings.proximity.distance_meters, 50.0);
        assert_eq!(settings.proximity.area_crs, Some(Crs::RdNew));
        assert_eq!(settings.proximity.lat_column, "lat");
    }

    #[test]
    fn test_negative_distance_rejected() {
        let result = PipelineSettings::from_toml_str("[proximity]\ndistance_meters = -5\n");
        assert!(matches!(result, Err(ProcessingError::Validation(_))));
    }

    #[test]
    fn test_outlier_threshold_must_be_positive() {
        let zero = PipelineSettings::from_toml_str("[unpack]\nmax_value = 0\n");
        assert!(matches!(zero, Err(ProcessingError::Validation(_))));

        let positive = PipelineSettings::from_toml_str("[unpack]\nmax_value = 0.5\n").unwrap();
        assert_eq!(positive.unpack.max_value, Some(0.5));
    }

    #[test]
    fn test_unknown_crs_rejected() {
        let result = PipelineSettings::from_toml_str("[proximity]\nmetric_crs = \"EPSG:3857\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file() -> Result<()> {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
        writeln!(file, "[paths]\nmeasurements = \"export.csv\"")?;

        let settings = PipelineSettings::load(Some(file.path()))?;
        assert_eq!(settings.paths.measurements, PathBuf::from("export.csv"));
        Ok(())
    }

    #[test]
    fn test_missing_config_file() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().with_extension("missing.toml");
        assert!(matches!(
            PipelineSettings::load(Some(&path)),
            Err(ProcessingError::FileNotFound { .. })
        ));
    }
}
