/// Column names
pub const PFAS_VALUES_COLUMN: &str = "pfas_values";
pub const VALUE_COLUMN: &str = "value";
pub const LESS_THAN_COLUMN: &str = "less_than";
pub const CAS_ID_COLUMN: &str = "cas_id";
pub const CAS_ALIAS_COLUMN: &str = "cas";
pub const CITY_COLUMN: &str = "city";
pub const LAT_COLUMN: &str = "lat";
pub const LON_COLUMN: &str = "lon";

/// Suffixes for colliding column names
pub const OBSERVATION_SUFFIX: &str = "_pfas";
pub const REFERENCE_SUFFIX: &str = "_ref";

/// Columns kept in the tidy output, in order
pub const DEFAULT_OUTPUT_COLUMNS: &[&str] = &[
    "lat",
    "lon",
    "city",
    "country",
    "matrix",
    "year",
    "cas_id",
    "unit_pfas",
    "Use categories",
    "sub-use",
    "applications",
    "value",
];

/// Raw field values read as missing
pub const MISSING_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-NaN", "-nan", "<NA>", "N/A", "NA", "NULL", "NaN", "None",
    "n/a", "nan", "null",
];

/// Default file locations
pub const DEFAULT_MEASUREMENTS_FILE: &str = "data/pdh_export.csv";
pub const DEFAULT_REFERENCE_FILE: &str = "data/pfas_info.csv";
pub const DEFAULT_TIDY_OUTPUT_FILE: &str = "cleaned_pfas_data_tidy.csv";
pub const DEFAULT_FILTERED_OUTPUT_FILE: &str = "points_near_area.csv";

/// Input encodings
pub const DEFAULT_MEASUREMENTS_ENCODING: &str = "latin1";
pub const DEFAULT_REFERENCE_ENCODING: &str = "utf-8";

/// Outlier threshold used by the variant revision of the unpack step
pub const VARIANT_OUTLIER_THRESHOLD: f64 = 100_000.0;

/// Proximity defaults
pub const DEFAULT_DISTANCE_METERS: f64 = 1000.0;
pub const DISTANCE_TOLERANCE_METERS: f64 = 1e-6;

/// EPSG codes
pub const EPSG_WGS84: u32 = 4326;
pub const EPSG_RD_NEW: u32 = 28992;

/// RD New validity domain (WGS84 degrees)
pub const RD_MIN_LAT: f64 = 50.0;
pub const RD_MAX_LAT: f64 = 54.5;
pub const RD_MIN_LON: f64 = 2.5;
pub const RD_MAX_LON: f64 = 8.0;
