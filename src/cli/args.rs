use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pfas-cleaner")]
#[command(about = "Tidy PFAS measurement exports and filter them by distance to a reference area")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(
        short,
        long,
        global = true,
        help = "Only log warnings and errors, hide progress bars"
    )]
    pub quiet: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(
        short,
        long,
        global = true,
        help = "Pipeline configuration file (TOML, JSON or YAML)"
    )]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Unpack the JSON observation column into one row per observation
    Unpack {
        #[arg(short, long, help = "Wide measurements CSV")]
        input: Option<PathBuf>,

        #[arg(short, long, help = "Substance reference CSV to left-join on cas_id")]
        reference: Option<PathBuf>,

        #[arg(long, help = "Skip the reference merge even if configured")]
        no_reference: bool,

        #[arg(
            short,
            long,
            help = "Output CSV path [default: output/pfas-tidy-{YYMMDD}.csv]"
        )]
        output: Option<PathBuf>,

        #[arg(long, help = "Keep only rows from this city (case-insensitive)")]
        city: Option<String>,

        #[arg(long, help = "Drop rows whose value exceeds this bound")]
        max_value: Option<f64>,

        #[arg(
            long,
            conflicts_with = "max_value",
            help = "Drop rows whose value exceeds 100000"
        )]
        drop_outliers: bool,

        #[arg(long, help = "Text encoding of the measurements file [default: latin1]")]
        encoding: Option<String>,
    },

    /// Keep only points within a distance of a reference area
    FilterNear {
        #[arg(short, long, help = "CSV with latitude/longitude columns")]
        input: Option<PathBuf>,

        #[arg(
            short,
            long,
            help = "Reference polygons: GeoJSON, or an ESRI shapefile (.shp with its .prj)"
        )]
        area: Option<PathBuf>,

        #[arg(
            short,
            long,
            help = "Output CSV path [default: output/pfas-near-area-{YYMMDD}.csv]"
        )]
        output: Option<PathBuf>,

        #[arg(short, long, help = "Search distance in meters [default: 1000]")]
        distance: Option<f64>,

        #[arg(long, help = "Latitude column name [default: lat]")]
        lat_column: Option<String>,

        #[arg(long, help = "Longitude column name [default: lon]")]
        lon_column: Option<String>,

        #[arg(long, help = "CRS of the area file, overriding its declaration (e.g. EPSG:28992)")]
        area_crs: Option<String>,
    },

    /// Run unpack and then filter-near, with paths from the configuration
    Pipeline {
        #[arg(
            short,
            long,
            help = "Reference polygons: GeoJSON, or an ESRI shapefile (.shp with its .prj)"
        )]
        area: Option<PathBuf>,

        #[arg(long, help = "Keep only rows from this city (case-insensitive)")]
        city: Option<String>,

        #[arg(long, help = "Drop rows whose value exceeds this bound")]
        max_value: Option<f64>,

        #[arg(
            long,
            conflicts_with = "max_value",
            help = "Drop rows whose value exceeds 100000"
        )]
        drop_outliers: bool,

        #[arg(short, long, help = "Search distance in meters")]
        distance: Option<f64>,
    },
}
