use chrono::{Datelike, Local};
use std::path::PathBuf;

fn dated_filename(stem: &str) -> PathBuf {
    let now = Local::now();
    let year = now.year() % 100; // Get last 2 digits of year
    let month = now.month();
    let day = now.day();

    let filename = format!("{}-{:02}{:02}{:02}.csv", stem, year, month, day);
    PathBuf::from("output").join(filename)
}

/// Generate default tidy table filename with format: pfas-tidy-{YYMMDD}.csv
pub fn generate_default_tidy_filename() -> PathBuf {
    dated_filename("pfas-tidy")
}

/// Generate default proximity result filename with format: pfas-near-area-{YYMMDD}.csv
pub fn generate_default_filtered_filename() -> PathBuf {
    dated_filename("pfas-near-area")
}
