pub mod constants;
pub mod coordinates;
pub mod filename;
pub mod logging;
pub mod progress;

pub use constants::*;
pub use coordinates::{is_within_rd_domain, rd_to_wgs84, validate_wgs84_coordinates, wgs84_to_rd};
pub use filename::{generate_default_filtered_filename, generate_default_tidy_filename};
pub use logging::init_logging;
pub use progress::ProgressReporter;
