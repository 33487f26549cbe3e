use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),

    #[error("Configuration file error: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Column '{column}' not found ({context})")]
    MissingColumn { column: String, context: String },

    #[error("CRS error: {0}")]
    Crs(String),

    #[error("Geometry error: {0}")]
    Geometry(String),

    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Text encoding error: {0}")]
    Encoding(String),
}

impl ProcessingError {
    pub fn missing_column(column: &str, context: &str) -> Self {
        ProcessingError::MissingColumn {
            column: column.to_string(),
            context: context.to_string(),
        }
    }

    /// True for defects in the input data layout that a caller may skip over.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ProcessingError::MissingColumn { .. })
    }
}

/// Map a failed open into `FileNotFound` so the offending path is reported.
pub(crate) fn open_error(err: std::io::Error, path: &std::path::Path) -> ProcessingError {
    if err.kind() == std::io::ErrorKind::NotFound {
        ProcessingError::FileNotFound {
            path: path.to_path_buf(),
        }
    } else {
        ProcessingError::Io(err)
    }
}
