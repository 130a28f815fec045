use std::path::PathBuf;

use thiserror::Error;

/// Failures while building or reading the combined restaurant table.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read source '{}': {reason}", path.display())]
    SourceRead { path: PathBuf, reason: String },
    #[error("missing required column '{column}' in {table}")]
    Schema { table: String, column: String },
    #[error("combined table '{}' is unavailable: {reason}", path.display())]
    DataUnavailable { path: PathBuf, reason: String },
    #[error("failed to write combined table '{}': {reason}", path.display())]
    Write { path: PathBuf, reason: String },
}

impl DataError {
    pub fn source_read(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::SourceRead {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn schema(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::Schema {
            table: table.into(),
            column: column.into(),
        }
    }

    pub fn write(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Write {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Short machine-readable tag used in API payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SourceRead { .. } => "source_read",
            Self::Schema { .. } => "schema",
            Self::DataUnavailable { .. } => "data_unavailable",
            Self::Write { .. } => "write",
        }
    }
}

/// Failures talking to the Google Maps web services.
#[derive(Debug, Error)]
pub enum MapsError {
    #[error("GOOGLE_MAPS_API_KEY is not configured")]
    MissingApiKey,
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("Google Maps API error: {0}")]
    Api(String),
}

