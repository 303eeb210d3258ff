//! Error types for roster-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in roster-core
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse CSV
    #[error("failed to parse CSV '{path}': {message}")]
    CsvParse { path: PathBuf, message: String },

    /// CSV parsing error from the csv crate
    #[error("CSV error in '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A setting holds a value outside its enumeration
    #[error("invalid value '{value}' for setting '{setting}'")]
    InvalidSetting { setting: String, value: String },

    /// HTTP transport error while talking to a provider
    #[error("request to {provider} failed: {source}")]
    Http {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// A provider answered, but not with something usable
    #[error("{provider} returned an unusable response: {message}")]
    Provider {
        provider: &'static str,
        message: String,
    },

    /// Provider rejected the configured credentials
    #[error("{provider} rejected the credentials: {message}")]
    Auth {
        provider: &'static str,
        message: String,
    },

    /// The unit catalog could not be fetched
    #[error("unit catalog is unavailable")]
    CatalogUnavailable,

    /// A configured guild could not be fetched
    #[error("guild '{0}' is unavailable")]
    GuildUnavailable(String),

    /// Output destination is missing
    #[error("sink target '{}' does not exist", .0.display())]
    MissingSinkTarget(PathBuf),

    /// Directory traversal error
    #[error("failed to traverse directory: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid_setting(setting: &str, value: impl Into<String>) -> Self {
        Error::InvalidSetting {
            setting: setting.to_string(),
            value: value.into(),
        }
    }
}
