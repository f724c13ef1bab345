//! Error types for the blob uploader

use std::path::PathBuf;

use thiserror::Error;

/// Library-wide result type
pub type Result<T> = std::result::Result<T, UploadError>;

/// Errors that abort an upload before or outside the attempt loop.
///
/// Per-host HTTP failures never surface here; they are absorbed by the
/// uploader and reported through [`crate::upload::UploadOutcome`].
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl UploadError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors reading the credentials file
#[derive(Error, Debug)]
pub enum CredentialsError {
    #[error("Failed to read credentials file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed credentials file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Errors loading uploader configuration from the environment
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },

    #[error("Failed to read CA bundle {path}: {source}")]
    CaBundle {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid CA bundle {path}: {reason}")]
    InvalidCertificate { path: PathBuf, reason: String },
}
