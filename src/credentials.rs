//! Blob server credentials
//!
//! Credentials live in a small key/value file:
//!
//! ```text
//! blobber_username = "builder"
//! blobber_password = "s3cret"
//! ```
//!
//! The file is parsed as TOML and only the two fields above are extracted.
//! Any other keys are ignored.

use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::error::CredentialsError;

/// Basic-auth identity sent with every POST
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    #[serde(rename = "blobber_username")]
    pub username: String,
    #[serde(rename = "blobber_password")]
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Load credentials from a key/value file
    pub fn from_file(path: &Path) -> Result<Self, CredentialsError> {
        let contents = std::fs::read_to_string(path).map_err(|source| CredentialsError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let credentials = Self::parse(&contents).map_err(|source| CredentialsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::debug!(
            path = %path.display(),
            username = %credentials.username,
            "Loaded blob server credentials"
        );

        Ok(credentials)
    }

    fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
