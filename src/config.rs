//! Configuration management for the blob uploader

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::hasher::HashAlgorithm;

/// Default attempt budget per file
pub const DEFAULT_MAX_ATTEMPTS: usize = 10;

/// Default per-request timeout: 5 minutes
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploaderConfig {
    /// Digest used to address blobs
    pub hash_algorithm: HashAlgorithm,
    /// Maximum POST attempts per file
    pub max_attempts: usize,
    /// Timeout applied to every POST and HEAD request
    pub request_timeout: Duration,
    /// Extra PEM root certificates to trust
    pub ca_bundle: Option<PathBuf>,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        UploaderConfig {
            hash_algorithm: HashAlgorithm::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            ca_bundle: None,
        }
    }
}

impl UploaderConfig {
    /// Read `BLOBBER_*` variables, falling back to defaults for unset ones
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let hash_algorithm = match lookup("BLOBBER_HASH_ALGO") {
            Some(value) => value.parse::<HashAlgorithm>().map_err(|_| ConfigError::InvalidValue {
                var: "BLOBBER_HASH_ALGO",
                value,
            })?,
            None => defaults.hash_algorithm,
        };

        let max_attempts = match lookup("BLOBBER_ATTEMPTS") {
            Some(value) => match value.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: "BLOBBER_ATTEMPTS",
                        value,
                    })
                }
            },
            None => defaults.max_attempts,
        };

        let request_timeout = match lookup("BLOBBER_TIMEOUT_SECS") {
            Some(value) => match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: "BLOBBER_TIMEOUT_SECS",
                        value,
                    })
                }
            },
            None => defaults.request_timeout,
        };

        let ca_bundle = lookup("BLOBBER_CA_BUNDLE")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Ok(UploaderConfig {
            hash_algorithm,
            max_attempts,
            request_timeout,
            ca_bundle,
        })
    }

    /// Load the configured CA bundle, one certificate per PEM entry.
    ///
    /// A bundle that yields no certificates is rejected rather than
    /// silently falling back to the built-in roots.
    pub fn root_certificates(&self) -> Result<Vec<reqwest::Certificate>, ConfigError> {
        let Some(path) = &self.ca_bundle else {
            return Ok(Vec::new());
        };

        let pem = std::fs::read(path).map_err(|source| ConfigError::CaBundle {
            path: path.clone(),
            source,
        })?;

        parse_pem_bundle(&pem).map_err(|reason| ConfigError::InvalidCertificate {
            path: path.clone(),
            reason,
        })
    }
}

fn parse_pem_bundle(pem: &[u8]) -> Result<Vec<reqwest::Certificate>, String> {
    let ders = rustls_pemfile::certs(&mut &pem[..])
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("malformed PEM: {}", e))?;

    if ders.is_empty() {
        return Err("no PEM certificates found".to_string());
    }

    ders.iter()
        .map(|der| reqwest::Certificate::from_der(der.as_ref()).map_err(|e| e.to_string()))
        .collect()
}
