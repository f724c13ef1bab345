//! Blob Uploader
//!
//! Uploads build artifacts to redundant blob servers, failing over across a
//! randomized host pool and confirming each stored blob is retrievable.
//!
//! # Modules
//!
//! - `hasher`: streaming content digests used to address blobs
//! - `upload`: host failover, response handling and directory uploads
//! - `credentials`: basic-auth identity loaded from a key/value file
//! - `config`: uploader settings from the environment

pub mod config;
pub mod credentials;
pub mod error;
pub mod hasher;
pub mod upload;

pub use config::UploaderConfig;
pub use credentials::Credentials;
pub use error::{ConfigError, CredentialsError, Result, UploadError};
pub use hasher::{digest_file, HashAlgorithm};
pub use upload::{UploadOptions, UploadOutcome, UploadReport, Uploader};
