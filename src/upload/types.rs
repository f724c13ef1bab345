//! Upload types

use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;

use crate::error::UploadError;
use crate::hasher::HashAlgorithm;

// ============================================================================
// Constants
// ============================================================================

/// Header carrying the public URL of an accepted blob
pub const BLOB_URL_HEADER: &str = "x-blob-url";

/// Header carrying a human-readable failure reason
pub const BLOBBER_MSG_HEADER: &str = "x-blobber-msg";

/// Multipart field holding the file bytes
pub const BLOB_FIELD: &str = "blob";

/// Multipart field holding the branch label
pub const BRANCH_FIELD: &str = "branch";

/// Message logged when a failed POST carries no `x-blobber-msg`
pub const DEFAULT_FAILURE_MESSAGE: &str = "Something went wrong on blobber!";

// ============================================================================
// Request
// ============================================================================

/// What is being uploaded; shared by every attempt for one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    /// Local file to send
    pub path: PathBuf,
    /// Branch label attached as metadata
    pub branch: String,
    /// Hex digest of the file content
    pub hash: String,
    /// Algorithm that produced `hash`
    pub algorithm: HashAlgorithm,
}

impl UploadRequest {
    pub fn new(
        path: impl Into<PathBuf>,
        branch: impl Into<String>,
        hash: impl Into<String>,
        algorithm: HashAlgorithm,
    ) -> Self {
        Self {
            path: path.into(),
            branch: branch.into(),
            hash: hash.into(),
            algorithm,
        }
    }

    /// Content-addressed POST target on `host`.
    ///
    /// The blob path is absolute, so any path already on the host URL is
    /// replaced rather than extended.
    pub fn blob_url(&self, host: &Url) -> Result<Url, url::ParseError> {
        host.join(&format!("/blobs/{}/{}", self.algorithm, self.hash))
    }

    /// File name sent in the multipart part
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.hash.clone())
    }
}

// ============================================================================
// Responses
// ============================================================================

/// The parts of a POST response the uploader acts on, decoded once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobResponse {
    pub status: u16,
    /// `x-blob-url`
    pub blob_url: Option<String>,
    /// `x-blobber-msg`
    pub message: Option<String>,
}

impl BlobResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            blob_url: None,
            message: None,
        }
    }

    pub fn with_blob_url(mut self, url: impl Into<String>) -> Self {
        self.blob_url = Some(url.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn classify(&self) -> ResponseClass {
        match self.status {
            202 => ResponseClass::Accepted,
            401 | 403 => ResponseClass::Unauthorized,
            _ => ResponseClass::Transient,
        }
    }

    /// Server message, or the generic fallback
    pub fn failure_message(&self) -> &str {
        self.message.as_deref().unwrap_or(DEFAULT_FAILURE_MESSAGE)
    }
}

/// How the uploader reacts to a POST status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    /// 202: stop and verify the blob URL
    Accepted,
    /// 401/403: the credential is bad everywhere; stop
    Unauthorized,
    /// Anything else: try the next host
    Transient,
}

// ============================================================================
// Attempts and Outcomes
// ============================================================================

/// What one POST attempt produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptResult {
    /// Server answered with this status
    Status(u16),
    /// Request never completed (connect, TLS, timeout)
    Transport(String),
}

/// One POST attempt against one host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    /// 1-based attempt number
    pub attempt: usize,
    pub host: Url,
    pub result: AttemptResult,
    pub blob_url: Option<String>,
}

/// Why an upload did not succeed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Host pool was empty; nothing attempted
    NoHosts,
    /// Server rejected the credential
    Unauthorized { status: u16 },
    /// 202 without an `x-blob-url` header
    MissingBlobUrl,
    /// 202 but the blob URL did not answer HEAD with 2xx
    NotRetrievable {
        blob_url: String,
        status: Option<u16>,
    },
    /// Attempt budget or host pool ran out
    Exhausted { attempts: usize },
    /// The local file could not be read
    Unreadable(String),
    /// Upload stopped on a local error other than file I/O
    Aborted(String),
}

impl FailureReason {
    /// Per-file failure for an error that ended an upload early
    pub fn from_error(error: &UploadError) -> Self {
        match error {
            UploadError::Io { source, .. } => Self::Unreadable(source.to_string()),
            other => Self::Aborted(other.to_string()),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoHosts => write!(f, "no hosts to upload to"),
            Self::Unauthorized { status } => write!(f, "credentials rejected ({})", status),
            Self::MissingBlobUrl => write!(f, "blob URL missing from accepted response"),
            Self::NotRetrievable { blob_url, status } => match status {
                Some(status) => write!(f, "{} not retrievable ({})", blob_url, status),
                None => write!(f, "{} not retrievable", blob_url),
            },
            Self::Exhausted { attempts } => write!(f, "gave up after {} attempts", attempts),
            Self::Unreadable(msg) => write!(f, "file unreadable: {}", msg),
            Self::Aborted(msg) => write!(f, "aborted: {}", msg),
        }
    }
}

/// Terminal result of one file's upload sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Succeeded { blob_url: String },
    Failed(FailureReason),
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    pub fn blob_url(&self) -> Option<&str> {
        match self {
            Self::Succeeded { blob_url } => Some(blob_url),
            Self::Failed(_) => None,
        }
    }
}

/// Outcome plus the attempts that led to it
#[derive(Debug, Clone)]
pub struct UploadReport {
    pub path: PathBuf,
    pub outcome: UploadOutcome,
    pub attempts: Vec<AttemptRecord>,
}

impl UploadReport {
    pub fn new(path: &Path, outcome: UploadOutcome, attempts: Vec<AttemptRecord>) -> Self {
        Self {
            path: path.to_path_buf(),
            outcome,
            attempts,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    /// Hosts contacted, in attempt order
    pub fn hosts_tried(&self) -> Vec<&Url> {
        self.attempts.iter().map(|a| &a.host).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_url_replaces_host_path() {
        let request = UploadRequest::new("/tmp/a.zip", "try", "abc123", HashAlgorithm::Sha512);

        let plain = Url::parse("https://blobber1.example.com").unwrap();
        assert_eq!(
            request.blob_url(&plain).unwrap().as_str(),
            "https://blobber1.example.com/blobs/sha512/abc123"
        );

        let with_path = Url::parse("https://blobber2.example.com:8443/api/").unwrap();
        assert_eq!(
            request.blob_url(&with_path).unwrap().as_str(),
            "https://blobber2.example.com:8443/blobs/sha512/abc123"
        );
    }

    #[test]
    fn test_classify() {
        assert_eq!(BlobResponse::new(202).classify(), ResponseClass::Accepted);
        assert_eq!(BlobResponse::new(401).classify(), ResponseClass::Unauthorized);
        assert_eq!(BlobResponse::new(403).classify(), ResponseClass::Unauthorized);
        for status in [200, 201, 204, 400, 404, 500, 502, 503] {
            assert_eq!(BlobResponse::new(status).classify(), ResponseClass::Transient);
        }
    }

    #[test]
    fn test_failure_message_fallback() {
        assert_eq!(BlobResponse::new(500).failure_message(), DEFAULT_FAILURE_MESSAGE);
        assert_eq!(
            BlobResponse::new(500).with_message("disk full").failure_message(),
            "disk full"
        );
    }

    #[test]
    fn test_failure_reason_from_error() {
        let io = UploadError::io(
            "/builds/a.zip",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(FailureReason::from_error(&io), FailureReason::Unreadable(_)));

        let internal = UploadError::Internal("hash task failed".to_string());
        assert_eq!(
            FailureReason::from_error(&internal),
            FailureReason::Aborted("Internal error: hash task failed".to_string())
        );
    }

    #[test]
    fn test_file_name() {
        let request = UploadRequest::new("/builds/firefox.tar.bz2", "m-c", "ff", HashAlgorithm::Sha256);
        assert_eq!(request.file_name(), "firefox.tar.bz2");
    }
}
