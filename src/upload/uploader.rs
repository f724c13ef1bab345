//! Uploader
//!
//! Drives one file through the host failover loop:
//!
//! 1. Hash the file once (unless a hash was supplied)
//! 2. Shuffle a private copy of the host list
//! 3. POST to one host per attempt until a host accepts, the credential is
//!    rejected, or the pool / attempt budget runs out
//! 4. Confirm an accepted blob is reachable at its public URL

use std::path::Path;

use url::Url;

use super::host_pool::HostPool;
use super::transport::{BlobTransport, HttpTransport, TransportError};
use super::types::{
    AttemptRecord, AttemptResult, FailureReason, ResponseClass, UploadOutcome, UploadReport,
    UploadRequest,
};
use crate::config::UploaderConfig;
use crate::credentials::Credentials;
use crate::error::{Result, UploadError};
use crate::hasher::{self, HashAlgorithm};

/// Per-call knobs; defaults come from [`UploaderConfig`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    pub algorithm: HashAlgorithm,
    /// Skip hashing and use this digest
    pub precomputed_hash: Option<String>,
    pub max_attempts: usize,
}

impl From<&UploaderConfig> for UploadOptions {
    fn from(config: &UploaderConfig) -> Self {
        Self {
            algorithm: config.hash_algorithm,
            precomputed_hash: None,
            max_attempts: config.max_attempts,
        }
    }
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self::from(&UploaderConfig::default())
    }
}

pub struct Uploader<T = HttpTransport> {
    transport: T,
    credentials: Credentials,
    config: UploaderConfig,
}

impl Uploader<HttpTransport> {
    /// Uploader speaking HTTP(S) to real blob servers
    pub fn http(credentials: Credentials, config: UploaderConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::new(transport, credentials, config))
    }
}

impl<T: BlobTransport> Uploader<T> {
    pub fn new(transport: T, credentials: Credentials, config: UploaderConfig) -> Self {
        Self {
            transport,
            credentials,
            config,
        }
    }

    pub fn config(&self) -> &UploaderConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Upload with the configured algorithm and attempt budget
    pub async fn upload_file(&self, hosts: &[Url], path: &Path, branch: &str) -> Result<UploadReport> {
        let options = UploadOptions::from(&self.config);
        self.upload_file_with(hosts, path, branch, &options).await
    }

    /// Upload with explicit options, shuffling `hosts` uniformly
    pub async fn upload_file_with(
        &self,
        hosts: &[Url],
        path: &Path,
        branch: &str,
        options: &UploadOptions,
    ) -> Result<UploadReport> {
        let pool = HostPool::shuffled(hosts, &mut rand::thread_rng());
        self.upload_with_pool(pool, path, branch, options).await
    }

    /// Upload drawing hosts from a prepared pool
    pub async fn upload_with_pool(
        &self,
        mut pool: HostPool,
        path: &Path,
        branch: &str,
        options: &UploadOptions,
    ) -> Result<UploadReport> {
        if pool.is_empty() {
            tracing::warn!(path = %path.display(), "No blob hosts given, nothing attempted");
            return Ok(UploadReport::new(
                path,
                UploadOutcome::Failed(FailureReason::NoHosts),
                Vec::new(),
            ));
        }

        let hash = match &options.precomputed_hash {
            Some(hash) => hash.clone(),
            None => hash_file(path, options.algorithm).await?,
        };
        let request = UploadRequest::new(path, branch, hash, options.algorithm);

        tracing::info!(path = %path.display(), "Try to upload file");

        let mut attempts: Vec<AttemptRecord> = Vec::new();
        let mut attempt = 1;

        let outcome = loop {
            if attempt > options.max_attempts {
                break UploadOutcome::Failed(FailureReason::Exhausted {
                    attempts: attempts.len(),
                });
            }
            let Some(host) = pool.next_host() else {
                break UploadOutcome::Failed(FailureReason::Exhausted {
                    attempts: attempts.len(),
                });
            };

            tracing::info!(host = %host, "Picked up host after shuffling");
            tracing::info!(attempt, "POST call the file");

            match self.transport.post_blob(&host, &request, &self.credentials).await {
                Ok(response) => {
                    tracing::info!(host = %host, attempt, status = response.status, "POST response");
                    attempts.push(AttemptRecord {
                        attempt,
                        host: host.clone(),
                        result: AttemptResult::Status(response.status),
                        blob_url: response.blob_url.clone(),
                    });

                    let class = response.classify();
                    if class != ResponseClass::Accepted {
                        tracing::warn!(host = %host, status = response.status, "{}", response.failure_message());
                    }

                    match class {
                        ResponseClass::Accepted => {
                            break self.verify(&request, response.blob_url).await;
                        }
                        ResponseClass::Unauthorized => {
                            tracing::warn!(
                                status = response.status,
                                "Credentials rejected, not trying remaining hosts"
                            );
                            break UploadOutcome::Failed(FailureReason::Unauthorized {
                                status: response.status,
                            });
                        }
                        ResponseClass::Transient => {
                            tracing::warn!("POST call failed. Trying again ...");
                        }
                    }
                }
                Err(TransportError::File { path, source }) => {
                    return Err(UploadError::io(path, source));
                }
                Err(e) => {
                    tracing::warn!(host = %host, attempt, error = %e, "POST call failed. Trying again ...");
                    attempts.push(AttemptRecord {
                        attempt,
                        host: host.clone(),
                        result: AttemptResult::Transport(e.to_string()),
                        blob_url: None,
                    });
                }
            }

            attempt += 1;
        };

        if let UploadOutcome::Failed(reason) = &outcome {
            tracing::warn!(path = %path.display(), reason = %reason, "Uploading file failed!");
        }

        Ok(UploadReport::new(path, outcome, attempts))
    }

    /// Check an accepted blob is actually served from its public URL
    async fn verify(&self, request: &UploadRequest, blob_url: Option<String>) -> UploadOutcome {
        let Some(blob_url) = blob_url else {
            tracing::warn!("Blob resource URL not found in response.");
            return UploadOutcome::Failed(FailureReason::MissingBlobUrl);
        };

        match self.transport.head(&blob_url).await {
            Ok(status) if (200..300).contains(&status) => {
                tracing::info!(
                    path = %request.path.display(),
                    blob_url = %blob_url,
                    "Uploaded file"
                );
                UploadOutcome::Succeeded { blob_url }
            }
            Ok(status) => {
                tracing::warn!(
                    blob_url = %blob_url,
                    status,
                    "Uploaded file on blobserver but failed to find it in storage."
                );
                UploadOutcome::Failed(FailureReason::NotRetrievable {
                    blob_url,
                    status: Some(status),
                })
            }
            Err(e) => {
                tracing::warn!(blob_url = %blob_url, error = %e, "Blob URL check failed");
                UploadOutcome::Failed(FailureReason::NotRetrievable {
                    blob_url,
                    status: None,
                })
            }
        }
    }
}

async fn hash_file(path: &Path, algorithm: HashAlgorithm) -> Result<String> {
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || hasher::digest_file(&owned, algorithm))
        .await
        .map_err(|e| UploadError::Internal(format!("hash task failed: {}", e)))?
        .map_err(|e| UploadError::io(path, e))
}


#[cfg(test)]
mod tests {
    use super::testing::MockTransport;
    use super::*;
    use crate::upload::types::BlobResponse;
    use std::collections::HashSet;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn hosts(n: usize) -> Vec<Url> {
        (1..=n)
            .map(|i| Url::parse(&format!("https://h{}.example.com", i)).unwrap())
            .collect()
    }

    fn artifact() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"artifact bytes").unwrap();
        file.flush().unwrap();
        file
    }

    fn uploader(transport: MockTransport) -> Uploader<MockTransport> {
        Uploader::new(
            transport,
            Credentials::new("builder", "secret"),
            UploaderConfig::default(),
        )
    }

    fn options(max_attempts: usize) -> UploadOptions {
        UploadOptions {
            max_attempts,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_failover_then_success() {
        let hosts = hosts(3);
        let transport = MockTransport::new()
            .on_post(&hosts[0], BlobResponse::new(500))
            .on_post(&hosts[1], BlobResponse::new(202).with_blob_url("https://cdn/x"))
            .on_head("https://cdn/x", 200);
        let uploader = uploader(transport);
        let file = artifact();

        let report = uploader
            .upload_with_pool(HostPool::in_order(&hosts), file.path(), "try", &options(10))
            .await
            .unwrap();

        assert_eq!(
            report.outcome,
            UploadOutcome::Succeeded {
                blob_url: "https://cdn/x".to_string()
            }
        );
        assert_eq!(report.attempts.len(), 2);
        assert_eq!(uploader.transport.posted_hosts(), hosts[..2].to_vec());
        assert_eq!(*uploader.transport.headed.lock().unwrap(), vec!["https://cdn/x"]);
    }

    #[tokio::test]
    async fn test_unauthorized_stops_immediately() {
        for status in [401, 403] {
            let hosts = hosts(5);
            let transport = MockTransport::new().on_any_post(BlobResponse::new(status));
            let uploader = uploader(transport);
            let file = artifact();

            let report = uploader
                .upload_file_with(&hosts, file.path(), "try", &options(10))
                .await
                .unwrap();

            assert_eq!(
                report.outcome,
                UploadOutcome::Failed(FailureReason::Unauthorized { status })
            );
            assert_eq!(uploader.transport.post_count(), 1);
        }
    }

    #[tokio::test]
    async fn test_accepted_without_blob_url() {
        let hosts = hosts(4);
        let transport = MockTransport::new().on_any_post(BlobResponse::new(202));
        let uploader = uploader(transport);
        let file = artifact();

        let report = uploader.upload_file(&hosts, file.path(), "try").await.unwrap();

        assert_eq!(report.outcome, UploadOutcome::Failed(FailureReason::MissingBlobUrl));
        assert_eq!(uploader.transport.post_count(), 1);
        assert!(uploader.transport.headed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_accepted_but_not_retrievable() {
        let hosts = hosts(4);
        let transport = MockTransport::new()
            .on_any_post(BlobResponse::new(202).with_blob_url("https://cdn/missing"))
            .on_head("https://cdn/missing", 404);
        let uploader = uploader(transport);
        let file = artifact();

        let report = uploader.upload_file(&hosts, file.path(), "try").await.unwrap();

        assert_eq!(
            report.outcome,
            UploadOutcome::Failed(FailureReason::NotRetrievable {
                blob_url: "https://cdn/missing".to_string(),
                status: Some(404),
            })
        );
        assert_eq!(uploader.transport.post_count(), 1);
    }

    #[tokio::test]
    async fn test_attempt_budget_caps_attempts() {
        let hosts = hosts(8);
        let transport = MockTransport::new().on_any_post(BlobResponse::new(500));
        let uploader = uploader(transport);
        let file = artifact();

        let report = uploader
            .upload_file_with(&hosts, file.path(), "try", &options(3))
            .await
            .unwrap();

        assert_eq!(
            report.outcome,
            UploadOutcome::Failed(FailureReason::Exhausted { attempts: 3 })
        );
        assert_eq!(uploader.transport.post_count(), 3);
    }

    #[tokio::test]
    async fn test_pool_exhaustion_tries_each_host_once() {
        let hosts = hosts(4);
        let transport = MockTransport::new().on_any_post(BlobResponse::new(503));
        let uploader = uploader(transport);
        let file = artifact();

        let report = uploader
            .upload_file_with(&hosts, file.path(), "try", &options(10))
            .await
            .unwrap();

        assert!(!report.is_success());
        let tried: HashSet<Url> = uploader.transport.posted_hosts().into_iter().collect();
        assert_eq!(uploader.transport.post_count(), 4);
        assert_eq!(tried, hosts.into_iter().collect::<HashSet<_>>());
    }

    #[tokio::test]
    async fn test_transport_error_moves_to_next_host() {
        let hosts = hosts(2);
        let transport = MockTransport::new()
            .unreachable(&hosts[0])
            .on_post(&hosts[1], BlobResponse::new(202).with_blob_url("https://cdn/y"))
            .on_head("https://cdn/y", 200);
        let uploader = uploader(transport);
        let file = artifact();

        let report = uploader
            .upload_with_pool(HostPool::in_order(&hosts), file.path(), "try", &options(10))
            .await
            .unwrap();

        assert!(report.is_success());
        assert!(matches!(report.attempts[0].result, AttemptResult::Transport(_)));
        assert_eq!(report.attempts[1].result, AttemptResult::Status(202));
    }

    #[tokio::test]
    async fn test_no_hosts() {
        let uploader = uploader(MockTransport::new());
        let dir = tempfile::tempdir().unwrap();

        // No hashing happens, so a missing file is not an error here
        let report = uploader
            .upload_file(&[], &dir.path().join("missing"), "try")
            .await
            .unwrap();

        assert_eq!(report.outcome, UploadOutcome::Failed(FailureReason::NoHosts));
        assert!(report.attempts.is_empty());
        assert_eq!(uploader.transport.post_count(), 0);
    }

    #[tokio::test]
    async fn test_unreadable_file_fails_before_network() {
        let uploader = uploader(MockTransport::new());
        let dir = tempfile::tempdir().unwrap();

        let result = uploader
            .upload_file(&hosts(3), &dir.path().join("missing"), "try")
            .await;

        assert!(matches!(result, Err(UploadError::Io { .. })));
        assert_eq!(uploader.transport.post_count(), 0);
    }

    #[tokio::test]
    async fn test_hash_computed_once_and_reused() {
        let hosts = hosts(3);
        let transport = MockTransport::new().on_any_post(BlobResponse::new(500));
        let uploader = uploader(transport);
        let file = artifact();

        uploader
            .upload_file_with(&hosts, file.path(), "m-c", &options(10))
            .await
            .unwrap();

        let expected = hasher::digest_file(file.path(), HashAlgorithm::Sha512).unwrap();
        let posted = uploader.transport.posted.lock().unwrap();
        assert_eq!(posted.len(), 3);
        for (_, request) in posted.iter() {
            assert_eq!(request.hash, expected);
            assert_eq!(request.branch, "m-c");
            assert_eq!(request.algorithm, HashAlgorithm::Sha512);
        }
    }

    #[tokio::test]
    async fn test_precomputed_hash_used() {
        let hosts = hosts(1);
        let transport = MockTransport::new().on_any_post(BlobResponse::new(500));
        let uploader = uploader(transport);
        let file = artifact();

        let options = UploadOptions {
            algorithm: HashAlgorithm::Sha256,
            precomputed_hash: Some("deadbeef".to_string()),
            max_attempts: 10,
        };
        uploader
            .upload_file_with(&hosts, file.path(), "try", &options)
            .await
            .unwrap();

        let posted = uploader.transport.posted.lock().unwrap();
        assert_eq!(posted[0].1.hash, "deadbeef");
        assert_eq!(posted[0].1.algorithm, HashAlgorithm::Sha256);
    }
}
