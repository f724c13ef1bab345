//! Directory uploads
//!
//! Uploads every regular file directly inside a directory, one after the
//! other. Subdirectories are not entered.

use std::path::{Path, PathBuf};

use url::Url;

use super::transport::BlobTransport;
use super::types::{FailureReason, UploadOutcome, UploadReport};
use super::uploader::Uploader;
use crate::error::{Result, UploadError};

impl<T: BlobTransport> Uploader<T> {
    /// Upload each file in `dir` with its own attempt budget and shuffle.
    ///
    /// A file whose upload errors out is reported as failed and the walk
    /// moves on; only failing to list `dir` itself is an error.
    pub async fn upload_dir(&self, hosts: &[Url], dir: &Path, branch: &str) -> Result<Vec<UploadReport>> {
        tracing::info!(dir = %dir.display(), "Open directory for files ...");
        let files = list_files(dir).await?;

        tracing::debug!(count = files.len(), "Go through all files in directory");
        let mut reports = Vec::with_capacity(files.len());

        for path in files {
            let report = match self.upload_file(hosts, &path, branch).await {
                Ok(report) => report,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping file");
                    UploadReport::new(
                        &path,
                        UploadOutcome::Failed(FailureReason::from_error(&e)),
                        Vec::new(),
                    )
                }
            };
            reports.push(report);
        }

        let succeeded = reports.iter().filter(|r| r.is_success()).count();
        tracing::info!(
            dir = %dir.display(),
            succeeded,
            failed = reports.len() - succeeded,
            "Iteration through files over."
        );

        Ok(reports)
    }
}

/// Regular files directly inside `dir`, sorted by path
pub async fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| UploadError::io(dir, e))?;

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|e| UploadError::io(dir, e))? {
        let path = entry.path();
        // Follows symlinks, so a link to a file counts as a file
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => files.push(path),
            Ok(_) => tracing::debug!(path = %path.display(), "Skipping non-file entry"),
            Err(e) => tracing::debug!(path = %path.display(), error = %e, "Skipping unreadable entry"),
        }
    }

    files.sort();
    Ok(files)
}
