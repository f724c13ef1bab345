//! Blob Transport
//!
//! The HTTP seam of the uploader. [`HttpTransport`] talks to real blob
//! servers; tests substitute scripted implementations.

use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use url::Url;

use super::types::{
    BlobResponse, UploadRequest, BLOBBER_MSG_HEADER, BLOB_FIELD, BLOB_URL_HEADER, BRANCH_FIELD,
};
use crate::config::UploaderConfig;
use crate::credentials::Credentials;
use crate::error::UploadError;

/// Failure to obtain any response for a request
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The local file could not be opened for sending
    #[error("Failed to open {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid blob URL: {0}")]
    Url(#[from] url::ParseError),

    /// Connect, TLS, timeout or protocol failure
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Requests the uploader needs from a blob server
#[async_trait]
pub trait BlobTransport: Send + Sync {
    /// POST the file to `<host>/blobs/<algorithm>/<hash>`
    async fn post_blob(
        &self,
        host: &Url,
        request: &UploadRequest,
        credentials: &Credentials,
    ) -> Result<BlobResponse, TransportError>;

    /// HEAD `url` and return the status code
    async fn head(&self, url: &str) -> Result<u16, TransportError>;
}

/// reqwest-backed transport
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Build a client with the configured timeout and trusted roots
    pub fn new(config: &UploaderConfig) -> Result<Self, UploadError> {
        let mut builder = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("blob-uploader/", env!("CARGO_PKG_VERSION")));

        for cert in config.root_certificates()? {
            builder = builder.add_root_certificate(cert);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    async fn blob_part(request: &UploadRequest) -> Result<Part, TransportError> {
        let file_error = |source| TransportError::File {
            path: request.path.clone(),
            source,
        };

        let file = tokio::fs::File::open(&request.path).await.map_err(file_error)?;
        let len = file.metadata().await.map_err(file_error)?.len();

        let part = Part::stream_with_length(Body::from(file), len)
            .file_name(request.file_name())
            .mime_str("application/octet-stream")?;

        Ok(part)
    }
}

#[async_trait]
impl BlobTransport for HttpTransport {
    async fn post_blob(
        &self,
        host: &Url,
        request: &UploadRequest,
        credentials: &Credentials,
    ) -> Result<BlobResponse, TransportError> {
        let url = request.blob_url(host)?;

        let form = Form::new()
            .part(BLOB_FIELD, Self::blob_part(request).await?)
            .text(BRANCH_FIELD, request.branch.clone());

        tracing::debug!(url = %url, "Posting file");

        let response = self
            .client
            .post(url)
            .basic_auth(&credentials.username, Some(&credentials.password))
            .multipart(form)
            .send()
            .await?;

        Ok(decode_response(response.status().as_u16(), response.headers()))
    }

    async fn head(&self, url: &str) -> Result<u16, TransportError> {
        let response = self.client.head(url).send().await?;
        Ok(response.status().as_u16())
    }
}

/// Pull the blobber headers out of a POST response
pub fn decode_response(status: u16, headers: &HeaderMap) -> BlobResponse {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    BlobResponse {
        status,
        blob_url: header(BLOB_URL_HEADER),
        message: header(BLOBBER_MSG_HEADER),
    }
}
