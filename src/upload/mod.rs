//! Blob Upload Module
//!
//! Content-addressed uploads to a pool of interchangeable blob servers:
//! - Hosts are shuffled and each is tried at most once per file
//! - 401/403 stops the sequence; any other non-202 status moves on
//! - A 202 is only a success once its `x-blob-url` answers HEAD with 2xx
//!
//! Protocol Flow:
//! 1. `POST <host>/blobs/<algorithm>/<hash>` with `blob` and `branch` fields
//! 2. Server answers 202 with `x-blob-url`, or an error with `x-blobber-msg`
//! 3. Client issues `HEAD <x-blob-url>` to confirm the blob is stored

pub mod directory;
pub mod host_pool;
pub mod transport;
pub mod types;
pub mod uploader;

pub use directory::list_files;
pub use host_pool::HostPool;
pub use transport::{BlobTransport, HttpTransport, TransportError};
pub use types::*;
pub use uploader::{UploadOptions, Uploader};
