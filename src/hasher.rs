//! Content Hasher
//!
//! Computes the hex digest a blob server uses to address an upload.
//! Files are streamed in fixed-size blocks so memory use does not grow
//! with file size.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;

use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};

/// Block size used when streaming a file through the digest: 1MB
pub const HASH_BLOCK_SIZE: usize = 1024 * 1024;

/// Digest algorithms understood by the blob servers.
///
/// The lowercase name doubles as the path segment in
/// `/blobs/<algorithm>/<hash>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HashAlgorithm {
    Sha224,
    Sha256,
    Sha384,
    #[default]
    Sha512,
}

impl HashAlgorithm {
    /// Name used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha224 => "sha224",
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
        }
    }

    /// Length of the hex digest this algorithm produces
    pub fn hex_len(&self) -> usize {
        match self {
            Self::Sha224 => 56,
            Self::Sha256 => 64,
            Self::Sha384 => 96,
            Self::Sha512 => 128,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported hash algorithm: {0}")]
pub struct UnknownAlgorithm(pub String);

impl FromStr for HashAlgorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha224" => Ok(Self::Sha224),
            "sha256" => Ok(Self::Sha256),
            "sha384" => Ok(Self::Sha384),
            "sha512" => Ok(Self::Sha512),
            _ => Err(UnknownAlgorithm(s.to_string())),
        }
    }
}

/// Hex digest of everything `reader` yields.
pub fn digest_reader<R: Read>(reader: R, algorithm: HashAlgorithm) -> io::Result<String> {
    match algorithm {
        HashAlgorithm::Sha224 => stream_digest::<Sha224, _>(reader),
        HashAlgorithm::Sha256 => stream_digest::<Sha256, _>(reader),
        HashAlgorithm::Sha384 => stream_digest::<Sha384, _>(reader),
        HashAlgorithm::Sha512 => stream_digest::<Sha512, _>(reader),
    }
}

/// Hex digest of the file at `path`.
pub fn digest_file(path: &Path, algorithm: HashAlgorithm) -> io::Result<String> {
    let file = File::open(path)?;
    let hash = digest_reader(file, algorithm)?;

    tracing::debug!(
        path = %path.display(),
        algorithm = %algorithm,
        hash = %hash,
        "Computed file digest"
    );

    Ok(hash)
}

fn stream_digest<D: Digest, R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = D::new();
    let mut block = vec![0u8; HASH_BLOCK_SIZE];

    loop {
        let n = match reader.read(&mut block) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&block[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}
