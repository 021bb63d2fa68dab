//! Error types for artifact retrieval and verification.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Failure while fetching, saving, or verifying an artifact. Typed so
/// callers can tell a broken artifact apart from a flaky network or a full
/// disk before deciding what to do next.
#[derive(Debug)]
pub enum ArtifactError {
    /// The local file's checksum could not be validated against the
    /// server's fingerprint database. Carries the computed digest and the
    /// server base URL that was consulted.
    Broken { checksum: String, base_url: String },
    /// The server answered with a non-2xx status.
    Http { code: u32, url: String },
    /// The transfer itself failed (connect, timeout, TLS, DNS).
    Curl(curl::Error),
    /// The fingerprint endpoint returned a body of unexpected shape.
    Parse {
        url: String,
        source: serde_json::Error,
    },
    /// The checksum string is not a 32-character hex MD5 digest.
    Digest(String),
    /// A URL could not be parsed or joined into a usable endpoint.
    Url {
        url: String,
        source: url::ParseError,
    },
    /// Reading or writing the local filesystem failed.
    Storage { path: PathBuf, source: io::Error },
}

impl fmt::Display for ArtifactError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactError::Broken { checksum, base_url } => write!(
                f,
                "artifact {} seems to be broken, check {}",
                checksum, base_url
            ),
            ArtifactError::Http { code, url } => write!(f, "GET {} returned HTTP {}", url, code),
            ArtifactError::Curl(e) => write!(f, "transfer failed: {}", e),
            ArtifactError::Parse { url, source } => {
                write!(f, "unexpected fingerprint response from {}: {}", url, source)
            }
            ArtifactError::Digest(d) => write!(f, "not a valid md5 hex digest: {:?}", d),
            ArtifactError::Url { url, source } => write!(f, "invalid URL {}: {}", url, source),
            ArtifactError::Storage { path, source } => {
                write!(f, "storage error at {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ArtifactError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ArtifactError::Curl(e) => Some(e),
            ArtifactError::Parse { source, .. } => Some(source),
            ArtifactError::Url { source, .. } => Some(source),
            ArtifactError::Storage { source, .. } => Some(source),
            ArtifactError::Broken { .. } | ArtifactError::Http { .. } | ArtifactError::Digest(_) => {
                None
            }
        }
    }
}

impl ArtifactError {
    /// Wrap an I/O failure with the path it happened at.
    pub(crate) fn storage(path: &std::path::Path, source: io::Error) -> Self {
        ArtifactError::Storage {
            path: path.to_path_buf(),
            source,
        }
    }
}
