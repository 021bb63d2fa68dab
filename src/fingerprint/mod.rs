//! Fingerprint lookup and validation against the server's digest database.
//!
//! The server keeps one record per MD5 it has ever archived, naming the
//! build that produced the file and every build that referenced it. A
//! digest the server has never seen is a normal outcome (`unknown`), not
//! an error; transport and parse failures are errors.

mod parse;

use url::Url;

use crate::error::ArtifactError;
use crate::requester::Requester;

/// Upper bound on the (job, number) pairs decoded from one record's
/// usage ranges. Entries past the bound are dropped with a warning.
pub const MAX_USAGE_REFERENCES: usize = 10_000;

/// The build that originally archived a fingerprinted file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintOrigin {
    pub job_full_name: String,
    pub number: u32,
    pub file_name: String,
}

/// One build known to have referenced the fingerprinted file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReference {
    pub job_full_name: String,
    pub number: u32,
}

/// Server-side fingerprint record for one checksum. Fetched fresh for
/// every verification, never cached.
#[derive(Debug, Clone)]
pub struct Fingerprint {
    /// Base URL of the server that was consulted.
    pub base_url: String,
    /// The digest this record was looked up under.
    pub checksum: String,
    /// True when the server has no record of the digest.
    pub unknown: bool,
    pub original: Option<FingerprintOrigin>,
    /// Builds that referenced the file, expanded from the server's
    /// per-job ranges into discrete (job, number) pairs. At most
    /// [`MAX_USAGE_REFERENCES`] entries.
    pub usage: Vec<BuildReference>,
}

impl Fingerprint {
    /// Look up `checksum` on the server at `base_url`. A 404 yields an
    /// `unknown` record; any other failure is an error.
    pub fn fetch(
        requester: &dyn Requester,
        base_url: &str,
        checksum: &str,
    ) -> Result<Fingerprint, ArtifactError> {
        if !is_md5_hex(checksum) {
            return Err(ArtifactError::Digest(checksum.to_string()));
        }
        let endpoint = fingerprint_endpoint(base_url, checksum)?;
        tracing::debug!("fetching fingerprint {}", endpoint);
        let response = match requester.get(&endpoint) {
            Ok(response) => response,
            Err(ArtifactError::Http { code: 404, .. }) => {
                tracing::debug!("no fingerprint record for {}", checksum);
                return Ok(Fingerprint {
                    base_url: base_url.to_string(),
                    checksum: checksum.to_string(),
                    unknown: true,
                    original: None,
                    usage: Vec::new(),
                });
            }
            Err(e) => return Err(e),
        };
        let raw = parse::parse_fingerprint(&response.body).map_err(|source| {
            ArtifactError::Parse {
                url: endpoint.clone(),
                source,
            }
        })?;
        Ok(Fingerprint::from_raw(base_url, checksum, raw))
    }

    fn from_raw(base_url: &str, checksum: &str, raw: parse::RawFingerprint) -> Fingerprint {
        let original = raw.original.map(|o| FingerprintOrigin {
            job_full_name: o.name,
            number: o.number,
            file_name: raw.file_name.clone(),
        });
        let mut usage = Vec::new();
        'expand: for entry in raw.usage {
            for range in entry.ranges.ranges {
                // Ranges are half-open [start, end).
                for number in range.start..range.end {
                    if usage.len() == MAX_USAGE_REFERENCES {
                        tracing::warn!(
                            "fingerprint {} lists over {} referencing builds, truncating",
                            checksum,
                            MAX_USAGE_REFERENCES
                        );
                        break 'expand;
                    }
                    usage.push(BuildReference {
                        job_full_name: entry.name.clone(),
                        number,
                    });
                }
            }
        }
        Fingerprint {
            base_url: base_url.to_string(),
            checksum: checksum.to_string(),
            unknown: false,
            original,
            usage,
        }
    }

    /// True only when this record's producer matches the expected file
    /// name, job full name, and build number exactly. Unknown records and
    /// records with no recorded producer never validate.
    pub fn validate_for_build(&self, filename: &str, job_full_name: &str, number: u32) -> bool {
        if self.unknown {
            return false;
        }
        match &self.original {
            Some(origin) => {
                origin.file_name == filename
                    && origin.job_full_name == job_full_name
                    && origin.number == number
            }
            None => false,
        }
    }
}

/// 32 hex characters, the only digest shape the endpoint accepts.
fn is_md5_hex(s: &str) -> bool {
    s.len() == 32 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Endpoint for one digest: `{base}/fingerprint/{digest}/api/json`.
/// Accepts base URLs with or without a trailing slash, including servers
/// mounted under a context path like `https://host/jenkins`.
fn fingerprint_endpoint(base_url: &str, checksum: &str) -> Result<String, ArtifactError> {
    let mut base = Url::parse(base_url).map_err(|source| ArtifactError::Url {
        url: base_url.to_string(),
        source,
    })?;
    // Url::join drops the last path segment unless the base ends in '/'.
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    let endpoint = base
        .join(&format!("fingerprint/{}/api/json", checksum))
        .map_err(|source| ArtifactError::Url {
            url: base_url.to_string(),
            source,
        })?;
    Ok(endpoint.as_str().to_string())
}
