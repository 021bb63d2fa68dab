//! Wire structures for the fingerprint endpoint.
//!
//! A registered digest comes back as one JSON object: the build that first
//! archived the file (nullable), the archived file name, and per-job
//! ranges of build numbers that referenced it. Bodies missing the
//! required fields are rejected here, before the resolver looks at them.

use serde::Deserialize;

/// Fingerprint record as served by `/fingerprint/{digest}/api/json`.
#[derive(Debug, Deserialize)]
pub(crate) struct RawFingerprint {
    #[serde(rename = "fileName")]
    pub file_name: String,
    pub hash: String,
    pub original: Option<RawOriginal>,
    #[serde(default)]
    pub usage: Vec<RawUsage>,
}

/// The build that first archived the file.
#[derive(Debug, Deserialize)]
pub(crate) struct RawOriginal {
    pub name: String,
    pub number: u32,
}

/// One referencing job, with the build-number ranges that used the file.
#[derive(Debug, Deserialize)]
pub(crate) struct RawUsage {
    pub name: String,
    #[serde(default)]
    pub ranges: RawRangeSet,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawRangeSet {
    #[serde(default)]
    pub ranges: Vec<RawRange>,
}

/// Half-open build-number range `[start, end)`.
#[derive(Debug, Deserialize)]
pub(crate) struct RawRange {
    pub start: u32,
    pub end: u32,
}

pub(crate) fn parse_fingerprint(body: &[u8]) -> Result<RawFingerprint, serde_json::Error> {
    serde_json::from_slice(body)
}
