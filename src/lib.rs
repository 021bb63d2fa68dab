//! Client library for downloading and verifying build artifacts archived
//! by a Jenkins-compatible CI server.
//!
//! The flow lives in [`artifact`]: decide whether a local copy is already
//! the genuine article (via [`checksum`] and [`fingerprint`]) and fetch
//! it through [`requester`] and [`downloader`] when it is not.

pub mod artifact;
pub mod checksum;
pub mod config;
pub mod downloader;
pub mod error;
pub mod fingerprint;
pub mod logging;
pub mod requester;
