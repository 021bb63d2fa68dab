//! Build artifacts: files archived by a CI build, addressable by URL.
//!
//! An [`Artifact`] mediates one save operation: decide whether a local
//! copy is already the genuine article, download it when it is not, and
//! verify whatever ends up on disk against the server's fingerprint
//! database.

use std::ffi::OsStr;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use crate::checksum;
use crate::downloader;
use crate::error::ArtifactError;
use crate::fingerprint::Fingerprint;
use crate::requester::Requester;

/// Identity of the build that archived an artifact. A plain value; the
/// artifact holds no live build object, only the three fields needed to
/// ask the server about provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRef {
    /// Full job name, including any folder path.
    pub job_full_name: String,
    pub number: u32,
    /// Base URL of the server that ran the build.
    pub base_url: String,
}

impl BuildRef {
    pub fn new(job_full_name: impl Into<String>, number: u32, base_url: impl Into<String>) -> Self {
        Self {
            job_full_name: job_full_name.into(),
            number,
            base_url: base_url.into(),
        }
    }
}

/// A single file archived by a build. Immutable once constructed; save
/// operations write to the filesystem but never mutate the artifact.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// File name as archived, also the default local name.
    pub filename: String,
    /// Absolute URL the artifact body is served from.
    pub url: String,
    /// Archive-relative path, distinguishing same-named files archived
    /// under different subdirectories of one build.
    pub relative_path: Option<String>,
    /// Producing build, when known. `None` means the origin is untracked:
    /// the file can be downloaded but never verified.
    pub build: Option<BuildRef>,
}

impl Artifact {
    pub fn new(filename: impl Into<String>, url: impl Into<String>, build: Option<BuildRef>) -> Self {
        Self {
            filename: filename.into(),
            url: url.into(),
            relative_path: None,
            build,
        }
    }

    /// Same artifact with the archive-relative path recorded.
    pub fn with_relative_path(mut self, relative_path: impl Into<String>) -> Self {
        self.relative_path = Some(relative_path.into());
        self
    }

    /// Save the artifact to an explicit path and return the path written.
    /// The containing directory must exist.
    ///
    /// An existing file at `fspath` is kept as is, with no download, when
    /// its checksum validates against the server's fingerprint record for
    /// this artifact's build. An existing file that fails that integrity
    /// check is replaced by a fresh download; transport, parse, and
    /// filesystem failures during the check propagate instead. A freshly
    /// downloaded file that fails verification is always an error.
    ///
    /// With `strict_validation`, a digest the server has no record of is
    /// treated as a verification failure even for a fresh download.
    pub fn save(
        &self,
        requester: &dyn Requester,
        fspath: &Path,
        strict_validation: bool,
    ) -> Result<PathBuf, ArtifactError> {
        tracing::info!("saving artifact {} to {}", self.url, fspath.display());
        if fspath.file_name() != Some(OsStr::new(self.filename.as_str())) {
            tracing::warn!(
                "attempt to change the filename of artifact {} on save",
                self.filename
            );
        }

        if fspath.exists() {
            match &self.build {
                Some(build) => {
                    match self.verify_download(requester, build, fspath, strict_validation) {
                        Ok(()) => {
                            tracing::info!(
                                "local copy of {} is already up to date",
                                self.filename
                            );
                            return Ok(fspath.to_path_buf());
                        }
                        Err(ArtifactError::Broken { .. }) => {
                            tracing::warn!(
                                "local copy of {} could not be identified, downloading again",
                                self.filename
                            );
                        }
                        Err(e) => return Err(e),
                    }
                }
                None => {
                    tracing::info!(
                        "{} has no build attached and cannot be checked, downloading again",
                        self.filename
                    );
                }
            }
        } else {
            tracing::info!("local file is missing, downloading new");
        }

        let filepath = downloader::fetch_to_path(requester, &self.url, fspath)?;
        match &self.build {
            Some(build) => self.verify_download(requester, build, &filepath, strict_validation)?,
            None => tracing::debug!(
                "no build identity for {}, skipping post-download verification",
                self.filename
            ),
        }
        Ok(filepath)
    }

    /// Save into `dirpath` under the artifact's own filename. The
    /// directory must already exist.
    pub fn save_to_dir(
        &self,
        requester: &dyn Requester,
        dirpath: &Path,
        strict_validation: bool,
    ) -> Result<PathBuf, ArtifactError> {
        if !dirpath.is_dir() {
            return Err(ArtifactError::storage(
                dirpath,
                io::Error::new(io::ErrorKind::NotFound, "not an existing directory"),
            ));
        }
        self.save(requester, &dirpath.join(&self.filename), strict_validation)
    }

    /// Fetch the artifact body into memory. Meant for small artifacts
    /// such as logs and reports; large ones should go through [`save`].
    ///
    /// [`save`]: Artifact::save
    pub fn fetch_data(&self, requester: &dyn Requester) -> Result<Vec<u8>, ArtifactError> {
        Ok(requester.get(&self.url)?.body)
    }

    /// Checksum the file at `fspath` and check it against the server's
    /// fingerprint record for `build`, the build that archived this
    /// artifact.
    fn verify_download(
        &self,
        requester: &dyn Requester,
        build: &BuildRef,
        fspath: &Path,
        strict_validation: bool,
    ) -> Result<(), ArtifactError> {
        let local_md5 =
            checksum::md5_path(fspath).map_err(|e| ArtifactError::storage(fspath, e))?;
        let fingerprint = Fingerprint::fetch(requester, &build.base_url, &local_md5)?;
        let valid =
            fingerprint.validate_for_build(&self.filename, &build.job_full_name, build.number);
        // strict_validation treats a digest the server has never seen as
        // a failure in its own right.
        if !valid || (fingerprint.unknown && strict_validation) {
            return Err(ArtifactError::Broken {
                checksum: local_md5,
                base_url: build.base_url.clone(),
            });
        }
        tracing::debug!("verified {} as {}", fspath.display(), local_md5);
        Ok(())
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "artifact {} at {}", self.filename, self.url)
    }
}
