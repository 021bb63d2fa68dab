//! Single-stream artifact download: one GET, written straight to a path.
//!
//! The destination is created or truncated up front and filled as bytes
//! arrive. A failed transfer leaves whatever was written; the next save
//! detects the broken copy and replaces it.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::ArtifactError;
use crate::requester::Requester;

/// File sink that keeps the first write error around. Curl itself only
/// reports that the write callback aborted, not what went wrong.
struct FileSink {
    file: File,
    error: Option<io::Error>,
}

impl Write for FileSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.file.write(buf) {
            Ok(n) => Ok(n),
            Err(e) => {
                let reported = io::Error::new(e.kind(), e.to_string());
                if self.error.is_none() {
                    self.error = Some(e);
                }
                Err(reported)
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Download `url` to `dest`, overwriting any existing content, and return
/// `dest`. The containing directory must exist. Nothing is retried here;
/// transport and status failures surface to the caller.
pub fn fetch_to_path(
    requester: &dyn Requester,
    url: &str,
    dest: &Path,
) -> Result<PathBuf, ArtifactError> {
    let file = File::create(dest).map_err(|e| ArtifactError::storage(dest, e))?;
    let mut sink = FileSink { file, error: None };

    let written = match requester.get_to_sink(url, &mut sink) {
        Ok(n) => n,
        Err(e) => {
            if let ArtifactError::Curl(curl_err) = &e {
                if curl_err.is_write_error() {
                    if let Some(source) = sink.error.take() {
                        return Err(ArtifactError::storage(dest, source));
                    }
                }
            }
            return Err(e);
        }
    };
    sink.file
        .flush()
        .map_err(|e| ArtifactError::storage(dest, e))?;

    tracing::debug!(
        "downloaded {} bytes from {} to {}",
        written,
        url,
        dest.display()
    );
    Ok(dest.to_path_buf())
}
