//! Streaming MD5 checksums for local artifact files.
//!
//! The server fingerprints every archived file with MD5, so local digests
//! are computed the same way to stay directly comparable. Files are read
//! in bounded chunks and never loaded whole.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use md5::{Digest, Md5};

/// Default read chunk size: 1 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Compute the MD5 digest of the file at `path`, returned as lowercase hex.
pub fn md5_path(path: &Path) -> io::Result<String> {
    md5_path_chunked(path, DEFAULT_CHUNK_SIZE)
}

/// Like [`md5_path`] with an explicit chunk size. The digest does not
/// depend on the chunk size, only peak memory use does.
pub fn md5_path_chunked(path: &Path, chunk_size: usize) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Md5::new();
    // A zero-length buffer would read nothing and hash nothing.
    let mut buf = vec![0u8; chunk_size.max(1)];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
