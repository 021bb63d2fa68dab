//! HTTP transport: a small trait the artifact subsystem talks through,
//! plus the blocking libcurl implementation used against real servers.
//!
//! Everything the subsystem needs is a GET that fails on non-2xx status:
//! buffered for fingerprint lookups, streamed for artifact bodies.

use std::io::Write;
use std::time::Duration;

use curl::easy::{Auth, Easy};

use crate::config::ClientConfig;
use crate::error::ArtifactError;

/// Receive-buffer size for streamed GETs: 1 KiB, keeping memory bounded
/// regardless of artifact size.
pub const DEFAULT_STREAM_CHUNK: usize = 1024;

/// A buffered HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u32,
    pub body: Vec<u8>,
}

/// GET access to the CI server.
///
/// Implementations must fail with [`ArtifactError::Http`] on any non-2xx
/// status so callers never mistake an error page for a payload. The trait
/// is object-safe; tests substitute a scripted implementation.
pub trait Requester {
    /// Fetch `url` and return the whole body in memory.
    fn get(&self, url: &str) -> Result<Response, ArtifactError>;

    /// Fetch `url`, streaming the body into `sink` chunk by chunk, and
    /// return the number of bytes handed to the sink. Bytes already
    /// written stay in the sink if the transfer fails partway.
    fn get_to_sink(&self, url: &str, sink: &mut dyn Write) -> Result<u64, ArtifactError>;
}

/// Blocking libcurl-backed [`Requester`].
#[derive(Debug, Clone)]
pub struct CurlRequester {
    connect_timeout: Duration,
    timeout: Duration,
    ssl_verify: bool,
    auth: Option<(String, String)>,
    stream_chunk: usize,
}

impl Default for CurlRequester {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            timeout: Duration::from_secs(30),
            ssl_verify: true,
            auth: None,
            stream_chunk: DEFAULT_STREAM_CHUNK,
        }
    }
}

impl CurlRequester {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a requester from loaded [`ClientConfig`] settings.
    pub fn from_config(cfg: &ClientConfig) -> Self {
        let mut requester = CurlRequester::new()
            .with_connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
            .with_timeout(Duration::from_secs(cfg.timeout_secs))
            .with_ssl_verify(cfg.ssl_verify)
            .with_stream_chunk(cfg.download_chunk_bytes.unwrap_or(DEFAULT_STREAM_CHUNK));
        if let (Some(user), Some(token)) = (&cfg.username, &cfg.api_token) {
            requester = requester.with_auth(user, token);
        }
        requester
    }

    /// HTTP basic auth (server username and API token).
    pub fn with_auth(mut self, username: impl Into<String>, api_token: impl Into<String>) -> Self {
        self.auth = Some((username.into(), api_token.into()));
        self
    }

    /// Verify TLS certificates (on by default). Disable only for servers
    /// with self-signed certificates.
    pub fn with_ssl_verify(mut self, verify: bool) -> Self {
        self.ssl_verify = verify;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Deadline for buffered requests; streamed downloads use a stall
    /// cutoff instead.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Receive-buffer size for streamed downloads.
    pub fn with_stream_chunk(mut self, bytes: usize) -> Self {
        self.stream_chunk = bytes;
        self
    }

    fn prepare(&self, url: &str) -> Result<Easy, ArtifactError> {
        let mut easy = Easy::new();
        easy.url(url).map_err(ArtifactError::Curl)?;
        easy.follow_location(true).map_err(ArtifactError::Curl)?;
        easy.max_redirections(10).map_err(ArtifactError::Curl)?;
        easy.connect_timeout(self.connect_timeout)
            .map_err(ArtifactError::Curl)?;
        if !self.ssl_verify {
            easy.ssl_verify_peer(false).map_err(ArtifactError::Curl)?;
            easy.ssl_verify_host(false).map_err(ArtifactError::Curl)?;
        }
        if let Some((user, token)) = &self.auth {
            easy.username(user).map_err(ArtifactError::Curl)?;
            easy.password(token).map_err(ArtifactError::Curl)?;
            let mut auth = Auth::new();
            auth.basic(true);
            easy.http_auth(&auth).map_err(ArtifactError::Curl)?;
        }
        Ok(easy)
    }
}

impl Requester for CurlRequester {
    fn get(&self, url: &str) -> Result<Response, ArtifactError> {
        let mut easy = self.prepare(url)?;
        easy.timeout(self.timeout).map_err(ArtifactError::Curl)?;

        let mut body: Vec<u8> = Vec::new();
        {
            let mut transfer = easy.transfer();
            transfer
                .write_function(|data| {
                    body.extend_from_slice(data);
                    Ok(data.len())
                })
                .map_err(ArtifactError::Curl)?;
            transfer.perform().map_err(ArtifactError::Curl)?;
        }

        let code = easy.response_code().map_err(ArtifactError::Curl)?;
        if code < 200 || code >= 300 {
            return Err(ArtifactError::Http {
                code,
                url: url.to_string(),
            });
        }
        Ok(Response { status: code, body })
    }

    fn get_to_sink(&self, url: &str, sink: &mut dyn Write) -> Result<u64, ArtifactError> {
        let mut easy = self.prepare(url)?;
        easy.buffer_size(self.stream_chunk)
            .map_err(ArtifactError::Curl)?;
        // Stall cutoff rather than a wall-clock deadline: a large artifact
        // on a slow link is fine, a dead connection is not.
        easy.low_speed_limit(1024).map_err(ArtifactError::Curl)?;
        easy.low_speed_time(Duration::from_secs(60))
            .map_err(ArtifactError::Curl)?;
        easy.timeout(Duration::from_secs(3600))
            .map_err(ArtifactError::Curl)?;

        let mut written: u64 = 0;
        {
            let mut transfer = easy.transfer();
            transfer
                .write_function(|data| match sink.write_all(data) {
                    Ok(()) => {
                        written += data.len() as u64;
                        Ok(data.len())
                    }
                    Err(e) => {
                        tracing::warn!("sink write failed: {}", e);
                        // Returning a short count makes curl abort the
                        // transfer with a write error.
                        Ok(0)
                    }
                })
                .map_err(ArtifactError::Curl)?;
            transfer.perform().map_err(ArtifactError::Curl)?;
        }

        let code = easy.response_code().map_err(ArtifactError::Curl)?;
        if code < 200 || code >= 300 {
            return Err(ArtifactError::Http {
                code,
                url: url.to_string(),
            });
        }
        Ok(written)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted requester for exercising save flows without a server.

    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::io::Write;
    use std::path::PathBuf;

    use super::{Requester, Response};
    use crate::error::ArtifactError;

    enum Scripted {
        Body(Vec<u8>),
        Status(u32),
    }

    /// Serves canned bodies or statuses per URL and counts buffered
    /// lookups and streamed downloads. A request for an unscripted URL
    /// fails the test on the spot.
    #[derive(Default)]
    pub(crate) struct ScriptedRequester {
        routes: RefCell<HashMap<String, Scripted>>,
        pub(crate) lookups: Cell<u32>,
        pub(crate) downloads: Cell<u32>,
    }

    impl ScriptedRequester {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn body(self, url: &str, bytes: impl Into<Vec<u8>>) -> Self {
            self.routes
                .borrow_mut()
                .insert(url.to_string(), Scripted::Body(bytes.into()));
            self
        }

        pub(crate) fn status(self, url: &str, code: u32) -> Self {
            self.routes
                .borrow_mut()
                .insert(url.to_string(), Scripted::Status(code));
            self
        }

        fn lookup(&self, url: &str) -> Result<Vec<u8>, ArtifactError> {
            match self.routes.borrow().get(url) {
                Some(Scripted::Body(bytes)) => Ok(bytes.clone()),
                Some(Scripted::Status(code)) => Err(ArtifactError::Http {
                    code: *code,
                    url: url.to_string(),
                }),
                None => panic!("unscripted URL requested: {url}"),
            }
        }
    }

    impl Requester for ScriptedRequester {
        fn get(&self, url: &str) -> Result<Response, ArtifactError> {
            self.lookups.set(self.lookups.get() + 1);
            let body = self.lookup(url)?;
            Ok(Response { status: 200, body })
        }

        fn get_to_sink(&self, url: &str, sink: &mut dyn Write) -> Result<u64, ArtifactError> {
            self.downloads.set(self.downloads.get() + 1);
            let body = self.lookup(url)?;
            sink.write_all(&body)
                .map_err(|e| ArtifactError::storage(&PathBuf::from("<sink>"), e))?;
            Ok(body.len() as u64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_requester_settings() {
        let requester = CurlRequester::new();
        assert_eq!(requester.connect_timeout, Duration::from_secs(15));
        assert_eq!(requester.timeout, Duration::from_secs(30));
        assert!(requester.ssl_verify);
        assert!(requester.auth.is_none());
        assert_eq!(requester.stream_chunk, DEFAULT_STREAM_CHUNK);
    }

    #[test]
    fn from_config_applies_settings() {
        let cfg = ClientConfig {
            base_url: "https://ci.example.com".to_string(),
            username: Some("jenkins".to_string()),
            api_token: Some("t0ken".to_string()),
            connect_timeout_secs: 5,
            timeout_secs: 120,
            ssl_verify: false,
            download_chunk_bytes: Some(4096),
        };
        let requester = CurlRequester::from_config(&cfg);
        assert_eq!(requester.connect_timeout, Duration::from_secs(5));
        assert_eq!(requester.timeout, Duration::from_secs(120));
        assert!(!requester.ssl_verify);
        assert_eq!(
            requester.auth,
            Some(("jenkins".to_string(), "t0ken".to_string()))
        );
        assert_eq!(requester.stream_chunk, 4096);
    }

    #[test]
    fn username_without_token_stays_anonymous() {
        let cfg = ClientConfig {
            username: Some("jenkins".to_string()),
            ..ClientConfig::default()
        };
        let requester = CurlRequester::from_config(&cfg);
        assert!(requester.auth.is_none());
    }
}
