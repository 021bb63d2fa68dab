//! Minimal HTTP/1.1 server posing as a CI master for integration tests.
//!
//! Serves registered artifact bodies and fingerprint records; digests
//! with no registered record get a 404, like the real server. GETs are
//! counted per path so tests can assert how many downloads happened.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Clone)]
enum Route {
    Body(Vec<u8>),
    Status(u32),
}

#[derive(Default)]
struct State {
    routes: HashMap<String, Route>,
    hits: HashMap<String, u32>,
}

/// Handle to a running fake server.
pub struct FakeJenkins {
    pub base_url: String,
    state: Arc<Mutex<State>>,
}

impl FakeJenkins {
    /// Start the server on an ephemeral port. It serves from background
    /// threads until the test process exits.
    pub fn start() -> FakeJenkins {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fake server");
        let port = listener.local_addr().expect("local addr").port();
        let state: Arc<Mutex<State>> = Arc::default();

        let accept_state = Arc::clone(&state);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let conn_state = Arc::clone(&accept_state);
                thread::spawn(move || handle(stream, &conn_state));
            }
        });

        FakeJenkins {
            base_url: format!("http://127.0.0.1:{}", port),
            state,
        }
    }

    /// Absolute URL for a server path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Register an artifact body under an absolute path such as
    /// `/job/myjob/5/artifact/build.log`.
    pub fn put_artifact(&self, path: &str, body: &[u8]) {
        self.put(path, Route::Body(body.to_vec()));
    }

    /// Register a fingerprint record for `digest`. Unregistered digests
    /// answer 404.
    pub fn put_fingerprint(&self, digest: &str, json: &str) {
        self.put(
            &format!("/fingerprint/{}/api/json", digest),
            Route::Body(json.as_bytes().to_vec()),
        );
    }

    /// Make `path` answer with a bare status code and empty body.
    pub fn put_status(&self, path: &str, code: u32) {
        self.put(path, Route::Status(code));
    }

    /// Number of GETs served for `path` so far.
    pub fn hits(&self, path: &str) -> u32 {
        *self
            .state
            .lock()
            .unwrap()
            .hits
            .get(path)
            .unwrap_or(&0)
    }

    fn put(&self, path: &str, route: Route) {
        self.state
            .lock()
            .unwrap()
            .routes
            .insert(path.to_string(), route);
    }
}

fn handle(mut stream: TcpStream, state: &Mutex<State>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));

    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let (method, path) = match parse_request_line(request) {
        Some(parts) => parts,
        None => return,
    };
    if !method.eq_ignore_ascii_case("GET") {
        respond_status(&mut stream, 405);
        return;
    }

    let route = {
        let mut st = state.lock().unwrap();
        *st.hits.entry(path.to_string()).or_insert(0) += 1;
        st.routes.get(path).cloned()
    };
    match route {
        Some(Route::Body(body)) => {
            let header = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = stream.write_all(header.as_bytes());
            let _ = stream.write_all(&body);
        }
        Some(Route::Status(code)) => respond_status(&mut stream, code),
        None => respond_status(&mut stream, 404),
    }
}

fn respond_status(stream: &mut TcpStream, code: u32) {
    let reason = match code {
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        _ => "Error",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        code, reason
    );
    let _ = stream.write_all(response.as_bytes());
}

fn parse_request_line(request: &str) -> Option<(&str, &str)> {
    let line = request.lines().next()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?;
    let target = parts.next()?;
    // The client never sends a query string, but strip one anyway.
    let path = target.split('?').next().unwrap_or(target);
    Some((method, path))
}
