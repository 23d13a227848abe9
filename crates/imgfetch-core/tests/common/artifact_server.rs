//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves one static body for every GET, with a configurable status. The body
//! and status can be changed while the server runs, and requests are counted so
//! tests can assert that a cache hit did no network I/O.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

struct State {
    status: u16,
    body: Vec<u8>,
}

/// Handle to a running server. The server thread lives until the process exits.
#[derive(Clone)]
pub struct ArtifactServer {
    base_url: String,
    state: Arc<Mutex<State>>,
    requests: Arc<AtomicUsize>,
}

impl ArtifactServer {
    /// Starts a server answering every GET with `200 OK` and `body`.
    pub fn start(body: Vec<u8>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let state = Arc::new(Mutex::new(State { status: 200, body }));
        let requests = Arc::new(AtomicUsize::new(0));

        let st = Arc::clone(&state);
        let count = Arc::clone(&requests);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let st = Arc::clone(&st);
                let count = Arc::clone(&count);
                thread::spawn(move || handle(stream, &st, &count));
            }
        });

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            state,
            requests,
        }
    }

    /// URL for `path` on this server (e.g. `url("/boxes/image.tar.gz")`).
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn set_status(&self, status: u16) {
        self.state.lock().unwrap().status = status;
    }

    pub fn set_body(&self, body: Vec<u8>) {
        self.state.lock().unwrap().body = body;
    }

    /// Number of requests received so far.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    }
}

fn handle(mut stream: TcpStream, state: &Mutex<State>, requests: &AtomicUsize) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let request = String::from_utf8_lossy(&buf[..n]);
    let method = request.split_whitespace().next().unwrap_or("");
    requests.fetch_add(1, Ordering::SeqCst);

    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(
            b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        );
        return;
    }

    let (status, body) = {
        let st = state.lock().unwrap();
        (st.status, st.body.clone())
    };
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nContent-Type: application/gzip\r\nConnection: close\r\n\r\n",
        status,
        reason(status),
        body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(&body);
}
