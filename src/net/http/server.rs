//! In-process HTTP test server.
//!
//! Every well-formed request is captured (method, path, headers, body) into
//! a bounded drop-oldest queue and answered with the current static
//! response. Connections are served one request each with
//! `Connection: close`.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};

use super::queue::{RequestQueue, Wait};
use super::Headers;
use crate::config::{self, HttpConfig};
use crate::net::{create_listener, resolve, wake_acceptor};
use crate::status::{codes, FatResult, Failure};

const MAX_HEAD_BYTES: usize = 64 * 1024;

/// A captured request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub headers: Headers,
    pub body: Vec<u8>,
}

/// What the server answers with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticResponse {
    pub status: u16,
    pub body: Vec<u8>,
    pub content_type: String,
}

impl Default for StaticResponse {
    fn default() -> Self {
        Self {
            status: 200,
            body: Vec::new(),
            content_type: String::new(),
        }
    }
}

struct Shared {
    queue: RequestQueue<HttpRequest>,
    response: RwLock<StaticResponse>,
    shutdown: AtomicBool,
    read_timeout: Option<Duration>,
    max_body: usize,
}

/// A running test server.
pub struct HttpServer {
    addr: SocketAddr,
    shared: Arc<Shared>,
    acceptor: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for HttpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpServer").field("addr", &self.addr).finish_non_exhaustive()
    }
}

impl HttpServer {
    /// Bind `addr` using the process configuration.
    pub fn bind(addr: &str) -> FatResult<Self> {
        Self::bind_with(addr, &config::global().http)
    }

    pub fn bind_with(addr: &str, settings: &HttpConfig) -> FatResult<Self> {
        let target = resolve(addr).map_err(|f| Failure::syntax(codes::HTTP, f.message))?;
        let listener = create_listener(target, codes::HTTP)?;
        let local = listener
            .local_addr()
            .map_err(|e| Failure::other(codes::HTTP, e.to_string()))?;

        let shared = Arc::new(Shared {
            queue: RequestQueue::new(settings.queue_capacity),
            response: RwLock::new(StaticResponse::default()),
            shutdown: AtomicBool::new(false),
            read_timeout: match settings.read_timeout_ms {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            },
            max_body: settings.max_body_bytes,
        });

        let accept_shared = Arc::clone(&shared);
        let acceptor = std::thread::Builder::new()
            .name(format!("fatstd-http-{}", local.port()))
            .spawn(move || accept_loop(listener, accept_shared))
            .map_err(|e| Failure::other(codes::HTTP, format!("spawn acceptor: {}", e)))?;

        tracing::debug!(addr = %local, capacity = settings.queue_capacity, "http test server started");
        Ok(Self {
            addr: local,
            shared,
            acceptor: Mutex::new(Some(acceptor)),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn set_static_response(&self, status: u16, body: &[u8], content_type: &str) {
        *self.shared.response.write() = StaticResponse {
            status,
            body: body.to_vec(),
            content_type: content_type.to_string(),
        };
    }

    pub fn static_response(&self) -> StaticResponse {
        self.shared.response.read().clone()
    }

    /// Next captured request. Nothing within the timeout is EOF.
    pub fn next_request(&self, timeout_ms: i64) -> FatResult<HttpRequest> {
        self.shared
            .queue
            .poll(Wait::from_millis(timeout_ms))
            .ok_or_else(Failure::eof)
    }

    /// Requests evicted because the queue was full.
    pub fn dropped_requests(&self) -> u64 {
        self.shared.queue.dropped()
    }

    /// Stop accepting connections. Pollers already blocked are not woken.
    pub fn close(&self) -> FatResult<()> {
        if self.shared.shutdown.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        wake_acceptor(self.addr);
        if let Some(handle) = self.acceptor.lock().take() {
            if handle.join().is_err() {
                return Err(Failure::other(codes::HTTP, "acceptor thread panicked"));
            }
        }
        tracing::debug!(addr = %self.addr, "http test server closed");
        Ok(())
    }
}

impl Drop for HttpServer {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

fn accept_loop(listener: TcpListener, shared: Arc<Shared>) {
    for stream in listener.incoming() {
        if shared.shutdown.load(Ordering::SeqCst) {
            break;
        }
        match stream {
            Ok(stream) => {
                let conn_shared = Arc::clone(&shared);
                let spawned = std::thread::Builder::new()
                    .name("fatstd-http-conn".to_string())
                    .spawn(move || handle_connection(stream, &conn_shared));
                if let Err(e) = spawned {
                    tracing::warn!(error = %e, "failed to spawn connection handler");
                }
            }
            Err(e) => tracing::warn!(error = %e, "accept failed"),
        }
    }
}

fn handle_connection(mut stream: TcpStream, shared: &Shared) {
    if let Err(e) = stream.set_read_timeout(shared.read_timeout) {
        tracing::warn!(error = %e, "set_read_timeout failed");
    }

    let request = match read_request(&mut stream, shared.max_body) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!(error = %e, "rejecting malformed request");
            let _ = write_response(&mut stream, "GET", 400, b"Bad Request", "text/plain; charset=utf-8");
            return;
        }
    };
    let method = request.method.clone();
    tracing::trace!(method = %request.method, path = %request.path, "request captured");
    shared.queue.push(request);

    let response = shared.response.read().clone();
    if let Err(e) = write_response(
        &mut stream,
        &method,
        response.status,
        &response.body,
        &response.content_type,
    ) {
        tracing::debug!(error = %e, "failed to write response");
    }
}

fn invalid(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

fn read_request(stream: &mut TcpStream, max_body: usize) -> io::Result<HttpRequest> {
    let mut reader = BufReader::new(&*stream);
    let mut head_bytes = 0usize;

    let mut request_line = String::new();
    head_bytes += reader.read_line(&mut request_line)?;
    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() != 3 || !parts[2].starts_with("HTTP/") {
        return Err(invalid("invalid request line"));
    }
    let method = parts[0].to_string();
    let path = request_path(parts[1]);

    let mut headers = Headers::new();
    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line)?;
        if n == 0 {
            return Err(invalid("connection closed inside headers"));
        }
        head_bytes += n;
        if head_bytes > MAX_HEAD_BYTES {
            return Err(invalid("request head too large"));
        }
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            break;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| invalid("malformed header line"))?;
        headers.push(name.trim(), value.trim());
    }

    if headers
        .get("Expect")
        .is_some_and(|v| v.eq_ignore_ascii_case("100-continue"))
    {
        let mut w: &TcpStream = reader.get_ref();
        w.write_all(b"HTTP/1.1 100 Continue\r\n\r\n")?;
    }

    let chunked = headers
        .get("Transfer-Encoding")
        .is_some_and(|v| v.to_ascii_lowercase().contains("chunked"));
    let body = if chunked {
        read_chunked(&mut reader, max_body)?
    } else {
        let length: usize = match headers.get("Content-Length") {
            Some(v) => v.trim().parse().map_err(|_| invalid("bad content-length"))?,
            None => 0,
        };
        if length > max_body {
            return Err(invalid("request body too large"));
        }
        let mut body = vec![0u8; length];
        reader.read_exact(&mut body)?;
        body
    };

    Ok(HttpRequest {
        method,
        path,
        headers,
        body,
    })
}

fn read_chunked(reader: &mut impl BufRead, max_body: usize) -> io::Result<Vec<u8>> {
    let mut body = Vec::new();
    loop {
        let mut size_line = String::new();
        reader.read_line(&mut size_line)?;
        let size_text = size_line.trim().split(';').next().unwrap_or("");
        let size = usize::from_str_radix(size_text, 16).map_err(|_| invalid("bad chunk size"))?;
        if size == 0 {
            // trailers end with an empty line
            loop {
                let mut trailer = String::new();
                if reader.read_line(&mut trailer)? == 0 || trailer.trim().is_empty() {
                    return Ok(body);
                }
            }
        }
        if body.len() + size > max_body {
            return Err(invalid("request body too large"));
        }
        let start = body.len();
        body.resize(start + size, 0);
        reader.read_exact(&mut body[start..])?;
        let mut crlf = [0u8; 2];
        reader.read_exact(&mut crlf)?;
    }
}

/// Path component of a request target, query removed and percent-decoded.
fn request_path(target: &str) -> String {
    let without_scheme = match target.find("://") {
        Some(i) => {
            let rest = &target[i + 3..];
            rest.find('/').map_or("/", |j| &rest[j..])
        }
        None => target,
    };
    let raw = without_scheme
        .split(['?', '#'])
        .next()
        .unwrap_or(without_scheme);
    percent_decode(raw)
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(v) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(v);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        100 => "Continue",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        418 => "I'm a teapot",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Status",
    }
}

fn sniff_content_type(body: &[u8]) -> &'static str {
    if std::str::from_utf8(body).is_ok() {
        "text/plain; charset=utf-8"
    } else {
        "application/octet-stream"
    }
}

fn write_response(
    stream: &mut TcpStream,
    method: &str,
    status: u16,
    body: &[u8],
    content_type: &str,
) -> io::Result<()> {
    let content_type = if content_type.is_empty() && !body.is_empty() {
        sniff_content_type(body)
    } else {
        content_type
    };
    let mut head = format!("HTTP/1.1 {} {}\r\n", status, reason_phrase(status));
    if !content_type.is_empty() {
        head.push_str(&format!("Content-Type: {}\r\n", content_type));
    }
    head.push_str(&format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    ));
    stream.write_all(head.as_bytes())?;
    if method != "HEAD" {
        stream.write_all(body)?;
    }
    stream.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_exchange(addr: SocketAddr, request: &[u8]) -> String {
        let mut conn = TcpStream::connect(addr).unwrap();
        conn.write_all(request).unwrap();
        let mut out = String::new();
        conn.read_to_string(&mut out).unwrap();
        out
    }

    fn small_config(capacity: usize) -> HttpConfig {
        HttpConfig {
            queue_capacity: capacity,
            ..HttpConfig::default()
        }
    }

    #[test]
    fn test_request_path() {
        assert_eq!(request_path("/a/b?x=1"), "/a/b");
        assert_eq!(request_path("/with%20space"), "/with space");
        assert_eq!(request_path("http://host:80/p?q"), "/p");
        assert_eq!(request_path("http://host"), "/");
        assert_eq!(request_path("/bad%zz"), "/bad%zz");
    }

    #[test]
    fn test_capture_and_static_reply() {
        let server = HttpServer::bind_with("127.0.0.1:0", &small_config(4)).unwrap();
        server.set_static_response(201, b"made", "text/custom");

        let reply = raw_exchange(
            server.addr(),
            b"POST /items?id=3 HTTP/1.1\r\nHost: x\r\nX-Tag: t1\r\nContent-Length: 5\r\n\r\nhello",
        );
        assert!(reply.starts_with("HTTP/1.1 201 Created\r\n"));
        assert!(reply.contains("Content-Type: text/custom\r\n"));
        assert!(reply.ends_with("\r\n\r\nmade"));

        let req = server.next_request(1000).unwrap();
        assert_eq!(req.method, "POST");
        assert_eq!(req.path, "/items");
        assert_eq!(req.headers.get("x-tag"), Some("t1"));
        assert_eq!(req.body, b"hello");
        server.close().unwrap();
    }

    #[test]
    fn test_chunked_body() {
        let server = HttpServer::bind_with("127.0.0.1:0", &small_config(4)).unwrap();
        raw_exchange(
            server.addr(),
            b"PUT / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabc\r\n2\r\nde\r\n0\r\n\r\n",
        );
        assert_eq!(server.next_request(1000).unwrap().body, b"abcde");
    }

    #[test]
    fn test_expect_continue_is_acknowledged() {
        let server = HttpServer::bind_with("127.0.0.1:0", &small_config(4)).unwrap();
        let reply = raw_exchange(
            server.addr(),
            b"POST /up HTTP/1.1\r\nExpect: 100-continue\r\nContent-Length: 2\r\n\r\nok",
        );
        assert!(reply.starts_with("HTTP/1.1 100 Continue\r\n\r\nHTTP/1.1 "));
        assert_eq!(server.next_request(1000).unwrap().body, b"ok");
    }

    #[test]
    fn test_malformed_request_not_captured() {
        let server = HttpServer::bind_with("127.0.0.1:0", &small_config(4)).unwrap();
        let reply = raw_exchange(server.addr(), b"garbage\r\n\r\n");
        assert!(reply.starts_with("HTTP/1.1 400"));
        assert!(server.next_request(0).unwrap_err().is_eof());
    }

    #[test]
    fn test_no_request_is_eof() {
        let server = HttpServer::bind_with("127.0.0.1:0", &small_config(4)).unwrap();
        assert!(server.next_request(0).unwrap_err().is_eof());
        assert!(server.next_request(20).unwrap_err().is_eof());
    }

    #[test]
    fn test_close_is_idempotent() {
        let server = HttpServer::bind_with("127.0.0.1:0", &small_config(1)).unwrap();
        server.close().unwrap();
        server.close().unwrap();
    }
}
