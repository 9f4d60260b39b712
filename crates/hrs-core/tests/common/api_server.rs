//! Minimal HTTP/1.1 server for integration tests.
//!
//! Reads one request per connection (headers plus `Content-Length` body),
//! records it, and answers with whatever the route function returns: a JSON
//! body, or a chunked event stream that can be cut off before its last chunk.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }
}

#[derive(Debug, Clone)]
pub enum Reply {
    Json {
        status: u16,
        body: String,
        set_cookie: Option<String>,
    },
    /// `text/event-stream`, one HTTP chunk per entry, flushed with a short pause.
    /// With `close_early`, the connection is dropped before the final zero chunk.
    Stream {
        chunks: Vec<String>,
        close_early: bool,
    },
}

impl Reply {
    pub fn json(status: u16, body: &str) -> Self {
        Reply::Json {
            status,
            body: body.to_string(),
            set_cookie: None,
        }
    }

    pub fn stream(chunks: Vec<String>) -> Self {
        Reply::Stream {
            chunks,
            close_early: false,
        }
    }
}

type Route = dyn Fn(&RecordedRequest) -> Reply + Send + Sync;

pub struct TestServer {
    /// e.g. `http://127.0.0.1:12345/api`
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl TestServer {
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Starts a server in a background thread. Runs until the process exits.
pub fn start<F>(route: F) -> TestServer
where
    F: Fn(&RecordedRequest) -> Reply + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let route: Arc<Route> = Arc::new(route);
    let requests = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&requests);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let route = Arc::clone(&route);
            let recorded = Arc::clone(&recorded);
            thread::spawn(move || handle(stream, route.as_ref(), &recorded));
        }
    });
    TestServer {
        base_url: format!("http://127.0.0.1:{}/api", port),
        requests,
    }
}

/// A base URL nothing listens on.
pub fn refused_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}/api", port)
}

fn handle(mut stream: TcpStream, route: &Route, recorded: &Mutex<Vec<RecordedRequest>>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let request = match read_request(&mut stream) {
        Some(r) => r,
        None => return,
    };
    recorded.lock().unwrap().push(request.clone());
    match route(&request) {
        Reply::Json {
            status,
            body,
            set_cookie,
        } => {
            let cookie = set_cookie
                .map(|c| format!("Set-Cookie: {}\r\n", c))
                .unwrap_or_default();
            let response = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n{}Connection: close\r\n\r\n{}",
                status,
                reason(status),
                body.len(),
                cookie,
                body
            );
            let _ = stream.write_all(response.as_bytes());
        }
        Reply::Stream {
            chunks,
            close_early,
        } => {
            let head = "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n";
            if stream.write_all(head.as_bytes()).is_err() {
                return;
            }
            for chunk in chunks {
                let framed = format!("{:x}\r\n{}\r\n", chunk.len(), chunk);
                if stream.write_all(framed.as_bytes()).is_err() {
                    return;
                }
                let _ = stream.flush();
                thread::sleep(Duration::from_millis(20));
            }
            if !close_early {
                let _ = stream.write_all(b"0\r\n\r\n");
            }
            let _ = stream.flush();
        }
    }
    let _ = stream.shutdown(std::net::Shutdown::Both);
}

fn read_request(stream: &mut TcpStream) -> Option<RecordedRequest> {
    let mut data = Vec::new();
    let mut buf = [0u8; 8192];
    let header_end = loop {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buf[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };
    let head = String::from_utf8_lossy(&data[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();
    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = data[header_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&buf[..n]);
    }
    Some(RecordedRequest {
        method,
        path,
        headers,
        body,
    })
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        _ => "Status",
    }
}
