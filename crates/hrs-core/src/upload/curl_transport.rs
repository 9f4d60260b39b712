//! libcurl-backed transport for the batch upload.
//!
//! The transfer runs on its own OS thread (curl is blocking); header status
//! and body chunks are forwarded to the async side over a bounded channel.
//! When the reader goes away the next write returns 0, which aborts curl.

use std::cell::Cell;
use std::collections::HashMap;
use std::str;

use curl::easy::{Easy, Form, List};

use super::error::TransportError;
use super::transport::{
    EventSender, ResponseStream, Transport, TransportEvent, UploadFile, DEFAULT_CHANNEL_CAPACITY,
};
use crate::config::HttpConfig;

/// Multipart field carrying the upload.
pub const FILE_FIELD: &str = "file";

/// Posts the file to a fixed endpoint with optional extra headers (e.g. the session cookie).
#[derive(Debug, Clone)]
pub struct CurlTransport {
    url: String,
    headers: HashMap<String, String>,
    http: HttpConfig,
}

impl CurlTransport {
    pub fn new(url: impl Into<String>, http: HttpConfig) -> Self {
        Self {
            url: url.into(),
            headers: HashMap::new(),
            http,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn perform(&self, file: UploadFile, tx: &EventSender) -> Result<(), TransportError> {
        let mut easy = Easy::new();
        easy.url(&self.url)?;
        easy.connect_timeout(self.http.connect_timeout())?;
        easy.low_speed_limit(1)?;
        easy.low_speed_time(self.http.low_speed_time())?;

        // Empty "Expect:" disables 100-continue; the boundary header is curl's.
        let mut list = List::new();
        list.append("Expect:")?;
        for (k, v) in &self.headers {
            list.append(&format!("{}: {}", k.trim(), v.trim()))?;
        }
        easy.http_headers(list)?;

        let mut form = Form::new();
        form.part(FILE_FIELD)
            .buffer(&file.name, file.bytes)
            .add()
            .map_err(|e| TransportError::new(format!("multipart form: {e}")))?;
        easy.httppost(form)?;

        let last_code: Cell<Option<u32>> = Cell::new(None);
        let status_sent = Cell::new(false);
        let send_status = |code: u32| -> bool {
            status_sent.set(true);
            tx.blocking_send(TransportEvent::Status(code)).is_ok()
        };

        {
            let mut transfer = easy.transfer();
            transfer.header_function(|data| {
                let line = String::from_utf8_lossy(data);
                let line = line.trim_end();
                if let Some(code) = parse_status_line(line) {
                    last_code.set(Some(code));
                } else if line.is_empty() && !status_sent.get() {
                    // End of a header block; 1xx blocks are followed by the real one.
                    if let Some(code) = last_code.get().filter(|c| *c >= 200) {
                        return send_status(code);
                    }
                }
                true
            })?;
            transfer.write_function(|data| {
                if !status_sent.get() {
                    if let Some(code) = last_code.get() {
                        if !send_status(code) {
                            return Ok(0);
                        }
                    }
                }
                match tx.blocking_send(TransportEvent::Chunk(data.to_vec())) {
                    Ok(()) => Ok(data.len()),
                    Err(_) => Ok(0),
                }
            })?;
            transfer.perform()?;
        }

        if !status_sent.get() {
            let code = easy.response_code()?;
            let _ = tx.blocking_send(TransportEvent::Status(code));
        }
        Ok(())
    }
}

impl Transport for CurlTransport {
    fn post_file(&self, file: UploadFile) -> ResponseStream {
        let (tx, stream) = ResponseStream::channel(DEFAULT_CHANNEL_CAPACITY);
        let this = self.clone();
        tracing::debug!(url = %self.url, file = %file.name, bytes = file.len(), "posting batch file");
        let spawned = std::thread::Builder::new()
            .name("hrs-upload".to_string())
            .spawn(move || {
                if let Err(e) = this.perform(file, &tx) {
                    tracing::debug!(error = %e, "upload transfer failed");
                    let _ = tx.blocking_send(TransportEvent::Failed(e));
                }
            });
        if let Err(e) = spawned {
            // The closure (and sender) is dropped, so the stream reports a closed connection.
            tracing::warn!("could not start upload thread: {}", e);
        }
        stream
    }
}

/// `HTTP/1.1 200 OK` -> 200.
fn parse_status_line(line: &str) -> Option<u32> {
    if !line.starts_with("HTTP/") {
        return None;
    }
    line.split_whitespace().nth(1)?.parse().ok()
}
