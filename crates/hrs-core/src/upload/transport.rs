//! Transport seam: one multipart POST, body exposed as a chunk stream.
//!
//! Implementations push `TransportEvent`s into a bounded channel; the
//! streamer drains it through `ResponseStream`. The status always precedes
//! the first body chunk.

use anyhow::{Context, Result};
use std::path::Path;
use tokio::sync::mpsc;

use super::error::TransportError;

/// Channel capacity used by transports that do not pick their own.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 32;

/// File to upload as the sole `file` field of the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read a file from disk; the form file name is the path's last component.
    pub fn read(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| anyhow::anyhow!("not a file path: {}", path.display()))?;
        let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
        Ok(Self { name, bytes })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// What a transport reports while a request is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Final (non-1xx) HTTP status of the response.
    Status(u32),
    /// Next slice of the response body.
    Chunk(Vec<u8>),
    /// Fatal error; nothing follows.
    Failed(TransportError),
}

pub type EventSender = mpsc::Sender<TransportEvent>;

/// Issues the batch upload request.
pub trait Transport: Send + Sync {
    /// Start one multipart POST carrying `file`. Never blocks; the response
    /// arrives through the returned stream.
    fn post_file(&self, file: UploadFile) -> ResponseStream;
}

/// Reader over one response. Dropping it aborts the transfer.
#[derive(Debug)]
pub struct ResponseStream {
    rx: mpsc::Receiver<TransportEvent>,
    status: Option<u32>,
    ended: bool,
}

impl ResponseStream {
    /// Create a connected sender/stream pair.
    pub fn channel(capacity: usize) -> (EventSender, ResponseStream) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            tx,
            ResponseStream {
                rx,
                status: None,
                ended: false,
            },
        )
    }

    /// Wait for the response status.
    pub async fn status(&mut self) -> Result<u32, TransportError> {
        if let Some(code) = self.status {
            return Ok(code);
        }
        if self.ended {
            return Err(TransportError::new("connection closed before response"));
        }
        match self.rx.recv().await {
            Some(TransportEvent::Status(code)) => {
                self.status = Some(code);
                Ok(code)
            }
            Some(TransportEvent::Chunk(_)) => {
                self.ended = true;
                Err(TransportError::new("response body before status"))
            }
            Some(TransportEvent::Failed(e)) => {
                self.ended = true;
                Err(e)
            }
            None => {
                self.ended = true;
                Err(TransportError::new("connection closed before response"))
            }
        }
    }

    /// Next body chunk; `None` once the body is exhausted or after an error was returned.
    pub async fn next_chunk(&mut self) -> Option<Result<Vec<u8>, TransportError>> {
        if self.ended {
            return None;
        }
        loop {
            match self.rx.recv().await {
                Some(TransportEvent::Chunk(data)) => return Some(Ok(data)),
                Some(TransportEvent::Status(code)) => {
                    tracing::debug!(code, "ignoring repeated status");
                    self.status.get_or_insert(code);
                }
                Some(TransportEvent::Failed(e)) => {
                    self.ended = true;
                    return Some(Err(e));
                }
                None => {
                    self.ended = true;
                    return None;
                }
            }
        }
    }

    /// Collect the remaining body.
    pub async fn read_to_end(&mut self) -> Result<Vec<u8>, TransportError> {
        let mut body = Vec::new();
        while let Some(chunk) = self.next_chunk().await {
            body.extend_from_slice(&chunk?);
        }
        Ok(body)
    }

    /// Collect whatever body arrives before the end or the first error.
    /// The error itself is dropped; what was received is kept.
    pub async fn read_available(&mut self) -> Vec<u8> {
        let mut body = Vec::new();
        while let Some(chunk) = self.next_chunk().await {
            match chunk {
                Ok(data) => body.extend_from_slice(&data),
                Err(e) => {
                    tracing::debug!(error = %e, received = body.len(), "body cut short");
                    break;
                }
            }
        }
        body
    }
}
