//! Upload failure taxonomy.

use thiserror::Error;

/// Fallback message when a transport error carries no text of its own.
pub const GENERIC_BATCH_FAILURE: &str = "batch processing failed";

/// Error raised by the HTTP transport (connect failure, dropped stream, aborted transfer).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Message for the user, falling back to the generic text when empty.
    pub fn user_message(&self) -> &str {
        let msg = self.message.trim();
        if msg.is_empty() {
            GENERIC_BATCH_FAILURE
        } else {
            msg
        }
    }
}

impl From<curl::Error> for TransportError {
    fn from(e: curl::Error) -> Self {
        match e.extra_description() {
            Some(extra) => TransportError::new(format!("{}: {}", e.description(), extra)),
            None => TransportError::new(e.description()),
        }
    }
}

/// Terminal failure of one upload. Reported exactly once per upload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadFailure {
    /// Server answered the POST with a non-2xx status.
    #[error("{message}")]
    Rejected { status: u32, message: String },
    /// Stream read error or network drop before completion.
    #[error("{message}")]
    Transport { message: String },
    /// Stream closed cleanly but no `completed` frame was seen.
    #[error("stream ended before completion")]
    Incomplete,
}

impl UploadFailure {
    pub(crate) fn from_transport(e: &TransportError) -> Self {
        UploadFailure::Transport {
            message: e.user_message().to_string(),
        }
    }

    /// HTTP status for `Rejected`, None otherwise.
    pub fn http_status(&self) -> Option<u32> {
        match self {
            UploadFailure::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}
