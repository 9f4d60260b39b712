//! Pre-send checks for batch files (type allow-list and size ceiling).
//!
//! Runs on the caller side before any request is made; the streamer itself
//! never re-validates.

use std::path::Path;
use thiserror::Error;

use crate::config::HrsConfig;

/// Extensions the batch endpoint accepts.
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["csv", "txt", "json"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    /// Files must be strictly smaller than this.
    pub max_bytes: u64,
}

impl UploadLimits {
    pub fn from_config(cfg: &HrsConfig) -> Self {
        Self {
            max_bytes: cfg.max_upload_bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("file name is empty")]
    EmptyName,
    #[error("unsupported file type: {name} (only CSV, TXT or JSON)")]
    UnsupportedType { name: String },
    #[error("file is too large: {size} bytes (limit {limit} bytes)")]
    TooLarge { size: u64, limit: u64 },
}

/// Check a file name and size against the limits.
pub fn validate_upload(name: &str, size: u64, limits: &UploadLimits) -> Result<(), ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    let ext = Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase());
    let allowed = ext
        .as_deref()
        .is_some_and(|e| ALLOWED_EXTENSIONS.contains(&e));
    if !allowed {
        return Err(ValidationError::UnsupportedType {
            name: name.to_string(),
        });
    }
    if size >= limits.max_bytes {
        return Err(ValidationError::TooLarge {
            size,
            limit: limits.max_bytes,
        });
    }
    Ok(())
}
