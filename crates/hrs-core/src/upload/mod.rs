//! Streaming batch upload.
//!
//! Sends one file as a multipart POST and follows the server's progress
//! event stream (`data: {json}\n\n` frames) until the `completed` frame, a
//! transport error, or the end of the body. The terminal result is returned
//! exactly once; progress is reported per frame before it.

mod curl_transport;
mod error;
mod frame;
mod progress;
#[cfg(test)]
mod scripted;
mod stream;
mod tracker;
mod transport;

pub use curl_transport::{CurlTransport, FILE_FIELD};
pub use error::{TransportError, UploadFailure, GENERIC_BATCH_FAILURE};
pub use frame::{FrameDecoder, ProgressEvent, STATUS_COMPLETED};
pub use progress::{percent_of, UploadProgress, UploadStatus};
pub use stream::{spawn_upload, stream_upload, UploadHandle, UploadOutcome, UploadSummary};
pub use tracker::ProgressTracker;
pub use transport::{
    EventSender, ResponseStream, Transport, TransportEvent, UploadFile, DEFAULT_CHANNEL_CAPACITY,
};
