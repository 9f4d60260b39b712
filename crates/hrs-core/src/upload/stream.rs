//! Batch upload streamer: send the file and follow the progress stream.
//!
//! Suspension points are awaiting the response status and each body chunk;
//! frame parsing and progress dispatch in between run synchronously.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use super::error::UploadFailure;
use super::frame::{FrameDecoder, ProgressEvent};
use super::progress::UploadProgress;
use super::transport::{Transport, UploadFile};
use crate::api::error_message;

/// Successful end of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UploadSummary {
    /// Total records the server reported for the batch.
    pub total: u64,
    /// Records actually processed (server summary field, else the last `current`).
    pub processed: u64,
}

/// Terminal result of one upload.
pub type UploadOutcome = Result<UploadSummary, UploadFailure>;

/// Upload `file` and follow its progress stream to the end.
///
/// `on_progress` runs once per parsed frame, in stream order, and never after
/// the `completed` frame. The returned outcome is the single terminal
/// notification; every failure is reported through it.
pub async fn stream_upload<T, F>(transport: &T, file: UploadFile, mut on_progress: F) -> UploadOutcome
where
    T: Transport + ?Sized,
    F: FnMut(&UploadProgress),
{
    tracing::info!(file = %file.name, bytes = file.len(), "starting batch upload");
    let mut response = transport.post_file(file);

    let status = match response.status().await {
        Ok(code) => code,
        Err(e) => {
            tracing::warn!(error = %e, "batch upload failed before response");
            return Err(UploadFailure::from_transport(&e));
        }
    };

    if !(200..300).contains(&status) {
        let body = response.read_available().await;
        let message =
            error_message(&body).unwrap_or_else(|| format!("upload failed (HTTP {status})"));
        tracing::warn!(status, %message, "batch upload rejected");
        return Err(UploadFailure::Rejected { status, message });
    }

    let mut progress = UploadProgress::pending();
    let mut decoder = FrameDecoder::new();
    let mut outcome: Option<UploadOutcome> = None;

    while let Some(chunk) = response.next_chunk().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => {
                if outcome.is_none() {
                    tracing::warn!(error = %e, current = progress.current, total = progress.total, "batch stream broke");
                    outcome = Some(Err(UploadFailure::from_transport(&e)));
                }
                break;
            }
        };
        if outcome.is_some() {
            // Completed already; drain until the server closes.
            continue;
        }
        for event in decoder.push(&chunk) {
            outcome = deliver(&mut progress, &event, &mut on_progress);
            if outcome.is_some() {
                break;
            }
        }
    }

    if outcome.is_none() {
        if let Some(event) = decoder.finish() {
            outcome = deliver(&mut progress, &event, &mut on_progress);
        }
    }

    let outcome = outcome.unwrap_or(Err(UploadFailure::Incomplete));
    match &outcome {
        Ok(summary) => tracing::info!(
            total = summary.total,
            processed = summary.processed,
            "batch upload completed"
        ),
        Err(e) => tracing::warn!(current = progress.current, total = progress.total, "batch upload failed: {}", e),
    }
    outcome
}

/// Apply one frame and notify. Returns the outcome when the frame is terminal.
fn deliver<F>(progress: &mut UploadProgress, event: &ProgressEvent, on_progress: &mut F) -> Option<UploadOutcome>
where
    F: FnMut(&UploadProgress),
{
    progress.apply(event);
    tracing::trace!(current = progress.current, total = progress.total, percent = progress.percent, "batch progress");
    on_progress(progress);
    event.is_completed().then(|| {
        Ok(UploadSummary {
            total: event.total,
            processed: event.processed.unwrap_or(event.current),
        })
    })
}

/// Handle to an upload running as its own task.
#[derive(Debug)]
pub struct UploadHandle {
    /// Progress snapshots in stream order; closes before `terminal` resolves.
    pub progress: mpsc::UnboundedReceiver<UploadProgress>,
    /// Single-shot terminal result.
    pub terminal: oneshot::Receiver<UploadOutcome>,
}

impl UploadHandle {
    /// Drain progress through `on_progress`, then return the terminal outcome.
    pub async fn wait<F>(mut self, mut on_progress: F) -> UploadOutcome
    where
        F: FnMut(&UploadProgress),
    {
        while let Some(p) = self.progress.recv().await {
            on_progress(&p);
        }
        match self.terminal.await {
            Ok(outcome) => outcome,
            Err(_) => Err(UploadFailure::Transport {
                message: "upload task ended unexpectedly".to_string(),
            }),
        }
    }
}

/// Run `stream_upload` on a tokio task. Must be called inside a runtime.
pub fn spawn_upload<T>(transport: Arc<T>, file: UploadFile) -> UploadHandle
where
    T: Transport + ?Sized + 'static,
{
    let (progress_tx, progress_rx) = mpsc::unbounded_channel();
    let (terminal_tx, terminal_rx) = oneshot::channel();
    tokio::spawn(async move {
        let outcome = stream_upload(transport.as_ref(), file, move |p| {
            let _ = progress_tx.send(*p);
        })
        .await;
        let _ = terminal_tx.send(outcome);
    });
    UploadHandle {
        progress: progress_rx,
        terminal: terminal_rx,
    }
}
