//! Caller-side holder of the visible upload state.
//!
//! Resets on each new upload, ignores progress that arrives after the
//! terminal result, and collapses the state once the display window after
//! the terminal event has passed.

use std::time::{Duration, Instant};

use super::progress::{UploadProgress, UploadStatus};
use super::stream::UploadOutcome;

#[derive(Debug)]
pub struct ProgressTracker {
    display_window: Duration,
    state: Option<UploadProgress>,
    outcome: Option<UploadOutcome>,
    finished_at: Option<Instant>,
}

impl ProgressTracker {
    pub fn new(display_window: Duration) -> Self {
        Self {
            display_window,
            state: None,
            outcome: None,
            finished_at: None,
        }
    }

    /// Start a new session, discarding any previous one.
    /// Returns false while an upload is still in flight.
    pub fn begin(&mut self) -> bool {
        if self.is_busy() {
            return false;
        }
        self.state = Some(UploadProgress::pending());
        self.outcome = None;
        self.finished_at = None;
        true
    }

    /// True between `begin` and the terminal event.
    pub fn is_busy(&self) -> bool {
        self.state.is_some() && self.finished_at.is_none()
    }

    /// Record a progress snapshot. Ignored when idle or after the terminal event.
    pub fn on_progress(&mut self, progress: &UploadProgress) -> bool {
        if !self.is_busy() {
            return false;
        }
        self.state = Some(*progress);
        true
    }

    /// Record the terminal result once; later calls are ignored.
    pub fn on_terminal(&mut self, outcome: &UploadOutcome, now: Instant) -> bool {
        if !self.is_busy() {
            return false;
        }
        if let Some(state) = self.state.as_mut() {
            match outcome {
                Ok(summary) => {
                    state.total = summary.total;
                    state.status = UploadStatus::Completed;
                }
                Err(_) => state.fail(),
            }
        }
        self.outcome = Some(outcome.clone());
        self.finished_at = Some(now);
        true
    }

    /// Clear the visible state once the display window has elapsed.
    /// Returns true when something was cleared.
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.finished_at {
            Some(t) if now.saturating_duration_since(t) >= self.display_window => {
                self.state = None;
                self.outcome = None;
                self.finished_at = None;
                true
            }
            _ => false,
        }
    }

    /// Time left before the finished state collapses (None when nothing is finished).
    pub fn remaining_display(&self, now: Instant) -> Option<Duration> {
        self.finished_at
            .map(|t| self.display_window.saturating_sub(now.saturating_duration_since(t)))
    }

    pub fn snapshot(&self) -> Option<UploadProgress> {
        self.state
    }

    pub fn outcome(&self) -> Option<&UploadOutcome> {
        self.outcome.as_ref()
    }
}
