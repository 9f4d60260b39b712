//! Upload progress state (records done, total, percent).
//!
//! One `UploadProgress` lives per in-flight upload. It is created pending,
//! mutated in place for each progress frame, and finalized once.

use serde::Serialize;

use super::frame::ProgressEvent;

/// Lifecycle of a single upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

impl UploadStatus {
    /// True for `Completed` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, UploadStatus::Completed | UploadStatus::Failed)
    }
}

/// Snapshot of batch progress for one upload (CLI-friendly).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct UploadProgress {
    /// Records processed so far.
    pub current: u64,
    /// Total record count (0 until the server reports it).
    pub total: u64,
    /// Percent complete in [0, 100].
    pub percent: u8,
    pub status: UploadStatus,
}

impl UploadProgress {
    pub fn pending() -> Self {
        Self::default()
    }

    /// Update from one progress frame. No-op once the upload is finalized.
    ///
    /// `current` is clamped to `total` when a total is known, and `percent`
    /// never goes backwards within a session.
    pub fn apply(&mut self, event: &ProgressEvent) {
        if self.status.is_terminal() {
            return;
        }
        self.total = event.total;
        self.current = if event.total > 0 {
            event.current.min(event.total)
        } else {
            event.current
        };
        self.percent = self.percent.max(percent_of(self.current, self.total));
        self.status = if event.is_completed() {
            UploadStatus::Completed
        } else {
            UploadStatus::Running
        };
    }

    /// Finalize as failed. Keeps the last reported counts.
    pub fn fail(&mut self) {
        if !self.status.is_terminal() {
            self.status = UploadStatus::Failed;
        }
    }

    /// Fraction complete in [0.0, 1.0].
    pub fn fraction(&self) -> f64 {
        f64::from(self.percent) / 100.0
    }
}

/// `round(current / total * 100)` with halves rounded up; 0 when `total == 0`.
pub fn percent_of(current: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let current = u128::from(current.min(total));
    let total = u128::from(total);
    let pct = (current * 200 + total) / (total * 2);
    pct.min(100) as u8
}
