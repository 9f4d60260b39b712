//! `hrs upload <path>` – send a review file and follow batch progress.

use anyhow::{Context, Result};
use hrs_core::config::HrsConfig;
use hrs_core::session::SessionStore;
use hrs_core::upload::{spawn_upload, CurlTransport, ProgressTracker, UploadFile, UploadProgress};
use hrs_core::validate::{validate_upload, UploadLimits};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

const PROGRESS_INTERVAL: Duration = Duration::from_millis(200);
const BAR_WIDTH: usize = 30;

pub async fn run_upload(cfg: &HrsConfig, store: &SessionStore, path: &Path, quiet: bool) -> Result<()> {
    let meta = std::fs::metadata(path).with_context(|| format!("stat {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    validate_upload(&name, meta.len(), &UploadLimits::from_config(cfg))?;
    let file = UploadFile::read(path)?;

    let endpoint = cfg.endpoint(&cfg.batch_upload_path)?;
    let mut transport = CurlTransport::new(endpoint.as_str(), cfg.http);
    match store.load()? {
        Some(saved) => transport = transport.with_header("Cookie", &saved.cookie),
        None => tracing::debug!("uploading without a session; the server may reject it"),
    }

    let mut tracker = ProgressTracker::new(cfg.display_window());
    if !tracker.begin() {
        anyhow::bail!("an upload is already in progress");
    }
    let mut line = ProgressLine::new(io::stderr(), quiet);
    let handle = spawn_upload(Arc::new(transport), file);

    let outcome = handle
        .wait(|p| {
            if tracker.on_progress(p) {
                line.update(&tracker, Instant::now());
            }
        })
        .await;
    tracker.on_terminal(&outcome, Instant::now());
    line.linger(&mut tracker).await;

    match outcome {
        Ok(summary) => {
            println!("Complete! Processed {} reviews.", summary.total);
            if summary.processed < summary.total {
                println!(
                    "{} of {} reviews could not be analyzed.",
                    summary.total - summary.processed,
                    summary.total
                );
            }
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Single `\r`-rewritten status line fed from the tracker's snapshot.
struct ProgressLine<W: Write> {
    out: W,
    quiet: bool,
    last_print: Option<Instant>,
    drawn: usize,
}

impl<W: Write> ProgressLine<W> {
    fn new(out: W, quiet: bool) -> Self {
        Self {
            out,
            quiet,
            last_print: None,
            drawn: 0,
        }
    }

    /// Redraw at most every `PROGRESS_INTERVAL`, always on a terminal snapshot.
    fn update(&mut self, tracker: &ProgressTracker, now: Instant) {
        let Some(p) = tracker.snapshot() else { return };
        let due = self
            .last_print
            .map_or(true, |t| now.duration_since(t) >= PROGRESS_INTERVAL);
        if due || p.status.is_terminal() {
            self.draw(&p);
            self.last_print = Some(now);
        }
    }

    /// Show the final state for the tracker's display window, then clear it.
    async fn linger(&mut self, tracker: &mut ProgressTracker) {
        if self.quiet {
            // Nothing on screen to hold; collapse at the window's end right away.
            let now = Instant::now();
            tracker.expire(now + tracker.remaining_display(now).unwrap_or_default());
            return;
        }
        if let Some(p) = tracker.snapshot() {
            self.draw(&p);
        }
        while let Some(wait) = tracker.remaining_display(Instant::now()) {
            if tracker.expire(Instant::now()) {
                break;
            }
            tokio::time::sleep(wait.max(Duration::from_millis(1))).await;
        }
        self.clear();
    }

    fn draw(&mut self, p: &UploadProgress) {
        if self.quiet {
            return;
        }
        let text = render_line(p);
        let pad = self.drawn.saturating_sub(text.len());
        let _ = write!(self.out, "\r{}{}", text, " ".repeat(pad));
        let _ = self.out.flush();
        self.drawn = text.len();
    }

    fn clear(&mut self) {
        if self.drawn == 0 {
            return;
        }
        let _ = write!(self.out, "\r{}\r", " ".repeat(self.drawn));
        let _ = self.out.flush();
        self.drawn = 0;
    }
}

fn render_line(p: &UploadProgress) -> String {
    let filled = ((p.fraction() * BAR_WIDTH as f64).round() as usize).min(BAR_WIDTH);
    format!(
        "  [{}{}] {:>3}%  {}/{} reviews",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        p.percent,
        p.current,
        p.total
    )
}
