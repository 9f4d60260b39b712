//! `hrs submit <text>` – store one review and show its analysis.

use anyhow::Result;
use hrs_core::config::HrsConfig;
use hrs_core::feedback::{submit_feedback, Feedback};
use hrs_core::session::SessionStore;

use super::session_from_store;

pub async fn run_submit(cfg: &HrsConfig, store: &SessionStore, text: &str) -> Result<()> {
    let session = session_from_store(cfg, store).await?;
    let feedback = submit_feedback(&session, text).await?;
    print!("{}", describe(&feedback));
    Ok(())
}

fn describe(fb: &Feedback) -> String {
    let mut out = format!("Review #{} saved.\n", fb.id);
    match (&fb.sentiment_label, fb.sentiment_score) {
        (Some(label), Some(score)) => out.push_str(&format!("  sentiment: {label} ({score:.2})\n")),
        (Some(label), None) => out.push_str(&format!("  sentiment: {label}\n")),
        (None, _) => out.push_str("  sentiment: pending analysis\n"),
    }
    for aspect in &fb.aspects {
        let label = aspect.sentiment_label.as_deref().unwrap_or("-");
        match aspect.sentiment_score {
            Some(score) => out.push_str(&format!("  {:<12} {label} ({score:.2})\n", aspect.aspect_name)),
            None => out.push_str(&format!("  {:<12} {label}\n", aspect.aspect_name)),
        }
    }
    out
}
