//! `hrs analyze <text>` – sentiment of a text without storing it.

use anyhow::Result;
use hrs_core::config::HrsConfig;
use hrs_core::feedback::analyze_sentiment;
use hrs_core::session::SessionStore;

use super::session_from_store;

pub async fn run_analyze(cfg: &HrsConfig, store: &SessionStore, text: &str) -> Result<()> {
    let session = session_from_store(cfg, store).await?;
    let analysis = analyze_sentiment(&session, text).await?;
    let lang = analysis.language.as_deref().unwrap_or("unknown");
    println!(
        "{} ({:.2}), language {}",
        analysis.sentiment.label, analysis.sentiment.score, lang
    );
    Ok(())
}
