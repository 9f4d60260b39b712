//! Single-review endpoints: store one review, or analyze text without storing it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::session::{rejection, Session};

pub const SUBMIT_PATH: &str = "/feedback/submit";
pub const SENTIMENT_PATH: &str = "/analysis/sentiment";

/// Sentiment of one aspect (room, service, location, ...) of a review.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AspectSentiment {
    pub aspect_name: String,
    #[serde(default)]
    pub sentiment_label: Option<String>,
    #[serde(default)]
    pub sentiment_score: Option<f64>,
}

/// A stored review as the server returns it.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Feedback {
    pub id: i64,
    pub text: String,
    #[serde(default)]
    pub language: Option<String>,
    /// `very_positive` .. `very_negative`; absent until analyzed.
    #[serde(default)]
    pub sentiment_label: Option<String>,
    #[serde(default)]
    pub sentiment_score: Option<f64>,
    #[serde(default)]
    pub hotel_name: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub aspects: Vec<AspectSentiment>,
}

impl Feedback {
    pub fn is_analyzed(&self) -> bool {
        self.sentiment_label.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Sentiment {
    pub label: String,
    pub score: f64,
}

/// Result of `analyze_sentiment`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Analysis {
    pub sentiment: Sentiment,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Deserialize)]
struct FeedbackEnvelope {
    feedback: Feedback,
}

#[derive(Serialize)]
struct TextRequest<'a> {
    text: &'a str,
}

fn text_body(text: &str) -> Result<serde_json::Value> {
    let text = text.trim();
    if text.is_empty() {
        anyhow::bail!("review text is empty");
    }
    serde_json::to_value(TextRequest { text }).context("serialize review")
}

fn require_login(session: &Session) -> Result<()> {
    if session.is_authenticated() {
        Ok(())
    } else {
        anyhow::bail!("not logged in (run `hrs login` first)")
    }
}

/// Store one review for the logged-in user.
pub async fn submit_feedback(session: &Session, text: &str) -> Result<Feedback> {
    require_login(session)?;
    let body = text_body(text)?;
    let response = session.call_post(SUBMIT_PATH, body).await?;
    if !response.is_success() {
        return Err(rejection(&response, "submission"));
    }
    let envelope: FeedbackEnvelope = response.json()?;
    tracing::info!(id = envelope.feedback.id, "submitted review");
    Ok(envelope.feedback)
}

/// Run the sentiment model on `text` without storing it.
pub async fn analyze_sentiment(session: &Session, text: &str) -> Result<Analysis> {
    require_login(session)?;
    let body = text_body(text)?;
    let response = session.call_post(SENTIMENT_PATH, body).await?;
    if !response.is_success() {
        return Err(rejection(&response, "analysis"));
    }
    let analysis: Analysis = response.json()?;
    tracing::debug!(label = %analysis.sentiment.label, score = analysis.sentiment.score, "analyzed text");
    Ok(analysis)
}
