//! Blocking JSON client for the REST endpoints (session check, login, logout, register, feedback).
//!
//! Uses the curl crate like the upload transport. Runs in the current
//! thread; call from `spawn_blocking` if used from async code.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::str;
use std::time::Duration;

use crate::config::{join_endpoint, HrsConfig, HttpConfig};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Status, body, and session cookies of one API response.
#[derive(Debug, Clone, Default)]
pub struct ApiResponse {
    pub status: u32,
    pub body: Vec<u8>,
    /// `name=value` pairs from `Set-Cookie` headers, in arrival order.
    pub set_cookies: Vec<String>,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).context("parse API response")
    }

    pub fn error_message(&self) -> Option<String> {
        error_message(&self.body)
    }

    /// `Cookie` header value for the cookies this response set, if any.
    pub fn cookie(&self) -> Option<String> {
        if self.set_cookies.is_empty() {
            None
        } else {
            Some(self.set_cookies.join("; "))
        }
    }
}

/// Extract `error` from a `{"error": "..."}` body.
pub fn error_message(body: &[u8]) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<String>,
    }
    let parsed: ErrorBody = serde_json::from_slice(body).ok()?;
    parsed
        .error
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: HttpConfig,
    cookie: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, http: HttpConfig) -> Result<Self> {
        join_endpoint(base_url, "")?;
        Ok(Self {
            base_url: base_url.to_string(),
            http,
            cookie: None,
        })
    }

    pub fn from_config(cfg: &HrsConfig) -> Result<Self> {
        Self::new(&cfg.base_url, cfg.http)
    }

    pub fn with_cookie(mut self, cookie: Option<String>) -> Self {
        self.cookie = cookie;
        self
    }

    pub fn set_cookie(&mut self, cookie: Option<String>) {
        self.cookie = cookie;
    }

    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn get(&self, path: &str) -> Result<ApiResponse> {
        self.request(path, None)
    }

    pub fn post_json<B: Serialize>(&self, path: &str, body: &B) -> Result<ApiResponse> {
        let json = serde_json::to_vec(body).context("serialize request body")?;
        self.request(path, Some(json))
    }

    fn request(&self, path: &str, json_body: Option<Vec<u8>>) -> Result<ApiResponse> {
        let url = join_endpoint(&self.base_url, path)?;
        let mut header_lines: Vec<String> = Vec::new();
        let mut body: Vec<u8> = Vec::new();

        let mut easy = curl::easy::Easy::new();
        easy.url(url.as_str()).context("invalid URL")?;
        easy.connect_timeout(self.http.connect_timeout())?;
        easy.timeout(REQUEST_TIMEOUT)?;

        let mut list = curl::easy::List::new();
        list.append("Accept: application/json")?;
        if let Some(cookie) = &self.cookie {
            list.append(&format!("Cookie: {}", cookie.trim()))?;
        }
        if let Some(json) = &json_body {
            list.append("Content-Type: application/json")?;
            easy.post(true)?;
            easy.post_fields_copy(json)?;
        }
        easy.http_headers(list)?;

        {
            let mut transfer = easy.transfer();
            transfer.header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    header_lines.push(s.trim_end().to_string());
                }
                true
            })?;
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer
                .perform()
                .with_context(|| format!("request to {} failed", url))?;
        }

        let status = easy.response_code().context("no response code")?;
        tracing::debug!(%url, status, "api response");
        Ok(ApiResponse {
            status,
            body,
            set_cookies: header_lines.iter().filter_map(|l| parse_set_cookie(l)).collect(),
        })
    }
}

/// `Set-Cookie: session=abc; HttpOnly; Path=/` -> `session=abc`.
fn parse_set_cookie(line: &str) -> Option<String> {
    let (name, value) = line.split_once(':')?;
    if !name.trim().eq_ignore_ascii_case("set-cookie") {
        return None;
    }
    let pair = value.split(';').next()?.trim();
    if pair.contains('=') && !pair.starts_with('=') {
        Some(pair.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_extracts_field() {
        assert_eq!(
            error_message(br#"{"error":"file too large"}"#).as_deref(),
            Some("file too large")
        );
        assert_eq!(error_message(br#"{"error":"  "}"#), None);
        assert_eq!(error_message(br#"{"message":"ok"}"#), None);
        assert_eq!(error_message(b"<html>"), None);
        assert_eq!(error_message(b""), None);
    }

    #[test]
    fn set_cookie_lines() {
        assert_eq!(
            parse_set_cookie("Set-Cookie: session=abc.def; HttpOnly; Path=/").as_deref(),
            Some("session=abc.def")
        );
        assert_eq!(
            parse_set_cookie("set-cookie: token=1").as_deref(),
            Some("token=1")
        );
        assert_eq!(parse_set_cookie("Content-Type: application/json"), None);
        assert_eq!(parse_set_cookie("Set-Cookie: broken"), None);
    }

    #[test]
    fn response_cookie_joins_pairs() {
        let r = ApiResponse {
            status: 200,
            body: Vec::new(),
            set_cookies: vec!["a=1".to_string(), "b=2".to_string()],
        };
        assert!(r.is_success());
        assert_eq!(r.cookie().as_deref(), Some("a=1; b=2"));
        assert!(ApiResponse::default().cookie().is_none());
    }

    #[test]
    fn client_rejects_invalid_base() {
        assert!(ApiClient::new("::nope", HttpConfig::default()).is_err());
        let c = ApiClient::new("http://127.0.0.1:5000/api", HttpConfig::default())
            .unwrap()
            .with_cookie(Some("session=x".to_string()));
        assert_eq!(c.cookie(), Some("session=x"));
    }
}
