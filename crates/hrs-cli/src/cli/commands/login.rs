//! `hrs login <username>` – authenticate and persist the session cookie.

use anyhow::{Context, Result};
use hrs_core::api::ApiClient;
use hrs_core::config::HrsConfig;
use hrs_core::session::{Session, SessionStore};
use std::io::{self, BufRead, Write};

const PASSWORD_ENV: &str = "HRS_PASSWORD";

pub async fn run_login(
    cfg: &HrsConfig,
    store: &SessionStore,
    username: &str,
    password: Option<String>,
) -> Result<()> {
    let password = resolve_password(password)?;
    let mut session = Session::init(ApiClient::from_config(cfg)?).await?;
    let user = session.login(username, &password).await?;
    println!("Logged in as {} ({}).", user.username, user.role);

    let persisted = session
        .to_persisted()
        .ok_or_else(|| anyhow::anyhow!("no session cookie to save"))?;
    store.save(&persisted)?;
    tracing::debug!(path = %store.path().display(), "saved session");
    Ok(())
}

/// `--password`, then `HRS_PASSWORD`, then a prompt on stdin.
pub(super) fn resolve_password(password: Option<String>) -> Result<String> {
    let password = match password.or_else(|| std::env::var(PASSWORD_ENV).ok()) {
        Some(p) => p,
        None => prompt_password()?,
    };
    if password.is_empty() {
        anyhow::bail!("password is required");
    }
    Ok(password)
}

fn prompt_password() -> Result<String> {
    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("read password")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
