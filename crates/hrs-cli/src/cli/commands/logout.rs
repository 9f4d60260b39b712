//! `hrs logout` – end the session on the server and forget it locally.

use anyhow::Result;
use hrs_core::api::ApiClient;
use hrs_core::config::HrsConfig;
use hrs_core::session::{Session, SessionStore};

pub async fn run_logout(cfg: &HrsConfig, store: &SessionStore) -> Result<()> {
    let Some(saved) = store.load()? else {
        println!("Not logged in.");
        return Ok(());
    };
    let client = ApiClient::from_config(cfg)?.with_cookie(Some(saved.cookie));
    let mut session = Session::init(client).await?;
    session.teardown().await?;
    store.clear()?;
    println!("Logged out.");
    Ok(())
}
