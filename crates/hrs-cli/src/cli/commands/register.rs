//! `hrs register <username>` – create a regular account.

use anyhow::Result;
use hrs_core::api::ApiClient;
use hrs_core::config::HrsConfig;
use hrs_core::session::Session;

use super::login::resolve_password;

pub async fn run_register(cfg: &HrsConfig, username: &str, password: Option<String>) -> Result<()> {
    let password = resolve_password(password)?;
    let session = Session::init(ApiClient::from_config(cfg)?).await?;
    let user = session.register(username, &password).await?;
    println!("Registered {} (id {}). Run `hrs login {}` to sign in.", user.username, user.id, user.username);
    Ok(())
}
