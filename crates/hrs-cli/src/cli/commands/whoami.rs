//! `hrs whoami` – show the user behind the saved session.

use anyhow::Result;
use hrs_core::config::HrsConfig;
use hrs_core::session::SessionStore;

use super::session_from_store;

pub async fn run_whoami(cfg: &HrsConfig, store: &SessionStore) -> Result<()> {
    let session = session_from_store(cfg, store).await?;
    match session.user() {
        Some(user) => {
            let admin = if user.is_admin() { " [admin]" } else { "" };
            println!("{} (id {}, role {}){}", user.username, user.id, user.role, admin);
        }
        None => {
            // Stored cookie was rejected; drop it.
            store.clear()?;
            println!("Not logged in.");
        }
    }
    Ok(())
}
