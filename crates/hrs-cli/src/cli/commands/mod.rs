//! CLI command handlers. Each command is in its own file.

mod analyze;
mod login;
mod logout;
mod register;
mod submit;
mod upload;
mod whoami;

pub use analyze::run_analyze;
pub use login::run_login;
pub use logout::run_logout;
pub use register::run_register;
pub use submit::run_submit;
pub use upload::run_upload;
pub use whoami::run_whoami;

use anyhow::Result;
use hrs_core::api::ApiClient;
use hrs_core::config::HrsConfig;
use hrs_core::session::{Session, SessionStore};

/// Resume the saved session; the server decides whether it is still valid.
async fn session_from_store(cfg: &HrsConfig, store: &SessionStore) -> Result<Session> {
    let cookie = store.load()?.map(|s| s.cookie);
    Session::init(ApiClient::from_config(cfg)?.with_cookie(cookie)).await
}
