pub mod config;
pub mod logging;

pub mod api;
pub mod feedback;
pub mod session;
pub mod upload;
pub mod validate;
