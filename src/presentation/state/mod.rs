mod app_state;
mod bootstrap;

pub use app_state::{AppState, ServiceStatus};
pub use bootstrap::{bootstrap, bootstrap_from_settings};
