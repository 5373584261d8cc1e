//! Application lifecycle commands (`opa install`, `remove`, `start`, `list`).

mod install;
mod list;
mod paths;
mod remove;
mod start;

pub use install::{install_app, InstallRequest};
pub use list::list_apps;
pub use paths::AppsLayout;
pub use remove::{remove_app, RemoveRequest};
pub use start::{start_app, StartRequest};
