//! CLI command implementations

mod config;
mod lifecycle;
mod list;
mod registry;
mod status;
mod tunnel;

pub use config::{config_init, config_path, config_show};
pub use lifecycle::{restart_command, start_command, stop_command};
pub use list::list_command;
pub use registry::{register_command, reload_command, RegisterArgs};
pub use status::status_command;
pub use tunnel::{tunnel_start_command, tunnel_status_command, tunnel_stop_command};
