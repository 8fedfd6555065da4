//! Registry commands

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use mw_core::ServerDescriptor;

use crate::ipc::WardenClient;
use crate::output::{print_info, print_success, print_warning};

/// Fields for a new registry entry; `None` keeps the registry default
#[derive(Debug, Clone, Default)]
pub struct RegisterArgs {
    pub name: String,
    pub path: PathBuf,
    pub script: Option<String>,
    pub address: Option<String>,
    pub rcon_host: Option<String>,
    pub rcon_port: Option<u16>,
    pub rcon_password: Option<String>,
}

/// Execute the register command
pub async fn register_command(client: &mut WardenClient, args: RegisterArgs) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let descriptor = build_descriptor(args, &cwd);

    if !descriptor.script_path().is_file() {
        print_warning(&format!(
            "Start script {} does not exist yet",
            descriptor.script_path().display()
        ));
    }

    let name = descriptor.name.clone();
    let path = descriptor.path.clone();
    if client.register(descriptor).await? {
        print_success(&format!("Updated {} ({})", name, path.display()));
    } else {
        print_success(&format!("Registered {} ({})", name, path.display()));
    }
    Ok(())
}

/// Execute the reload command
pub async fn reload_command(client: &mut WardenClient) -> Result<()> {
    let count = client.reload_registry().await?;
    print_info(&format!("Registry reloaded: {} server(s)", count));
    Ok(())
}

/// Resolve a relative server path against `cwd` and fill in defaults
fn build_descriptor(args: RegisterArgs, cwd: &Path) -> ServerDescriptor {
    let path = if args.path.is_absolute() {
        args.path
    } else {
        cwd.join(args.path)
    };

    let mut descriptor = ServerDescriptor::new(args.name, path);
    if let Some(script) = args.script {
        descriptor.script = script;
    }
    if let Some(address) = args.address {
        descriptor.address = address;
    }
    if let Some(host) = args.rcon_host {
        descriptor.rcon.host = host;
    }
    if let Some(port) = args.rcon_port {
        descriptor.rcon.port = port;
    }
    descriptor.rcon_password = args.rcon_password;
    descriptor
}

#[cfg(test)]
mod tests {
    use super::*;
    use mw_core::registry::{DEFAULT_ADDRESS, DEFAULT_RCON_PORT, DEFAULT_SCRIPT};

    #[test]
    fn test_relative_path_resolved_against_cwd() {
        let cwd = PathBuf::from("/srv/minecraft");
        let descriptor = build_descriptor(
            RegisterArgs {
                name: "survival".to_string(),
                path: PathBuf::from("survival"),
                ..Default::default()
            },
            &cwd,
        );

        assert_eq!(descriptor.path, cwd.join("survival"));
        assert_eq!(descriptor.script, DEFAULT_SCRIPT);
        assert_eq!(descriptor.address, DEFAULT_ADDRESS);
        assert_eq!(descriptor.rcon.port, DEFAULT_RCON_PORT);
    }

    #[cfg(unix)]
    #[test]
    fn test_overrides_applied() {
        let descriptor = build_descriptor(
            RegisterArgs {
                name: "modded".to_string(),
                path: PathBuf::from("/opt/modded"),
                script: Some("run.sh".to_string()),
                address: Some("10.0.0.5:25570".to_string()),
                rcon_host: Some("10.0.0.5".to_string()),
                rcon_port: Some(25580),
                rcon_password: Some("hunter2".to_string()),
            },
            Path::new("/ignored"),
        );

        assert_eq!(descriptor.path, PathBuf::from("/opt/modded"));
        assert_eq!(descriptor.script, "run.sh");
        assert_eq!(descriptor.rcon.address(), "10.0.0.5:25580");
        assert_eq!(descriptor.rcon_password.as_deref(), Some("hunter2"));
    }
}
