//! List command implementation

use anyhow::Result;

use crate::ipc::WardenClient;
use crate::output::format_servers;

/// Execute the list command
///
/// `running_only` hides servers that are registered but stopped.
pub async fn list_command(client: &mut WardenClient, running_only: bool) -> Result<()> {
    let mut servers = client.list_servers().await?;

    if running_only {
        servers.retain(|s| s.pid.is_some());
    }

    println!("{}", format_servers(&servers));
    Ok(())
}
