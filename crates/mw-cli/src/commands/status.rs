//! Status command implementation

use anyhow::Result;

use crate::ipc::WardenClient;
use crate::output::format_status;

/// Execute the status command
pub async fn status_command(client: &mut WardenClient, name: &str) -> Result<()> {
    let report = client.status(name).await?;
    print!("{}", format_status(&report));
    Ok(())
}
