//! Tunnel commands

use anyhow::Result;

use crate::ipc::WardenClient;
use crate::output::{print_info, print_tunnel_event};

pub async fn tunnel_start_command(client: &mut WardenClient) -> Result<()> {
    let event = client.tunnel_start().await?;
    print_tunnel_event(&event);
    Ok(())
}

pub async fn tunnel_stop_command(client: &mut WardenClient) -> Result<()> {
    let event = client.tunnel_stop().await?;
    print_tunnel_event(&event);
    Ok(())
}

pub async fn tunnel_status_command(client: &mut WardenClient) -> Result<()> {
    let state = client.tunnel_status().await?;
    print_info(&format!("Tunnel: {}", state));
    Ok(())
}
