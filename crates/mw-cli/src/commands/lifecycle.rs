//! Start, stop and restart

use anyhow::Result;

use crate::ipc::WardenClient;
use crate::output::{
    describe_restart, describe_start, describe_stop, print_success, print_tunnel_event,
    print_warning,
};

/// Execute the start command
pub async fn start_command(
    client: &mut WardenClient,
    name: &str,
    ensure_tunnel: Option<bool>,
) -> Result<()> {
    let report = client.start(name, ensure_tunnel).await?;

    if let Some(event) = &report.tunnel {
        print_tunnel_event(event);
    }
    print_success(&describe_start(&report));
    Ok(())
}

/// Execute the stop command
pub async fn stop_command(
    client: &mut WardenClient,
    name: &str,
    stop_tunnel: Option<bool>,
) -> Result<()> {
    let report = client.stop(name, stop_tunnel).await?;

    if report.was_graceful() {
        print_success(&describe_stop(&report));
    } else {
        print_warning(&describe_stop(&report));
    }
    if let Some(event) = &report.tunnel {
        print_tunnel_event(event);
    }
    Ok(())
}

/// Execute the restart command
pub async fn restart_command(client: &mut WardenClient, name: &str) -> Result<()> {
    let report = client.restart(name).await?;

    if !report.stop.was_graceful() {
        print_warning(&describe_stop(&report.stop));
    }
    if let Some(event) = &report.start.tunnel {
        print_tunnel_event(event);
    }
    print_success(&describe_restart(&report));
    Ok(())
}
