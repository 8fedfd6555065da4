//! Status probe trait

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ProbeError;
use crate::report::StatusSnapshot;

/// Read-only status query against a server's game listener
#[async_trait]
pub trait StatusProbe: Send + Sync {
    /// Query `address` (`host:port`)
    ///
    /// An unreachable server yields `Ok(StatusSnapshot::offline())`; only a
    /// server that answers with garbage is an error.
    async fn probe(&self, address: &str, timeout: Duration) -> Result<StatusSnapshot, ProbeError>;
}
