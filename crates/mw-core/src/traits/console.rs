//! Remote console trait

use async_trait::async_trait;

use crate::error::RconError;
use crate::registry::RconEndpoint;

/// Sends one administrative command to a server and returns its reply
///
/// Implementations open a fresh authenticated session for every call.
#[async_trait]
pub trait ConsoleClient: Send + Sync {
    async fn execute(
        &self,
        endpoint: &RconEndpoint,
        secret: &str,
        command: &str,
    ) -> Result<String, RconError>;
}
