//! OS process handles for servers and the tunnel

mod handle;

pub use handle::{ProcessHandle, SystemLauncher};
