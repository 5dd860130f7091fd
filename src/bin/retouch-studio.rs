//! Retouch Studio service binary
//!
//! Runs the HTTP clean-up/retouch service with the configured segmentation
//! backend and remote generation endpoint.

#[cfg(feature = "cli")]
use retouch_studio::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> retouch_studio::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
