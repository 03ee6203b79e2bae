//! Product Studio CLI Tool
//!
//! Removes the background from a product photo, adds a drop shadow and
//! places it on a fixed-aspect canvas.

#[cfg(feature = "cli")]
use product_studio::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
