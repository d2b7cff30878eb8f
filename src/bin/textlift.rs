//! textlift - batch OCR HTTP service
//!
//! Binary entry point: loads configuration from `textlift.*` files and
//! `TEXTLIFT_*` environment variables, then serves the REST API until
//! SIGTERM or Ctrl+C.

use mimalloc::MiMalloc;
use textlift::ServiceConfig;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pick up a local .env before reading the environment
    dotenvy::dotenv().ok();

    // Load configuration
    let config = ServiceConfig::load()?;

    // Start server
    textlift::server::start_server(config).await?;

    Ok(())
}
