//! # Backend Service
//!
//! Thin entry point that delegates to lib-web for server setup.
//!
//! Usage: `backend [BIND_ADDRESS]`. Without an argument the address comes
//! from the `BIND_ADDRESS` environment variable.

use lib_web::{start_server, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = ServerConfig {
        bind_address: std::env::args().nth(1),
    };

    start_server(config).await
}
