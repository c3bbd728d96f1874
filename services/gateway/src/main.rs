//! Service binary
//!
//! Boots every configured symbol engine (recovery first), then runs
//! until interrupted. The client transport attaches to the dispatcher;
//! this binary owns process lifecycle, logging, and graceful shutdown.

use gateway::App;
use tracing::info;
use types::config::EngineConfig;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt::init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!(path = %path, "loading configuration");
            EngineConfig::from_file(&path)?
        }
        None => {
            info!("no config file given, using defaults");
            EngineConfig::default()
        }
    };

    info!(symbols = ?config.symbols, "starting matching engine");
    let app = App::build(config).await?;
    info!("engines ready, accepting traffic");

    tokio::signal::ctrl_c().await?;
    app.shutdown().await;

    Ok(())
}
