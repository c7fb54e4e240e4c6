//! Board server command: `quadrant serve`.

use anyhow::Result;

use quadrant::config::QuadrantConfig;
use quadrant::server::{ServerConfig, start_server};

use super::{open_store, require_identity};

pub async fn cmd_serve(
    config: &QuadrantConfig,
    port: Option<u16>,
    dev: bool,
    open: bool,
) -> Result<()> {
    let owner = require_identity(config)?;
    let store = open_store(config)?;
    let server = ServerConfig {
        port: port.unwrap_or(config.server.port),
        dev_mode: dev || config.server.dev,
    };

    // No browser inside containers in dev mode.
    if open && !server.dev_mode {
        let url = format!("http://localhost:{}/api/board", server.port);
        tokio::spawn(async move {
            tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;
            if let Err(e) = open::that(&url) {
                tracing::warn!(error = %e, "failed to open browser");
            }
        });
    }

    start_server(server, store, owner).await
}
