//! Interactive board: `quadrant board`.

use std::sync::Arc;

use anyhow::Result;
use tokio::io::BufReader;

use quadrant::app::App;
use quadrant::auth::session_from_config;
use quadrant::config::QuadrantConfig;

use super::open_store;

pub async fn cmd_board(config: &QuadrantConfig) -> Result<()> {
    let store = open_store(config)?;
    let auth = Arc::new(session_from_config(config));
    App::new(auth, store)
        .run(BufReader::new(tokio::io::stdin()))
        .await
}
