//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module   | Commands handled                                          |
//! |----------|-----------------------------------------------------------|
//! | `board`  | `Board` (also the default with no subcommand)             |
//! | `tasks`  | `List`, `Add`, `Edit`, `Done`, `Undo`, `Move`, `Clear`    |
//! | `auth`   | `Login`, `Logout`, `Whoami`                               |
//! | `serve`  | `Serve`                                                   |
//! | `config` | `Config`                                                  |

pub mod auth;
pub mod board;
pub mod config;
pub mod serve;
pub mod tasks;

pub use auth::{cmd_login, cmd_logout, cmd_whoami};
pub use board::cmd_board;
pub use config::cmd_config;
pub use serve::cmd_serve;
pub use tasks::{cmd_add, cmd_clear, cmd_done, cmd_edit, cmd_list, cmd_move, cmd_undo};

use std::sync::Arc;

use anyhow::{Context, Result};

use quadrant::auth::session_from_config;
use quadrant::config::QuadrantConfig;
use quadrant::errors::BoardError;
use quadrant::store::SqliteTaskStore;
use quadrant_common::Identity;

fn open_store(config: &QuadrantConfig) -> Result<Arc<SqliteTaskStore>> {
    let path = config.db_path();
    let store = SqliteTaskStore::open(&path)
        .with_context(|| format!("Failed to open task database at {}", path.display()))?;
    Ok(Arc::new(store))
}

/// The persisted identity, or an error telling the user to sign in.
fn require_identity(config: &QuadrantConfig) -> Result<Identity> {
    let auth = session_from_config(config);
    match auth.restore()? {
        Some(identity) => Ok(identity),
        None => Err(BoardError::NotSignedIn).context("Run `quadrant login` first"),
    }
}
