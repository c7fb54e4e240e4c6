use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use quadrant::config::QuadrantConfig;
use quadrant::logging::{self, LogTarget};

mod cmd;

#[derive(Parser)]
#[command(name = "quadrant")]
#[command(version, about = "Eisenhower-matrix task board with live sync")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to quadrant.toml (defaults to $QUADRANT_CONFIG or the platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open the interactive board (default)
    Board,
    /// List tasks in board order
    List,
    /// Add a task
    Add {
        text: String,
        /// Quadrant: 1-4 or its id (defaults to viktigt_bratttom)
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Edit a task's text and/or quadrant
    Edit {
        /// Board number or id prefix
        task: String,
        #[arg(long)]
        text: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Mark a task completed
    Done { task: String },
    /// Move a completed task back to its quadrant
    Undo { task: String },
    /// Move a task to another quadrant
    Move { task: String, category: String },
    /// Delete all completed tasks
    Clear,
    /// Sign in with the configured provider
    Login,
    /// Sign out and forget the saved session
    Logout,
    /// Show who is signed in
    Whoami,
    /// Serve the board over HTTP and WebSocket
    Serve {
        /// Port to serve on (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Enable dev mode (permissive CORS, no origin check, bind all interfaces)
        #[arg(long)]
        dev: bool,

        /// Open the board JSON in a browser after the server starts
        #[arg(long)]
        open: bool,
    },
    /// View, validate or create configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Write a default quadrant.toml
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let (config, config_path) = QuadrantConfig::resolve(cli.config.as_deref())?;
    let command = cli.command.unwrap_or(Commands::Board);

    // The board owns the terminal; its logs go to a file.
    let log_dir = config.log_dir();
    let target = match command {
        Commands::Board => LogTarget::Dir(&log_dir),
        _ => LogTarget::Stderr,
    };
    let _guard = logging::init(&config.log, cli.verbose, target)?;

    match command {
        Commands::Board => cmd::cmd_board(&config).await?,
        Commands::List => cmd::cmd_list(&config).await?,
        Commands::Add { text, category } => {
            cmd::cmd_add(&config, &text, category.as_deref()).await?
        }
        Commands::Edit {
            task,
            text,
            category,
        } => cmd::cmd_edit(&config, &task, text.as_deref(), category.as_deref()).await?,
        Commands::Done { task } => cmd::cmd_done(&config, &task).await?,
        Commands::Undo { task } => cmd::cmd_undo(&config, &task).await?,
        Commands::Move { task, category } => cmd::cmd_move(&config, &task, &category).await?,
        Commands::Clear => cmd::cmd_clear(&config).await?,
        Commands::Login => cmd::cmd_login(&config).await?,
        Commands::Logout => cmd::cmd_logout(&config).await?,
        Commands::Whoami => cmd::cmd_whoami(&config)?,
        Commands::Serve { port, dev, open } => cmd::cmd_serve(&config, port, dev, open).await?,
        Commands::Config { command } => cmd::cmd_config(&config, &config_path, command)?,
    }

    Ok(())
}
