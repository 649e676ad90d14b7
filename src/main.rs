//! # Repo Mirror CLI (`mirror`)
//!
//! Mirrors the markdown view of a remote repository into SQLite and serves
//! the update trigger.
//!
//! ## Usage
//!
//! ```bash
//! mirror --config ./config/mirror.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `mirror init` | Create the SQLite database and run schema migrations |
//! | `mirror update` | Rebuild the mirror from the configured branch |
//! | `mirror tree` | Print the stored tree |
//! | `mirror show <path>` | Print the stored content of one node |
//! | `mirror key add <token>` | Register a trigger bearer token |
//! | `mirror key revoke <token>` | Remove a trigger bearer token |
//! | `mirror serve` | Start the HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! mirror init
//! mirror key add "$(openssl rand -hex 16)"
//! mirror update --progress human
//! mirror update --tree 9fb037999f264ba9a7fc6274d15fa3ae2ab98312 --dry-run
//! mirror show docs/README.md
//! mirror serve
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use repo_mirror::{auth, browse, config, ingest, logging, migrate, progress, server};

/// Repo Mirror: a markdown mirror of a remote repository tree.
#[derive(Parser)]
#[command(
    name = "mirror",
    about = "Mirror a remote repository's markdown tree into SQLite",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/mirror.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent: running it multiple times is safe.
    Init,

    /// Wipe the stored tree and rebuild it from the remote.
    Update {
        /// Mirror this tree id instead of the head of the configured branch.
        #[arg(long)]
        tree: Option<String>,

        /// Fetch the listing and print counts without writing to the database.
        #[arg(long)]
        dry_run: bool,

        /// Progress output on stderr: `human`, `json`, or `off`.
        /// Defaults to `human` when stderr is a terminal.
        #[arg(long)]
        progress: Option<String>,
    },

    /// Print the stored tree, directories suffixed with `/`.
    Tree,

    /// Print the stored content of the node at a repository path.
    Show {
        /// Slash-separated path, e.g. `docs/guide.md`.
        path: String,
    },

    /// Manage trigger bearer tokens.
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[derive(Subcommand)]
enum KeyAction {
    /// Register a token.
    Add { token: String },
    /// Remove a token.
    Revoke { token: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    logging::init_tracing(&cfg.logging);

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Update {
            tree,
            dry_run,
            progress,
        } => {
            let mode = progress::ProgressMode::from_flag(progress.as_deref())?;
            ingest::run_update(&cfg, tree, dry_run, mode).await?;
        }
        Commands::Tree => {
            browse::run_tree(&cfg).await?;
        }
        Commands::Show { path } => {
            browse::run_show(&cfg, &path).await?;
        }
        Commands::Key { action } => match action {
            KeyAction::Add { token } => auth::run_key_add(&cfg, &token).await?,
            KeyAction::Revoke { token } => auth::run_key_revoke(&cfg, &token).await?,
        },
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
