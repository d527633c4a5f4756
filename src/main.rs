//! # Documint CLI (`dmt`)
//!
//! The `dmt` binary is the terminal interface for Documint. It provides
//! commands for database initialization, connecting and managing Contentful
//! spaces, listing content types, cross-space search, and starting the
//! dashboard HTTP API.
//!
//! ## Usage
//!
//! ```bash
//! dmt --config ./config/documint.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `dmt init` | Create the SQLite database and run schema migrations |
//! | `dmt spaces --user <id>` | List the user's connected spaces |
//! | `dmt connect` | Verify a credential and connect a space |
//! | `dmt rename <id>` | Rename a connected space |
//! | `dmt disconnect <id>` | Disconnect a space |
//! | `dmt types <id>` | List a space's content types |
//! | `dmt search "<query>"` | Search entries across connected spaces |
//! | `dmt serve` | Start the dashboard HTTP API |
//!
//! ## Examples
//!
//! ```bash
//! # Connect two spaces
//! dmt connect --user u1 --space-id abc123 --token CFPAT-aaa
//! dmt connect --user u1 --space-id def456 --token CFPAT-bbb --name "Blog"
//!
//! # Search all spaces, newest first
//! dmt search "pricing page" --user u1
//!
//! # Search one space, drafts only
//! dmt search "pricing" --user u1 --space abc123 --status draft
//!
//! # Second page, 10 per page
//! dmt search "pricing" --user u1 --page 2 --page-size 10
//! ```

mod cli_dates;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use documint::models::{EntryStatus, SearchRequest, SearchScope, SortKey};
use documint::{config, migrate, server, spaces};

/// Documint CLI — cross-space content search for Contentful-backed
/// dashboards.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/documint.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "dmt",
    about = "Documint — cross-space content search for Contentful-backed dashboards",
    version,
    long_about = "Documint connects multiple Contentful spaces per user and searches entries \
    across all of them at once, normalizing heterogeneous entry schemas into a uniform record \
    and merging per-space result pages. Exposes a CLI and a dashboard HTTP API."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/documint.toml`. Database, remote API, and
    /// server settings are read from this file.
    #[arg(long, global = true, default_value = "./config/documint.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the credentials table.
    /// This command is idempotent — running it multiple times is safe.
    Init,

    /// List connected spaces for a user.
    Spaces {
        /// User (tenant) id owning the credentials.
        #[arg(long)]
        user: String,
    },

    /// Connect a Contentful space.
    ///
    /// Verifies the space id and access token against the remote API
    /// before persisting. A rejected token prints a credentials hint
    /// instead of a generic failure.
    Connect {
        /// User (tenant) id owning the credential.
        #[arg(long)]
        user: String,

        /// External space id at the content API.
        #[arg(long = "space-id")]
        space_id: String,

        /// Management access token for the space.
        #[arg(long = "token")]
        access_token: String,

        /// Display name; defaults to the remote space name.
        #[arg(long)]
        name: Option<String>,

        /// Preferred locale used when normalizing entries from this space.
        #[arg(long)]
        locale: Option<String>,
    },

    /// Rename a connected space.
    Rename {
        /// Credential id (see `dmt spaces`).
        id: String,

        #[arg(long)]
        user: String,

        /// New display name.
        #[arg(long)]
        name: String,
    },

    /// Disconnect a space.
    Disconnect {
        /// Credential id (see `dmt spaces`).
        id: String,

        #[arg(long)]
        user: String,
    },

    /// List a space's content types, sorted by name.
    Types {
        /// Credential id or external space id.
        id: String,

        #[arg(long)]
        user: String,
    },

    /// Search entries across connected spaces.
    ///
    /// Queries every connected space concurrently (or one space with
    /// `--space`), merges the normalized results, and prints one page.
    /// A space that fails to answer is skipped; the search only fails
    /// when every space fails.
    Search {
        /// Full-text query.
        query: String,

        #[arg(long)]
        user: String,

        /// Restrict to one space (credential id or external space id).
        #[arg(long)]
        space: Option<String>,

        /// Filter by content type id.
        #[arg(long = "content-type")]
        content_type: Option<String>,

        /// Filter by status: `published` or `draft`.
        #[arg(long)]
        status: Option<String>,

        /// Sort key: `updated` (default), `created`, or `title`.
        #[arg(long)]
        sort: Option<String>,

        /// Only entries updated on or after this date (YYYY-MM-DD).
        #[arg(long = "updated-after")]
        updated_after: Option<String>,

        /// Only entries updated on or before this date (YYYY-MM-DD).
        #[arg(long = "updated-before")]
        updated_before: Option<String>,

        /// Filter by tag id; may be repeated.
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// 1-based page number.
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Results per page.
        #[arg(long = "page-size")]
        page_size: Option<u32>,
    },

    /// Start the dashboard HTTP API.
    ///
    /// Binds to the address configured in `[server].bind` and serves the
    /// space and search endpoints consumed by the web dashboard.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "documint=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Spaces { user } => {
            spaces::run_spaces(&cfg, &user).await?;
        }
        Commands::Connect {
            user,
            space_id,
            access_token,
            name,
            locale,
        } => {
            spaces::run_connect(&cfg, &user, &space_id, &access_token, name, locale).await?;
        }
        Commands::Rename { id, user, name } => {
            spaces::run_rename(&cfg, &user, &id, &name).await?;
        }
        Commands::Disconnect { id, user } => {
            spaces::run_disconnect(&cfg, &user, &id).await?;
        }
        Commands::Types { id, user } => {
            spaces::run_types(&cfg, &user, &id).await?;
        }
        Commands::Search {
            query,
            user,
            space,
            content_type,
            status,
            sort,
            updated_after,
            updated_before,
            tags,
            page,
            page_size,
        } => {
            let request = SearchRequest {
                query,
                content_type,
                status: status
                    .as_deref()
                    .map(|s| s.parse::<EntryStatus>().map_err(anyhow::Error::msg))
                    .transpose()?,
                updated_after: updated_after
                    .as_deref()
                    .map(cli_dates::parse_day_start)
                    .transpose()?,
                updated_before: updated_before
                    .as_deref()
                    .map(cli_dates::parse_day_end)
                    .transpose()?,
                tags,
                sort: sort
                    .as_deref()
                    .map(|s| s.parse::<SortKey>().map_err(anyhow::Error::msg))
                    .transpose()?
                    .unwrap_or_default(),
                page,
                page_size: page_size.unwrap_or(cfg.search.page_size),
                scope: match space {
                    Some(id) => SearchScope::Space(id),
                    None => SearchScope::AllSpaces,
                },
            };

            spaces::run_search(&cfg, &user, &request).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
