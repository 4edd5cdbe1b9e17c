//! # Realm CLI (`realm`)
//!
//! ```bash
//! realm --config ./realm.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `realm init` | Create the blob cache database |
//! | `realm summarize <file\|->` | Print the summary and cover images of a note |
//! | `realm tag <names...>` | Print each tag name with its sanitized key |
//! | `realm color <labels...>` | Print the display color of each label |
//! | `realm feed <kind>` | Page through a feed and print items as JSON lines |
//! | `realm tags [--owner <addr>]` | List tags in use |
//! | `realm proposal <id> [--voter <addr>]` | Print a proposal and a voter's ballots |
//! | `realm cat <hash>` | Print a note body from the blob store |
//! | `realm publish <file> --signer <addr>` | Publish a markdown note |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use realm::feed::FeedKind;
use realm::{config, feed, inspect, logging, migrate, notes};

#[derive(Parser)]
#[command(
    name = "realm",
    about = "Realm: notes, tags and proposals on a decentralized database",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Only `[server].url` is required; see `realm.example.toml`.
    #[arg(long, global = true, default_value = "./realm.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the blob cache database. Safe to run repeatedly.
    Init,

    /// Summarize a markdown file (`-` reads stdin).
    ///
    /// Prints `{"summary": ..., "images": [...]}` as JSON. Needs no config.
    Summarize { input: PathBuf },

    /// Show the sanitized key of each tag name.
    Tag {
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Show the deterministic color of each label.
    Color {
        #[arg(required = true)]
        labels: Vec<String>,
    },

    /// Load pages of a feed and print its items, one JSON object per line.
    Feed {
        kind: FeedKind,

        /// Only notes carrying this tag (notes and user-notes).
        #[arg(long)]
        tag: Option<String>,

        /// Owner address, required for user-notes.
        #[arg(long)]
        owner: Option<String>,

        /// Number of pages to load.
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
        pages: u16,
    },

    /// List the tags in use, optionally only on one owner's notes.
    Tags {
        #[arg(long)]
        owner: Option<String>,
    },

    /// Print one proposal with its choices.
    Proposal {
        id: String,

        /// Also print this address's votes on the proposal.
        #[arg(long)]
        voter: Option<String>,
    },

    /// Print a blob by content hash, reading through the local cache.
    Cat { hash: String },

    /// Publish a markdown file (`-` reads stdin) as a new note.
    Publish {
        input: PathBuf,

        /// Address of the signing wallet.
        #[arg(long)]
        signer: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let cli = Cli::parse();

    // Commands that don't require config
    match &cli.command {
        Commands::Summarize { input } => return inspect::run_summarize(input),
        Commands::Tag { names } => return inspect::run_tag(names),
        Commands::Color { labels } => return inspect::run_color(labels),
        _ => {}
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Cache initialized at {}.", cfg.cache.path.display());
        }
        Commands::Feed {
            kind,
            tag,
            owner,
            pages,
        } => {
            feed::run_feed(&cfg, kind, tag, owner, pages as usize).await?;
        }
        Commands::Tags { owner } => {
            feed::run_tags(&cfg, owner).await?;
        }
        Commands::Proposal { id, voter } => {
            feed::run_proposal(&cfg, &id, voter).await?;
        }
        Commands::Cat { hash } => {
            notes::run_cat(&cfg, &hash).await?;
        }
        Commands::Publish { input, signer } => {
            notes::run_publish(&cfg, &input, &signer).await?;
        }
        Commands::Summarize { .. } | Commands::Tag { .. } | Commands::Color { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
