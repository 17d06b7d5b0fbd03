//! # Delta Trace CLI (`dt`)
//!
//! The `dt` binary drives the case pipeline: schema setup, case intake,
//! dossier and evidence ingestion, and graph inspection.
//!
//! ## Usage
//!
//! ```bash
//! dt --config ./config/dt.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `dt init` | Create the graph database schema |
//! | `dt parse <file>` | Parse a dossier and print its sections as JSON |
//! | `dt extract <file> --target <name>` | Print the entities found in a file |
//! | `dt intake <payload.json>` | Register a case |
//! | `dt ingest <case_id> <path>` | Extract and assemble evidence files |
//! | `dt dossier <case_id> <file>` | Parse and assemble a dossier |
//! | `dt graph <case_id>` | Print the case view JSON |
//! | `dt node <node_id>` | Print one node's labels and properties |
//! | `dt delete-case <case_id>` | Remove a case node and its edges |
//!
//! ## Logging
//!
//! Diagnostics go to stderr through `tracing`; set `DT_LOG` (for example
//! `DT_LOG=delta_trace=debug`) to raise verbosity. Command output goes to
//! stdout.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use delta_trace::ingest::StoreKind;
use delta_trace::{config, graph_cmd, ingest, intake, migrate, report};

/// Delta Trace CLI: dossier parsing, entity extraction and case graph
/// assembly.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. `parse` ignores it; `extract` falls back to defaults when the file
/// does not exist.
#[derive(Parser)]
#[command(
    name = "dt",
    about = "Delta Trace: turn dossiers and evidence files into a case graph",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/dt.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the graph database schema.
    ///
    /// Idempotent: running it multiple times is safe.
    Init,

    /// Parse an identity dossier and print every section as JSON.
    Parse {
        /// Dossier file (`.pdf` or `.txt`).
        file: PathBuf,
    },

    /// Extract phones, addresses, plates and identifiers from a file.
    Extract {
        /// Evidence file (`.pdf` or `.txt`).
        file: PathBuf,

        /// Full name of the person under investigation.
        #[arg(long, default_value = "")]
        target: String,
    },

    /// Register a case from a JSON intake payload.
    ///
    /// A missing `case_id` is replaced by the next `DT-<year>-<seq>` id.
    Intake {
        /// Payload file.
        payload: PathBuf,
    },

    /// Extract and assemble evidence for a case.
    ///
    /// Accepts one file or a directory, walked recursively for `.pdf` and
    /// `.txt` files. Each file becomes a Document node.
    Ingest {
        case_id: String,

        /// File or directory.
        path: PathBuf,

        /// Full name of the person under investigation.
        #[arg(long)]
        target: Option<String>,

        /// CPF or other document of the person under investigation.
        #[arg(long)]
        person_document: Option<String>,

        /// Graph to write to. `memory` runs the pipeline without persisting.
        #[arg(long, value_enum, default_value = "sqlite")]
        store: StoreKind,
    },

    /// Parse a dossier and assemble its subject and records for a case.
    Dossier { case_id: String, file: PathBuf },

    /// Print the positioned 2-hop view of a case.
    Graph { case_id: String },

    /// Print the labels and properties of one node.
    Node { node_id: i64 },

    /// Delete a case node and every edge touching it.
    ///
    /// Persons, entities and documents linked to the case are kept.
    DeleteCase { case_id: String },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("DT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    // Commands that don't require config
    match &cli.command {
        Commands::Parse { file } => {
            report::run_parse(file)?;
            return Ok(());
        }
        Commands::Extract { file, target } => {
            let cfg = if cli.config.exists() {
                config::load_config(&cli.config)?
            } else {
                config::Config::minimal()
            };
            report::run_extract(&cfg, file, target)?;
            return Ok(());
        }
        _ => {}
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Graph database initialized successfully.");
        }
        Commands::Intake { payload } => {
            intake::run_intake(&cfg, &payload).await?;
        }
        Commands::Ingest {
            case_id,
            path,
            target,
            person_document,
            store,
        } => {
            ingest::run_ingest(&cfg, &case_id, &path, target, person_document, store).await?;
        }
        Commands::Dossier { case_id, file } => {
            ingest::run_dossier(&cfg, &case_id, &file).await?;
        }
        Commands::Graph { case_id } => {
            graph_cmd::run_graph(&cfg, &case_id).await?;
        }
        Commands::Node { node_id } => {
            graph_cmd::run_node(&cfg, node_id).await?;
        }
        Commands::DeleteCase { case_id } => {
            graph_cmd::run_delete_case(&cfg, &case_id).await?;
        }
        Commands::Parse { .. } | Commands::Extract { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
