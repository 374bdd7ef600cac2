//! # expediter
//!
//! CLI for the orchestration engine. Each invocation is one stateless
//! activation against the shared `SQLite` database: submit a request,
//! inject a completion event, or manage the tool registry.

#![deny(unsafe_code)]

mod commands;
mod settings;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::CompleteArgs;

/// Durable multi-worker orchestration engine.
#[derive(Parser, Debug)]
#[command(name = "expediter", about = "Durable multi-worker orchestration engine")]
struct Cli {
    /// Path to the settings file (default: `~/.expediter/settings.json`).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start a new orchestration from a free-text request.
    Submit {
        /// The request text.
        text: String,
    },
    /// Inject one task completion event.
    Complete {
        /// Full completion event as raw JSON (overrides the field args).
        #[arg(long)]
        event: Option<String>,
        /// Orchestration id.
        #[arg(long)]
        orchestration_id: Option<String>,
        /// Batch id from the dispatch message.
        #[arg(long)]
        batch_id: Option<String>,
        /// Invocation id from the dispatch message.
        #[arg(long)]
        tool_use_id: Option<String>,
        /// Task (tool) name.
        #[arg(long)]
        node: Option<String>,
        /// Result payload as raw JSON.
        #[arg(long)]
        data: Option<String>,
    },
    /// Register a tool from a JSON registration record.
    RegisterTool {
        /// Read the record from this file instead of stdin.
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Register the demo fast-food worker set.
    SeedTools,
    /// List registered tools.
    ListTools,
    /// Dump one orchestration's durable state.
    Show {
        /// Orchestration id.
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("expediter=info,expediter_runtime=info,expediter_store=warn")
        }))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = match &cli.settings {
        Some(path) => settings::load_settings_from_path(path)?,
        None => settings::load_settings()?,
    };

    match cli.command {
        Command::Submit { text } => commands::submit(&settings, &text).await,
        Command::Complete {
            event,
            orchestration_id,
            batch_id,
            tool_use_id,
            node,
            data,
        } => {
            commands::complete(
                &settings,
                CompleteArgs {
                    event_json: event,
                    orchestration_id,
                    batch_id,
                    tool_use_id,
                    node,
                    data,
                },
            )
            .await
        }
        Command::RegisterTool { file } => commands::register_tool(&settings, file.as_ref()),
        Command::SeedTools => commands::seed_tools(&settings),
        Command::ListTools => commands::list_tools(&settings),
        Command::Show { id } => commands::show(&settings, &id),
    }
}
