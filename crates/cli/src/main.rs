use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use drover_core::workspace_manager::{WorkspaceManager, WorkspaceManagerConfig};
use tracing::debug;

mod commands;
mod logging;

/// Drover - A declarative task orchestrator
#[derive(Parser)]
#[command(name = "drover")]
#[command(about = "Run declared tasks in dependency order, from unit tests to releases")]
#[command(version)]
struct Cli {
    /// Path to the workspace root (defaults to current directory)
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Enable debug logging (also DROVER_VERBOSE)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List invocable tasks
    List,
    /// Show execution plan for a task without running it
    Plan {
        /// Name of the task to resolve
        task: String,
    },
    /// Run a task and everything it depends on
    Run {
        /// Name of the task to run
        task: String,
        /// Pass the release inspection gate (also DROVER_CONFIRM_RELEASE)
        #[arg(long)]
        confirm_release: bool,
    },
    /// Show the task dependency graph
    Graph,
    /// Print the JSON schema of the workspace settings file
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    // The schema does not depend on any workspace
    if let Commands::Schema = cli.command {
        return commands::schema::execute();
    }

    // Initialize workspace manager with all business logic
    let manager = WorkspaceManager::new(WorkspaceManagerConfig {
        workspace_root: cli.workspace,
    })
    .await
    .map_err(|e| anyhow::anyhow!("Failed to initialize workspace: {}", e))?;
    debug!(
        root = %manager.root.display(),
        tasks = manager.graph.list_all().len(),
        "workspace loaded"
    );

    // Execute command (CLI layer only handles presentation)
    match cli.command {
        Commands::List => commands::list::execute(&manager),
        Commands::Plan { task } => commands::plan::execute(&manager, &task).await,
        Commands::Run {
            task,
            confirm_release,
        } => commands::run::execute(&manager, &task, confirm_release).await,
        Commands::Graph => commands::graph::execute(&manager),
        Commands::Schema => commands::schema::execute(),
    }
}
