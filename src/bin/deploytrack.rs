//! # Deploytrack CLI
//!
//! Command-line interface for triggering and tracking CI/CD deployment runs.

mod cli;

use anyhow::Context;
use clap::{Parser, Subcommand};
use deploy_tracker::{logging, TrackerConfig, TrackerContext};
use std::path::PathBuf;
use tracing::info;

use cli::{
    handle_config_command, handle_dismiss_command, handle_history_command, handle_logs_command,
    handle_prune_command, handle_replay_command, handle_show_command, handle_status_command,
    handle_track_command, handle_trigger_command, handle_watch_command, handle_workflows_command,
};

#[derive(Parser, Debug)]
#[command(name = "deploytrack")]
#[command(about = "Track CI/CD deployment runs and keep their status in sync")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Configuration file path (default: ./deploytrack.toml or ~/.deploytrack/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Emit log lines as JSON
    #[arg(long)]
    log_json: bool,

    /// Subcommands
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List tracked deployments, refreshing active ones
    Status {
        /// Only show stored active deployments, without contacting the run source
        #[arg(long)]
        active: bool,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Live dashboard of tracked deployments (Ctrl-C to exit)
    Watch {
        /// Seconds between refreshes (default: dashboard.refresh_interval_secs)
        #[arg(short, long)]
        interval: Option<u64>,
    },
    /// Show one tracked deployment
    Show {
        /// Run identifier
        #[arg(value_name = "RUN_ID")]
        id: String,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Start tracking an existing run
    Track {
        /// Run identifier
        #[arg(value_name = "RUN_ID")]
        run_id: String,
        /// Workflow file or name
        #[arg(short, long)]
        workflow: String,
        /// Branch the run was started on
        #[arg(short, long)]
        branch: String,
        /// Repository in owner/repo form (default: gateway.repo)
        #[arg(short, long)]
        repo: Option<String>,
    },
    /// Stop tracking a run
    Dismiss {
        /// Run identifier
        #[arg(value_name = "RUN_ID")]
        id: String,
    },
    /// Print the logs of a run
    Logs {
        /// Run identifier
        #[arg(value_name = "RUN_ID")]
        run_id: String,
    },
    /// Remove deployments older than the retention window
    Prune,
    /// Dispatch a workflow and track the run it creates
    Trigger {
        /// Workflow file or name
        #[arg(short, long)]
        workflow: String,
        /// Branch to run on
        #[arg(short, long)]
        branch: String,
        /// Workflow input as key=value (repeatable)
        #[arg(short, long = "input", value_name = "KEY=VALUE")]
        inputs: Vec<String>,
    },
    /// Trigger a previous deployment again with the same inputs
    Replay {
        /// Run id of the deployment to replay (default: the latest)
        #[arg(value_name = "RUN_ID")]
        id: Option<String>,
    },
    /// List recently triggered deployments
    History {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// List dispatchable workflows, or the inputs one of them declares
    Workflows {
        /// Workflow file or name whose inputs to show
        workflow: Option<String>,
        /// Branch or tag to read the workflow definition from
        #[arg(short, long = "ref", default_value = "")]
        branch: String,
    },
    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Write a configuration file with default values
    Init {
        /// Destination (default: ~/.deploytrack/config.toml)
        #[arg(short, long)]
        path: Option<PathBuf>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init_console_logging(cli.verbose, cli.log_json);

    let config =
        TrackerConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    // Config commands must work even when services cannot be built
    let command = match cli.command {
        Commands::Config(config_cmd) => return handle_config_command(config_cmd, &config),
        other => other,
    };

    let context =
        TrackerContext::from_config(config).context("Failed to initialize tracker services")?;
    info!(repo = %context.config.gateway.repo, "Deploytrack CLI starting");

    match command {
        Commands::Status { active, json } => handle_status_command(&context, active, json).await,
        Commands::Watch { interval } => handle_watch_command(&context, interval).await,
        Commands::Show { id, json } => handle_show_command(&context, &id, json).await,
        Commands::Track {
            run_id,
            workflow,
            branch,
            repo,
        } => handle_track_command(&context, &run_id, &workflow, &branch, repo.as_deref()).await,
        Commands::Dismiss { id } => handle_dismiss_command(&context, &id).await,
        Commands::Logs { run_id } => handle_logs_command(&context, &run_id).await,
        Commands::Prune => handle_prune_command(&context).await,
        Commands::Trigger {
            workflow,
            branch,
            inputs,
        } => handle_trigger_command(&context, &workflow, &branch, &inputs).await,
        Commands::Replay { id } => handle_replay_command(&context, id.as_deref()).await,
        Commands::History { limit, json } => handle_history_command(&context, limit, json).await,
        Commands::Workflows { workflow, branch } => {
            handle_workflows_command(&context, workflow.as_deref(), &branch).await
        }
        Commands::Config(_) => Ok(()),
    }
}
