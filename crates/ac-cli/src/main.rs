mod commands;
mod roster;

use std::path::PathBuf;

use ac_core::config::Config;
use ac_telemetry::logging::{self, LogFormat};
use clap::{Parser, Subcommand};

use crate::roster::Roster;

/// agent-crew CLI -- discover experts and delegate work across agent teams.
#[derive(Parser)]
#[command(name = "crew", version, about)]
struct Cli {
    /// Team roster file (TOML). Defaults to the built-in two-team roster.
    #[arg(long, global = true)]
    roster: Option<PathBuf>,

    /// Config file. Defaults to ~/.agent-crew/config.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show every team and agent (default when no subcommand is given).
    Status,

    /// Find experts whose role or specialization matches a keyword.
    Find {
        keyword: String,
    },

    /// Recommend a cross-team group for a project description.
    Recommend {
        description: String,
    },

    /// Delegate a task from one agent to an agent on any team.
    Delegate {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        /// `low`, `medium`, `high`, `critical` or 1-5.
        #[arg(long, default_value = "medium")]
        priority: String,
    },

    /// Split a task across one expert per expertise area.
    Collaborate {
        description: String,
        /// Expertise keyword; repeat for several areas.
        #[arg(short, long = "expertise", required = true)]
        expertise: Vec<String>,
        /// Name recorded as the requester of every sub-task.
        #[arg(long, default_value = "coordinator")]
        lead: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    logging::init(
        "crew",
        &cfg.general.log_level,
        LogFormat::from_config(&cfg.general.log_format),
    );

    let roster = match &cli.roster {
        Some(path) => Roster::load(path)?,
        None => Roster::builtin()?,
    };
    let coordinator = roster.build(&cfg).await?;

    match cli.command {
        None | Some(Commands::Status) => {
            commands::status::run(&coordinator, cli.json).await?;
        }
        Some(Commands::Find { keyword }) => {
            commands::find::run(&coordinator, &keyword, cli.json).await?;
        }
        Some(Commands::Recommend { description }) => {
            commands::recommend::run(&coordinator, &description, cli.json).await?;
        }
        Some(Commands::Delegate {
            from,
            to,
            title,
            description,
            priority,
        }) => {
            let args = commands::delegate::DelegateArgs {
                from: &from,
                to: &to,
                title: &title,
                description: &description,
                priority: commands::parse_priority(&priority)?,
            };
            commands::delegate::run(&coordinator, args, cli.json).await?;
        }
        Some(Commands::Collaborate {
            description,
            expertise,
            lead,
        }) => {
            commands::collaborate::run(&coordinator, &description, &expertise, &lead, cli.json)
                .await?;
        }
    }

    Ok(())
}
