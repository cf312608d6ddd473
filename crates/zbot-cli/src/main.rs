mod cmd;
mod local;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use zbot_server::config::ServerArgs;

#[derive(Parser)]
#[command(
    name = "zbot",
    about = "Repository-owned automation rules for GitHub",
    version,
    propagate_version = true
)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the webhook server and the daily scheduler
    Serve(ServerArgs),

    /// Parse every rule file in a local directory
    Check {
        /// Rules directory, or a checkout containing .github/zbot
        dir: PathBuf,
    },

    /// Run local rules against a sample event without touching GitHub
    Simulate {
        /// Rules directory, or a checkout containing .github/zbot
        #[arg(long)]
        rules: PathBuf,

        /// Webhook event name (issue_comment, issues, project_card) or "schedule"
        #[arg(long)]
        event: String,

        /// JSON webhook payload (default: empty object)
        #[arg(long)]
        payload: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve(_) => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Serve(args) => cmd::serve::run(args),
        Commands::Check { dir } => cmd::check::run(&dir, cli.json),
        Commands::Simulate {
            rules,
            event,
            payload,
        } => cmd::simulate::run(&rules, &event, payload.as_deref(), cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
