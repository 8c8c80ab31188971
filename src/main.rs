use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cmd;

#[derive(Parser)]
#[command(name = "pilot")]
#[command(version, about = "Blueprint-driven project orchestrator")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a blueprint file and report every schema violation
    Validate {
        /// Path to the blueprint YAML
        #[arg(long)]
        blueprint: PathBuf,
    },
    /// Execute a blueprint to completion
    Run {
        /// Path to the blueprint YAML
        #[arg(long)]
        blueprint: PathBuf,

        /// Path to the role-prompts YAML
        #[arg(long, default_value = "prompts/role_prompts.yaml")]
        prompts: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "pilot=debug" } else { "pilot=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();

    match &cli.command {
        Commands::Validate { blueprint } => cmd::cmd_validate(blueprint),
        Commands::Run { blueprint, prompts } => cmd::cmd_run(blueprint, prompts).await,
    }
}
