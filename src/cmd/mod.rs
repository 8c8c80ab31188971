//! Command implementations for the pilot CLI.

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

use pilot::blueprint::Blueprint;
use pilot::config::Config;
use pilot::prompts::PromptLibrary;
use pilot::runner::Runner;

/// Validate a blueprint; exit 0 when valid, 1 with every violation printed
/// when invalid.
pub fn cmd_validate(blueprint: &Path) -> Result<()> {
    let content = std::fs::read_to_string(blueprint)
        .with_context(|| format!("Failed to read blueprint file: {}", blueprint.display()))?;

    match Blueprint::from_yaml(&content) {
        Ok(bp) => {
            println!(
                "{} Blueprint is valid ({} phases)",
                style("✓").green().bold(),
                bp.phases.len()
            );
            Ok(())
        }
        Err(err) => {
            eprintln!("{} Blueprint validation failed", style("✗").red().bold());
            for violation in &err.violations {
                eprintln!("  - {}", violation);
            }
            std::process::exit(1);
        }
    }
}

/// Execute a blueprint end to end and print the artifact summary.
pub async fn cmd_run(blueprint: &Path, prompts: &Path) -> Result<()> {
    let config = Config::from_env();
    if !config.offline && config.api_key.is_none() {
        eprintln!(
            "{} OPENAI_API_KEY is not set. Add it to your .env or export it.",
            style("✗").red().bold()
        );
        std::process::exit(1);
    }

    let bp = Blueprint::load(blueprint)?;
    let library = PromptLibrary::load(prompts)?;
    let runner = Runner::from_config(&config)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} {msg}")
            .expect("progress bar template is a valid static string"),
    );
    spinner.set_message(format!("Running blueprint for {}...", bp.project.id));
    spinner.enable_steady_tick(Duration::from_millis(120));

    let result = runner.run(&bp, &library, None).await;
    spinner.finish_and_clear();
    let state = result?;

    println!(
        "{} Run complete for {}",
        style("✓").green().bold(),
        style(&bp.project.id).bold()
    );
    for (phase, path) in &state.artifacts {
        println!(
            "  {} {} → {}",
            style("artifact").dim(),
            phase,
            style(path.display()).dim()
        );
    }
    Ok(())
}
