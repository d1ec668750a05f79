//! Subcommand handlers.

use crate::{Commands, ConfigAction};
use kumak_core::config::{ConfigOverrides, KumakConfig, load_config, workspace_config_path};
use kumak_core::research::{
    QualityFeedback, ResearchCallback, ResearchOrchestrator, ResearchPhase,
};
use kumak_core::{create_provider, create_search_provider};
use std::path::Path;
use std::sync::Arc;

pub async fn handle_command(
    command: Commands,
    workspace: &Path,
    model: Option<String>,
) -> anyhow::Result<()> {
    match command {
        Commands::Research { topic, json } => {
            let config = resolve_config(workspace, model)?;
            run_research(&topic, json, &config).await
        }
        Commands::Chat => {
            let config = resolve_config(workspace, model)?;
            crate::repl::run_interactive(config).await
        }
        Commands::Config { action } => handle_config(action, workspace, model),
    }
}

/// Load the layered configuration with CLI overrides applied.
pub fn resolve_config(workspace: &Path, model: Option<String>) -> anyhow::Result<KumakConfig> {
    let config = load_config(Some(workspace), &ConfigOverrides { model })
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    config.research.validate()?;
    for warning in config.llm.validate() {
        tracing::warn!(%warning, "LLM configuration");
    }
    Ok(config)
}

/// Prints pipeline progress to stderr.
struct ProgressCallback;

impl ResearchCallback for ProgressCallback {
    fn on_phase_change(&self, phase: ResearchPhase) {
        let label = match phase {
            ResearchPhase::Planning => "Planning research...",
            ResearchPhase::Researching => "Researching...",
            ResearchPhase::QualityCheck => "Reviewing research quality...",
            ResearchPhase::Synthesizing => "Writing the report...",
            ResearchPhase::Complete => "Done.",
        };
        eprintln!("\x1b[2m  {}\x1b[0m", label);
    }

    fn on_batch_complete(&self, batch_size: usize, accumulated: usize) {
        eprintln!(
            "\x1b[2m  {} queries researched ({} total)\x1b[0m",
            batch_size, accumulated
        );
    }

    fn on_quality_verdict(&self, iteration: u32, feedback: &QualityFeedback) {
        eprintln!(
            "\x1b[2m  Iteration {}: {} ({} follow-up queries)\x1b[0m",
            iteration,
            feedback.grade,
            feedback.follow_up_queries.len()
        );
    }
}

async fn run_research(topic: &str, json: bool, config: &KumakConfig) -> anyhow::Result<()> {
    let llm = create_provider(&config.llm)?;
    let search = create_search_provider(&config.search)?;
    let orchestrator = ResearchOrchestrator::from_config(config, llm, search)
        .with_callback(Arc::new(ProgressCallback));

    let report = orchestrator.run_research(topic).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.to_markdown());
    }
    Ok(())
}

fn handle_config(
    action: ConfigAction,
    workspace: &Path,
    model: Option<String>,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_path = workspace_config_path(workspace);
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }
            if let Some(dir) = config_path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            let toml_str = toml::to_string_pretty(&KumakConfig::default())?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = load_config(Some(workspace), &ConfigOverrides { model })
                .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{}", toml_str);
            Ok(())
        }
    }
}
