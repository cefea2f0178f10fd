//! Command-line driver for a single orchestration run.
//!
//! Plays the role of the surrounding UI: enforces the multi-agent gate,
//! probes connectivity once, hands editor content to the scheduler, and
//! renders the consensus result.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;

use orchestration::{
    probe_key, EditorLanguage, GeminiClient, Journal, KeyStatus, OrchestrationConfig, RunRequest,
    Scheduler, WorkspaceCache,
};

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The request to hand to the agents.
    prompt: String,

    /// File whose contents stand in for the editor buffer.
    #[arg(long)]
    file: Option<PathBuf>,

    /// Language tag for the editor content.
    #[arg(long, default_value = "javascript")]
    language: EditorLanguage,

    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured agent count.
    #[arg(long)]
    agents: Option<u32>,

    /// Override the configured round count.
    #[arg(long)]
    rounds: Option<u32>,

    /// Override the configured reasoning depth.
    #[arg(long)]
    depth: Option<u32>,

    /// Directory for the workspace cache (settings, recent files).
    #[arg(long)]
    cache_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "orchestration=info".into()),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => OrchestrationConfig::from_toml_path(path)?,
        None => OrchestrationConfig::default(),
    };
    if let Some(agents) = args.agents {
        config.agent_count = agents;
    }
    if let Some(rounds) = args.rounds {
        config.max_rounds = rounds;
    }
    if let Some(depth) = args.depth {
        config.reasoning_depth = depth;
    }
    let config = config.normalized();

    // The gate lives with the caller, not the scheduler.
    if !config.multi_agent_mode {
        bail!("multi-agent mode is disabled in the configuration");
    }

    let cache = match &args.cache_dir {
        Some(dir) => WorkspaceCache::at_dir(dir),
        None => WorkspaceCache::in_memory(),
    };
    cache.init().context("loading workspace cache")?;

    let editor_content = match &args.file {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            cache.touch_recent(path);
            text
        }
        None => String::new(),
    };

    let status = probe_key();
    match status {
        KeyStatus::Ready => eprintln!("backend: ready"),
        KeyStatus::NoKey => eprintln!("backend: no credential — running simulated agents"),
        KeyStatus::Probing => unreachable!("probe_key never returns the pre-poll state"),
    }

    let client = Arc::new(GeminiClient::from_env(config.model.clone()));
    let journal = Journal::new().shared();
    let scheduler = Scheduler::new(config.clone(), client, journal.clone());

    let outcome = scheduler
        .run(RunRequest {
            prompt: args.prompt,
            editor_content,
            language: args.language,
        })
        .await?;

    cache.store_settings(&config);
    cache.teardown().context("persisting workspace cache")?;

    match outcome {
        Some(result) => {
            println!("genesis     {}", result.genesis);
            println!("root agent  {} (entropy {})", result.root_agent, result.root_entropy);
            println!(
                "winner      score {} | {} agents | {} rounds | avg entropy {}",
                result.score, result.agent_count, result.round_count, result.avg_entropy
            );
            println!();
            for (rank, group) in result.all_groups.iter().enumerate() {
                println!(
                    "  #{rank} score {:.3} | {} fragments | {} agents | {} rounds",
                    group.score,
                    group.candidates.len(),
                    group.agent_count,
                    group.round_count
                );
            }
            println!();
            println!("{}", result.selected_candidate);
            Ok(())
        }
        None => {
            // The journal holds the details; surface the terminal agent's log.
            for (agent_id, view) in journal.snapshot() {
                for entry in view.entries.iter().filter(|e| e.kind == orchestration::LogKind::Error) {
                    eprintln!("{agent_id}: {}", entry.message);
                }
            }
            bail!("orchestration run aborted without a consensus result");
        }
    }
}
