//! procmem: procedural skill memory for a grid-world agent
//!
//! Subcommands:
//!
//! - `train`    -- Run the training loop and print the learned skills
//! - `explore`  -- One pure-exploration rollout, no library involved
//! - `inspect`  -- Train silently, then dump the library and its history

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use procmem::agent::{GreedyObjectivePolicy, ProceduralMemoryAgent};
use procmem::config::ProcMemConfig;
use procmem::env::{Environment, GridWorld};
use procmem::skill::SkillLibrary;
use procmem::training::TrainingPipeline;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// procmem: an agent that distills successful episodes into reusable skills
#[derive(Parser)]
#[command(name = "procmem", version, about)]
struct Cli {
    /// Path to a JSON configuration file (uses defaults if not provided).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train the agent for a number of episodes.
    Train {
        /// Number of episodes (overrides the config file).
        #[arg(long)]
        episodes: Option<usize>,

        /// Seed for the exploration policy (overrides the config file).
        #[arg(long)]
        seed: Option<u64>,

        /// Never retrieve skills; every episode is pure exploration.
        #[arg(long)]
        no_skills: bool,

        /// Write the per-episode statistics to this JSON file.
        #[arg(long)]
        stats_out: Option<PathBuf>,
    },

    /// Run one exploration-only rollout from a fresh grid.
    Explore {
        /// Step budget for the rollout.
        #[arg(long, default_value_t = 50)]
        max_steps: usize,
    },

    /// Train silently, then print the library contents.
    Inspect,
}

// ---------------------------------------------------------------------------
// Entrypoint
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();

    // `inspect` keeps training quiet unless RUST_LOG asks otherwise.
    let default_level = match cli.command {
        Commands::Inspect => "warn",
        _ => "info",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut config = match &cli.config {
        Some(path) => ProcMemConfig::load_from_file(path)?,
        None => ProcMemConfig::default(),
    };

    match cli.command {
        Commands::Train {
            episodes,
            seed,
            no_skills,
            stats_out,
        } => {
            if let Some(episodes) = episodes {
                config.training.episodes = episodes;
            }
            if let Some(seed) = seed {
                config.training.seed = seed;
            }
            cmd_train(&config, no_skills, stats_out)
        }
        Commands::Explore { max_steps } => cmd_explore(&config, max_steps),
        Commands::Inspect => cmd_inspect(&config),
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_train(config: &ProcMemConfig, no_skills: bool, stats_out: Option<PathBuf>) -> Result<()> {
    let mut agent = build_agent(config)?;

    let mut pipeline = TrainingPipeline::new(config.training.episodes);
    if no_skills {
        pipeline = pipeline.without_skills();
    }
    let stats = pipeline.train(&mut agent);

    if let Some(path) = stats_out {
        stats.save_to_file(&path)?;
    }

    println!();
    println!("Learned skills:");
    for skill in agent.library().skills() {
        println!(
            "  {name}: {actions} actions, used {used} times, {successes} successes",
            name = skill.name,
            actions = skill.action_sequence.len(),
            used = skill.times_used,
            successes = skill.success_count,
        );
    }
    print_library_stats(agent.library());
    println!(
        "  Episode success rate: {:.2}%",
        stats.success_rate() * 100.0
    );
    Ok(())
}

fn cmd_explore(config: &ProcMemConfig, max_steps: usize) -> Result<()> {
    let mut agent = build_agent(config)?;
    agent.env_mut().reset();
    let trajectory = agent.explore(max_steps);

    println!(
        "Exploration: {steps} steps, reward {reward:.1}, outcome {outcome:?}",
        steps = trajectory.len(),
        reward = trajectory.total_reward,
        outcome = trajectory.outcome,
    );
    let actions: Vec<&str> = trajectory.actions().iter().map(|a| a.as_str()).collect();
    println!("  Actions: {}", actions.join(", "));
    Ok(())
}

fn cmd_inspect(config: &ProcMemConfig) -> Result<()> {
    let mut agent = build_agent(config)?;
    TrainingPipeline::new(config.training.episodes).train(&mut agent);
    let library = agent.library();

    println!(
        "Skill library after {} episodes (dim {}, threshold {})",
        config.training.episodes,
        library.embedding_dim(),
        library.consolidation_threshold()
    );
    print_library_stats(library);
    println!();

    for skill in library.skills() {
        println!("  [{id}] {skill}", id = &skill.id[..8]);
        let preconditions: Vec<String> = skill
            .preconditions
            .iter()
            .map(|(p, v)| format!("{p}={v}"))
            .collect();
        println!("    Preconditions: {}", preconditions.join(", "));
        let actions: Vec<&str> = skill.action_sequence.iter().map(|a| a.as_str()).collect();
        println!("    Actions: {}", actions.join(" -> "));
        println!("    Success rate: {:.2}", skill.success_rate());
        println!();
    }

    let history = library.history();
    if !history.is_empty() {
        println!("Insertion history ({} entries):", history.len());
        for entry in history.iter().take(10) {
            println!(
                "  Episode {}: {:?} {} at {}",
                entry.episode,
                entry.outcome,
                entry.skill_name,
                entry.added_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
        if history.len() > 10 {
            println!("  ... and {} more", history.len() - 10);
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn build_agent(
    config: &ProcMemConfig,
) -> Result<ProceduralMemoryAgent<GridWorld, GreedyObjectivePolicy>> {
    let env = GridWorld::new(config.env.grid_size);
    let policy = GreedyObjectivePolicy::new(env.goal(), config.training.seed);
    tracing::info!(
        grid_size = env.size(),
        seed = config.training.seed,
        "Using grid world environment"
    );
    ProceduralMemoryAgent::new(env, policy, config)
}

fn print_library_stats(library: &SkillLibrary) {
    let stats = library.get_stats();
    println!("Library statistics:");
    println!("  Total skills: {}", stats.total_skills);
    println!("  Total uses: {}", stats.total_uses);
    println!("  Avg success rate: {:.2}", stats.avg_success_rate);
}
