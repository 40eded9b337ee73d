//! Episode-by-episode training loop.
//!
//! ```text
//! for episode = 0 .. N:
//!   a. stamp the library with the episode index
//!   b. run an episode with skills enabled
//!   c. if it succeeded with enough steps, distill its tail into a skill
//!   d. record reward, steps, library size, cumulative skill uses
//! ```
//!
//! The loop is the library's only source of new skills.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::agent::{ExplorationPolicy, ProceduralMemoryAgent};
use crate::env::Environment;

// ---------------------------------------------------------------------------
// Training statistics
// ---------------------------------------------------------------------------

/// Per-episode series consumed by external plotting or reporting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingStats {
    /// Total reward of each episode.
    pub rewards: Vec<f64>,
    /// Actions taken in each episode.
    pub steps: Vec<usize>,
    /// Library size after each episode.
    pub skills_learned: Vec<usize>,
    /// Cumulative skill executions after each episode.
    pub skill_uses: Vec<usize>,
    /// Whether each episode reached the terminal condition.
    pub successes: Vec<bool>,
}

impl TrainingStats {
    /// Number of recorded episodes.
    pub fn episodes(&self) -> usize {
        self.rewards.len()
    }

    /// Fraction of episodes that succeeded.
    pub fn success_rate(&self) -> f64 {
        if self.successes.is_empty() {
            return 0.0;
        }
        self.successes.iter().filter(|s| **s).count() as f64 / self.successes.len() as f64
    }

    /// Serialize the series to a pretty-printed JSON file.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize training stats")?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create directory {}", parent.display())
                })?;
            }
        }
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write training stats to {}", path.display()))?;
        info!(path = %path.display(), episodes = self.episodes(), "Saved training stats");
        Ok(())
    }
}

/// Summary of a single training episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeReport {
    /// Zero-based episode index.
    pub episode: usize,
    pub reward: f64,
    pub steps: usize,
    pub success: bool,
    /// Library size after the episode.
    pub library_size: usize,
    /// Name of the skill stored or consolidated from this episode, if any.
    pub learned_skill: Option<String>,
}

// ---------------------------------------------------------------------------
// Training pipeline
// ---------------------------------------------------------------------------

/// Drives an agent through a fixed number of episodes.
#[derive(Debug, Clone)]
pub struct TrainingPipeline {
    episodes: usize,
    use_skills: bool,
}

impl TrainingPipeline {
    /// Create a pipeline running `episodes` episodes with skills enabled.
    pub fn new(episodes: usize) -> Self {
        Self {
            episodes,
            use_skills: true,
        }
    }

    /// Disable skill retrieval, turning every episode into pure exploration.
    /// Successful episodes still feed the library.
    pub fn without_skills(mut self) -> Self {
        self.use_skills = false;
        self
    }

    /// Run the episodes in order and return the collected series together
    /// with one report per episode.
    pub fn run<E, P>(
        &self,
        agent: &mut ProceduralMemoryAgent<E, P>,
    ) -> (TrainingStats, Vec<EpisodeReport>)
    where
        E: Environment,
        P: ExplorationPolicy,
    {
        let mut stats = TrainingStats::default();
        let mut reports = Vec::with_capacity(self.episodes);

        info!(
            episodes = self.episodes,
            use_skills = self.use_skills,
            "starting training"
        );

        for episode in 0..self.episodes {
            agent.library_mut().set_episode(episode);

            let trajectory = agent.run_episode(self.use_skills);
            let learned_skill = agent
                .learn_from_episode(&trajectory)
                .map(|skill| skill.name.clone());

            let library = agent.library();
            let library_size = library.len();
            let total_uses = library.get_stats().total_uses;

            stats.rewards.push(trajectory.total_reward);
            stats.steps.push(trajectory.len());
            stats.skills_learned.push(library_size);
            stats.skill_uses.push(total_uses);
            stats.successes.push(trajectory.success());

            info!(
                episode = episode + 1,
                reward = format!("{:.1}", trajectory.total_reward),
                steps = trajectory.len(),
                skills = library_size,
                success = trajectory.success(),
                "episode finished"
            );

            reports.push(EpisodeReport {
                episode,
                reward: trajectory.total_reward,
                steps: trajectory.len(),
                success: trajectory.success(),
                library_size,
                learned_skill,
            });
        }

        let summary = agent.library().get_stats();
        info!(
            total_skills = summary.total_skills,
            total_uses = summary.total_uses,
            avg_success_rate = format!("{:.2}%", summary.avg_success_rate * 100.0),
            success_rate = format!("{:.2}%", stats.success_rate() * 100.0),
            "training complete"
        );

        (stats, reports)
    }

    /// Convenience wrapper returning only the statistics.
    pub fn train<E, P>(&self, agent: &mut ProceduralMemoryAgent<E, P>) -> TrainingStats
    where
        E: Environment,
        P: ExplorationPolicy,
    {
        self.run(agent).0
    }
}
