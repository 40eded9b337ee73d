use std::path::Path;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

/// Complete configuration for the procedural memory agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcMemConfig {
    pub memory: MemoryConfig,
    pub agent: AgentConfig,
    pub env: EnvConfig,
    pub training: TrainingConfig,
}

/// Skill library and embedding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Embedding dimension shared by the encoder and the library (default: 8).
    pub embedding_dim: usize,
    /// Cosine similarity above which a new skill is merged into an existing
    /// one instead of being stored (default: 0.9).
    pub consolidation_threshold: f64,
    /// Number of skills requested per decision (default: 1).
    pub retrieval_top_k: usize,
}

/// Episode and skill-extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Step budget per episode (default: 50).
    pub max_steps: usize,
    /// Shortest successful trajectory that is mined for a skill (default: 3).
    pub min_trajectory_len: usize,
    /// Length of the trailing segment turned into a skill (default: 5).
    pub segment_len: usize,
    /// Shortest segment that yields a skill (default: 2).
    pub min_segment_len: usize,
}

/// Grid world configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    /// Side length of the square grid (default: 5).
    pub grid_size: usize,
}

/// Training loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Number of episodes to run (default: 15).
    pub episodes: usize,
    /// Seed for the exploration strategy's random fallback (default: 42).
    pub seed: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            embedding_dim: 8,
            consolidation_threshold: 0.9,
            retrieval_top_k: 1,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: 50,
            min_trajectory_len: 3,
            segment_len: 5,
            min_segment_len: 2,
        }
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self { grid_size: 5 }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            episodes: 15,
            seed: 42,
        }
    }
}

impl ProcMemConfig {
    /// Read a JSON configuration file. Missing sections and fields take their
    /// default values.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Check the cross-component invariants once, before anything is built.
    ///
    /// The encoder writes three state slots before the action slots, so the
    /// embedding dimension must be at least 3. The grid must be large enough
    /// to hold the fixed object layout.
    pub fn validate(&self) -> Result<()> {
        let m = &self.memory;
        ensure!(
            m.embedding_dim >= 3,
            "memory.embedding_dim must be at least 3, got {}",
            m.embedding_dim
        );
        ensure!(
            m.consolidation_threshold > 0.0 && m.consolidation_threshold <= 1.0,
            "memory.consolidation_threshold must be in (0, 1], got {}",
            m.consolidation_threshold
        );
        ensure!(m.retrieval_top_k >= 1, "memory.retrieval_top_k must be at least 1");
        if m.consolidation_threshold >= 1.0 {
            tracing::warn!(
                threshold = m.consolidation_threshold,
                "consolidation threshold of 1.0 never merges; every learned skill is stored"
            );
        }

        let a = &self.agent;
        ensure!(a.max_steps >= 1, "agent.max_steps must be at least 1");
        ensure!(a.min_segment_len >= 1, "agent.min_segment_len must be at least 1");
        ensure!(
            a.segment_len >= a.min_segment_len,
            "agent.segment_len ({}) must not be smaller than agent.min_segment_len ({})",
            a.segment_len,
            a.min_segment_len
        );

        ensure!(
            self.env.grid_size >= 4,
            "env.grid_size must be at least 4, got {}",
            self.env.grid_size
        );
        Ok(())
    }
}
