//! Agent module: the procedural memory agent and its exploration fallback.
//!
//! The [`ProceduralMemoryAgent`] retrieves applicable skills from its
//! [`SkillLibrary`](crate::skill::SkillLibrary), replays them against the
//! environment, falls back to an [`ExplorationPolicy`] when nothing applies,
//! and distills successful episodes into new skills.

pub mod agent;
pub mod exploration;

// Re-export the primary types for convenient access.
pub use agent::{ProceduralMemoryAgent, SkillExecution};
pub use exploration::{ExplorationPolicy, GreedyObjectivePolicy, ScriptedPolicy};
