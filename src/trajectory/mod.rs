//! Trajectory types for recording agent-environment interactions.
//!
//! This module provides:
//! - [`types::Step`] -- one (state, action, reward) transition.
//! - [`types::Trajectory`] -- the ordered steps of an episode, its total
//!   reward, how it ended, and which skills were replayed.
//! - [`types::EpisodeOutcome`] -- success or timeout.

pub mod types;

// Re-export the most commonly used items at the module level.
pub use types::{EpisodeOutcome, Step, Trajectory};
