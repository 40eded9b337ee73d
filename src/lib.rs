//! procmem: a procedural skill memory for a small grid-world agent.
//!
//! The agent explores, records successful trajectories, and distills their
//! tails into reusable skills held in a retrieval-augmented library keyed by
//! embedding similarity. Later episodes retrieve and replay those skills
//! instead of exploring step by step.

pub mod agent;
pub mod config;
pub mod env;
pub mod skill;
pub mod trajectory;
pub mod training;
