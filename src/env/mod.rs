//! Environment abstractions and the bundled grid world.
//!
//! The agent only ever talks to the [`Environment`] trait. [`grid_world`]
//! provides the key-and-door world used by the CLI and the tests.

pub mod grid_world;
pub mod traits;

// Re-export the core trait and state types at the module level.
pub use grid_world::GridWorld;
pub use traits::{Action, Environment, ObjectKind, Position, Predicate, State, StepOutcome};
