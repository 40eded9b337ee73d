//! Skill module: the procedural memory.
//!
//! This module implements the skill lifecycle:
//!
//! 1. **Types** ([`types`]) -- the [`Skill`] record and its applicability gate.
//! 2. **Embedding** ([`embedding`]) -- the deterministic [`EmbeddingEncoder`]
//!    that fingerprints a (state, actions) pair as a unit vector.
//! 3. **Retrieval** ([`retrieval`]) -- precondition filtering followed by
//!    cosine-similarity or success-rate ranking.
//! 4. **Library** ([`library`]) -- the [`SkillLibrary`] that stores skills,
//!    consolidates near-duplicates, and owns every counter mutation.

pub mod embedding;
pub mod library;
pub mod retrieval;
pub mod types;

// Re-export the most commonly used items at the module level.
pub use embedding::EmbeddingEncoder;
pub use library::{InsertOutcome, LibraryStats, SkillHistoryEntry, SkillLibrary};
pub use retrieval::{cosine_similarity, SkillRetriever};
pub use types::{Preconditions, Skill};
