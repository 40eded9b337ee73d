//! Core skill data types.
//!
//! A **skill** is a short action sequence lifted from the tail of a successful
//! episode, together with the predicates that held when it started and an
//! embedding of that starting context. Skills are replayed verbatim when
//! retrieved; the embedding only ranks them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::env::{Action, Predicate, State};

/// Required predicate values for a skill to be applicable.
pub type Preconditions = BTreeMap<Predicate, bool>;

/// A single learned unit of behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Skill {
    /// Unique identifier (UUID v4), used to correlate log lines and history
    /// entries. Names are not unique.
    pub id: String,
    /// Descriptive label assigned at extraction time.
    pub name: String,
    /// Predicate values captured from the first state of the source segment.
    pub preconditions: Preconditions,
    /// The actions replayed when the skill is executed. Never empty.
    pub action_sequence: Vec<Action>,
    /// Unit-length fingerprint of the starting state and the actions.
    pub embedding: Vec<f64>,
    /// Starts at 1 for the extracting episode; bumped on consolidation and on
    /// every execution that reaches the terminal condition.
    pub success_count: usize,
    /// Bumped once per execution attempt.
    pub times_used: usize,
}

impl Skill {
    /// Create a freshly extracted skill with a new UUID.
    ///
    /// The extracting episode counts as the first success.
    pub fn new(
        name: impl Into<String>,
        preconditions: Preconditions,
        action_sequence: Vec<Action>,
        embedding: Vec<f64>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            preconditions,
            action_sequence,
            embedding,
            success_count: 1,
            times_used: 0,
        }
    }

    /// Whether every precondition matches the state exactly.
    ///
    /// A predicate the state does not carry counts as a mismatch.
    pub fn is_applicable(&self, state: &State) -> bool {
        self.preconditions
            .iter()
            .all(|(predicate, required)| state.predicate(*predicate) == Some(*required))
    }

    /// Empirical success rate: `success_count / max(times_used, 1)`.
    pub fn success_rate(&self) -> f64 {
        self.success_count as f64 / self.times_used.max(1) as f64
    }
}

impl std::fmt::Display for Skill {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Skill({}, used={}, success={})",
            self.name, self.times_used, self.success_count
        )
    }
}
