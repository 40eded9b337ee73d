//! Deterministic state/action fingerprints.
//!
//! Layout of an embedding of dimension `D`:
//!
//! ```text
//! [0]       coarse hash of the agent position, in [0, 1)
//! [1]       1.0 if the agent holds the key
//! [2]       1.0 if the door is open
//! [3..D)    coarse hash of each of the first D-3 actions, 0.0 when unused
//! ```
//!
//! The vector is then scaled to unit length. Nothing is learned; collisions
//! are tolerated since the result is only used to rank skills.

use serde::{Deserialize, Serialize};

use crate::env::{Action, State};

/// Added to the norm before dividing so an all-zero vector stays finite.
pub const NORM_EPSILON: f64 = 1e-8;

/// Number of leading slots describing the state rather than the actions.
pub const STATE_SLOTS: usize = 3;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// 64-bit FNV-1a over the bytes of `input`.
fn fnv1a64(input: &str) -> u64 {
    let mut hash = FNV_OFFSET;
    for b in input.as_bytes() {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Hash `input` into one of 1000 buckets in [0, 1).
fn coarse_hash(input: &str) -> f64 {
    (fnv1a64(input) % 1000) as f64 / 1000.0
}

/// Scale `v` to unit length in place.
pub fn normalize(v: &mut [f64]) {
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    for x in v.iter_mut() {
        *x /= norm + NORM_EPSILON;
    }
}

/// Maps a (state, action sequence) pair to a fixed-length unit vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingEncoder {
    dim: usize,
}

impl EmbeddingEncoder {
    /// Create an encoder producing `dim`-dimensional vectors.
    ///
    /// `dim` is expected to be at least [`STATE_SLOTS`]; this is checked once
    /// by [`crate::config::ProcMemConfig::validate`]. Smaller values simply
    /// drop the trailing state slots.
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Encode a state and the actions taken from it.
    pub fn encode(&self, state: &State, actions: &[Action]) -> Vec<f64> {
        let mut v = vec![0.0; self.dim];

        let state_features = [
            coarse_hash(&state.agent_pos.to_string()),
            if state.has_key { 1.0 } else { 0.0 },
            if state.door_open { 1.0 } else { 0.0 },
        ];
        for (slot, value) in v.iter_mut().zip(state_features) {
            *slot = value;
        }

        let action_slots = self.dim.saturating_sub(STATE_SLOTS);
        for (i, action) in actions.iter().take(action_slots).enumerate() {
            v[STATE_SLOTS + i] = coarse_hash(action.as_str());
        }

        normalize(&mut v);
        v
    }
}

impl Default for EmbeddingEncoder {
    fn default() -> Self {
        Self::new(8)
    }
}
