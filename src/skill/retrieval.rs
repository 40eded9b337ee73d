//! Applicability-gated skill retrieval.
//!
//! Retrieval first drops every skill whose preconditions disagree with the
//! query state. The survivors are ranked either by cosine similarity to a
//! query embedding or, when no embedding is supplied, by their empirical
//! success rate. Both rankings are stable: skills that tie keep their
//! insertion order.

use ordered_float::OrderedFloat;

use super::types::Skill;
use crate::env::State;

/// Computes the cosine similarity between two vectors.
///
/// Returns 0.0 if either vector is the zero vector (to avoid division by zero)
/// or if the lengths differ.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Ranks the skills of a library for a given state.
pub struct SkillRetriever;

impl SkillRetriever {
    /// Return the indices (into `skills`) of at most `top_k` applicable
    /// skills, best first.
    ///
    /// # Algorithm
    ///
    /// 1. Keep only skills whose preconditions match `state`.
    /// 2. If nothing survives, return an empty vector.
    /// 3. With a `query_embedding`, sort by descending cosine similarity.
    /// 4. Without one, sort by descending `success_count / max(times_used, 1)`.
    /// 5. Take the first `top_k`.
    pub fn rank(
        skills: &[Skill],
        state: &State,
        query_embedding: Option<&[f64]>,
        top_k: usize,
    ) -> Vec<usize> {
        let mut scored: Vec<(OrderedFloat<f64>, usize)> = skills
            .iter()
            .enumerate()
            .filter(|(_, skill)| skill.is_applicable(state))
            .map(|(idx, skill)| {
                let score = match query_embedding {
                    Some(query) => cosine_similarity(query, &skill.embedding),
                    None => skill.success_rate(),
                };
                (OrderedFloat(score), idx)
            })
            .collect();

        // `sort_by` is stable, so equal scores keep insertion order.
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        scored
            .into_iter()
            .take(top_k)
            .map(|(_, idx)| idx)
            .collect()
    }

    /// Like [`SkillRetriever::rank`] but returns references.
    pub fn retrieve<'a>(
        skills: &'a [Skill],
        state: &State,
        query_embedding: Option<&[f64]>,
        top_k: usize,
    ) -> Vec<&'a Skill> {
        Self::rank(skills, state, query_embedding, top_k)
            .into_iter()
            .map(|idx| &skills[idx])
            .collect()
    }
}
