//! The skill library: a retrieval-augmented store of procedural skills.
//!
//! The [`SkillLibrary`] owns every skill the agent has learned and is the
//! only place their counters are mutated. New skills that are near-duplicates
//! of a stored one (cosine similarity above the consolidation threshold) are
//! not stored; the stored skill is credited with an extra success instead.
//! The library never evicts.
//!
//! It also tracks an insertion history so we can audit when skills were
//! added or consolidated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::retrieval::{cosine_similarity, SkillRetriever};
use super::types::Skill;
use crate::config::MemoryConfig;
use crate::env::State;

/// Similarity above which an incoming skill is merged into a stored one.
pub const DEFAULT_CONSOLIDATION_THRESHOLD: f64 = 0.9;

/// What `add_skill` did with an incoming skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertOutcome {
    /// The skill was appended to the library.
    Inserted,
    /// The skill was merged into an existing near-duplicate.
    Consolidated,
}

/// A record of one `add_skill` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillHistoryEntry {
    /// ID of the stored skill the call resolved to.
    pub skill_id: String,
    /// Name of that stored skill.
    pub skill_name: String,
    /// UTC timestamp of the call.
    pub added_at: DateTime<Utc>,
    /// Episode index current at the time of the call.
    pub episode: usize,
    pub outcome: InsertOutcome,
}

/// Aggregate statistics over the library.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LibraryStats {
    /// Number of stored skills.
    pub total_skills: usize,
    /// Sum of `times_used` over all skills.
    pub total_uses: usize,
    /// Mean per-skill success rate, or 0 for an empty library.
    pub avg_success_rate: f64,
}

/// Stores skills and answers applicability + similarity queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillLibrary {
    /// Skills in insertion order.
    skills: Vec<Skill>,
    /// Embedding dimension every stored skill is expected to carry.
    embedding_dim: usize,
    consolidation_threshold: f64,
    /// Chronological record of all `add_skill` calls.
    history: Vec<SkillHistoryEntry>,
    /// Episode index stamped onto history entries (set externally).
    current_episode: usize,
}

impl SkillLibrary {
    /// Create an empty library using the default consolidation threshold.
    pub fn new(embedding_dim: usize) -> Self {
        Self::with_threshold(embedding_dim, DEFAULT_CONSOLIDATION_THRESHOLD)
    }

    /// Create an empty library with an explicit consolidation threshold.
    pub fn with_threshold(embedding_dim: usize, consolidation_threshold: f64) -> Self {
        Self {
            skills: Vec::new(),
            embedding_dim,
            consolidation_threshold,
            history: Vec::new(),
            current_episode: 0,
        }
    }

    /// Create an empty library from the memory section of the configuration.
    pub fn from_config(config: &MemoryConfig) -> Self {
        Self::with_threshold(config.embedding_dim, config.consolidation_threshold)
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Store a skill, or consolidate it into a near-duplicate.
    ///
    /// Stored skills are scanned in insertion order; the first one whose
    /// embedding has cosine similarity above the threshold with the incoming
    /// one gets `success_count += 1` and is returned, and the incoming skill
    /// is dropped. Otherwise the skill is appended and the stored copy is
    /// returned.
    pub fn add_skill(&mut self, skill: Skill) -> &Skill {
        if skill.embedding.len() != self.embedding_dim {
            warn!(
                skill = %skill.name,
                expected = self.embedding_dim,
                got = skill.embedding.len(),
                "skill embedding dimension does not match the library"
            );
        }

        let duplicate = self.skills.iter().position(|existing| {
            cosine_similarity(&skill.embedding, &existing.embedding) > self.consolidation_threshold
        });

        let (index, outcome) = match duplicate {
            Some(index) => {
                let existing = &mut self.skills[index];
                existing.success_count += 1;
                info!(
                    skill_id = %existing.id,
                    skill = %existing.name,
                    discarded = %skill.name,
                    success_count = existing.success_count,
                    "consolidated skill into near-duplicate"
                );
                (index, InsertOutcome::Consolidated)
            }
            None => {
                info!(
                    skill_id = %skill.id,
                    skill = %skill.name,
                    actions = skill.action_sequence.len(),
                    library_size = self.skills.len() + 1,
                    "added skill to library"
                );
                self.skills.push(skill);
                (self.skills.len() - 1, InsertOutcome::Inserted)
            }
        };

        let stored = &self.skills[index];
        self.history.push(SkillHistoryEntry {
            skill_id: stored.id.clone(),
            skill_name: stored.name.clone(),
            added_at: Utc::now(),
            episode: self.current_episode,
            outcome,
        });

        &self.skills[index]
    }

    /// Count one execution attempt of the skill at `index`.
    pub fn record_use(&mut self, index: usize) -> Option<&Skill> {
        let skill = self.skills.get_mut(index)?;
        skill.times_used += 1;
        Some(skill)
    }

    /// Count one execution of the skill at `index` that reached the terminal
    /// condition.
    pub fn record_success(&mut self, index: usize) -> Option<&Skill> {
        let skill = self.skills.get_mut(index)?;
        skill.success_count += 1;
        Some(skill)
    }

    /// Set the episode index stamped onto subsequent history entries.
    pub fn set_episode(&mut self, episode: usize) {
        self.current_episode = episode;
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Return at most `top_k` applicable skills for `state`, best first.
    ///
    /// See [`SkillRetriever::rank`] for the ranking policy.
    pub fn retrieve_skills(
        &self,
        state: &State,
        query_embedding: Option<&[f64]>,
        top_k: usize,
    ) -> Vec<&Skill> {
        SkillRetriever::retrieve(&self.skills, state, query_embedding, top_k)
    }

    /// Index-returning variant of [`SkillLibrary::retrieve_skills`], for
    /// callers that go on to record usage.
    pub fn retrieve_indices(
        &self,
        state: &State,
        query_embedding: Option<&[f64]>,
        top_k: usize,
    ) -> Vec<usize> {
        let ranked = SkillRetriever::rank(&self.skills, state, query_embedding, top_k);
        debug!(
            candidates = self.skills.len(),
            returned = ranked.len(),
            by_similarity = query_embedding.is_some(),
            "retrieved skills"
        );
        ranked
    }

    /// Aggregate statistics over the stored skills.
    pub fn get_stats(&self) -> LibraryStats {
        let total_uses = self.skills.iter().map(|s| s.times_used).sum();
        let avg_success_rate = if self.skills.is_empty() {
            0.0
        } else {
            self.skills.iter().map(Skill::success_rate).sum::<f64>() / self.skills.len() as f64
        };
        LibraryStats {
            total_skills: self.skills.len(),
            total_uses,
            avg_success_rate,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// All stored skills in insertion order.
    pub fn skills(&self) -> &[Skill] {
        &self.skills
    }

    pub fn get(&self, index: usize) -> Option<&Skill> {
        self.skills.get(index)
    }

    /// Total number of skills in the library.
    pub fn len(&self) -> usize {
        self.skills.len()
    }

    /// Returns `true` if the library contains no skills.
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    pub fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    pub fn consolidation_threshold(&self) -> f64 {
        self.consolidation_threshold
    }

    /// Return the full insertion history.
    pub fn history(&self) -> &[SkillHistoryEntry] {
        &self.history
    }

    pub fn current_episode(&self) -> usize {
        self.current_episode
    }
}

impl Default for SkillLibrary {
    fn default() -> Self {
        Self::new(8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{Action, Environment, GridWorld, Predicate};
    use crate::skill::embedding::normalize;
    use crate::skill::types::Preconditions;

    fn make_skill(name: &str, emb: Vec<f64>) -> Skill {
        Skill::new(name, Preconditions::new(), vec![Action::MoveUp, Action::MoveRight], emb)
    }

    fn unit(mut v: Vec<f64>) -> Vec<f64> {
        normalize(&mut v);
        v
    }

    /// A unit vector at similarity `cos` to `[1, 0]`.
    fn at_similarity(cos: f64) -> Vec<f64> {
        vec![cos, (1.0 - cos * cos).sqrt()]
    }

    fn start_state() -> State {
        GridWorld::new(5).get_state()
    }

    #[test]
    fn test_empty_library_retrieves_nothing() {
        let library = SkillLibrary::new(2);
        let query = [1.0, 0.0];
        assert!(library.retrieve_skills(&start_state(), Some(&query[..]), 3).is_empty());
        assert!(library.retrieve_skills(&start_state(), None, 3).is_empty());
    }

    #[test]
    fn test_self_similarity_retrieves_skill() {
        let mut library = SkillLibrary::new(2);
        let emb = unit(vec![0.3, 0.7]);
        library.add_skill(make_skill("only", emb.clone()));

        let results = library.retrieve_skills(&start_state(), Some(emb.as_slice()), 1);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "only");
    }

    #[test]
    fn test_near_duplicate_is_consolidated() {
        let mut library = SkillLibrary::new(2);
        library.add_skill(make_skill("stored", vec![1.0, 0.0]));
        let stored = library.add_skill(make_skill("copy", at_similarity(0.95)));

        assert_eq!(stored.name, "stored");
        assert_eq!(stored.success_count, 2);
        assert_eq!(library.len(), 1);
        assert_eq!(library.history().len(), 2);
        assert_eq!(library.history()[1].outcome, InsertOutcome::Consolidated);
    }

    #[test]
    fn test_threshold_is_strict() {
        let mut library = SkillLibrary::with_threshold(2, 0.9);
        library.add_skill(make_skill("a", vec![1.0, 0.0]));
        library.add_skill(make_skill("b", at_similarity(0.85)));
        assert_eq!(library.len(), 2);
    }

    #[test]
    fn test_consolidates_into_first_match() {
        let mut library = SkillLibrary::new(2);
        library.add_skill(make_skill("a", vec![1.0, 0.0]));
        library.add_skill(make_skill("b", vec![0.0, 1.0]));
        // Close to both "a" (0.92) and nowhere near "b".
        let stored = library.add_skill(make_skill("c", at_similarity(0.92)));
        assert_eq!(stored.name, "a");
        assert_eq!(library.len(), 2);
    }

    #[test]
    fn test_dedup_invariant_holds() {
        let mut library = SkillLibrary::new(2);
        for i in 0..40 {
            let angle = i as f64 * 0.07;
            library.add_skill(make_skill("s", vec![angle.cos(), angle.sin()]));
        }
        let skills = library.skills();
        for i in 0..skills.len() {
            for j in (i + 1)..skills.len() {
                assert!(cosine_similarity(&skills[i].embedding, &skills[j].embedding) <= 0.9);
            }
        }
        assert!(library.len() > 1);
    }

    #[test]
    fn test_retrieve_respects_preconditions() {
        let mut library = SkillLibrary::new(2);
        let needs_key = Preconditions::from([(Predicate::HasKey, true)]);
        library.add_skill(Skill::new("gated", needs_key, vec![Action::OpenDoor], vec![1.0, 0.0]));

        let state = start_state();
        assert!(library.retrieve_skills(&state, Some(&[1.0, 0.0][..]), 3).is_empty());

        let mut keyed = state.clone();
        keyed.has_key = true;
        assert_eq!(library.retrieve_skills(&keyed, Some(&[1.0, 0.0][..]), 3).len(), 1);
    }

    #[test]
    fn test_top_k_bound() {
        let mut library = SkillLibrary::new(2);
        library.add_skill(make_skill("a", vec![1.0, 0.0]));
        library.add_skill(make_skill("b", vec![0.0, 1.0]));
        let state = start_state();
        assert_eq!(library.retrieve_skills(&state, None, 1).len(), 1);
        assert_eq!(library.retrieve_skills(&state, None, 10).len(), 2);
        assert_eq!(library.retrieve_indices(&state, Some(&[0.0, 1.0][..]), 1), vec![1]);
    }

    #[test]
    fn test_counters_and_stats() {
        let mut library = SkillLibrary::new(2);
        assert_eq!(
            library.get_stats(),
            LibraryStats {
                total_skills: 0,
                total_uses: 0,
                avg_success_rate: 0.0
            }
        );

        library.add_skill(make_skill("a", vec![1.0, 0.0]));
        library.add_skill(make_skill("b", vec![0.0, 1.0]));
        library.record_use(0);
        library.record_use(0);
        library.record_use(1);
        library.record_success(1);

        let stats = library.get_stats();
        assert_eq!(stats.total_skills, 2);
        assert_eq!(stats.total_uses, 3);
        // a: 1/2, b: 2/1.
        assert!((stats.avg_success_rate - 1.25).abs() < 1e-12);
        assert!(library.record_use(7).is_none());
    }

    #[test]
    fn test_history_tracks_episode() {
        let mut library = SkillLibrary::new(2);
        library.set_episode(0);
        library.add_skill(make_skill("first", vec![1.0, 0.0]));
        library.set_episode(3);
        library.add_skill(make_skill("second", vec![0.0, 1.0]));

        let history = library.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].episode, 0);
        assert_eq!(history[1].episode, 3);
        assert_eq!(history[1].outcome, InsertOutcome::Inserted);
        assert_eq!(history[1].skill_name, "second");
    }
}
