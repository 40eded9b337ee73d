//! The procedural memory agent.
//!
//! Each episode is a loop of decisions bounded by a step budget:
//!
//! ```text
//!             +--------------------------------------------+
//!             v                                            |
//!   decide(state) --skill--> ExecutingSkill --exhausted----+
//!        |                        |
//!        |                        +--terminal--> Done(Success)
//!        +--none----> Exploring --one action---------------+
//!                         |
//!                         +--terminal--> Done(Success)
//!
//!   budget spent before terminal --> Done(Timeout)
//! ```
//!
//! A selected skill runs to the end of its action sequence without
//! re-querying the library; the next decision re-queries from scratch.
//! After a successful episode the tail of the trajectory is distilled into a
//! new skill and handed to the library, which may consolidate it.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::exploration::ExplorationPolicy;
use crate::config::{AgentConfig, ProcMemConfig};
use crate::env::{Environment, Predicate, State};
use crate::skill::embedding::EmbeddingEncoder;
use crate::skill::library::SkillLibrary;
use crate::skill::types::{Preconditions, Skill};
use crate::trajectory::types::{EpisodeOutcome, Step, Trajectory};

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// The result of replaying one skill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillExecution {
    /// The steps actually taken (may stop short of the full sequence).
    pub steps: Vec<Step>,
    /// Sum of the rewards of `steps`.
    pub reward: f64,
    /// Whether the terminal condition was reached.
    pub success: bool,
}

/// What the agent does at a decision point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    /// Replay the skill at this library index.
    ExecuteSkill(usize),
    /// Take one exploration step.
    Explore,
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

/// Runs episodes against an environment, reusing and learning skills.
pub struct ProceduralMemoryAgent<E, P> {
    env: E,
    policy: P,
    encoder: EmbeddingEncoder,
    library: SkillLibrary,
    config: AgentConfig,
    retrieval_top_k: usize,
}

impl<E, P> ProceduralMemoryAgent<E, P>
where
    E: Environment,
    P: ExplorationPolicy,
{
    /// Create an agent from a validated configuration.
    ///
    /// The encoder and the library are built from the same embedding
    /// dimension, so their vectors are always comparable.
    pub fn new(env: E, policy: P, config: &ProcMemConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            env,
            policy,
            encoder: EmbeddingEncoder::new(config.memory.embedding_dim),
            library: SkillLibrary::from_config(&config.memory),
            config: config.agent.clone(),
            retrieval_top_k: config.memory.retrieval_top_k,
        })
    }

    /// Create an agent with the default configuration.
    pub fn with_defaults(env: E, policy: P) -> Self {
        let config = ProcMemConfig::default();
        Self {
            env,
            policy,
            encoder: EmbeddingEncoder::new(config.memory.embedding_dim),
            library: SkillLibrary::from_config(&config.memory),
            config: config.agent,
            retrieval_top_k: config.memory.retrieval_top_k,
        }
    }

    // ------------------------------------------------------------------
    // Episodes
    // ------------------------------------------------------------------

    /// Run one episode from a fresh `reset()`.
    ///
    /// With `use_skills` false the library is never consulted, which gives a
    /// pure-exploration baseline.
    pub fn run_episode(&mut self, use_skills: bool) -> Trajectory {
        self.env.reset();
        let mut trajectory = Trajectory::new();

        while trajectory.len() < self.config.max_steps {
            let state = self.env.get_state();

            if let Decision::ExecuteSkill(index) = self.decide(&state, use_skills) {
                let execution = self.execute_skill(index);
                // An empty sequence makes no progress; explore instead.
                if !execution.steps.is_empty() {
                    if let Some(skill) = self.library.get(index) {
                        trajectory.skills_used.push(skill.id.clone());
                    }
                    trajectory.extend(execution.steps);
                    if execution.success {
                        trajectory.outcome = EpisodeOutcome::Success;
                        return trajectory;
                    }
                    continue;
                }
            }

            let action = self.policy.choose_action(&state);
            let outcome = self.env.step(action);
            trajectory.push(Step {
                state,
                action,
                reward: outcome.reward,
            });
            if outcome.done {
                trajectory.outcome = EpisodeOutcome::Success;
                return trajectory;
            }
        }

        debug!(
            steps = trajectory.len(),
            max_steps = self.config.max_steps,
            "episode timed out"
        );
        trajectory.outcome = EpisodeOutcome::Timeout;
        trajectory
    }

    /// Roll the exploration policy forward from the current state, without
    /// resetting and without touching the library.
    pub fn explore(&mut self, max_steps: usize) -> Trajectory {
        let mut trajectory = Trajectory::new();
        let mut state = self.env.get_state();

        for _ in 0..max_steps {
            let action = self.policy.choose_action(&state);
            let outcome = self.env.step(action);
            trajectory.push(Step {
                state,
                action,
                reward: outcome.reward,
            });
            if outcome.done {
                trajectory.outcome = EpisodeOutcome::Success;
                return trajectory;
            }
            state = outcome.state;
        }

        trajectory.outcome = EpisodeOutcome::Timeout;
        trajectory
    }

    /// Query the library for the current state.
    fn decide(&self, state: &State, use_skills: bool) -> Decision {
        if !use_skills || self.library.is_empty() {
            return Decision::Explore;
        }
        let query = self.encoder.encode(state, &[]);
        match self
            .library
            .retrieve_indices(state, Some(query.as_slice()), self.retrieval_top_k)
            .first()
        {
            Some(&index) => Decision::ExecuteSkill(index),
            None => Decision::Explore,
        }
    }

    // ------------------------------------------------------------------
    // Skill execution and extraction
    // ------------------------------------------------------------------

    /// Replay the skill at `index` against the environment.
    ///
    /// `times_used` goes up by one per call regardless of the outcome. If
    /// the terminal condition is reached mid-sequence, `success_count` goes
    /// up by one and the remaining actions are skipped. An unknown index
    /// yields an empty, unsuccessful execution.
    pub fn execute_skill(&mut self, index: usize) -> SkillExecution {
        let Some(skill) = self.library.record_use(index) else {
            return SkillExecution {
                steps: Vec::new(),
                reward: 0.0,
                success: false,
            };
        };
        let actions = skill.action_sequence.clone();
        debug!(
            skill_id = %skill.id,
            skill = %skill.name,
            actions = actions.len(),
            times_used = skill.times_used,
            "executing skill"
        );

        let mut steps = Vec::with_capacity(actions.len());
        let mut reward = 0.0;
        for action in actions {
            let state = self.env.get_state();
            let outcome = self.env.step(action);
            reward += outcome.reward;
            steps.push(Step {
                state,
                action,
                reward: outcome.reward,
            });
            if outcome.done {
                self.library.record_success(index);
                return SkillExecution {
                    steps,
                    reward,
                    success: true,
                };
            }
        }

        SkillExecution {
            steps,
            reward,
            success: false,
        }
    }

    /// Turn a trajectory segment into a skill.
    ///
    /// Returns `None` for segments shorter than the configured minimum. The
    /// name compares the segment's first state with the environment's
    /// current state: a newly acquired key wins over a newly opened door,
    /// anything else is named after its length.
    pub fn extract_skill(&self, segment: &[Step]) -> Option<Skill> {
        if segment.len() < self.config.min_segment_len {
            return None;
        }
        let start = &segment.first()?.state;
        let end = self.env.get_state();
        let actions: Vec<_> = segment.iter().map(|s| s.action).collect();

        let name = if end.has_key && !start.has_key {
            "acquire_key".to_string()
        } else if end.door_open && !start.door_open {
            "open_door_sequence".to_string()
        } else {
            format!("navigate_{}_steps", actions.len())
        };

        let preconditions = Preconditions::from([
            (Predicate::HasKey, start.has_key),
            (Predicate::DoorOpen, start.door_open),
        ]);
        let embedding = self.encoder.encode(start, &actions);

        Some(Skill::new(name, preconditions, actions, embedding))
    }

    /// Mine a finished episode for a skill and submit it to the library.
    ///
    /// Only successful trajectories of at least `min_trajectory_len` steps
    /// are mined; the last `segment_len` steps become the skill. Returns the
    /// stored (possibly consolidated) skill.
    pub fn learn_from_episode(&mut self, trajectory: &Trajectory) -> Option<&Skill> {
        if !trajectory.success() || trajectory.len() < self.config.min_trajectory_len {
            return None;
        }
        let skill = self.extract_skill(trajectory.tail(self.config.segment_len))?;
        let stored = self.library.add_skill(skill);
        info!(
            skill = %stored.name,
            success_count = stored.success_count,
            "learned from episode"
        );
        Some(stored)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn library(&self) -> &SkillLibrary {
        &self.library
    }

    pub fn library_mut(&mut self) -> &mut SkillLibrary {
        &mut self.library
    }

    pub fn encoder(&self) -> &EmbeddingEncoder {
        &self.encoder
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut E {
        &mut self.env
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::exploration::{GreedyObjectivePolicy, ScriptedPolicy};
    use crate::env::{Action, GridWorld, Position};

    fn grid_agent() -> ProceduralMemoryAgent<GridWorld, GreedyObjectivePolicy> {
        let env = GridWorld::new(5);
        let policy = GreedyObjectivePolicy::new(env.goal(), 42);
        ProceduralMemoryAgent::with_defaults(env, policy)
    }

    fn step_from(env: &mut GridWorld, action: Action) -> Step {
        let state = env.get_state();
        let outcome = env.step(action);
        Step {
            state,
            action,
            reward: outcome.reward,
        }
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = ProcMemConfig::default();
        config.memory.embedding_dim = 1;
        let env = GridWorld::new(5);
        let policy = GreedyObjectivePolicy::new(env.goal(), 0);
        assert!(ProceduralMemoryAgent::new(env, policy, &config).is_err());
    }

    #[test]
    fn test_first_episode_explores_and_succeeds() {
        let mut agent = grid_agent();
        let trajectory = agent.run_episode(true);
        assert!(trajectory.success());
        assert_eq!(trajectory.len(), 10);
        assert!(trajectory.skills_used.is_empty());
    }

    #[test]
    fn test_extract_rejects_short_segment() {
        let mut agent = grid_agent();
        let single = vec![step_from(agent.env_mut(), Action::MoveUp)];
        assert!(agent.extract_skill(&single).is_none());
        assert!(agent.extract_skill(&[]).is_none());
    }

    #[test]
    fn test_extract_names_key_acquisition() {
        let mut agent = grid_agent();
        let env = agent.env_mut();
        for action in [Action::MoveRight, Action::MoveRight, Action::MoveUp] {
            env.step(action);
        }
        let segment = vec![
            step_from(env, Action::MoveUp),
            step_from(env, Action::PickupKey),
        ];
        let skill = agent.extract_skill(&segment).unwrap();
        assert_eq!(skill.name, "acquire_key");
        assert_eq!(skill.action_sequence, vec![Action::MoveUp, Action::PickupKey]);
        assert!(!skill.preconditions[&Predicate::HasKey]);
        assert!(!skill.preconditions[&Predicate::DoorOpen]);
        assert_eq!(skill.success_count, 1);
        assert_eq!(skill.times_used, 0);
        assert_eq!(skill.embedding.len(), 8);
    }

    #[test]
    fn test_extract_names_navigation() {
        let mut agent = grid_agent();
        let env = agent.env_mut();
        let segment = vec![
            step_from(env, Action::MoveUp),
            step_from(env, Action::MoveRight),
            step_from(env, Action::MoveUp),
        ];
        let skill = agent.extract_skill(&segment).unwrap();
        assert_eq!(skill.name, "navigate_3_steps");
    }

    #[test]
    fn test_learn_skips_short_or_failed_trajectories() {
        let mut agent = grid_agent();

        let mut short = Trajectory::new();
        short.push(step_from(agent.env_mut(), Action::MoveUp));
        short.push(step_from(agent.env_mut(), Action::MoveUp));
        short.outcome = EpisodeOutcome::Success;
        assert!(agent.learn_from_episode(&short).is_none());

        let mut failed = short.clone();
        failed.push(step_from(agent.env_mut(), Action::MoveUp));
        failed.outcome = EpisodeOutcome::Timeout;
        assert!(agent.learn_from_episode(&failed).is_none());
        assert!(agent.library().is_empty());
    }

    #[test]
    fn test_learned_skill_is_reused_next_episode() {
        let mut agent = grid_agent();
        let first = agent.run_episode(true);
        let learned = agent.learn_from_episode(&first).unwrap();
        assert_eq!(learned.name, "open_door_sequence");
        assert!(learned.preconditions[&Predicate::HasKey]);

        let second = agent.run_episode(true);
        assert!(second.success());
        assert_eq!(second.len(), 10);
        assert_eq!(second.skills_used.len(), 1);

        let skill = &agent.library().skills()[0];
        assert_eq!(skill.times_used, 1);
        assert_eq!(skill.success_count, 2);
    }

    #[test]
    fn test_use_skills_false_ignores_library() {
        let mut agent = grid_agent();
        let first = agent.run_episode(true);
        agent.learn_from_episode(&first);

        let baseline = agent.run_episode(false);
        assert!(baseline.success());
        assert!(baseline.skills_used.is_empty());
        assert_eq!(agent.library().skills()[0].times_used, 0);
    }

    #[test]
    fn test_execute_unknown_index() {
        let mut agent = grid_agent();
        let execution = agent.execute_skill(3);
        assert!(execution.steps.is_empty());
        assert!(!execution.success);
    }

    #[test]
    fn test_failing_skill_is_requeried_until_timeout() {
        let env = GridWorld::new(5);
        let policy = ScriptedPolicy::new(vec![Action::MoveLeft]);
        let mut agent = ProceduralMemoryAgent::with_defaults(env, policy);

        // Always applicable, never reaches the goal from the origin.
        let state = agent.env().get_state();
        let actions = vec![Action::MoveLeft, Action::MoveDown];
        let embedding = agent.encoder().encode(&state, &actions);
        agent
            .library_mut()
            .add_skill(Skill::new("stuck", Preconditions::new(), actions, embedding));

        let trajectory = agent.run_episode(true);
        assert_eq!(trajectory.outcome, EpisodeOutcome::Timeout);
        assert_eq!(trajectory.len(), 50);
        assert_eq!(agent.library().skills()[0].times_used, 25);
        assert_eq!(agent.library().skills()[0].success_count, 1);
        assert!(trajectory.steps.iter().all(|s| s.state.agent_pos == Position::new(0, 0)));
    }

    #[test]
    fn test_explore_does_not_reset_or_learn() {
        let mut agent = grid_agent();
        agent.env_mut().step(Action::MoveRight);
        let trajectory = agent.explore(3);
        assert_eq!(trajectory.len(), 3);
        assert_eq!(trajectory.steps[0].state.agent_pos, Position::new(1, 0));
        assert!(!trajectory.success());
        assert!(agent.library().is_empty());

        let rest = agent.explore(20);
        assert!(rest.success());
    }
}
