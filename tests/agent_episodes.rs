//! End-to-end episode behaviour against the grid world and scripted worlds.

use std::collections::BTreeMap;

use procmem::agent::{GreedyObjectivePolicy, ProceduralMemoryAgent, ScriptedPolicy};
use procmem::env::{Action, Environment, GridWorld, Position, Predicate, State, StepOutcome};
use procmem::skill::{Preconditions, Skill};
use procmem::training::TrainingPipeline;
use procmem::trajectory::EpisodeOutcome;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A world whose state never changes and which terminates after a fixed
/// number of actions (or never, with `None`).
struct CountdownWorld {
    steps: usize,
    terminate_after: Option<usize>,
}

impl CountdownWorld {
    fn new(terminate_after: Option<usize>) -> Self {
        Self {
            steps: 0,
            terminate_after,
        }
    }

    fn state() -> State {
        State {
            agent_pos: Position::new(0, 0),
            has_key: false,
            door_open: false,
            at_goal: false,
            objects: BTreeMap::new(),
        }
    }
}

impl Environment for CountdownWorld {
    fn reset(&mut self) -> State {
        self.steps = 0;
        Self::state()
    }

    fn step(&mut self, _action: Action) -> StepOutcome {
        self.steps += 1;
        let done = self.terminate_after.is_some_and(|n| self.steps >= n);
        StepOutcome {
            state: Self::state(),
            reward: if done { 1.0 } else { 0.0 },
            done,
        }
    }

    fn get_state(&self) -> State {
        Self::state()
    }
}

fn grid_agent() -> ProceduralMemoryAgent<GridWorld, GreedyObjectivePolicy> {
    let env = GridWorld::new(5);
    let policy = GreedyObjectivePolicy::new(env.goal(), 42);
    ProceduralMemoryAgent::with_defaults(env, policy)
}

// ---------------------------------------------------------------------------
// Grid world
// ---------------------------------------------------------------------------

#[test]
fn test_fifteen_episodes_converge_on_one_skill() {
    let mut agent = grid_agent();
    let stats = TrainingPipeline::new(15).train(&mut agent);

    assert_eq!(stats.episodes(), 15);
    assert!(stats.successes.iter().all(|s| *s));
    assert!(stats.steps.iter().all(|s| *s == 10));
    assert!(stats.rewards.iter().all(|r| (r - 12.3).abs() < 1e-9));
    assert!(stats.skills_learned.iter().all(|n| *n == 1));
    assert_eq!(stats.skill_uses.last().copied(), Some(14));

    let library = agent.library();
    assert_eq!(library.len(), 1);
    let skill = &library.skills()[0];
    assert_eq!(skill.name, "open_door_sequence");
    assert_eq!(skill.times_used, 14);
    // 1 at extraction + 14 consolidations + 14 terminal executions.
    assert_eq!(skill.success_count, 29);
    assert_eq!(
        skill.action_sequence,
        vec![
            Action::MoveRight,
            Action::MoveUp,
            Action::OpenDoor,
            Action::MoveRight,
            Action::MoveUp
        ]
    );
    assert_eq!(skill.preconditions.get(&Predicate::HasKey), Some(&true));
    assert_eq!(skill.preconditions.get(&Predicate::DoorOpen), Some(&false));

    let stats = library.get_stats();
    assert_eq!(stats.total_uses, 14);
    assert!((stats.avg_success_rate - 29.0 / 14.0).abs() < 1e-9);
}

#[test]
fn test_skill_is_only_retrieved_once_key_is_held() {
    let mut agent = grid_agent();
    let first = agent.run_episode(true);
    agent.learn_from_episode(&first);

    let second = agent.run_episode(true);
    assert_eq!(second.skills_used.len(), 1);
    // The five exploration steps before the skill all start without the key.
    assert!(second.steps[..5].iter().all(|s| !s.state.has_key));
    assert!(second.steps[5].state.has_key);
}

// ---------------------------------------------------------------------------
// Scripted worlds
// ---------------------------------------------------------------------------

#[test]
fn test_never_terminating_world_times_out_with_empty_library() {
    let policy = ScriptedPolicy::new(vec![Action::MoveUp, Action::MoveRight]);
    let mut agent = ProceduralMemoryAgent::with_defaults(CountdownWorld::new(None), policy);

    let trajectory = agent.run_episode(true);
    assert_eq!(trajectory.len(), 50);
    assert_eq!(trajectory.outcome, EpisodeOutcome::Timeout);
    assert!(agent.learn_from_episode(&trajectory).is_none());
    assert!(agent.library().is_empty());
}

#[test]
fn test_skill_stops_at_terminal_mid_sequence() {
    let policy = ScriptedPolicy::new(vec![Action::MoveUp]);
    let mut agent = ProceduralMemoryAgent::with_defaults(CountdownWorld::new(Some(2)), policy);

    let actions = vec![
        Action::MoveLeft,
        Action::MoveLeft,
        Action::MoveDown,
        Action::MoveDown,
    ];
    let embedding = agent.encoder().encode(&CountdownWorld::state(), &actions);
    agent
        .library_mut()
        .add_skill(Skill::new("four_steps", Preconditions::new(), actions, embedding));

    let trajectory = agent.run_episode(true);
    assert!(trajectory.success());
    assert_eq!(trajectory.len(), 2);
    assert_eq!(trajectory.actions(), vec![Action::MoveLeft, Action::MoveLeft]);
    assert_eq!(trajectory.skills_used.len(), 1);

    let skill = &agent.library().skills()[0];
    assert_eq!(skill.times_used, 1);
    assert_eq!(skill.success_count, 2);

    // Too short to distill a new skill from.
    assert!(agent.learn_from_episode(&trajectory).is_none());
    assert_eq!(agent.library().len(), 1);
}

#[test]
fn test_explore_runs_policy_without_library() {
    let policy = ScriptedPolicy::new(vec![Action::MoveDown]);
    let mut agent = ProceduralMemoryAgent::with_defaults(CountdownWorld::new(Some(3)), policy);

    let trajectory = agent.explore(10);
    assert!(trajectory.success());
    assert_eq!(trajectory.actions(), vec![Action::MoveDown; 3]);
    assert!(agent.library().is_empty());
}
