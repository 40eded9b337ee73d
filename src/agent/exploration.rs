//! Fallback exploration strategies.
//!
//! When no stored skill applies, the agent asks an [`ExplorationPolicy`] for a
//! single primitive action. The policy is pluggable; the agent neither owns
//! its logic nor learns from it.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::env::{Action, ObjectKind, Position, State};

/// Picks one primitive action for a state.
pub trait ExplorationPolicy {
    fn choose_action(&mut self, state: &State) -> Action;
}

/// Heads for the key, then the door, then the goal.
///
/// Movement is greedy along x first, then y. Once the agent holds the key and
/// the door is open it walks right, then up, toward the goal; if it is
/// already past both it picks a random primitive action.
#[derive(Debug, Clone)]
pub struct GreedyObjectivePolicy {
    goal: Position,
    rng: StdRng,
}

impl GreedyObjectivePolicy {
    /// Create a policy aiming for `goal`, with a seeded random fallback.
    pub fn new(goal: Position, seed: u64) -> Self {
        Self {
            goal,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn goal(&self) -> Position {
        self.goal
    }

    fn toward_goal(&mut self, pos: Position) -> Action {
        if pos.x < self.goal.x {
            return Action::MoveRight;
        }
        if pos.y < self.goal.y {
            return Action::MoveUp;
        }
        Action::ALL
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(Action::MoveUp)
    }
}

/// One greedy step from `pos` toward `target`, or `interact` once there.
fn approach(pos: Position, target: Position, interact: Action) -> Action {
    if pos == target {
        interact
    } else if pos.x < target.x {
        Action::MoveRight
    } else if pos.x > target.x {
        Action::MoveLeft
    } else if pos.y < target.y {
        Action::MoveUp
    } else {
        Action::MoveDown
    }
}

impl ExplorationPolicy for GreedyObjectivePolicy {
    fn choose_action(&mut self, state: &State) -> Action {
        let pos = state.agent_pos;

        if !state.has_key {
            if let Some(key) = state.object(ObjectKind::Key) {
                return approach(pos, key, Action::PickupKey);
            }
        }
        if state.has_key && !state.door_open {
            if let Some(door) = state.object(ObjectKind::Door) {
                return approach(pos, door, Action::OpenDoor);
            }
        }
        self.toward_goal(pos)
    }
}

/// Replays a fixed list of actions, cycling when exhausted. Handy for tests
/// and for forcing specific trajectories.
#[derive(Debug, Clone)]
pub struct ScriptedPolicy {
    actions: Vec<Action>,
    cursor: usize,
}

impl ScriptedPolicy {
    pub fn new(actions: Vec<Action>) -> Self {
        Self { actions, cursor: 0 }
    }
}

impl ExplorationPolicy for ScriptedPolicy {
    fn choose_action(&mut self, _state: &State) -> Action {
        if self.actions.is_empty() {
            return Action::MoveUp;
        }
        let action = self.actions[self.cursor % self.actions.len()];
        self.cursor += 1;
        action
    }
}
