//! Key-and-door grid world.
//!
//! The agent starts in the bottom-left corner and must pick up the key, open
//! the door with it, and then walk to the goal in the top-right corner.
//! Every step costs a little; picking up the key, opening the door, and
//! finishing pay out.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing;

use super::traits::{Action, Environment, ObjectKind, Position, State, StepOutcome};

/// Reward for any step that achieves nothing in particular.
pub const STEP_PENALTY: f64 = -0.1;
/// Reward for picking up the key.
pub const KEY_REWARD: f64 = 1.0;
/// Reward for opening the door.
pub const DOOR_REWARD: f64 = 2.0;
/// Reward for the transition that reaches the terminal condition.
pub const GOAL_REWARD: f64 = 10.0;

/// A square grid with a key, a door, a box, and a goal cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridWorld {
    size: usize,
    agent_pos: Position,
    goal_pos: Position,
    objects: BTreeMap<ObjectKind, Position>,
    has_key: bool,
    door_open: bool,
}

impl GridWorld {
    /// Create a world of `size` x `size` cells, already reset.
    pub fn new(size: usize) -> Self {
        let mut world = Self {
            size,
            agent_pos: Position::new(0, 0),
            goal_pos: Position::new(0, 0),
            objects: BTreeMap::new(),
            has_key: false,
            door_open: false,
        };
        world.reset();
        world
    }

    /// Side length of the grid.
    pub fn size(&self) -> usize {
        self.size
    }

    /// The cell the agent must reach once the door is open.
    pub fn goal(&self) -> Position {
        self.goal_pos
    }

    fn object_at_agent(&self, kind: ObjectKind) -> bool {
        self.objects.get(&kind) == Some(&self.agent_pos)
    }
}

impl Default for GridWorld {
    fn default() -> Self {
        Self::new(5)
    }
}

impl Environment for GridWorld {
    fn reset(&mut self) -> State {
        let last = self.size.saturating_sub(1);
        self.agent_pos = Position::new(0, 0);
        self.goal_pos = Position::new(last, last);
        self.objects = BTreeMap::from([
            (ObjectKind::Key, Position::new(2, 2)),
            (ObjectKind::Door, Position::new(3, 3)),
            (ObjectKind::Box, Position::new(1, 3)),
        ]);
        self.has_key = false;
        self.door_open = false;
        self.get_state()
    }

    fn step(&mut self, action: Action) -> StepOutcome {
        let last = self.size.saturating_sub(1);
        let mut reward = STEP_PENALTY;

        match action {
            Action::MoveUp => self.agent_pos.y = (self.agent_pos.y + 1).min(last),
            Action::MoveDown => self.agent_pos.y = self.agent_pos.y.saturating_sub(1),
            Action::MoveLeft => self.agent_pos.x = self.agent_pos.x.saturating_sub(1),
            Action::MoveRight => self.agent_pos.x = (self.agent_pos.x + 1).min(last),
            Action::PickupKey => {
                if self.object_at_agent(ObjectKind::Key) && !self.has_key {
                    self.has_key = true;
                    reward = KEY_REWARD;
                    tracing::trace!(pos = %self.agent_pos, "key picked up");
                }
            }
            Action::OpenDoor => {
                if self.object_at_agent(ObjectKind::Door) && self.has_key {
                    self.door_open = true;
                    reward = DOOR_REWARD;
                    tracing::trace!(pos = %self.agent_pos, "door opened");
                }
            }
        }

        let done = self.agent_pos == self.goal_pos && self.door_open;
        if done {
            reward = GOAL_REWARD;
        }

        StepOutcome {
            state: self.get_state(),
            reward,
            done,
        }
    }

    fn get_state(&self) -> State {
        State {
            agent_pos: self.agent_pos,
            has_key: self.has_key,
            door_open: self.door_open,
            at_goal: self.agent_pos == self.goal_pos,
            objects: self.objects.clone(),
        }
    }
}
