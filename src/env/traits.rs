//! Core environment trait and shared types.
//!
//! Every world the agent can act in implements the [`Environment`] trait so
//! that the agent and the exploration strategy can drive it uniformly. The
//! agent never interprets action semantics itself; it only passes [`Action`]
//! tokens through and reads the predicates exposed by [`State`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Positions and objects
// ---------------------------------------------------------------------------

/// A cell on the grid. `x` grows to the right, `y` grows upward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// The named objects placed in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Key,
    Door,
    Box,
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// The boolean flags a state exposes. Skill preconditions are expressed over
/// these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    HasKey,
    DoorOpen,
    AtGoal,
}

impl Predicate {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HasKey => "has_key",
            Self::DoorOpen => "door_open",
            Self::AtGoal => "at_goal",
        }
    }
}

impl std::fmt::Display for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// A read-only snapshot of the world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// Where the agent currently stands.
    pub agent_pos: Position,
    /// Whether the key is in the agent's inventory.
    pub has_key: bool,
    /// Whether the door has been opened.
    pub door_open: bool,
    /// Whether the agent stands on the goal cell.
    pub at_goal: bool,
    /// Object name to position.
    pub objects: BTreeMap<ObjectKind, Position>,
}

impl State {
    /// Look up a predicate by name.
    ///
    /// Returns `None` when the state does not carry the predicate, in which
    /// case any precondition on it is considered unmet.
    pub fn predicate(&self, predicate: Predicate) -> Option<bool> {
        match predicate {
            Predicate::HasKey => Some(self.has_key),
            Predicate::DoorOpen => Some(self.door_open),
            Predicate::AtGoal => Some(self.at_goal),
        }
    }

    /// Position of a named object, if it is present in the world.
    pub fn object(&self, kind: ObjectKind) -> Option<Position> {
        self.objects.get(&kind).copied()
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// The closed set of primitive actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    PickupKey,
    OpenDoor,
}

impl Action {
    /// Every primitive action, in a fixed order.
    pub const ALL: [Action; 6] = [
        Action::MoveUp,
        Action::MoveDown,
        Action::MoveLeft,
        Action::MoveRight,
        Action::PickupKey,
        Action::OpenDoor,
    ];

    /// Stable identifier used for display and embedding.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MoveUp => "move_up",
            Self::MoveDown => "move_down",
            Self::MoveLeft => "move_left",
            Self::MoveRight => "move_right",
            Self::PickupKey => "pickup_key",
            Self::OpenDoor => "open_door",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// The result of applying one action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// The state after the action.
    pub state: State,
    /// The scalar reward for the transition.
    pub reward: f64,
    /// Whether the terminal condition has been reached.
    pub done: bool,
}

/// The core environment trait.
pub trait Environment {
    /// Reinitialise all environment-owned state and return the initial state.
    fn reset(&mut self) -> State;

    /// Apply one primitive action.
    fn step(&mut self, action: Action) -> StepOutcome;

    /// Snapshot the current state without mutating anything.
    fn get_state(&self) -> State;
}
