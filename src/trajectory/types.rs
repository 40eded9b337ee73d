//! Core trajectory data types.
//!
//! A trajectory is the ordered record of what the agent saw, did, and earned
//! during one episode, whether the actions came from exploration or from a
//! replayed skill.

use serde::{Deserialize, Serialize};

use crate::env::{Action, State};

// ---------------------------------------------------------------------------
// Single step
// ---------------------------------------------------------------------------

/// A single (state, action, reward) transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// The state the action was taken from.
    pub state: State,
    /// The action the agent chose.
    pub action: Action,
    /// The scalar reward for this transition.
    pub reward: f64,
}

// ---------------------------------------------------------------------------
// Episode outcome
// ---------------------------------------------------------------------------

/// How an episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeOutcome {
    /// The environment reported its terminal condition.
    Success,
    /// The step budget ran out first.
    Timeout,
}

// ---------------------------------------------------------------------------
// Full trajectory
// ---------------------------------------------------------------------------

/// A complete record of one episode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trajectory {
    /// Ordered sequence of steps.
    pub steps: Vec<Step>,
    /// Total accumulated reward over the episode.
    pub total_reward: f64,
    /// How the episode ended.
    pub outcome: EpisodeOutcome,
    /// IDs of skills executed during the episode, in execution order
    /// (repeats included).
    pub skills_used: Vec<String>,
}

impl Trajectory {
    /// An empty, not-yet-successful trajectory.
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            total_reward: 0.0,
            outcome: EpisodeOutcome::Timeout,
            skills_used: Vec::new(),
        }
    }

    /// Append a step and accumulate its reward.
    pub fn push(&mut self, step: Step) {
        self.total_reward += step.reward;
        self.steps.push(step);
    }

    /// Append several steps.
    pub fn extend(&mut self, steps: impl IntoIterator<Item = Step>) {
        for step in steps {
            self.push(step);
        }
    }

    /// Number of steps, which is also the number of actions taken.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn success(&self) -> bool {
        self.outcome == EpisodeOutcome::Success
    }

    /// The actions taken, in order.
    pub fn actions(&self) -> Vec<Action> {
        self.steps.iter().map(|s| s.action).collect()
    }

    /// The last `n` steps (or all of them if there are fewer).
    pub fn tail(&self, n: usize) -> &[Step] {
        let start = self.steps.len().saturating_sub(n);
        &self.steps[start..]
    }
}

impl Default for Trajectory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{Environment, GridWorld};

    fn step(action: Action, reward: f64) -> Step {
        Step {
            state: GridWorld::new(5).get_state(),
            action,
            reward,
        }
    }

    #[test]
    fn test_push_accumulates_reward() {
        let mut t = Trajectory::new();
        t.push(step(Action::MoveUp, -0.1));
        t.push(step(Action::PickupKey, 1.0));
        assert_eq!(t.len(), 2);
        assert!((t.total_reward - 0.9).abs() < 1e-9);
        assert!(!t.success());
    }

    #[test]
    fn test_tail() {
        let mut t = Trajectory::new();
        t.extend([
            step(Action::MoveUp, 0.0),
            step(Action::MoveDown, 0.0),
            step(Action::MoveLeft, 0.0),
        ]);
        let tail: Vec<Action> = t.tail(2).iter().map(|s| s.action).collect();
        assert_eq!(tail, vec![Action::MoveDown, Action::MoveLeft]);
        assert_eq!(t.tail(10).len(), 3);
        assert!(Trajectory::new().tail(5).is_empty());
    }

    #[test]
    fn test_actions() {
        let mut t = Trajectory::new();
        t.extend([step(Action::MoveRight, 0.0), step(Action::OpenDoor, 0.0)]);
        assert_eq!(t.actions(), vec![Action::MoveRight, Action::OpenDoor]);
    }
}
