//! Per-step action policy.
//!
//! When a machine's inbox is empty it draws one outcome from
//! [`ACTION_SPACE`] equally likely values. Three of them send, the rest are
//! purely internal:
//!
//! | outcome | action                                   |
//! |---------|------------------------------------------|
//! | 1       | send to the first peer                   |
//! | 2       | send to the second peer                  |
//! | 3       | send to both peers (every peer if more)  |
//! | 4..=10  | internal event                           |

use std::collections::VecDeque;

use crate::Port;

/// Number of equally likely outcomes a machine draws from.
pub const ACTION_SPACE: u32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Destination {
    First,
    Second,
    Broadcast,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Send(Destination),
    Internal,
}

impl Action {
    /// Maps a drawn outcome in `1..=ACTION_SPACE` onto an action.
    pub fn from_outcome(outcome: u32) -> Self {
        match outcome {
            1 => Action::Send(Destination::First),
            2 => Action::Send(Destination::Second),
            3 => Action::Send(Destination::Broadcast),
            _ => Action::Internal,
        }
    }

    /// Resolves the action against the machine's ordered peer list.
    ///
    /// With a single peer both `First` and `Second` point at it and
    /// `Broadcast` sends to it once.
    pub fn targets(&self, peers: &[Port]) -> Vec<Port> {
        match self {
            Action::Internal => Vec::new(),
            Action::Send(Destination::First) => peers.first().copied().into_iter().collect(),
            Action::Send(Destination::Second) => {
                peers.get(1).or(peers.first()).copied().into_iter().collect()
            }
            Action::Send(Destination::Broadcast) => peers.to_vec(),
        }
    }
}

/// Where a machine gets its next action from when the inbox is empty.
pub trait ActionSource: Send {
    fn next_action(&mut self) -> Action;
}

/// Replays a fixed list of actions, then falls back to internal events.
///
/// Useful for pinning a machine's behaviour in experiments and tests.
#[derive(Default, Debug)]
pub struct ScriptedActions {
    script: VecDeque<Action>,
}

impl ScriptedActions {
    pub fn new(script: impl IntoIterator<Item = Action>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }
}

impl ActionSource for ScriptedActions {
    fn next_action(&mut self) -> Action {
        self.script.pop_front().unwrap_or(Action::Internal)
    }
}
