use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::BenchError;

/// Lifecycle of a batch run.
///
/// Each batch flows through: PENDING → RUNNING → COMPLETED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchState {
    Pending,
    Running,
    Completed,
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchState::Pending => write!(f, "PENDING"),
            BatchState::Running => write!(f, "RUNNING"),
            BatchState::Completed => write!(f, "COMPLETED"),
        }
    }
}

impl BatchState {
    /// The only state reachable from `self`, or `None` if terminal.
    pub fn successor(self) -> Option<BatchState> {
        match self {
            BatchState::Pending => Some(BatchState::Running),
            BatchState::Running => Some(BatchState::Completed),
            BatchState::Completed => None,
        }
    }
}

/// Tracks the current state of a batch and the states it has left behind.
#[derive(Debug, Clone)]
pub struct BatchLifecycle {
    state: BatchState,
    history: Vec<BatchState>,
}

impl Default for BatchLifecycle {
    fn default() -> Self {
        Self {
            state: BatchState::Pending,
            history: Vec::new(),
        }
    }
}

impl BatchLifecycle {
    pub fn state(&self) -> BatchState {
        self.state
    }

    #[allow(dead_code)]
    pub fn history(&self) -> &[BatchState] {
        &self.history
    }

    /// Moves to `to` if it is the successor of the current state.
    pub fn advance(&mut self, to: BatchState) -> Result<(), BenchError> {
        if self.state.successor() != Some(to) {
            return Err(BenchError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.history.push(self.state);
        self.state = to;
        Ok(())
    }
}
