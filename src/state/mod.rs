//! Run state machine
//!
//! Run states: RUNNING → {SUCCEEDED | FAILED}

use std::fmt;

/// Check if a state is terminal (no further transitions possible)
pub trait TerminalState {
    fn is_terminal(&self) -> bool;
}

/// Observed state of a deployment run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Run is still active on the control plane
    Running,
    /// Run finished with status "success"
    Succeeded,
    /// Run finished with any other status
    Failed,
}

impl TerminalState for RunState {
    fn is_terminal(&self) -> bool {
        matches!(self, RunState::Succeeded | RunState::Failed)
    }
}

impl RunState {
    /// Check if transition from this state to target is valid
    pub fn can_transition_to(&self, target: RunState) -> bool {
        matches!(
            (self, target),
            (RunState::Running, RunState::Running)
                | (RunState::Running, RunState::Succeeded)
                | (RunState::Running, RunState::Failed)
        )
    }

    /// State implied by one observation of the run
    pub fn observed(active: bool, success: bool) -> Self {
        match (active, success) {
            (true, _) => RunState::Running,
            (false, true) => RunState::Succeeded,
            (false, false) => RunState::Failed,
        }
    }

    /// Move to `target`, rejecting transitions out of terminal states
    pub fn transition(&mut self, target: RunState) -> Result<(), StateError> {
        if !self.can_transition_to(target) {
            return Err(StateError::InvalidTransition {
                from: *self,
                to: target,
            });
        }
        *self = target;
        Ok(())
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Running => f.write_str("running"),
            RunState::Succeeded => f.write_str("succeeded"),
            RunState::Failed => f.write_str("failed"),
        }
    }
}

/// Errors for run state operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: RunState, to: RunState },
}
