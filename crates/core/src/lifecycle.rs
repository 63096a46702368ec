//! Worker lifecycle states.
//!
//! A worker moves `parsed -> installing -> installed -> activating ->
//! activated` and ends `redundant` when it is replaced or its install fails.
//! The registration drives the transitions; this module only says which
//! ones are legal.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Lifecycle state of a single worker version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

impl WorkerState {
    /// Whether `self -> next` is a permitted transition.
    pub fn can_transition_to(self, next: WorkerState) -> bool {
        use WorkerState::*;
        match (self, next) {
            (Redundant, _) => false,
            (_, Redundant) => true,
            (Parsed, Installing) => true,
            (Installing, Installed) => true,
            (Installed, Activating) => true,
            (Activating, Activated) => true,
            _ => false,
        }
    }

    /// Move to `next`, rejecting transitions the update algorithm never makes.
    pub fn transition(&mut self, next: WorkerState) -> Result<(), Error> {
        if !self.can_transition_to(next) {
            return Err(Error::InvalidTransition { from: *self, to: next });
        }
        tracing::debug!(from = %self, to = %next, "worker state transition");
        *self = next;
        Ok(())
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut state = WorkerState::Parsed;
        for next in [
            WorkerState::Installing,
            WorkerState::Installed,
            WorkerState::Activating,
            WorkerState::Activated,
        ] {
            state.transition(next).unwrap();
        }
        assert_eq!(state, WorkerState::Activated);
    }

    #[test]
    fn test_failed_install_goes_redundant() {
        let mut state = WorkerState::Installing;
        state.transition(WorkerState::Redundant).unwrap();
        assert_eq!(state, WorkerState::Redundant);
    }

    #[test]
    fn test_cannot_skip_install() {
        let mut state = WorkerState::Parsed;
        let result = state.transition(WorkerState::Activating);
        assert!(matches!(result, Err(Error::InvalidTransition { .. })));
        assert_eq!(state, WorkerState::Parsed);
    }

    #[test]
    fn test_redundant_is_terminal() {
        let mut state = WorkerState::Redundant;
        assert!(state.transition(WorkerState::Installing).is_err());
        assert!(state.transition(WorkerState::Redundant).is_err());
    }

    #[test]
    fn test_serializes_lowercase() {
        let json = serde_json::to_string(&WorkerState::Activated).unwrap();
        assert_eq!(json, "\"activated\"");
    }
}
