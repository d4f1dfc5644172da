//! Errors surfaced when a player action cannot be applied.

use thiserror::Error;

use crate::state::machine::InvalidTransition;

/// Why the engine refused an action. These are user-correctable conditions,
/// not faults: the runtime reports the reason and the session stays put.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The action carried malformed input.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The action does not fit the current phase of the run.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// The action asked for a phase transition the session machine forbids.
    #[error(transparent)]
    Transition(#[from] InvalidTransition),
}
