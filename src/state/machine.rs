use serde::Serialize;
use thiserror::Error;

/// High-level phases a participant's session moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GamePhase {
    /// Not registered yet; a username must be claimed or a session resumed.
    Login,
    /// Registered and hunting for the next gate code in the real world.
    AwaitingScan,
    /// A gate was unlocked; questions are live and the countdown runs.
    InRound,
    /// Round cleared; the location hint for the next gate is on screen.
    Hint,
    /// All lifelines spent. Only an operator revival can continue the run.
    Eliminated,
    /// The hunt is over for this participant; the leaderboard takes over.
    Finished,
}

impl GamePhase {
    /// Whether the session can be wiped and returned to login from here.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Eliminated | Self::Finished)
    }
}

/// Events that can be applied to the session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    /// A username was claimed, or an existing session was adopted.
    Registered,
    /// The scanned code matched the current round's gate secret.
    GateUnlocked,
    /// The last question of a non-final round was answered.
    RoundCleared,
    /// The participant read the hint and moved on to the next gate.
    HintAcknowledged,
    /// The final round was cleared, or an operator forced completion.
    GameCompleted,
    /// The last lifeline was spent.
    LifelinesExhausted,
    /// An operator restored lifelines to an eliminated participant.
    Revived,
    /// An operator advanced the participant past the current round.
    RoundSkipped,
    /// The session is wiped back to login.
    FullReset,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: GamePhase,
    /// The event that cannot be applied from this phase.
    pub event: GameEvent,
}

/// State machine for one participant's run through the hunt.
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    phase: GamePhase,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self {
            phase: GamePhase::Login,
        }
    }
}

impl SessionStateMachine {
    /// Create a new state machine initialised at the login screen.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// Apply an event, moving to the next phase if the transition is valid.
    pub fn apply(&mut self, event: GameEvent) -> Result<GamePhase, InvalidTransition> {
        let next = self.compute_transition(event)?;
        self.phase = next;
        Ok(next)
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: GameEvent) -> Result<GamePhase, InvalidTransition> {
        use GamePhase::*;

        let next = match (self.phase, event) {
            (Login, GameEvent::Registered) => AwaitingScan,
            (AwaitingScan, GameEvent::GateUnlocked) => InRound,
            (InRound, GameEvent::RoundCleared) => Hint,
            (Hint, GameEvent::HintAcknowledged) => AwaitingScan,
            // Natural completion from the final round, forced completion
            // from anywhere mid-run, and resume of an already-finished
            // session straight from login.
            (Login | AwaitingScan | InRound | Hint, GameEvent::GameCompleted) => Finished,
            // Lifelines run out mid-round (wrong answer, timeout, breach),
            // and a resumed row may carry zero already.
            (Login | AwaitingScan | InRound | Hint, GameEvent::LifelinesExhausted) => Eliminated,
            (Eliminated, GameEvent::Revived) => InRound,
            (AwaitingScan | InRound | Hint, GameEvent::RoundSkipped) => AwaitingScan,
            (Eliminated | Finished, GameEvent::FullReset) => Login,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}
