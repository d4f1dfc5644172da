//! Local session state: the phase machine and the derived operator signals.

/// Phase machine for one participant's run.
pub mod machine;
/// Edge-triggered operator signal state.
pub mod signals;

pub use self::machine::{GameEvent, GamePhase, InvalidTransition, SessionStateMachine};
pub use self::signals::{GlobalSignals, SignalChange};
