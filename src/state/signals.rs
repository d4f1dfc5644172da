use serde::Serialize;

use crate::control::{ControlCommand, ControlMode, SoundCue};

/// A change in the derived global signals that presentation must react to.
///
/// Signals are edge-triggered: an unchanged command observed again on the
/// next poll produces nothing, so a latched pause or cue never spams the
/// participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "signal", content = "value")]
pub enum SignalChange {
    /// Pause overlay toggled.
    Paused(bool),
    /// Blackout overlay toggled.
    Blackout(bool),
    /// A sound cue fired.
    Sound(SoundCue),
    /// Broadcast text appeared or was cleared.
    Broadcast(Option<String>),
}

/// Steady-state view of the operator's global signals.
#[derive(Debug, Clone, Default)]
pub struct GlobalSignals {
    paused: bool,
    blackout: bool,
    latched_cue: Option<SoundCue>,
    broadcast: Option<String>,
}

impl GlobalSignals {
    /// Fold one decoded control command into the signal state, reporting
    /// every edge in a fixed order.
    ///
    /// When the control record is missing, feed [`ControlCommand::default`]:
    /// a vanished record clears everything rather than freezing the last
    /// command on screen forever.
    pub fn absorb(&mut self, command: &ControlCommand) -> Vec<SignalChange> {
        let mut changes = Vec::new();

        let paused = command.mode == ControlMode::Paused;
        if paused != self.paused {
            self.paused = paused;
            changes.push(SignalChange::Paused(paused));
        }

        let blackout = command.mode == ControlMode::Blackout;
        if blackout != self.blackout {
            self.blackout = blackout;
            changes.push(SignalChange::Blackout(blackout));
        }

        // A cue fires when its latched value changes; clearing the latch is
        // silent but lets the operator re-trigger the same cue later.
        if command.sound_cue != self.latched_cue {
            self.latched_cue = command.sound_cue;
            if let Some(cue) = command.sound_cue {
                changes.push(SignalChange::Sound(cue));
            }
        }

        if command.broadcast != self.broadcast {
            self.broadcast = command.broadcast.clone();
            changes.push(SignalChange::Broadcast(command.broadcast.clone()));
        }

        changes
    }

    /// Whether the pause overlay is up.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Whether the blackout overlay is up.
    pub fn is_blackout(&self) -> bool {
        self.blackout
    }

    /// The broadcast currently on screen, if any.
    pub fn broadcast(&self) -> Option<&str> {
        self.broadcast.as_deref()
    }
}
