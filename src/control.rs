//! Operator control channel.
//!
//! Operators drive every connected device through one reserved record in
//! the participant relation. Its fields are overloaded: `score` carries
//! the play mode, `lifelines` a one-shot sound-cue code, and `username`
//! the broadcast text. This module decodes that legacy wire shape into an
//! explicit [`ControlCommand`] so nothing above the store layer has to
//! know about the overloading.

use std::ops::Range;

use serde::Serialize;
use uuid::Uuid;

use crate::dao::models::ParticipantRecord;

/// Identifier of the reserved control record.
pub const SENTINEL_ID: Uuid = Uuid::nil();

/// Username the control record carries when no broadcast is active.
pub const SENTINEL_USERNAME: &str = "GLOBAL_SETTINGS";

/// Prefix marking the control record's username as broadcast text.
pub const BROADCAST_MARKER: &str = "📢 ";

/// Global play mode set by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ControlMode {
    /// Normal play.
    #[default]
    Live,
    /// Everything on hold; devices show the pause screen.
    Paused,
    /// Screens dark, e.g. between game segments.
    Blackout,
}

impl ControlMode {
    /// Decode the mode code. Unknown codes fall back to [`Self::Live`] so a
    /// corrupted control record can never freeze the whole game.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Paused,
            2 => Self::Blackout,
            _ => Self::Live,
        }
    }
}

/// One-shot sound effect triggered by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SoundCue {
    /// Alarm siren.
    Siren,
    /// Evil laugh.
    Laugh,
    /// Jump scare.
    Scare,
    /// Air horn.
    Airhorn,
    /// Victory fanfare.
    Win,
    /// A code in the reserved range with no named effect yet.
    Other(i32),
}

impl SoundCue {
    /// Codes reserved for sound cues on the control record. Values outside
    /// this range are inert, which keeps the channel silent when the field
    /// holds leftovers from older protocol revisions.
    pub const CODE_RANGE: Range<i32> = 800..900;

    /// Decode a cue code; `None` for anything outside the reserved range.
    pub fn from_code(code: i32) -> Option<Self> {
        let cue = match code {
            800 => Self::Siren,
            801 => Self::Laugh,
            802 => Self::Scare,
            803 => Self::Airhorn,
            804 => Self::Win,
            other if Self::CODE_RANGE.contains(&other) => Self::Other(other),
            _ => return None,
        };
        Some(cue)
    }

    /// The wire code for this cue.
    pub fn code(self) -> i32 {
        match self {
            Self::Siren => 800,
            Self::Laugh => 801,
            Self::Scare => 802,
            Self::Airhorn => 803,
            Self::Win => 804,
            Self::Other(code) => code,
        }
    }
}

/// Fully decoded operator command, one per poll of the control record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ControlCommand {
    /// Current play mode.
    pub mode: ControlMode,
    /// Sound cue currently latched on the control record, if any.
    pub sound_cue: Option<SoundCue>,
    /// Active broadcast text with the marker stripped, if any.
    pub broadcast: Option<String>,
}

impl ControlCommand {
    /// Decode the overloaded fields of the control record.
    pub fn decode(record: &ParticipantRecord) -> Self {
        Self {
            mode: ControlMode::from_code(record.score),
            sound_cue: SoundCue::from_code(record.lifelines),
            broadcast: record
                .username
                .strip_prefix(BROADCAST_MARKER)
                .map(str::to_owned),
        }
    }
}
