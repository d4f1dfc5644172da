use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use uuid::Uuid;

use crate::scoring::MAX_LIFELINES;

/// One row of the participant relation, as stored remotely.
///
/// `lifelines` and `score` are plain integers rather than bounded types
/// because the control record overloads them with mode and cue codes far
/// outside gameplay range; decoding happens above the store layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantRecord {
    /// Stable identifier, assigned by the store at registration.
    pub id: Uuid,
    /// Display name; immutable after registration except on the control record.
    pub username: String,
    /// Accumulated score.
    pub score: i32,
    /// Round the participant is currently on, starting at 1.
    pub current_round: i32,
    /// Lifelines left.
    pub lifelines: i32,
    /// Whether the participant finished the hunt.
    pub completed: bool,
    /// Total run time in seconds, set once at completion.
    pub completion_time: Option<i32>,
}

impl ParticipantRecord {
    /// Whether this row is the reserved control record.
    pub fn is_sentinel(&self) -> bool {
        self.id == crate::control::SENTINEL_ID
    }
}

/// Insert body for a brand-new participant; the store assigns the id.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NewParticipant {
    /// Claimed display name.
    pub username: String,
    /// Starting score.
    pub score: i32,
    /// Starting round.
    pub current_round: i32,
    /// Starting lifelines.
    pub lifelines: i32,
    /// Always false at registration.
    pub completed: bool,
}

impl NewParticipant {
    /// A participant at the very start of the hunt.
    pub fn fresh(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            score: 0,
            current_round: 1,
            lifelines: i32::from(MAX_LIFELINES),
            completed: false,
        }
    }
}

/// Partial update pushed after local progress; absent fields are left
/// untouched remotely.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ProgressPatch {
    /// New score, if it moved.
    pub score: Option<i32>,
    /// New round, if it moved.
    pub current_round: Option<i32>,
    /// New lifeline count, if it moved.
    pub lifelines: Option<i32>,
    /// Completion flag, set once at the finish.
    pub completed: Option<bool>,
    /// Final run time in seconds, set together with `completed`.
    pub completion_time: Option<i32>,
}

impl ProgressPatch {
    /// Whether the patch changes anything at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
