//! Score arithmetic: answer deltas, penalties, and completion bonuses.

use crate::content::{Question, RoundSpec};

/// Lifelines a participant starts with.
pub const MAX_LIFELINES: u8 = 4;

/// Flat bonus granted for clearing a round the first time.
pub const ROUND_CLEAR_BONUS: i32 = 5;

/// Bonus per unspent lifeline when the hunt is completed.
pub const LIFELINE_BONUS_PER_REMAINING: i32 = 5;

/// Score delta for answering `question` under `spec`.
///
/// A correct answer earns the question's full value, a wrong one loses half
/// of it rounded down. Letting the countdown expire costs the same as a
/// wrong answer.
pub fn answer_delta(spec: &RoundSpec, question: &Question, correct: bool) -> i32 {
    let points = spec.question_points(question);
    if correct { points } else { -(points / 2) }
}

/// Score delta when the countdown expires before an answer.
pub fn timeout_delta(spec: &RoundSpec, question: &Question) -> i32 {
    answer_delta(spec, question, false)
}

/// Completion bonus for the lifelines still unspent at the finish.
pub fn lifeline_bonus(remaining: u8) -> i32 {
    i32::from(remaining) * LIFELINE_BONUS_PER_REMAINING
}
