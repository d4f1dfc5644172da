//! Game content: rounds, question pools, and the deterministic selection
//! that assigns each participant their personal question sequence.

mod builtin;
mod select;

pub use builtin::builtin_rounds;
pub use select::{questions_for_round, seeded_index};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single multiple-choice question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Question {
    /// Prompt shown to the participant.
    pub prompt: String,
    /// Answer options in display order.
    pub options: Vec<String>,
    /// Index into `options` of the correct answer.
    pub correct_index: usize,
    /// Optional illustration URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Per-question point value; when absent the round's flat value applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<i32>,
}

/// A fixed pool of questions a round draws from.
///
/// Each participant receives `picks` questions out of the pool, chosen by
/// the seeded selection hash; the pool itself never changes at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionPool {
    /// Salt mixed into the selection hash so pools diverge per participant.
    pub salt: String,
    /// How many questions each participant draws from this pool.
    #[serde(default = "default_picks")]
    pub picks: usize,
    /// The candidate questions.
    pub questions: Vec<Question>,
}

fn default_picks() -> usize {
    1
}

/// Static definition of one round of the hunt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundSpec {
    /// Display title, e.g. "Rapid Fire".
    pub title: String,
    /// Countdown granted per question, in seconds.
    pub countdown_secs: u32,
    /// Flat point value for questions without an explicit one.
    pub points_per_question: i32,
    /// Shared secret the scanned code must match to unlock the round.
    pub gate_secret: String,
    /// Location hint revealed after clearing the round.
    pub hint: String,
    /// Pools the round draws questions from, in presentation order.
    pub pools: Vec<QuestionPool>,
}

impl RoundSpec {
    /// Total number of questions a participant faces in this round.
    pub fn question_count(&self) -> usize {
        self.pools.iter().map(|pool| pool.picks).sum()
    }

    /// Effective point value of a question played under this round.
    pub fn question_points(&self, question: &Question) -> i32 {
        question.points.unwrap_or(self.points_per_question)
    }
}

/// Hard cap on rounds so completion flags fit the wire encoding.
pub const MAX_ROUNDS: usize = 8;

/// Content-authoring defects. All of these are fatal at startup: they
/// describe broken authored content, not runtime conditions.
#[derive(Debug, Error)]
pub enum ContentError {
    /// The game defines no rounds at all.
    #[error("game content defines no rounds")]
    NoRounds,
    /// More rounds than the engine tracks completion flags for.
    #[error("game content defines {count} rounds, more than the supported {MAX_ROUNDS}")]
    TooManyRounds { count: usize },
    /// A round has no pools to draw from.
    #[error("round {round} (`{title}`) has no question pools")]
    NoPools { round: u8, title: String },
    /// A pool exists but is empty.
    #[error("round {round} pool `{salt}` is empty")]
    EmptyPool { round: u8, salt: String },
    /// A pool asks for more picks than it has questions.
    #[error("round {round} pool `{salt}` picks {picks} from only {available} questions")]
    TooManyPicks {
        round: u8,
        salt: String,
        picks: usize,
        available: usize,
    },
    /// A question's correct answer points outside its options.
    #[error("round {round} pool `{salt}` question {index}: correct_index {correct_index} out of range for {options} options")]
    CorrectIndexOutOfRange {
        round: u8,
        salt: String,
        index: usize,
        correct_index: usize,
        options: usize,
    },
    /// A question has fewer than two options to choose between.
    #[error("round {round} pool `{salt}` question {index} has fewer than two options")]
    TooFewOptions {
        round: u8,
        salt: String,
        index: usize,
    },
    /// Negative point values break the halving penalty rule.
    #[error("round {round} pool `{salt}` question {index} has a negative point value")]
    NegativePoints {
        round: u8,
        salt: String,
        index: usize,
    },
    /// The flat fallback point value is negative, which would invert
    /// scoring for every question without an explicit value.
    #[error("round {round} (`{title}`) has a negative flat point value")]
    NegativeFlatPoints { round: u8, title: String },
    /// The gate secret is blank, which would let any scan through.
    #[error("round {round} (`{title}`) has a blank gate secret")]
    BlankGateSecret { round: u8, title: String },
}

/// Validate authored rounds, front to back, failing on the first defect.
pub fn validate_rounds(rounds: &[RoundSpec]) -> Result<(), ContentError> {
    if rounds.is_empty() {
        return Err(ContentError::NoRounds);
    }
    if rounds.len() > MAX_ROUNDS {
        return Err(ContentError::TooManyRounds {
            count: rounds.len(),
        });
    }

    for (i, spec) in rounds.iter().enumerate() {
        let round = (i + 1) as u8;
        if spec.gate_secret.trim().is_empty() {
            return Err(ContentError::BlankGateSecret {
                round,
                title: spec.title.clone(),
            });
        }
        if spec.points_per_question < 0 {
            return Err(ContentError::NegativeFlatPoints {
                round,
                title: spec.title.clone(),
            });
        }
        if spec.pools.is_empty() {
            return Err(ContentError::NoPools {
                round,
                title: spec.title.clone(),
            });
        }
        for pool in &spec.pools {
            if pool.questions.is_empty() {
                return Err(ContentError::EmptyPool {
                    round,
                    salt: pool.salt.clone(),
                });
            }
            if pool.picks == 0 || pool.picks > pool.questions.len() {
                return Err(ContentError::TooManyPicks {
                    round,
                    salt: pool.salt.clone(),
                    picks: pool.picks,
                    available: pool.questions.len(),
                });
            }
            for (index, question) in pool.questions.iter().enumerate() {
                if question.options.len() < 2 {
                    return Err(ContentError::TooFewOptions {
                        round,
                        salt: pool.salt.clone(),
                        index,
                    });
                }
                if question.correct_index >= question.options.len() {
                    return Err(ContentError::CorrectIndexOutOfRange {
                        round,
                        salt: pool.salt.clone(),
                        index,
                        correct_index: question.correct_index,
                        options: question.options.len(),
                    });
                }
                if question.points.is_some_and(|p| p < 0) {
                    return Err(ContentError::NegativePoints {
                        round,
                        salt: pool.salt.clone(),
                        index,
                    });
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(correct_index: usize) -> Question {
        Question {
            prompt: "2 + 2 = ?".into(),
            options: vec!["3".into(), "4".into()],
            correct_index,
            image: None,
            points: None,
        }
    }

    fn round(pools: Vec<QuestionPool>) -> RoundSpec {
        RoundSpec {
            title: "Warmup".into(),
            countdown_secs: 60,
            points_per_question: 10,
            gate_secret: "open_sesame".into(),
            hint: "look under the bench".into(),
            pools,
        }
    }

    #[test]
    fn builtin_rounds_are_valid() {
        validate_rounds(&builtin_rounds()).unwrap();
    }

    #[test]
    fn empty_game_is_rejected() {
        assert!(matches!(validate_rounds(&[]), Err(ContentError::NoRounds)));
    }

    #[test]
    fn empty_pool_is_rejected() {
        let rounds = vec![round(vec![QuestionPool {
            salt: "warmup".into(),
            picks: 1,
            questions: vec![],
        }])];
        assert!(matches!(
            validate_rounds(&rounds),
            Err(ContentError::EmptyPool { round: 1, .. })
        ));
    }

    #[test]
    fn overdrawn_pool_is_rejected() {
        let rounds = vec![round(vec![QuestionPool {
            salt: "warmup".into(),
            picks: 3,
            questions: vec![question(0), question(1)],
        }])];
        assert!(matches!(
            validate_rounds(&rounds),
            Err(ContentError::TooManyPicks { picks: 3, available: 2, .. })
        ));
    }

    #[test]
    fn out_of_range_answer_is_rejected() {
        let rounds = vec![round(vec![QuestionPool {
            salt: "warmup".into(),
            picks: 1,
            questions: vec![question(2)],
        }])];
        assert!(matches!(
            validate_rounds(&rounds),
            Err(ContentError::CorrectIndexOutOfRange { correct_index: 2, .. })
        ));
    }

    #[test]
    fn blank_secret_is_rejected() {
        let mut spec = round(vec![QuestionPool {
            salt: "warmup".into(),
            picks: 1,
            questions: vec![question(0)],
        }]);
        spec.gate_secret = "   ".into();
        assert!(matches!(
            validate_rounds(&[spec]),
            Err(ContentError::BlankGateSecret { round: 1, .. })
        ));
    }

    #[test]
    fn negative_flat_points_are_rejected() {
        let mut spec = round(vec![QuestionPool {
            salt: "warmup".into(),
            picks: 1,
            questions: vec![question(0)],
        }]);
        spec.points_per_question = -5;
        assert!(matches!(
            validate_rounds(&[spec]),
            Err(ContentError::NegativeFlatPoints { round: 1, .. })
        ));
    }

    #[test]
    fn per_question_points_override_the_flat_value() {
        let spec = round(vec![]);
        let flat = question(0);
        let weighted = Question {
            points: Some(20),
            ..question(0)
        };
        assert_eq!(spec.question_points(&flat), 10);
        assert_eq!(spec.question_points(&weighted), 20);
    }
}
