//! The participant-side game engine.
//!
//! One [`GameEngine`] owns everything mutable on the device: the phase
//! machine, round progress, score, lifelines, both timers, the anti-cheat
//! monitor, and the derived operator signals. Each method folds one player
//! action or one observed fact into that state and returns the [`Notice`]s
//! presentation should react to. Remote effects accumulate in a
//! [`ProgressPatch`] that the runtime drains and pushes to the store.

mod reconcile;
pub mod runtime;

use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::anticheat::{BREACH_WARNING, FocusBreach, FocusMonitor, Visibility};
use crate::content::{MAX_ROUNDS, Question, RoundSpec, questions_for_round};
use crate::dao::models::{ParticipantRecord, ProgressPatch};
use crate::dao::store::StoreResult;
use crate::error::EngineError;
use crate::leaderboard::LeaderboardEntry;
use crate::scoring::{self, MAX_LIFELINES, ROUND_CLEAR_BONUS};
use crate::state::machine::{GameEvent, GamePhase, SessionStateMachine};
use crate::state::signals::{GlobalSignals, SignalChange};
use crate::timer::{CountdownTick, GlobalStopwatch, QuestionCountdown};

/// Sound effect triggered by local gameplay, as opposed to the operator
/// cues that arrive through the control record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SoundEffect {
    /// Correct answer.
    Correct,
    /// Wrong answer or anti-cheat penalty.
    Wrong,
    /// Countdown expired.
    Timeout,
    /// Round cleared.
    RoundClear,
    /// Last lifeline spent.
    Eliminated,
    /// Hunt completed.
    Victory,
}

/// One thing presentation must react to.
///
/// The engine never draws anything itself; it narrates state changes as a
/// stream of notices and leaves rendering, sound, and toasts to whatever
/// front sits on top.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "data")]
pub enum Notice {
    /// A username was claimed and the run can begin.
    Registered {
        /// Claimed display name.
        username: String,
        /// Store-assigned session id, needed to resume later.
        participant_id: Uuid,
    },
    /// The store rejected the registration.
    RegistrationFailed {
        /// Human-readable cause.
        reason: String,
    },
    /// An existing session was adopted.
    Resumed {
        /// Display name of the resumed session.
        username: String,
        /// Round the session was on.
        round: u8,
        /// Score so far.
        score: i32,
        /// Lifelines left.
        lifelines: u8,
    },
    /// The session could not be resumed.
    ResumeFailed {
        /// Human-readable cause.
        reason: String,
    },
    /// Hunting for the next gate.
    AwaitingGate {
        /// Round whose gate is sought.
        round: u8,
        /// Round title.
        title: String,
    },
    /// A scanned code did not match the gate secret.
    GateRejected {
        /// Round whose gate refused the code.
        round: u8,
    },
    /// A gate was unlocked and questions are about to start.
    RoundStarted {
        /// Unlocked round.
        round: u8,
        /// Round title.
        title: String,
        /// Number of questions in this participant's hand.
        questions: usize,
    },
    /// A question went live.
    QuestionPresented {
        /// Round the question belongs to.
        round: u8,
        /// 1-based position within the round.
        number: usize,
        /// Total questions in the round.
        total: usize,
        /// The question itself.
        question: Question,
        /// Seconds on the fresh countdown.
        countdown_secs: u32,
    },
    /// The live question's countdown advanced.
    CountdownTick {
        /// Seconds left.
        remaining: u32,
    },
    /// An answer was judged.
    AnswerJudged {
        /// Whether it was the correct option.
        correct: bool,
        /// Score delta applied.
        delta: i32,
        /// Score after the delta.
        score: i32,
    },
    /// The countdown expired before an answer.
    TimedOut {
        /// Score delta applied.
        delta: i32,
        /// Score after the delta.
        score: i32,
    },
    /// A lifeline was spent.
    LifelineLost {
        /// Lifelines remaining.
        remaining: u8,
    },
    /// The screen came back after a charged focus excursion.
    BreachWarning {
        /// Warning text to show.
        message: String,
    },
    /// A round was cleared.
    RoundCleared {
        /// Cleared round.
        round: u8,
        /// First-clear bonus granted, zero on a repeat.
        bonus: i32,
        /// Location hint for the next gate.
        hint: String,
    },
    /// The whole hunt was completed.
    HuntFinished {
        /// Final score, bonuses included.
        score: i32,
        /// Bonus earned for unspent lifelines.
        lifeline_bonus: i32,
        /// Total run time in seconds.
        elapsed_secs: u32,
    },
    /// The last lifeline is gone.
    Eliminated {
        /// Round the run ended in.
        round: u8,
    },
    /// An operator revived the run.
    Revived {
        /// Round play resumes in.
        round: u8,
        /// Restored lifeline count.
        lifelines: u8,
    },
    /// An operator moved the run to another round.
    RoundSkipped {
        /// Round the run was moved to.
        round: u8,
    },
    /// An operator raised the lifeline count outside elimination.
    LifelinesAdjusted {
        /// New lifeline count.
        lifelines: u8,
    },
    /// An operator adjusted the score remotely.
    ScoreAdjusted {
        /// New score.
        score: i32,
    },
    /// A global operator signal changed.
    Signal(SignalChange),
    /// A gameplay sound effect fired.
    Effect(SoundEffect),
    /// Fresh standings, ranked.
    Standings(Vec<LeaderboardEntry>),
    /// The session was wiped back to login.
    SessionReset,
    /// A player action was refused.
    ActionFailed {
        /// Human-readable cause.
        reason: String,
    },
}

/// Bitset of rounds cleared this run, indexed from round 1.
///
/// Keeps the first-clear bonus a one-time event even when an operator
/// bounces the participant back and forth between rounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompletionFlags(u8);

impl CompletionFlags {
    /// Mark `round` cleared; true when this is the first time.
    pub fn mark(&mut self, round: u8) -> bool {
        if round == 0 || usize::from(round) > MAX_ROUNDS {
            return false;
        }
        let bit = 1u8 << (round - 1);
        let newly = self.0 & bit == 0;
        self.0 |= bit;
        newly
    }

    /// Whether `round` has been cleared.
    pub fn is_cleared(self, round: u8) -> bool {
        if round == 0 || usize::from(round) > MAX_ROUNDS {
            return false;
        }
        self.0 & (1u8 << (round - 1)) != 0
    }

    /// Number of rounds cleared so far.
    pub fn count(self) -> u32 {
        self.0.count_ones()
    }
}

#[derive(Debug, Clone)]
struct Identity {
    id: Uuid,
    username: String,
}

/// Complete state of one participant's run on this device.
#[derive(Debug)]
pub struct GameEngine {
    rounds: Vec<RoundSpec>,
    machine: SessionStateMachine,
    identity: Option<Identity>,
    round: u8,
    score: i32,
    lifelines: u8,
    cleared: CompletionFlags,
    question_index: usize,
    questions: Vec<Question>,
    countdown: Option<QuestionCountdown>,
    stopwatch: GlobalStopwatch,
    monitor: FocusMonitor,
    signals: GlobalSignals,
    dirty: ProgressPatch,
}

impl GameEngine {
    /// A fresh engine over the given rounds, waiting at the login screen.
    pub fn new(rounds: Vec<RoundSpec>) -> Self {
        Self {
            rounds,
            machine: SessionStateMachine::new(),
            identity: None,
            round: 1,
            score: 0,
            lifelines: MAX_LIFELINES,
            cleared: CompletionFlags::default(),
            question_index: 0,
            questions: Vec::new(),
            countdown: None,
            stopwatch: GlobalStopwatch::default(),
            monitor: FocusMonitor::default(),
            signals: GlobalSignals::default(),
            dirty: ProgressPatch::default(),
        }
    }

    /// Current phase of the run.
    pub fn phase(&self) -> GamePhase {
        self.machine.phase()
    }

    /// Store id of the active session, if one is registered.
    pub fn participant_id(&self) -> Option<Uuid> {
        self.identity.as_ref().map(|identity| identity.id)
    }

    /// Display name of the active session, if one is registered.
    pub fn username(&self) -> Option<&str> {
        self.identity.as_ref().map(|identity| identity.username.as_str())
    }

    /// Round the run is currently on, starting at 1. One past the last
    /// round means the hunt is finished.
    pub fn round(&self) -> u8 {
        self.round
    }

    /// Current score. Can be negative.
    pub fn score(&self) -> i32 {
        self.score
    }

    /// Lifelines left.
    pub fn lifelines(&self) -> u8 {
        self.lifelines
    }

    /// Seconds the run clock has counted so far.
    pub fn elapsed_secs(&self) -> u32 {
        self.stopwatch.elapsed_secs()
    }

    /// Which rounds have been cleared this run.
    pub fn completions(&self) -> CompletionFlags {
        self.cleared
    }

    /// The question currently live, if any.
    pub fn current_question(&self) -> Option<&Question> {
        if self.machine.phase() != GamePhase::InRound {
            return None;
        }
        self.questions.get(self.question_index)
    }

    /// Steady-state view of the operator's global signals.
    pub fn signals(&self) -> &GlobalSignals {
        &self.signals
    }

    /// Whether the poller should fetch this participant's own row.
    ///
    /// Finished runs no longer accept remote edits, but eliminated ones
    /// keep polling: revival arrives through the same merge.
    pub fn wants_remote_merge(&self) -> bool {
        self.identity.is_some() && self.machine.phase() != GamePhase::Finished
    }

    /// Fold the outcome of a registration call into the session.
    pub fn registration_complete(&mut self, outcome: StoreResult<ParticipantRecord>) -> Vec<Notice> {
        let mut notices = Vec::new();
        match outcome {
            Ok(record) if self.machine.phase() == GamePhase::Login => {
                self.identity = Some(Identity {
                    id: record.id,
                    username: record.username.clone(),
                });
                notices.push(Notice::Registered {
                    username: record.username,
                    participant_id: record.id,
                });
                self.apply_or_log(GameEvent::Registered);
                notices.push(self.awaiting_gate());
            }
            Ok(record) => {
                debug!(participant = %record.id, "registration landed after leaving login; dropped");
            }
            Err(err) => {
                warn!(error = %err, "registration failed");
                notices.push(Notice::RegistrationFailed {
                    reason: err.to_string(),
                });
            }
        }
        notices
    }

    /// Fold the outcome of a resume lookup into the session.
    ///
    /// The stored row decides where the run continues: completed rows land
    /// straight in the finished phase, rows without lifelines in
    /// elimination, everything else at the next gate.
    pub fn resume_complete(
        &mut self,
        outcome: StoreResult<Option<ParticipantRecord>>,
    ) -> Vec<Notice> {
        let mut notices = Vec::new();
        if self.machine.phase() != GamePhase::Login {
            debug!("resume landed after leaving login; dropped");
            return notices;
        }
        match outcome {
            Ok(Some(record)) => {
                self.identity = Some(Identity {
                    id: record.id,
                    username: record.username.clone(),
                });
                self.score = record.score;
                self.lifelines = Self::adopt_lifelines(record.lifelines);
                let last = self.rounds.len() as i32;
                self.round = record.current_round.clamp(1, last + 1) as u8;
                for earlier in 1..self.round {
                    self.cleared.mark(earlier);
                }
                notices.push(Notice::Resumed {
                    username: record.username,
                    round: self.round,
                    score: self.score,
                    lifelines: self.lifelines,
                });
                if record.completed || i32::from(self.round) > last {
                    self.apply_or_log(GameEvent::GameCompleted);
                } else if self.lifelines == 0 {
                    self.apply_or_log(GameEvent::LifelinesExhausted);
                } else {
                    self.apply_or_log(GameEvent::Registered);
                    notices.push(self.awaiting_gate());
                }
            }
            Ok(None) => notices.push(Notice::ResumeFailed {
                reason: "no session with that id".into(),
            }),
            Err(err) => {
                warn!(error = %err, "resume failed");
                notices.push(Notice::ResumeFailed {
                    reason: err.to_string(),
                });
            }
        }
        notices
    }

    /// Present a scanned code to the current round's gate.
    ///
    /// A mismatch is a normal gameplay outcome, not an error: the scan is
    /// rejected and the participant keeps hunting.
    pub fn scan_gate(&mut self, code: &str) -> Result<Vec<Notice>, EngineError> {
        if self.machine.phase() != GamePhase::AwaitingScan {
            return Err(EngineError::InvalidState(
                "no gate is waiting for a scan".into(),
            ));
        }
        let Some(identity) = &self.identity else {
            return Err(EngineError::InvalidState("not registered".into()));
        };
        let spec = self
            .rounds
            .get(usize::from(self.round) - 1)
            .ok_or_else(|| EngineError::InvalidState("current round has no content".into()))?;
        if code.trim() != spec.gate_secret {
            return Ok(vec![Notice::GateRejected { round: self.round }]);
        }
        let hand = questions_for_round(&identity.username, spec);
        let title = spec.title.clone();

        self.machine.apply(GameEvent::GateUnlocked)?;
        self.questions = hand;
        self.question_index = 0;
        self.stopwatch.start();
        let mut notices = vec![Notice::RoundStarted {
            round: self.round,
            title,
            questions: self.questions.len(),
        }];
        self.present_question(&mut notices);
        Ok(notices)
    }

    /// Judge an answer to the live question.
    pub fn answer(&mut self, option: usize) -> Result<Vec<Notice>, EngineError> {
        if self.machine.phase() != GamePhase::InRound {
            return Err(EngineError::InvalidState(
                "no question is live right now".into(),
            ));
        }
        let Some(question) = self.questions.get(self.question_index).cloned() else {
            return Err(EngineError::InvalidState(
                "no question is live right now".into(),
            ));
        };
        if option >= question.options.len() {
            return Err(EngineError::InvalidInput(format!(
                "option {option} is out of range for {} choices",
                question.options.len()
            )));
        }
        let correct = option == question.correct_index;
        let delta = {
            let spec = self
                .rounds
                .get(usize::from(self.round) - 1)
                .ok_or_else(|| EngineError::InvalidState("current round has no content".into()))?;
            scoring::answer_delta(spec, &question, correct)
        };

        let mut notices = Vec::new();
        self.add_score(delta);
        notices.push(Notice::Effect(if correct {
            SoundEffect::Correct
        } else {
            SoundEffect::Wrong
        }));
        notices.push(Notice::AnswerJudged {
            correct,
            delta,
            score: self.score,
        });
        if correct {
            self.advance(&mut notices);
        } else if self.lose_lifeline(&mut notices) {
            self.advance(&mut notices);
        }
        Ok(notices)
    }

    /// Leave the hint screen for the next round's gate.
    pub fn acknowledge_hint(&mut self) -> Result<Vec<Notice>, EngineError> {
        self.machine.apply(GameEvent::HintAcknowledged)?;
        self.round += 1;
        self.question_index = 0;
        self.questions.clear();
        self.countdown = None;
        self.dirty.current_round = Some(i32::from(self.round));
        Ok(vec![self.awaiting_gate()])
    }

    /// Feed one visibility report from the host platform.
    ///
    /// Going hidden while a question is live costs a lifeline but never
    /// touches the score or the question; coming back surfaces the breach
    /// warning.
    pub fn observe_visibility(&mut self, visibility: Visibility) -> Vec<Notice> {
        let armed = self.machine.phase() == GamePhase::InRound;
        let mut notices = Vec::new();
        match self.monitor.observe(visibility, armed) {
            Some(FocusBreach::Away) => {
                notices.push(Notice::Effect(SoundEffect::Wrong));
                self.lose_lifeline(&mut notices);
            }
            Some(FocusBreach::Returned) => notices.push(Notice::BreachWarning {
                message: BREACH_WARNING.into(),
            }),
            None => {}
        }
        notices
    }

    /// Advance both clocks by one second.
    ///
    /// The run stopwatch counts silently; the question countdown reports
    /// every remaining second and fires the timeout exactly once.
    pub fn tick(&mut self) -> Vec<Notice> {
        let mut notices = Vec::new();
        self.stopwatch.tick();
        let step = self.countdown.as_mut().map(QuestionCountdown::tick);
        match step {
            Some(CountdownTick::Running(remaining)) => {
                notices.push(Notice::CountdownTick { remaining });
            }
            Some(CountdownTick::Expired) => self.question_timed_out(&mut notices),
            Some(CountdownTick::Spent) | None => {}
        }
        notices
    }

    /// Wipe the session back to login. Only valid from a terminal phase;
    /// mid-run the machine refuses, so a stray reset can never eat a run.
    pub fn reset(&mut self) -> Result<Vec<Notice>, EngineError> {
        self.machine.apply(GameEvent::FullReset)?;
        self.identity = None;
        self.round = 1;
        self.score = 0;
        self.lifelines = MAX_LIFELINES;
        self.cleared = CompletionFlags::default();
        self.question_index = 0;
        self.questions.clear();
        self.countdown = None;
        self.stopwatch.reset();
        self.monitor.reset();
        self.dirty = ProgressPatch::default();
        Ok(vec![Notice::SessionReset])
    }

    /// Drain the accumulated progress patch, if it changes anything.
    pub fn take_patch(&mut self) -> Option<ProgressPatch> {
        if self.dirty.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.dirty))
    }

    /// Put a failed push back into the dirty patch.
    ///
    /// Fields mutated again since the push left keep their newer value;
    /// only fields still untouched fall back to the failed patch.
    pub fn restore_patch(&mut self, failed: ProgressPatch) {
        let newer = std::mem::take(&mut self.dirty);
        self.dirty = ProgressPatch {
            score: newer.score.or(failed.score),
            current_round: newer.current_round.or(failed.current_round),
            lifelines: newer.lifelines.or(failed.lifelines),
            completed: newer.completed.or(failed.completed),
            completion_time: newer.completion_time.or(failed.completion_time),
        };
    }

    fn apply_or_log(&mut self, event: GameEvent) {
        if let Err(err) = self.machine.apply(event) {
            debug!(error = %err, "internal transition dropped");
        }
    }

    fn adopt_lifelines(raw: i32) -> u8 {
        let clamped = raw.clamp(0, i32::from(MAX_LIFELINES));
        if clamped != raw {
            warn!(lifelines = raw, "remote lifelines out of range; clamped to {clamped}");
        }
        clamped as u8
    }

    fn awaiting_gate(&self) -> Notice {
        let title = self
            .rounds
            .get(usize::from(self.round) - 1)
            .map(|spec| spec.title.clone())
            .unwrap_or_default();
        Notice::AwaitingGate {
            round: self.round,
            title,
        }
    }

    fn add_score(&mut self, delta: i32) {
        self.score += delta;
        self.dirty.score = Some(self.score);
    }

    /// Spend one lifeline; true while the run stays alive.
    fn lose_lifeline(&mut self, notices: &mut Vec<Notice>) -> bool {
        if self.lifelines == 0 {
            return false;
        }
        self.lifelines -= 1;
        self.dirty.lifelines = Some(i32::from(self.lifelines));
        notices.push(Notice::LifelineLost {
            remaining: self.lifelines,
        });
        if self.lifelines > 0 {
            return true;
        }
        self.eliminate(notices);
        false
    }

    /// End the run: freeze the clock, drop the question, park in
    /// elimination until an operator revives or the player resets.
    fn eliminate(&mut self, notices: &mut Vec<Notice>) {
        self.apply_or_log(GameEvent::LifelinesExhausted);
        self.countdown = None;
        self.stopwatch.stop();
        notices.push(Notice::Effect(SoundEffect::Eliminated));
        notices.push(Notice::Eliminated { round: self.round });
    }

    fn present_question(&mut self, notices: &mut Vec<Notice>) {
        let Some(question) = self.questions.get(self.question_index).cloned() else {
            return;
        };
        let countdown_secs = self
            .rounds
            .get(usize::from(self.round) - 1)
            .map(|spec| spec.countdown_secs)
            .unwrap_or_default();
        self.countdown = Some(QuestionCountdown::new(countdown_secs));
        notices.push(Notice::QuestionPresented {
            round: self.round,
            number: self.question_index + 1,
            total: self.questions.len(),
            question,
            countdown_secs,
        });
    }

    fn advance(&mut self, notices: &mut Vec<Notice>) {
        self.countdown = None;
        if self.question_index + 1 < self.questions.len() {
            self.question_index += 1;
            self.present_question(notices);
        } else {
            self.complete_round(notices);
        }
    }

    fn complete_round(&mut self, notices: &mut Vec<Notice>) {
        let round = self.round;
        let bonus = if self.cleared.mark(round) {
            ROUND_CLEAR_BONUS
        } else {
            0
        };
        if bonus != 0 {
            self.add_score(bonus);
        }
        let (hint, is_last) = match self.rounds.get(usize::from(round) - 1) {
            Some(spec) => (spec.hint.clone(), usize::from(round) == self.rounds.len()),
            None => (String::new(), true),
        };
        if !is_last {
            notices.push(Notice::Effect(SoundEffect::RoundClear));
        }
        notices.push(Notice::RoundCleared { round, bonus, hint });
        if is_last {
            self.finish(notices);
        } else {
            self.apply_or_log(GameEvent::RoundCleared);
        }
    }

    fn finish(&mut self, notices: &mut Vec<Notice>) {
        let lifeline_bonus = scoring::lifeline_bonus(self.lifelines);
        if lifeline_bonus != 0 {
            self.add_score(lifeline_bonus);
        }
        self.apply_or_log(GameEvent::GameCompleted);
        self.countdown = None;
        self.stopwatch.stop();
        let elapsed_secs = self.stopwatch.elapsed_secs();
        // One past the last round is the wire encoding for "finished".
        self.round = self.rounds.len() as u8 + 1;
        self.dirty.current_round = Some(i32::from(self.round));
        self.dirty.completed = Some(true);
        self.dirty.completion_time = Some(elapsed_secs as i32);
        notices.push(Notice::Effect(SoundEffect::Victory));
        notices.push(Notice::HuntFinished {
            score: self.score,
            lifeline_bonus,
            elapsed_secs,
        });
    }

    fn question_timed_out(&mut self, notices: &mut Vec<Notice>) {
        let Some(question) = self.questions.get(self.question_index).cloned() else {
            return;
        };
        let delta = match self.rounds.get(usize::from(self.round) - 1) {
            Some(spec) => scoring::timeout_delta(spec, &question),
            None => 0,
        };
        self.add_score(delta);
        notices.push(Notice::Effect(SoundEffect::Timeout));
        notices.push(Notice::TimedOut {
            delta,
            score: self.score,
        });
        if self.lose_lifeline(notices) {
            self.advance(notices);
        }
    }
}
