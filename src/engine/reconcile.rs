//! One-directional merge of the remotely fetched participant row.
//!
//! Operators edit rows directly in the store; the engine folds the row in
//! field by field, in a fixed order: round, then lifelines, then score.
//! Round and lifelines move forward only (operator skips and revivals),
//! never backward, so a stale poll response cannot rewind local progress;
//! score is adopted on any divergence. Each adopted field cancels its own
//! pending push so a stale patch cannot undo the operator's edit. Adoption
//! never writes back, and applying the same row twice changes nothing.

use tracing::debug;

use super::{GameEngine, Notice, SoundEffect};
use crate::content::questions_for_round;
use crate::control::ControlCommand;
use crate::dao::models::ParticipantRecord;
use crate::state::machine::{GameEvent, GamePhase};

impl GameEngine {
    /// Fold one fetched copy of this participant's own row into the run.
    pub fn reconcile(&mut self, remote: &ParticipantRecord) -> Vec<Notice> {
        let mut notices = Vec::new();
        let Some(own_id) = self.participant_id() else {
            return notices;
        };
        if remote.id != own_id {
            debug!(got = %remote.id, "reconcile fetched a foreign row; skipped");
            return notices;
        }
        if self.machine.phase() == GamePhase::Finished {
            return notices;
        }

        self.merge_round(remote, &mut notices);
        if self.machine.phase() == GamePhase::Finished {
            // The round merge forced completion; the rest of the row no
            // longer applies.
            return notices;
        }
        self.merge_lifelines(remote, &mut notices);
        self.merge_score(remote, &mut notices);
        notices
    }

    /// Fold one decoded control command into the global signals.
    pub fn absorb_control(&mut self, command: &ControlCommand) -> Vec<Notice> {
        self.signals
            .absorb(command)
            .into_iter()
            .map(Notice::Signal)
            .collect()
    }

    fn merge_round(&mut self, remote: &ParticipantRecord, notices: &mut Vec<Notice>) {
        // Rounds only move forward; a lower value is a stale fetch, not an
        // operator edit, and must not cancel the pending round push.
        if remote.current_round <= i32::from(self.round) {
            return;
        }
        self.dirty.current_round = None;
        if remote.current_round > self.rounds.len() as i32 {
            if self.machine.phase() == GamePhase::Eliminated {
                debug!("remote round past the end while eliminated; ignored");
            } else {
                self.force_finish(notices);
            }
            return;
        }
        self.round = remote.current_round as u8;
        self.question_index = 0;
        self.questions.clear();
        self.countdown = None;
        notices.push(Notice::RoundSkipped { round: self.round });
        // While eliminated the move is recorded but play stays parked;
        // a later revival enters the adopted round.
        self.apply_or_log(GameEvent::RoundSkipped);
        if self.machine.phase() == GamePhase::AwaitingScan {
            notices.push(self.awaiting_gate());
        }
    }

    /// A remote round past the last one is the operator forcing the finish.
    /// No bonuses apply: those are earned by clearing rounds, not granted.
    fn force_finish(&mut self, notices: &mut Vec<Notice>) {
        self.apply_or_log(GameEvent::GameCompleted);
        self.countdown = None;
        self.stopwatch.stop();
        self.round = self.rounds.len() as u8 + 1;
        notices.push(Notice::Effect(SoundEffect::Victory));
        notices.push(Notice::HuntFinished {
            score: self.score,
            lifeline_bonus: 0,
            elapsed_secs: self.stopwatch.elapsed_secs(),
        });
    }

    fn merge_lifelines(&mut self, remote: &ParticipantRecord, notices: &mut Vec<Notice>) {
        let incoming = Self::adopt_lifelines(remote.lifelines);
        // Lifelines only grow through this path: losses are always local,
        // so a lower count is a stale fetch and is ignored.
        if incoming <= self.lifelines {
            return;
        }
        self.dirty.lifelines = None;
        if self.machine.phase() == GamePhase::Eliminated {
            self.revive(incoming, notices);
            return;
        }
        self.lifelines = incoming;
        notices.push(Notice::LifelinesAdjusted {
            lifelines: incoming,
        });
    }

    /// Re-enter play at the start of the current round: a fresh hand and a
    /// fresh countdown, with the run clock continuing from its frozen total.
    fn revive(&mut self, lifelines: u8, notices: &mut Vec<Notice>) {
        self.apply_or_log(GameEvent::Revived);
        self.lifelines = lifelines;
        self.question_index = 0;
        self.questions = self
            .identity
            .as_ref()
            .zip(self.rounds.get(usize::from(self.round) - 1))
            .map(|(identity, spec)| questions_for_round(&identity.username, spec))
            .unwrap_or_default();
        self.stopwatch.resume();
        notices.push(Notice::Revived {
            round: self.round,
            lifelines,
        });
        self.present_question(notices);
    }

    fn merge_score(&mut self, remote: &ParticipantRecord, notices: &mut Vec<Notice>) {
        if remote.score == self.score {
            return;
        }
        self.dirty.score = None;
        self.score = remote.score;
        notices.push(Notice::ScoreAdjusted { score: self.score });
    }
}
