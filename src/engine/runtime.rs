//! Single-task runtime around the engine.
//!
//! All engine state lives inside one select loop: a one-second ticker for
//! the timers, the poll interval for reconciliation and control, the
//! player's action channel, and a reply channel that folds finished store
//! calls back in. Store I/O runs on spawned tasks so the loop never blocks,
//! and because every mutation happens on this one task the engine needs no
//! locks at all.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{GameEngine, Notice};
use crate::anticheat::Visibility;
use crate::config::HuntConfig;
use crate::control::ControlCommand;
use crate::dao::models::{NewParticipant, ParticipantRecord, ProgressPatch};
use crate::dao::store::{ParticipantStore, StoreResult};
use crate::error::EngineError;
use crate::leaderboard;
use crate::state::machine::GamePhase;

/// One input from the player's side of the device.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerAction {
    /// Claim a username and start a fresh run.
    Register {
        /// Desired display name.
        username: String,
    },
    /// Adopt an existing session by its store id.
    Resume {
        /// Store id handed out at registration.
        participant_id: Uuid,
    },
    /// Present a scanned code to the current gate.
    ScanGate {
        /// Raw scanned text.
        code: String,
    },
    /// Answer the live question.
    Answer {
        /// 0-based option index.
        option: usize,
    },
    /// Leave the hint screen for the next gate.
    AcknowledgeHint,
    /// The host platform reported a visibility change.
    Visibility(Visibility),
    /// Fetch and rank the current standings.
    ShowStandings,
    /// Wipe the session after elimination or victory.
    Reset,
}

/// Outcome of a spawned store call, folded back into the loop.
enum StoreReply {
    Registered(StoreResult<ParticipantRecord>),
    Resumed(StoreResult<Option<ParticipantRecord>>),
    Polled {
        participant: Option<StoreResult<Option<ParticipantRecord>>>,
        control: StoreResult<Option<ControlCommand>>,
    },
    Pushed {
        id: Uuid,
        patch: ProgressPatch,
        outcome: StoreResult<()>,
    },
    Standings(StoreResult<Vec<ParticipantRecord>>),
    Wiped {
        id: Uuid,
        outcome: StoreResult<()>,
    },
}

/// Cloneable handle feeding player actions into a running engine loop.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    actions: mpsc::UnboundedSender<PlayerAction>,
}

impl EngineHandle {
    /// Queue one action. Returns false once the engine loop is gone.
    pub fn act(&self, action: PlayerAction) -> bool {
        self.actions.send(action).is_ok()
    }
}

/// Start the engine loop over `store`.
///
/// Returns the action handle, the notice stream presentation consumes, and
/// the loop's join handle. The loop stops when every action handle is
/// dropped.
pub fn spawn(
    config: HuntConfig,
    store: Arc<dyn ParticipantStore>,
) -> (
    EngineHandle,
    mpsc::UnboundedReceiver<Notice>,
    JoinHandle<()>,
) {
    let (actions_tx, actions_rx) = mpsc::unbounded_channel();
    let (notices_tx, notices_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run(config, store, actions_rx, notices_tx));
    (EngineHandle { actions: actions_tx }, notices_rx, task)
}

async fn run(
    config: HuntConfig,
    store: Arc<dyn ParticipantStore>,
    mut actions: mpsc::UnboundedReceiver<PlayerAction>,
    notices: mpsc::UnboundedSender<Notice>,
) {
    let poll_every = config.poll_interval();
    let (replies_tx, mut replies_rx) = mpsc::unbounded_channel();
    let mut runtime = Runtime {
        engine: GameEngine::new(config.into_rounds()),
        store,
        replies: replies_tx,
        notices,
        poll_in_flight: false,
        push_in_flight: false,
        login_in_flight: false,
    };

    let mut ticker = interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut poller = interval(poll_every);
    poller.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => runtime.on_tick(),
            _ = poller.tick() => runtime.on_poll_due(),
            action = actions.recv() => match action {
                Some(action) => runtime.on_action(action),
                None => break,
            },
            Some(reply) = replies_rx.recv() => runtime.on_reply(reply),
        }
    }
    debug!("engine loop stopped");
}

struct Runtime {
    engine: GameEngine,
    store: Arc<dyn ParticipantStore>,
    replies: mpsc::UnboundedSender<StoreReply>,
    notices: mpsc::UnboundedSender<Notice>,
    poll_in_flight: bool,
    push_in_flight: bool,
    login_in_flight: bool,
}

impl Runtime {
    fn on_tick(&mut self) {
        let notices = self.engine.tick();
        self.dispatch(notices);
        self.flush_progress();
    }

    fn on_poll_due(&mut self) {
        if self.poll_in_flight {
            debug!("previous poll still in flight; skipping this cycle");
            return;
        }
        self.poll_in_flight = true;
        let participant_id = self
            .engine
            .wants_remote_merge()
            .then(|| self.engine.participant_id())
            .flatten();
        let store = Arc::clone(&self.store);
        let replies = self.replies.clone();
        tokio::spawn(async move {
            let participant = match participant_id {
                Some(id) => Some(store.fetch(id).await),
                None => None,
            };
            let control = store.fetch_control().await;
            let _ = replies.send(StoreReply::Polled {
                participant,
                control,
            });
        });
    }

    fn on_action(&mut self, action: PlayerAction) {
        match action {
            PlayerAction::Register { username } => self.begin_registration(username),
            PlayerAction::Resume { participant_id } => self.begin_resume(participant_id),
            PlayerAction::ScanGate { code } => self.apply(|engine| engine.scan_gate(&code)),
            PlayerAction::Answer { option } => self.apply(|engine| engine.answer(option)),
            PlayerAction::AcknowledgeHint => self.apply(GameEngine::acknowledge_hint),
            PlayerAction::Visibility(visibility) => {
                let notices = self.engine.observe_visibility(visibility);
                self.dispatch(notices);
                self.flush_progress();
            }
            PlayerAction::ShowStandings => self.begin_standings(),
            PlayerAction::Reset => self.begin_reset(),
        }
    }

    fn on_reply(&mut self, reply: StoreReply) {
        match reply {
            StoreReply::Registered(outcome) => {
                self.login_in_flight = false;
                let notices = self.engine.registration_complete(outcome);
                self.dispatch(notices);
            }
            StoreReply::Resumed(outcome) => {
                self.login_in_flight = false;
                let notices = self.engine.resume_complete(outcome);
                self.dispatch(notices);
            }
            StoreReply::Polled {
                participant,
                control,
            } => self.on_polled(participant, control),
            StoreReply::Pushed { id, patch, outcome } => {
                self.push_in_flight = false;
                match outcome {
                    Ok(()) => self.flush_progress(),
                    Err(err) => {
                        warn!(error = %err, "progress push failed; keeping the patch for retry");
                        if self.engine.participant_id() == Some(id) {
                            self.engine.restore_patch(patch);
                        } else {
                            debug!("dropping failed push for a retired session");
                        }
                    }
                }
            }
            StoreReply::Standings(outcome) => match outcome {
                Ok(rows) => self.emit(Notice::Standings(leaderboard::rank(rows))),
                Err(err) => {
                    warn!(error = %err, "standings fetch failed");
                    self.emit(Notice::ActionFailed {
                        reason: format!("standings unavailable: {err}"),
                    });
                }
            },
            StoreReply::Wiped { id, outcome } => match outcome {
                Ok(()) => debug!(participant = %id, "remote row deleted after reset"),
                Err(err) => {
                    // Best effort: the local wipe already happened.
                    warn!(participant = %id, error = %err, "failed to delete remote row after reset");
                }
            },
        }
    }

    fn on_polled(
        &mut self,
        participant: Option<StoreResult<Option<ParticipantRecord>>>,
        control: StoreResult<Option<ControlCommand>>,
    ) {
        self.poll_in_flight = false;
        if let Some(outcome) = participant {
            match outcome {
                Ok(Some(record)) => {
                    let notices = self.engine.reconcile(&record);
                    self.dispatch(notices);
                }
                Ok(None) => warn!("own participant row is missing remotely; keeping local state"),
                Err(err) => warn!(error = %err, "participant poll failed; retrying next cycle"),
            }
        }
        match control {
            Ok(Some(command)) => {
                let notices = self.engine.absorb_control(&command);
                self.dispatch(notices);
            }
            Ok(None) => {
                // A vanished control record clears latched signals rather
                // than freezing the last command on screen.
                let notices = self.engine.absorb_control(&ControlCommand::default());
                self.dispatch(notices);
            }
            Err(err) => warn!(error = %err, "control poll failed; keeping last signals"),
        }
    }

    fn begin_registration(&mut self, username: String) {
        let username = username.trim().to_string();
        if username.is_empty() {
            self.emit(Notice::ActionFailed {
                reason: "username must not be empty".into(),
            });
            return;
        }
        if self.engine.phase() != GamePhase::Login {
            self.emit(Notice::ActionFailed {
                reason: "a session is already active".into(),
            });
            return;
        }
        if self.login_in_flight {
            debug!("login call already in flight; dropping duplicate");
            return;
        }
        self.login_in_flight = true;
        let store = Arc::clone(&self.store);
        let replies = self.replies.clone();
        tokio::spawn(async move {
            let outcome = store.register(NewParticipant::fresh(username)).await;
            let _ = replies.send(StoreReply::Registered(outcome));
        });
    }

    fn begin_resume(&mut self, participant_id: Uuid) {
        if self.engine.phase() != GamePhase::Login {
            self.emit(Notice::ActionFailed {
                reason: "a session is already active".into(),
            });
            return;
        }
        if self.login_in_flight {
            debug!("login call already in flight; dropping duplicate");
            return;
        }
        self.login_in_flight = true;
        let store = Arc::clone(&self.store);
        let replies = self.replies.clone();
        tokio::spawn(async move {
            let outcome = store.fetch(participant_id).await;
            let _ = replies.send(StoreReply::Resumed(outcome));
        });
    }

    fn begin_standings(&self) {
        let store = Arc::clone(&self.store);
        let replies = self.replies.clone();
        tokio::spawn(async move {
            let outcome = store.list_participants().await;
            let _ = replies.send(StoreReply::Standings(outcome));
        });
    }

    fn begin_reset(&mut self) {
        let retired = self.engine.participant_id();
        match self.engine.reset() {
            Ok(notices) => {
                self.dispatch(notices);
                if let Some(id) = retired {
                    let store = Arc::clone(&self.store);
                    let replies = self.replies.clone();
                    tokio::spawn(async move {
                        let outcome = store.delete(id).await;
                        let _ = replies.send(StoreReply::Wiped { id, outcome });
                    });
                }
            }
            Err(err) => {
                debug!(error = %err, "reset rejected");
                self.emit(Notice::ActionFailed {
                    reason: err.to_string(),
                });
            }
        }
    }

    /// Run one fallible engine call, forwarding either its notices or the
    /// refusal.
    fn apply<F>(&mut self, act: F)
    where
        F: FnOnce(&mut GameEngine) -> Result<Vec<Notice>, EngineError>,
    {
        match act(&mut self.engine) {
            Ok(notices) => {
                self.dispatch(notices);
                self.flush_progress();
            }
            Err(err) => {
                debug!(error = %err, "player action refused");
                self.emit(Notice::ActionFailed {
                    reason: err.to_string(),
                });
            }
        }
    }

    /// Push the dirty progress patch, at most one push in flight.
    ///
    /// Mutations landing while a push is out simply accumulate in the
    /// engine's patch; the push completion flushes again, and a failed push
    /// is restored into the patch, so nothing is ever lost or reordered.
    fn flush_progress(&mut self) {
        if self.push_in_flight {
            return;
        }
        let Some(id) = self.engine.participant_id() else {
            return;
        };
        let Some(patch) = self.engine.take_patch() else {
            return;
        };
        self.push_in_flight = true;
        let store = Arc::clone(&self.store);
        let replies = self.replies.clone();
        tokio::spawn(async move {
            let outcome = store.push_progress(id, patch.clone()).await;
            let _ = replies.send(StoreReply::Pushed { id, patch, outcome });
        });
    }

    fn dispatch(&mut self, notices: Vec<Notice>) {
        for notice in notices {
            // Finishing the hunt rolls straight into the standings fetch.
            if matches!(notice, Notice::HuntFinished { .. }) {
                self.begin_standings();
            }
            self.emit(notice);
        }
    }

    fn emit(&self, notice: Notice) {
        let _ = self.notices.send(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::SENTINEL_ID;
    use crate::dao::memory::MemoryStore;
    use crate::state::signals::SignalChange;

    async fn start() -> (
        EngineHandle,
        mpsc::UnboundedReceiver<Notice>,
        Arc<MemoryStore>,
    ) {
        let store = Arc::new(MemoryStore::new());
        let (handle, notices, _task) = spawn(HuntConfig::default(), store.clone());
        (handle, notices, store)
    }

    /// Let every ready task (store calls, replies) run to completion.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    fn drain(notices: &mut mpsc::UnboundedReceiver<Notice>) -> Vec<Notice> {
        let mut seen = Vec::new();
        while let Ok(notice) = notices.try_recv() {
            seen.push(notice);
        }
        seen
    }

    async fn register(
        handle: &EngineHandle,
        notices: &mut mpsc::UnboundedReceiver<Notice>,
        username: &str,
    ) {
        handle.act(PlayerAction::Register {
            username: username.into(),
        });
        settle().await;
        drain(notices);
    }

    #[tokio::test(start_paused = true)]
    async fn registration_creates_a_remote_row() {
        let (handle, mut notices, store) = start().await;
        assert!(handle.act(PlayerAction::Register {
            username: " asha ".into(),
        }));
        settle().await;
        let seen = drain(&mut notices);
        assert!(seen.iter().any(|notice| matches!(notice, Notice::Registered { .. })));
        assert!(seen.iter().any(|notice| matches!(
            notice,
            Notice::AwaitingGate { round: 1, .. }
        )));
        let rows = store.list_participants().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].username, "asha");
    }

    #[tokio::test(start_paused = true)]
    async fn taken_username_is_reported() {
        let (handle, mut notices, store) = start().await;
        store
            .put(ParticipantRecord {
                id: Uuid::new_v4(),
                username: "asha".into(),
                score: 0,
                current_round: 1,
                lifelines: 4,
                completed: false,
                completion_time: None,
            })
            .await;
        handle.act(PlayerAction::Register {
            username: "asha".into(),
        });
        settle().await;
        let seen = drain(&mut notices);
        assert!(seen.iter().any(|notice| matches!(
            notice,
            Notice::RegistrationFailed { .. }
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn answers_push_progress_to_the_store() {
        let (handle, mut notices, store) = start().await;
        register(&handle, &mut notices, "asha").await;

        handle.act(PlayerAction::ScanGate {
            code: "glitch_protocol_start".into(),
        });
        settle().await;
        let seen = drain(&mut notices);
        let correct = seen
            .iter()
            .find_map(|notice| match notice {
                Notice::QuestionPresented { question, .. } => Some(question.correct_index),
                _ => None,
            })
            .unwrap();

        handle.act(PlayerAction::Answer { option: correct });
        settle().await;
        let rows = store.list_participants().await.unwrap();
        assert_eq!(rows[0].score, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn operator_round_skip_is_adopted_on_poll() {
        let (handle, mut notices, store) = start().await;
        register(&handle, &mut notices, "asha").await;

        let mut row = store.list_participants().await.unwrap().remove(0);
        row.current_round = 3;
        store.put(row).await;

        tokio::time::sleep(Duration::from_secs(6)).await;
        let seen = drain(&mut notices);
        assert!(seen.iter().any(|notice| matches!(notice, Notice::RoundSkipped { round: 3 })));
        assert!(seen.iter().any(|notice| matches!(
            notice,
            Notice::AwaitingGate { round: 3, .. }
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn blackout_follows_the_control_record() {
        let (_handle, mut notices, store) = start().await;
        settle().await;
        drain(&mut notices);

        let mut sentinel = store.get(SENTINEL_ID).await.unwrap();
        sentinel.score = 2;
        store.put(sentinel.clone()).await;
        tokio::time::sleep(Duration::from_secs(6)).await;
        let seen = drain(&mut notices);
        assert!(seen.contains(&Notice::Signal(SignalChange::Blackout(true))));

        sentinel.score = 0;
        store.put(sentinel).await;
        tokio::time::sleep(Duration::from_secs(6)).await;
        let seen = drain(&mut notices);
        assert!(seen.contains(&Notice::Signal(SignalChange::Blackout(false))));
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_timeout_fires_once_and_is_pushed() {
        let (handle, mut notices, store) = start().await;
        register(&handle, &mut notices, "asha").await;
        handle.act(PlayerAction::ScanGate {
            code: "glitch_protocol_start".into(),
        });
        settle().await;
        drain(&mut notices);

        tokio::time::sleep(Duration::from_secs(121)).await;
        let seen = drain(&mut notices);
        let timeouts = seen
            .iter()
            .filter(|notice| matches!(notice, Notice::TimedOut { .. }))
            .count();
        assert_eq!(timeouts, 1);

        let rows = store.list_participants().await.unwrap();
        assert_eq!(rows[0].lifelines, 3);
        assert_eq!(rows[0].score, -5);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_after_elimination_deletes_the_row() {
        let (handle, mut notices, store) = start().await;
        register(&handle, &mut notices, "asha").await;
        handle.act(PlayerAction::ScanGate {
            code: "glitch_protocol_start".into(),
        });
        settle().await;
        drain(&mut notices);

        // Four hidden-screen breaches spend every lifeline.
        for _ in 0..4 {
            handle.act(PlayerAction::Visibility(Visibility::Hidden));
            handle.act(PlayerAction::Visibility(Visibility::Visible));
        }
        settle().await;
        let seen = drain(&mut notices);
        assert!(seen.iter().any(|notice| matches!(notice, Notice::Eliminated { .. })));

        handle.act(PlayerAction::Reset);
        settle().await;
        let seen = drain(&mut notices);
        assert!(seen.contains(&Notice::SessionReset));
        assert!(store.list_participants().await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn standings_come_back_ranked() {
        let (handle, mut notices, store) = start().await;
        for (username, score, completion_time) in
            [("bella", 80, Some(500)), ("asha", 80, Some(400))]
        {
            store
                .put(ParticipantRecord {
                    id: Uuid::new_v4(),
                    username: username.into(),
                    score,
                    current_round: 5,
                    lifelines: 2,
                    completed: true,
                    completion_time,
                })
                .await;
        }
        handle.act(PlayerAction::ShowStandings);
        settle().await;
        let seen = drain(&mut notices);
        let standings = seen
            .iter()
            .find_map(|notice| match notice {
                Notice::Standings(entries) => Some(entries.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(standings[0].username, "asha");
        assert_eq!(standings[0].rank, 1);
        assert_eq!(standings[1].username, "bella");
    }

    #[tokio::test(start_paused = true)]
    async fn refused_actions_surface_as_failures() {
        let (handle, mut notices, _store) = start().await;
        handle.act(PlayerAction::Answer { option: 0 });
        settle().await;
        let seen = drain(&mut notices);
        assert!(seen.iter().any(|notice| matches!(notice, Notice::ActionFailed { .. })));
    }
}
