//! In-memory participant store.
//!
//! Backs offline play and the test suite. Behaves like the REST store as
//! far as the engine can tell: ids are assigned at registration, usernames
//! are unique, and the control record exists from the start.

use std::sync::Arc;

use futures::future::BoxFuture;
use indexmap::IndexMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::control::{ControlCommand, SENTINEL_ID, SENTINEL_USERNAME};
use crate::dao::{
    models::{NewParticipant, ParticipantRecord, ProgressPatch},
    store::{ParticipantStore, StoreError, StoreResult},
};

/// Participant store holding everything in process memory.
#[derive(Clone)]
pub struct MemoryStore {
    rows: Arc<Mutex<IndexMap<Uuid, ParticipantRecord>>>,
}

impl MemoryStore {
    /// An empty store with the control record already seeded.
    pub fn new() -> Self {
        let mut rows = IndexMap::new();
        rows.insert(
            SENTINEL_ID,
            ParticipantRecord {
                id: SENTINEL_ID,
                username: SENTINEL_USERNAME.into(),
                score: 0,
                current_round: 0,
                lifelines: 0,
                completed: false,
                completion_time: None,
            },
        );
        Self {
            rows: Arc::new(Mutex::new(rows)),
        }
    }

    /// Insert or replace a row directly, bypassing registration rules.
    ///
    /// This is the operator's side of the store: tests and the demo driver
    /// use it to edit rows the way an operator console would.
    pub async fn put(&self, record: ParticipantRecord) {
        self.rows.lock().await.insert(record.id, record);
    }

    /// Copy of one row, if present.
    pub async fn get(&self, id: Uuid) -> Option<ParticipantRecord> {
        self.rows.lock().await.get(&id).cloned()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ParticipantStore for MemoryStore {
    fn register(
        &self,
        participant: NewParticipant,
    ) -> BoxFuture<'static, StoreResult<ParticipantRecord>> {
        let store = self.clone();
        Box::pin(async move {
            let mut rows = store.rows.lock().await;
            if rows.values().any(|row| row.username == participant.username) {
                return Err(StoreError::UsernameTaken {
                    username: participant.username,
                });
            }
            let record = ParticipantRecord {
                id: Uuid::new_v4(),
                username: participant.username,
                score: participant.score,
                current_round: participant.current_round,
                lifelines: participant.lifelines,
                completed: participant.completed,
                completion_time: None,
            };
            rows.insert(record.id, record.clone());
            Ok(record)
        })
    }

    fn fetch(&self, id: Uuid) -> BoxFuture<'static, StoreResult<Option<ParticipantRecord>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.rows.lock().await.get(&id).cloned()) })
    }

    fn push_progress(&self, id: Uuid, patch: ProgressPatch) -> BoxFuture<'static, StoreResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            if patch.is_empty() {
                return Ok(());
            }
            let mut rows = store.rows.lock().await;
            let Some(row) = rows.get_mut(&id) else {
                return Err(StoreError::UnknownParticipant { id });
            };
            if let Some(score) = patch.score {
                row.score = score;
            }
            if let Some(current_round) = patch.current_round {
                row.current_round = current_round;
            }
            if let Some(lifelines) = patch.lifelines {
                row.lifelines = lifelines;
            }
            if let Some(completed) = patch.completed {
                row.completed = completed;
            }
            if let Some(completion_time) = patch.completion_time {
                row.completion_time = Some(completion_time);
            }
            Ok(())
        })
    }

    fn fetch_control(&self) -> BoxFuture<'static, StoreResult<Option<ControlCommand>>> {
        let store = self.clone();
        Box::pin(async move {
            let rows = store.rows.lock().await;
            Ok(rows
                .get(&SENTINEL_ID)
                .map(|record| ControlCommand::decode(record)))
        })
    }

    fn list_participants(&self) -> BoxFuture<'static, StoreResult<Vec<ParticipantRecord>>> {
        let store = self.clone();
        Box::pin(async move {
            let rows = store.rows.lock().await;
            Ok(rows
                .values()
                .filter(|row| !row.is_sentinel())
                .cloned()
                .collect())
        })
    }

    fn delete(&self, id: Uuid) -> BoxFuture<'static, StoreResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.rows.lock().await.shift_remove(&id);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::ControlMode;

    #[tokio::test]
    async fn register_assigns_an_id_and_stores_the_row() {
        let store = MemoryStore::new();
        let record = store
            .register(NewParticipant::fresh("asha"))
            .await
            .unwrap();
        assert_ne!(record.id, SENTINEL_ID);
        assert_eq!(store.get(record.id).await, Some(record));
    }

    #[tokio::test]
    async fn duplicate_usernames_are_rejected() {
        let store = MemoryStore::new();
        store.register(NewParticipant::fresh("asha")).await.unwrap();
        let err = store
            .register(NewParticipant::fresh("asha"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UsernameTaken { username } if username == "asha"));
    }

    #[tokio::test]
    async fn progress_patch_touches_only_set_fields() {
        let store = MemoryStore::new();
        let record = store
            .register(NewParticipant::fresh("asha"))
            .await
            .unwrap();

        store
            .push_progress(
                record.id,
                ProgressPatch {
                    score: Some(25),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let row = store.get(record.id).await.unwrap();
        assert_eq!(row.score, 25);
        assert_eq!(row.current_round, 1);
        assert_eq!(row.lifelines, 4);
    }

    #[tokio::test]
    async fn pushing_to_an_unknown_id_fails() {
        let store = MemoryStore::new();
        let err = store
            .push_progress(
                Uuid::new_v4(),
                ProgressPatch {
                    score: Some(10),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownParticipant { .. }));
    }

    #[tokio::test]
    async fn empty_patches_are_not_pushed() {
        let store = MemoryStore::new();
        store
            .push_progress(Uuid::new_v4(), ProgressPatch::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn control_record_is_seeded_and_decodes_quiet() {
        let store = MemoryStore::new();
        let command = store.fetch_control().await.unwrap().unwrap();
        assert_eq!(command.mode, ControlMode::Live);
        assert_eq!(command.sound_cue, None);
        assert_eq!(command.broadcast, None);
    }

    #[tokio::test]
    async fn operator_edits_show_up_in_the_control_command() {
        let store = MemoryStore::new();
        let mut sentinel = store.get(SENTINEL_ID).await.unwrap();
        sentinel.score = 1;
        store.put(sentinel).await;

        let command = store.fetch_control().await.unwrap().unwrap();
        assert_eq!(command.mode, ControlMode::Paused);
    }

    #[tokio::test]
    async fn listing_skips_the_control_record() {
        let store = MemoryStore::new();
        store.register(NewParticipant::fresh("asha")).await.unwrap();
        store.register(NewParticipant::fresh("birla")).await.unwrap();

        let listed = store.list_participants().await.unwrap();
        let names: Vec<_> = listed.iter().map(|row| row.username.as_str()).collect();
        assert_eq!(names, ["asha", "birla"]);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryStore::new();
        let record = store.register(NewParticipant::fresh("asha")).await.unwrap();
        store.delete(record.id).await.unwrap();
        store.delete(record.id).await.unwrap();
        assert_eq!(store.get(record.id).await, None);
    }
}
