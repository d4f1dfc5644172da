use std::error::Error;

use futures::future::BoxFuture;
use thiserror::Error;
use uuid::Uuid;

use crate::control::ControlCommand;
use crate::dao::models::{NewParticipant, ParticipantRecord, ProgressPatch};

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Error raised by participant stores regardless of the backing service.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or rejected the request outright.
    #[error("participant store unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// Registration failed because the username is already claimed.
    #[error("username `{username}` is already taken")]
    UsernameTaken { username: String },
    /// An operation targeted a participant the store does not know.
    #[error("no participant with id `{id}`")]
    UnknownParticipant { id: Uuid },
}

impl StoreError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StoreError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}

/// Abstraction over the shared participant relation and the control record
/// multiplexed onto it.
pub trait ParticipantStore: Send + Sync {
    /// Insert a fresh participant and return the stored row, id included.
    fn register(
        &self,
        participant: NewParticipant,
    ) -> BoxFuture<'static, StoreResult<ParticipantRecord>>;
    /// Fetch one participant row; `None` when the id is unknown.
    fn fetch(&self, id: Uuid) -> BoxFuture<'static, StoreResult<Option<ParticipantRecord>>>;
    /// Apply a partial progress update to one participant row.
    fn push_progress(
        &self,
        id: Uuid,
        patch: ProgressPatch,
    ) -> BoxFuture<'static, StoreResult<()>>;
    /// Fetch and decode the control record; `None` when it is missing.
    fn fetch_control(&self) -> BoxFuture<'static, StoreResult<Option<ControlCommand>>>;
    /// All real participants, control record excluded, in store order.
    fn list_participants(&self) -> BoxFuture<'static, StoreResult<Vec<ParticipantRecord>>>;
    /// Remove one participant row. Removing an unknown id is not an error.
    fn delete(&self, id: Uuid) -> BoxFuture<'static, StoreResult<()>>;
}
