//! Participant store backed by a PostgREST-style HTTP API.
//!
//! The remote service exposes the participant relation at
//! `{base}/rest/v1/{table}` with filter query parameters (`id=eq.<uuid>`)
//! and the usual `apikey` + bearer-token header pair. All operations are
//! single round trips; there is no connection state to maintain.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use uuid::Uuid;

use crate::control::{ControlCommand, SENTINEL_ID};
use crate::dao::{
    models::{NewParticipant, ParticipantRecord, ProgressPatch},
    store::{ParticipantStore, StoreError, StoreResult},
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Result alias for the REST backend internals.
pub type RestResult<T> = Result<T, RestStoreError>;

/// Failures that can occur while talking to the REST store.
#[derive(Debug, thiserror::Error)]
pub enum RestStoreError {
    /// Required environment variable is missing.
    #[error("missing store environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build store client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// A request could not be sent.
    #[error("failed to send store request to `{path}`")]
    RequestSend {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// The store returned an unexpected status code.
    #[error("unexpected store response status {status} for `{path}`")]
    RequestStatus { path: String, status: StatusCode },
    /// Response payload could not be parsed.
    #[error("failed to decode store response for `{path}`")]
    DecodeResponse {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// The store rejected an insert because the username exists.
    #[error("username `{username}` already registered")]
    UsernameConflict { username: String },
    /// An insert succeeded but the store returned no row.
    #[error("store returned no row for inserted username `{username}`")]
    EmptyInsert { username: String },
}

impl From<RestStoreError> for StoreError {
    fn from(err: RestStoreError) -> Self {
        match err {
            RestStoreError::UsernameConflict { username } => StoreError::UsernameTaken { username },
            other => StoreError::unavailable(other.to_string(), other),
        }
    }
}

/// Runtime configuration describing how to reach the REST store.
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Service root, without the `/rest/v1` suffix.
    pub base_url: String,
    /// Key sent as both `apikey` and bearer token.
    pub api_key: String,
    /// Relation holding the participant rows.
    pub table: String,
}

impl RestConfig {
    /// Default relation name when none is configured.
    pub const DEFAULT_TABLE: &'static str = "participants";

    /// Construct a configuration from an explicit base URL and API key.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            table: Self::DEFAULT_TABLE.to_string(),
        }
    }

    /// Override the relation name.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Build a configuration by reading the expected environment variables.
    pub fn from_env() -> RestResult<Self> {
        let base_url = std::env::var("HUNT_STORE_URL").map_err(|_| {
            RestStoreError::MissingEnvVar {
                var: "HUNT_STORE_URL",
            }
        })?;
        let api_key = std::env::var("HUNT_STORE_KEY").map_err(|_| {
            RestStoreError::MissingEnvVar {
                var: "HUNT_STORE_KEY",
            }
        })?;

        let mut config = Self::new(base_url, api_key);
        if let Ok(table) = std::env::var("HUNT_STORE_TABLE") {
            config = config.with_table(table);
        }

        Ok(config)
    }
}

/// Store implementation speaking the PostgREST dialect.
#[derive(Clone)]
pub struct RestStore {
    client: Client,
    base_url: Arc<str>,
    api_key: Arc<str>,
    table: Arc<str>,
}

impl RestStore {
    /// Build the HTTP client from the given configuration.
    pub fn connect(config: RestConfig) -> RestResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| RestStoreError::ClientBuilder { source })?;

        Ok(Self {
            client,
            base_url: Arc::from(config.base_url.trim_end_matches('/')),
            api_key: Arc::from(config.api_key),
            table: Arc::from(config.table),
        })
    }

    fn request(&self, method: Method, query: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/rest/v1/{}{}", self.base_url, self.table, query);
        self.client
            .request(method, url)
            .header("apikey", self.api_key.as_ref())
            .bearer_auth(self.api_key.as_ref())
    }

    async fn get_rows(&self, query: &str) -> RestResult<Vec<ParticipantRecord>> {
        let response = self.request(Method::GET, query).send().await.map_err(
            |source| RestStoreError::RequestSend {
                path: query.to_string(),
                source,
            },
        )?;

        if !response.status().is_success() {
            return Err(RestStoreError::RequestStatus {
                path: query.to_string(),
                status: response.status(),
            });
        }

        response
            .json::<Vec<ParticipantRecord>>()
            .await
            .map_err(|source| RestStoreError::DecodeResponse {
                path: query.to_string(),
                source,
            })
    }

    async fn insert_row(&self, participant: &NewParticipant) -> RestResult<ParticipantRecord> {
        let response = self
            .request(Method::POST, "")
            .header("Prefer", "return=representation")
            .json(participant)
            .send()
            .await
            .map_err(|source| RestStoreError::RequestSend {
                path: self.table.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::CONFLICT => Err(RestStoreError::UsernameConflict {
                username: participant.username.clone(),
            }),
            status if status.is_success() => {
                let mut rows: Vec<ParticipantRecord> = response.json().await.map_err(
                    |source| RestStoreError::DecodeResponse {
                        path: self.table.to_string(),
                        source,
                    },
                )?;
                rows.pop().ok_or_else(|| RestStoreError::EmptyInsert {
                    username: participant.username.clone(),
                })
            }
            status => Err(RestStoreError::RequestStatus {
                path: self.table.to_string(),
                status,
            }),
        }
    }

    async fn patch_rows(
        &self,
        query: &str,
        patch: &ProgressPatch,
    ) -> RestResult<Vec<ParticipantRecord>> {
        let response = self
            .request(Method::PATCH, query)
            .header("Prefer", "return=representation")
            .json(patch)
            .send()
            .await
            .map_err(|source| RestStoreError::RequestSend {
                path: query.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(RestStoreError::RequestStatus {
                path: query.to_string(),
                status: response.status(),
            });
        }

        response
            .json::<Vec<ParticipantRecord>>()
            .await
            .map_err(|source| RestStoreError::DecodeResponse {
                path: query.to_string(),
                source,
            })
    }

    async fn delete_rows(&self, query: &str) -> RestResult<()> {
        let response = self.request(Method::DELETE, query).send().await.map_err(
            |source| RestStoreError::RequestSend {
                path: query.to_string(),
                source,
            },
        )?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(RestStoreError::RequestStatus {
                path: query.to_string(),
                status: response.status(),
            })
        }
    }
}

impl ParticipantStore for RestStore {
    fn register(
        &self,
        participant: NewParticipant,
    ) -> BoxFuture<'static, StoreResult<ParticipantRecord>> {
        let store = self.clone();
        Box::pin(async move { store.insert_row(&participant).await.map_err(Into::into) })
    }

    fn fetch(&self, id: Uuid) -> BoxFuture<'static, StoreResult<Option<ParticipantRecord>>> {
        let store = self.clone();
        Box::pin(async move {
            let query = format!("?id=eq.{id}&limit=1");
            let mut rows = store.get_rows(&query).await?;
            Ok(rows.pop())
        })
    }

    fn push_progress(&self, id: Uuid, patch: ProgressPatch) -> BoxFuture<'static, StoreResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            if patch.is_empty() {
                return Ok(());
            }
            let query = format!("?id=eq.{id}");
            let rows = store.patch_rows(&query, &patch).await?;
            if rows.is_empty() {
                return Err(StoreError::UnknownParticipant { id });
            }
            Ok(())
        })
    }

    fn fetch_control(&self) -> BoxFuture<'static, StoreResult<Option<ControlCommand>>> {
        let store = self.clone();
        Box::pin(async move {
            let query = format!("?id=eq.{SENTINEL_ID}&limit=1");
            let mut rows = store.get_rows(&query).await?;
            Ok(rows.pop().map(|record| ControlCommand::decode(&record)))
        })
    }

    fn list_participants(&self) -> BoxFuture<'static, StoreResult<Vec<ParticipantRecord>>> {
        let store = self.clone();
        Box::pin(async move {
            let query = format!("?id=neq.{SENTINEL_ID}&select=*");
            store.get_rows(&query).await.map_err(Into::into)
        })
    }

    fn delete(&self, id: Uuid) -> BoxFuture<'static, StoreResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let query = format!("?id=eq.{id}");
            store.delete_rows(&query).await.map_err(Into::into)
        })
    }
}
