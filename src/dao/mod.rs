//! Persistence for participant records: the store abstraction, its wire
//! models, and the REST and in-memory backends.

/// In-memory store used offline and in tests.
pub mod memory;
/// Store model definitions.
pub mod models;
/// REST-backed store implementation.
pub mod rest;
/// Storage abstraction layer shared by all backends.
pub mod store;

pub use self::memory::MemoryStore;
pub use self::rest::{RestConfig, RestStore};
pub use self::store::{ParticipantStore, StoreError, StoreResult};
