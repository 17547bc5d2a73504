//! Persistence for team requests.
//!
//! Handlers only see [`RequestStore`]; the process wires in a [`MongoStore`],
//! tests use the in-memory store.

#[cfg(test)]
mod memory;
mod mongo;

#[cfg(test)]
pub use memory::InMemoryStore;
pub use mongo::MongoStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{TeamRequest, TeamRequestPayload};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Backend(#[from] mongodb::error::Error),

    #[error("malformed document: {0}")]
    Serialization(String),

    #[error("request '{0}' already exists")]
    Conflict(String),
}

#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Every request, oldest `created_at` first.
    async fn list(&self) -> Result<Vec<TeamRequest>, StoreError>;

    async fn get(&self, id: &str) -> Result<Option<TeamRequest>, StoreError>;

    /// Persists a new request stamped with `now`; the store assigns the id.
    async fn insert(
        &self,
        payload: TeamRequestPayload,
        now: DateTime<Utc>,
    ) -> Result<TeamRequest, StoreError>;

    /// Overwrites the stored document with the same id. Returns `false` when
    /// no such document exists.
    async fn replace(&self, request: &TeamRequest) -> Result<bool, StoreError>;

    /// Returns `false` when there was nothing to delete.
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;

    /// Inserts a fully formed request, keeping its id and timestamps.
    async fn import(&self, request: TeamRequest) -> Result<(), StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
