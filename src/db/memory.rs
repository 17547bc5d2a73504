//! In-memory request store used by the test suite.

use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;

use super::{RequestStore, StoreError};
use crate::models::{TeamRequest, TeamRequestPayload};

#[derive(Debug, Default)]
pub struct InMemoryStore {
    requests: RwLock<Vec<TeamRequest>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_requests(requests: Vec<TeamRequest>) -> Self {
        Self {
            requests: RwLock::new(requests),
        }
    }

    pub fn len(&self) -> usize {
        self.requests.read().map(|requests| requests.len()).unwrap_or(0)
    }

    fn poisoned<E>(e: E) -> StoreError
    where
        E: std::fmt::Display,
    {
        StoreError::Unavailable(format!("store lock poisoned: {}", e))
    }
}

#[async_trait]
impl RequestStore for InMemoryStore {
    async fn list(&self) -> Result<Vec<TeamRequest>, StoreError> {
        let mut requests = self.requests.read().map_err(Self::poisoned)?.clone();
        requests.sort_by_key(|request| request.created_at);
        Ok(requests)
    }

    async fn get(&self, id: &str) -> Result<Option<TeamRequest>, StoreError> {
        let requests = self.requests.read().map_err(Self::poisoned)?;
        Ok(requests.iter().find(|request| request.id == id).cloned())
    }

    async fn insert(
        &self,
        payload: TeamRequestPayload,
        now: DateTime<Utc>,
    ) -> Result<TeamRequest, StoreError> {
        let request = TeamRequest::from_payload(ObjectId::new().to_hex(), payload, now);
        self.requests
            .write()
            .map_err(Self::poisoned)?
            .push(request.clone());
        Ok(request)
    }

    async fn replace(&self, request: &TeamRequest) -> Result<bool, StoreError> {
        let mut requests = self.requests.write().map_err(Self::poisoned)?;
        match requests.iter_mut().find(|stored| stored.id == request.id) {
            Some(stored) => {
                *stored = request.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut requests = self.requests.write().map_err(Self::poisoned)?;
        let before = requests.len();
        requests.retain(|request| request.id != id);
        Ok(requests.len() < before)
    }

    async fn import(&self, request: TeamRequest) -> Result<(), StoreError> {
        let mut requests = self.requests.write().map_err(Self::poisoned)?;
        if requests.iter().any(|stored| stored.id == request.id) {
            return Err(StoreError::Conflict(request.id));
        }
        requests.push(request);
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
