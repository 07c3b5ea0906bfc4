//! Shared application state for the HTTP layer.
//!
//! Holds the configuration, the model provider and the registry of active
//! interviews. The registry lock is never held across an `.await`: handlers
//! take a snapshot, run the model call, then write the result back with
//! `replace_interview`, which refuses the write if the session changed in
//! the meantime.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::AssistantConfig;
use crate::db;
use crate::pipeline::model::{ApiKey, GeminiProvider, ModelClient, ModelError, ModelProvider};
use crate::pipeline::InterviewSession;

pub struct CoreState {
    pub config: AssistantConfig,
    provider: Arc<dyn ModelProvider>,
    interviews: Mutex<HashMap<Uuid, InterviewSession>>,
}

impl CoreState {
    pub fn new(config: AssistantConfig, provider: Arc<dyn ModelProvider>) -> Self {
        Self {
            config,
            provider,
            interviews: Mutex::new(HashMap::new()),
        }
    }

    /// State backed by the Gemini provider described in `config`.
    pub fn from_config(config: AssistantConfig) -> Result<Self, CoreError> {
        let provider = GeminiProvider::new(&config.api_base, &config.model, config.timeout_secs)?;
        Ok(Self::new(config, Arc::new(provider)))
    }

    /// Model client bound to the caller's key. Fails with `MissingApiKey`
    /// before any network traffic when no key was supplied.
    pub fn model_client(&self, api_key: Option<&ApiKey>) -> Result<Arc<dyn ModelClient>, ModelError> {
        self.provider.client(api_key)
    }

    /// Open a connection to the history archive.
    pub fn open_db(&self) -> Result<rusqlite::Connection, CoreError> {
        db::open_database(&self.config.history_db_path()).map_err(CoreError::Database)
    }

    // ── Interview registry ──────────────────────────────────

    fn registry(&self) -> Result<MutexGuard<'_, HashMap<Uuid, InterviewSession>>, CoreError> {
        self.interviews.lock().map_err(|_| CoreError::LockPoisoned)
    }

    /// Register a session. Stale sessions are pruned first.
    pub fn insert_interview(&self, session: InterviewSession) -> Result<(), CoreError> {
        self.prune_stale_interviews(Utc::now())?;
        self.registry()?.insert(session.id, session);
        Ok(())
    }

    /// Drop sessions whose last update is older than the configured TTL.
    /// Returns how many were dropped.
    pub fn prune_stale_interviews(&self, now: DateTime<Utc>) -> Result<usize, CoreError> {
        let ttl = self.config.interview_ttl_secs;
        let mut registry = self.registry()?;
        let before = registry.len();
        registry.retain(|_, session| {
            (now - session.updated_at)
                .to_std()
                .map(|idle| idle.as_secs() <= ttl)
                .unwrap_or(true)
        });
        let pruned = before - registry.len();
        if pruned > 0 {
            tracing::info!(pruned, "Stale interviews dropped");
        }
        Ok(pruned)
    }

    /// Snapshot of one session.
    pub fn interview(&self, id: &Uuid) -> Result<InterviewSession, CoreError> {
        self.registry()?
            .get(id)
            .cloned()
            .ok_or(CoreError::InterviewNotFound(*id))
    }

    /// Write `next` in place of `expected`. Fails with `Conflict` when the
    /// stored session no longer equals `expected`.
    pub fn replace_interview(
        &self,
        expected: &InterviewSession,
        next: InterviewSession,
    ) -> Result<(), CoreError> {
        let mut registry = self.registry()?;
        let current = registry
            .get_mut(&expected.id)
            .ok_or(CoreError::InterviewNotFound(expected.id))?;
        if current != expected {
            return Err(CoreError::Conflict(expected.id));
        }
        *current = next;
        Ok(())
    }

    pub fn remove_interview(&self, id: &Uuid) -> Result<InterviewSession, CoreError> {
        self.registry()?
            .remove(id)
            .ok_or(CoreError::InterviewNotFound(*id))
    }

    pub fn interview_count(&self) -> usize {
        self.registry().map(|r| r.len()).unwrap_or(0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Internal lock error")]
    LockPoisoned,
    #[error("Interview {0} not found")]
    InterviewNotFound(Uuid),
    #[error("Interview {0} was modified concurrently")]
    Conflict(Uuid),
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
    #[error("Model client error: {0}")]
    Model(#[from] ModelError),
}
