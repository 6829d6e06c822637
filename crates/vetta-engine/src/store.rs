//! Persisted processing state.
//!
//! The store is the hand-off point between the controller and the agent: it
//! is the only state that survives a page navigation. Reads and writes are
//! not atomic across contexts; a `stop` racing a cycle head may lose and
//! allow one extra cycle. That race is accepted, not guarded against.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use vetta_common::state::ProcessingState;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access state file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode state: {0}")]
    Serde(#[from] serde_json::Error),
}

#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read the persisted state; a missing backing file yields the idle state.
    async fn load(&self) -> Result<ProcessingState, StoreError>;

    async fn save(&self, state: &ProcessingState) -> Result<(), StoreError>;

    /// Persist the idle state.
    async fn clear(&self) -> Result<(), StoreError> {
        self.save(&ProcessingState::idle()).await
    }
}

/// JSON file under the user's home directory; the production store.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn load(&self) -> Result<ProcessingState, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ProcessingState::idle()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, state: &ProcessingState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(state)?;
        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }
}

/// In-memory store shared between an in-process controller/agent pair, and
/// the store used by tests.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<ProcessingState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(state: ProcessingState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn load(&self) -> Result<ProcessingState, StoreError> {
        Ok(self.state.lock().unwrap().clone())
    }

    async fn save(&self, state: &ProcessingState) -> Result<(), StoreError> {
        *self.state.lock().unwrap() = state.clone();
        Ok(())
    }
}
