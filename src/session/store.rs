use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

/// The single active recording context, persisted durably so a process
/// restart can reconstruct it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Identifier of the capture target being recorded.
    pub target_id: String,
    /// Human-readable title of the source, used for the artifact.
    pub title: String,
    /// Reference back to the source (URL or equivalent).
    pub source_url: String,
    /// Wall-clock start, milliseconds since the epoch. Rewritten on resume so
    /// `now - start_time_ms` stays continuous across pause cycles.
    pub start_time_ms: i64,
    pub paused: bool,
    /// Elapsed time captured at the pause moment; zero while recording.
    pub paused_elapsed_ms: i64,
    /// Where status notifications for this session are routed.
    pub status_target: String,
}

/// Durable store for the single session record.
///
/// Writes happen synchronously with every in-memory transition so a restart
/// never observes divergence.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self) -> Result<Option<SessionRecord>>;
    async fn save(&self, record: &SessionRecord) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

/// Session store backed by a single JSON file.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SessionStore for JsonFileStore {
    async fn load(&self) -> Result<Option<SessionRecord>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read session record: {}", self.path.display())
                })
            }
        };
        let record =
            serde_json::from_slice(&bytes).context("Failed to parse persisted session record")?;
        info!("restored persisted session from {}", self.path.display());
        Ok(Some(record))
    }

    async fn save(&self, record: &SessionRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create session store directory")?;
        }
        let bytes = serde_json::to_vec_pretty(record).context("Failed to encode session record")?;
        tokio::fs::write(&self.path, bytes)
            .await
            .with_context(|| format!("Failed to write session record: {}", self.path.display()))
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| {
                format!("Failed to remove session record: {}", self.path.display())
            }),
        }
    }
}

/// In-memory store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryStore {
    record: std::sync::Mutex<Option<SessionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load(&self) -> Result<Option<SessionRecord>> {
        Ok(self.record.lock().expect("store lock poisoned").clone())
    }

    async fn save(&self, record: &SessionRecord) -> Result<()> {
        *self.record.lock().expect("store lock poisoned") = Some(record.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.record.lock().expect("store lock poisoned") = None;
        Ok(())
    }
}
