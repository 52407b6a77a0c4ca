use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::info;

use crate::error::{Error, Result};

/// Audio capture collaborator.
///
/// Implementations deliver binary audio chunks at a roughly fixed cadence
/// (~1 second) on the returned channel, plus a final flush on stop. The
/// channel closing without an explicit `stop` means the capture target went
/// away and the controller must force a stop.
#[async_trait]
pub trait CaptureSource: Send + Sync {
    /// Begin capturing the given target. Returns the chunk stream.
    async fn start(&self, target_id: &str) -> Result<mpsc::Receiver<Vec<u8>>>;

    /// Suspend chunk production. Passed through to the active encoder.
    async fn pause(&self) -> Result<()>;

    /// Resume chunk production.
    async fn resume(&self) -> Result<()>;

    /// Flush remaining audio and finalize; the chunk stream closes after the
    /// final chunk.
    async fn stop(&self) -> Result<()>;

    /// Capture source name for logging.
    fn name(&self) -> &str;
}

struct ReplayState {
    running: bool,
    stop_tx: Option<watch::Sender<bool>>,
}

/// Capture source that replays a pre-recorded blob in fixed-size chunks.
///
/// Used for batch processing of existing recordings and for tests. Honors
/// pause/resume by suspending emission, and flushes the remainder as one
/// final chunk on stop.
pub struct ReplayCapture {
    data: Vec<u8>,
    chunk_bytes: usize,
    cadence: Duration,
    paused: Arc<AtomicBool>,
    state: Mutex<ReplayState>,
}

impl ReplayCapture {
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            data,
            chunk_bytes: 32 * 1024,
            cadence: Duration::from_secs(1),
            paused: Arc::new(AtomicBool::new(false)),
            state: Mutex::new(ReplayState {
                running: false,
                stop_tx: None,
            }),
        }
    }

    pub async fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read replay file: {}", path.display()))?;
        info!("loaded replay file: {} ({} bytes)", path.display(), data.len());
        Ok(Self::from_bytes(data))
    }

    pub fn with_cadence(mut self, cadence: Duration) -> Self {
        self.cadence = cadence;
        self
    }

    pub fn with_chunk_bytes(mut self, chunk_bytes: usize) -> Self {
        self.chunk_bytes = chunk_bytes.max(1);
        self
    }
}

#[async_trait]
impl CaptureSource for ReplayCapture {
    async fn start(&self, target_id: &str) -> Result<mpsc::Receiver<Vec<u8>>> {
        let mut state = self.state.lock().await;
        if state.running {
            return Err(Error::Capture("capture is already running".into()));
        }
        state.running = true;
        self.paused.store(false, Ordering::SeqCst);

        let (stop_tx, stop_rx) = watch::channel(false);
        state.stop_tx = Some(stop_tx);

        info!("replay capture started for target {}", target_id);

        let (tx, rx) = mpsc::channel(64);
        let data = self.data.clone();
        let chunk_bytes = self.chunk_bytes;
        let cadence = self.cadence;
        let paused = Arc::clone(&self.paused);

        tokio::spawn(async move {
            let mut offset = 0;
            while offset < data.len() {
                if *stop_rx.borrow() {
                    // Final flush: whatever is left goes out as one chunk.
                    let _ = tx.send(data[offset..].to_vec()).await;
                    return;
                }
                if paused.load(Ordering::SeqCst) {
                    tokio::time::sleep(cadence).await;
                    continue;
                }
                let end = (offset + chunk_bytes).min(data.len());
                if tx.send(data[offset..end].to_vec()).await.is_err() {
                    return;
                }
                offset = end;
                tokio::time::sleep(cadence).await;
            }
        });

        Ok(rx)
    }

    async fn pause(&self) -> Result<()> {
        self.paused.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn resume(&self) -> Result<()> {
        self.paused.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.running = false;
        if let Some(stop_tx) = state.stop_tx.take() {
            let _ = stop_tx.send(true);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "replay"
    }
}
