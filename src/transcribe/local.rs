//! Local speech recognition behind a lazily loaded engine.
//!
//! Loading a local model is expensive, so the engine sits behind an
//! [`EngineCell`] that runs the loader on first use and memoizes the result.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use crate::error::Result;
use crate::transcribe::Segment;

/// Decoding knobs passed to the engine on every call.
#[derive(Debug, Clone)]
pub struct InferenceOptions {
    /// Window length the audio is chunked into, in seconds.
    pub chunk_length_sec: u32,
    /// Overlap between consecutive windows, in seconds.
    pub stride_sec: u32,
    /// Suppress repeats of n-grams of this size during decoding.
    pub no_repeat_ngram: u32,
    /// Penalty applied to already-emitted tokens.
    pub repetition_penalty: f32,
}

impl Default for InferenceOptions {
    fn default() -> Self {
        Self {
            chunk_length_sec: 30,
            stride_sec: 5,
            no_repeat_ngram: 6,
            repetition_penalty: 1.1,
        }
    }
}

/// A loaded local ASR model.
#[async_trait]
pub trait LocalAsrEngine: Send + Sync {
    /// Transcribe mono 16 kHz PCM into timestamped segments.
    async fn transcribe(
        &self,
        pcm: &[f32],
        language_hint: &str,
        options: &InferenceOptions,
    ) -> Result<Vec<Segment>>;

    /// Identifier recorded in transcript metadata.
    fn model_id(&self) -> &str;
}

/// Deferred engine constructor. Runs once, on the first transcription that
/// needs the local path.
pub type EngineLoader = Box<
    dyn Fn() -> Pin<Box<dyn Future<Output = Result<Arc<dyn LocalAsrEngine>>> + Send>>
        + Send
        + Sync,
>;

/// Memoizing holder for the local engine.
pub struct EngineCell {
    loader: EngineLoader,
    engine: Mutex<Option<Arc<dyn LocalAsrEngine>>>,
}

impl EngineCell {
    pub fn new(loader: EngineLoader) -> Self {
        Self {
            loader,
            engine: Mutex::new(None),
        }
    }

    /// Wrap an already constructed engine, skipping lazy loading.
    pub fn preloaded(engine: Arc<dyn LocalAsrEngine>) -> Self {
        Self {
            loader: Box::new(|| Box::pin(async { unreachable!("engine preloaded") })),
            engine: Mutex::new(Some(engine)),
        }
    }

    /// Return the engine, loading it on first use. A failed load leaves the
    /// cell empty so a later call can retry.
    pub async fn get(&self) -> Result<Arc<dyn LocalAsrEngine>> {
        let mut slot = self.engine.lock().await;
        if let Some(engine) = slot.as_ref() {
            return Ok(Arc::clone(engine));
        }
        let engine = (self.loader)().await?;
        info!(model = engine.model_id(), "local ASR engine loaded");
        *slot = Some(Arc::clone(&engine));
        Ok(engine)
    }
}
