// Shared test fixtures

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use tabscribe::transcribe::{EngineCell, InferenceOptions, LocalAsrEngine};
use tabscribe::{Result, Segment};

/// Local engine stand-in returning canned segments.
pub struct StubEngine {
    pub segments: Vec<Segment>,
    pub delay: Duration,
}

impl StubEngine {
    pub fn with_segments(segments: Vec<Segment>) -> Self {
        Self {
            segments,
            delay: Duration::ZERO,
        }
    }
}

#[async_trait]
impl LocalAsrEngine for StubEngine {
    async fn transcribe(
        &self,
        _pcm: &[f32],
        _language_hint: &str,
        _options: &InferenceOptions,
    ) -> Result<Vec<Segment>> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.segments.clone())
    }

    fn model_id(&self) -> &str {
        "stub-engine"
    }
}

pub fn stub_engine_cell(segments: Vec<Segment>) -> EngineCell {
    EngineCell::preloaded(Arc::new(StubEngine::with_segments(segments)))
}

/// One second of quiet 16 kHz mono sine, encoded as a WAV blob the decode
/// pipeline accepts.
pub fn sample_wav() -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut buf = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut buf, spec).unwrap();
        for i in 0..16000 {
            let t = i as f32 / 16000.0;
            let sample = (0.2 * (2.0 * std::f32::consts::PI * 220.0 * t).sin() * 32767.0) as i16;
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }
    buf.into_inner()
}
