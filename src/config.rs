use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub capture: CaptureConfig,
    pub transcription: TranscriptionConfig,
    pub delivery: DeliveryConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct CaptureConfig {
    /// Audio file replayed as the capture source.
    pub replay_file: Option<String>,
    /// Path of the persisted session record.
    pub session_file: String,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptionConfig {
    /// Cloud API key. When absent the local engine is used instead.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub language: String,
}

#[derive(Debug, Deserialize)]
pub struct DeliveryConfig {
    pub output_dir: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("service.name", "tabscribe")?
            .set_default("service.http.bind", "127.0.0.1")?
            .set_default("service.http.port", 8753)?
            .set_default("capture.session_file", "data/session.json")?
            .set_default("transcription.base_url", crate::transcribe::cloud::DEFAULT_BASE_URL)?
            .set_default("transcription.model", crate::transcribe::cloud::DEFAULT_MODEL)?
            .set_default("transcription.language", "zh")?
            .set_default("delivery.output_dir", "transcripts")?
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("TABSCRIBE").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
