use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::info;

use tabscribe::audio::{CaptureSource, ReplayCapture};
use tabscribe::session::JsonFileStore;
use tabscribe::transcribe::{CloudAsrClient, CloudConfig, EngineCell};
use tabscribe::{
    create_router, AppState, Config, FileSink, Notifier, OrchestratorConfig, SessionController,
    TranscriptionOrchestrator,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cfg = Config::load("config/tabscribe")?;

    info!("Tabscribe v0.1.0");
    info!("Loaded config: {}", cfg.service.name);

    let capture: Arc<dyn CaptureSource> = match &cfg.capture.replay_file {
        Some(path) => Arc::new(ReplayCapture::from_file(path).await?),
        None => bail!("no capture source configured: set capture.replay_file"),
    };

    let cloud = cfg.transcription.api_key.as_ref().map(|key| {
        let mut cloud_cfg = CloudConfig::new(key.clone());
        cloud_cfg.base_url = cfg.transcription.base_url.clone();
        cloud_cfg.model = cfg.transcription.model.clone();
        cloud_cfg.language = cfg.transcription.language.clone();
        CloudAsrClient::new(cloud_cfg)
    });
    if cloud.is_some() {
        info!("transcription backend: cloud ({})", cfg.transcription.model);
    } else {
        info!("transcription backend: local");
    }

    // No local model is bundled; the cell reports a configuration error if
    // the cloud path is unavailable and a transcription reaches it.
    let engine = EngineCell::new(Box::new(|| {
        Box::pin(async {
            Err(tabscribe::Error::Engine(
                "local ASR engine not configured".to_string(),
            ))
        })
    }));

    let notifier = Notifier::default();
    let sink = Arc::new(FileSink::new(&cfg.delivery.output_dir));
    let orchestrator = Arc::new(TranscriptionOrchestrator::new(
        cloud,
        engine,
        sink,
        notifier.clone(),
        OrchestratorConfig {
            language: cfg.transcription.language.clone(),
            ..OrchestratorConfig::default()
        },
    ));

    let store = Arc::new(JsonFileStore::new(&cfg.capture.session_file));
    let controller = SessionController::new(capture, store, orchestrator, notifier).await?;

    let app = create_router(AppState::new(controller));
    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    info!("HTTP server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
