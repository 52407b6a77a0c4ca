use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

/// Destination for rendered transcripts.
#[async_trait]
pub trait DeliverySink: Send + Sync {
    async fn deliver(&self, filename: &str, document: &[u8]) -> Result<()>;
}

/// Writes transcripts into a local directory, creating it on first use.
pub struct FileSink {
    output_dir: PathBuf,
}

impl FileSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

#[async_trait]
impl DeliverySink for FileSink {
    async fn deliver(&self, filename: &str, document: &[u8]) -> Result<()> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .with_context(|| format!("creating output directory {}", self.output_dir.display()))?;
        let path = self.output_dir.join(filename);
        tokio::fs::write(&path, document)
            .await
            .with_context(|| format!("writing transcript to {}", path.display()))?;
        info!(path = %path.display(), bytes = document.len(), "transcript written");
        Ok(())
    }
}
