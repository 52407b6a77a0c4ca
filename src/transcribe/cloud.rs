//! Cloud speech recognition over the DashScope asynchronous transcription
//! service.
//!
//! A full run is four HTTP steps: fetch a temporary OSS upload policy, push
//! the WAV file to OSS with a multipart form, submit the transcription task
//! against the `oss://` handle, then poll the task until it yields a result
//! URL and download the transcript JSON from it.

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::transcribe::poll::{PollPolicy, PollStep};
use crate::transcribe::Segment;

pub const DEFAULT_BASE_URL: &str = "https://dashscope.aliyuncs.com";
pub const DEFAULT_MODEL: &str = "paraformer-v2";

#[derive(Debug, Clone)]
pub struct CloudConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub language: String,
    pub poll: PollPolicy,
}

impl CloudConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            language: "zh".to_string(),
            poll: PollPolicy::default(),
        }
    }
}

/// Client for the asynchronous cloud transcription flow.
pub struct CloudAsrClient {
    http: reqwest::Client,
    config: CloudConfig,
}

#[derive(Debug, Deserialize)]
struct PolicyResponse {
    data: UploadPolicy,
}

#[derive(Debug, Deserialize)]
pub struct UploadPolicy {
    pub upload_host: String,
    pub upload_dir: String,
    pub policy: String,
    pub signature: String,
    pub oss_access_key_id: String,
    pub x_oss_object_acl: String,
    pub x_oss_forbid_overwrite: String,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    output: Option<SubmitOutput>,
}

#[derive(Debug, Deserialize)]
struct SubmitOutput {
    task_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PollResponse {
    #[serde(default)]
    output: Option<PollOutput>,
}

#[derive(Debug, Default, Deserialize)]
struct PollOutput {
    task_status: Option<String>,
    results: Option<Vec<TaskResult>>,
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TaskResult {
    transcription_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResultPayload {
    #[serde(default)]
    pub transcripts: Option<Vec<TranscriptBlock>>,
    #[serde(default)]
    pub sentences: Option<Vec<Sentence>>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptBlock {
    #[serde(default)]
    pub sentences: Option<Vec<Sentence>>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Sentence {
    pub text: String,
    pub begin_time: Option<f64>,
    pub end_time: Option<f64>,
}

/// Terminal classification of a task status string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Succeeded,
    Failed,
    Dead,
}

impl TaskStatus {
    pub fn parse(status: &str) -> Self {
        match status {
            "SUCCEEDED" => TaskStatus::Succeeded,
            "FAILED" => TaskStatus::Failed,
            "CANCELED" | "EXPIRED" | "UNKNOWN" => TaskStatus::Dead,
            _ => TaskStatus::Pending,
        }
    }
}

impl CloudAsrClient {
    pub fn new(config: CloudConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Run the full cloud flow on an encoded WAV file. `on_progress` receives
    /// a percentage and a user-facing status line for each stage.
    pub async fn transcribe(
        &self,
        wav: Vec<u8>,
        duration_sec: f64,
        mut on_progress: impl FnMut(u8, String) + Send,
    ) -> Result<Vec<Segment>> {
        on_progress(15, "正在上传音频文件...".to_string());
        let policy = self.fetch_upload_policy().await?;
        let oss_url = self.upload(&policy, wav).await?;
        info!(%oss_url, "audio uploaded");

        on_progress(25, "正在提交转录任务...".to_string());
        let task_id = self.submit_job(&oss_url).await?;
        info!(%task_id, "transcription task submitted");

        on_progress(25, "正在等待转录结果...".to_string());
        let result_url = self.poll_job(&task_id, &mut on_progress).await?;

        on_progress(85, "正在下载转录结果...".to_string());
        let segments = self.fetch_results(&result_url).await?;

        if segments.is_empty() {
            // A succeeded task with no sentences still yields one segment so
            // downstream rendering always has something to anchor timestamps.
            return Ok(vec![Segment {
                text: String::new(),
                start_sec: 0.0,
                end_sec: Some(duration_sec),
            }]);
        }
        Ok(segments)
    }

    async fn fetch_upload_policy(&self) -> Result<UploadPolicy> {
        let url = format!(
            "{}/api/v1/uploads?action=getPolicy&model={}",
            self.config.base_url, self.config.model
        );
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| Error::network("get upload policy", e))?;
        let body = read_body("get upload policy", resp).await?;
        let parsed: PolicyResponse = parse_json("upload policy", &body)?;
        Ok(parsed.data)
    }

    /// Upload the WAV to OSS with the policy form. Returns the `oss://` handle
    /// the transcription service resolves server-side. OSS requires the file
    /// part to be the last field in the form.
    async fn upload(&self, policy: &UploadPolicy, wav: Vec<u8>) -> Result<String> {
        let key = format!("{}/{}.wav", policy.upload_dir, Uuid::new_v4());
        let file = Part::bytes(wav)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| Error::Protocol(format!("invalid upload mime type: {e}")))?;
        let form = Form::new()
            .text("OSSAccessKeyId", policy.oss_access_key_id.clone())
            .text("Signature", policy.signature.clone())
            .text("policy", policy.policy.clone())
            .text("x-oss-object-acl", policy.x_oss_object_acl.clone())
            .text("x-oss-forbid-overwrite", policy.x_oss_forbid_overwrite.clone())
            .text("key", key.clone())
            .text("success_action_status", "200")
            .part("file", file);
        let resp = self
            .http
            .post(&policy.upload_host)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::network("upload audio", e))?;
        read_body("upload audio", resp).await?;
        Ok(format!("oss://{key}"))
    }

    async fn submit_job(&self, oss_url: &str) -> Result<String> {
        let url = format!(
            "{}/api/v1/services/audio/asr/transcription",
            self.config.base_url
        );
        let body = json!({
            "model": self.config.model,
            "input": { "file_urls": [oss_url] },
            "parameters": { "language_hints": [self.config.language] },
        });
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .header("X-DashScope-Async", "enable")
            .header("X-DashScope-OssResourceResolve", "enable")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::network("submit task", e))?;
        let body = read_body("submit task", resp).await?;
        let parsed: SubmitResponse = parse_json("task submission", &body)?;
        parsed
            .output
            .and_then(|o| o.task_id)
            .ok_or_else(|| Error::Protocol("task submission returned no task_id".to_string()))
    }

    async fn poll_job(
        &self,
        task_id: &str,
        on_progress: &mut (impl FnMut(u8, String) + Send),
    ) -> Result<String> {
        let url = format!("{}/api/v1/tasks/{}", self.config.base_url, task_id);
        let max_attempts = self.config.poll.max_attempts;
        let http = self.http.clone();
        let api_key = self.config.api_key.clone();
        self.config
            .poll
            .run(
                || {
                    let http = http.clone();
                    let api_key = api_key.clone();
                    let url = url.clone();
                    async move {
                        let resp = http
                            .get(&url)
                            .bearer_auth(&api_key)
                            .send()
                            .await
                            .map_err(|e| Error::network("poll task", e))?;
                        let body = read_body("poll task", resp).await?;
                        let parsed: PollResponse = parse_json("task status", &body)?;
                        let output = parsed.output.unwrap_or_default();
                        let status = match output.task_status.as_deref() {
                            Some(s) => s.to_string(),
                            None => return Ok(PollStep::Pending(None)),
                        };
                        debug!(%status, "task status");
                        match TaskStatus::parse(&status) {
                            TaskStatus::Succeeded => {
                                let result_url = output
                                    .results
                                    .and_then(|mut r| {
                                        if r.is_empty() {
                                            None
                                        } else {
                                            r.remove(0).transcription_url
                                        }
                                    })
                                    .ok_or_else(|| {
                                        Error::Protocol(
                                            "succeeded task carries no transcription url"
                                                .to_string(),
                                        )
                                    })?;
                                Ok(PollStep::Terminal(result_url))
                            }
                            TaskStatus::Failed => Err(Error::Task {
                                code: output.code.unwrap_or_else(|| "FAILED".to_string()),
                                message: output
                                    .message
                                    .unwrap_or_else(|| "transcription task failed".to_string()),
                            }),
                            TaskStatus::Dead => Err(Error::Task {
                                code: status,
                                message: "task ended without producing a result".to_string(),
                            }),
                            TaskStatus::Pending => Ok(PollStep::Pending(Some(status))),
                        }
                    }
                },
                |attempt, _status| {
                    let ratio = (attempt as f64 / max_attempts as f64).min(0.75);
                    let percent = (25.0 + ratio * 80.0).round().min(85.0) as u8;
                    on_progress(percent, format!("正在转录中 ({attempt})..."));
                },
            )
            .await
    }

    /// The result URL is a pre-signed OSS link and needs no auth header.
    async fn fetch_results(&self, result_url: &str) -> Result<Vec<Segment>> {
        let resp = self
            .http
            .get(result_url)
            .send()
            .await
            .map_err(|e| Error::network("fetch results", e))?;
        let body = read_body("fetch results", resp).await?;
        let payload: ResultPayload = parse_json("transcription result", &body)?;
        Ok(parse_result_payload(payload))
    }
}

/// Flatten the result payload to timestamped segments. Sentence timings are
/// reported in milliseconds; plain-text fallbacks get a zero-length anchor.
pub fn parse_result_payload(payload: ResultPayload) -> Vec<Segment> {
    let blocks: Vec<TranscriptBlock> = match payload.transcripts {
        Some(blocks) => blocks,
        None => vec![TranscriptBlock {
            sentences: payload.sentences,
            text: payload.text,
        }],
    };

    let mut segments = Vec::new();
    for block in blocks {
        if let Some(sentences) = block.sentences {
            for s in sentences {
                segments.push(Segment {
                    text: s.text,
                    start_sec: s.begin_time.unwrap_or(0.0) / 1000.0,
                    end_sec: s.end_time.map(|t| t / 1000.0),
                });
            }
        } else if let Some(text) = block.text {
            if !text.is_empty() {
                segments.push(Segment {
                    text,
                    start_sec: 0.0,
                    end_sec: Some(0.0),
                });
            }
        }
    }
    segments
}

/// Read a response body, turning non-2xx statuses into protocol errors with
/// a body preview for diagnostics.
async fn read_body(step: &'static str, resp: reqwest::Response) -> Result<String> {
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| Error::network(step, e))?;
    if !status.is_success() {
        return Err(Error::Protocol(format!(
            "{step} returned {status}: {}",
            preview(&body)
        )));
    }
    Ok(body)
}

fn parse_json<'a, T: Deserialize<'a>>(what: &str, body: &'a str) -> Result<T> {
    serde_json::from_str(body)
        .map_err(|e| Error::Protocol(format!("malformed {what} response: {e}: {}", preview(body))))
}

/// First ~200 characters of a body, clipped on a char boundary.
pub fn preview(body: &str) -> &str {
    match body.char_indices().nth(200) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
