//! fal.ai adapter (queue API) plus the HTTP image fetcher.
//!
//! Generation goes through fal's queue: submit the request, poll the status url until it
//! completes, then read the result.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;

use imgbot_core::{
    config::Config,
    errors::Error,
    generation::{GenerationRequest, GenerationResponse},
    ports::ImageGenerator,
    settings::ImageSize,
    Result,
};

mod fetch;

pub use fetch::HttpImageFetcher;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct FalConfig {
    pub api_key: String,
    /// Queue base, e.g. `https://queue.fal.run`.
    pub queue_url: String,
    /// Model app id, e.g. `fal-ai/flux-lora`.
    pub endpoint: String,
    pub lora_path: String,
    pub lora_scale: f32,
    pub poll_interval: Duration,
}

impl FalConfig {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            api_key: cfg.fal_api_key.clone(),
            queue_url: cfg.fal_queue_url.clone(),
            endpoint: cfg.fal_model_endpoint.clone(),
            lora_path: cfg.lora_path(),
            lora_scale: cfg.lora_scale,
            poll_interval: cfg.poll_interval,
        }
    }
}

#[derive(Serialize)]
struct LoraWeight<'a> {
    path: &'a str,
    scale: f32,
}

#[derive(Serialize)]
struct FluxLoraInput<'a> {
    prompt: &'a str,
    loras: Vec<LoraWeight<'a>>,
    image_size: ImageSize,
    num_images: u8,
}

#[derive(Debug, Deserialize)]
struct QueueSubmission {
    request_id: String,
    #[serde(default)]
    status_url: Option<String>,
    #[serde(default)]
    response_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueueLog {
    message: String,
}

#[derive(Debug, Deserialize)]
struct QueueStatus {
    status: String,
    #[serde(default)]
    queue_position: Option<u64>,
    #[serde(default)]
    logs: Option<Vec<QueueLog>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Clone, Debug)]
pub struct FalClient {
    cfg: FalConfig,
    http: reqwest::Client,
}

impl FalClient {
    pub fn new(cfg: FalConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::External(format!("fal http client error: {e}")))?;
        Ok(Self { cfg, http })
    }

    fn endpoint_url(&self) -> String {
        format!("{}/{}", self.cfg.queue_url, self.cfg.endpoint)
    }

    fn request_url(&self, request_id: &str) -> String {
        format!("{}/requests/{request_id}", self.endpoint_url())
    }

    fn auth_header(&self) -> String {
        format!("Key {}", self.cfg.api_key)
    }

    async fn submit(&self, req: &GenerationRequest) -> Result<QueueSubmission> {
        let input = FluxLoraInput {
            prompt: &req.prompt,
            loras: vec![LoraWeight {
                path: &self.cfg.lora_path,
                scale: self.cfg.lora_scale,
            }],
            image_size: req.image_size,
            num_images: req.num_images,
        };

        let resp = self
            .http
            .post(self.endpoint_url())
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .json(&input)
            .send()
            .await
            .map_err(|e| Error::External(format!("fal request error: {e}")))?;

        read_json(resp, "fal submit").await
    }

    async fn status(&self, status_url: &str) -> Result<QueueStatus> {
        let resp = self
            .http
            .get(status_url)
            .query(&[("logs", "1")])
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .send()
            .await
            .map_err(|e| Error::External(format!("fal status error: {e}")))?;

        read_json(resp, "fal status").await
    }

    /// Poll until fal reports completion, returning how many status polls it took.
    async fn wait_for_completion(&self, request_id: &str, status_url: &str) -> Result<usize> {
        let mut polls = 0usize;
        let mut logs_seen = 0usize;
        loop {
            let st = self.status(status_url).await?;
            polls += 1;

            let logs = st.logs.unwrap_or_default();
            for log in fresh_logs(&logs, &mut logs_seen) {
                tracing::info!(request_id, "{}", log.message);
            }

            match st.status.as_str() {
                "COMPLETED" => {
                    if let Some(err) = st.error {
                        return Err(Error::External(format!(
                            "fal request {request_id} failed: {err}"
                        )));
                    }
                    return Ok(polls);
                }
                "IN_QUEUE" => {
                    tracing::debug!(request_id, position = ?st.queue_position, "queued");
                }
                "IN_PROGRESS" => {}
                other => {
                    return Err(Error::External(format!(
                        "fal request {request_id} returned unexpected status {other}"
                    )));
                }
            }

            sleep(self.cfg.poll_interval).await;
        }
    }

    async fn result(&self, response_url: &str) -> Result<GenerationResponse> {
        let resp = self
            .http
            .get(response_url)
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .send()
            .await
            .map_err(|e| Error::External(format!("fal result error: {e}")))?;

        read_json(resp, "fal result").await
    }
}

#[async_trait]
impl ImageGenerator for FalClient {
    async fn generate(&self, req: &GenerationRequest) -> Result<GenerationResponse> {
        let sub = self.submit(req).await?;
        tracing::info!(
            request_id = %sub.request_id,
            endpoint = %self.cfg.endpoint,
            "fal request queued"
        );

        let status_url = sub
            .status_url
            .clone()
            .unwrap_or_else(|| format!("{}/status", self.request_url(&sub.request_id)));
        let response_url = sub
            .response_url
            .clone()
            .unwrap_or_else(|| self.request_url(&sub.request_id));

        let polls = self.wait_for_completion(&sub.request_id, &status_url).await?;
        tracing::debug!(request_id = %sub.request_id, polls, "fal request completed");

        let mut out = self.result(&response_url).await?;
        out.request_id = Some(sub.request_id);
        Ok(out)
    }
}

/// Logs are cumulative on every poll; only the entries past `seen` are new.
fn fresh_logs<'a>(logs: &'a [QueueLog], seen: &mut usize) -> &'a [QueueLog] {
    let start = (*seen).min(logs.len());
    *seen = (*seen).max(logs.len());
    &logs[start..]
}

async fn read_json<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
    what: &str,
) -> Result<T> {
    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::External(format!(
            "{what} failed: {status} {}",
            body.chars().take(200).collect::<String>()
        )));
    }

    let bytes = resp
        .bytes()
        .await
        .map_err(|e| Error::External(format!("{what} read error: {e}")))?;
    Ok(serde_json::from_slice(&bytes)?)
}
