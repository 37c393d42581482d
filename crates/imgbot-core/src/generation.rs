//! Generation request/response values and the prompter that issues them.

use std::{collections::HashMap, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    ports::ImageGenerator,
    settings::{ImageSize, Settings},
    trigger::TriggerWords,
    Result,
};

/// One generation call: built per message, sent once, then discarded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub image_size: ImageSize,
    pub num_images: u8,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub content_type: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationResponse {
    #[serde(default)]
    pub images: Vec<GeneratedImage>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub has_nsfw_concepts: Option<Vec<bool>>,
    #[serde(default)]
    pub timings: Option<HashMap<String, f64>>,
    /// Set by the client from the queue submission, not part of the model output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Turns user text into a generation call.
#[derive(Clone)]
pub struct Prompter {
    trigger: TriggerWords,
    generator: Arc<dyn ImageGenerator>,
}

impl Prompter {
    pub fn new(trigger: TriggerWords, generator: Arc<dyn ImageGenerator>) -> Self {
        Self { trigger, generator }
    }

    pub fn trigger(&self) -> &TriggerWords {
        &self.trigger
    }

    /// Substitute the trigger alias and build the request without calling out.
    pub fn compose(&self, text: &str, settings: Settings) -> Result<GenerationRequest> {
        Ok(GenerationRequest {
            prompt: self.trigger.substitute(text)?,
            image_size: settings.image_size,
            num_images: settings.num_images,
        })
    }

    /// Compose and send a single request. No retry: failures go straight to the caller.
    pub async fn prompt(&self, text: &str, settings: Settings) -> Result<GenerationResponse> {
        let req = self.compose(text, settings)?;
        self.send(&req).await
    }

    /// Send an already composed request once.
    pub async fn send(&self, req: &GenerationRequest) -> Result<GenerationResponse> {
        tracing::info!(
            size = %req.image_size,
            count = req.num_images,
            "requesting image generation"
        );
        let resp = self.generator.generate(req).await?;
        tracing::info!(
            request_id = resp.request_id.as_deref().unwrap_or("-"),
            images = resp.images.len(),
            seed = ?resp.seed,
            "image generation finished"
        );
        Ok(resp)
    }
}
