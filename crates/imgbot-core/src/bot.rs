//! Per-message workflow: compose, generate, deliver, summarize.

use std::sync::Arc;

use crate::{
    commands::{execute, parse_command},
    delivery::{deliver_images, DeliveryOptions, DeliveryReport},
    domain::{ChatId, MessageRef},
    errors::Error,
    generation::{GenerationRequest, Prompter},
    messaging::port::MessagingPort,
    ports::ImageFetcher,
    settings::SessionSettings,
    Result,
};

pub const GENERIC_ERROR_TEXT: &str =
    "An error occurred while processing your message. Please try again later.";
pub const NO_IMAGES_TEXT: &str = "No images were generated in the response.";

/// Everything a handler needs, passed explicitly instead of living in globals.
pub struct BotContext {
    pub bot_username: String,
    pub settings: SessionSettings,
    pub prompter: Prompter,
    pub fetcher: Arc<dyn ImageFetcher>,
    pub messenger: Arc<dyn MessagingPort>,
    pub delivery: DeliveryOptions,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromptOutcome {
    Delivered(DeliveryReport),
    NoImages,
}

impl BotContext {
    pub fn alias(&self) -> &str {
        &self.prompter.trigger().alias
    }

    /// Handle a slash command; unknown commands and commands for other bots are ignored.
    pub async fn handle_command(&self, chat_id: ChatId, text: &str) -> Result<()> {
        let Some(cmd) = parse_command(text) else {
            return Ok(());
        };
        if !cmd.is_for(&self.bot_username) {
            return Ok(());
        }
        let Some(reply) = execute(&cmd, &self.settings, self.alias()).await else {
            tracing::debug!(chat_id = chat_id.0, command = %cmd.name, "ignoring unknown command");
            return Ok(());
        };
        self.messenger.send_text(chat_id, &reply).await?;
        Ok(())
    }

    /// Generate images for `text` and relay them to `chat_id`.
    ///
    /// A message without the trigger alias fails before anything is sent or requested.
    pub async fn handle_prompt(&self, chat_id: ChatId, text: &str) -> Result<PromptOutcome> {
        let settings = self.settings.snapshot().await;
        let req = self.prompter.compose(text, settings)?;

        let processing = self
            .messenger
            .send_text(
                chat_id,
                &format!(
                    "Processing your message...\nGenerating {} image(s) with size: {}",
                    settings.num_images, settings.image_size
                ),
            )
            .await?;

        let outcome = self.generate_and_deliver(chat_id, text, &req).await;
        self.remove_status(processing).await;
        outcome
    }

    async fn generate_and_deliver(
        &self,
        chat_id: ChatId,
        text: &str,
        req: &GenerationRequest,
    ) -> Result<PromptOutcome> {
        let resp = self.prompter.send(req).await?;

        if resp.images.is_empty() {
            self.messenger.send_text(chat_id, NO_IMAGES_TEXT).await?;
            return Ok(PromptOutcome::NoImages);
        }

        let report = deliver_images(
            self.messenger.clone(),
            self.fetcher.clone(),
            chat_id,
            &resp.images,
            self.delivery,
        )
        .await;

        self.messenger
            .send_text(chat_id, &summary_text(text, report))
            .await?;
        Ok(PromptOutcome::Delivered(report))
    }

    async fn remove_status(&self, msg: MessageRef) {
        if let Err(e) = self.messenger.delete_message(msg).await {
            tracing::warn!(chat_id = msg.chat_id.0, error = %e, "failed to delete status message");
        }
    }

    /// Run `handle_prompt`, logging any failure and telling the user about it.
    pub async fn handle_prompt_reporting(&self, chat_id: ChatId, text: &str) {
        if let Err(e) = self.handle_prompt(chat_id, text).await {
            match &e {
                Error::MissingAlias { .. } | Error::EmptyPrompt => {
                    tracing::info!(chat_id = chat_id.0, error = %e, "rejected prompt")
                }
                _ => tracing::error!(chat_id = chat_id.0, error = %e, "error in message handler"),
            }
            if let Err(send_err) = self.messenger.send_text(chat_id, &reply_for_error(&e)).await {
                tracing::warn!(chat_id = chat_id.0, error = %send_err, "failed to send error reply");
            }
        }
    }
}

pub fn summary_text(prompt: &str, report: DeliveryReport) -> String {
    let mut out = format!(
        "Prompt used: {prompt}\nSuccessfully sent: {} image(s)",
        report.sent
    );
    if report.failed > 0 {
        out.push_str(&format!("\nFailed to send: {} image(s)", report.failed));
    }
    out
}

/// User-facing text for a failed message. Input mistakes get a hint, everything else is generic.
pub fn reply_for_error(err: &Error) -> String {
    match err {
        Error::MissingAlias { alias } => {
            format!("Your message must include \"{alias}\" to generate an image.")
        }
        Error::EmptyPrompt => "Please send some text describing the image.".to_string(),
        _ => GENERIC_ERROR_TEXT.to_string(),
    }
}
