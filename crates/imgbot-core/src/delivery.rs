use std::{sync::Arc, time::Duration};

use tokio::time::sleep;

use crate::{
    domain::{ChatId, MessageRef},
    generation::GeneratedImage,
    messaging::{
        port::MessagingPort,
        types::{ChatAction, PhotoPayload},
    },
    ports::ImageFetcher,
    retry::{retry_with_backoff, RetryPolicy},
    Result,
};

pub const DEFAULT_INTER_IMAGE_DELAY: Duration = Duration::from_millis(1000);

#[derive(Clone, Copy, Debug)]
pub struct DeliveryOptions {
    pub retry: RetryPolicy,
    /// Pause after each downloaded image before handling the next one.
    pub inter_image_delay: Duration,
}

impl Default for DeliveryOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            inter_image_delay: DEFAULT_INTER_IMAGE_DELAY,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub sent: usize,
    pub failed: usize,
}

pub fn download_fallback_text(url: &str) -> String {
    format!("Failed to download image. You can view it here: {url}")
}

pub fn send_fallback_text(url: &str) -> String {
    format!("Couldn't send image directly. You can view it here: {url}")
}

/// Upload one photo, retrying with backoff. The last error surfaces once retries run out.
pub async fn send_photo_with_retry(
    messenger: &dyn MessagingPort,
    chat_id: ChatId,
    photo: &PhotoPayload,
    policy: RetryPolicy,
) -> Result<MessageRef> {
    retry_with_backoff(policy, |_attempt| messenger.send_photo(chat_id, photo.clone())).await
}

/// Send a link in place of an image. A failure here is only logged; there is nothing left to fall
/// back to.
async fn send_link(messenger: &dyn MessagingPort, chat_id: ChatId, text: &str) {
    if let Err(e) = messenger.send_text(chat_id, text).await {
        tracing::warn!(chat_id = chat_id.0, error = %e, "failed to send image link");
    }
}

/// Download and send each image in order, degrading to a link when either step fails.
///
/// Images larger than the messenger's photo limit go straight to the link without an upload.
pub async fn deliver_images(
    messenger: Arc<dyn MessagingPort>,
    fetcher: Arc<dyn ImageFetcher>,
    chat_id: ChatId,
    images: &[GeneratedImage],
    opts: DeliveryOptions,
) -> DeliveryReport {
    let caps = messenger.capabilities();
    let mut report = DeliveryReport::default();

    for image in images {
        let bytes = match fetcher.fetch(&image.url).await {
            Ok(b) => b,
            Err(e) => {
                tracing::error!(
                    chat_id = chat_id.0,
                    url = %image.url,
                    error = %e,
                    "failed to download image"
                );
                report.failed += 1;
                send_link(messenger.as_ref(), chat_id, &download_fallback_text(&image.url)).await;
                continue;
            }
        };

        if bytes.len() > caps.max_photo_bytes {
            tracing::warn!(
                chat_id = chat_id.0,
                url = %image.url,
                bytes = bytes.len(),
                limit = caps.max_photo_bytes,
                "image exceeds photo size limit"
            );
            report.failed += 1;
            send_link(messenger.as_ref(), chat_id, &send_fallback_text(&image.url)).await;
            sleep(opts.inter_image_delay).await;
            continue;
        }

        let photo = PhotoPayload::from_url(bytes, &image.url);
        if caps.supports_chat_actions {
            let _ = messenger
                .send_chat_action(chat_id, ChatAction::UploadPhoto)
                .await;
        }

        match send_photo_with_retry(messenger.as_ref(), chat_id, &photo, opts.retry).await {
            Ok(_) => report.sent += 1,
            Err(e) => {
                tracing::error!(
                    chat_id = chat_id.0,
                    url = %image.url,
                    attempts = opts.retry.max_attempts(),
                    error = %e,
                    "failed to send image after retries"
                );
                report.failed += 1;
                send_link(messenger.as_ref(), chat_id, &send_fallback_text(&image.url)).await;
            }
        }

        sleep(opts.inter_image_delay).await;
    }

    report
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    fn image(url: &str) -> GeneratedImage {
        GeneratedImage {
            url: url.to_string(),
            ..Default::default()
        }
    }

    fn opts(attempts: u32) -> DeliveryOptions {
        DeliveryOptions {
            retry: RetryPolicy::new(attempts, Duration::from_millis(1000)),
            inter_image_delay: Duration::from_millis(1000),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn sends_every_image_in_order() {
        let messenger = Arc::new(FakeMessenger::default());
        let fetcher = Arc::new(FakeFetcher::serving(&[
            "https://img.test/a.jpg",
            "https://img.test/b.png",
        ]));

        let report = deliver_images(
            messenger.clone(),
            fetcher.clone(),
            ChatId(7),
            &[image("https://img.test/a.jpg"), image("https://img.test/b.png")],
            opts(3),
        )
        .await;

        assert_eq!(report, DeliveryReport { sent: 2, failed: 0 });
        assert_eq!(
            messenger.sent(),
            vec![Sent::Photo("a.jpg".to_string()), Sent::Photo("b.png".to_string())]
        );
        assert_eq!(
            *fetcher.requested.lock().unwrap(),
            vec!["https://img.test/a.jpg", "https://img.test/b.png"]
        );
        assert_eq!(*messenger.chat_actions.lock().unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_fall_back_to_link() {
        let messenger = Arc::new(FakeMessenger::failing_photos(3));
        let fetcher = Arc::new(FakeFetcher::serving(&["https://img.test/a.jpg"]));
        let started = tokio::time::Instant::now();

        let report = deliver_images(
            messenger.clone(),
            fetcher,
            ChatId(7),
            &[image("https://img.test/a.jpg")],
            opts(3),
        )
        .await;

        assert_eq!(report, DeliveryReport { sent: 0, failed: 1 });
        assert_eq!(*messenger.photo_attempts.lock().unwrap(), 3);
        assert_eq!(
            messenger.texts(),
            vec![send_fallback_text("https://img.test/a.jpg")]
        );
        // 1s + 2s backoff, then the 1s inter-image pause.
        assert!(started.elapsed() >= Duration::from_millis(4000));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_recovers_within_budget() {
        let messenger = Arc::new(FakeMessenger::failing_photos(2));
        let fetcher = Arc::new(FakeFetcher::serving(&["https://img.test/a.jpg"]));

        let report = deliver_images(
            messenger.clone(),
            fetcher,
            ChatId(7),
            &[image("https://img.test/a.jpg")],
            opts(3),
        )
        .await;

        assert_eq!(report, DeliveryReport { sent: 1, failed: 0 });
        assert_eq!(*messenger.photo_attempts.lock().unwrap(), 3);
        assert!(messenger.texts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn download_failure_sends_link_and_continues() {
        let messenger = Arc::new(FakeMessenger::default());
        let fetcher = Arc::new(FakeFetcher::serving(&["https://img.test/b.jpg"]));

        let report = deliver_images(
            messenger.clone(),
            fetcher,
            ChatId(7),
            &[
                image("https://img.test/missing.jpg"),
                image("https://img.test/b.jpg"),
            ],
            opts(3),
        )
        .await;

        assert_eq!(report, DeliveryReport { sent: 1, failed: 1 });
        assert_eq!(
            messenger.sent(),
            vec![
                Sent::Text(download_fallback_text("https://img.test/missing.jpg")),
                Sent::Photo("b.jpg".to_string()),
            ]
        );
        assert_eq!(*messenger.photo_attempts.lock().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_image_skips_upload() {
        // FakeFetcher serves two bytes per image.
        let messenger = Arc::new(FakeMessenger::with_photo_limit(1));
        let fetcher = Arc::new(FakeFetcher::serving(&["https://img.test/big.jpg"]));

        let report = deliver_images(
            messenger.clone(),
            fetcher,
            ChatId(7),
            &[image("https://img.test/big.jpg")],
            opts(3),
        )
        .await;

        assert_eq!(report, DeliveryReport { sent: 0, failed: 1 });
        assert_eq!(*messenger.photo_attempts.lock().unwrap(), 0);
        assert_eq!(
            messenger.texts(),
            vec![send_fallback_text("https://img.test/big.jpg")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_link_does_not_stop_delivery() {
        let messenger = Arc::new(FakeMessenger::rejecting_texts());
        let fetcher = Arc::new(FakeFetcher::serving(&["https://img.test/b.jpg"]));

        let report = deliver_images(
            messenger.clone(),
            fetcher,
            ChatId(7),
            &[
                image("https://img.test/missing.jpg"),
                image("https://img.test/b.jpg"),
            ],
            opts(3),
        )
        .await;

        assert_eq!(report, DeliveryReport { sent: 1, failed: 1 });
        assert_eq!(messenger.sent(), vec![Sent::Photo("b.jpg".to_string())]);
    }
}
