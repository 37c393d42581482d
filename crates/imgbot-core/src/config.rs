use std::{env, path::Path, time::Duration};

use crate::{
    delivery::DeliveryOptions,
    errors::Error,
    retry::RetryPolicy,
    settings::{validate_count, ImageSize, Settings},
    trigger::TriggerWords,
    Result,
};

pub const DEFAULT_FAL_QUEUE_URL: &str = "https://queue.fal.run";
pub const DEFAULT_FAL_MODEL_ENDPOINT: &str = "fal-ai/flux-lora";
pub const DEFAULT_LORA_BASE_URL: &str = "https://v3.fal.media/files";

/// Typed configuration, read once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    // Telegram
    pub bot_token: String,
    pub bot_username: String,
    pub telegram_api_url: Option<String>,

    // fal.ai
    pub fal_api_key: String,
    pub fal_queue_url: String,
    pub fal_model_endpoint: String,
    pub lora_base_url: String,
    pub lora_scale: f32,
    pub model_file: String,
    pub poll_interval: Duration,

    // Prompting
    pub trigger_word: String,
    pub trigger_word_alias: String,
    pub default_image_size: ImageSize,
    pub default_image_count: u8,

    // Delivery
    pub delivery_retries: u32,
    pub delivery_base_delay: Duration,
    pub download_timeout: Duration,
    pub inter_image_delay: Duration,
}

impl Config {
    /// Load from the process environment, after merging `.env` (existing vars win).
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).and_then(non_empty);
        let required = |key: &str| {
            get(key).ok_or_else(|| {
                Error::Config(format!("{key} must be provided in environment variables"))
            })
        };

        let bot_token = required("BOT_TOKEN")?;
        let bot_username = required("BOT_USERNAME")?
            .trim()
            .trim_start_matches('@')
            .to_string();
        let fal_api_key = required("FAL_API_KEY")?;
        let trigger_word = required("TRIGGER_WORD")?;
        let trigger_word_alias = required("TRIGGER_WORD_ALIAS")?;
        let model_file = required("MODEL_FILE")?;

        let telegram_api_url = get("TELEGRAM_API_URL");
        let fal_queue_url = get("FAL_QUEUE_URL")
            .unwrap_or_else(|| DEFAULT_FAL_QUEUE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let fal_model_endpoint = get("FAL_MODEL_ENDPOINT")
            .unwrap_or_else(|| DEFAULT_FAL_MODEL_ENDPOINT.to_string())
            .trim_matches('/')
            .to_string();
        let lora_base_url = get("FAL_LORA_BASE_URL")
            .unwrap_or_else(|| DEFAULT_LORA_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let lora_scale = parse_or("FAL_LORA_SCALE", get("FAL_LORA_SCALE"), 1.0f32)?;
        let poll_interval = Duration::from_millis(parse_or(
            "FAL_POLL_INTERVAL_MS",
            get("FAL_POLL_INTERVAL_MS"),
            500u64,
        )?);

        let default_image_size = match get("DEFAULT_IMAGE_SIZE") {
            Some(s) => s
                .parse::<ImageSize>()
                .map_err(|e| Error::Config(format!("DEFAULT_IMAGE_SIZE: {e}")))?,
            None => ImageSize::default(),
        };
        let default_image_count = validate_count(parse_or(
            "DEFAULT_IMAGE_COUNT",
            get("DEFAULT_IMAGE_COUNT"),
            1u8,
        )?)
        .map_err(|e| Error::Config(format!("DEFAULT_IMAGE_COUNT: {e}")))?;

        let delivery_retries = parse_or("DELIVERY_RETRIES", get("DELIVERY_RETRIES"), 3u32)?;
        let delivery_base_delay = Duration::from_millis(parse_or(
            "DELIVERY_BASE_DELAY_MS",
            get("DELIVERY_BASE_DELAY_MS"),
            1000u64,
        )?);
        let download_timeout = Duration::from_millis(parse_or(
            "DOWNLOAD_TIMEOUT_MS",
            get("DOWNLOAD_TIMEOUT_MS"),
            30_000u64,
        )?);
        let inter_image_delay = Duration::from_millis(parse_or(
            "INTER_IMAGE_DELAY_MS",
            get("INTER_IMAGE_DELAY_MS"),
            1000u64,
        )?);

        Ok(Self {
            bot_token,
            bot_username,
            telegram_api_url,
            fal_api_key,
            fal_queue_url,
            fal_model_endpoint,
            lora_base_url,
            lora_scale,
            model_file,
            poll_interval,
            trigger_word,
            trigger_word_alias,
            default_image_size,
            default_image_count,
            delivery_retries,
            delivery_base_delay,
            download_timeout,
            inter_image_delay,
        })
    }

    pub fn trigger_words(&self) -> Result<TriggerWords> {
        TriggerWords::new(self.trigger_word.clone(), self.trigger_word_alias.clone())
    }

    pub fn initial_settings(&self) -> Settings {
        Settings {
            image_size: self.default_image_size,
            num_images: self.default_image_count,
        }
    }

    pub fn delivery_options(&self) -> DeliveryOptions {
        DeliveryOptions {
            retry: RetryPolicy::new(self.delivery_retries, self.delivery_base_delay),
            inter_image_delay: self.inter_image_delay,
        }
    }

    /// Public URL of the LoRA weights passed to the model.
    pub fn lora_path(&self) -> String {
        format!("{}/{}.safetensors", self.lora_base_url, self.model_file)
    }
}

fn load_dotenv_if_present(path: &Path) {
    match dotenvy::from_path(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "loaded env file"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to parse env file"),
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T> {
    match raw {
        None => Ok(default),
        Some(s) => s
            .trim()
            .parse::<T>()
            .map_err(|_| Error::Config(format!("{key} has an invalid value: {s}"))),
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn base() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("BOT_TOKEN", "123:abc"),
            ("BOT_USERNAME", "@LoraBot"),
            ("FAL_API_KEY", "fal-key"),
            ("TRIGGER_WORD", "ohwx person"),
            ("TRIGGER_WORD_ALIAS", "me"),
            ("MODEL_FILE", "abc123/my_lora"),
        ])
    }

    fn load(vars: &HashMap<&'static str, &'static str>) -> Result<Config> {
        Config::from_lookup(|k| vars.get(k).map(|v| v.to_string()))
    }

    #[test]
    fn loads_required_values_and_defaults() {
        let cfg = load(&base()).unwrap();
        assert_eq!(cfg.bot_username, "LoraBot");
        assert_eq!(cfg.fal_queue_url, DEFAULT_FAL_QUEUE_URL);
        assert_eq!(cfg.fal_model_endpoint, "fal-ai/flux-lora");
        assert_eq!(
            cfg.lora_path(),
            "https://v3.fal.media/files/abc123/my_lora.safetensors"
        );
        assert_eq!(cfg.default_image_size, ImageSize::Landscape4x3);
        assert_eq!(cfg.default_image_count, 1);
        assert_eq!(cfg.download_timeout, Duration::from_secs(30));

        let opts = cfg.delivery_options();
        assert_eq!(opts.retry.max_attempts(), 3);
        assert_eq!(opts.retry.base_delay(), Duration::from_millis(1000));
        assert_eq!(opts.inter_image_delay, Duration::from_millis(1000));
    }

    #[test]
    fn each_required_value_is_enforced() {
        for key in [
            "BOT_TOKEN",
            "BOT_USERNAME",
            "FAL_API_KEY",
            "TRIGGER_WORD",
            "TRIGGER_WORD_ALIAS",
            "MODEL_FILE",
        ] {
            let mut vars = base();
            vars.insert(key, "  ");
            let err = load(&vars).unwrap_err();
            assert!(
                matches!(&err, Error::Config(msg) if msg.contains(key)),
                "{key}: {err}"
            );
        }
    }

    #[test]
    fn optional_overrides_are_validated() {
        let mut vars = base();
        vars.insert("DEFAULT_IMAGE_SIZE", "square_hd");
        vars.insert("DEFAULT_IMAGE_COUNT", "4");
        vars.insert("DELIVERY_RETRIES", "5");
        vars.insert("FAL_QUEUE_URL", "http://127.0.0.1:9000/");
        let cfg = load(&vars).unwrap();
        assert_eq!(cfg.initial_settings().image_size, ImageSize::SquareHd);
        assert_eq!(cfg.initial_settings().num_images, 4);
        assert_eq!(cfg.delivery_options().retry.max_attempts(), 5);
        assert_eq!(cfg.fal_queue_url, "http://127.0.0.1:9000");

        vars.insert("DEFAULT_IMAGE_COUNT", "9");
        assert!(matches!(load(&vars).unwrap_err(), Error::Config(_)));

        vars.insert("DEFAULT_IMAGE_COUNT", "2");
        vars.insert("DEFAULT_IMAGE_SIZE", "widescreen");
        assert!(matches!(load(&vars).unwrap_err(), Error::Config(_)));

        vars.insert("DEFAULT_IMAGE_SIZE", "square");
        vars.insert("DOWNLOAD_TIMEOUT_MS", "soon");
        assert!(matches!(load(&vars).unwrap_err(), Error::Config(_)));
    }
}
