use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{errors::Error, Result};

pub const MIN_IMAGE_COUNT: u8 = 1;
pub const MAX_IMAGE_COUNT: u8 = 4;

/// Named aspect-ratio presets accepted by the generation service.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageSize {
    #[default]
    #[serde(rename = "landscape_4_3")]
    Landscape4x3,
    #[serde(rename = "landscape_16_9")]
    Landscape16x9,
    #[serde(rename = "square")]
    Square,
    #[serde(rename = "square_hd")]
    SquareHd,
    #[serde(rename = "portrait_4_3")]
    Portrait4x3,
    #[serde(rename = "portrait_16_9")]
    Portrait16x9,
}

impl ImageSize {
    /// Presentation order used in help texts.
    pub const ALL: [ImageSize; 6] = [
        ImageSize::Landscape4x3,
        ImageSize::Landscape16x9,
        ImageSize::Square,
        ImageSize::SquareHd,
        ImageSize::Portrait4x3,
        ImageSize::Portrait16x9,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ImageSize::Landscape4x3 => "landscape_4_3",
            ImageSize::Landscape16x9 => "landscape_16_9",
            ImageSize::Square => "square",
            ImageSize::SquareHd => "square_hd",
            ImageSize::Portrait4x3 => "portrait_4_3",
            ImageSize::Portrait16x9 => "portrait_16_9",
        }
    }

    /// Nominal (width, height) in pixels.
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            ImageSize::Landscape4x3 => (1024, 768),
            ImageSize::Landscape16x9 => (1024, 576),
            ImageSize::Square => (576, 576),
            ImageSize::SquareHd => (1024, 1024),
            ImageSize::Portrait4x3 => (768, 1024),
            ImageSize::Portrait16x9 => (576, 1024),
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageSize {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        ImageSize::ALL
            .into_iter()
            .find(|size| size.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::InvalidSetting(format!("unknown image size: {wanted}")))
    }
}

/// Bulleted list of every size with its dimensions, shared by all help texts.
pub fn size_catalog() -> String {
    ImageSize::ALL
        .iter()
        .map(|size| {
            let (w, h) = size.dimensions();
            format!("- {size} ({w}×{h})")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Validate a requested image count.
pub fn validate_count(count: u8) -> Result<u8> {
    if (MIN_IMAGE_COUNT..=MAX_IMAGE_COUNT).contains(&count) {
        Ok(count)
    } else {
        Err(Error::InvalidSetting(format!(
            "image count must be between {MIN_IMAGE_COUNT} and {MAX_IMAGE_COUNT}, got {count}"
        )))
    }
}

/// Point-in-time copy of the session settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settings {
    pub image_size: ImageSize,
    pub num_images: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            image_size: ImageSize::default(),
            num_images: MIN_IMAGE_COUNT,
        }
    }
}

/// Process-wide settings shared by every chat. Lives as long as the process.
#[derive(Debug, Default)]
pub struct SessionSettings {
    inner: RwLock<Settings>,
}

impl SessionSettings {
    pub fn new(initial: Settings) -> Self {
        Self {
            inner: RwLock::new(initial),
        }
    }

    pub async fn snapshot(&self) -> Settings {
        *self.inner.read().await
    }

    pub async fn set_size(&self, size: ImageSize) {
        self.inner.write().await.image_size = size;
    }

    /// Rejected counts leave the current value untouched.
    pub async fn set_count(&self, count: u8) -> Result<u8> {
        let count = validate_count(count)?;
        self.inner.write().await.num_images = count;
        Ok(count)
    }
}
