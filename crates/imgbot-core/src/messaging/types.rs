/// Outgoing "chat action" shown while an image is being uploaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatAction {
    UploadPhoto,
}

/// A downloaded image ready to be uploaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhotoPayload {
    pub bytes: Vec<u8>,
    pub file_name: String,
}

impl PhotoPayload {
    pub fn new(bytes: Vec<u8>, file_name: impl Into<String>) -> Self {
        Self {
            bytes,
            file_name: file_name.into(),
        }
    }

    /// File name derived from the last path segment of the source url.
    pub fn from_url(bytes: Vec<u8>, url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let name = path
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty() && s.contains('.'))
            .unwrap_or("image.jpg");
        Self::new(bytes, name)
    }
}

/// Limits of a messenger implementation that shape delivery.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessagingCapabilities {
    pub supports_chat_actions: bool,
    /// Larger images are sent as a link instead of uploaded.
    pub max_photo_bytes: usize,
}
