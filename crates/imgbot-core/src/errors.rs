/// Core error type for the image bot.
///
/// Adapter crates map their transport errors (reqwest, teloxide) into this type so the
/// per-message workflow can decide what the user sees.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("word \"{alias}\" not found in the text")]
    MissingAlias { alias: String },

    #[error("no text provided")]
    EmptyPrompt,

    #[error("invalid setting: {0}")]
    InvalidSetting(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
