/// Core error type.
///
/// Adapter crates map their specific errors into this type so the bot core
/// can handle hard failures consistently. Per-recipient delivery failures
/// are *not* errors; they are modeled as `delivery::DeliveryOutcome` values
/// so a broadcast or series never aborts because one recipient failed.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("directory error: {0}")]
    Directory(String),

    #[error("locale error: {0}")]
    Locale(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
