/// Core error type for the broadcast bot.
///
/// The adapter crate maps its transport-specific errors into this type so the
/// core can handle failures consistently (user-facing rejection vs logged
/// per-target failure).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("target already registered: {0}")]
    DuplicateTarget(String),

    #[error("target not found: {0}")]
    TargetNotFound(String),

    #[error("could not resolve target: {0}")]
    ResolutionFailed(String),

    #[error("no composed message")]
    NoComposedMessage,

    #[error("attachment too large: {size} bytes (limit {limit})")]
    AttachmentTooLarge { size: usize, limit: usize },

    #[error("nothing to send: compose a message first")]
    NothingToSend,

    #[error("no targets registered")]
    NoTargets,

    #[error("delay out of range: {0}s (allowed 1..=3600)")]
    DelayOutOfRange(u64),

    #[error("persistence failed: {0}")]
    Persistence(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
