/// Core error type for the wallet tracker bot.
///
/// Adapter crates map their specific errors into this type so the dispatcher
/// can tell a business rejection (relayed to the user) from an unexpected
/// failure (aborts the rest of a batch).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Typed rejection from the tracking service ("wallet not found", ...).
    #[error("{0}")]
    Rejected(String),

    #[error("external error: {0}")]
    External(String),

    #[error("callback data is {len} bytes, over the {limit}-byte limit")]
    CallbackTooLong { len: usize, limit: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
