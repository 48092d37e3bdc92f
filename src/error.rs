use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the engine façades.
///
/// Malformed response bodies are never reported here; the mappers absorb
/// them and fall back to defaults.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Engine returned HTTP {status}: {message}")]
    ApiStatus { status: u16, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Image pull failed: {0}")]
    Pull(String),

    #[error("Compose file error: {0}")]
    Compose(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// HTTP status carried by an [`Error::ApiStatus`].
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::ApiStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}
