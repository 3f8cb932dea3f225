use thiserror::Error;

/// Everything the engine can report back to a caller.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{kind} expects {expected} children, got {got}")]
    ArityMismatch { kind: String, expected: usize, got: usize },
    #[error("unknown operator kind: {0}")]
    UnknownKind(String),
    #[error("invalid parameters for {kind}: {reason}")]
    InvalidParams { kind: String, reason: String },
    #[error("field shape mismatch: {left:?} vs {right:?}")]
    ShapeMismatch { left: (usize, usize), right: (usize, usize) },
    #[error("empty complexity range {min}..{max}")]
    InvalidRange { min: usize, max: usize },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
