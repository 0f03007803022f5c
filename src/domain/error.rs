use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("invalid property cache level `{value}`")]
    InvalidCacheLevel { value: String },
    #[error("unknown item kind `{value}`")]
    UnknownItemKind { value: String },
    #[error("domain validation failed: {message}")]
    Validation { message: String },
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}
