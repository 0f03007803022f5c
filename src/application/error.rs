use std::error::Error as StdError;

use thiserror::Error;

use crate::{
    application::repos::ProviderError,
    config::LoadError,
    domain::{content_type::ItemKind, error::DomainError},
    infra::error::InfraError,
};

/// Errors raised by the published cache.
///
/// Absent routes and aliases are not errors; they come back as
/// [`RoutingResult::NotFound`](crate::domain::routing::RoutingResult).
#[derive(Debug, Error)]
pub enum PublishedCacheError {
    /// The schema store has no type for a key the caller expected to exist.
    #[error("content type `{key}` of kind {kind} is missing from the schema store")]
    MissingContentType { kind: ItemKind, key: String },
    #[error("invalid property cache level `{value}`")]
    InvalidCacheLevel { value: String },
    #[error("failed to convert property `{alias}`")]
    Conversion {
        alias: String,
        #[source]
        source: ProviderError,
    },
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl PublishedCacheError {
    pub fn missing_content_type(kind: ItemKind, key: impl ToString) -> Self {
        Self::MissingContentType {
            kind,
            key: key.to_string(),
        }
    }

    pub fn conversion(alias: impl Into<String>, source: ProviderError) -> Self {
        Self::Conversion {
            alias: alias.into(),
            source,
        }
    }
}

impl From<DomainError> for PublishedCacheError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::InvalidCacheLevel { value } => Self::InvalidCacheLevel { value },
            other => Self::Provider(ProviderError::with_source("invalid domain data", other)),
        }
    }
}

/// Flattened error chain for reporting.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self { source, messages }
    }

    pub fn render(&self) -> String {
        self.messages.join(": ")
    }
}

/// Top-level error of the command-line host.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Cache(#[from] PublishedCacheError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error("validation failed: {0}")]
    Validation(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
