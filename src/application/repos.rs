//! Collaborator traits the published cache reads through.
//!
//! The tree provider and the type source are expected to serve from memory;
//! every call is synchronous. Failures are reported as [`ProviderError`] and are
//! never retried by the cache.

use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

use crate::domain::content::{ContentNode, NodeId};
use crate::domain::content_type::{ContentTypeDescriptor, ItemKind};

type BoxedSource = Box<dyn StdError + Send + Sync + 'static>;

/// Failure raised by an external provider.
#[derive(Debug, Error)]
#[error("provider error: {message}")]
pub struct ProviderError {
    message: String,
    #[source]
    source: Option<BoxedSource>,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(message: impl Into<String>, source: impl Into<BoxedSource>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Read access to the published content tree.
pub trait ContentTreeProvider: Send + Sync {
    fn node_by_id(&self, id: NodeId, preview: bool) -> Result<Option<Arc<ContentNode>>, ProviderError>;

    /// Top-level nodes in the provider's stable order.
    fn root_nodes(&self, preview: bool) -> Result<Vec<Arc<ContentNode>>, ProviderError>;

    /// Children in sort order, restricted to those available in `culture`.
    fn children(
        &self,
        node: &ContentNode,
        culture: Option<&str>,
        preview: bool,
    ) -> Result<Vec<Arc<ContentNode>>, ProviderError>;

    fn url_segment(
        &self,
        node: &ContentNode,
        culture: Option<&str>,
    ) -> Result<Option<String>, ProviderError> {
        Ok(node.url_segment(culture).map(str::to_string))
    }

    fn has_assigned_domain(&self, id: NodeId) -> Result<bool, ProviderError>;

    /// Whether the top-level node segment is hidden when no explicit setting is given.
    fn hide_top_level_node(&self) -> bool {
        false
    }
}

/// Schema store backing the content-type cache.
///
/// Implementations must not call back into the cache that owns them.
pub trait ContentTypeSource: Send + Sync {
    fn by_alias(
        &self,
        kind: ItemKind,
        alias: &str,
    ) -> Result<Option<ContentTypeDescriptor>, ProviderError>;

    fn by_id(&self, kind: ItemKind, id: i32) -> Result<Option<ContentTypeDescriptor>, ProviderError>;
}
