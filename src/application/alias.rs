//! URL alias lookup.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument};

use crate::domain::content::{ContentNode, NodeId};
use crate::domain::routing::{AliasQuery, RoutingResult};

use super::error::PublishedCacheError;
use super::router::ContentRouter;

impl ContentRouter {
    /// Find the first node whose alias property lists `alias`.
    ///
    /// With a positive `root_id` only descendants of that node are searched;
    /// otherwise each top-level node and its descendants, in provider order.
    #[instrument(skip(self))]
    pub fn resolve_alias(
        &self,
        root_id: Option<NodeId>,
        culture: Option<&str>,
        alias: &str,
        preview: bool,
    ) -> Result<RoutingResult, PublishedCacheError> {
        let Some(query) = AliasQuery::new(alias, self.options.alias_matching) else {
            return Ok(RoutingResult::NotFound);
        };

        let found = match root_id.filter(|id| *id > 0) {
            Some(root_id) => match self.provider.node_by_id(root_id, preview)? {
                Some(root) => self.search_descendants(&root, &query, culture, preview)?,
                None => None,
            },
            None => {
                let mut found = None;
                for root in self.provider.root_nodes(preview)? {
                    found = if self.is_alias_match(&root, &query, culture)? {
                        Some(root.id)
                    } else {
                        self.search_descendants(&root, &query, culture, preview)?
                    };
                    if found.is_some() {
                        break;
                    }
                }
                found
            }
        };

        let result = RoutingResult::from(found);
        debug!(alias = query.alias(), outcome = ?result, "Resolved url alias");
        Ok(result)
    }

    /// Depth-first, pre-order, children in provider order.
    fn search_descendants(
        &self,
        node: &ContentNode,
        query: &AliasQuery,
        culture: Option<&str>,
        preview: bool,
    ) -> Result<Option<NodeId>, PublishedCacheError> {
        let mut stack: Vec<Arc<ContentNode>> = self.provider.children(node, culture, preview)?;
        stack.reverse();

        while let Some(candidate) = stack.pop() {
            if self.is_alias_match(&candidate, query, culture)? {
                return Ok(Some(candidate.id));
            }
            let mut children = self.provider.children(&candidate, culture, preview)?;
            children.reverse();
            stack.extend(children);
        }
        Ok(None)
    }

    fn is_alias_match(
        &self,
        node: &ContentNode,
        query: &AliasQuery,
        culture: Option<&str>,
    ) -> Result<bool, PublishedCacheError> {
        let property_alias = self.options.url_alias_property.as_str();
        let varies_by_culture = match &self.content_types {
            Some(content_types) => content_types
                .get_by_id(node.kind(), node.content_type.id)?
                .property_type(property_alias)
                .map(|property_type| property_type.varies_by_culture),
            None => node
                .content_type
                .property_type(property_alias)
                .map(|property_type| property_type.varies_by_culture),
        };
        let Some(varies_by_culture) = varies_by_culture else {
            return Ok(false);
        };

        let value = if varies_by_culture {
            if !node.has_culture(culture) {
                return Ok(false);
            }
            node.raw_value(property_alias, culture)
        } else {
            node.raw_value(property_alias, None)
        };

        Ok(match value {
            Some(Value::String(stored)) => query.matches(stored),
            Some(Value::Array(entries)) => {
                let joined = entries
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(",");
                query.matches(&joined)
            }
            _ => false,
        })
    }
}
