//! Route resolution over a content tree provider.
//!
//! Routes have the shape `[<root id>]/<segment>/<segment>`. A positive root id
//! prefix anchors the walk at a node with an assigned domain; otherwise the
//! walk starts at the top-level nodes.

use std::sync::Arc;

use tracing::{debug, instrument, trace};

use crate::cache::ContentTypeCache;
use crate::domain::content::{ContentNode, NodeId};
use crate::domain::routing::{AliasMatching, RoutingResult};
use crate::domain::segment::is_routable;

use super::repos::{ContentTreeProvider, ProviderError};

pub const DEFAULT_URL_ALIAS_PROPERTY: &str = "umbracoUrlAlias";

/// Router behaviour shared by every lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterOptions {
    /// Overrides the provider default when set.
    pub hide_top_level_node: Option<bool>,
    pub url_alias_property: String,
    pub alias_matching: AliasMatching,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            hide_top_level_node: None,
            url_alias_property: DEFAULT_URL_ALIAS_PROPERTY.to_string(),
            alias_matching: AliasMatching::default(),
        }
    }
}

/// Stateless route algorithms; nothing is cached here.
///
/// Alias lookups read property types from `content_types` when set, and from
/// the descriptor the provider attached to the node otherwise.
#[derive(Clone)]
pub struct ContentRouter {
    pub(super) provider: Arc<dyn ContentTreeProvider>,
    pub(super) options: RouterOptions,
    pub(super) content_types: Option<Arc<ContentTypeCache>>,
}

impl ContentRouter {
    pub fn new(provider: Arc<dyn ContentTreeProvider>, options: RouterOptions) -> Self {
        Self {
            provider,
            options,
            content_types: None,
        }
    }

    pub fn with_content_types(mut self, content_types: Arc<ContentTypeCache>) -> Self {
        self.content_types = Some(content_types);
        self
    }

    pub fn options(&self) -> &RouterOptions {
        &self.options
    }

    pub fn provider(&self) -> &Arc<dyn ContentTreeProvider> {
        &self.provider
    }

    /// Effective hide-top-level flag: explicit request, then options, then provider.
    pub fn hide_top_level_node(&self, requested: Option<bool>) -> bool {
        requested
            .or(self.options.hide_top_level_node)
            .unwrap_or_else(|| self.provider.hide_top_level_node())
    }

    #[instrument(skip(self))]
    pub fn route_to_node(
        &self,
        route: &str,
        preview: bool,
        hide_top_level_node: Option<bool>,
        culture: Option<&str>,
    ) -> Result<RoutingResult, ProviderError> {
        let hide = self.hide_top_level_node(hide_top_level_node);
        let route = route.trim().to_lowercase();
        let (root_id, path) = split_route(&route);
        let parts: Vec<&str> = path.split('/').filter(|part| !part.is_empty()).collect();

        let mut content = if root_id > 0 {
            match self.provider.node_by_id(root_id, preview)? {
                Some(start) => self.follow_route(start, &parts, culture, preview)?,
                None => None,
            }
        } else if parts.is_empty() {
            self.provider.root_nodes(preview)?.into_iter().next()
        } else {
            let first = if hide {
                self.first_grandchild_with_segment(parts[0], culture, preview)?
            } else {
                self.find_by_segment(self.provider.root_nodes(preview)?, parts[0], culture)?
            };
            match first {
                Some(start) => self.follow_route(start, &parts[1..], culture, preview)?,
                None => None,
            }
        };

        // `/foo` with hidden top-level nodes may still be a non-default top-level node.
        if content.is_none() && hide && parts.len() == 1 {
            content = self.find_by_segment(self.provider.root_nodes(preview)?, parts[0], culture)?;
        }

        let result = RoutingResult::from(content.map(|node| node.id));
        debug!(
            root_id,
            hide_top_level_node = hide,
            outcome = ?result,
            "Resolved route"
        );
        Ok(result)
    }

    /// Build the canonical route of a node, `None` when it cannot be routed.
    #[instrument(skip(self))]
    pub fn node_to_route(
        &self,
        id: NodeId,
        preview: bool,
        hide_top_level_node: Option<bool>,
        culture: Option<&str>,
    ) -> Result<Option<String>, ProviderError> {
        let Some(node) = self.provider.node_by_id(id, preview)? else {
            trace!(node_id = id, "Node not found");
            return Ok(None);
        };
        let hide = self.hide_top_level_node(hide_top_level_node);

        let mut segments = Vec::new();
        let mut current = Some(Arc::clone(&node));
        let mut has_domain = self.provider.has_assigned_domain(node.id)?;

        while !has_domain {
            let Some(step) = current.take() else {
                break;
            };
            match self.segment_of(&step, culture)? {
                Some(segment) => segments.push(segment),
                None => {
                    debug!(node_id = step.id, "Node has no url segment for culture");
                    return Ok(None);
                }
            }
            current = match step.parent_id {
                Some(parent_id) => self.provider.node_by_id(parent_id, preview)?,
                None => None,
            };
            if let Some(parent) = &current {
                has_domain = self.provider.has_assigned_domain(parent.id)?;
            }
        }

        if !has_domain && hide {
            self.hide_top_level_segment(&node, &mut segments, preview)?;
        }

        segments.reverse();
        let path = format!("/{}", segments.join("/"));
        let route = match current.filter(|_| has_domain) {
            Some(domain_root) => format!("{}{path}", domain_root.id),
            None => path,
        };
        trace!(node_id = id, route = %route, "Built route");
        Ok(Some(route))
    }

    fn hide_top_level_segment(
        &self,
        node: &ContentNode,
        segments: &mut Vec<String>,
        preview: bool,
    ) -> Result<(), ProviderError> {
        if node.is_root() {
            let default_root = self.provider.root_nodes(preview)?.into_iter().next();
            if default_root.is_some_and(|root| root.id == node.id) {
                segments.pop();
            }
        } else {
            segments.pop();
        }
        Ok(())
    }

    fn follow_route(
        &self,
        start: Arc<ContentNode>,
        parts: &[&str],
        culture: Option<&str>,
        preview: bool,
    ) -> Result<Option<Arc<ContentNode>>, ProviderError> {
        let mut current = start;
        for part in parts {
            let children = self.provider.children(&current, culture, preview)?;
            match self.find_by_segment(children, part, culture)? {
                Some(child) => current = child,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    fn first_grandchild_with_segment(
        &self,
        part: &str,
        culture: Option<&str>,
        preview: bool,
    ) -> Result<Option<Arc<ContentNode>>, ProviderError> {
        for root in self.provider.root_nodes(preview)? {
            let children = self.provider.children(&root, culture, preview)?;
            if let Some(found) = self.find_by_segment(children, part, culture)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    fn find_by_segment(
        &self,
        candidates: Vec<Arc<ContentNode>>,
        part: &str,
        culture: Option<&str>,
    ) -> Result<Option<Arc<ContentNode>>, ProviderError> {
        for candidate in candidates {
            let matches = self
                .segment_of(&candidate, culture)?
                .is_some_and(|segment| segment.to_lowercase() == part);
            if matches {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    /// Non-blank URL segment of a node.
    pub(super) fn segment_of(
        &self,
        node: &ContentNode,
        culture: Option<&str>,
    ) -> Result<Option<String>, ProviderError> {
        Ok(self
            .provider
            .url_segment(node, culture)?
            .filter(|segment| is_routable(Some(segment.as_str()))))
    }
}

/// Split `"123/a/b"` into `(123, "/a/b")`; routes without a numeric prefix get root id 0.
fn split_route(route: &str) -> (NodeId, &str) {
    let position = route.find('/').unwrap_or(route.len());
    let (prefix, path) = route.split_at(position);
    match prefix.parse::<NodeId>() {
        Ok(root_id) if root_id > 0 => (root_id, path),
        _ => (0, route),
    }
}
