//! In-memory content tree loaded from a JSON fixture.
//!
//! ```json
//! {
//!   "hide_top_level_node": false,
//!   "content_types": [
//!     { "id": 1044, "alias": "page", "kind": "content",
//!       "property_types": [{ "alias": "title", "data_type_id": -88, "cache_level": "element" }] }
//!   ],
//!   "domains": [{ "node_id": 1046, "name": "example.com", "culture": "en-us" }],
//!   "nodes": [
//!     { "id": 1046, "name": "Home", "content_type": "page", "properties": { "title": "Welcome" } },
//!     { "id": 1047, "parent_id": 1046, "name": "About Us", "content_type": "page", "published": false }
//!   ]
//! }
//! ```
//!
//! Nodes without segments get one derived from their name. Culture-variant
//! property values are objects keyed by culture. Unpublished nodes, and
//! everything below them, are only visible to preview reads.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::application::repos::{ContentTreeProvider, ContentTypeSource, ProviderError};
use crate::domain::content::{ContentNode, NodeId, PropertyData, culture_key};
use crate::domain::content_type::{ContentTypeDescriptor, ItemKind};
use crate::domain::segment::derive_url_segment;

use super::error::InfraError;

const INLINE_SOURCE: &str = "<inline>";

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TreeFixture {
    pub hide_top_level_node: bool,
    pub content_types: Vec<ContentTypeDescriptor>,
    pub domains: Vec<DomainFixture>,
    pub nodes: Vec<NodeFixture>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DomainFixture {
    pub node_id: NodeId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub culture: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeFixture {
    pub id: NodeId,
    #[serde(default)]
    pub key: Option<Uuid>,
    #[serde(default)]
    pub parent_id: Option<NodeId>,
    #[serde(default)]
    pub sort_order: Option<i32>,
    pub name: String,
    pub content_type: String,
    #[serde(default)]
    pub segment: Option<String>,
    #[serde(default)]
    pub segments: BTreeMap<String, String>,
    #[serde(default)]
    pub cultures: Vec<String>,
    #[serde(default = "default_published")]
    pub published: bool,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

fn default_published() -> bool {
    true
}

/// A domain assigned to a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domain {
    pub name: Option<String>,
    pub culture: Option<String>,
}

/// Content tree and schema store serving from memory.
#[derive(Debug, Default)]
pub struct MemoryContentTree {
    nodes: HashMap<NodeId, Arc<ContentNode>>,
    published: HashSet<NodeId>,
    children: HashMap<NodeId, Vec<NodeId>>,
    roots: Vec<NodeId>,
    domains: HashMap<NodeId, Vec<Domain>>,
    content_types: Vec<ContentTypeDescriptor>,
    hide_top_level_node: bool,
}

impl MemoryContentTree {
    pub fn from_path(path: &Path) -> Result<Self, InfraError> {
        let raw = std::fs::read_to_string(path)?;
        let fixture: TreeFixture = serde_json::from_str(&raw)
            .map_err(|err| InfraError::fixture(path, err.to_string()))?;
        let tree = Self::build(fixture, path)?;
        info!(
            path = %path.display(),
            nodes = tree.nodes.len(),
            content_types = tree.content_types.len(),
            "Loaded content tree fixture"
        );
        Ok(tree)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, InfraError> {
        let fixture: TreeFixture = serde_json::from_str(raw)
            .map_err(|err| InfraError::fixture(INLINE_SOURCE, err.to_string()))?;
        Self::build(fixture, Path::new(INLINE_SOURCE))
    }

    pub fn from_value(value: Value) -> Result<Self, InfraError> {
        let fixture: TreeFixture = serde_json::from_value(value)
            .map_err(|err| InfraError::fixture(INLINE_SOURCE, err.to_string()))?;
        Self::build(fixture, Path::new(INLINE_SOURCE))
    }

    pub fn from_fixture(fixture: TreeFixture) -> Result<Self, InfraError> {
        Self::build(fixture, Path::new(INLINE_SOURCE))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn domains(&self, id: NodeId) -> &[Domain] {
        self.domains.get(&id).map(Vec::as_slice).unwrap_or_default()
    }

    fn build(fixture: TreeFixture, origin: &Path) -> Result<Self, InfraError> {
        let TreeFixture {
            hide_top_level_node,
            content_types,
            domains,
            nodes,
        } = fixture;

        let shared_types: Vec<Arc<ContentTypeDescriptor>> =
            content_types.iter().cloned().map(Arc::new).collect();

        let parents: HashMap<NodeId, Option<NodeId>> =
            nodes.iter().map(|node| (node.id, node.parent_id)).collect();
        if parents.len() != nodes.len() {
            return Err(InfraError::fixture(origin, "duplicate node id"));
        }

        let mut tree = Self {
            hide_top_level_node,
            content_types,
            ..Self::default()
        };

        let mut ordered: Vec<(NodeId, Option<NodeId>, i32)> = Vec::with_capacity(nodes.len());
        let publish_flags: HashMap<NodeId, bool> =
            nodes.iter().map(|node| (node.id, node.published)).collect();

        for (index, fixture) in nodes.into_iter().enumerate() {
            let level = depth_of(fixture.id, &parents, origin)?;
            let content_type = shared_types
                .iter()
                .find(|candidate| candidate.alias.eq_ignore_ascii_case(&fixture.content_type))
                .cloned()
                .ok_or_else(|| {
                    InfraError::fixture(
                        origin,
                        format!(
                            "node {} uses unknown content type `{}`",
                            fixture.id, fixture.content_type
                        ),
                    )
                })?;

            let sort_order = fixture
                .sort_order
                .unwrap_or_else(|| i32::try_from(index).unwrap_or(i32::MAX));
            ordered.push((fixture.id, fixture.parent_id, sort_order));

            if is_published(fixture.id, &parents, &publish_flags) {
                tree.published.insert(fixture.id);
            }

            let node = build_node(fixture, content_type, level, sort_order, origin)?;
            tree.nodes.insert(node.id, Arc::new(node));
        }

        ordered.sort_by_key(|(_, _, sort_order)| *sort_order);
        for (id, parent_id, _) in ordered {
            match parent_id {
                Some(parent_id) => tree.children.entry(parent_id).or_default().push(id),
                None => tree.roots.push(id),
            }
        }

        for domain in domains {
            if !tree.nodes.contains_key(&domain.node_id) {
                return Err(InfraError::fixture(
                    origin,
                    format!("domain assigned to unknown node {}", domain.node_id),
                ));
            }
            tree.domains.entry(domain.node_id).or_default().push(Domain {
                name: domain.name,
                culture: domain.culture.map(|culture| culture_key(Some(&culture))),
            });
        }

        debug!(
            roots = tree.roots.len(),
            domains = tree.domains.len(),
            "Built in-memory content tree"
        );
        Ok(tree)
    }

    fn visible(&self, id: NodeId, preview: bool) -> Option<Arc<ContentNode>> {
        if !preview && !self.published.contains(&id) {
            return None;
        }
        self.nodes.get(&id).cloned()
    }
}

fn depth_of(
    id: NodeId,
    parents: &HashMap<NodeId, Option<NodeId>>,
    origin: &Path,
) -> Result<u32, InfraError> {
    let mut level = 1_u32;
    let mut current = id;
    while let Some(Some(parent_id)) = parents.get(&current) {
        if !parents.contains_key(parent_id) {
            return Err(InfraError::fixture(
                origin,
                format!("node {current} references unknown parent {parent_id}"),
            ));
        }
        level += 1;
        if level as usize > parents.len() {
            return Err(InfraError::fixture(
                origin,
                format!("node {id} is part of a parent cycle"),
            ));
        }
        current = *parent_id;
    }
    Ok(level)
}

fn is_published(
    id: NodeId,
    parents: &HashMap<NodeId, Option<NodeId>>,
    flags: &HashMap<NodeId, bool>,
) -> bool {
    let mut current = Some(id);
    while let Some(node_id) = current {
        if !flags.get(&node_id).copied().unwrap_or(false) {
            return false;
        }
        current = parents.get(&node_id).copied().flatten();
    }
    true
}

fn build_node(
    fixture: NodeFixture,
    content_type: Arc<ContentTypeDescriptor>,
    level: u32,
    sort_order: i32,
    origin: &Path,
) -> Result<ContentNode, InfraError> {
    let mut url_segments: BTreeMap<String, String> = fixture
        .segments
        .into_iter()
        .map(|(culture, segment)| (culture_key(Some(&culture)), segment))
        .collect();
    if let Some(segment) = fixture.segment {
        url_segments.insert(culture_key(None), segment);
    }
    if url_segments.is_empty() {
        let derived = derive_url_segment(&fixture.name).map_err(|err| {
            InfraError::fixture(origin, format!("node {}: {err}", fixture.id))
        })?;
        url_segments.insert(culture_key(None), derived);
    }

    let mut properties = BTreeMap::new();
    for (alias, value) in fixture.properties {
        let varies = content_type
            .property_type(&alias)
            .is_some_and(|property_type| property_type.varies_by_culture);
        let data = if varies {
            let Value::Object(per_culture) = value else {
                return Err(InfraError::fixture(
                    origin,
                    format!(
                        "node {}: culture-variant property `{alias}` must be an object keyed by culture",
                        fixture.id
                    ),
                ));
            };
            let mut data = PropertyData::default();
            for (culture, value) in per_culture {
                data.set(Some(&culture), value);
            }
            data
        } else {
            PropertyData::invariant(value)
        };
        properties.insert(alias, data);
    }

    Ok(ContentNode {
        id: fixture.id,
        key: fixture.key.unwrap_or_else(Uuid::new_v4),
        parent_id: fixture.parent_id,
        level,
        sort_order,
        name: fixture.name,
        content_type,
        url_segments,
        cultures: fixture
            .cultures
            .iter()
            .map(|culture| culture_key(Some(culture)))
            .collect(),
        properties,
    })
}

impl ContentTreeProvider for MemoryContentTree {
    fn node_by_id(&self, id: NodeId, preview: bool) -> Result<Option<Arc<ContentNode>>, ProviderError> {
        Ok(self.visible(id, preview))
    }

    fn root_nodes(&self, preview: bool) -> Result<Vec<Arc<ContentNode>>, ProviderError> {
        Ok(self
            .roots
            .iter()
            .filter_map(|id| self.visible(*id, preview))
            .collect())
    }

    fn children(
        &self,
        node: &ContentNode,
        culture: Option<&str>,
        preview: bool,
    ) -> Result<Vec<Arc<ContentNode>>, ProviderError> {
        let Some(ids) = self.children.get(&node.id) else {
            return Ok(Vec::new());
        };
        Ok(ids
            .iter()
            .filter_map(|id| self.visible(*id, preview))
            .filter(|child| {
                culture.is_none() || child.cultures.is_empty() || child.has_culture(culture)
            })
            .collect())
    }

    fn url_segment(
        &self,
        node: &ContentNode,
        culture: Option<&str>,
    ) -> Result<Option<String>, ProviderError> {
        // Variant nodes are not routable in cultures they are not published in.
        if culture.is_some() && !node.cultures.is_empty() && !node.has_culture(culture) {
            return Ok(None);
        }
        Ok(node.url_segment(culture).map(str::to_string))
    }

    fn has_assigned_domain(&self, id: NodeId) -> Result<bool, ProviderError> {
        Ok(self.domains.contains_key(&id))
    }

    fn hide_top_level_node(&self) -> bool {
        self.hide_top_level_node
    }
}

impl ContentTypeSource for MemoryContentTree {
    fn by_alias(
        &self,
        kind: ItemKind,
        alias: &str,
    ) -> Result<Option<ContentTypeDescriptor>, ProviderError> {
        Ok(self
            .content_types
            .iter()
            .find(|candidate| candidate.kind == kind && candidate.alias.eq_ignore_ascii_case(alias))
            .cloned())
    }

    fn by_id(&self, kind: ItemKind, id: i32) -> Result<Option<ContentTypeDescriptor>, ProviderError> {
        Ok(self
            .content_types
            .iter()
            .find(|candidate| candidate.kind == kind && candidate.id == id)
            .cloned())
    }
}
