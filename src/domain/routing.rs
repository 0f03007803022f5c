//! Lookup outcomes and URL alias matching.

use serde::{Deserialize, Serialize};

use super::content::NodeId;

/// Outcome of a route or alias lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "outcome", content = "id", rename_all = "snake_case")]
pub enum RoutingResult {
    Found(NodeId),
    NotFound,
}

impl RoutingResult {
    /// Resolved node id, `0` when nothing was found.
    pub fn id(self) -> NodeId {
        match self {
            RoutingResult::Found(id) => id,
            RoutingResult::NotFound => 0,
        }
    }

    pub fn is_found(self) -> bool {
        matches!(self, RoutingResult::Found(_))
    }

    pub fn node_id(self) -> Option<NodeId> {
        match self {
            RoutingResult::Found(id) => Some(id),
            RoutingResult::NotFound => None,
        }
    }
}

impl From<Option<NodeId>> for RoutingResult {
    fn from(value: Option<NodeId>) -> Self {
        value.map_or(RoutingResult::NotFound, RoutingResult::Found)
    }
}

/// How a requested alias is compared with a stored alias list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AliasMatching {
    /// The bare alias may appear anywhere in the stored list.
    #[default]
    Substring,
    /// The alias must be a whole comma-delimited entry, with or without a leading slash.
    Delimited,
}

/// A normalised alias request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasQuery {
    bare: String,
    token: String,
    slashed_token: String,
    matching: AliasMatching,
}

impl AliasQuery {
    /// Returns `None` when nothing is left after trimming whitespace and leading slashes.
    pub fn new(alias: &str, matching: AliasMatching) -> Option<Self> {
        let bare = alias.trim().trim_start_matches('/').to_lowercase();
        if bare.is_empty() {
            return None;
        }
        Some(Self {
            token: format!(",{bare},"),
            slashed_token: format!(",/{bare},"),
            bare,
            matching,
        })
    }

    pub fn alias(&self) -> &str {
        &self.bare
    }

    /// Whether a stored comma-separated alias list contains this alias.
    ///
    /// Whitespace in the stored value is ignored and comparison is case-insensitive.
    pub fn matches(&self, stored: &str) -> bool {
        let compact: String = stored
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        if compact.is_empty() {
            return false;
        }
        let wrapped = format!(",{compact},");
        match self.matching {
            // Entry boundaries are ignored: a stored `barfoo` matches `foo`.
            AliasMatching::Substring => wrapped.contains(&self.bare),
            AliasMatching::Delimited => {
                wrapped.contains(&self.token) || wrapped.contains(&self.slashed_token)
            }
        }
    }
}
