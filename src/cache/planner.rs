//! Invalidation plan generation.
//!
//! Merges queued notifications into a single set of invalidation actions.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use super::events::{CacheEvent, CacheNotification};

/// Actions to execute after a batch of notifications.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct InvalidationPlan {
    /// Drop every cached type and property value.
    pub refresh_all: bool,
    /// Content type ids to evict from the type cache.
    pub content_types: BTreeSet<i32>,
    /// Data type ids whose dependent content types are evicted.
    pub data_types: BTreeSet<i32>,
    /// Clear the shared elements store.
    pub clear_elements: bool,
    /// Route memos of snapshots created from now on must not be reused.
    pub routes_changed: bool,
}

impl fmt::Display for InvalidationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InvalidationPlan {{ refresh_all: {}, content_types: {}, data_types: {}, \
             clear_elements: {}, routes_changed: {} }}",
            self.refresh_all,
            self.content_types.len(),
            self.data_types.len(),
            self.clear_elements,
            self.routes_changed,
        )
    }
}

impl InvalidationPlan {
    /// Merge events into a plan, ignoring duplicated event ids.
    pub fn from_events(events: Vec<CacheEvent>) -> Self {
        let mut plan = Self::default();
        let mut seen_ids = HashSet::new();

        for event in events.into_iter().filter(|event| seen_ids.insert(event.id)) {
            match event.notification {
                CacheNotification::ContentTypesChanged(ids) => {
                    plan.content_types.extend(ids);
                    plan.clear_elements = true;
                }
                CacheNotification::DataTypesChanged(ids) => {
                    plan.data_types.extend(ids);
                    plan.clear_elements = true;
                }
                CacheNotification::ContentChanged(_) => {
                    plan.clear_elements = true;
                    plan.routes_changed = true;
                }
                CacheNotification::DomainsChanged => {
                    plan.clear_elements = true;
                    plan.routes_changed = true;
                }
                CacheNotification::RefreshAll => {
                    plan.refresh_all = true;
                }
            }
        }

        if plan.refresh_all {
            plan.content_types.clear();
            plan.data_types.clear();
            plan.clear_elements = true;
            plan.routes_changed = true;
        }

        plan
    }

    pub fn is_empty(&self) -> bool {
        !self.refresh_all
            && self.content_types.is_empty()
            && self.data_types.is_empty()
            && !self.clear_elements
            && !self.routes_changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(notification: CacheNotification, epoch: u64) -> CacheEvent {
        CacheEvent::new(notification, epoch)
    }

    #[test]
    fn content_type_changes_are_merged() {
        let plan = InvalidationPlan::from_events(vec![
            event(CacheNotification::ContentTypesChanged(vec![1044, 1045]), 0),
            event(CacheNotification::ContentTypesChanged(vec![1045, 1050]), 1),
        ]);

        assert_eq!(
            plan.content_types.iter().copied().collect::<Vec<_>>(),
            vec![1044, 1045, 1050]
        );
        assert!(plan.clear_elements);
        assert!(!plan.routes_changed);
    }

    #[test]
    fn content_changes_clear_elements_and_routes() {
        let plan = InvalidationPlan::from_events(vec![event(
            CacheNotification::ContentChanged(vec![1046]),
            0,
        )]);

        assert!(plan.clear_elements);
        assert!(plan.routes_changed);
        assert!(plan.content_types.is_empty());
    }

    #[test]
    fn domain_changes_leave_type_cache_alone() {
        let plan =
            InvalidationPlan::from_events(vec![event(CacheNotification::DomainsChanged, 0)]);

        assert!(plan.routes_changed);
        assert!(plan.clear_elements);
        assert!(plan.content_types.is_empty());
        assert!(plan.data_types.is_empty());
    }

    #[test]
    fn refresh_all_supersedes_targeted_invalidation() {
        let plan = InvalidationPlan::from_events(vec![
            event(CacheNotification::DataTypesChanged(vec![-88]), 0),
            event(CacheNotification::RefreshAll, 1),
        ]);

        assert!(plan.refresh_all);
        assert!(plan.data_types.is_empty());
        assert!(plan.clear_elements);
    }

    #[test]
    fn duplicated_events_are_ignored() {
        let shared = event(CacheNotification::DataTypesChanged(vec![-88]), 0);
        let plan = InvalidationPlan::from_events(vec![shared.clone(), shared]);
        assert_eq!(plan.data_types.len(), 1);
    }

    #[test]
    fn empty_batch_yields_empty_plan() {
        let plan = InvalidationPlan::from_events(Vec::new());
        assert!(plan.is_empty());
        assert!(plan.to_string().contains("refresh_all: false"));
    }
}
