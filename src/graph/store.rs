//! In-memory graph store
//!
//! Holds the materialized resource and edge tables behind a single lock.
//! Reads are open to the whole crate; writes are crate-private so that the
//! reconciler stays the only writer.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::models::{GraphEdge, GraphResource, ResourceKind};

struct StoreInner {
    resources: HashMap<String, GraphResource>,
    edges: Vec<GraphEdge>,
}

/// Thread-safe store of the materialized graph
#[derive(Clone)]
pub struct GraphStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(StoreInner {
                resources: HashMap::new(),
                edges: Vec::new(),
            })),
        }
    }

    /// Get a resource by global id
    pub fn get(&self, global_id: &str) -> Option<GraphResource> {
        let state = self.inner.read().unwrap();
        state.resources.get(global_id).cloned()
    }

    /// All resources of one kind
    pub fn resources_of_kind(&self, kind: ResourceKind) -> Vec<GraphResource> {
        let state = self.inner.read().unwrap();
        state
            .resources
            .values()
            .filter(|r| r.kind == kind)
            .cloned()
            .collect()
    }

    /// Every stored resource
    pub fn all_resources(&self) -> Vec<GraphResource> {
        let state = self.inner.read().unwrap();
        state.resources.values().cloned().collect()
    }

    /// Direct child ids of a node, deduplicated, in edge insertion order
    pub fn children_ids(&self, global_id: &str) -> Vec<String> {
        let state = self.inner.read().unwrap();
        let mut seen = HashSet::new();
        state
            .edges
            .iter()
            .filter(|e| e.start_id == global_id)
            .filter(|e| seen.insert(e.end_id.clone()))
            .map(|e| e.end_id.clone())
            .collect()
    }

    /// Ids of nodes with an edge into the given node
    pub fn parent_ids(&self, global_id: &str) -> Vec<String> {
        let state = self.inner.read().unwrap();
        let mut seen = HashSet::new();
        state
            .edges
            .iter()
            .filter(|e| e.end_id == global_id)
            .filter(|e| seen.insert(e.start_id.clone()))
            .map(|e| e.start_id.clone())
            .collect()
    }

    /// Whether any edge leaves the given node (i.e. it has been expanded)
    pub fn has_outgoing_edges(&self, global_id: &str) -> bool {
        let state = self.inner.read().unwrap();
        state.edges.iter().any(|e| e.start_id == global_id)
    }

    pub fn resource_count(&self) -> usize {
        let state = self.inner.read().unwrap();
        state.resources.len()
    }

    /// Insert or refresh a resource from a partial observation.
    ///
    /// `created_at` is immutable once set. An incoming record with no path or
    /// application placement does not clear an existing one; a lazy expansion
    /// only computes placement for the branch it walked.
    pub(crate) fn upsert(&self, mut resource: GraphResource) {
        let mut state = self.inner.write().unwrap();
        if let Some(existing) = state.resources.get(&resource.global_id) {
            if existing.created_at.is_some() {
                resource.created_at = existing.created_at;
            }
            if resource.app_path.is_none() {
                resource.app_path = existing.app_path.clone();
            }
            if resource.cluster_path.is_none() {
                resource.cluster_path = existing.cluster_path.clone();
            }
            if resource.application.is_none() {
                resource.application = existing.application.clone();
            }
        }
        state.resources.insert(resource.global_id.clone(), resource);
    }

    /// Insert or refresh a resource from a full crawl, where the incoming
    /// placement is authoritative: absent paths mean the resource really is
    /// unplaced now. Only `created_at` survives from the prior record.
    pub(crate) fn upsert_placed(&self, mut resource: GraphResource) {
        let mut state = self.inner.write().unwrap();
        if let Some(existing) = state.resources.get(&resource.global_id)
            && existing.created_at.is_some()
        {
            resource.created_at = existing.created_at;
        }
        state.resources.insert(resource.global_id.clone(), resource);
    }

    pub(crate) fn insert_edge(&self, edge: GraphEdge) {
        let mut state = self.inner.write().unwrap();
        state.edges.push(edge);
    }

    /// Drop every edge the predicate rejects
    pub(crate) fn retain_edges<F: FnMut(&GraphEdge) -> bool>(&self, keep: F) {
        let mut state = self.inner.write().unwrap();
        state.edges.retain(keep);
    }

    /// Stamp the application-hierarchy placement onto an existing resource
    pub(crate) fn set_app_placement(
        &self,
        global_id: &str,
        app_path: String,
        application: Option<String>,
    ) {
        let mut state = self.inner.write().unwrap();
        if let Some(resource) = state.resources.get_mut(global_id) {
            resource.app_path = Some(app_path);
            if application.is_some() {
                resource.application = application;
            }
        }
    }

    /// Remove a resource and cascade to descendants left with no other parent.
    ///
    /// All edges touching a removed resource are dropped. A child reachable
    /// from a second surviving parent stays. Returns the number of resources
    /// removed.
    pub(crate) fn remove_cascade(&self, global_id: &str) -> usize {
        let mut state = self.inner.write().unwrap();
        state.remove_cascade(global_id)
    }

    /// Remove every resource whose `cluster` field names the given cluster
    pub(crate) fn remove_cluster_residents(&self, cluster: &str) -> usize {
        let ids: Vec<String> = {
            let state = self.inner.read().unwrap();
            state
                .resources
                .values()
                .filter(|r| r.cluster == cluster)
                .map(|r| r.global_id.clone())
                .collect()
        };
        let mut state = self.inner.write().unwrap();
        let mut removed = 0;
        for id in ids {
            removed += state.remove_cascade(&id);
        }
        removed
    }
}

impl StoreInner {
    fn remove_cascade(&mut self, global_id: &str) -> usize {
        if self.resources.remove(global_id).is_none() {
            // Still drop dangling edges, but nothing cascades
            self.edges
                .retain(|e| e.start_id != global_id && e.end_id != global_id);
            return 0;
        }

        let mut seen = HashSet::new();
        let children: Vec<String> = self
            .edges
            .iter()
            .filter(|e| e.start_id == global_id)
            .filter(|e| seen.insert(e.end_id.clone()))
            .map(|e| e.end_id.clone())
            .collect();

        self.edges
            .retain(|e| e.start_id != global_id && e.end_id != global_id);

        let mut removed = 1;
        for child in children {
            let still_parented = self.edges.iter().any(|e| e.end_id == child);
            if !still_parented {
                removed += self.remove_cascade(&child);
            }
        }
        removed
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}
