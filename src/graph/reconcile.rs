//! Graph reconciliation
//!
//! Converges the store toward one observed batch at a time. Each call covers a
//! single kind and an explicit scope; anything of that kind inside the scope
//! that was not observed is retired, with deletion cascading to descendants
//! that lose their last parent. The scope is how partial visibility stays
//! safe: clusters that did not respond this cycle are simply not in scope, so
//! their resources are never treated as stale.

use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use crate::graph::store::GraphStore;
use crate::models::{GraphEdge, GraphResource, ResourceKind};

/// Which slice of the store one reconciliation pass is allowed to retire from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileScope {
    /// Everything of the kind on the named clusters (full crawl)
    Clusters(BTreeSet<String>),
    /// Everything of the kind in one namespace on one cluster
    Namespace { cluster: String, namespace: String },
    /// The current children of one node (lazy expansion)
    ChildrenOf(String),
}

impl ReconcileScope {
    /// Scope for a single cluster
    pub fn cluster(name: impl Into<String>) -> Self {
        ReconcileScope::Clusters(BTreeSet::from([name.into()]))
    }
}

/// Counts from one reconciliation pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub upserted: usize,
    /// Resources removed, cascaded descendants included
    pub retired: usize,
}

/// Application-hierarchy placement for an already-stored resource
#[derive(Debug, Clone)]
pub struct AppPlacement {
    pub global_id: String,
    pub app_path: String,
    pub application: Option<String>,
}

/// Sole writer of the graph store
#[derive(Clone)]
pub struct Reconciler {
    store: GraphStore,
}

impl Reconciler {
    pub fn new(store: GraphStore) -> Self {
        Self { store }
    }

    /// Converge one kind within one scope onto the observed batch.
    ///
    /// Observed resources are upserted, in-scope resources of the kind that
    /// were not observed are cascade-retired, and the incoming edges of the
    /// observed resources are replaced by `edges`. Running the same batch
    /// twice leaves the store unchanged.
    pub fn reconcile_kind(
        &self,
        kind: ResourceKind,
        scope: &ReconcileScope,
        observed: Vec<GraphResource>,
        edges: Vec<GraphEdge>,
    ) -> ReconcileOutcome {
        let stale_candidates = self.stale_candidates(kind, scope);
        let observed_ids: HashSet<String> =
            observed.iter().map(|r| r.global_id.clone()).collect();

        // A full crawl recomputes placement for everything it observed, so
        // its records overwrite paths wholesale; partial scopes only know
        // about the branch they walked and must not clear the rest.
        let mut outcome = ReconcileOutcome::default();
        for resource in observed {
            match scope {
                ReconcileScope::Clusters(_) => self.store.upsert_placed(resource),
                _ => self.store.upsert(resource),
            }
            outcome.upserted += 1;
        }

        for id in &stale_candidates {
            if !observed_ids.contains(id) {
                let removed = self.store.remove_cascade(id);
                debug!(kind = %kind, id = %id, removed, "retired stale resource");
                outcome.retired += removed;
            }
        }

        // Edge batches are grouped by child kind, so the batch is the full
        // incoming edge set for the observed resources; replace rather than
        // accumulate. Lazy expansion only sees edges from the expanded node
        // and must not disturb edges owned by other parents.
        match scope {
            ReconcileScope::ChildrenOf(parent) => {
                self.store
                    .retain_edges(|e| !(e.start_id == *parent && observed_ids.contains(&e.end_id)));
            }
            _ => {
                self.store.retain_edges(|e| !observed_ids.contains(&e.end_id));
            }
        }
        for edge in edges {
            self.store.insert_edge(edge);
        }

        outcome
    }

    /// Make sure the synthetic root node exists. Both hierarchies hang off it.
    pub fn ensure_root(&self) {
        use crate::graph::identity::ROOT_ID;
        if self.store.get(ROOT_ID).is_none() {
            self.store
                .upsert(GraphResource::new(ROOT_ID, ResourceKind::Root, ROOT_ID));
        }
    }

    /// Stamp app-hierarchy placement onto resources reconciled earlier in the
    /// cycle. Deployed workloads get their app_path only after Deployables
    /// are resolved, which happens after the workloads themselves are stored.
    pub fn apply_app_placement(&self, updates: Vec<AppPlacement>) {
        for update in updates {
            self.store
                .set_app_placement(&update.global_id, update.app_path, update.application);
        }
    }

    /// Retire a cluster that disappeared from the kubeconfig.
    ///
    /// Cascades from the synthetic cluster node, then sweeps anything still
    /// carrying the cluster name (app-hierarchy residents are reachable from
    /// their Application, not from the cluster node).
    pub fn retire_cluster(&self, cluster: &str) -> usize {
        let mut removed = self.store.remove_cascade(cluster);
        removed += self.store.remove_cluster_residents(cluster);
        debug!(cluster, removed, "retired cluster");
        removed
    }

    fn stale_candidates(&self, kind: ResourceKind, scope: &ReconcileScope) -> Vec<String> {
        match scope {
            ReconcileScope::Clusters(clusters) => self
                .store
                .resources_of_kind(kind)
                .into_iter()
                .filter(|r| clusters.contains(&r.cluster))
                .map(|r| r.global_id)
                .collect(),
            ReconcileScope::Namespace { cluster, namespace } => self
                .store
                .resources_of_kind(kind)
                .into_iter()
                .filter(|r| &r.cluster == cluster && &r.namespace == namespace)
                .map(|r| r.global_id)
                .collect(),
            ReconcileScope::ChildrenOf(parent) => self
                .store
                .children_ids(parent)
                .into_iter()
                .filter(|id| {
                    self.store
                        .get(id)
                        .map(|r| r.kind == kind)
                        .unwrap_or(false)
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(id: &str, kind: ResourceKind, cluster: &str) -> GraphResource {
        let mut r = GraphResource::new(id, kind, id);
        r.cluster = cluster.to_string();
        r
    }

    fn pod_edge(start: &str, end: &str) -> GraphEdge {
        GraphEdge::new(start, end, ResourceKind::ReplicaSet, ResourceKind::Pod)
    }

    #[test]
    fn test_unobserved_in_scope_resource_is_retired() {
        let store = GraphStore::new();
        let reconciler = Reconciler::new(store.clone());
        let scope = ReconcileScope::cluster("c1");

        reconciler.reconcile_kind(
            ResourceKind::Pod,
            &scope,
            vec![
                resource("c1_p1", ResourceKind::Pod, "c1"),
                resource("c1_p2", ResourceKind::Pod, "c1"),
            ],
            vec![],
        );

        let outcome = reconciler.reconcile_kind(
            ResourceKind::Pod,
            &scope,
            vec![resource("c1_p1", ResourceKind::Pod, "c1")],
            vec![],
        );
        assert_eq!(outcome.retired, 1);
        assert!(store.get("c1_p1").is_some());
        assert!(store.get("c1_p2").is_none());
    }

    #[test]
    fn test_out_of_scope_cluster_untouched() {
        let store = GraphStore::new();
        let reconciler = Reconciler::new(store.clone());

        reconciler.reconcile_kind(
            ResourceKind::Pod,
            &ReconcileScope::cluster("c2"),
            vec![resource("c2_p1", ResourceKind::Pod, "c2")],
            vec![],
        );

        // Empty observation for c1 must not retire c2's pod
        let outcome = reconciler.reconcile_kind(
            ResourceKind::Pod,
            &ReconcileScope::cluster("c1"),
            vec![],
            vec![],
        );
        assert_eq!(outcome.retired, 0);
        assert!(store.get("c2_p1").is_some());
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let store = GraphStore::new();
        let reconciler = Reconciler::new(store.clone());
        let scope = ReconcileScope::cluster("c1");
        let batch = || {
            (
                vec![resource("c1_p1", ResourceKind::Pod, "c1")],
                vec![pod_edge("c1_rs", "c1_p1")],
            )
        };

        let (resources, edges) = batch();
        reconciler.reconcile_kind(ResourceKind::Pod, &scope, resources, edges);
        let first_children = store.children_ids("c1_rs");

        let (resources, edges) = batch();
        let outcome = reconciler.reconcile_kind(ResourceKind::Pod, &scope, resources, edges);
        assert_eq!(outcome.retired, 0);
        assert_eq!(store.children_ids("c1_rs"), first_children);
        assert_eq!(store.resource_count(), 1);
    }

    #[test]
    fn test_edges_replaced_when_owner_changes() {
        let store = GraphStore::new();
        let reconciler = Reconciler::new(store.clone());
        let scope = ReconcileScope::cluster("c1");

        reconciler.reconcile_kind(
            ResourceKind::Pod,
            &scope,
            vec![resource("c1_p1", ResourceKind::Pod, "c1")],
            vec![pod_edge("c1_rs_old", "c1_p1")],
        );
        reconciler.reconcile_kind(
            ResourceKind::Pod,
            &scope,
            vec![resource("c1_p1", ResourceKind::Pod, "c1")],
            vec![pod_edge("c1_rs_new", "c1_p1")],
        );

        assert_eq!(store.parent_ids("c1_p1"), vec!["c1_rs_new"]);
    }

    #[test]
    fn test_children_of_scope_only_retires_prior_children() {
        let store = GraphStore::new();
        let reconciler = Reconciler::new(store.clone());

        // Full crawl stored two pods under the replicaset
        reconciler.reconcile_kind(
            ResourceKind::Pod,
            &ReconcileScope::cluster("c1"),
            vec![
                resource("c1_p1", ResourceKind::Pod, "c1"),
                resource("c1_p2", ResourceKind::Pod, "c1"),
            ],
            vec![pod_edge("c1_rs", "c1_p1"), pod_edge("c1_rs", "c1_p2")],
        );

        // Expanding the replicaset again sees only p1
        let outcome = reconciler.reconcile_kind(
            ResourceKind::Pod,
            &ReconcileScope::ChildrenOf("c1_rs".to_string()),
            vec![resource("c1_p1", ResourceKind::Pod, "c1")],
            vec![pod_edge("c1_rs", "c1_p1")],
        );
        assert_eq!(outcome.retired, 1);
        assert!(store.get("c1_p2").is_none());
        assert_eq!(store.children_ids("c1_rs"), vec!["c1_p1"]);
    }

    #[test]
    fn test_children_of_scope_keeps_other_parents_edges() {
        let store = GraphStore::new();
        let reconciler = Reconciler::new(store.clone());

        reconciler.reconcile_kind(
            ResourceKind::Pod,
            &ReconcileScope::cluster("c1"),
            vec![resource("c1_p1", ResourceKind::Pod, "c1")],
            vec![pod_edge("c1_rs", "c1_p1"), pod_edge("c1_svc", "c1_p1")],
        );

        // Lazy expansion of the service re-observes the pod; the owner edge
        // from the replicaset must survive.
        reconciler.reconcile_kind(
            ResourceKind::Pod,
            &ReconcileScope::ChildrenOf("c1_svc".to_string()),
            vec![resource("c1_p1", ResourceKind::Pod, "c1")],
            vec![pod_edge("c1_svc", "c1_p1")],
        );

        let mut parents = store.parent_ids("c1_p1");
        parents.sort();
        assert_eq!(parents, vec!["c1_rs", "c1_svc"]);
    }

    #[test]
    fn test_full_crawl_clears_placement_partial_scope_preserves_it() {
        let store = GraphStore::new();
        let reconciler = Reconciler::new(store.clone());
        let scope = ReconcileScope::cluster("c1");

        let mut placed = resource("c1_p1", ResourceKind::Pod, "c1");
        placed.cluster_path = Some("/root/c1/c1_ns/c1_rs/".to_string());
        reconciler.reconcile_kind(ResourceKind::Pod, &scope, vec![placed], vec![]);

        // A service expansion re-observes the pod without placement
        reconciler.reconcile_kind(
            ResourceKind::Pod,
            &ReconcileScope::ChildrenOf("c1_svc".to_string()),
            vec![resource("c1_p1", ResourceKind::Pod, "c1")],
            vec![pod_edge("c1_svc", "c1_p1")],
        );
        assert!(store.get("c1_p1").unwrap().cluster_path.is_some());

        // The next full crawl finds it unplaced; that sticks
        reconciler.reconcile_kind(
            ResourceKind::Pod,
            &scope,
            vec![resource("c1_p1", ResourceKind::Pod, "c1")],
            vec![],
        );
        assert_eq!(store.get("c1_p1").unwrap().cluster_path, None);
    }

    #[test]
    fn test_apply_app_placement() {
        let store = GraphStore::new();
        let reconciler = Reconciler::new(store.clone());
        store.upsert(resource("c1_d1", ResourceKind::Deployment, "c1"));

        reconciler.apply_app_placement(vec![AppPlacement {
            global_id: "c1_d1".to_string(),
            app_path: "/root/c1_app/c1_dpb/".to_string(),
            application: Some("shop".to_string()),
        }]);

        let got = store.get("c1_d1").unwrap();
        assert_eq!(got.app_path.as_deref(), Some("/root/c1_app/c1_dpb/"));
        assert_eq!(got.application.as_deref(), Some("shop"));
    }

    #[test]
    fn test_retire_cluster_sweeps_residents() {
        let store = GraphStore::new();
        let reconciler = Reconciler::new(store.clone());

        let mut cluster = resource("c1", ResourceKind::Cluster, "c1");
        cluster.namespace = String::new();
        store.upsert(cluster);
        store.upsert(resource("c1_ns", ResourceKind::Namespace, "c1"));
        store.upsert(resource("c1_app", ResourceKind::Application, "c1"));
        store.insert_edge(GraphEdge::new(
            "c1",
            "c1_ns",
            ResourceKind::Cluster,
            ResourceKind::Namespace,
        ));
        // c1_app hangs off the root in the app hierarchy, not off c1

        let removed = reconciler.retire_cluster("c1");
        assert_eq!(removed, 3);
        assert_eq!(store.resource_count(), 0);
    }
}
