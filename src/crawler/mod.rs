//! Crawl orchestration
//!
//! One crawl cycle lists every reachable cluster, infers the relationships
//! between everything it saw, assigns paths in both hierarchies, and hands the
//! result to the reconciler kind by kind in dependency order. Clusters that
//! fail the liveness probe (or fail mid-listing) are left entirely alone for
//! the cycle, so an outage never looks like a mass deletion.
//!
//! Besides the eager full crawl there is lazy per-node expansion: `expand`
//! fetches only the direct children of one node, used by browsers drilling
//! into a part of the graph that has not been crawled yet.

pub mod relations;

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::graph::reconcile::{AppPlacement, ReconcileOutcome, ReconcileScope, Reconciler};
use crate::graph::store::GraphStore;
use crate::graph::{ROOT_PATH, ancestor_ids, assign_paths, child_path, cluster_id, global_id};
use crate::kube::raw::{Deployer, RawExtras, RawResource};
use crate::kube::{ClusterApi, ClusterRegistry, ListError};
use crate::models::{GraphEdge, GraphResource, Hierarchy, ResourceKind};

/// Summary of one full crawl cycle
#[derive(Debug, Default, Clone)]
pub struct CrawlReport {
    pub reachable: Vec<String>,
    pub unreachable: Vec<String>,
    pub upserted: usize,
    pub retired: usize,
}

/// Everything listed from one namespace of one cluster
struct NamespaceInventory {
    namespace: RawResource,
    applications: Vec<RawResource>,
    deployables: Vec<RawResource>,
    deployments: Vec<RawResource>,
    services: Vec<RawResource>,
    daemon_sets: Vec<RawResource>,
    stateful_sets: Vec<RawResource>,
    jobs: Vec<RawResource>,
    replica_sets: Vec<RawResource>,
    pods: Vec<RawResource>,
}

/// Everything listed from one reachable cluster
struct CrawledCluster {
    name: String,
    namespaces: Vec<NamespaceInventory>,
}

/// Per-kind batches ready for reconciliation
#[derive(Default)]
struct Materialized {
    resources: HashMap<ResourceKind, Vec<GraphResource>>,
    /// Keyed by the child kind of the edge
    edges: HashMap<ResourceKind, Vec<GraphEdge>>,
}

/// Drives full crawls and lazy expansion against a cluster registry
pub struct CrawlOrchestrator {
    registry: ClusterRegistry,
    store: GraphStore,
    reconciler: Reconciler,
    probe_timeout: Duration,
    deployables_annotation: String,
}

impl CrawlOrchestrator {
    pub fn new(
        registry: ClusterRegistry,
        store: GraphStore,
        probe_timeout: Duration,
        deployables_annotation: impl Into<String>,
    ) -> Self {
        let reconciler = Reconciler::new(store.clone());
        Self {
            registry,
            store,
            reconciler,
            probe_timeout,
            deployables_annotation: deployables_annotation.into(),
        }
    }

    /// Run one full crawl cycle
    pub async fn run_cycle(&self) -> Result<CrawlReport> {
        let registered: BTreeSet<String> = self.registry.names().into_iter().collect();

        // Clusters that disappeared from the kubeconfig are gone for good
        for cluster_node in self.store.resources_of_kind(ResourceKind::Cluster) {
            if !registered.contains(&cluster_node.global_id) {
                self.reconciler.retire_cluster(&cluster_node.global_id);
            }
        }

        // Liveness probe doubles as the namespace listing
        let probes = self.registry.clusters().iter().map(|api| {
            let api = api.clone();
            async move {
                let listed = match tokio::time::timeout(self.probe_timeout, api.list_namespaces())
                    .await
                {
                    Ok(listed) => listed,
                    Err(_) => Err(ListError::Timeout),
                };
                match listed {
                    Ok(namespaces) => Ok((api, namespaces)),
                    Err(err) => {
                        warn!(cluster = %api.name(), %err, "cluster unreachable, skipping this cycle");
                        Err(api.name().to_string())
                    }
                }
            }
        });

        let mut live: Vec<(Arc<dyn ClusterApi>, Vec<RawResource>)> = Vec::new();
        let mut unreachable: Vec<String> = Vec::new();
        for outcome in join_all(probes).await {
            match outcome {
                Ok(pair) => live.push(pair),
                Err(name) => unreachable.push(name),
            }
        }

        // One concurrent fetch task per live cluster, sequential per kind inside
        let fetches = live.into_iter().map(|(api, namespaces)| async move {
            let name = api.name().to_string();
            match fetch_cluster(api, namespaces).await {
                Ok(crawled) => Ok(crawled),
                Err(err) => {
                    warn!(cluster = %name, %err, "listing failed mid-crawl, skipping this cycle");
                    Err(name)
                }
            }
        });
        let mut crawled: Vec<CrawledCluster> = Vec::new();
        for outcome in join_all(fetches).await {
            match outcome {
                Ok(cluster) => crawled.push(cluster),
                Err(name) => unreachable.push(name),
            }
        }
        crawled.sort_by(|a, b| a.name.cmp(&b.name));

        let reachable: Vec<String> = crawled.iter().map(|c| c.name.clone()).collect();
        let mut materialized = materialize(&crawled);

        // Unreachable clusters keep a bare cluster node; their contents are
        // out of scope below and therefore untouched.
        let cluster_batch = materialized
            .resources
            .entry(ResourceKind::Cluster)
            .or_default();
        for name in &unreachable {
            if registered.contains(name) {
                cluster_batch.push(cluster_node(name));
            }
        }

        let reachable_scope =
            ReconcileScope::Clusters(reachable.iter().cloned().collect::<BTreeSet<_>>());
        let all_scope = ReconcileScope::Clusters(registered);

        self.reconciler.ensure_root();
        let mut report = CrawlReport {
            reachable,
            unreachable,
            ..Default::default()
        };
        for kind in ResourceKind::reconcile_order() {
            let resources = materialized.resources.remove(kind).unwrap_or_default();
            let edges = materialized.edges.remove(kind).unwrap_or_default();
            let scope = if *kind == ResourceKind::Cluster {
                &all_scope
            } else {
                &reachable_scope
            };
            let outcome = self.reconciler.reconcile_kind(*kind, scope, resources, edges);
            report.upserted += outcome.upserted;
            report.retired += outcome.retired;
        }

        info!(
            reachable = report.reachable.len(),
            unreachable = report.unreachable.len(),
            upserted = report.upserted,
            retired = report.retired,
            "crawl cycle complete"
        );
        Ok(report)
    }

    /// Fetch and reconcile the direct children of one node.
    ///
    /// No-op when the node already has outgoing edges; the full crawl owns
    /// refreshing expanded parts of the graph.
    pub async fn expand(&self, global_id: &str) -> Result<ReconcileOutcome> {
        let Some(node) = self.store.get(global_id) else {
            bail!("unknown resource: {}", global_id);
        };
        if self.store.has_outgoing_edges(global_id) {
            debug!(id = %global_id, "already expanded");
            return Ok(ReconcileOutcome::default());
        }

        match node.kind {
            ResourceKind::Cluster => self.expand_cluster(&node).await,
            ResourceKind::Namespace => self.expand_namespace(&node).await,
            ResourceKind::Application => self.expand_application(&node).await,
            ResourceKind::Deployable => self.expand_deployable(&node).await,
            ResourceKind::Deployment => self.expand_deployment(&node).await,
            ResourceKind::ReplicaSet
            | ResourceKind::DaemonSet
            | ResourceKind::StatefulSet
            | ResourceKind::Job => self.expand_controller(&node).await,
            ResourceKind::Service => self.expand_service(&node).await,
            // Leaves
            ResourceKind::Root | ResourceKind::Pod | ResourceKind::Helm => {
                Ok(ReconcileOutcome::default())
            }
        }
    }

    fn api_for(&self, cluster: &str) -> Result<Arc<dyn ClusterApi>> {
        self.registry
            .get(cluster)
            .with_context(|| format!("no registered cluster named {}", cluster))
    }

    async fn expand_cluster(&self, node: &GraphResource) -> Result<ReconcileOutcome> {
        let api = self.api_for(&node.global_id)?;
        let namespaces = api.list_namespaces().await?;
        let base = child_path(ROOT_PATH, &node.global_id);

        let mut resources = Vec::new();
        let mut edges = Vec::new();
        for raw in &namespaces {
            let mut ns = to_graph_resource(&node.global_id, raw);
            ns.cluster_path = Some(base.clone());
            edges.push(GraphEdge::new(
                node.global_id.clone(),
                ns.global_id.clone(),
                ResourceKind::Cluster,
                ResourceKind::Namespace,
            ));
            resources.push(ns);
        }
        Ok(self.reconciler.reconcile_kind(
            ResourceKind::Namespace,
            &ReconcileScope::ChildrenOf(node.global_id.clone()),
            resources,
            edges,
        ))
    }

    async fn expand_namespace(&self, node: &GraphResource) -> Result<ReconcileOutcome> {
        let api = self.api_for(&node.cluster)?;
        let base = node
            .path(Hierarchy::Cluster)
            .map(|p| child_path(p, &node.global_id));

        let mut total = ReconcileOutcome::default();
        for kind in ResourceKind::namespace_workloads() {
            let listed = list_or_empty(api.as_ref(), *kind, &node.name).await?;
            let mut resources = Vec::new();
            let mut edges = Vec::new();
            for raw in &listed {
                let mut workload = to_graph_resource(&node.cluster, raw);
                workload.cluster_path = base.clone();
                edges.push(GraphEdge::new(
                    node.global_id.clone(),
                    workload.global_id.clone(),
                    ResourceKind::Namespace,
                    *kind,
                ));
                resources.push(workload);
            }
            let outcome = self.reconciler.reconcile_kind(
                *kind,
                &ReconcileScope::Namespace {
                    cluster: node.cluster.clone(),
                    namespace: node.name.clone(),
                },
                resources,
                edges,
            );
            total.upserted += outcome.upserted;
            total.retired += outcome.retired;
        }
        Ok(total)
    }

    async fn expand_deployment(&self, node: &GraphResource) -> Result<ReconcileOutcome> {
        let api = self.api_for(&node.cluster)?;
        let uid = local_uid(&node.global_id, &node.cluster);
        let listed =
            list_or_empty(api.as_ref(), ResourceKind::ReplicaSet, &node.namespace).await?;
        let base = node
            .path(Hierarchy::Cluster)
            .map(|p| child_path(p, &node.global_id));

        let mut resources = Vec::new();
        let mut edges = Vec::new();
        for raw in &listed {
            let RawExtras::ReplicaSet { owners } = &raw.extras else {
                continue;
            };
            let owned = relations::primary_owner(owners)
                .map(|owner| owner.uid == uid)
                .unwrap_or(false);
            if !owned {
                continue;
            }
            let mut rs = to_graph_resource(&node.cluster, raw);
            rs.cluster_path = base.clone();
            edges.push(GraphEdge::new(
                node.global_id.clone(),
                rs.global_id.clone(),
                ResourceKind::Deployment,
                ResourceKind::ReplicaSet,
            ));
            resources.push(rs);
        }
        Ok(self.reconciler.reconcile_kind(
            ResourceKind::ReplicaSet,
            &ReconcileScope::ChildrenOf(node.global_id.clone()),
            resources,
            edges,
        ))
    }

    /// Expand a pod controller (ReplicaSet, DaemonSet, StatefulSet, Job)
    async fn expand_controller(&self, node: &GraphResource) -> Result<ReconcileOutcome> {
        let api = self.api_for(&node.cluster)?;
        let uid = local_uid(&node.global_id, &node.cluster);
        let listed = list_or_empty(api.as_ref(), ResourceKind::Pod, &node.namespace).await?;
        let cluster_base = node
            .path(Hierarchy::Cluster)
            .map(|p| child_path(p, &node.global_id));

        // For a ReplicaSet the app chain skips it and goes through the owning
        // Deployment; for the other controllers the node itself is the app
        // parent when it is deployable-tracked.
        let (app_base, application) = if node.kind == ResourceKind::ReplicaSet {
            let deploy = node
                .path(Hierarchy::Cluster)
                .and_then(|p| ancestor_ids(p).last().map(|id| id.to_string()))
                .and_then(|id| self.store.get(&id));
            match deploy {
                Some(d) => (
                    d.path(Hierarchy::App)
                        .map(|p| child_path(p, &d.global_id)),
                    d.application.clone(),
                ),
                None => (None, None),
            }
        } else {
            (
                node.path(Hierarchy::App)
                    .map(|p| child_path(p, &node.global_id)),
                node.application.clone(),
            )
        };

        let mut resources = Vec::new();
        let mut edges = Vec::new();
        for raw in &listed {
            let RawExtras::Pod { owners, .. } = &raw.extras else {
                continue;
            };
            let owned = relations::primary_owner(owners)
                .map(|owner| owner.uid == uid)
                .unwrap_or(false);
            if !owned {
                continue;
            }
            let mut pod = to_graph_resource(&node.cluster, raw);
            pod.cluster_path = cluster_base.clone();
            pod.app_path = app_base.clone();
            pod.application = application.clone();
            edges.push(GraphEdge::new(
                node.global_id.clone(),
                pod.global_id.clone(),
                node.kind,
                ResourceKind::Pod,
            ));
            resources.push(pod);
        }
        Ok(self.reconciler.reconcile_kind(
            ResourceKind::Pod,
            &ReconcileScope::ChildrenOf(node.global_id.clone()),
            resources,
            edges,
        ))
    }

    /// Selected pods are linked by edge only; a pod's cluster path never runs
    /// through a Service.
    async fn expand_service(&self, node: &GraphResource) -> Result<ReconcileOutcome> {
        let api = self.api_for(&node.cluster)?;
        let raw_service = RawResource::from_object(
            ResourceKind::Service,
            &node.attributes,
            &self.deployables_annotation,
        );
        let selector = match raw_service.map(|s| s.extras) {
            Some(RawExtras::Service { selector }) => selector,
            _ => Default::default(),
        };

        let listed = list_or_empty(api.as_ref(), ResourceKind::Pod, &node.namespace).await?;
        let mut resources = Vec::new();
        let mut edges = Vec::new();
        for raw in &listed {
            let RawExtras::Pod { labels, .. } = &raw.extras else {
                continue;
            };
            if !relations::selector_matches(&selector, labels) {
                continue;
            }
            let pod = to_graph_resource(&node.cluster, raw);
            edges.push(GraphEdge::new(
                node.global_id.clone(),
                pod.global_id.clone(),
                ResourceKind::Service,
                ResourceKind::Pod,
            ));
            resources.push(pod);
        }
        Ok(self.reconciler.reconcile_kind(
            ResourceKind::Pod,
            &ReconcileScope::ChildrenOf(node.global_id.clone()),
            resources,
            edges,
        ))
    }

    async fn expand_application(&self, node: &GraphResource) -> Result<ReconcileOutcome> {
        let raw_app = RawResource::from_object(
            ResourceKind::Application,
            &node.attributes,
            &self.deployables_annotation,
        );
        let wanted: HashSet<String> = raw_app
            .as_ref()
            .map(|a| relations::deployable_names(a).iter().cloned().collect())
            .unwrap_or_default();
        if wanted.is_empty() {
            return Ok(ReconcileOutcome::default());
        }

        let base = node
            .path(Hierarchy::App)
            .map(|p| child_path(p, &node.global_id));

        // Deployable names resolve across every registered cluster
        let mut resources = Vec::new();
        let mut edges = Vec::new();
        for api in self.registry.clusters() {
            let cluster = api.name().to_string();
            let namespaces = match api.list_namespaces().await {
                Ok(ns) => ns,
                Err(err) => {
                    warn!(cluster = %cluster, %err, "skipping cluster during expansion");
                    continue;
                }
            };
            for ns in &namespaces {
                let listed =
                    list_or_empty(api.as_ref(), ResourceKind::Deployable, &ns.name).await?;
                for raw in &listed {
                    if !wanted.contains(&raw.name) {
                        continue;
                    }
                    let mut dpb = to_graph_resource(&cluster, raw);
                    dpb.app_path = base.clone();
                    dpb.application = Some(node.name.clone());
                    edges.push(GraphEdge::new(
                        node.global_id.clone(),
                        dpb.global_id.clone(),
                        ResourceKind::Application,
                        ResourceKind::Deployable,
                    ));
                    resources.push(dpb);
                }
            }
        }
        Ok(self.reconciler.reconcile_kind(
            ResourceKind::Deployable,
            &ReconcileScope::ChildrenOf(node.global_id.clone()),
            resources,
            edges,
        ))
    }

    async fn expand_deployable(&self, node: &GraphResource) -> Result<ReconcileOutcome> {
        let raw_dpb = RawResource::from_object(
            ResourceKind::Deployable,
            &node.attributes,
            &self.deployables_annotation,
        );
        let deployer = match raw_dpb.as_ref().and_then(relations::deployer_of) {
            Some(deployer) => deployer.clone(),
            None => {
                debug!(id = %node.global_id, "deployable has no parseable deployer");
                return Ok(ReconcileOutcome::default());
            }
        };
        let base = node
            .path(Hierarchy::App)
            .map(|p| child_path(p, &node.global_id));

        match deployer {
            Deployer::Helm { chart_url } => {
                let mut helm = helm_node(&node.cluster, &node.namespace, raw_dpb.as_ref(), chart_url);
                helm.app_path = base;
                helm.application = node.application.clone();
                let edge = GraphEdge::new(
                    node.global_id.clone(),
                    helm.global_id.clone(),
                    ResourceKind::Deployable,
                    ResourceKind::Helm,
                );
                Ok(self.reconciler.reconcile_kind(
                    ResourceKind::Helm,
                    &ReconcileScope::ChildrenOf(node.global_id.clone()),
                    vec![helm],
                    vec![edge],
                ))
            }
            Deployer::Kube {
                kind,
                name,
                namespace,
            } => {
                let Some(kind) = ResourceKind::parse_optional(&kind) else {
                    debug!(id = %node.global_id, kind, "deployer kind is not tracked");
                    return Ok(ReconcileOutcome::default());
                };
                let Some((cluster, raw)) = self.find_deployed(kind, &name, namespace.as_deref()).await
                else {
                    debug!(id = %node.global_id, %kind, name, "deployed resource not found");
                    return Ok(ReconcileOutcome::default());
                };
                let mut deployed = to_graph_resource(&cluster, &raw);
                deployed.app_path = base.clone();
                deployed.application = node.application.clone();
                let edge = GraphEdge::new(
                    node.global_id.clone(),
                    deployed.global_id.clone(),
                    ResourceKind::Deployable,
                    kind,
                );
                let gid = deployed.global_id.clone();
                let outcome = self.reconciler.reconcile_kind(
                    kind,
                    &ReconcileScope::ChildrenOf(node.global_id.clone()),
                    vec![deployed],
                    vec![edge],
                );
                if let (Some(base), Some(app)) = (base, node.application.clone()) {
                    self.reconciler.apply_app_placement(vec![AppPlacement {
                        global_id: gid,
                        app_path: base,
                        application: Some(app),
                    }]);
                }
                Ok(outcome)
            }
        }
    }

    /// Search every cluster for a resource of the given kind and name,
    /// preferring the lowest (cluster, namespace) pair.
    async fn find_deployed(
        &self,
        kind: ResourceKind,
        name: &str,
        namespace: Option<&str>,
    ) -> Option<(String, RawResource)> {
        let mut best: Option<(String, RawResource)> = None;
        for api in self.registry.clusters() {
            let cluster = api.name().to_string();
            let namespaces = match api.list_namespaces().await {
                Ok(ns) => ns,
                Err(_) => continue,
            };
            for ns in &namespaces {
                if let Some(wanted_ns) = namespace
                    && ns.name != wanted_ns
                {
                    continue;
                }
                let listed = match list_or_empty(api.as_ref(), kind, &ns.name).await {
                    Ok(listed) => listed,
                    Err(_) => continue,
                };
                for raw in listed {
                    if raw.name != name {
                        continue;
                    }
                    let better = match &best {
                        None => true,
                        Some((best_cluster, best_raw)) => {
                            (cluster.as_str(), raw.namespace.as_str())
                                < (best_cluster.as_str(), best_raw.namespace.as_str())
                        }
                    };
                    if better {
                        best = Some((cluster.clone(), raw));
                    }
                }
            }
        }
        best
    }
}

/// List one kind, treating "not served" and "not allowed" as an empty result
async fn list_or_empty(
    api: &dyn ClusterApi,
    kind: ResourceKind,
    namespace: &str,
) -> Result<Vec<RawResource>, ListError> {
    match api.list_namespaced(kind, namespace).await {
        Ok(listed) => Ok(listed),
        Err(ListError::NotFound(msg)) => {
            debug!(cluster = api.name(), %kind, namespace, msg, "kind not served");
            Ok(Vec::new())
        }
        Err(ListError::Forbidden(msg)) => {
            debug!(cluster = api.name(), %kind, namespace, msg, "listing forbidden");
            Ok(Vec::new())
        }
        Err(err) => Err(err),
    }
}

async fn fetch_cluster(
    api: Arc<dyn ClusterApi>,
    namespaces: Vec<RawResource>,
) -> Result<CrawledCluster, ListError> {
    let name = api.name().to_string();
    let mut inventories = Vec::with_capacity(namespaces.len());
    for namespace in namespaces {
        let ns = namespace.name.clone();
        inventories.push(NamespaceInventory {
            applications: list_or_empty(api.as_ref(), ResourceKind::Application, &ns).await?,
            deployables: list_or_empty(api.as_ref(), ResourceKind::Deployable, &ns).await?,
            deployments: list_or_empty(api.as_ref(), ResourceKind::Deployment, &ns).await?,
            services: list_or_empty(api.as_ref(), ResourceKind::Service, &ns).await?,
            daemon_sets: list_or_empty(api.as_ref(), ResourceKind::DaemonSet, &ns).await?,
            stateful_sets: list_or_empty(api.as_ref(), ResourceKind::StatefulSet, &ns).await?,
            jobs: list_or_empty(api.as_ref(), ResourceKind::Job, &ns).await?,
            replica_sets: list_or_empty(api.as_ref(), ResourceKind::ReplicaSet, &ns).await?,
            pods: list_or_empty(api.as_ref(), ResourceKind::Pod, &ns).await?,
            namespace,
        });
    }
    Ok(CrawledCluster {
        name,
        namespaces: inventories,
    })
}

fn cluster_node(name: &str) -> GraphResource {
    let mut node = GraphResource::new(cluster_id(name), ResourceKind::Cluster, name);
    node.cluster = name.to_string();
    node.cluster_path = Some(ROOT_PATH.to_string());
    node
}

fn to_graph_resource(cluster: &str, raw: &RawResource) -> GraphResource {
    let mut resource =
        GraphResource::new(global_id(cluster, &raw.uid), raw.kind, raw.name.clone());
    resource.cluster = cluster.to_string();
    resource.namespace = raw.namespace.clone();
    resource.created_at = raw.created_at;
    resource.attributes = raw.attributes.clone();
    if let RawExtras::Pod { health, .. } = &raw.extras
        && health.is_unhealthy()
    {
        resource.health = Some(health.clone());
    }
    resource
}

/// Synthetic node for a Helm-deployed payload; resolution ends here
fn helm_node(
    cluster: &str,
    namespace: &str,
    deployable: Option<&RawResource>,
    chart_url: Option<String>,
) -> GraphResource {
    let uid = deployable
        .map(|d| format!("{}-helm", d.uid))
        .unwrap_or_else(|| "helm".to_string());
    let name = chart_url.unwrap_or_else(|| "helm".to_string());
    let mut node = GraphResource::new(global_id(cluster, &uid), ResourceKind::Helm, name);
    node.cluster = cluster.to_string();
    node.namespace = namespace.to_string();
    node
}

fn local_uid(global_id: &str, cluster: &str) -> String {
    global_id
        .strip_prefix(&format!("{}_", cluster))
        .unwrap_or(global_id)
        .to_string()
}

/// Turn the raw listings of every reachable cluster into per-kind batches of
/// resources and edges with both hierarchies' paths assigned.
fn materialize(clusters: &[CrawledCluster]) -> Materialized {
    let mut out = Materialized::default();

    // Working node table plus the parent maps the path builder consumes
    let mut nodes: HashMap<String, GraphResource> = HashMap::new();
    let mut cluster_parent: HashMap<String, String> = HashMap::new();
    let mut app_parent: HashMap<String, String> = HashMap::new();
    let mut application_of: HashMap<String, String> = HashMap::new();
    let mut edges: Vec<(ResourceKind, GraphEdge)> = Vec::new();

    // Cross-cluster lookup tables
    let mut apps: Vec<(String, RawResource)> = Vec::new();
    let mut deployables: Vec<(String, RawResource)> = Vec::new();
    let mut workload_index: HashMap<(ResourceKind, String), Vec<String>> = HashMap::new();

    for cluster in clusters {
        let cname = &cluster.name;
        let cid = cluster_id(cname);
        nodes.insert(cid.clone(), cluster_node(cname));
        cluster_parent.insert(cid.clone(), crate::graph::ROOT_ID.to_string());

        for inventory in &cluster.namespaces {
            let ns_gid = global_id(cname, &inventory.namespace.uid);
            nodes.insert(
                ns_gid.clone(),
                to_graph_resource(cname, &inventory.namespace),
            );
            // Namespace rows carry their own name as the namespace column
            if let Some(ns_node) = nodes.get_mut(&ns_gid) {
                ns_node.namespace = inventory.namespace.name.clone();
            }
            cluster_parent.insert(ns_gid.clone(), cid.clone());
            edges.push((
                ResourceKind::Namespace,
                GraphEdge::new(
                    cid.clone(),
                    ns_gid.clone(),
                    ResourceKind::Cluster,
                    ResourceKind::Namespace,
                ),
            ));

            let workload_lists = [
                (ResourceKind::Deployment, &inventory.deployments),
                (ResourceKind::Service, &inventory.services),
                (ResourceKind::DaemonSet, &inventory.daemon_sets),
                (ResourceKind::StatefulSet, &inventory.stateful_sets),
                (ResourceKind::Job, &inventory.jobs),
            ];
            for (kind, list) in workload_lists {
                for raw in list.iter() {
                    let gid = global_id(cname, &raw.uid);
                    nodes.insert(gid.clone(), to_graph_resource(cname, raw));
                    cluster_parent.insert(gid.clone(), ns_gid.clone());
                    edges.push((
                        kind,
                        GraphEdge::new(ns_gid.clone(), gid.clone(), ResourceKind::Namespace, kind),
                    ));
                    workload_index
                        .entry((kind, raw.name.clone()))
                        .or_default()
                        .push(gid);
                }
            }

            for raw in &inventory.applications {
                apps.push((cname.clone(), raw.clone()));
            }
            for raw in &inventory.deployables {
                deployables.push((cname.clone(), raw.clone()));
            }
        }
    }

    // Application side: apps hang off the root; each one claims Deployables
    // by name, across every cluster. When several apps claim the same
    // Deployable the first in name order becomes its path parent.
    apps.sort_by(|a, b| (&a.1.name, &a.0).cmp(&(&b.1.name, &b.0)));
    deployables.sort_by(|a, b| (&a.0, &a.1.namespace, &a.1.uid).cmp(&(&b.0, &b.1.namespace, &b.1.uid)));

    for (cname, raw) in &apps {
        let app_gid = global_id(cname, &raw.uid);
        let mut node = to_graph_resource(cname, raw);
        node.application = Some(raw.name.clone());
        nodes.insert(app_gid.clone(), node);
        app_parent.insert(app_gid.clone(), crate::graph::ROOT_ID.to_string());
        application_of.insert(app_gid.clone(), raw.name.clone());

        for wanted in relations::deployable_names(raw) {
            for (dpb_cluster, dpb_raw) in deployables.iter().filter(|(_, d)| &d.name == wanted) {
                let dpb_gid = global_id(dpb_cluster, &dpb_raw.uid);
                edges.push((
                    ResourceKind::Deployable,
                    GraphEdge::new(
                        app_gid.clone(),
                        dpb_gid.clone(),
                        ResourceKind::Application,
                        ResourceKind::Deployable,
                    ),
                ));
                if !app_parent.contains_key(&dpb_gid) {
                    nodes.insert(dpb_gid.clone(), to_graph_resource(dpb_cluster, dpb_raw));
                    app_parent.insert(dpb_gid.clone(), app_gid.clone());
                    application_of.insert(dpb_gid.clone(), raw.name.clone());
                }
            }
        }
    }

    // Resolve what each referenced Deployable deploys
    let mut deployed_controllers: HashSet<String> = HashSet::new();
    for (dpb_cluster, dpb_raw) in &deployables {
        let dpb_gid = global_id(dpb_cluster, &dpb_raw.uid);
        if !app_parent.contains_key(&dpb_gid) {
            // Not claimed by any Application; stays out of the graph
            continue;
        }
        let application = application_of.get(&dpb_gid).cloned();
        match relations::deployer_of(dpb_raw) {
            Some(Deployer::Helm { chart_url }) => {
                let helm = helm_node(
                    dpb_cluster,
                    &dpb_raw.namespace,
                    Some(dpb_raw),
                    chart_url.clone(),
                );
                let helm_gid = helm.global_id.clone();
                nodes.insert(helm_gid.clone(), helm);
                app_parent.insert(helm_gid.clone(), dpb_gid.clone());
                if let Some(app) = &application {
                    application_of.insert(helm_gid.clone(), app.clone());
                }
                edges.push((
                    ResourceKind::Helm,
                    GraphEdge::new(
                        dpb_gid.clone(),
                        helm_gid,
                        ResourceKind::Deployable,
                        ResourceKind::Helm,
                    ),
                ));
            }
            Some(Deployer::Kube {
                kind,
                name,
                namespace,
            }) => {
                let Some(parsed) = ResourceKind::parse_optional(kind) else {
                    debug!(deployable = %dpb_raw.name, %kind, "deployer kind is not tracked");
                    continue;
                };
                let kind = parsed;
                let candidates = workload_index
                    .get(&(kind, name.clone()))
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                let deployed = candidates
                    .iter()
                    .filter(|gid| match namespace {
                        Some(ns) => nodes.get(*gid).map(|n| &n.namespace == ns).unwrap_or(false),
                        None => true,
                    })
                    .min_by(|a, b| {
                        let ka = nodes.get(*a).map(|n| (n.cluster.clone(), n.namespace.clone()));
                        let kb = nodes.get(*b).map(|n| (n.cluster.clone(), n.namespace.clone()));
                        ka.cmp(&kb)
                    });
                let Some(deployed_gid) = deployed.cloned() else {
                    debug!(deployable = %dpb_raw.name, %kind, %name, "deployed resource not found");
                    continue;
                };
                edges.push((
                    kind,
                    GraphEdge::new(
                        dpb_gid.clone(),
                        deployed_gid.clone(),
                        ResourceKind::Deployable,
                        kind,
                    ),
                ));
                if !app_parent.contains_key(&deployed_gid) {
                    app_parent.insert(deployed_gid.clone(), dpb_gid.clone());
                    if let Some(app) = &application {
                        application_of.insert(deployed_gid.clone(), app.clone());
                    }
                }
                if kind != ResourceKind::Service {
                    deployed_controllers.insert(deployed_gid);
                }
            }
            None => {
                debug!(deployable = %dpb_raw.name, "deployable has no parseable deployer");
            }
        }
    }

    // ReplicaSets ride along only when their Deployment is deployable-tracked
    let mut rs_controller: HashMap<String, String> = HashMap::new();
    for cluster in clusters {
        let cname = &cluster.name;
        for inventory in &cluster.namespaces {
            for raw in &inventory.replica_sets {
                let RawExtras::ReplicaSet { owners } = &raw.extras else {
                    continue;
                };
                let Some(owner) = relations::primary_owner(owners) else {
                    continue;
                };
                if owner.kind != "Deployment" {
                    continue;
                }
                let deploy_gid = global_id(cname, &owner.uid);
                if !deployed_controllers.contains(&deploy_gid) {
                    continue;
                }
                let rs_gid = global_id(cname, &raw.uid);
                nodes.insert(rs_gid.clone(), to_graph_resource(cname, raw));
                cluster_parent.insert(rs_gid.clone(), deploy_gid.clone());
                rs_controller.insert(rs_gid.clone(), deploy_gid.clone());
                edges.push((
                    ResourceKind::ReplicaSet,
                    GraphEdge::new(
                        deploy_gid,
                        rs_gid,
                        ResourceKind::Deployment,
                        ResourceKind::ReplicaSet,
                    ),
                ));
            }
        }
    }

    // Pods: controller chain gives the cluster parent, the deployed workload
    // (skipping ReplicaSets) gives the app parent, services contribute edges
    // only.
    for cluster in clusters {
        let cname = &cluster.name;
        for inventory in &cluster.namespaces {
            for raw in &inventory.pods {
                let RawExtras::Pod { owners, labels, .. } = &raw.extras else {
                    continue;
                };
                let pod_gid = global_id(cname, &raw.uid);
                nodes.insert(pod_gid.clone(), to_graph_resource(cname, raw));

                if let Some(owner) = relations::primary_owner(owners) {
                    let owner_gid = global_id(cname, &owner.uid);
                    if let Some(owner_kind) = ResourceKind::parse_optional(&owner.kind)
                        && owner_kind.is_pod_controller()
                        && nodes.contains_key(&owner_gid)
                    {
                        cluster_parent.insert(pod_gid.clone(), owner_gid.clone());
                        edges.push((
                            ResourceKind::Pod,
                            GraphEdge::new(
                                owner_gid.clone(),
                                pod_gid.clone(),
                                owner_kind,
                                ResourceKind::Pod,
                            ),
                        ));

                        // ReplicaSet pods chain to the Deployment on the app side
                        let app_controller = match owner_kind {
                            ResourceKind::ReplicaSet => rs_controller.get(&owner_gid).cloned(),
                            _ => Some(owner_gid.clone()),
                        };
                        if let Some(controller_gid) = app_controller
                            && app_parent.contains_key(&controller_gid)
                        {
                            app_parent.insert(pod_gid.clone(), controller_gid.clone());
                            if let Some(app) = application_of.get(&controller_gid).cloned() {
                                application_of.insert(pod_gid.clone(), app);
                            }
                        }
                    }
                }

                if let Some(service) = relations::service_for_pod(&inventory.services, labels) {
                    let svc_gid = global_id(cname, &service.uid);
                    edges.push((
                        ResourceKind::Pod,
                        GraphEdge::new(
                            svc_gid,
                            pod_gid.clone(),
                            ResourceKind::Service,
                            ResourceKind::Pod,
                        ),
                    ));
                }
            }
        }
    }

    // Both hierarchies share one path-assignment pass each
    let cluster_paths = assign_paths(&cluster_parent);
    let app_paths = assign_paths(&app_parent);
    for (gid, node) in nodes.iter_mut() {
        node.cluster_path = cluster_paths.get(gid).cloned();
        node.app_path = app_paths.get(gid).cloned();
        if node.application.is_none() {
            node.application = application_of.get(gid).cloned();
        }
    }

    for (_, node) in nodes {
        out.resources.entry(node.kind).or_default().push(node);
    }
    for (child_kind, edge) in edges {
        out.edges.entry(child_kind).or_default().push(edge);
    }
    for batch in out.resources.values_mut() {
        batch.sort_by(|a, b| a.global_id.cmp(&b.global_id));
    }
    out
}
