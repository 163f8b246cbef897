//! Read-side views over the graph
//!
//! Navigation unions two sources of children: resources whose path extends
//! the node's path by its own id (what the path assignment decided), and
//! edge children the path assignment parked elsewhere — a service's selected
//! pods, or a deployable claimed by more than one application. Edge children
//! are filtered to the kinds the requested hierarchy shows.

use std::str::FromStr;

use crate::graph::{ROOT_PATH, ancestor_ids, child_path};
use crate::graph::store::GraphStore;
use crate::models::{GraphResource, Hierarchy, PodHealth, ResourceKind};

/// One row in a navigation or search listing
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSummary {
    pub global_id: String,
    pub kind: ResourceKind,
    pub name: String,
    pub cluster: String,
    pub namespace: String,
    pub application: Option<String>,
    pub health: Option<PodHealth>,
    /// Whether drilling into this row yields anything, per the current
    /// contents of the store
    pub has_children: bool,
}

/// One segment of the breadcrumb trail
#[derive(Debug, Clone, PartialEq)]
pub struct Crumb {
    pub global_id: String,
    pub name: String,
    pub kind: ResourceKind,
}

/// A drill-down listing: where you are and what is underneath
#[derive(Debug, Clone, PartialEq)]
pub struct NavView {
    pub breadcrumbs: Vec<Crumb>,
    pub rows: Vec<ResourceSummary>,
}

/// Result of jumping from one hierarchy to the other
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchView {
    /// Trail to the listing in the target hierarchy
    pub breadcrumbs: Vec<Crumb>,
    pub rows: Vec<ResourceSummary>,
    /// Index of the resource that was switched on, when it is placed in the
    /// target hierarchy
    pub selected: Option<usize>,
}

/// Parsed search input: `key:value` filters plus free-text name terms
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchQuery {
    pub application: Option<String>,
    pub kind: Option<ResourceKind>,
    pub cluster: Option<String>,
    pub namespace: Option<String>,
    pub terms: Vec<String>,
}

impl SearchQuery {
    /// Parse a query string. Unknown `kind:` values make the kind filter
    /// unsatisfiable rather than silently matching everything.
    pub fn parse(input: &str) -> Result<Self, String> {
        let mut query = SearchQuery::default();
        for token in input.split_whitespace() {
            match token.split_once(':') {
                Some(("app", value)) => query.application = Some(value.to_string()),
                Some(("cluster", value)) => query.cluster = Some(value.to_string()),
                Some(("ns", value)) | Some(("namespace", value)) => {
                    query.namespace = Some(value.to_string());
                }
                Some(("kind", value)) => {
                    let kind = ResourceKind::from_str_case_insensitive(value)
                        .ok_or_else(|| format!("unknown kind: {}", value))?;
                    query.kind = Some(kind);
                }
                _ => query.terms.push(token.to_lowercase()),
            }
        }
        Ok(query)
    }

    fn matches(&self, resource: &GraphResource) -> bool {
        if resource.kind == ResourceKind::Root {
            return false;
        }
        if let Some(app) = &self.application {
            let matched = resource
                .application
                .as_deref()
                .map(|a| a.eq_ignore_ascii_case(app))
                .unwrap_or(false);
            if !matched {
                return false;
            }
        }
        if let Some(kind) = self.kind
            && resource.kind != kind
        {
            return false;
        }
        if let Some(cluster) = &self.cluster
            && !resource.cluster.eq_ignore_ascii_case(cluster)
        {
            return false;
        }
        if let Some(namespace) = &self.namespace
            && !resource.namespace.eq_ignore_ascii_case(namespace)
        {
            return false;
        }
        let name = resource.name.to_lowercase();
        self.terms.iter().all(|term| name.contains(term))
    }
}

/// Read-only query surface over the store
#[derive(Clone)]
pub struct QueryService {
    store: GraphStore,
}

impl QueryService {
    pub fn new(store: GraphStore) -> Self {
        Self { store }
    }

    /// The direct children of the root in one hierarchy: clusters on the
    /// cluster side, applications on the app side.
    pub fn top_level(&self, hierarchy: Hierarchy) -> Vec<ResourceSummary> {
        self.rows_under(hierarchy, ROOT_PATH)
    }

    /// Breadcrumbs and children of one node in one hierarchy.
    ///
    /// A resource with no path in the requested hierarchy has nothing to
    /// drill into there; callers get the breadcrumb-free empty view.
    pub fn children(&self, hierarchy: Hierarchy, global_id: &str) -> NavView {
        let Some(node) = self.store.get(global_id) else {
            return NavView {
                breadcrumbs: vec![],
                rows: vec![],
            };
        };
        let Some(path) = node.path(hierarchy) else {
            return NavView {
                breadcrumbs: vec![],
                rows: vec![],
            };
        };

        let prefix = child_path(path, global_id);
        let mut rows = self.rows_under(hierarchy, &prefix);
        for child in self.edge_children(hierarchy, global_id) {
            if rows.iter().any(|r| r.global_id == child.global_id) {
                continue;
            }
            let has_children = self.drillable(hierarchy, &child);
            let mut summary = self.summarize(child);
            summary.has_children = has_children;
            rows.push(summary);
        }
        rows.sort_by(|a, b| (&a.name, &a.global_id).cmp(&(&b.name, &b.global_id)));

        NavView {
            breadcrumbs: self.crumbs_for(&prefix),
            rows,
        }
    }

    /// Re-anchor on the same resource in the other hierarchy: its siblings
    /// there, with the resource itself selected. Falls back to that
    /// hierarchy's top level when the resource is not placed in it.
    pub fn switch_hierarchy(&self, global_id: &str, target: Hierarchy) -> SwitchView {
        let placed = self
            .store
            .get(global_id)
            .and_then(|node| node.path(target).map(str::to_string));
        let prefix = placed.as_deref().unwrap_or(ROOT_PATH);
        let rows = self.rows_under(target, prefix);
        let selected = placed
            .is_some()
            .then(|| rows.iter().position(|r| r.global_id == global_id))
            .flatten();
        SwitchView {
            breadcrumbs: self.crumbs_for(prefix),
            rows,
            selected,
        }
    }

    /// Free search across every stored resource
    pub fn search(&self, input: &str) -> Result<Vec<ResourceSummary>, String> {
        let query = SearchQuery::parse(input)?;
        let mut hits: Vec<GraphResource> = self
            .store
            .all_resources()
            .into_iter()
            .filter(|r| query.matches(r))
            .collect();
        hits.sort_by(|a, b| {
            (&a.cluster, &a.namespace, &a.name, &a.global_id)
                .cmp(&(&b.cluster, &b.namespace, &b.name, &b.global_id))
        });
        Ok(hits.into_iter().map(|r| self.summarize(r)).collect())
    }

    /// Every pod currently classified as unhealthy
    pub fn unhealthy(&self) -> Vec<ResourceSummary> {
        let mut hits: Vec<GraphResource> = self
            .store
            .all_resources()
            .into_iter()
            .filter(|r| r.health.as_ref().map(PodHealth::is_unhealthy).unwrap_or(false))
            .collect();
        hits.sort_by(|a, b| {
            (&a.cluster, &a.namespace, &a.name).cmp(&(&b.cluster, &b.namespace, &b.name))
        });
        hits.into_iter().map(|r| self.summarize(r)).collect()
    }

    fn rows_under(&self, hierarchy: Hierarchy, prefix: &str) -> Vec<ResourceSummary> {
        let mut rows: Vec<GraphResource> = self
            .store
            .all_resources()
            .into_iter()
            .filter(|r| r.path(hierarchy) == Some(prefix))
            .collect();
        rows.sort_by(|a, b| (&a.name, &a.global_id).cmp(&(&b.name, &b.global_id)));
        rows.into_iter()
            .map(|r| {
                let has_children = self.drillable(hierarchy, &r);
                let mut summary = self.summarize(r);
                summary.has_children = has_children;
                summary
            })
            .collect()
    }

    fn has_rows_under(&self, hierarchy: Hierarchy, prefix: &str) -> bool {
        self.store
            .all_resources()
            .iter()
            .any(|r| r.path(hierarchy) == Some(prefix))
    }

    /// Edge children of a node, restricted to the kinds the hierarchy shows
    fn edge_children(&self, hierarchy: Hierarchy, global_id: &str) -> Vec<GraphResource> {
        self.store
            .children_ids(global_id)
            .into_iter()
            .filter_map(|id| self.store.get(&id))
            .filter(|r| r.kind.in_hierarchy(hierarchy))
            .collect()
    }

    /// Whether drilling into a resource yields anything: path children under
    /// its own placement, edge children, or a pending lazy expansion
    fn drillable(&self, hierarchy: Hierarchy, resource: &GraphResource) -> bool {
        let under_own_path = resource
            .path(hierarchy)
            .map(|p| child_path(p, &resource.global_id))
            .is_some_and(|p| self.has_rows_under(hierarchy, &p));
        under_own_path
            || !self.edge_children(hierarchy, &resource.global_id).is_empty()
            || self.could_expand(&resource.global_id, resource.kind)
    }

    fn crumbs_for(&self, prefix: &str) -> Vec<Crumb> {
        let mut crumbs: Vec<Crumb> = ancestor_ids(prefix)
            .into_iter()
            .filter_map(|id| self.store.get(id))
            .map(|r| Crumb {
                global_id: r.global_id,
                name: r.name,
                kind: r.kind,
            })
            .collect();
        // Synthetic root may predate its store entry in tests; keep the trail
        // anchored regardless.
        if crumbs.first().map(|c| c.kind) != Some(ResourceKind::Root) {
            crumbs.insert(
                0,
                Crumb {
                    global_id: crate::graph::ROOT_ID.to_string(),
                    name: crate::graph::ROOT_ID.to_string(),
                    kind: ResourceKind::Root,
                },
            );
        }
        crumbs
    }

    /// Whether lazy expansion might still find children for a node that has
    /// none stored yet
    fn could_expand(&self, global_id: &str, kind: ResourceKind) -> bool {
        match kind {
            ResourceKind::Root | ResourceKind::Pod | ResourceKind::Helm => false,
            _ => !self.store.has_outgoing_edges(global_id),
        }
    }

    fn summarize(&self, resource: GraphResource) -> ResourceSummary {
        ResourceSummary {
            global_id: resource.global_id,
            kind: resource.kind,
            name: resource.name,
            cluster: resource.cluster,
            namespace: resource.namespace,
            application: resource.application,
            health: resource.health,
            has_children: false,
        }
    }
}

/// Parse a hierarchy argument the way the CLI presents it
pub fn parse_hierarchy(s: &str) -> Result<Hierarchy, String> {
    Hierarchy::from_str(s)
}
