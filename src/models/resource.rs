//! Graph resource and edge records
//!
//! These are the persisted shapes: one row per discovered resource and one row
//! per parent->child relation. Both hierarchies share the same resource rows;
//! only the breadcrumb paths differ.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ResourceKind;

/// Pod health classification result
///
/// Severity 0 means healthy; anything non-zero shows up in anomaly mode.
/// The reason string follows the kubectl STATUS column conventions
/// (e.g. "CrashLoopBackOff", "Init:1/3", "ExitCode:137").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodHealth {
    pub severity: i32,
    pub reason: String,
}

impl PodHealth {
    pub fn is_unhealthy(&self) -> bool {
        self.severity != 0
    }
}

/// A discovered (or synthetic) resource in the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphResource {
    /// Process-wide unique id: `<cluster>_<uid>`, or a sentinel for
    /// synthetic nodes (cluster name, `"root"`)
    pub global_id: String,
    pub kind: ResourceKind,
    /// Cluster-local display name (not unique across clusters)
    pub name: String,
    pub cluster: String,
    /// Empty for cluster-scoped kinds
    pub namespace: String,
    /// Name of the owning Application, set for everything placed in the
    /// app hierarchy (drives the `app:` search filter)
    pub application: Option<String>,
    /// Creation timestamp from the underlying resource; absent for synthetic nodes
    pub created_at: Option<DateTime<Utc>>,
    /// Breadcrumb of ancestor ids in the application hierarchy, `/root/<id>/.../`
    pub app_path: Option<String>,
    /// Breadcrumb of ancestor ids in the cluster hierarchy
    pub cluster_path: Option<String>,
    /// Populated only for Pods classified as unhealthy
    pub health: Option<PodHealth>,
    /// Opaque kind-specific payload retained for display
    pub attributes: serde_json::Value,
}

impl GraphResource {
    /// Construct a bare resource; callers fill in paths and placement.
    pub fn new(global_id: impl Into<String>, kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            global_id: global_id.into(),
            kind,
            name: name.into(),
            cluster: String::new(),
            namespace: String::new(),
            application: None,
            created_at: None,
            app_path: None,
            cluster_path: None,
            health: None,
            attributes: serde_json::Value::Null,
        }
    }

    /// The breadcrumb path for the given hierarchy, if this resource has
    /// been placed in it.
    pub fn path(&self, hierarchy: Hierarchy) -> Option<&str> {
        match hierarchy {
            Hierarchy::App => self.app_path.as_deref(),
            Hierarchy::Cluster => self.cluster_path.as_deref(),
        }
    }
}

/// Which of the two parallel hierarchies a navigation request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Hierarchy {
    App,
    Cluster,
}

impl std::str::FromStr for Hierarchy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "app" => Ok(Hierarchy::App),
            "cluster" => Ok(Hierarchy::Cluster),
            _ => Err(format!("Unknown hierarchy: {} (expected app|cluster)", s)),
        }
    }
}

/// A directed parent -> child relation
///
/// (start_id, end_id) pairs are not unique in storage; duplicates are
/// tolerated on insert and deduplicated at read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub start_id: String,
    pub end_id: String,
    /// Kind-pair label, e.g. `"Deployment<-Pod"`, `"Root<-Cluster"`
    pub relation: String,
}

impl GraphEdge {
    pub fn new(
        start_id: impl Into<String>,
        end_id: impl Into<String>,
        parent_kind: ResourceKind,
        child_kind: ResourceKind,
    ) -> Self {
        Self {
            start_id: start_id.into(),
            end_id: end_id.into(),
            relation: format!("{}<-{}", parent_kind, child_kind),
        }
    }
}
