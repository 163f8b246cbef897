//! Resource kind definitions
//!
//! This module provides a centralized enum for every resource kind tracked in
//! the graph. This eliminates hardcoded strings throughout the codebase and
//! provides type safety for kind references.

use std::fmt;
use std::str::FromStr;

use crate::models::Hierarchy;

/// Enumeration of all resource kinds tracked in the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ResourceKind {
    /// Synthetic root of both hierarchies
    Root,
    /// Synthetic per-kubeconfig-context cluster node
    Cluster,
    Namespace,
    // Application hierarchy CRDs
    Application,
    Deployable,
    // Namespaced workloads
    Deployment,
    Service,
    ReplicaSet,
    DaemonSet,
    StatefulSet,
    Job,
    Pod,
    /// Helm-deployed payload of a Deployable (never resolved further)
    Helm,
}

impl ResourceKind {
    /// Get the display name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Root => "Root",
            ResourceKind::Cluster => "Cluster",
            ResourceKind::Namespace => "Namespace",
            ResourceKind::Application => "Application",
            ResourceKind::Deployable => "Deployable",
            ResourceKind::Deployment => "Deployment",
            ResourceKind::Service => "Service",
            ResourceKind::ReplicaSet => "ReplicaSet",
            ResourceKind::DaemonSet => "DaemonSet",
            ResourceKind::StatefulSet => "StatefulSet",
            ResourceKind::Job => "Job",
            ResourceKind::Pod => "Pod",
            ResourceKind::Helm => "Helm",
        }
    }

    /// Try to parse a string into a ResourceKind, returning None if invalid
    pub fn parse_optional(s: &str) -> Option<Self> {
        s.parse().ok()
    }

    /// Try to parse a string (case-insensitive, plural-tolerant) into a ResourceKind
    ///
    /// Used by the `kind:` search filter where users type lowercase.
    pub fn from_str_case_insensitive(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cluster" | "clusters" => Some(ResourceKind::Cluster),
            "namespace" | "namespaces" | "ns" => Some(ResourceKind::Namespace),
            "application" | "applications" | "app" => Some(ResourceKind::Application),
            "deployable" | "deployables" | "dpb" => Some(ResourceKind::Deployable),
            "deployment" | "deployments" | "deploy" => Some(ResourceKind::Deployment),
            "service" | "services" | "svc" => Some(ResourceKind::Service),
            "replicaset" | "replicasets" | "rs" => Some(ResourceKind::ReplicaSet),
            "daemonset" | "daemonsets" | "ds" => Some(ResourceKind::DaemonSet),
            "statefulset" | "statefulsets" | "sts" => Some(ResourceKind::StatefulSet),
            "job" | "jobs" => Some(ResourceKind::Job),
            "pod" | "pods" | "po" => Some(ResourceKind::Pod),
            "helm" => Some(ResourceKind::Helm),
            _ => None,
        }
    }

    /// The namespaced workload kinds listed directly under a Namespace
    pub fn namespace_workloads() -> &'static [Self] {
        &[
            ResourceKind::Deployment,
            ResourceKind::Service,
            ResourceKind::DaemonSet,
            ResourceKind::StatefulSet,
            ResourceKind::Job,
        ]
    }

    /// Reconciliation dependency order: a kind's writes must complete before
    /// any kind that resolves parents against it is processed.
    pub fn reconcile_order() -> &'static [Self] {
        &[
            ResourceKind::Cluster,
            ResourceKind::Namespace,
            ResourceKind::Application,
            ResourceKind::Deployable,
            ResourceKind::Helm,
            ResourceKind::Deployment,
            ResourceKind::Service,
            ResourceKind::DaemonSet,
            ResourceKind::StatefulSet,
            ResourceKind::Job,
            ResourceKind::ReplicaSet,
            ResourceKind::Pod,
        ]
    }

    /// Whether this kind can own Pods through an owner reference
    pub fn is_pod_controller(&self) -> bool {
        matches!(
            self,
            ResourceKind::ReplicaSet
                | ResourceKind::DaemonSet
                | ResourceKind::StatefulSet
                | ResourceKind::Job
        )
    }

    /// Whether resources of this kind live inside a namespace
    pub fn is_namespaced(&self) -> bool {
        !matches!(
            self,
            ResourceKind::Root | ResourceKind::Cluster | ResourceKind::Helm
        )
    }

    /// Whether this kind belongs in the given hierarchy. The app chain skips
    /// ReplicaSets (and never shows clusters or namespaces); cluster
    /// navigation never shows the application CRDs or synthetic Helm nodes.
    pub fn in_hierarchy(&self, hierarchy: Hierarchy) -> bool {
        match hierarchy {
            Hierarchy::App => !matches!(
                self,
                ResourceKind::Cluster | ResourceKind::Namespace | ResourceKind::ReplicaSet
            ),
            Hierarchy::Cluster => !matches!(
                self,
                ResourceKind::Application | ResourceKind::Deployable | ResourceKind::Helm
            ),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<ResourceKind> for String {
    fn from(kind: ResourceKind) -> Self {
        kind.as_str().to_string()
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Root" => Ok(ResourceKind::Root),
            "Cluster" => Ok(ResourceKind::Cluster),
            "Namespace" => Ok(ResourceKind::Namespace),
            "Application" => Ok(ResourceKind::Application),
            "Deployable" => Ok(ResourceKind::Deployable),
            "Deployment" => Ok(ResourceKind::Deployment),
            "Service" => Ok(ResourceKind::Service),
            "ReplicaSet" => Ok(ResourceKind::ReplicaSet),
            "DaemonSet" => Ok(ResourceKind::DaemonSet),
            "StatefulSet" => Ok(ResourceKind::StatefulSet),
            "Job" => Ok(ResourceKind::Job),
            "Pod" => Ok(ResourceKind::Pod),
            "Helm" => Ok(ResourceKind::Helm),
            _ => Err(format!("Unknown resource kind: {}", s)),
        }
    }
}
