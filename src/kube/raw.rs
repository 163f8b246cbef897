//! Validated boundary types for listed Kubernetes objects
//!
//! Typed and dynamic objects both arrive here as `serde_json::Value`; parsing
//! pulls out the handful of fields the crawler reasons about and keeps the
//! rest as an opaque attribute blob. Objects missing a uid or name are
//! dropped with a debug log rather than failing the whole listing.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::health::classify_pod;
use crate::models::{PodHealth, ResourceKind};

/// A single owner reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerRef {
    pub uid: String,
    pub kind: String,
    pub name: String,
}

/// What a Deployable deploys
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deployer {
    /// Helm chart payload; resolution stops here
    Helm { chart_url: Option<String> },
    /// A concrete Kubernetes resource, searched for across all clusters
    Kube {
        kind: String,
        name: String,
        namespace: Option<String>,
    },
}

/// Kind-specific fields the inference engine needs
#[derive(Debug, Clone, PartialEq)]
pub enum RawExtras {
    None,
    Service {
        selector: BTreeMap<String, String>,
    },
    Pod {
        owners: Vec<OwnerRef>,
        labels: BTreeMap<String, String>,
        health: PodHealth,
    },
    ReplicaSet {
        owners: Vec<OwnerRef>,
    },
    Application {
        /// Deployable names from the deployables annotation
        deployables: Vec<String>,
    },
    Deployable {
        deployer: Option<Deployer>,
    },
}

/// One listed object, reduced to what the crawler consumes
#[derive(Debug, Clone, PartialEq)]
pub struct RawResource {
    pub uid: String,
    pub name: String,
    pub namespace: String,
    pub kind: ResourceKind,
    pub created_at: Option<DateTime<Utc>>,
    /// Full object payload, retained for display
    pub attributes: Value,
    pub extras: RawExtras,
}

impl RawResource {
    /// Parse one listed object. Returns None (with a debug log) when the
    /// object has no uid or name.
    ///
    /// `deployables_annotation` is the Application annotation holding the
    /// comma-separated Deployable names; ignored for other kinds.
    pub fn from_object(kind: ResourceKind, obj: &Value, deployables_annotation: &str) -> Option<Self> {
        let metadata = &obj["metadata"];
        let Some(uid) = metadata["uid"].as_str() else {
            debug!(kind = %kind, "skipping object without metadata.uid");
            return None;
        };
        let Some(name) = metadata["name"].as_str() else {
            debug!(kind = %kind, uid, "skipping object without metadata.name");
            return None;
        };
        let namespace = metadata["namespace"].as_str().unwrap_or_default();
        let created_at = metadata["creationTimestamp"]
            .as_str()
            .and_then(|ts| ts.parse::<DateTime<Utc>>().ok());

        let extras = match kind {
            ResourceKind::Service => RawExtras::Service {
                selector: string_map(&obj["spec"]["selector"]),
            },
            ResourceKind::Pod => RawExtras::Pod {
                owners: owner_refs(metadata),
                labels: string_map(&metadata["labels"]),
                health: classify_pod(obj),
            },
            ResourceKind::ReplicaSet => RawExtras::ReplicaSet {
                owners: owner_refs(metadata),
            },
            ResourceKind::Application => RawExtras::Application {
                deployables: annotation_list(metadata, deployables_annotation),
            },
            ResourceKind::Deployable => RawExtras::Deployable {
                deployer: parse_deployer(&obj["spec"]["deployer"]),
            },
            _ => RawExtras::None,
        };

        Some(Self {
            uid: uid.to_string(),
            name: name.to_string(),
            namespace: namespace.to_string(),
            kind,
            created_at,
            attributes: obj.clone(),
            extras,
        })
    }
}

fn string_map(value: &Value) -> BTreeMap<String, String> {
    value
        .as_object()
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

fn owner_refs(metadata: &Value) -> Vec<OwnerRef> {
    metadata["ownerReferences"]
        .as_array()
        .map(|refs| {
            refs.iter()
                .filter_map(|r| {
                    Some(OwnerRef {
                        uid: r["uid"].as_str()?.to_string(),
                        kind: r["kind"].as_str().unwrap_or_default().to_string(),
                        name: r["name"].as_str().unwrap_or_default().to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn annotation_list(metadata: &Value, key: &str) -> Vec<String> {
    metadata["annotations"][key]
        .as_str()
        .map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Parse `spec.deployer`. The `kind` field is either the literal `"helm"` or
/// the Kubernetes kind of the deployed resource, whose name comes from
/// `kube.template.metadata.name`.
fn parse_deployer(deployer: &Value) -> Option<Deployer> {
    let kind = deployer["kind"].as_str()?;
    if kind.eq_ignore_ascii_case("helm") {
        return Some(Deployer::Helm {
            chart_url: deployer["helm"]["chartURL"].as_str().map(str::to_string),
        });
    }
    let name = deployer["kube"]["template"]["metadata"]["name"].as_str()?;
    Some(Deployer::Kube {
        kind: kind.to_string(),
        name: name.to_string(),
        namespace: deployer["kube"]["namespace"].as_str().map(str::to_string),
    })
}
