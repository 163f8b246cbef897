//! Configuration schema definitions
//!
//! Defines the structure of the config file using serde for serialization.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::kube::CrdCoordinates;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Seconds between full crawl cycles
    #[serde(default = "default_crawl_interval_secs")]
    pub crawl_interval_secs: u64,

    /// Seconds allowed for the per-cluster liveness probe before the cluster
    /// is treated as unreachable for the cycle
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// Kubeconfig path override; unset means the default loading chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<PathBuf>,

    /// Context allow-list; empty means every context in the kubeconfig
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clusters: Vec<String>,

    /// Coordinates of the Application custom resource
    #[serde(default = "default_application_crd")]
    pub application_crd: CrdCoordinates,

    /// Coordinates of the Deployable custom resource
    #[serde(default = "default_deployable_crd")]
    pub deployable_crd: CrdCoordinates,

    /// Application annotation listing its Deployable names, comma-separated
    #[serde(default = "default_deployables_annotation")]
    pub deployables_annotation: String,
}

impl Settings {
    pub fn crawl_interval(&self) -> Duration {
        Duration::from_secs(self.crawl_interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

// Default value functions
fn default_crawl_interval_secs() -> u64 {
    300
}

fn default_probe_timeout_secs() -> u64 {
    10
}

fn default_application_crd() -> CrdCoordinates {
    CrdCoordinates {
        group: "app.k8s.io".to_string(),
        version: "v1beta1".to_string(),
        plural: "applications".to_string(),
        kind: "Application".to_string(),
    }
}

fn default_deployable_crd() -> CrdCoordinates {
    CrdCoordinates {
        group: "mcm.ibm.com".to_string(),
        version: "v1alpha1".to_string(),
        plural: "deployables".to_string(),
        kind: "Deployable".to_string(),
    }
}

fn default_deployables_annotation() -> String {
    "apps.ibm.com/deployables".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            crawl_interval_secs: default_crawl_interval_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
            kubeconfig: None,
            clusters: Vec::new(),
            application_crd: default_application_crd(),
            deployable_crd: default_deployable_crd(),
            deployables_annotation: default_deployables_annotation(),
        }
    }
}
