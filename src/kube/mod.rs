//! Kubernetes access layer
//!
//! Builds one client per kubeconfig context and exposes the set as a
//! `ClusterRegistry`. The rest of the crate never touches kube-rs directly;
//! everything goes through the `ClusterApi` trait so tests can inject fakes.

pub mod api;
pub mod raw;

use std::sync::Arc;

use anyhow::{Context, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::{info, warn};

pub use api::{ClusterApi, CrdCoordinates, KubeClusterApi, ListError};
pub use raw::{Deployer, OwnerRef, RawExtras, RawResource};

use crate::config::Settings;

/// The set of clusters a crawl cycle covers
#[derive(Clone)]
pub struct ClusterRegistry {
    clusters: Vec<Arc<dyn ClusterApi>>,
}

impl ClusterRegistry {
    pub fn new(clusters: Vec<Arc<dyn ClusterApi>>) -> Self {
        Self { clusters }
    }

    /// One cluster per kubeconfig context, filtered by the configured
    /// allow-list when one is set.
    pub async fn from_kubeconfig(settings: &Settings) -> Result<Self> {
        let kubeconfig = match &settings.kubeconfig {
            Some(path) => Kubeconfig::read_from(path)
                .with_context(|| format!("reading kubeconfig at {}", path.display()))?,
            None => Kubeconfig::read().context("reading default kubeconfig")?,
        };

        let mut clusters: Vec<Arc<dyn ClusterApi>> = Vec::new();
        for context in &kubeconfig.contexts {
            let name = context.name.clone();
            if !settings.clusters.is_empty() && !settings.clusters.contains(&name) {
                continue;
            }
            let options = KubeConfigOptions {
                context: Some(name.clone()),
                ..Default::default()
            };
            let config = Config::from_custom_kubeconfig(kubeconfig.clone(), &options)
                .await
                .with_context(|| format!("building client config for context {}", name))?;
            let client =
                Client::try_from(config).with_context(|| format!("building client for {}", name))?;
            info!(cluster = %name, "registered cluster");
            clusters.push(Arc::new(KubeClusterApi::new(
                name,
                client,
                settings.application_crd.clone(),
                settings.deployable_crd.clone(),
                settings.deployables_annotation.clone(),
            )));
        }

        if clusters.is_empty() {
            warn!("no kubeconfig contexts matched; the graph will stay empty");
        }
        Ok(Self::new(clusters))
    }

    pub fn names(&self) -> Vec<String> {
        self.clusters.iter().map(|c| c.name().to_string()).collect()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ClusterApi>> {
        self.clusters.iter().find(|c| c.name() == name).cloned()
    }

    pub fn clusters(&self) -> &[Arc<dyn ClusterApi>] {
        &self.clusters
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }
}
