//! Cluster listing boundary
//!
//! The crawler talks to clusters exclusively through the `ClusterApi` trait:
//! "list resources of a kind, optionally in a namespace". The production
//! implementation wraps a kube-rs client per kubeconfig context, using typed
//! APIs for built-in kinds and `DynamicObject` for the Application and
//! Deployable CRDs. Tests substitute mocks or fakes.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{Namespace, Pod, Service};
use kube::api::{Api, DynamicObject, ListParams};
use kube::core::ApiResource;
use kube::Client;
use serde::{Deserialize, Serialize};

use crate::kube::raw::RawResource;
use crate::models::ResourceKind;

/// Why a listing failed
#[derive(Debug, thiserror::Error)]
pub enum ListError {
    /// The kind is not served on this cluster (e.g. CRD not installed)
    #[error("kind not served: {0}")]
    NotFound(String),
    #[error("access forbidden: {0}")]
    Forbidden(String),
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<kube::Error> for ListError {
    fn from(err: kube::Error) -> Self {
        match &err {
            kube::Error::Api(resp) if resp.code == 404 => ListError::NotFound(resp.message.clone()),
            kube::Error::Api(resp) if resp.code == 403 => {
                ListError::Forbidden(resp.message.clone())
            }
            _ => ListError::Transport(err.to_string()),
        }
    }
}

/// API-group coordinates of a custom resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrdCoordinates {
    pub group: String,
    pub version: String,
    pub plural: String,
    pub kind: String,
}

impl CrdCoordinates {
    fn api_resource(&self) -> ApiResource {
        ApiResource {
            group: self.group.clone(),
            version: self.version.clone(),
            api_version: if self.group.is_empty() {
                self.version.clone()
            } else {
                format!("{}/{}", self.group, self.version)
            },
            kind: self.kind.clone(),
            plural: self.plural.clone(),
        }
    }
}

/// Listing interface for one cluster
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Kubeconfig context name, also the cluster's node id in the graph
    fn name(&self) -> &str;

    /// List all namespaces on the cluster
    async fn list_namespaces(&self) -> Result<Vec<RawResource>, ListError>;

    /// List all resources of a namespaced kind in one namespace
    async fn list_namespaced(
        &self,
        kind: ResourceKind,
        namespace: &str,
    ) -> Result<Vec<RawResource>, ListError>;
}

/// kube-rs backed implementation of `ClusterApi`
pub struct KubeClusterApi {
    name: String,
    client: Client,
    application_crd: CrdCoordinates,
    deployable_crd: CrdCoordinates,
    deployables_annotation: String,
}

impl KubeClusterApi {
    pub fn new(
        name: impl Into<String>,
        client: Client,
        application_crd: CrdCoordinates,
        deployable_crd: CrdCoordinates,
        deployables_annotation: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            client,
            application_crd,
            deployable_crd,
            deployables_annotation: deployables_annotation.into(),
        }
    }

    fn parse_items(
        &self,
        kind: ResourceKind,
        items: Vec<serde_json::Value>,
    ) -> Vec<RawResource> {
        items
            .iter()
            .filter_map(|obj| RawResource::from_object(kind, obj, &self.deployables_annotation))
            .collect()
    }

    async fn list_dynamic(
        &self,
        kind: ResourceKind,
        coordinates: &CrdCoordinates,
        namespace: &str,
    ) -> Result<Vec<RawResource>, ListError> {
        let ar = coordinates.api_resource();
        let api: Api<DynamicObject> = Api::namespaced_with(self.client.clone(), namespace, &ar);
        let list = api.list(&ListParams::default()).await?;
        let items = list
            .items
            .iter()
            .filter_map(|obj| serde_json::to_value(obj).ok())
            .collect();
        Ok(self.parse_items(kind, items))
    }
}

macro_rules! list_typed {
    ($self:expr, $kind:expr, $namespace:expr, $type:ty) => {{
        let api: Api<$type> = Api::namespaced($self.client.clone(), $namespace);
        let list = api.list(&ListParams::default()).await?;
        let items = list
            .items
            .iter()
            .filter_map(|obj| serde_json::to_value(obj).ok())
            .collect();
        Ok($self.parse_items($kind, items))
    }};
}

#[async_trait]
impl ClusterApi for KubeClusterApi {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_namespaces(&self) -> Result<Vec<RawResource>, ListError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let list = api.list(&ListParams::default()).await?;
        let items = list
            .items
            .iter()
            .filter_map(|obj| serde_json::to_value(obj).ok())
            .collect();
        Ok(self.parse_items(ResourceKind::Namespace, items))
    }

    async fn list_namespaced(
        &self,
        kind: ResourceKind,
        namespace: &str,
    ) -> Result<Vec<RawResource>, ListError> {
        match kind {
            ResourceKind::Deployment => list_typed!(self, kind, namespace, Deployment),
            ResourceKind::ReplicaSet => list_typed!(self, kind, namespace, ReplicaSet),
            ResourceKind::DaemonSet => list_typed!(self, kind, namespace, DaemonSet),
            ResourceKind::StatefulSet => list_typed!(self, kind, namespace, StatefulSet),
            ResourceKind::Job => list_typed!(self, kind, namespace, Job),
            ResourceKind::Service => list_typed!(self, kind, namespace, Service),
            ResourceKind::Pod => list_typed!(self, kind, namespace, Pod),
            ResourceKind::Application => {
                let crd = self.application_crd.clone();
                self.list_dynamic(kind, &crd, namespace).await
            }
            ResourceKind::Deployable => {
                let crd = self.deployable_crd.clone();
                self.list_dynamic(kind, &crd, namespace).await
            }
            other => Err(ListError::NotFound(format!(
                "{} is not a listable namespaced kind",
                other
            ))),
        }
    }
}
