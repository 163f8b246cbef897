//! Shared test fixtures: an in-memory cluster the orchestrator can crawl

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use kompass::kube::{ClusterApi, ListError, RawResource};
use kompass::models::ResourceKind;

pub const ANNOTATION: &str = "apps.ibm.com/deployables";

/// A scriptable cluster: tests stock its listings and can flip it into a
/// failing state between crawl cycles.
pub struct FakeCluster {
    name: String,
    state: Mutex<FakeState>,
}

#[derive(Default)]
struct FakeState {
    fail: bool,
    hang: bool,
    namespaces: Vec<RawResource>,
    listings: HashMap<(ResourceKind, String), Vec<RawResource>>,
}

impl FakeCluster {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            state: Mutex::new(FakeState::default()),
        })
    }

    pub fn set_fail(&self, fail: bool) {
        self.state.lock().unwrap().fail = fail;
    }

    /// Make `list_namespaces` stall past any reasonable probe timeout
    #[allow(dead_code)]
    pub fn set_hang(&self, hang: bool) {
        self.state.lock().unwrap().hang = hang;
    }

    pub fn add_namespace(&self, uid: &str, name: &str) {
        let ns = raw(
            ResourceKind::Namespace,
            json!({ "metadata": { "uid": uid, "name": name } }),
        );
        self.state.lock().unwrap().namespaces.push(ns);
    }

    pub fn put(&self, kind: ResourceKind, namespace: &str, items: Vec<RawResource>) {
        self.state
            .lock()
            .unwrap()
            .listings
            .insert((kind, namespace.to_string()), items);
    }
}

#[async_trait]
impl ClusterApi for FakeCluster {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_namespaces(&self) -> Result<Vec<RawResource>, ListError> {
        let (fail, hang, namespaces) = {
            let state = self.state.lock().unwrap();
            (state.fail, state.hang, state.namespaces.clone())
        };
        if hang {
            tokio::time::sleep(Duration::from_secs(300)).await;
        }
        if fail {
            return Err(ListError::Transport("connection refused".to_string()));
        }
        Ok(namespaces)
    }

    async fn list_namespaced(
        &self,
        kind: ResourceKind,
        namespace: &str,
    ) -> Result<Vec<RawResource>, ListError> {
        let state = self.state.lock().unwrap();
        if state.fail {
            return Err(ListError::Transport("connection refused".to_string()));
        }
        Ok(state
            .listings
            .get(&(kind, namespace.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

pub fn raw(kind: ResourceKind, obj: Value) -> RawResource {
    RawResource::from_object(kind, &obj, ANNOTATION).unwrap()
}

pub fn application(uid: &str, name: &str, ns: &str, deployables: &str) -> RawResource {
    raw(
        ResourceKind::Application,
        json!({
            "metadata": {
                "uid": uid, "name": name, "namespace": ns,
                "annotations": { ANNOTATION: deployables }
            }
        }),
    )
}

pub fn deployable_for_deployment(uid: &str, name: &str, ns: &str, target: &str) -> RawResource {
    raw(
        ResourceKind::Deployable,
        json!({
            "metadata": { "uid": uid, "name": name, "namespace": ns },
            "spec": { "deployer": {
                "kind": "Deployment",
                "kube": { "template": { "metadata": { "name": target } } }
            } }
        }),
    )
}

pub fn deployment(uid: &str, name: &str, ns: &str) -> RawResource {
    raw(
        ResourceKind::Deployment,
        json!({ "metadata": { "uid": uid, "name": name, "namespace": ns } }),
    )
}

pub fn service(uid: &str, name: &str, ns: &str, selector: Value) -> RawResource {
    raw(
        ResourceKind::Service,
        json!({
            "metadata": { "uid": uid, "name": name, "namespace": ns },
            "spec": { "selector": selector }
        }),
    )
}

pub fn replica_set(uid: &str, name: &str, ns: &str, owner_uid: &str) -> RawResource {
    raw(
        ResourceKind::ReplicaSet,
        json!({
            "metadata": {
                "uid": uid, "name": name, "namespace": ns,
                "ownerReferences": [
                    { "uid": owner_uid, "kind": "Deployment", "name": "owner" }
                ]
            }
        }),
    )
}

pub fn pod(uid: &str, name: &str, ns: &str, owner_uid: &str, labels: Value) -> RawResource {
    raw(
        ResourceKind::Pod,
        json!({
            "metadata": {
                "uid": uid, "name": name, "namespace": ns,
                "labels": labels,
                "ownerReferences": [
                    { "uid": owner_uid, "kind": "ReplicaSet", "name": "owner" }
                ]
            },
            "status": { "phase": "Running" }
        }),
    )
}

pub fn crashing_pod(uid: &str, name: &str, ns: &str) -> RawResource {
    raw(
        ResourceKind::Pod,
        json!({
            "metadata": { "uid": uid, "name": name, "namespace": ns },
            "status": {
                "phase": "Running",
                "containerStatuses": [{
                    "name": "main",
                    "state": { "waiting": { "reason": "CrashLoopBackOff" } }
                }]
            }
        }),
    )
}

/// Stock a cluster with the full chain: application "shop" claiming
/// deployable "frontend", deployed as deployment "web" with one replicaset,
/// one pod, and a service selecting it.
pub fn stock_shop_cluster(cluster: &FakeCluster) {
    cluster.add_namespace("ns-uid", "shop-ns");
    cluster.put(
        ResourceKind::Application,
        "shop-ns",
        vec![application("app-uid", "shop", "shop-ns", "frontend")],
    );
    cluster.put(
        ResourceKind::Deployable,
        "shop-ns",
        vec![deployable_for_deployment(
            "dpb-uid", "frontend", "shop-ns", "web",
        )],
    );
    cluster.put(
        ResourceKind::Deployment,
        "shop-ns",
        vec![deployment("dep-uid", "web", "shop-ns")],
    );
    cluster.put(
        ResourceKind::Service,
        "shop-ns",
        vec![service("svc-uid", "web-svc", "shop-ns", json!({"app": "web"}))],
    );
    cluster.put(
        ResourceKind::ReplicaSet,
        "shop-ns",
        vec![replica_set("rs-uid", "web-rs", "shop-ns", "dep-uid")],
    );
    cluster.put(
        ResourceKind::Pod,
        "shop-ns",
        vec![pod(
            "pod-uid",
            "web-rs-x1",
            "shop-ns",
            "rs-uid",
            json!({"app": "web"}),
        )],
    );
}
