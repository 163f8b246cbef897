//! Relationship inference
//!
//! Derives parent-child relations from what the objects themselves carry:
//! owner references for controller chains, label selectors for services,
//! annotations and deployer specs for the application side. All choices here
//! are deterministic so repeated crawls infer the same graph.

use std::collections::BTreeMap;

use tracing::debug;

use crate::kube::raw::{Deployer, OwnerRef, RawExtras, RawResource};

/// Index of the owner reference that determines a resource's parent when it
/// carries more than one.
pub const FIRST_OWNER_WINS: usize = 0;

/// The owner reference used for parent resolution
pub fn primary_owner(owners: &[OwnerRef]) -> Option<&OwnerRef> {
    if owners.len() > 1 {
        debug!(
            count = owners.len(),
            chosen = %owners[FIRST_OWNER_WINS].name,
            "multiple owner references, using the first"
        );
    }
    owners.get(FIRST_OWNER_WINS)
}

/// Whether a service selector selects the given pod labels.
///
/// Selection is superset matching: every selector entry must be present in
/// the labels with the same value. An empty selector selects nothing.
pub fn selector_matches(
    selector: &BTreeMap<String, String>,
    labels: &BTreeMap<String, String>,
) -> bool {
    if selector.is_empty() {
        return false;
    }
    selector
        .iter()
        .all(|(key, value)| labels.get(key) == Some(value))
}

/// The service a pod is attributed to: the matching service that is first in
/// lexicographic name order, so the choice does not depend on listing order.
pub fn service_for_pod<'a>(
    services: &'a [RawResource],
    labels: &BTreeMap<String, String>,
) -> Option<&'a RawResource> {
    services
        .iter()
        .filter(|svc| match &svc.extras {
            RawExtras::Service { selector } => selector_matches(selector, labels),
            _ => false,
        })
        .min_by(|a, b| a.name.cmp(&b.name))
}

/// Deployable names an Application claims through its annotation
pub fn deployable_names(application: &RawResource) -> &[String] {
    match &application.extras {
        RawExtras::Application { deployables } => deployables,
        _ => &[],
    }
}

/// The deployer of a Deployable, if its spec parsed
pub fn deployer_of(deployable: &RawResource) -> Option<&Deployer> {
    match &deployable.extras {
        RawExtras::Deployable { deployer } => deployer.as_ref(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResourceKind;
    use serde_json::json;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn service(name: &str, selector: &[(&str, &str)]) -> RawResource {
        let obj = json!({
            "metadata": { "uid": format!("uid-{}", name), "name": name, "namespace": "ns" },
            "spec": { "selector": selector.iter().cloned().collect::<BTreeMap<_, _>>() }
        });
        RawResource::from_object(ResourceKind::Service, &obj, "apps.ibm.com/deployables").unwrap()
    }

    #[test]
    fn test_selector_subset_matches() {
        let selector = labels(&[("app", "web")]);
        let pod = labels(&[("app", "web"), ("tier", "front")]);
        assert!(selector_matches(&selector, &pod));
    }

    #[test]
    fn test_selector_value_mismatch() {
        let selector = labels(&[("app", "web")]);
        let pod = labels(&[("app", "db")]);
        assert!(!selector_matches(&selector, &pod));
    }

    #[test]
    fn test_selector_missing_key() {
        let selector = labels(&[("app", "web"), ("tier", "front")]);
        let pod = labels(&[("app", "web")]);
        assert!(!selector_matches(&selector, &pod));
    }

    #[test]
    fn test_empty_selector_matches_nothing() {
        let selector = BTreeMap::new();
        let pod = labels(&[("app", "web")]);
        assert!(!selector_matches(&selector, &pod));
    }

    #[test]
    fn test_service_tie_break_is_lexicographic() {
        let services = vec![
            service("zeta", &[("app", "web")]),
            service("alpha", &[("app", "web")]),
            service("mid", &[("app", "other")]),
        ];
        let pod = labels(&[("app", "web")]);
        let chosen = service_for_pod(&services, &pod).unwrap();
        assert_eq!(chosen.name, "alpha");
    }

    #[test]
    fn test_no_matching_service() {
        let services = vec![service("a", &[("app", "web")])];
        let pod = labels(&[("app", "db")]);
        assert!(service_for_pod(&services, &pod).is_none());
    }

    #[test]
    fn test_primary_owner_is_first() {
        let owners = vec![
            OwnerRef {
                uid: "u1".to_string(),
                kind: "ReplicaSet".to_string(),
                name: "rs-1".to_string(),
            },
            OwnerRef {
                uid: "u2".to_string(),
                kind: "ReplicaSet".to_string(),
                name: "rs-2".to_string(),
            },
        ];
        assert_eq!(primary_owner(&owners).unwrap().uid, "u1");
        assert!(primary_owner(&[]).is_none());
    }
}
