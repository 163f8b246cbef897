//! Global identity resolution
//!
//! Kubernetes UIDs are only unique within a cluster, so every discovered
//! resource is keyed by `<cluster>_<uid>`. Synthetic nodes use sentinel ids:
//! a cluster node's id is the bare cluster name, the shared root is `"root"`.

/// Id of the synthetic root node shared by both hierarchies
pub const ROOT_ID: &str = "root";

/// Process-wide unique id for a discovered resource
pub fn global_id(cluster: &str, uid: &str) -> String {
    format!("{}_{}", cluster, uid)
}

/// Id of the synthetic cluster node for a kubeconfig context
pub fn cluster_id(cluster: &str) -> String {
    cluster.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_id_combines_cluster_and_uid() {
        assert_eq!(global_id("prod-east", "abc-123"), "prod-east_abc-123");
    }

    #[test]
    fn test_same_uid_on_different_clusters_stays_distinct() {
        let uid = "5f2c9f0e-bd51-4c29-a2df-0f8f7a4a1a77";
        assert_ne!(global_id("c1", uid), global_id("c2", uid));
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(global_id("c1", "u1"), global_id("c1", "u1"));
    }

    #[test]
    fn test_cluster_id_is_the_name() {
        assert_eq!(cluster_id("c1"), "c1");
        assert_ne!(cluster_id("c1"), ROOT_ID);
    }
}
