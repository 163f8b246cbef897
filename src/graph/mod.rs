//! Graph materialization: identity, paths, storage, reconciliation

pub mod identity;
pub mod paths;
pub mod reconcile;
pub mod store;

pub use identity::{ROOT_ID, cluster_id, global_id};
pub use paths::{ROOT_PATH, ancestor_ids, assign_paths, child_path};
pub use reconcile::{AppPlacement, ReconcileOutcome, ReconcileScope, Reconciler};
pub use store::GraphStore;
