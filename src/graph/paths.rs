//! Hierarchy path construction
//!
//! Each resource carries up to two breadcrumb paths, one per hierarchy. A path
//! lists the ids of every ancestor from the root down, slash-delimited with a
//! trailing slash: a pod three levels deep reads
//! `/root/<cluster>/<namespace-id>/<owner-id>/`. Paths are assigned with an
//! explicit work queue walked from the root, so a child is only placed after
//! its parent is; resources whose parent never receives a path stay unplaced.

use std::collections::{HashMap, VecDeque};

use crate::graph::identity::ROOT_ID;

/// Path of the synthetic root's direct children
pub const ROOT_PATH: &str = "/root/";

/// Breadcrumb path of a child given its parent's path and id
pub fn child_path(parent_path: &str, parent_id: &str) -> String {
    format!("{}{}/", parent_path, parent_id)
}

/// Assign a breadcrumb path to every node reachable from the root.
///
/// `parent_of` maps each node id to its single parent id in one hierarchy
/// (the root itself is never a key). Returns the id -> path map; nodes whose
/// ancestor chain does not reach the root are absent from the result.
pub fn assign_paths(parent_of: &HashMap<String, String>) -> HashMap<String, String> {
    let mut children_of: HashMap<&str, Vec<&str>> = HashMap::new();
    for (child, parent) in parent_of {
        children_of.entry(parent.as_str()).or_default().push(child);
    }

    let mut paths: HashMap<String, String> = HashMap::new();
    let mut queue: VecDeque<(&str, String)> = VecDeque::new();
    queue.push_back((ROOT_ID, "/".to_string()));

    while let Some((id, path)) = queue.pop_front() {
        if let Some(children) = children_of.get(id) {
            for child in children {
                let p = child_path(&path, id);
                queue.push_back((child, p.clone()));
                paths.insert((*child).to_string(), p);
            }
        }
    }

    paths
}

/// Ancestor ids encoded in a path, outermost first
///
/// `/root/c1/c1_ns/` yields `["root", "c1", "c1_ns"]`.
pub fn ancestor_ids(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}
