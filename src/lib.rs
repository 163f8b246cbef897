//! kompass - a multi-cluster Kubernetes resource graph
//!
//! Crawls every configured cluster, materializes the resources into one graph
//! with two parallel hierarchies (application-centric and cluster-centric),
//! and serves navigation, search, and pod-health queries over it.

pub mod config;
pub mod crawler;
pub mod graph;
pub mod health;
pub mod kube;
pub mod models;
pub mod query;

pub use config::{ConfigLoader, Settings};
pub use crawler::{CrawlOrchestrator, CrawlReport};
pub use graph::{GraphStore, Reconciler};
pub use kube::ClusterRegistry;
pub use query::QueryService;
