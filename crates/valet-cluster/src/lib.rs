//! Valet Cluster - control planes and multi-cluster orchestration
//!
//! This crate provides:
//! - **Cluster drivers**: GKE, EKS, minikube and kind behind [`ClusterDriver`]
//! - **Cluster resources**: create-or-reuse, destroy and context switching
//! - **Multi-cluster**: one workflow per cluster, sequential or in parallel
//! - **Config**: the top-level [`ValetConfig`] document

pub mod cluster;
pub mod config;
pub mod driver;
pub mod eks;
pub mod error;
pub mod gke;
pub mod kind;
pub mod minikube;
pub mod multi;

pub use cluster::{ClusterKind, ClusterResource};
pub use config::ValetConfig;
pub use driver::{ClusterDriver, ClusterStatus};
pub use eks::EksCluster;
pub use error::{ClusterError, Result};
pub use gke::GkeCluster;
pub use kind::KindCluster;
pub use minikube::MinikubeCluster;
pub use multi::{ClusterWorkflow, MultiClusterConfig};
