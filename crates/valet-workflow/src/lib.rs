//! Valet Workflow - resources, applications and workflows
//!
//! This crate provides:
//! - **Resources**: namespaces, secrets, manifests, templates, helm charts and
//!   patches behind one [`Deployable`] contract
//! - **Applications**: ordered resource sets installed front-to-back and
//!   removed back-to-front
//! - **Workflows**: ordered steps mixing deployments with readiness
//!   conditions, HTTP checks and DNS records
//! - **Ingress**: service address lookup through kubectl

pub mod error;
pub mod ingress;
pub mod resource;
pub mod workflow;

pub use error::{Result, WorkflowError};
pub use ingress::{KubectlIngress, bare_ip, ingress_host};
pub use resource::{
    Application, ApplicationRef, Deployable, GcloudKmsEncryptedFile, HelmChart, Manifest,
    Namespace, Patch, Resource, ResourceKind, Secret, SecretSource, Template, join_documents,
};
pub use workflow::{Condition, Curl, DnsEntry, Step, StepKind, Workflow, WorkflowRef};
