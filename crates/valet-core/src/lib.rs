//! Valet Core - Core types for the Valet orchestration engine
//!
//! This crate provides the foundational types used throughout Valet:
//! - `Values` / `Flags`: layered key/value configuration with first-write-wins merge
//! - `InputParams`: the immutable snapshot threaded through every ensure/teardown call
//! - `cmd`: external tool invocations behind an injectable `Runner`
//! - `Registry`: named resolvers of relative paths to file content
//! - `wait`: cancellable sleeps and polling loops

pub mod cmd;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod params;
pub mod registry;
pub mod values;
pub mod wait;

pub use cmd::{Command, HttpRequest, HttpResponse, MockRunner, ProcessRunner, Runner};
pub use collaborators::{ArtifactDownloader, DnsClient, HttpDownloader, IngressClient, ServiceRef};
pub use config::{GlobalConfig, RegistryConfig};
pub use error::{CoreError, Result};
pub use params::{Collaborators, InputParams};
pub use registry::{DEFAULT_REGISTRY, DirectoryRegistry, Registries, Registry, StaticRegistry};
pub use values::{Flags, Values};
