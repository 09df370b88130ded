//! The contract every cluster provider implements

use async_trait::async_trait;
use valet_core::InputParams;
use valet_core::wait::{self, PollConfig};
use valet_engine::{Bindings, Resolver};

use crate::error::Result;

/// What a provider reports about a cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterStatus {
    /// No cluster by that name
    Absent,
    /// The cluster exists but is not serving: provisioning, reconciling,
    /// stopped or in error
    Pending,
    Running,
}

/// Control-plane lifecycle of one cluster
///
/// Implementations are plain configuration structs. They are bound against
/// the caller's values before use, so a driver never outlives one call.
#[async_trait]
pub trait ClusterDriver: Send + Sync {
    /// Human-readable identity for logs
    fn describe(&self) -> String;

    async fn status(&self, input: &InputParams) -> Result<ClusterStatus>;

    /// Create the cluster and block until it is usable
    async fn create(&self, input: &InputParams) -> Result<()>;

    /// Block until a [`ClusterStatus::Pending`] cluster is running
    async fn await_running(&self, input: &InputParams) -> Result<()>;

    async fn destroy(&self, input: &InputParams) -> Result<()>;

    /// Write the cluster's credentials to the local kubeconfig
    async fn get_credentials(&self, input: &InputParams) -> Result<()>;

    /// Name of the kubeconfig context [`ClusterDriver::get_credentials`] writes
    async fn context(&self, input: &InputParams) -> Result<String>;
}

/// A copy of `driver` with every bound field resolved
pub(crate) async fn bind<T>(driver: &T, input: &InputParams) -> Result<T>
where
    T: Bindings + Clone + Sync,
{
    let mut bound = driver.clone();
    Resolver::new(input).render_fields(&mut bound).await?;
    Ok(bound)
}

/// Polling bounds from a driver's `operationInterval` and `operationTimeout`
pub(crate) fn poll_config(interval: &str, timeout: &str) -> Result<PollConfig> {
    Ok(PollConfig::new(
        wait::parse_duration("operationInterval", interval)?,
        wait::parse_duration("operationTimeout", timeout)?,
    ))
}
