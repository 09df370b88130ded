//! Google Kubernetes Engine clusters through `gcloud container`

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use valet_core::cmd::Gcloud;
use valet_core::wait;
use valet_core::{Command, InputParams};
use valet_engine::{Bindings, Field};

use crate::driver::{ClusterDriver, ClusterStatus, poll_config};
use crate::error::{ClusterError, Result, is_not_found};

const NOT_FOUND: &[&str] = &["NOT_FOUND", "was not found"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct GkeCluster {
    /// Falls back to the `ClusterName` value
    pub name: String,
    /// Falls back to the `GcloudProject` value
    pub project: String,
    /// `us-central1-a` when unset
    pub zone: String,
    pub num_nodes: String,
    pub machine_type: String,
    pub cluster_version: String,
    /// Delay between operation status checks, `10s` when unset
    pub operation_interval: String,
    /// How long creation may take, `30m` when unset
    pub operation_timeout: String,
}

impl Bindings for GkeCluster {
    fn fields(&mut self) -> Vec<Field<'_>> {
        vec![
            Field::new("name", &mut self.name)
                .key("ClusterName")
                .template(),
            Field::new("project", &mut self.project)
                .key("GcloudProject")
                .template(),
            Field::new("zone", &mut self.zone)
                .default("us-central1-a")
                .template(),
            Field::new("numNodes", &mut self.num_nodes).template(),
            Field::new("machineType", &mut self.machine_type).template(),
            Field::new("clusterVersion", &mut self.cluster_version).template(),
            Field::new("operationInterval", &mut self.operation_interval).default("10s"),
            Field::new("operationTimeout", &mut self.operation_timeout).default("30m"),
        ]
    }
}

impl GkeCluster {
    fn scoped(&self, cmd: Gcloud) -> Command {
        cmd.project(&self.project).zone(&self.zone).build()
    }

    /// Raw cluster status, `None` when the cluster does not exist
    async fn raw_status(&self, input: &InputParams) -> valet_core::Result<Option<String>> {
        let cmd = self.scoped(Gcloud::describe_cluster(&self.name).format("value(status)"));
        match input.output(&cmd).await {
            Ok(status) => Ok(Some(status.trim().to_string())),
            Err(e) if is_not_found(&e, NOT_FOUND) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn wait_for_operation(&self, input: &InputParams, operation: &str) -> Result<()> {
        let poll = poll_config(&self.operation_interval, &self.operation_timeout)?;
        let cmd = self.scoped(Gcloud::describe_operation(operation).format("value(status)"));

        let done = wait::poll_until(poll, &input.cancel, || {
            let cmd = &cmd;
            async move {
                let status = input.output(cmd).await?;
                debug!(operation, status = status.trim(), "gke operation status");
                Ok(status.trim() == "DONE")
            }
        })
        .await?;

        if done {
            return Ok(());
        }
        Err(ClusterError::Timeout {
            operation: format!("creation of GKE cluster {}", self.name),
            timeout: self.operation_timeout.clone(),
        })
    }
}

#[async_trait]
impl ClusterDriver for GkeCluster {
    fn describe(&self) -> String {
        format!("gke {}/{}/{}", self.project, self.zone, self.name)
    }

    async fn status(&self, input: &InputParams) -> Result<ClusterStatus> {
        Ok(match self.raw_status(input).await?.as_deref() {
            None => ClusterStatus::Absent,
            Some("RUNNING") => ClusterStatus::Running,
            Some(other) => {
                debug!(cluster = %self.name, status = other, "gke cluster not running");
                ClusterStatus::Pending
            }
        })
    }

    async fn create(&self, input: &InputParams) -> Result<()> {
        let cmd = Gcloud::create_cluster_async(&self.name)
            .project(&self.project)
            .zone(&self.zone)
            .opt("--num-nodes", &self.num_nodes)
            .opt("--machine-type", &self.machine_type)
            .opt("--cluster-version", &self.cluster_version)
            .build();
        let operation = input.output(&cmd).await?;
        let operation = operation.trim();
        if operation.is_empty() {
            return Err(ClusterError::UnexpectedOutput {
                command: cmd.to_string(),
                message: "no operation name returned".to_string(),
            });
        }

        info!(cluster = %self.name, operation, "waiting for GKE cluster creation");
        self.wait_for_operation(input, operation).await
    }

    /// Poll the cluster itself; the operation that started it may be gone
    async fn await_running(&self, input: &InputParams) -> Result<()> {
        let poll = poll_config(&self.operation_interval, &self.operation_timeout)?;
        let running = wait::poll_until(poll, &input.cancel, || async move {
            Ok(self.raw_status(input).await?.as_deref() == Some("RUNNING"))
        })
        .await?;

        if running {
            return Ok(());
        }
        Err(ClusterError::Timeout {
            operation: format!("GKE cluster {} becoming RUNNING", self.name),
            timeout: self.operation_timeout.clone(),
        })
    }

    async fn destroy(&self, input: &InputParams) -> Result<()> {
        input
            .stream(&self.scoped(Gcloud::delete_cluster(&self.name)))
            .await?;
        Ok(())
    }

    async fn get_credentials(&self, input: &InputParams) -> Result<()> {
        input
            .run(&self.scoped(Gcloud::get_credentials(&self.name)))
            .await?;
        Ok(())
    }

    /// gcloud names contexts `gke_<project>_<location>_<cluster>`
    async fn context(&self, _input: &InputParams) -> Result<String> {
        Ok(format!("gke_{}_{}_{}", self.project, self.zone, self.name))
    }
}
