//! Amazon EKS clusters through `eksctl`

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use valet_core::cmd::Eksctl;
use valet_core::cmd::Kubectl;
use valet_core::wait;
use valet_core::{Command, CoreError, InputParams};
use valet_engine::{Bindings, Field};

use crate::driver::{ClusterDriver, ClusterStatus, poll_config};
use crate::error::{ClusterError, Result, is_not_found};

const NOT_FOUND: &[&str] = &["No cluster found", "ResourceNotFoundException"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct EksCluster {
    /// Falls back to the `ClusterName` value
    pub name: String,
    /// Falls back to the `AwsRegion` value
    pub region: String,
    pub nodes: String,
    pub node_type: String,
    pub version: String,
    /// `10s` when unset
    pub operation_interval: String,
    /// `30m` when unset
    pub operation_timeout: String,
}

impl Bindings for EksCluster {
    fn fields(&mut self) -> Vec<Field<'_>> {
        vec![
            Field::new("name", &mut self.name)
                .key("ClusterName")
                .template(),
            Field::new("region", &mut self.region)
                .key("AwsRegion")
                .default("us-east-1")
                .template(),
            Field::new("nodes", &mut self.nodes).template(),
            Field::new("nodeType", &mut self.node_type).template(),
            Field::new("version", &mut self.version).template(),
            Field::new("operationInterval", &mut self.operation_interval).default("10s"),
            Field::new("operationTimeout", &mut self.operation_timeout).default("30m"),
        ]
    }
}

/// `Status` of the first cluster in `eksctl get cluster -o json` output
fn cluster_status(json: &str) -> Option<String> {
    let clusters: Value = serde_json::from_str(json).ok()?;
    let cluster = match &clusters {
        Value::Array(items) => items.first()?,
        other => other,
    };
    cluster
        .get("Status")
        .or_else(|| cluster.get("status"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

impl EksCluster {
    fn get_cluster(&self) -> Command {
        Eksctl::get_cluster(&self.name).region(&self.region).build()
    }

    /// `None` when the cluster does not exist
    async fn raw_status(&self, input: &InputParams) -> valet_core::Result<Option<String>> {
        let cmd = self.get_cluster();
        match input.output(&cmd).await {
            Ok(output) => cluster_status(&output)
                .map(Some)
                .ok_or_else(|| CoreError::InvalidValue {
                    key: cmd.to_string(),
                    message: "no cluster status in output".to_string(),
                }),
            Err(e) if is_not_found(&e, NOT_FOUND) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl ClusterDriver for EksCluster {
    fn describe(&self) -> String {
        format!("eks {}/{}", self.region, self.name)
    }

    async fn status(&self, input: &InputParams) -> Result<ClusterStatus> {
        Ok(match self.raw_status(input).await?.as_deref() {
            None => ClusterStatus::Absent,
            Some("ACTIVE") => ClusterStatus::Running,
            Some(other) => {
                debug!(cluster = %self.name, status = other, "eks cluster not active");
                ClusterStatus::Pending
            }
        })
    }

    /// Stream `eksctl create cluster`, then wait for the control plane to
    /// report `ACTIVE`
    async fn create(&self, input: &InputParams) -> Result<()> {
        let cmd = Eksctl::create_cluster(&self.name)
            .region(&self.region)
            .opt("--nodes", &self.nodes)
            .opt("--node-type", &self.node_type)
            .opt("--version", &self.version)
            .build();
        input.stream(&cmd).await?;
        self.await_running(input).await
    }

    async fn await_running(&self, input: &InputParams) -> Result<()> {
        let poll = poll_config(&self.operation_interval, &self.operation_timeout)?;
        info!(cluster = %self.name, "waiting for EKS cluster to become active");
        let active = wait::poll_until(poll, &input.cancel, || async move {
            let status = self.raw_status(input).await?;
            debug!(cluster = %self.name, status = ?status, "eks cluster status");
            Ok(status.as_deref() == Some("ACTIVE"))
        })
        .await?;

        if active {
            return Ok(());
        }
        Err(ClusterError::Timeout {
            operation: format!("EKS cluster {} becoming ACTIVE", self.name),
            timeout: self.operation_timeout.clone(),
        })
    }

    async fn destroy(&self, input: &InputParams) -> Result<()> {
        let cmd = Eksctl::delete_cluster(&self.name)
            .region(&self.region)
            .build();
        input.stream(&cmd).await?;
        Ok(())
    }

    async fn get_credentials(&self, input: &InputParams) -> Result<()> {
        let cmd = Eksctl::write_kubeconfig(&self.name)
            .region(&self.region)
            .build();
        input.run(&cmd).await?;
        Ok(())
    }

    /// eksctl names contexts `<identity>@<name>.<region>.eksctl.io`; the
    /// identity part is only known from the kubeconfig
    async fn context(&self, input: &InputParams) -> Result<String> {
        let cmd = Kubectl::get_contexts().build();
        let contexts = input.output(&cmd).await?;
        let suffix = format!("@{}.{}.eksctl.io", self.name, self.region);
        contexts
            .lines()
            .map(str::trim)
            .find(|context| context.ends_with(&suffix))
            .map(str::to_string)
            .ok_or_else(|| ClusterError::UnexpectedOutput {
                command: cmd.to_string(),
                message: format!("no context for EKS cluster {}", self.name),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::bind;
    use valet_core::{MockRunner, StaticRegistry};

    const CREATING: &str = r#"[{"Name": "valet-test", "Status": "CREATING"}]"#;
    const ACTIVE: &str = r#"[{"Name": "valet-test", "Status": "ACTIVE"}]"#;

    async fn cluster(input: &InputParams) -> EksCluster {
        let cluster = EksCluster {
            name: "valet-test".to_string(),
            ..Default::default()
        };
        bind(&cluster, input).await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_streams_then_waits_for_active() {
        let runner = MockRunner::new();
        runner
            .respond_once("eksctl get cluster", CREATING)
            .respond_once("eksctl get cluster", CREATING)
            .respond("eksctl get cluster", ACTIVE);
        let input = InputParams::for_testing(runner.clone(), StaticRegistry::new());

        cluster(&input).await.create(&input).await.unwrap();

        let calls = runner.calls();
        assert_eq!(
            calls[0],
            "eksctl create cluster --name valet-test --region us-east-1"
        );
        assert_eq!(runner.count("eksctl get cluster"), 3);
    }

    #[tokio::test]
    async fn test_status() {
        let runner = MockRunner::new();
        runner
            .fail_once(
                "eksctl get cluster",
                "Error: unable to describe cluster control plane: ResourceNotFoundException: No cluster found for name: valet-test.",
            )
            .respond_once("eksctl get cluster", CREATING)
            .respond_once("eksctl get cluster", ACTIVE)
            .respond_once("eksctl get cluster", "not json");
        let input = InputParams::for_testing(runner, StaticRegistry::new());
        let eks = cluster(&input).await;

        assert_eq!(eks.status(&input).await.unwrap(), ClusterStatus::Absent);
        assert_eq!(eks.status(&input).await.unwrap(), ClusterStatus::Pending);
        assert_eq!(eks.status(&input).await.unwrap(), ClusterStatus::Running);
        assert!(matches!(
            eks.status(&input).await,
            Err(ClusterError::Core(CoreError::InvalidValue { .. }))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_running_does_not_create() {
        let runner = MockRunner::new();
        runner
            .respond_once("eksctl get cluster", CREATING)
            .respond("eksctl get cluster", ACTIVE);
        let input = InputParams::for_testing(runner.clone(), StaticRegistry::new());

        cluster(&input).await.await_running(&input).await.unwrap();

        assert_eq!(runner.count("eksctl get cluster"), 2);
        assert_eq!(runner.count("eksctl create"), 0);
    }

    #[tokio::test]
    async fn test_context_from_kubeconfig() {
        let runner = MockRunner::new();
        runner.respond_once(
            "kubectl config get-contexts",
            "kind-dev\nci-bot@other.us-east-1.eksctl.io\nci-bot@valet-test.us-east-1.eksctl.io\n",
        );
        let input = InputParams::for_testing(runner.clone(), StaticRegistry::new());
        let eks = cluster(&input).await;

        assert_eq!(
            eks.context(&input).await.unwrap(),
            "ci-bot@valet-test.us-east-1.eksctl.io"
        );
        assert!(matches!(
            eks.context(&input).await,
            Err(ClusterError::UnexpectedOutput { .. })
        ));
    }

    #[test]
    fn test_cluster_status() {
        assert_eq!(cluster_status(ACTIVE).as_deref(), Some("ACTIVE"));
        assert_eq!(cluster_status(r#"{"status": "DELETING"}"#).as_deref(), Some("DELETING"));
        assert_eq!(cluster_status("[]"), None);
    }
}
