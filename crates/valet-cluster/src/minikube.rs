//! Local minikube profiles

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use valet_core::cmd::{Kubectl, Minikube};
use valet_core::{Command, CoreError, InputParams};
use valet_engine::{Bindings, Field};

use crate::driver::{ClusterDriver, ClusterStatus};
use crate::error::{Result, is_not_found};

const NOT_FOUND: &[&str] = &["not found"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct MinikubeCluster {
    /// `minikube` when unset
    pub profile: String,
    pub kubernetes_version: String,
    pub cpus: String,
    pub memory: String,
    pub driver: String,
}

impl Bindings for MinikubeCluster {
    fn fields(&mut self) -> Vec<Field<'_>> {
        vec![
            Field::new("profile", &mut self.profile)
                .default("minikube")
                .template(),
            Field::new("kubernetesVersion", &mut self.kubernetes_version)
                .key("KubernetesVersion")
                .template(),
            Field::new("cpus", &mut self.cpus).template(),
            Field::new("memory", &mut self.memory).template(),
            Field::new("driver", &mut self.driver).template(),
        ]
    }
}

impl MinikubeCluster {
    /// `minikube start` both creates a profile and restarts a stopped one
    fn start(&self) -> Command {
        Minikube::start(&self.profile)
            .opt("--kubernetes-version", &self.kubernetes_version)
            .opt("--cpus", &self.cpus)
            .opt("--memory", &self.memory)
            .opt("--driver", &self.driver)
            .build()
    }
}

#[async_trait]
impl ClusterDriver for MinikubeCluster {
    fn describe(&self) -> String {
        format!("minikube {}", self.profile)
    }

    /// `minikube status` exits non-zero for stopped and unknown profiles
    async fn status(&self, input: &InputParams) -> Result<ClusterStatus> {
        match input.output(&Minikube::status(&self.profile).build()).await {
            Ok(host) if host.trim() == "Running" => Ok(ClusterStatus::Running),
            Ok(host) => {
                debug!(profile = %self.profile, host = host.trim(), "minikube profile not running");
                Ok(ClusterStatus::Pending)
            }
            Err(e) if is_not_found(&e, NOT_FOUND) => Ok(ClusterStatus::Absent),
            Err(CoreError::CommandFailed { output, .. }) => {
                debug!(profile = %self.profile, output = output.trim(), "minikube profile not running");
                Ok(ClusterStatus::Pending)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn create(&self, input: &InputParams) -> Result<()> {
        input.stream(&self.start()).await?;
        Ok(())
    }

    async fn await_running(&self, input: &InputParams) -> Result<()> {
        input.stream(&self.start()).await?;
        Ok(())
    }

    async fn destroy(&self, input: &InputParams) -> Result<()> {
        input.stream(&Minikube::delete(&self.profile).build()).await?;
        Ok(())
    }

    async fn get_credentials(&self, input: &InputParams) -> Result<()> {
        input
            .run(&Kubectl::use_context(&self.profile).build())
            .await?;
        Ok(())
    }

    async fn context(&self, _input: &InputParams) -> Result<String> {
        Ok(self.profile.clone())
    }
}
