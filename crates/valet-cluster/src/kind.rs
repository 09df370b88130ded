//! kind (Kubernetes in Docker) clusters

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use valet_core::InputParams;
use valet_core::cmd::{Kind, Kubectl};
use valet_engine::{Bindings, Field};

use crate::driver::{ClusterDriver, ClusterStatus};
use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct KindCluster {
    /// Falls back to the `ClusterName` value, then `kind`
    pub name: String,
    /// Node image, e.g. `kindest/node:v1.29.2`
    pub image: String,
    /// Path to a kind cluster configuration file
    pub config: String,
}

impl Bindings for KindCluster {
    fn fields(&mut self) -> Vec<Field<'_>> {
        vec![
            Field::new("name", &mut self.name)
                .key("ClusterName")
                .default("kind")
                .template(),
            Field::new("image", &mut self.image).template(),
            Field::new("config", &mut self.config).template(),
        ]
    }
}

#[async_trait]
impl ClusterDriver for KindCluster {
    fn describe(&self) -> String {
        format!("kind {}", self.name)
    }

    /// kind clusters are either listed and serving or gone
    async fn status(&self, input: &InputParams) -> Result<ClusterStatus> {
        let clusters = input.output(&Kind::get_clusters().build()).await?;
        if clusters.lines().any(|line| line.trim() == self.name) {
            Ok(ClusterStatus::Running)
        } else {
            Ok(ClusterStatus::Absent)
        }
    }

    async fn create(&self, input: &InputParams) -> Result<()> {
        let cmd = Kind::create_cluster(&self.name)
            .opt("--image", &self.image)
            .opt("--config", &self.config)
            .build();
        input.stream(&cmd).await?;
        Ok(())
    }

    async fn await_running(&self, _input: &InputParams) -> Result<()> {
        Ok(())
    }

    async fn destroy(&self, input: &InputParams) -> Result<()> {
        input
            .stream(&Kind::delete_cluster(&self.name).build())
            .await?;
        Ok(())
    }

    async fn get_credentials(&self, input: &InputParams) -> Result<()> {
        let context = self.context(input).await?;
        input.run(&Kubectl::use_context(&context).build()).await?;
        Ok(())
    }

    /// kind prefixes its kubeconfig contexts with `kind-`
    async fn context(&self, _input: &InputParams) -> Result<String> {
        Ok(format!("kind-{}", self.name))
    }
}
