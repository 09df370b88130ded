//! The top-level document the CLI runs

use serde::Deserialize;
use std::path::Path;
use tracing::info;
use valet_core::{CoreError, Flags, InputParams, Values};
use valet_workflow::{Deployable, WorkflowRef, join_documents};

use crate::cluster::ClusterResource;
use crate::error::{ClusterError, Result};
use crate::multi::MultiClusterConfig;

/// A cluster, the workflows to run on it and any multi-cluster fan-out
///
/// ```yaml
/// cluster:
///   kind:
///     name: demo
/// workflows:
///   - path: gloo/workflow.yaml
/// values:
///   Namespace: gloo-system
/// flags: [smoke]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ValetConfig {
    pub cluster: Option<ClusterResource>,
    pub workflows: Vec<WorkflowRef>,
    pub multi_cluster: Option<MultiClusterConfig>,
    pub values: Values,
    pub flags: Flags,
}

impl ValetConfig {
    pub fn from_yaml(yaml: &str, path: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|source| ClusterError::Parse {
            path: path.to_string(),
            source,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(CoreError::from)?;
        Self::from_yaml(&content, &path.display().to_string())
    }

    fn input(&self, input: &InputParams) -> InputParams {
        input.merge_values(&self.values).merge_flags(&self.flags)
    }

    /// Cluster first, then workflows in order, then the multi-cluster block
    ///
    /// Workflows run against the cluster's context explicitly. The kubeconfig
    /// is left pointing at the top-level cluster.
    pub async fn ensure(&self, input: &InputParams) -> Result<()> {
        let input = self.input(input);
        let scoped = match &self.cluster {
            Some(cluster) => input.with_kube_context(cluster.ensure(&input).await?),
            None => input.clone(),
        };
        for workflow in &self.workflows {
            workflow.ensure(&scoped).await?;
        }
        if let Some(multi) = &self.multi_cluster {
            multi.ensure(&scoped).await?;
            if let Some(cluster) = &self.cluster {
                cluster.set_context(&input).await?;
            }
        }
        info!("ensure complete");
        Ok(())
    }

    /// Reverse of [`ValetConfig::ensure`]
    ///
    /// Workflows on a cluster that no longer exists are skipped.
    pub async fn teardown(&self, input: &InputParams) -> Result<()> {
        let input = self.input(input);
        let scoped = match &self.cluster {
            Some(cluster) => cluster
                .connect(&input)
                .await?
                .map(|context| input.with_kube_context(context)),
            None => Some(input.clone()),
        };

        if let Some(multi) = &self.multi_cluster {
            multi.teardown(scoped.as_ref().unwrap_or(&input)).await?;
        }

        match &scoped {
            Some(scoped) => {
                if let (Some(cluster), Some(_)) = (&self.cluster, &self.multi_cluster) {
                    cluster.set_context(&input).await?;
                }
                for workflow in self.workflows.iter().rev() {
                    workflow.teardown(scoped).await?;
                }
            }
            None => info!("cluster does not exist, skipping workflow teardown"),
        }

        if let Some(cluster) = &self.cluster {
            cluster.teardown(&input).await?;
        }
        info!("teardown complete");
        Ok(())
    }

    /// Every document the workflows would apply, without touching a cluster
    pub async fn render(&self, input: &InputParams) -> Result<String> {
        let input = self.input(input);
        let mut documents = Vec::new();
        for workflow in &self.workflows {
            documents.push(workflow.render(&input).await?);
        }
        if let Some(multi) = &self.multi_cluster {
            documents.extend(multi.render(&input).await?);
        }
        Ok(join_documents(documents))
    }
}
