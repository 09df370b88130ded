//! Helm charts rendered locally and applied through kubectl

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;
use valet_core::InputParams;
use valet_core::cmd::Helm;
use valet_engine::{Bindings, Field, template_map};

use super::{Deployable, apply, bind, delete, require};
use crate::error::Result;

/// A helm chart, rendered locally with `helm template` and applied with kubectl
///
/// Nothing is recorded in the cluster by helm itself, so teardown deletes
/// the same rendering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct HelmChart {
    pub release_name: String,
    pub chart: String,
    pub repo_url: String,
    /// Falls back to the `Version` value
    pub version: String,
    /// Falls back to the `Namespace` value
    pub namespace: String,
    pub values_files: Vec<String>,
    pub set: BTreeMap<String, String>,
}

impl Bindings for HelmChart {
    fn fields(&mut self) -> Vec<Field<'_>> {
        let mut fields = vec![
            Field::new("releaseName", &mut self.release_name).template(),
            Field::new("chart", &mut self.chart).template(),
            Field::new("repoUrl", &mut self.repo_url).template(),
            Field::new("version", &mut self.version)
                .key("Version")
                .template(),
            Field::new("namespace", &mut self.namespace)
                .key("Namespace")
                .template(),
        ];
        fields.extend(
            self.values_files
                .iter_mut()
                .map(|file| Field::new("valuesFiles", file).template()),
        );
        fields.extend(template_map(&mut self.set));
        fields
    }
}

#[async_trait]
impl Deployable for HelmChart {
    async fn ensure(&self, input: &InputParams) -> Result<()> {
        let chart = bind(self, input).await?;
        let document = chart.template(input).await?;
        info!(release = %chart.release_name, chart = %chart.chart, version = %chart.version, "applying helm chart");
        apply(input, &document).await
    }

    async fn teardown(&self, input: &InputParams) -> Result<()> {
        let chart = bind(self, input).await?;
        let document = chart.template(input).await?;
        info!(release = %chart.release_name, chart = %chart.chart, "deleting helm chart");
        delete(input, &document).await
    }

    async fn render(&self, input: &InputParams) -> Result<String> {
        bind(self, input).await?.template(input).await
    }
}

impl HelmChart {
    async fn template(&self, input: &InputParams) -> Result<String> {
        require("helmChart", "releaseName", &self.release_name)?;
        require("helmChart", "chart", &self.chart)?;

        let mut helm = Helm::template(&self.release_name, &self.chart)
            .repo(&self.repo_url)
            .version(&self.version)
            .namespace(&self.namespace);
        for file in &self.values_files {
            helm = helm.values_file(file);
        }
        for (key, value) in &self.set {
            helm = helm.set(key, value);
        }

        Ok(input.output(&helm.build()).await?)
    }
}
