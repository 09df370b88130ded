//! `kubectl patch` against live objects

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;
use valet_core::cmd::Kubectl;
use valet_core::{Command, InputParams};
use valet_engine::{Bindings, Field, Resolver};

use super::{Deployable, bind, require};
use crate::error::Result;

/// A templated patch applied to a live object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Patch {
    pub path: String,
    pub registry_name: String,
    pub kube_type: String,
    pub name: String,
    /// Falls back to the `Namespace` value
    pub namespace: String,
    /// `merge` when unset
    pub patch_type: String,
}

impl Bindings for Patch {
    fn fields(&mut self) -> Vec<Field<'_>> {
        vec![
            Field::new("path", &mut self.path).template(),
            Field::new("registryName", &mut self.registry_name).template(),
            Field::new("kubeType", &mut self.kube_type).template(),
            Field::new("name", &mut self.name).template(),
            Field::new("namespace", &mut self.namespace)
                .key("Namespace")
                .template(),
            Field::new("patchType", &mut self.patch_type).default("merge"),
        ]
    }
}

#[async_trait]
impl Deployable for Patch {
    async fn ensure(&self, input: &InputParams) -> Result<()> {
        let patch = bind(self, input).await?;
        let document = patch.document(input).await?;
        require("patch", "kubeType", &patch.kube_type)?;
        require("patch", "name", &patch.name)?;

        info!(kind = %patch.kube_type, name = %patch.name, namespace = %patch.namespace, "patching");
        let cmd = Kubectl::patch(&patch.kube_type, &patch.name, &patch.patch_type, &document)
            .namespace(&patch.namespace);
        input.run(&Command::from(cmd)).await?;
        Ok(())
    }

    /// Patches are not reverted
    async fn teardown(&self, _input: &InputParams) -> Result<()> {
        Ok(())
    }

    async fn render(&self, input: &InputParams) -> Result<String> {
        bind(self, input).await?.document(input).await
    }
}

impl Patch {
    async fn document(&self, input: &InputParams) -> Result<String> {
        require("patch", "path", &self.path)?;
        let source = input.load_file(&self.registry_name, &self.path).await?;
        Ok(Resolver::new(input)
            .render_document(&self.path, &source)
            .await?)
    }
}
