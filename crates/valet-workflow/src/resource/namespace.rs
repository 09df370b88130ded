//! Namespaces with optional labels

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use tracing::info;
use valet_core::cmd::Kubectl;
use valet_core::{Command, InputParams};
use valet_engine::{Bindings, Field, template_map};

use super::{Deployable, apply, bind, dry_run, require};
use crate::error::{Result, WorkflowError};

/// A Kubernetes namespace, created idempotently
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Namespace {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl Bindings for Namespace {
    fn fields(&mut self) -> Vec<Field<'_>> {
        let mut fields = vec![
            Field::new("name", &mut self.name)
                .key("Namespace")
                .template(),
        ];
        fields.extend(template_map(&mut self.labels));
        fields
    }
}

#[async_trait]
impl Deployable for Namespace {
    async fn ensure(&self, input: &InputParams) -> Result<()> {
        let ns = bind(self, input).await?;
        let document = ns.document(input).await?;
        info!(namespace = %ns.name, "ensuring namespace");
        apply(input, &document).await
    }

    async fn teardown(&self, input: &InputParams) -> Result<()> {
        let ns = bind(self, input).await?;
        require("namespace", "name", &ns.name)?;
        info!(namespace = %ns.name, "deleting namespace");
        input
            .run(&Command::from(Kubectl::delete_namespace(&ns.name)))
            .await?;
        Ok(())
    }

    async fn render(&self, input: &InputParams) -> Result<String> {
        bind(self, input).await?.document(input).await
    }
}

impl Namespace {
    async fn document(&self, input: &InputParams) -> Result<String> {
        require("namespace", "name", &self.name)?;
        let document = dry_run(input, Kubectl::create_namespace(&self.name)).await?;
        with_labels(&document, &self.labels)
    }
}

/// Merge `labels` into the object's metadata
fn with_labels(document: &str, labels: &BTreeMap<String, String>) -> Result<String> {
    if labels.is_empty() {
        return Ok(document.to_string());
    }

    let mut object: Value = serde_yaml::from_str(document)?;
    let metadata = object
        .get_mut("metadata")
        .and_then(Value::as_mapping_mut)
        .ok_or_else(|| WorkflowError::invalid("namespace dry run returned no metadata"))?;

    let labels: Mapping = labels
        .iter()
        .map(|(k, v)| (Value::from(k.as_str()), Value::from(v.as_str())))
        .collect();
    metadata.insert(Value::from("labels"), Value::Mapping(labels));

    Ok(serde_yaml::to_string(&object)?)
}
