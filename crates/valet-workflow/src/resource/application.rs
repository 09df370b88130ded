//! Application references: a named bundle of resources from a registry

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use valet_core::{Flags, InputParams, Values};
use valet_engine::{Bindings, Field};

use super::{Deployable, Resource, bind, load_document, require};
use crate::error::Result;

/// An ordered set of resources installed front-to-back and removed
/// back-to-front
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Application {
    /// Keys that must be present before anything is touched
    pub required_values: Vec<String>,
    /// Defaults, overridden by anything the caller provides
    pub values: Values,
    pub resources: Vec<Resource>,
}

impl Application {
    fn enabled<'a>(&'a self, flags: &'a Flags) -> impl DoubleEndedIterator<Item = &'a Resource> {
        self.resources.iter().filter(move |r| {
            let enabled = r.is_enabled(flags);
            if !enabled {
                debug!(kind = r.kind.name(), "skipping resource, required flags not set");
            }
            enabled
        })
    }
}

#[async_trait]
impl Deployable for Application {
    async fn ensure(&self, input: &InputParams) -> Result<()> {
        let input = input.merge_values(&self.values);
        input.check_required(&self.required_values)?;

        for resource in self.enabled(&input.flags) {
            resource.ensure(&input).await?;
        }
        Ok(())
    }

    async fn teardown(&self, input: &InputParams) -> Result<()> {
        let input = input.merge_values(&self.values);
        input.check_required(&self.required_values)?;

        for resource in self.enabled(&input.flags).rev() {
            resource.teardown(&input).await?;
        }
        Ok(())
    }

    async fn render(&self, input: &InputParams) -> Result<String> {
        let input = input.merge_values(&self.values);
        input.check_required(&self.required_values)?;

        let mut documents = Vec::new();
        for resource in self.enabled(&input.flags) {
            documents.push(resource.render(&input).await?);
        }
        Ok(join_documents(documents))
    }
}

/// Join YAML documents with separators, keeping one trailing newline each
pub fn join_documents(documents: impl IntoIterator<Item = String>) -> String {
    documents
        .into_iter()
        .filter(|doc| !doc.trim().is_empty())
        .map(|doc| {
            if doc.ends_with('\n') {
                doc
            } else {
                format!("{doc}\n")
            }
        })
        .collect::<Vec<_>>()
        .join("---\n")
}

/// An application loaded from a registry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ApplicationRef {
    pub path: String,
    pub registry_name: String,
    pub values: Values,
    pub flags: Flags,
}

impl Bindings for ApplicationRef {
    fn fields(&mut self) -> Vec<Field<'_>> {
        vec![
            Field::new("path", &mut self.path).template(),
            Field::new("registryName", &mut self.registry_name).template(),
        ]
    }
}

impl ApplicationRef {
    async fn load(&self, input: &InputParams) -> Result<(Application, InputParams)> {
        let reference = bind(self, input).await?;
        require("application", "path", &reference.path)?;
        let application: Application =
            load_document(input, &reference.registry_name, &reference.path).await?;
        let input = input.merge_values(&self.values).merge_flags(&self.flags);
        Ok((application, input))
    }
}

#[async_trait]
impl Deployable for ApplicationRef {
    async fn ensure(&self, input: &InputParams) -> Result<()> {
        let (application, input) = self.load(input).await?;
        info!(application = %self.path, "installing application");
        application.ensure(&input).await
    }

    async fn teardown(&self, input: &InputParams) -> Result<()> {
        let (application, input) = self.load(input).await?;
        info!(application = %self.path, "uninstalling application");
        application.teardown(&input).await
    }

    async fn render(&self, input: &InputParams) -> Result<String> {
        let (application, input) = self.load(input).await?;
        application.render(&input).await
    }
}
