//! Plain and templated manifests

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;
use valet_core::InputParams;
use valet_engine::{Bindings, Field, Resolver};

use super::{Deployable, apply, bind, delete, require};
use crate::error::Result;

/// A manifest applied verbatim
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Manifest {
    pub path: String,

    /// Registry to load `path` from, `default` when empty
    #[serde(default)]
    pub registry_name: String,
}

/// A manifest expanded against the current values before it is applied
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Template {
    pub path: String,

    #[serde(default)]
    pub registry_name: String,
}

impl Bindings for Manifest {
    fn fields(&mut self) -> Vec<Field<'_>> {
        vec![
            Field::new("path", &mut self.path).template(),
            Field::new("registryName", &mut self.registry_name).template(),
        ]
    }
}

impl Bindings for Template {
    fn fields(&mut self) -> Vec<Field<'_>> {
        vec![
            Field::new("path", &mut self.path).template(),
            Field::new("registryName", &mut self.registry_name).template(),
        ]
    }
}

#[async_trait]
impl Deployable for Manifest {
    async fn ensure(&self, input: &InputParams) -> Result<()> {
        let document = self.render(input).await?;
        info!(path = %self.path, "applying manifest");
        apply(input, &document).await
    }

    async fn teardown(&self, input: &InputParams) -> Result<()> {
        let document = self.render(input).await?;
        info!(path = %self.path, "deleting manifest");
        delete(input, &document).await
    }

    async fn render(&self, input: &InputParams) -> Result<String> {
        let manifest = bind(self, input).await?;
        require("manifest", "path", &manifest.path)?;
        Ok(input
            .load_file(&manifest.registry_name, &manifest.path)
            .await?)
    }
}

#[async_trait]
impl Deployable for Template {
    async fn ensure(&self, input: &InputParams) -> Result<()> {
        let document = self.render(input).await?;
        info!(path = %self.path, "applying template");
        apply(input, &document).await
    }

    async fn teardown(&self, input: &InputParams) -> Result<()> {
        let document = self.render(input).await?;
        info!(path = %self.path, "deleting template");
        delete(input, &document).await
    }

    async fn render(&self, input: &InputParams) -> Result<String> {
        let template = bind(self, input).await?;
        require("template", "path", &template.path)?;
        let source = input
            .load_file(&template.registry_name, &template.path)
            .await?;
        Ok(Resolver::new(input)
            .render_document(&template.path, &source)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use valet_core::{MockRunner, StaticRegistry};

    const PETSTORE: &str = "apiVersion: v1\nkind: Service\nmetadata:\n  name: petstore\n  namespace: {{ Namespace }}\n";

    fn input(runner: &MockRunner) -> InputParams {
        let registry = StaticRegistry::new().with_file("petstore/svc.yaml", PETSTORE);
        InputParams::for_testing(runner.clone(), registry)
            .with_values([("Namespace", "default"), ("App", "petstore")].into_iter().collect())
    }

    #[tokio::test]
    async fn test_manifest_is_applied_verbatim() {
        let runner = MockRunner::new();
        let manifest = Manifest {
            path: "{{ App }}/svc.yaml".to_string(),
            ..Default::default()
        };

        manifest.ensure(&input(&runner)).await.unwrap();

        assert_eq!(runner.calls(), vec!["kubectl apply -f -"]);
        assert_eq!(runner.commands()[0].stdin(), Some(PETSTORE));
    }

    #[tokio::test]
    async fn test_template_render_matches_applied_document() {
        let runner = MockRunner::new();
        let template = Template {
            path: "petstore/svc.yaml".to_string(),
            ..Default::default()
        };
        let input = input(&runner);

        let rendered = template.render(&input).await.unwrap();
        insta::assert_snapshot!(rendered, @r###"
        apiVersion: v1
        kind: Service
        metadata:
          name: petstore
          namespace: default
        "###);

        template.ensure(&input).await.unwrap();
        template.teardown(&input).await.unwrap();

        let commands = runner.commands();
        assert_eq!(commands[0].command_line(), "kubectl apply -f -");
        assert_eq!(commands[0].stdin(), Some(rendered.as_str()));
        assert_eq!(
            commands[1].command_line(),
            "kubectl delete -f - --ignore-not-found"
        );
        assert_eq!(commands[1].stdin(), Some(rendered.as_str()));
    }

    #[tokio::test]
    async fn test_unknown_registry() {
        let runner = MockRunner::new();
        let manifest = Manifest {
            path: "petstore/svc.yaml".to_string(),
            registry_name: "gloo".to_string(),
        };
        assert!(manifest.ensure(&input(&runner)).await.is_err());
        assert!(runner.calls().is_empty());
    }
}
