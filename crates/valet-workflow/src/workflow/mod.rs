//! Ordered steps, checks and cleanup
//!
//! A [`Workflow`] runs its steps front-to-back, then its cleanup steps.
//! Teardown walks the steps back-to-front. Steps gated by flags the caller
//! has not activated are skipped in every direction.

mod condition;
mod curl;
mod dns;
mod step;

pub use condition::Condition;
pub use curl::Curl;
pub use dns::DnsEntry;
pub use step::{Step, StepKind};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use valet_core::{Flags, InputParams, Values};
use valet_engine::{Bindings, Field};

use crate::error::Result;
use crate::resource::{Deployable, bind, join_documents, load_document, require};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Workflow {
    pub required_values: Vec<String>,
    pub values: Values,
    pub steps: Vec<Step>,
    /// Run after `steps` succeed, never on teardown
    pub cleanup_steps: Vec<Step>,
}

fn enabled<'a>(steps: &'a [Step], flags: &'a Flags) -> impl DoubleEndedIterator<Item = &'a Step> {
    steps.iter().filter(move |s| {
        let enabled = s.is_enabled(flags);
        if !enabled {
            debug!(step = s.kind.name(), "skipping step, required flags not set");
        }
        enabled
    })
}

#[async_trait]
impl Deployable for Workflow {
    async fn ensure(&self, input: &InputParams) -> Result<()> {
        let input = input.merge_values(&self.values);
        input.check_required(&self.required_values)?;

        let steps: Vec<&Step> = enabled(&self.steps, &input.flags).collect();
        for (i, step) in steps.iter().enumerate() {
            info!(step = step.kind.name(), "step {}/{}", i + 1, steps.len());
            step.ensure(&input).await?;
        }
        for step in enabled(&self.cleanup_steps, &input.flags) {
            info!(step = step.kind.name(), "cleanup");
            step.ensure(&input).await?;
        }
        Ok(())
    }

    async fn teardown(&self, input: &InputParams) -> Result<()> {
        let input = input.merge_values(&self.values);
        input.check_required(&self.required_values)?;

        for step in enabled(&self.steps, &input.flags).rev() {
            step.teardown(&input).await?;
        }
        Ok(())
    }

    async fn render(&self, input: &InputParams) -> Result<String> {
        let input = input.merge_values(&self.values);
        input.check_required(&self.required_values)?;

        let mut documents = Vec::new();
        for step in enabled(&self.steps, &input.flags) {
            if let Some(document) = step.render(&input).await? {
                documents.push(document);
            }
        }
        Ok(join_documents(documents))
    }
}

/// A workflow loaded from a registry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct WorkflowRef {
    pub path: String,
    pub registry_name: String,
    pub values: Values,
    pub flags: Flags,
}

impl Bindings for WorkflowRef {
    fn fields(&mut self) -> Vec<Field<'_>> {
        vec![
            Field::new("path", &mut self.path).template(),
            Field::new("registryName", &mut self.registry_name).template(),
        ]
    }
}

impl WorkflowRef {
    pub async fn load(&self, input: &InputParams) -> Result<(Workflow, InputParams)> {
        let reference = bind(self, input).await?;
        require("workflow", "path", &reference.path)?;
        let workflow: Workflow =
            load_document(input, &reference.registry_name, &reference.path).await?;
        let input = input.merge_values(&self.values).merge_flags(&self.flags);
        Ok((workflow, input))
    }
}

#[async_trait]
impl Deployable for WorkflowRef {
    async fn ensure(&self, input: &InputParams) -> Result<()> {
        let (workflow, input) = self.load(input).await?;
        info!(workflow = %self.path, "running workflow");
        workflow.ensure(&input).await
    }

    async fn teardown(&self, input: &InputParams) -> Result<()> {
        let (workflow, input) = self.load(input).await?;
        info!(workflow = %self.path, "tearing down workflow");
        workflow.teardown(&input).await
    }

    async fn render(&self, input: &InputParams) -> Result<String> {
        let (workflow, input) = self.load(input).await?;
        workflow.render(&input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkflowError;
    use valet_core::{CoreError, MockRunner, StaticRegistry};

    const DEMO: &str = r#"
requiredValues: [Namespace]
steps:
  - apply:
      manifest:
        path: petstore.yaml
  - condition:
      type: deployment
      name: petstore
      jsonpath: "{.status.readyReplicas}"
      value: "1"
  - workflow:
      path: smoke.yaml
    flags: [smoke]
cleanupSteps:
  - delete:
      manifest:
        path: petstore.yaml
"#;

    const SMOKE: &str = r#"
steps:
  - apply:
      manifest:
        path: smoke-pod.yaml
  - apply:
      manifest:
        path: smoke-debug.yaml
    flags: [debug]
"#;

    fn registry() -> StaticRegistry {
        StaticRegistry::new()
            .with_file("demo.yaml", DEMO)
            .with_file("smoke.yaml", SMOKE)
            .with_file("petstore.yaml", "kind: Deployment\n")
            .with_file("smoke-pod.yaml", "kind: Pod\n")
            .with_file("smoke-debug.yaml", "kind: ConfigMap\n")
    }

    fn demo() -> WorkflowRef {
        WorkflowRef {
            path: "demo.yaml".to_string(),
            ..Default::default()
        }
    }

    fn input(runner: &MockRunner) -> InputParams {
        InputParams::for_testing(runner.clone(), registry())
            .with_values([("Namespace", "default")].into_iter().collect())
    }

    #[tokio::test]
    async fn test_steps_then_cleanup() {
        let runner = MockRunner::new();
        runner.respond("kubectl get deployment petstore", "1");

        demo().ensure(&input(&runner)).await.unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls[0].starts_with("kubectl apply -f -"));
        assert!(calls[1].starts_with("kubectl get deployment petstore -n default"));
        assert!(calls[2].starts_with("kubectl delete -f -"));
    }

    #[tokio::test]
    async fn test_failed_step_skips_cleanup() {
        let runner = MockRunner::new();
        runner.fail("kubectl apply", "connection refused");

        let err = demo().ensure(&input(&runner)).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Core(CoreError::CommandFailed { .. })));
        assert_eq!(runner.count("kubectl delete"), 0);
    }

    #[tokio::test]
    async fn test_required_values_before_any_step() {
        let runner = MockRunner::new();
        let input = InputParams::for_testing(runner.clone(), registry());

        let err = demo().ensure(&input).await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Core(CoreError::RequiredValueNotProvided { ref key }) if key == "Namespace"
        ));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_nested_workflow_respects_flags() {
        let runner = MockRunner::new();
        runner.respond("kubectl get deployment petstore", "1");

        let rendered = demo().render(&input(&runner)).await.unwrap();
        assert_eq!(rendered, "kind: Deployment\n");

        let smoke = WorkflowRef {
            flags: ["smoke"].into_iter().collect(),
            ..demo()
        };
        let rendered = smoke.render(&input(&runner)).await.unwrap();
        assert_eq!(rendered, "kind: Deployment\n---\nkind: Pod\n");

        let with_debug = input(&runner).with_flags(["smoke", "debug"].into_iter().collect());
        let rendered = demo().render(&with_debug).await.unwrap();
        assert!(rendered.ends_with("kind: ConfigMap\n"));
    }

    #[tokio::test]
    async fn test_teardown_reverses_steps() {
        let runner = MockRunner::new();
        let workflow: Workflow = serde_yaml::from_str(
            r#"
steps:
  - apply:
      manifest: {path: smoke-pod.yaml}
  - apply:
      manifest: {path: petstore.yaml}
  - curl:
      service: {name: gateway-proxy, namespace: gloo-system}
"#,
        )
        .unwrap();

        workflow.teardown(&input(&runner)).await.unwrap();

        let deleted: Vec<String> = runner
            .commands()
            .iter()
            .filter_map(|c| c.stdin().map(str::to_string))
            .collect();
        assert_eq!(deleted, vec!["kind: Deployment\n", "kind: Pod\n"]);
        assert_eq!(runner.count("kubectl delete"), 2);
        assert!(runner.requests().is_empty());
    }
}
