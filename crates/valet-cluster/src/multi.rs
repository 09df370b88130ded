//! One workflow fanned out across several clusters

use serde::Deserialize;
use tokio::task::JoinSet;
use tracing::{info, warn};
use valet_core::{InputParams, Values};
use valet_workflow::{Deployable, WorkflowRef};

use crate::cluster::ClusterResource;
use crate::error::{ClusterError, Result};

/// A workflow bound to the cluster it runs against
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ClusterWorkflow {
    #[serde(default)]
    pub cluster: Option<ClusterResource>,
    pub workflow: WorkflowRef,
    #[serde(default)]
    pub values: Values,
}

impl ClusterWorkflow {
    /// Ensure the cluster, then run the workflow against its context
    pub async fn ensure(&self, input: &InputParams) -> Result<()> {
        let mut input = input.merge_values(&self.values);
        if let Some(cluster) = &self.cluster {
            let context = cluster.ensure(&input).await?;
            input = input.with_kube_context(context);
        }
        self.workflow.ensure(&input).await?;
        Ok(())
    }

    /// Tear the workflow down from its cluster; the cluster itself stays
    pub async fn teardown(&self, input: &InputParams) -> Result<()> {
        let mut input = input.merge_values(&self.values);
        if let Some(cluster) = &self.cluster {
            match cluster.connect(&input).await? {
                Some(context) => input = input.with_kube_context(context),
                None => {
                    info!("branch cluster does not exist, nothing to tear down");
                    return Ok(());
                }
            }
        }
        self.workflow.teardown(&input).await?;
        Ok(())
    }

    pub async fn render(&self, input: &InputParams) -> Result<String> {
        let input = input.merge_values(&self.values);
        Ok(self.workflow.render(&input).await?)
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Ensure,
    Teardown,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct MultiClusterConfig {
    pub clusters: Vec<ClusterWorkflow>,
    /// One task per cluster instead of one cluster after another
    pub run_in_parallel: bool,
}

impl MultiClusterConfig {
    pub async fn ensure(&self, input: &InputParams) -> Result<()> {
        self.run(input, Direction::Ensure).await
    }

    pub async fn teardown(&self, input: &InputParams) -> Result<()> {
        self.run(input, Direction::Teardown).await
    }

    pub async fn render(&self, input: &InputParams) -> Result<Vec<String>> {
        let mut documents = Vec::with_capacity(self.clusters.len());
        for branch in &self.clusters {
            documents.push(branch.render(input).await?);
        }
        Ok(documents)
    }

    async fn run(&self, input: &InputParams, direction: Direction) -> Result<()> {
        if !self.run_in_parallel {
            for branch in &self.clusters {
                run_branch(branch, input, direction).await?;
            }
            return Ok(());
        }

        info!(branches = self.clusters.len(), "running cluster branches in parallel");
        let mut tasks = JoinSet::new();
        for (index, branch) in self.clusters.iter().cloned().enumerate() {
            // every branch owns a deep copy of values and flags
            let input = input.clone();
            tasks.spawn(async move { (index, run_branch(&branch, &input, direction).await) });
        }

        // siblings keep running after a failure; the first error to finish wins
        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            let (index, result) = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    first_error.get_or_insert(ClusterError::Branch(e.to_string()));
                    continue;
                }
            };
            if let Err(e) = result {
                if first_error.is_none() {
                    first_error = Some(e);
                } else {
                    warn!(branch = index, error = %e, "cluster branch failed");
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

async fn run_branch(branch: &ClusterWorkflow, input: &InputParams, direction: Direction) -> Result<()> {
    match direction {
        Direction::Ensure => branch.ensure(input).await,
        Direction::Teardown => branch.teardown(input).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use valet_core::{CoreError, MockRunner, StaticRegistry};
    use valet_workflow::WorkflowError;

    const WORKFLOW: &str = r#"
steps:
  - condition:
      type: deployment
      name: "petstore-{{ Branch }}"
      namespace: default
      jsonpath: "{.status.readyReplicas}"
      value: "1"
  - apply:
      template:
        path: marker.yaml
"#;

    fn registry() -> StaticRegistry {
        StaticRegistry::new()
            .with_file("workflow.yaml", WORKFLOW)
            .with_file("marker.yaml", "branch: \"{{ Branch }}\"\n")
    }

    fn config(parallel: bool) -> MultiClusterConfig {
        let branch = |n: &str| ClusterWorkflow {
            cluster: None,
            workflow: WorkflowRef {
                path: "workflow.yaml".to_string(),
                ..Default::default()
            },
            values: [("Branch", n)].into_iter().collect(),
        };
        MultiClusterConfig {
            clusters: vec![branch("1"), branch("2"), branch("3")],
            run_in_parallel: parallel,
        }
    }

    fn runner() -> MockRunner {
        let runner = MockRunner::new();
        runner
            .respond("kubectl get deployment petstore-1", "1")
            .fail("kubectl get deployment petstore-2", "deployments.apps \"petstore-2\" not found")
            .respond("kubectl get deployment petstore-3", "1");
        runner
    }

    fn applied(runner: &MockRunner) -> Vec<String> {
        let mut docs: Vec<String> = runner
            .commands()
            .iter()
            .filter_map(|c| c.stdin().map(str::to_string))
            .collect();
        docs.sort();
        docs
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_parallel_failure_lets_siblings_finish() {
        let runner = runner();
        let input = InputParams::for_testing(runner.clone(), registry());

        let err = config(true).ensure(&input).await.unwrap_err();

        match err {
            ClusterError::Workflow(WorkflowError::Core(CoreError::CommandFailed { command, .. })) => {
                assert!(command.contains("petstore-2"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(applied(&runner), vec!["branch: \"1\"\n", "branch: \"3\"\n"]);
    }

    #[tokio::test]
    async fn test_sequential_stops_at_first_failure() {
        let runner = runner();
        let input = InputParams::for_testing(runner.clone(), registry());

        assert!(config(false).ensure(&input).await.is_err());
        assert_eq!(applied(&runner), vec!["branch: \"1\"\n"]);
        assert_eq!(runner.count("kubectl get deployment petstore-3"), 0);
    }

    fn kind_branch(name: &str) -> ClusterWorkflow {
        ClusterWorkflow {
            cluster: Some(serde_yaml::from_str(&format!("kind:\n  name: {name}\n")).unwrap()),
            workflow: WorkflowRef {
                path: "workflow.yaml".to_string(),
                ..Default::default()
            },
            values: [("Branch", name)].into_iter().collect(),
        }
    }

    fn applied_with_context(runner: &MockRunner) -> Vec<(String, String)> {
        runner
            .commands()
            .iter()
            .filter_map(|c| c.stdin().map(|doc| (doc.to_string(), c.command_line())))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_parallel_branches_keep_their_own_context() {
        let runner = MockRunner::new();
        runner
            .respond("kind get clusters", "a\nb\n")
            // branch a waits one poll interval, long enough for b to switch
            // the kubeconfig to kind-b before a applies anything
            .respond_once("kubectl get deployment petstore-a", "0")
            .respond("kubectl get deployment", "1");
        let input = InputParams::for_testing(runner.clone(), registry());
        let multi = MultiClusterConfig {
            clusters: vec![kind_branch("a"), kind_branch("b")],
            run_in_parallel: true,
        };

        multi.ensure(&input).await.unwrap();

        let calls = runner.calls();
        let switched_to_b = calls
            .iter()
            .position(|c| c == "kubectl config use-context kind-b")
            .unwrap();
        let applied_a = calls
            .iter()
            .position(|c| c == "kubectl apply -f - --context kind-a")
            .unwrap();
        assert!(switched_to_b < applied_a);

        let mut applied = applied_with_context(&runner);
        applied.sort();
        assert_eq!(
            applied,
            vec![
                ("branch: \"a\"\n".to_string(), "kubectl apply -f - --context kind-a".to_string()),
                ("branch: \"b\"\n".to_string(), "kubectl apply -f - --context kind-b".to_string()),
            ]
        );
        assert!(
            calls
                .iter()
                .filter(|c| c.starts_with("kubectl get deployment petstore-a"))
                .all(|c| c.ends_with("--context kind-a"))
        );
    }

    #[tokio::test]
    async fn test_teardown_skips_branch_without_cluster() {
        let runner = MockRunner::new();
        runner.respond("kind get clusters", "b\n");
        let input = InputParams::for_testing(runner.clone(), registry());
        let multi = MultiClusterConfig {
            clusters: vec![kind_branch("a"), kind_branch("b")],
            run_in_parallel: false,
        };

        multi.teardown(&input).await.unwrap();

        assert_eq!(runner.count("kubectl config use-context kind-a"), 0);
        assert_eq!(
            applied_with_context(&runner),
            vec![("branch: \"b\"\n".to_string(), "kubectl delete -f - --ignore-not-found --context kind-b".to_string())]
        );
    }

    #[tokio::test]
    async fn test_branch_values_do_not_leak() {
        let runner = MockRunner::new();
        runner.respond("kubectl get deployment", "1");
        let input = InputParams::for_testing(runner.clone(), registry());

        config(true).ensure(&input).await.unwrap();
        assert!(!input.values.contains_key("Branch"));
        assert_eq!(applied(&runner).len(), 3);
    }
}
