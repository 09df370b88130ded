//! Cluster resources: one provider, its values and its lifecycle

use serde::Deserialize;
use tracing::info;
use valet_core::{InputParams, Values};

use crate::driver::{ClusterDriver, ClusterStatus, bind};
use crate::eks::EksCluster;
use crate::error::{ClusterError, Result};
use crate::gke::GkeCluster;
use crate::kind::KindCluster;
use crate::minikube::MinikubeCluster;

/// The provider a [`ClusterResource`] targets
#[derive(Debug, Clone, PartialEq)]
pub enum ClusterKind {
    Gke(GkeCluster),
    Eks(EksCluster),
    Minikube(MinikubeCluster),
    Kind(KindCluster),
}

impl ClusterKind {
    pub fn name(&self) -> &'static str {
        match self {
            ClusterKind::Gke(_) => "gke",
            ClusterKind::Eks(_) => "eks",
            ClusterKind::Minikube(_) => "minikube",
            ClusterKind::Kind(_) => "kind",
        }
    }

    /// The driver with its fields bound against `input`
    async fn bound(&self, input: &InputParams) -> Result<Box<dyn ClusterDriver>> {
        Ok(match self {
            ClusterKind::Gke(c) => Box::new(bind(c, input).await?),
            ClusterKind::Eks(c) => Box::new(bind(c, input).await?),
            ClusterKind::Minikube(c) => Box::new(bind(c, input).await?),
            ClusterKind::Kind(c) => Box::new(bind(c, input).await?),
        })
    }
}

/// The control plane workflows are deployed onto
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawCluster")]
pub struct ClusterResource {
    pub kind: ClusterKind,
    pub values: Values,
}

impl ClusterResource {
    pub fn new(kind: ClusterKind) -> Self {
        Self {
            kind,
            values: Values::new(),
        }
    }

    /// Cluster commands always name their own target, never an inherited context
    fn input(&self, input: &InputParams) -> InputParams {
        input.without_kube_context().merge_values(&self.values)
    }

    /// Create the cluster unless it exists, wait for it when it is still
    /// starting, then switch to it
    ///
    /// Returns the kubeconfig context of the cluster.
    pub async fn ensure(&self, input: &InputParams) -> Result<String> {
        let input = self.input(input);
        let driver = self.kind.bound(&input).await?;

        match driver.status(&input).await? {
            ClusterStatus::Running => {
                info!(cluster = %driver.describe(), "cluster already running");
            }
            ClusterStatus::Pending => {
                info!(cluster = %driver.describe(), "waiting for cluster to start");
                driver.await_running(&input).await?;
            }
            ClusterStatus::Absent => {
                info!(cluster = %driver.describe(), "creating cluster");
                driver.create(&input).await?;
            }
        }
        driver.get_credentials(&input).await?;
        driver.context(&input).await
    }

    /// Destroy the cluster if it exists, whatever state it is in
    pub async fn teardown(&self, input: &InputParams) -> Result<()> {
        let input = self.input(input);
        let driver = self.kind.bound(&input).await?;

        if driver.status(&input).await? == ClusterStatus::Absent {
            info!(cluster = %driver.describe(), "cluster does not exist, nothing to destroy");
            return Ok(());
        }
        info!(cluster = %driver.describe(), "destroying cluster");
        driver.destroy(&input).await
    }

    /// Point local tooling at the cluster without creating or destroying it
    ///
    /// Returns the kubeconfig context of the cluster.
    pub async fn set_context(&self, input: &InputParams) -> Result<String> {
        let input = self.input(input);
        let driver = self.kind.bound(&input).await?;
        driver.get_credentials(&input).await?;
        driver.context(&input).await
    }

    /// [`ClusterResource::set_context`] for a cluster that exists, `None` otherwise
    pub async fn connect(&self, input: &InputParams) -> Result<Option<String>> {
        let input = self.input(input);
        let driver = self.kind.bound(&input).await?;
        if driver.status(&input).await? == ClusterStatus::Absent {
            return Ok(None);
        }
        driver.get_credentials(&input).await?;
        Ok(Some(driver.context(&input).await?))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawCluster {
    gke: Option<GkeCluster>,
    eks: Option<EksCluster>,
    minikube: Option<MinikubeCluster>,
    kind: Option<KindCluster>,
    #[serde(default)]
    values: Values,
}

impl TryFrom<RawCluster> for ClusterResource {
    type Error = ClusterError;

    fn try_from(raw: RawCluster) -> Result<Self> {
        let mut kinds: Vec<ClusterKind> = [
            raw.gke.map(ClusterKind::Gke),
            raw.eks.map(ClusterKind::Eks),
            raw.minikube.map(ClusterKind::Minikube),
            raw.kind.map(ClusterKind::Kind),
        ]
        .into_iter()
        .flatten()
        .collect();

        let kind = match kinds.len() {
            1 => kinds.remove(0),
            0 => {
                return Err(ClusterError::invalid(
                    "cluster must define one of gke, eks, minikube or kind",
                ));
            }
            _ => {
                let names: Vec<_> = kinds.iter().map(ClusterKind::name).collect();
                return Err(ClusterError::invalid(format!(
                    "cluster defines more than one provider ({})",
                    names.join(", ")
                )));
            }
        };

        Ok(ClusterResource {
            kind,
            values: raw.values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use valet_core::{MockRunner, StaticRegistry};

    fn kind_cluster() -> ClusterResource {
        serde_yaml::from_str("kind:\n  name: \"{{ Env }}-valet\"\nvalues:\n  Env: dev\n").unwrap()
    }

    fn gke_cluster() -> ClusterResource {
        serde_yaml::from_str(
            "gke:\n  name: c1\n  project: p\n  operationInterval: 5s\n  operationTimeout: 1m\n",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_ensure_creates_missing_cluster() {
        let runner = MockRunner::new();
        let input = InputParams::for_testing(runner.clone(), StaticRegistry::new());

        let context = kind_cluster().ensure(&input).await.unwrap();

        assert_eq!(context, "kind-dev-valet");
        assert_eq!(
            runner.calls(),
            vec![
                "kind get clusters",
                "kind create cluster --name dev-valet",
                "kubectl config use-context kind-dev-valet",
            ]
        );
    }

    #[tokio::test]
    async fn test_ensure_reuses_running_cluster() {
        let runner = MockRunner::new();
        runner.respond("kind get clusters", "dev-valet\n");
        let input = InputParams::for_testing(runner.clone(), StaticRegistry::new());

        kind_cluster().ensure(&input).await.unwrap();
        assert_eq!(runner.count("kind create"), 0);
        assert_eq!(runner.count("kubectl config use-context"), 1);
    }

    #[tokio::test]
    async fn test_cluster_commands_ignore_inherited_context() {
        let runner = MockRunner::new();
        let input = InputParams::for_testing(runner.clone(), StaticRegistry::new())
            .with_kube_context("kind-parent");

        let context = kind_cluster().ensure(&input).await.unwrap();

        assert_eq!(context, "kind-dev-valet");
        assert!(runner.calls().iter().all(|c| !c.contains("kind-parent")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ensure_waits_for_provisioning_cluster() {
        let runner = MockRunner::new();
        runner
            .respond_once("gcloud container clusters describe", "PROVISIONING")
            .respond_once("gcloud container clusters describe", "PROVISIONING")
            .respond("gcloud container clusters describe", "RUNNING");
        let input = InputParams::for_testing(runner.clone(), StaticRegistry::new());

        let context = gke_cluster().ensure(&input).await.unwrap();

        assert_eq!(context, "gke_p_us-central1-a_c1");
        assert_eq!(runner.count("gcloud container clusters create"), 0);
        assert_eq!(runner.count("gcloud container clusters describe c1"), 3);
        assert_eq!(runner.count("gcloud container clusters get-credentials c1"), 1);
    }

    #[tokio::test]
    async fn test_teardown_destroys_provisioning_cluster() {
        let runner = MockRunner::new();
        runner.respond("gcloud container clusters describe", "PROVISIONING");
        let input = InputParams::for_testing(runner.clone(), StaticRegistry::new());

        gke_cluster().teardown(&input).await.unwrap();

        assert_eq!(
            runner.count("gcloud container clusters delete c1 --quiet --project p"),
            1
        );
    }

    #[tokio::test]
    async fn test_stopped_minikube_is_restarted_and_deleted() {
        let runner = MockRunner::new();
        runner
            .fail_once("minikube status", "Stopped")
            .fail_once("minikube status", "Stopped");
        let input = InputParams::for_testing(runner.clone(), StaticRegistry::new());
        let minikube: ClusterResource =
            serde_yaml::from_str("minikube:\n  profile: valet\n").unwrap();

        assert_eq!(minikube.ensure(&input).await.unwrap(), "valet");
        assert_eq!(runner.count("minikube start -p valet"), 1);

        minikube.teardown(&input).await.unwrap();
        assert_eq!(runner.count("minikube delete -p valet"), 1);
    }

    #[tokio::test]
    async fn test_teardown_only_destroys_existing_cluster() {
        let runner = MockRunner::new();
        let input = InputParams::for_testing(runner.clone(), StaticRegistry::new());
        kind_cluster().teardown(&input).await.unwrap();
        assert_eq!(runner.count("kind delete"), 0);

        runner.respond("kind get clusters", "dev-valet\n");
        kind_cluster().teardown(&input).await.unwrap();
        assert_eq!(runner.count("kind delete cluster --name dev-valet"), 1);
    }

    #[tokio::test]
    async fn test_set_context_only_switches() {
        let runner = MockRunner::new();
        let input = InputParams::for_testing(runner.clone(), StaticRegistry::new());
        let context = kind_cluster().set_context(&input).await.unwrap();
        assert_eq!(context, "kind-dev-valet");
        assert_eq!(runner.calls(), vec!["kubectl config use-context kind-dev-valet"]);
    }

    #[tokio::test]
    async fn test_connect_skips_missing_cluster() {
        let runner = MockRunner::new();
        let input = InputParams::for_testing(runner.clone(), StaticRegistry::new());
        assert_eq!(kind_cluster().connect(&input).await.unwrap(), None);
        assert_eq!(runner.count("kubectl config use-context"), 0);

        runner.respond("kind get clusters", "dev-valet\n");
        assert_eq!(
            kind_cluster().connect(&input).await.unwrap().as_deref(),
            Some("kind-dev-valet")
        );
    }

    #[test]
    fn test_provider_union_is_validated() {
        assert!(serde_yaml::from_str::<ClusterResource>("values: {A: b}\n").is_err());
        let err = serde_yaml::from_str::<ClusterResource>("kind: {}\nminikube: {}\n").unwrap_err();
        assert!(err.to_string().contains("minikube, kind"));
    }
}
