//! One workflow step and the flags that gate it

use serde::Deserialize;
use tracing::{debug, warn};
use valet_core::{Flags, InputParams, Values};

use super::{Condition, Curl, DnsEntry, WorkflowRef};
use crate::error::{Result, WorkflowError};
use crate::resource::{ApplicationRef, Deployable, HelmChart, Patch, Resource};

/// The single action a [`Step`] performs
#[derive(Debug, Clone, PartialEq)]
pub enum StepKind {
    Install(ApplicationRef),
    Uninstall(ApplicationRef),
    Apply(Resource),
    Delete(Resource),
    HelmDeploy(HelmChart),
    Patch(Patch),
    Workflow(WorkflowRef),
    Curl(Curl),
    Condition(Condition),
    DnsEntry(DnsEntry),
}

impl StepKind {
    pub fn name(&self) -> &'static str {
        match self {
            StepKind::Install(_) => "install",
            StepKind::Uninstall(_) => "uninstall",
            StepKind::Apply(_) => "apply",
            StepKind::Delete(_) => "delete",
            StepKind::HelmDeploy(_) => "helmDeploy",
            StepKind::Patch(_) => "patch",
            StepKind::Workflow(_) => "workflow",
            StepKind::Curl(_) => "curl",
            StepKind::Condition(_) => "condition",
            StepKind::DnsEntry(_) => "dnsEntry",
        }
    }

    fn tears_down(&self) -> bool {
        matches!(self, StepKind::Uninstall(_) | StepKind::Delete(_))
    }
}

/// One workflow action with its local values and gating flags
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawStep")]
pub struct Step {
    pub kind: StepKind,
    pub values: Values,
    pub flags: Flags,
}

impl Step {
    pub fn new(kind: StepKind) -> Self {
        Self {
            kind,
            values: Values::new(),
            flags: Flags::new(),
        }
    }

    pub fn with_flags(mut self, flags: Flags) -> Self {
        self.flags = flags;
        self
    }

    pub fn is_enabled(&self, active: &Flags) -> bool {
        active.contains_all(&self.flags)
    }

    pub async fn ensure(&self, input: &InputParams) -> Result<()> {
        let input = input.merge_values(&self.values);
        match &self.kind {
            StepKind::Install(app) => app.ensure(&input).await,
            StepKind::Uninstall(app) => app.teardown(&input).await,
            StepKind::Apply(resource) => resource.ensure(&input).await,
            StepKind::Delete(resource) => resource.teardown(&input).await,
            StepKind::HelmDeploy(chart) => chart.ensure(&input).await,
            StepKind::Patch(patch) => patch.ensure(&input).await,
            StepKind::Workflow(workflow) => workflow.ensure(&input).await,
            StepKind::Curl(curl) => curl.ensure(&input).await,
            StepKind::Condition(condition) => condition.ensure(&input).await,
            StepKind::DnsEntry(entry) => entry.ensure(&input).await,
        }
    }

    /// Undo what `ensure` created; checks, patches, DNS records and
    /// teardown-oriented steps have nothing to undo
    pub async fn teardown(&self, input: &InputParams) -> Result<()> {
        let input = input.merge_values(&self.values);
        match &self.kind {
            StepKind::Install(app) => app.teardown(&input).await,
            StepKind::Apply(resource) => resource.teardown(&input).await,
            StepKind::HelmDeploy(chart) => chart.teardown(&input).await,
            StepKind::Workflow(workflow) => workflow.teardown(&input).await,
            other => {
                debug!(step = other.name(), "nothing to tear down");
                Ok(())
            }
        }
    }

    /// The document this step would apply, if it applies one
    pub async fn render(&self, input: &InputParams) -> Result<Option<String>> {
        let input = input.merge_values(&self.values);
        let document = match &self.kind {
            StepKind::Install(app) => app.render(&input).await?,
            StepKind::Apply(resource) => resource.render(&input).await?,
            StepKind::HelmDeploy(chart) => chart.render(&input).await?,
            StepKind::Patch(patch) => patch.render(&input).await?,
            StepKind::Workflow(workflow) => workflow.render(&input).await?,
            _ => return Ok(None),
        };
        Ok(Some(document))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawStep {
    install: Option<ApplicationRef>,
    uninstall: Option<ApplicationRef>,
    apply: Option<Resource>,
    delete: Option<Resource>,
    helm_deploy: Option<HelmChart>,
    patch: Option<Patch>,
    workflow: Option<WorkflowRef>,
    curl: Option<Curl>,
    condition: Option<Condition>,
    dns_entry: Option<DnsEntry>,
    #[serde(default)]
    values: Values,
    #[serde(default)]
    flags: Flags,
}

impl TryFrom<RawStep> for Step {
    type Error = WorkflowError;

    /// Exactly one action, except that a teardown action alongside forward
    /// actions wins
    fn try_from(raw: RawStep) -> Result<Self> {
        let kinds: Vec<StepKind> = [
            raw.install.map(StepKind::Install),
            raw.uninstall.map(StepKind::Uninstall),
            raw.apply.map(StepKind::Apply),
            raw.delete.map(StepKind::Delete),
            raw.helm_deploy.map(StepKind::HelmDeploy),
            raw.patch.map(StepKind::Patch),
            raw.workflow.map(StepKind::Workflow),
            raw.curl.map(StepKind::Curl),
            raw.condition.map(StepKind::Condition),
            raw.dns_entry.map(StepKind::DnsEntry),
        ]
        .into_iter()
        .flatten()
        .collect();

        let names: Vec<_> = kinds.iter().map(StepKind::name).collect();
        let (mut teardown, forward): (Vec<_>, Vec<_>) =
            kinds.into_iter().partition(StepKind::tears_down);

        let kind = match (teardown.len(), forward.len()) {
            (0, 0) => {
                return Err(WorkflowError::invalid(
                    "step must define one of install, uninstall, apply, delete, helmDeploy, patch, workflow, curl, condition or dnsEntry",
                ));
            }
            (0, 1) => forward.into_iter().next(),
            (1, 0) => teardown.pop(),
            (1, _) => {
                warn!(actions = %names.join(", "), "step mixes teardown and install actions, tearing down");
                teardown.pop()
            }
            _ => {
                return Err(WorkflowError::invalid(format!(
                    "step defines more than one action ({}); split it into separate steps",
                    names.join(", ")
                )));
            }
        };

        let kind = kind.ok_or_else(|| WorkflowError::invalid("step has no action"))?;
        Ok(Step {
            kind,
            values: raw.values,
            flags: raw.flags,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_action() {
        let step: Step = serde_yaml::from_str(
            "curl:\n  service: {name: gateway-proxy, namespace: gloo-system}\nflags: [smoke]\n",
        )
        .unwrap();
        assert_eq!(step.kind.name(), "curl");
        assert!(!step.is_enabled(&Flags::new()));
    }

    #[test]
    fn test_teardown_action_wins() {
        let step: Step = serde_yaml::from_str(
            "apply:\n  manifest: {path: petstore.yaml}\ndelete:\n  manifest: {path: petstore.yaml}\n",
        )
        .unwrap();
        assert!(matches!(step.kind, StepKind::Delete(_)));
    }

    #[test]
    fn test_ambiguous_steps_are_rejected() {
        let err = serde_yaml::from_str::<Step>(
            "apply:\n  manifest: {path: a.yaml}\npatch: {path: p.yaml, kubeType: deployment, name: gateway}\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("apply, patch"));

        assert!(
            serde_yaml::from_str::<Step>(
                "uninstall: {path: a.yaml}\ndelete:\n  manifest: {path: a.yaml}\n"
            )
            .is_err()
        );
        assert!(serde_yaml::from_str::<Step>("values: {A: b}\n").is_err());
    }
}
