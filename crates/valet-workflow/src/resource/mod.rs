//! Deployable resources
//!
//! A [`Resource`] is exactly one of a namespace, secret, manifest, template,
//! helm chart, patch or application reference, plus resource-local default
//! values and the flags that must be active for it to run. Documents keep
//! the familiar "one optional key per kind" YAML shape; deserialization
//! rejects entries with no kind or more than one.

mod application;
mod helm;
mod manifest;
mod namespace;
mod patch;
mod secret;

pub use application::{Application, ApplicationRef};
pub use application::join_documents;
pub use helm::HelmChart;
pub use manifest::{Manifest, Template};
pub use namespace::Namespace;
pub use patch::Patch;
pub use secret::{GcloudKmsEncryptedFile, Secret, SecretSource};

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use valet_core::cmd::Kubectl;
use valet_core::{Command, Flags, InputParams, Values};
use valet_engine::{Bindings, Resolver};

use crate::error::{Result, WorkflowError};

/// Uniform lifecycle contract of everything a workflow can deploy
#[async_trait]
pub trait Deployable: Send + Sync {
    /// Create or update, idempotently
    async fn ensure(&self, input: &InputParams) -> Result<()>;

    /// Remove, treating "not found" as success
    async fn teardown(&self, input: &InputParams) -> Result<()>;

    /// The exact document `ensure` would apply, without applying it
    async fn render(&self, input: &InputParams) -> Result<String>;
}

/// The populated kind of a [`Resource`]
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceKind {
    Namespace(Namespace),
    Secret(Secret),
    Manifest(Manifest),
    Template(Template),
    HelmChart(HelmChart),
    Patch(Patch),
    Application(ApplicationRef),
}

impl ResourceKind {
    pub fn name(&self) -> &'static str {
        match self {
            ResourceKind::Namespace(_) => "namespace",
            ResourceKind::Secret(_) => "secret",
            ResourceKind::Manifest(_) => "manifest",
            ResourceKind::Template(_) => "template",
            ResourceKind::HelmChart(_) => "helmChart",
            ResourceKind::Patch(_) => "patch",
            ResourceKind::Application(_) => "application",
        }
    }

    fn deployable(&self) -> &dyn Deployable {
        match self {
            ResourceKind::Namespace(r) => r,
            ResourceKind::Secret(r) => r,
            ResourceKind::Manifest(r) => r,
            ResourceKind::Template(r) => r,
            ResourceKind::HelmChart(r) => r,
            ResourceKind::Patch(r) => r,
            ResourceKind::Application(r) => r,
        }
    }
}

/// One deployable unit with its local defaults and gating flags
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawResource")]
pub struct Resource {
    pub kind: ResourceKind,
    pub values: Values,
    pub flags: Flags,
}

impl Resource {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            values: Values::new(),
            flags: Flags::new(),
        }
    }

    pub fn with_values(mut self, values: Values) -> Self {
        self.values = values;
        self
    }

    pub fn with_flags(mut self, flags: Flags) -> Self {
        self.flags = flags;
        self
    }

    /// True when every flag this resource requires is active
    pub fn is_enabled(&self, active: &Flags) -> bool {
        active.contains_all(&self.flags)
    }
}

#[async_trait]
impl Deployable for Resource {
    async fn ensure(&self, input: &InputParams) -> Result<()> {
        let input = input.merge_values(&self.values);
        self.kind.deployable().ensure(&input).await
    }

    async fn teardown(&self, input: &InputParams) -> Result<()> {
        let input = input.merge_values(&self.values);
        self.kind.deployable().teardown(&input).await
    }

    async fn render(&self, input: &InputParams) -> Result<String> {
        let input = input.merge_values(&self.values);
        self.kind.deployable().render(&input).await
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawResource {
    namespace: Option<Namespace>,
    secret: Option<Secret>,
    manifest: Option<Manifest>,
    template: Option<Template>,
    helm_chart: Option<HelmChart>,
    patch: Option<Patch>,
    application: Option<ApplicationRef>,
    #[serde(default)]
    values: Values,
    #[serde(default)]
    flags: Flags,
}

impl TryFrom<RawResource> for Resource {
    type Error = WorkflowError;

    fn try_from(raw: RawResource) -> Result<Self> {
        let mut kinds: Vec<ResourceKind> = [
            raw.namespace.map(ResourceKind::Namespace),
            raw.secret.map(ResourceKind::Secret),
            raw.manifest.map(ResourceKind::Manifest),
            raw.template.map(ResourceKind::Template),
            raw.helm_chart.map(ResourceKind::HelmChart),
            raw.patch.map(ResourceKind::Patch),
            raw.application.map(ResourceKind::Application),
        ]
        .into_iter()
        .flatten()
        .collect();

        let kind = match kinds.len() {
            1 => kinds.remove(0),
            0 => {
                return Err(WorkflowError::invalid(
                    "resource must define one of namespace, secret, manifest, template, helmChart, patch or application",
                ));
            }
            _ => {
                let names: Vec<_> = kinds.iter().map(ResourceKind::name).collect();
                return Err(WorkflowError::invalid(format!(
                    "resource defines more than one kind ({}); split it into separate resources",
                    names.join(", ")
                )));
            }
        };

        Ok(Resource {
            kind,
            values: raw.values,
            flags: raw.flags,
        })
    }
}

/// A copy of `target` with every bound field resolved against `input`
pub(crate) async fn bind<T>(target: &T, input: &InputParams) -> Result<T>
where
    T: Bindings + Clone + Sync,
{
    let mut bound = target.clone();
    Resolver::new(input).render_fields(&mut bound).await?;
    Ok(bound)
}

/// Fail when a field is still empty after binding
pub(crate) fn require(kind: &str, field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(WorkflowError::invalid(format!("{kind}: '{field}' is required")));
    }
    Ok(())
}

/// Load and parse a YAML document from a registry
pub(crate) async fn load_document<T: DeserializeOwned>(
    input: &InputParams,
    registry: &str,
    path: &str,
) -> Result<T> {
    debug!(registry, path, "loading document");
    let content = input.load_file(registry, path).await?;
    serde_yaml::from_str(&content).map_err(|source| WorkflowError::Parse {
        path: path.to_string(),
        source,
    })
}

/// Render with a client-side dry run
pub(crate) async fn dry_run(input: &InputParams, cmd: Kubectl) -> Result<String> {
    Ok(input.output(&cmd.dry_run().build()).await?)
}

pub(crate) async fn apply(input: &InputParams, document: &str) -> Result<()> {
    input.run(&Command::from(Kubectl::apply_stdin(document))).await?;
    Ok(())
}

pub(crate) async fn delete(input: &InputParams, document: &str) -> Result<()> {
    input.run(&Command::from(Kubectl::delete_stdin(document))).await?;
    Ok(())
}
