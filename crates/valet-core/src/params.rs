//! Input parameters threaded through every ensure/teardown call

use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::cmd::{Command, HttpRequest, HttpResponse, MockRunner, ProcessRunner, Runner};
use crate::collaborators::{ArtifactDownloader, DnsClient, HttpDownloader, IngressClient};
use crate::error::{CoreError, Result};
use crate::registry::{DirectoryRegistry, Registries, Registry};
use crate::values::{Flags, Values};
use crate::wait;

/// External collaborators shared by every copy of a set of input params
#[derive(Clone)]
pub struct Collaborators {
    pub runner: Arc<dyn Runner>,
    pub registries: Registries,
    pub dns: Option<Arc<dyn DnsClient>>,
    pub ingress: Option<Arc<dyn IngressClient>>,
    pub downloader: Option<Arc<dyn ArtifactDownloader>>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("registries", &self.registries)
            .field("dns", &self.dns.is_some())
            .field("ingress", &self.ingress.is_some())
            .field("downloader", &self.downloader.is_some())
            .finish_non_exhaustive()
    }
}

impl Collaborators {
    pub fn new(runner: Arc<dyn Runner>, registries: Registries) -> Self {
        Self {
            runner,
            registries,
            dns: None,
            ingress: None,
            downloader: None,
        }
    }

    /// Real processes and HTTP downloads with a `default` registry at the
    /// working directory
    pub fn from_env() -> Result<Self> {
        let mut collaborators = Self::new(
            Arc::new(ProcessRunner::new()),
            Registries::with_default(DirectoryRegistry::working_dir()?),
        );
        collaborators.downloader = Some(Arc::new(HttpDownloader::new()));
        Ok(collaborators)
    }
}

/// Immutable-by-convention snapshot of values, flags and collaborators
///
/// `merge_values` and `merge_flags` return new copies; keys already present
/// always win. Cloning deep-copies values and flags while sharing the
/// collaborators and the cancellation token, which is what lets concurrent
/// cluster branches run without sharing mutable state.
///
/// `kube_context` names the kubeconfig context every `kubectl` and `helm`
/// command is sent to. Each branch carries its own; the kubeconfig's shared
/// current context is never relied on.
#[derive(Debug, Clone)]
pub struct InputParams {
    pub values: Values,
    pub flags: Flags,
    pub collaborators: Collaborators,
    pub cancel: CancellationToken,
    pub kube_context: Option<String>,
}

impl InputParams {
    pub fn new(collaborators: Collaborators) -> Self {
        Self {
            values: Values::new(),
            flags: Flags::new(),
            collaborators,
            cancel: CancellationToken::new(),
            kube_context: None,
        }
    }

    /// Params over a mock runner and the given default registry, for tests
    pub fn for_testing(runner: MockRunner, registry: impl Registry + 'static) -> Self {
        Self::new(Collaborators::new(
            Arc::new(runner),
            Registries::with_default(registry),
        ))
    }

    pub fn with_values(mut self, values: Values) -> Self {
        self.values = values;
        self
    }

    pub fn with_flags(mut self, flags: Flags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_dns(mut self, dns: Arc<dyn DnsClient>) -> Self {
        self.collaborators.dns = Some(dns);
        self
    }

    pub fn with_ingress(mut self, ingress: Arc<dyn IngressClient>) -> Self {
        self.collaborators.ingress = Some(ingress);
        self
    }

    pub fn with_downloader(mut self, downloader: Arc<dyn ArtifactDownloader>) -> Self {
        self.collaborators.downloader = Some(downloader);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Copy whose cluster commands target `context`
    pub fn with_kube_context(&self, context: impl Into<String>) -> InputParams {
        let mut scoped = self.clone();
        scoped.kube_context = Some(context.into());
        scoped
    }

    /// Copy whose cluster commands use the kubeconfig's current context
    pub fn without_kube_context(&self) -> InputParams {
        let mut unscoped = self.clone();
        unscoped.kube_context = None;
        unscoped
    }

    /// Copy with `values` merged underneath the existing ones
    pub fn merge_values(&self, values: &Values) -> InputParams {
        let mut merged = self.clone();
        merged.values = self.values.merge_values(values);
        merged
    }

    /// Copy with `flags` added
    pub fn merge_flags(&self, flags: &Flags) -> InputParams {
        let mut merged = self.clone();
        merged.flags = self.flags.merge_flags(flags);
        merged
    }

    /// Fail on the first required key that is absent
    pub fn check_required(&self, required: &[String]) -> Result<()> {
        match required.iter().find(|key| !self.values.contains_key(key)) {
            Some(key) => Err(CoreError::RequiredValueNotProvided { key: key.clone() }),
            None => Ok(()),
        }
    }

    pub fn runner(&self) -> &dyn Runner {
        self.collaborators.runner.as_ref()
    }

    pub fn registries(&self) -> &Registries {
        &self.collaborators.registries
    }

    pub fn dns(&self) -> Result<&dyn DnsClient> {
        self.collaborators
            .dns
            .as_deref()
            .ok_or(CoreError::MissingCollaborator("DNS client"))
    }

    pub fn downloader(&self) -> Result<&dyn ArtifactDownloader> {
        self.collaborators
            .downloader
            .as_deref()
            .ok_or(CoreError::MissingCollaborator("artifact downloader"))
    }

    /// Download an artifact through the configured downloader
    pub async fn download(&self, url: &str, destination: &Path) -> Result<()> {
        wait::cancellable(&self.cancel, self.downloader()?.download(url, destination)).await
    }

    /// `cmd` aimed at this run's kube context, if one is set
    pub fn scoped<'c>(&self, cmd: &'c Command) -> Cow<'c, Command> {
        match &self.kube_context {
            Some(context) => Cow::Owned(cmd.with_kube_context(context)),
            None => Cow::Borrowed(cmd),
        }
    }

    pub async fn load_file(&self, registry: &str, path: &str) -> Result<String> {
        wait::cancellable(&self.cancel, self.registries().load_file(registry, path)).await
    }

    pub async fn run(&self, cmd: &Command) -> Result<()> {
        let cmd = self.scoped(cmd);
        wait::cancellable(&self.cancel, self.runner().run(&cmd)).await
    }

    pub async fn output(&self, cmd: &Command) -> Result<String> {
        let cmd = self.scoped(cmd);
        wait::cancellable(&self.cancel, self.runner().output(&cmd)).await
    }

    pub async fn stream(&self, cmd: &Command) -> Result<()> {
        let cmd = self.scoped(cmd);
        wait::cancellable(&self.cancel, self.runner().stream(&cmd)).await
    }

    pub async fn request(&self, req: &HttpRequest) -> Result<HttpResponse> {
        wait::cancellable(&self.cancel, self.runner().request(req)).await
    }
}
