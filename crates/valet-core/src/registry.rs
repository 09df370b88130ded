//! Registries: named resolvers of relative paths to file content

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{CoreError, Result};

/// Name used when a document does not specify a registry
pub const DEFAULT_REGISTRY: &str = "default";

/// Resolves a path to file content
#[async_trait]
pub trait Registry: Send + Sync {
    async fn load_file(&self, path: &str) -> Result<String>;
}

/// True when `path` should be fetched rather than read from disk
pub fn is_url(path: &str) -> bool {
    url::Url::parse(path)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Reads files relative to a root directory, or fetches `path` when it is a URL
///
/// A root that is itself an `http(s)` URL is a remote base: relative paths
/// are fetched from `root/path`.
#[derive(Debug, Clone)]
pub struct DirectoryRegistry {
    root: PathBuf,
    http: reqwest::Client,
}

impl DirectoryRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Registry rooted at the process working directory
    pub fn working_dir() -> Result<Self> {
        Ok(Self::new(std::env::current_dir()?))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        let http_err = |e: reqwest::Error| CoreError::Http {
            url: url.to_string(),
            message: e.to_string(),
        };
        let response = self.http.get(url).send().await.map_err(http_err)?;
        let response = response.error_for_status().map_err(http_err)?;
        response.text().await.map_err(http_err)
    }
}

#[async_trait]
impl Registry for DirectoryRegistry {
    async fn load_file(&self, path: &str) -> Result<String> {
        if is_url(path) {
            return self.fetch(path).await;
        }
        if let Some(base) = self.root.to_str().filter(|root| is_url(root)) {
            let url = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));
            return self.fetch(&url).await;
        }
        let full = self.root.join(path);
        tracing::debug!(path = %full.display(), "loading file");
        Ok(tokio::fs::read_to_string(&full).await?)
    }
}

/// Registry over in-memory documents, keyed by path
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    files: BTreeMap<String, String>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }
}

#[async_trait]
impl Registry for StaticRegistry {
    async fn load_file(&self, path: &str) -> Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            CoreError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no such file: {}", path),
            ))
        })
    }
}

/// The set of named registries available to a run
#[derive(Clone, Default)]
pub struct Registries {
    registries: BTreeMap<String, Arc<dyn Registry>>,
}

impl std::fmt::Debug for Registries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registries")
            .field("names", &self.registries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Registries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registries with only `default`, bound to `registry`
    pub fn with_default(registry: impl Registry + 'static) -> Self {
        Self::new().with(DEFAULT_REGISTRY, registry)
    }

    pub fn with(mut self, name: impl Into<String>, registry: impl Registry + 'static) -> Self {
        self.registries.insert(name.into(), Arc::new(registry));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, registry: Arc<dyn Registry>) {
        self.registries.insert(name.into(), registry);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.registries.contains_key(resolve_name(name))
    }

    /// Load `path` from the named registry; an empty name means `default`
    pub async fn load_file(&self, registry: &str, path: &str) -> Result<String> {
        let name = resolve_name(registry);
        let reg = self
            .registries
            .get(name)
            .ok_or_else(|| CoreError::RegistryNotFound {
                name: name.to_string(),
            })?;

        reg.load_file(path)
            .await
            .map_err(|e| CoreError::RegistryLoad {
                registry: name.to_string(),
                path: path.to_string(),
                message: e.to_string(),
            })
    }
}

fn resolve_name(name: &str) -> &str {
    if name.is_empty() { DEFAULT_REGISTRY } else { name }
}
