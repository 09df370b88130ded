//! User-level configuration stored at `~/.valet/global.yaml`

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::Result;
use crate::registry::{DEFAULT_REGISTRY, DirectoryRegistry, Registries, is_url};
use crate::values::Values;

/// A named registry root
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegistryConfig {
    /// Directory (relative to the config file's parent) or `http(s)` URL base
    pub path: String,
}

/// Global defaults shared by every invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GlobalConfig {
    #[serde(default)]
    pub registries: BTreeMap<String, RegistryConfig>,

    /// Values merged under `--set` and the config file
    #[serde(default)]
    pub values: Values,

    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl GlobalConfig {
    /// `~/.valet/global.yaml`, if a home directory is known
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".valet").join("global.yaml"))
    }

    /// Load the config at the default location, or an empty one when absent
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load the config at `path`, or an empty one when the file does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no global config");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let mut config: GlobalConfig = serde_yaml::from_str(&content)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Registries for a run: `default` at `working_dir`, then every named root
    ///
    /// A named `default` entry replaces the working directory.
    pub fn registries(&self, working_dir: &Path) -> Registries {
        let mut registries = Registries::with_default(DirectoryRegistry::new(working_dir));
        for (name, registry) in &self.registries {
            let root = self.resolve_root(&registry.path);
            if name == DEFAULT_REGISTRY {
                tracing::debug!(root = %root.display(), "overriding default registry");
            }
            registries.insert(name.clone(), Arc::new(DirectoryRegistry::new(root)));
        }
        registries
    }

    fn resolve_root(&self, path: &str) -> PathBuf {
        if is_url(path) {
            return PathBuf::from(path);
        }
        let path = PathBuf::from(path);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path,
        }
    }
}
