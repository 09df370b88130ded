//! CLI commands

pub mod ensure;
pub mod render;
pub mod teardown;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};
use valet_cluster::ValetConfig;
use valet_core::values::parse_set_values;
use valet_core::{
    Collaborators, DirectoryRegistry, Flags, GlobalConfig, HttpDownloader, InputParams,
    ProcessRunner,
};

use crate::RunArgs;
use crate::error::{CliError, Result};

/// A loaded config and the input params it runs with
pub struct Session {
    pub config: ValetConfig,
    pub input: InputParams,
}

impl Session {
    /// Values layer as `--set` over the config file over the global config
    pub fn load(args: &RunArgs) -> Result<Self> {
        let config = ValetConfig::load(&args.file)?;
        let global = match &args.global_config {
            Some(path) => GlobalConfig::load_from(path)?,
            None => GlobalConfig::load()?,
        };

        let working_dir = args
            .file
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let mut registries = global.registries(working_dir);
        for entry in &args.registries {
            let (name, root) = parse_registry(entry)?;
            debug!(registry = %name, root = %root.display(), "registry from command line");
            registries.insert(name, Arc::new(DirectoryRegistry::new(root)));
        }

        let values = parse_set_values(&args.set)?
            .merge_values(&config.values)
            .merge_values(&global.values);
        let flags: Flags = args
            .flags
            .iter()
            .map(|f| f.trim())
            .filter(|f| !f.is_empty())
            .collect();

        let input = InputParams::new(Collaborators::new(
            Arc::new(ProcessRunner::new()),
            registries,
        ))
        .with_downloader(Arc::new(HttpDownloader::new()))
        .with_values(values)
        .with_flags(flags);

        Ok(Self { config, input })
    }

    /// Cancel every in-flight command and wait on the first Ctrl-C
    pub fn cancel_on_interrupt(&self) {
        let cancel = self.input.cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, cancelling");
                cancel.cancel();
            }
        });
    }
}

fn parse_registry(entry: &str) -> Result<(String, PathBuf)> {
    match entry.split_once('=') {
        Some((name, root)) if !name.trim().is_empty() && !root.trim().is_empty() => {
            Ok((name.trim().to_string(), PathBuf::from(root.trim())))
        }
        _ => Err(CliError::usage(format!(
            "invalid --registry '{}', expected name=path",
            entry
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(file: PathBuf) -> RunArgs {
        RunArgs {
            file,
            set: vec!["Namespace=from-cli".to_string()],
            flags: vec!["smoke".to_string(), " ".to_string()],
            registries: vec![],
            global_config: None,
        }
    }

    #[test]
    fn test_value_layering() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("valet.yaml");
        std::fs::write(
            &file,
            "values:\n  Namespace: from-config\n  Domain: from-config\n",
        )
        .unwrap();
        let global = dir.path().join("global.yaml");
        std::fs::write(
            &global,
            "values:\n  Domain: from-global\n  Zone: from-global\n",
        )
        .unwrap();

        let session = Session::load(&RunArgs {
            global_config: Some(global),
            ..args(file)
        })
        .unwrap();

        let values = &session.input.values;
        assert_eq!(values.get_raw("Namespace"), Some("from-cli"));
        assert_eq!(values.get_raw("Domain"), Some("from-config"));
        assert_eq!(values.get_raw("Zone"), Some("from-global"));
        assert!(session.input.flags.contains("smoke"));
        assert_eq!(session.input.flags.iter().count(), 1);
        assert!(session.input.downloader().is_ok());
    }

    #[test]
    fn test_parse_registry() {
        let (name, root) = parse_registry("catalog=./catalog").unwrap();
        assert_eq!(name, "catalog");
        assert_eq!(root, PathBuf::from("./catalog"));

        assert!(matches!(parse_registry("catalog"), Err(CliError::Usage { .. })));
        assert!(parse_registry("=./catalog").is_err());
    }
}
