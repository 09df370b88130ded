//! Generic secrets assembled from local and KMS-encrypted sources

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};
use valet_core::cmd::{Gcloud, Kubectl};
use valet_core::{Command, CoreError, InputParams};
use valet_engine::{Bindings, Field};

use super::{Deployable, apply, bind, dry_run, require};
use crate::error::Result;

/// A generic secret assembled from files, environment variables or
/// KMS-encrypted files
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Secret {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub namespace: String,

    /// Secret keys and where each value comes from
    #[serde(default)]
    pub entries: BTreeMap<String, SecretSource>,
}

/// Where a single secret entry is read from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SecretSource {
    /// Contents of a file in the default registry
    File(String),
    /// An environment variable
    EnvVar(String),
    GcloudKmsEncryptedFile(GcloudKmsEncryptedFile),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct GcloudKmsEncryptedFile {
    pub ciphertext_file: String,
    /// Falls back to the `GcloudProject` value
    pub gcloud_project: String,
    pub keyring: String,
    pub key: String,
    /// KMS location, `global` when unset
    pub location: String,
}

impl Bindings for Secret {
    fn fields(&mut self) -> Vec<Field<'_>> {
        let mut fields = vec![
            Field::new("name", &mut self.name).template(),
            Field::new("namespace", &mut self.namespace)
                .key("Namespace")
                .template(),
        ];
        for (entry, source) in self.entries.iter_mut() {
            match source {
                SecretSource::File(path) => fields.push(Field::new(entry, path).template()),
                SecretSource::EnvVar(name) => fields.push(Field::new(entry, name).template()),
                SecretSource::GcloudKmsEncryptedFile(kms) => fields.extend([
                    Field::new("ciphertextFile", &mut kms.ciphertext_file).template(),
                    Field::new("gcloudProject", &mut kms.gcloud_project)
                        .key("GcloudProject")
                        .template(),
                    Field::new("keyring", &mut kms.keyring).template(),
                    Field::new("key", &mut kms.key).template(),
                    Field::new("location", &mut kms.location).default("global"),
                ]),
            }
        }
        fields
    }
}

#[async_trait]
impl Deployable for Secret {
    async fn ensure(&self, input: &InputParams) -> Result<()> {
        let secret = bind(self, input).await?;
        let document = secret.document(input).await?;
        info!(secret = %secret.name, namespace = %secret.namespace, "ensuring secret");
        apply(input, &document).await
    }

    async fn teardown(&self, input: &InputParams) -> Result<()> {
        let secret = bind(self, input).await?;
        require("secret", "name", &secret.name)?;
        info!(secret = %secret.name, namespace = %secret.namespace, "deleting secret");
        let cmd = Kubectl::delete_secret(&secret.name).namespace(&secret.namespace);
        input.run(&Command::from(cmd)).await?;
        Ok(())
    }

    async fn render(&self, input: &InputParams) -> Result<String> {
        bind(self, input).await?.document(input).await
    }
}

impl Secret {
    async fn document(&self, input: &InputParams) -> Result<String> {
        require("secret", "name", &self.name)?;

        let mut cmd = Kubectl::create_generic_secret(&self.name).namespace(&self.namespace);
        for (entry, source) in &self.entries {
            let value = source.resolve(input).await?;
            cmd = cmd.from_literal(entry, &value);
        }
        dry_run(input, cmd).await
    }
}

impl SecretSource {
    async fn resolve(&self, input: &InputParams) -> Result<String> {
        match self {
            SecretSource::File(path) => Ok(input.load_file("", path).await?),
            SecretSource::EnvVar(name) => std::env::var(name).map_err(|_| {
                CoreError::EnvNotSet {
                    name: name.clone(),
                }
                .into()
            }),
            SecretSource::GcloudKmsEncryptedFile(kms) => kms.decrypt(input).await,
        }
    }
}

impl GcloudKmsEncryptedFile {
    /// Decrypt into a scratch directory that is removed on every exit path
    async fn decrypt(&self, input: &InputParams) -> Result<String> {
        let scratch = tempfile::tempdir().map_err(CoreError::from)?;
        let plaintext = scratch.path().join("plaintext");
        let plaintext_path = plaintext.to_string_lossy();

        debug!(ciphertext = %self.ciphertext_file, "decrypting with gcloud kms");
        let cmd = Gcloud::kms_decrypt(&self.ciphertext_file, &plaintext_path)
            .project(&self.gcloud_project)
            .opt("--keyring", &self.keyring)
            .opt("--key", &self.key)
            .opt("--location", &self.location)
            .build();
        input.run(&cmd).await?;

        let content = tokio::fs::read_to_string(&plaintext)
            .await
            .map_err(CoreError::from)?;
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use valet_core::{MockRunner, StaticRegistry};

    #[test]
    fn test_entry_must_have_exactly_one_source() {
        let secret: Secret = serde_yaml::from_str(
            "name: creds\nentries:\n  license: {file: license.key}\n  token: {envVar: TOKEN}\n",
        )
        .unwrap();
        assert_eq!(secret.entries.len(), 2);

        assert!(
            serde_yaml::from_str::<Secret>(
                "name: creds\nentries:\n  license: {file: a, envVar: B}\n"
            )
            .is_err()
        );
        assert!(serde_yaml::from_str::<Secret>("name: creds\nentries:\n  license: {}\n").is_err());
    }

    #[tokio::test]
    async fn test_literals_are_redacted_in_logs() {
        let runner = MockRunner::new();
        runner.respond("kubectl create secret", "kind: Secret\n");
        let registry = StaticRegistry::new().with_file("license.key", "LICENSE-123");
        let input = InputParams::for_testing(runner.clone(), registry)
            .with_values([("Namespace", "gloo-system")].into_iter().collect());

        let secret = Secret {
            name: "license".to_string(),
            entries: [(
                "license-key".to_string(),
                SecretSource::File("license.key".to_string()),
            )]
            .into_iter()
            .collect(),
            ..Default::default()
        };
        secret.ensure(&input).await.unwrap();

        let commands = runner.commands();
        assert_eq!(commands.len(), 2);
        assert!(
            commands[0]
                .command_line()
                .contains("--from-literal=license-key=LICENSE-123")
        );
        assert_eq!(
            commands[0].to_string(),
            "kubectl create secret generic license -n gloo-system --from-literal=license-key=<redacted> --dry-run=client -o yaml"
        );
        assert_eq!(commands[1].stdin(), Some("kind: Secret\n"));
    }

    #[tokio::test]
    async fn test_kms_scratch_removed_on_failure() {
        let runner = MockRunner::new();
        runner.fail("gcloud kms decrypt", "permission denied");
        let input = InputParams::for_testing(runner.clone(), StaticRegistry::new());

        let kms = GcloudKmsEncryptedFile {
            ciphertext_file: "license.enc".to_string(),
            gcloud_project: "solo-test".to_string(),
            keyring: "ci".to_string(),
            key: "license".to_string(),
            location: "global".to_string(),
        };
        assert!(kms.decrypt(&input).await.is_err());

        let line = runner.calls().remove(0);
        let plaintext = line
            .split_whitespace()
            .skip_while(|arg| *arg != "--plaintext-file")
            .nth(1)
            .unwrap()
            .to_string();
        let scratch = std::path::Path::new(&plaintext).parent().unwrap();
        assert!(!scratch.exists());
    }

    #[tokio::test]
    async fn test_teardown() {
        let runner = MockRunner::new();
        let input = InputParams::for_testing(runner.clone(), StaticRegistry::new());
        let secret = Secret {
            name: "aws-creds".to_string(),
            namespace: "gloo-system".to_string(),
            ..Default::default()
        };
        secret.teardown(&input).await.unwrap();
        assert_eq!(
            runner.calls(),
            vec!["kubectl delete secret aws-creds --ignore-not-found -n gloo-system"]
        );
    }
}
