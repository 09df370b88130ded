//! gcloud invocations for GKE clusters and KMS decryption

use super::command::{Command, CommandBuilder};

/// Builder for `gcloud` commands
#[derive(Debug, Clone)]
pub struct Gcloud(CommandBuilder);

impl Gcloud {
    pub fn new() -> Self {
        Self(Command::builder("gcloud"))
    }

    pub fn describe_cluster(name: &str) -> Self {
        Self::new().args(["container", "clusters", "describe", name])
    }

    /// Start cluster creation without waiting; prints the operation name
    pub fn create_cluster_async(name: &str) -> Self {
        Self::new()
            .args(["container", "clusters", "create", name])
            .arg("--async")
            .format("value(name)")
    }

    pub fn delete_cluster(name: &str) -> Self {
        Self::new()
            .args(["container", "clusters", "delete", name])
            .arg("--quiet")
    }

    pub fn describe_operation(operation: &str) -> Self {
        Self::new().args(["container", "operations", "describe", operation])
    }

    pub fn get_credentials(name: &str) -> Self {
        Self::new().args(["container", "clusters", "get-credentials", name])
    }

    /// `gcloud kms decrypt` writing plaintext to a file
    pub fn kms_decrypt(ciphertext_file: &str, plaintext_file: &str) -> Self {
        Self::new()
            .args(["kms", "decrypt"])
            .args(["--ciphertext-file", ciphertext_file])
            .args(["--plaintext-file", plaintext_file])
    }

    pub fn project(self, project: &str) -> Self {
        Self(self.0.opt("--project", project))
    }

    pub fn zone(self, zone: &str) -> Self {
        Self(self.0.opt("--zone", zone))
    }

    pub fn format(self, format: &str) -> Self {
        self.arg(format!("--format={}", format))
    }

    pub fn opt(self, flag: &str, value: &str) -> Self {
        Self(self.0.opt(flag, value))
    }

    pub fn arg(self, arg: impl Into<String>) -> Self {
        Self(self.0.arg(arg))
    }

    pub fn args<I, S>(self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(self.0.args(args))
    }

    pub fn build(self) -> Command {
        self.0.build()
    }
}

impl Default for Gcloud {
    fn default() -> Self {
        Self::new()
    }
}
