//! eksctl invocations

use super::command::{Command, CommandBuilder};

/// Builder for `eksctl` commands
#[derive(Debug, Clone)]
pub struct Eksctl(CommandBuilder);

impl Eksctl {
    pub fn new() -> Self {
        Self(Command::builder("eksctl"))
    }

    /// Cluster description as JSON
    pub fn get_cluster(name: &str) -> Self {
        Self::new()
            .args(["get", "cluster", "--name", name])
            .args(["-o", "json"])
    }

    pub fn create_cluster(name: &str) -> Self {
        Self::new().args(["create", "cluster", "--name", name])
    }

    pub fn delete_cluster(name: &str) -> Self {
        Self::new().args(["delete", "cluster", "--name", name])
    }

    pub fn write_kubeconfig(name: &str) -> Self {
        Self::new().args(["utils", "write-kubeconfig", "--cluster", name])
    }

    pub fn region(self, region: &str) -> Self {
        Self(self.0.opt("--region", region))
    }

    pub fn opt(self, flag: &str, value: &str) -> Self {
        Self(self.0.opt(flag, value))
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

impl Default for Eksctl {
    fn default() -> Self {
        Self::new()
    }
}
