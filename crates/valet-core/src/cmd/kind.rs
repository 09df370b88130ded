//! kind invocations

use super::command::{Command, CommandBuilder};

/// Builder for `kind` commands
#[derive(Debug, Clone)]
pub struct Kind(CommandBuilder);

impl Kind {
    pub fn new() -> Self {
        Self(Command::builder("kind"))
    }

    /// Names of existing clusters, one per line
    pub fn get_clusters() -> Self {
        Self::new().args(["get", "clusters"])
    }

    pub fn create_cluster(name: &str) -> Self {
        Self::new().args(["create", "cluster", "--name", name])
    }

    pub fn delete_cluster(name: &str) -> Self {
        Self::new().args(["delete", "cluster", "--name", name])
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

impl Default for Kind {
    fn default() -> Self {
        Self::new()
    }
}
