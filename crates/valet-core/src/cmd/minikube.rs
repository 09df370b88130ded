//! minikube invocations

use super::command::{Command, CommandBuilder};

/// Builder for `minikube` commands
#[derive(Debug, Clone)]
pub struct Minikube(CommandBuilder);

impl Minikube {
    pub fn new() -> Self {
        Self(Command::builder("minikube"))
    }

    /// Host status of a profile, e.g. `Running` or `Stopped`
    pub fn status(profile: &str) -> Self {
        Self::new()
            .arg("status")
            .profile(profile)
            .arg("--format={{.Host}}")
    }

    pub fn start(profile: &str) -> Self {
        Self::new().arg("start").profile(profile)
    }

    pub fn delete(profile: &str) -> Self {
        Self::new().arg("delete").profile(profile)
    }

    pub fn profile(self, profile: &str) -> Self {
        Self(self.0.opt("-p", profile))
    }

    pub fn opt(self, flag: &str, value: &str) -> Self {
        Self(self.0.opt(flag, value))
    }

    pub fn arg(self, arg: impl Into<String>) -> Self {
        Self(self.0.arg(arg))
    }

    pub fn build(self) -> Command {
        self.0.build()
    }
}

impl Default for Minikube {
    fn default() -> Self {
        Self::new()
    }
}
