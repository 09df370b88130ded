//! helm invocations

use super::command::{Command, CommandBuilder};

/// Builder for `helm` commands
#[derive(Debug, Clone)]
pub struct Helm(CommandBuilder);

impl Helm {
    pub fn new() -> Self {
        Self(Command::builder("helm"))
    }

    /// `helm template <release> <chart>` rendering manifests to stdout
    pub fn template(release_name: &str, chart: &str) -> Self {
        Self::new().args(["template", release_name, chart])
    }

    pub fn repo(self, url: &str) -> Self {
        Self(self.0.opt("--repo", url))
    }

    pub fn version(self, version: &str) -> Self {
        Self(self.0.opt("--version", version))
    }

    pub fn namespace(self, namespace: &str) -> Self {
        Self(self.0.opt("--namespace", namespace))
    }

    pub fn values_file(self, path: &str) -> Self {
        Self(self.0.opt("--values", path))
    }

    pub fn set(self, key: &str, value: &str) -> Self {
        self.args(["--set".to_string(), format!("{}={}", key, value)])
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

impl Default for Helm {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template() {
        let cmd = Helm::template("gloo", "gloo")
            .repo("https://storage.googleapis.com/solo-public-helm")
            .version("1.17.0")
            .namespace("gloo-system")
            .values_file("")
            .set("gateway.enabled", "true")
            .build();

        assert_eq!(
            cmd.command_line(),
            "helm template gloo gloo --repo https://storage.googleapis.com/solo-public-helm \
             --version 1.17.0 --namespace gloo-system --set gateway.enabled=true"
        );
    }
}
