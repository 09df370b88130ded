//! kubectl invocations

use super::command::{Command, CommandBuilder};

/// Builder for `kubectl` commands
#[derive(Debug, Clone)]
pub struct Kubectl(CommandBuilder);

impl Default for Kubectl {
    fn default() -> Self {
        Self::new()
    }
}

impl Kubectl {
    pub fn new() -> Self {
        Self(Command::builder("kubectl"))
    }

    /// `kubectl apply -f -`, reading the document from stdin
    pub fn apply_stdin(document: impl Into<String>) -> Self {
        Self::new().args(["apply", "-f", "-"]).stdin(document)
    }

    /// `kubectl delete -f - --ignore-not-found`, reading the document from stdin
    pub fn delete_stdin(document: impl Into<String>) -> Self {
        Self::new()
            .args(["delete", "-f", "-"])
            .ignore_not_found()
            .stdin(document)
    }

    pub fn create_namespace(name: &str) -> Self {
        Self::new().args(["create", "namespace", name])
    }

    pub fn delete_namespace(name: &str) -> Self {
        Self::new().args(["delete", "namespace", name]).ignore_not_found()
    }

    pub fn create_generic_secret(name: &str) -> Self {
        Self::new().args(["create", "secret", "generic", name])
    }

    pub fn delete_secret(name: &str) -> Self {
        Self::new().args(["delete", "secret", name]).ignore_not_found()
    }

    pub fn get(kube_type: &str, name: &str) -> Self {
        Self::new().args(["get", kube_type, name])
    }

    /// `kubectl patch <type> <name> --type <patch_type> -p <patch>`
    pub fn patch(kube_type: &str, name: &str, patch_type: &str, patch: &str) -> Self {
        Self::new()
            .args(["patch", kube_type, name])
            .args(["--type", patch_type])
            .args(["-p", patch])
    }

    pub fn use_context(context: &str) -> Self {
        Self::new().args(["config", "use-context", context])
    }

    /// Context names in the local kubeconfig, one per line
    pub fn get_contexts() -> Self {
        Self::new().args(["config", "get-contexts", "-o", "name"])
    }

    pub fn namespace(self, namespace: &str) -> Self {
        Self(self.0.opt("-n", namespace))
    }

    /// Render the object client-side instead of creating it
    pub fn dry_run(self) -> Self {
        self.args(["--dry-run=client", "-o", "yaml"])
    }

    pub fn jsonpath(self, expr: &str) -> Self {
        self.arg(format!("-o=jsonpath={}", expr))
    }

    pub fn output_json(self) -> Self {
        self.args(["-o", "json"])
    }

    pub fn ignore_not_found(self) -> Self {
        self.arg("--ignore-not-found")
    }

    /// `--from-literal=key=value`, with the value hidden from logs
    pub fn from_literal(self, key: &str, value: &str) -> Self {
        Self(
            self.0
                .arg(format!("--from-literal={}={}", key, value))
                .redact(value),
        )
    }

    pub fn label(self, key: &str, value: &str) -> Self {
        self.arg(format!("--labels={}={}", key, value))
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

    pub fn stdin(self, stdin: impl Into<String>) -> Self {
        Self(self.0.stdin(stdin))
    }

    pub fn redact(self, secret: impl Into<String>) -> Self {
        Self(self.0.redact(secret))
    }

    pub fn build(self) -> Command {
        self.0.build()
    }
}

impl From<Kubectl> for Command {
    fn from(kubectl: Kubectl) -> Self {
        kubectl.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dry_run_namespace() {
        let cmd = Kubectl::create_namespace("gloo-system").dry_run().build();
        assert_eq!(
            cmd.command_line(),
            "kubectl create namespace gloo-system --dry-run=client -o yaml"
        );
    }

    #[test]
    fn test_apply_stdin() {
        let cmd = Kubectl::apply_stdin("kind: Namespace").build();
        assert_eq!(cmd.command_line(), "kubectl apply -f -");
        assert_eq!(cmd.stdin(), Some("kind: Namespace"));
    }

    #[test]
    fn test_from_literal_is_redacted() {
        let cmd = Kubectl::create_generic_secret("aws-creds")
            .namespace("gloo-system")
            .from_literal("secret_key", "s3cr3t")
            .build();

        assert!(cmd.command_line().contains("--from-literal=secret_key=s3cr3t"));
        assert_eq!(
            cmd.to_string(),
            "kubectl create secret generic aws-creds -n gloo-system --from-literal=secret_key=<redacted>"
        );
    }

    #[test]
    fn test_get_jsonpath() {
        let cmd = Kubectl::get("deployment", "gateway")
            .namespace("gloo-system")
            .jsonpath("{.status.readyReplicas}")
            .build();
        assert_eq!(
            cmd.command_line(),
            "kubectl get deployment gateway -n gloo-system -o=jsonpath={.status.readyReplicas}"
        );
    }
}
