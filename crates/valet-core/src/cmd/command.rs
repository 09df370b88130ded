//! Immutable command value and its builder

use std::fmt;

/// Replacement text for redacted literals in log lines
pub const REDACTED: &str = "<redacted>";

/// A single external tool invocation: program, argv and optional stdin
///
/// Redactions only affect the [`Display`](fmt::Display) form used in logs and
/// error messages; the process always receives the real arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    program: String,
    args: Vec<String>,
    stdin: Option<String>,
    redactions: Vec<String>,
}

impl Command {
    /// Start building a command for `program`
    pub fn builder(program: impl Into<String>) -> CommandBuilder {
        CommandBuilder {
            command: Command {
                program: program.into(),
                args: Vec::new(),
                stdin: None,
                redactions: Vec::new(),
            },
        }
    }

    /// A command run through `sh -c`
    pub fn shell(script: impl Into<String>) -> Command {
        Command::builder("sh").arg("-c").arg(script).build()
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn stdin(&self) -> Option<&str> {
        self.stdin.as_deref()
    }

    /// The unredacted command line, used for matching in tests
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// A copy aimed at one kubeconfig context
    ///
    /// Only `kubectl` and `helm` take a context; other programs are returned
    /// unchanged. The flag is appended so prefix matching on the rest of the
    /// command line still works.
    pub fn with_kube_context(&self, context: &str) -> Command {
        let flag = match self.program.as_str() {
            "kubectl" => "--context",
            "helm" => "--kube-context",
            _ => return self.clone(),
        };
        let mut scoped = self.clone();
        scoped.args.push(flag.to_string());
        scoped.args.push(context.to_string());
        scoped
    }

    /// The command line with every registered literal replaced
    pub fn redacted(&self) -> String {
        let mut line = self.command_line();
        for secret in self.redactions.iter().filter(|s| !s.is_empty()) {
            line = line.replace(secret.as_str(), REDACTED);
        }
        line
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

/// Fluent builder for [`Command`]
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    command: Command,
}

impl CommandBuilder {
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.command.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add `flag value` only when value is non-empty
    pub fn opt(self, flag: &str, value: &str) -> Self {
        if value.is_empty() {
            self
        } else {
            self.arg(flag).arg(value)
        }
    }

    pub fn stdin(mut self, stdin: impl Into<String>) -> Self {
        self.command.stdin = Some(stdin.into());
        self
    }

    /// Hide a literal from the logged command line
    pub fn redact(mut self, secret: impl Into<String>) -> Self {
        self.command.redactions.push(secret.into());
        self
    }

    pub fn build(self) -> Command {
        self.command
    }
}
