//! Runner trait and the process/HTTP implementation

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::ChildStdin;
use tracing::{debug, info};

use super::command::Command;
use crate::error::{CoreError, Result};

/// Raw HTTP request issued through a [`Runner`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Status and body of an HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Executes commands and HTTP requests
///
/// Implementations must be stateless with respect to callers: one runner is
/// shared by every concurrent multi-cluster branch.
#[async_trait]
pub trait Runner: Send + Sync {
    /// Run a command, discarding its output
    async fn run(&self, cmd: &Command) -> Result<()>;

    /// Run a command and capture stdout followed by stderr
    async fn output(&self, cmd: &Command) -> Result<String>;

    /// Run a long command, logging each output line as it arrives
    async fn stream(&self, cmd: &Command) -> Result<()>;

    /// Issue a raw HTTP request
    async fn request(&self, req: &HttpRequest) -> Result<HttpResponse>;
}

/// Runner backed by real processes and a reqwest client
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    http: reqwest::Client,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    fn spawn(&self, cmd: &Command) -> Result<tokio::process::Child> {
        let stdin = if cmd.stdin().is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        };

        tokio::process::Command::new(cmd.program())
            .args(cmd.args())
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CoreError::CommandSpawn {
                command: cmd.to_string(),
                source,
            })
    }
}

/// Write `input` to the child's stdin, then close it
///
/// Runs alongside the output readers: a child that fills its stdout before
/// draining stdin would otherwise block forever. A child that exits without
/// reading everything is judged by its exit status, not the broken pipe.
async fn feed_stdin(input: Option<&str>, pipe: Option<ChildStdin>) -> std::io::Result<()> {
    let (Some(input), Some(mut pipe)) = (input, pipe) else {
        return Ok(());
    };
    match pipe.write_all(input.as_bytes()).await {
        Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => Err(e),
        _ => Ok(()),
    }
}

#[async_trait]
impl Runner for ProcessRunner {
    async fn run(&self, cmd: &Command) -> Result<()> {
        self.output(cmd).await.map(|_| ())
    }

    async fn output(&self, cmd: &Command) -> Result<String> {
        info!(command = %cmd, "running");
        let mut child = self.spawn(cmd)?;
        let stdin = child.stdin.take();

        let (fed, output) = tokio::join!(feed_stdin(cmd.stdin(), stdin), child.wait_with_output());
        fed?;
        let output = output?;
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if output.status.success() {
            Ok(combined)
        } else {
            Err(CoreError::CommandFailed {
                command: cmd.to_string(),
                code: output.status.code(),
                output: combined,
            })
        }
    }

    async fn stream(&self, cmd: &Command) -> Result<()> {
        info!(command = %cmd, "streaming");
        let mut child = self.spawn(cmd)?;

        let program = cmd.program();
        let (fed, stdout, stderr) = tokio::join!(
            feed_stdin(cmd.stdin(), child.stdin.take()),
            log_lines(child.stdout.take(), program),
            log_lines(child.stderr.take(), program),
        );
        fed?;
        let mut captured = stdout?;
        captured.push_str(&stderr?);

        let status = child.wait().await?;
        if status.success() {
            Ok(())
        } else {
            Err(CoreError::CommandFailed {
                command: cmd.to_string(),
                code: status.code(),
                output: captured,
            })
        }
    }

    async fn request(&self, req: &HttpRequest) -> Result<HttpResponse> {
        debug!(method = %req.method, url = %req.url, "http request");
        let method = reqwest::Method::from_bytes(req.method.as_bytes()).map_err(|e| {
            CoreError::Http {
                url: req.url.clone(),
                message: e.to_string(),
            }
        })?;

        let mut builder = self.http.request(method, &req.url);
        for (name, value) in &req.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &req.body {
            builder = builder.body(body.clone());
        }

        let http_err = |e: reqwest::Error| CoreError::Http {
            url: req.url.clone(),
            message: e.to_string(),
        };
        let response = builder.send().await.map_err(http_err)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(http_err)?;

        Ok(HttpResponse { status, body })
    }
}

/// Log each line of a child pipe as it arrives, returning everything read
async fn log_lines<R>(pipe: Option<R>, program: &str) -> std::io::Result<String>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut captured = String::new();
    let Some(pipe) = pipe else {
        return Ok(captured);
    };

    let mut lines = BufReader::new(pipe).lines();
    while let Some(line) = lines.next_line().await? {
        info!(program, "{}", line);
        captured.push_str(&line);
        captured.push('\n');
    }
    Ok(captured)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_output_captures_stdout() {
        let runner = ProcessRunner::new();
        let out = runner
            .output(&Command::shell("echo hello"))
            .await
            .unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[tokio::test]
    async fn test_output_feeds_stdin() {
        let runner = ProcessRunner::new();
        let cmd = Command::builder("cat").stdin("piped text").build();
        let out = runner.output(&cmd).await.unwrap();
        assert_eq!(out, "piped text");
    }

    #[tokio::test]
    async fn test_large_stdin_does_not_block_on_output() {
        // larger than any pipe buffer, echoed straight back by cat
        let document = "kind: ConfigMap\n".repeat(64 * 1024);
        let runner = ProcessRunner::new();
        let cmd = Command::builder("cat").stdin(document.clone()).build();

        let out = tokio::time::timeout(std::time::Duration::from_secs(30), runner.output(&cmd))
            .await
            .expect("cat deadlocked on a full pipe")
            .unwrap();
        assert_eq!(out.len(), document.len());

        tokio::time::timeout(std::time::Duration::from_secs(30), runner.stream(&cmd))
            .await
            .expect("cat deadlocked on a full pipe")
            .unwrap();
    }

    #[tokio::test]
    async fn test_failure_carries_output_and_code() {
        let runner = ProcessRunner::new();
        let err = runner
            .run(&Command::shell("echo boom >&2; exit 3"))
            .await
            .unwrap_err();

        match err {
            CoreError::CommandFailed { code, output, .. } => {
                assert_eq!(code, Some(3));
                assert!(output.contains("boom"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_stream_succeeds_and_fails() {
        let runner = ProcessRunner::new();
        runner
            .stream(&Command::shell("echo one; echo two >&2"))
            .await
            .unwrap();
        assert!(runner.stream(&Command::shell("exit 1")).await.is_err());
    }

    #[tokio::test]
    async fn test_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .and(header("x-request-id", "valet"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let runner = ProcessRunner::new();
        let response = runner
            .request(
                &HttpRequest::get(format!("{}/status", server.uri()))
                    .header("x-request-id", "valet"),
            )
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, "ok");
    }
}
