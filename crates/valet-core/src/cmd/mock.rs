//! Scripted runner for testing
//!
//! Records every command and request, and answers from prefix-matched rules
//! instead of spawning processes. Unmatched commands succeed with empty output.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use super::command::Command;
use super::runner::{HttpRequest, HttpResponse, Runner};
use crate::error::{CoreError, Result};

#[derive(Debug, Clone)]
enum Reply {
    Output(String),
    Fail(String),
}

#[derive(Debug)]
struct Rule<T> {
    prefix: String,
    reply: T,
    once: bool,
}

#[derive(Debug, Default)]
struct MockState {
    rules: Vec<Rule<Reply>>,
    http_rules: Vec<Rule<std::result::Result<HttpResponse, String>>>,
    calls: Vec<Command>,
    requests: Vec<HttpRequest>,
}

/// In-memory [`Runner`] for unit tests
///
/// Rules match on the unredacted command line (or URL for requests) by prefix.
/// One-shot rules are consumed in insertion order before repeating rules apply,
/// which makes it easy to script polling sequences.
#[derive(Debug, Clone, Default)]
pub struct MockRunner {
    state: Arc<Mutex<MockState>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every matching command returns `output`
    pub fn respond(&self, prefix: &str, output: &str) -> &Self {
        self.push(prefix, Reply::Output(output.to_string()), false)
    }

    /// The next matching command returns `output`
    pub fn respond_once(&self, prefix: &str, output: &str) -> &Self {
        self.push(prefix, Reply::Output(output.to_string()), true)
    }

    /// Every matching command fails with `message`
    pub fn fail(&self, prefix: &str, message: &str) -> &Self {
        self.push(prefix, Reply::Fail(message.to_string()), false)
    }

    /// The next matching command fails with `message`
    pub fn fail_once(&self, prefix: &str, message: &str) -> &Self {
        self.push(prefix, Reply::Fail(message.to_string()), true)
    }

    /// Every request whose URL starts with `prefix` gets this response
    pub fn respond_http(&self, prefix: &str, status: u16, body: &str) -> &Self {
        self.push_http(prefix, Ok(HttpResponse { status, body: body.to_string() }), false)
    }

    /// The next request whose URL starts with `prefix` gets this response
    pub fn respond_http_once(&self, prefix: &str, status: u16, body: &str) -> &Self {
        self.push_http(prefix, Ok(HttpResponse { status, body: body.to_string() }), true)
    }

    /// The next request whose URL starts with `prefix` fails at the transport level
    pub fn fail_http_once(&self, prefix: &str, message: &str) -> &Self {
        self.push_http(prefix, Err(message.to_string()), true)
    }

    /// Command lines executed so far, unredacted, in order
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.iter().map(Command::command_line).collect()
    }

    /// Commands executed so far, with stdin and redactions
    pub fn commands(&self) -> Vec<Command> {
        self.lock().calls.clone()
    }

    /// Requests issued so far
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.lock().requests.clone()
    }

    /// Number of recorded commands starting with `prefix`
    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        // a panicking test thread must not hide the calls from other assertions
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn push(&self, prefix: &str, reply: Reply, once: bool) -> &Self {
        self.lock().rules.push(Rule {
            prefix: prefix.to_string(),
            reply,
            once,
        });
        self
    }

    fn push_http(
        &self,
        prefix: &str,
        reply: std::result::Result<HttpResponse, String>,
        once: bool,
    ) -> &Self {
        self.lock().http_rules.push(Rule {
            prefix: prefix.to_string(),
            reply,
            once,
        });
        self
    }

    fn answer(&self, cmd: &Command) -> Result<String> {
        let line = cmd.command_line();
        let reply = {
            let mut state = self.lock();
            state.calls.push(cmd.clone());
            take_reply(&mut state.rules, &line)
        };

        match reply {
            None => Ok(String::new()),
            Some(Reply::Output(output)) => Ok(output),
            Some(Reply::Fail(output)) => Err(CoreError::CommandFailed {
                command: cmd.to_string(),
                code: Some(1),
                output,
            }),
        }
    }
}

/// Find the reply for `subject`: first one-shot match, else first repeating match
fn take_reply<T: Clone>(rules: &mut Vec<Rule<T>>, subject: &str) -> Option<T> {
    if let Some(pos) = rules
        .iter()
        .position(|r| r.once && subject.starts_with(&r.prefix))
    {
        return Some(rules.remove(pos).reply);
    }
    rules
        .iter()
        .find(|r| !r.once && subject.starts_with(&r.prefix))
        .map(|r| r.reply.clone())
}

#[async_trait]
impl Runner for MockRunner {
    async fn run(&self, cmd: &Command) -> Result<()> {
        self.answer(cmd).map(|_| ())
    }

    async fn output(&self, cmd: &Command) -> Result<String> {
        self.answer(cmd)
    }

    async fn stream(&self, cmd: &Command) -> Result<()> {
        self.answer(cmd).map(|_| ())
    }

    async fn request(&self, req: &HttpRequest) -> Result<HttpResponse> {
        let reply = {
            let mut state = self.lock();
            state.requests.push(req.clone());
            take_reply(&mut state.http_rules, &req.url)
        };

        match reply {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(CoreError::Http {
                url: req.url.clone(),
                message,
            }),
            None => Ok(HttpResponse {
                status: 404,
                body: String::new(),
            }),
        }
    }
}
