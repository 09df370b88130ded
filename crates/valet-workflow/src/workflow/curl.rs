//! HTTP checks against a service behind its load balancer

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};
use valet_core::wait;
use valet_core::{HttpRequest, InputParams, ServiceRef};
use valet_engine::{Bindings, Field, template_map};

use crate::error::{Result, WorkflowError};
use crate::ingress::ingress_host;
use crate::resource::{bind, require};

fn default_status_code() -> u16 {
    200
}

fn default_attempts() -> u32 {
    10
}

/// Retried HTTP check against a service's ingress address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Curl {
    pub service: ServiceRef,

    #[serde(default)]
    pub path: String,

    /// Host header, for virtual-host routing
    #[serde(default)]
    pub host: String,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    #[serde(default = "default_status_code")]
    pub status_code: u16,

    /// Exact body expected, when set
    #[serde(default)]
    pub response_body: String,

    /// Substring the body must contain, when set
    #[serde(default)]
    pub response_body_substring: String,

    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// Fixed delay between attempts, `1s` when unset
    #[serde(default)]
    pub delay: String,
}

impl Default for Curl {
    fn default() -> Self {
        Self {
            service: ServiceRef::default(),
            path: String::new(),
            host: String::new(),
            headers: BTreeMap::new(),
            status_code: default_status_code(),
            response_body: String::new(),
            response_body_substring: String::new(),
            attempts: default_attempts(),
            delay: String::new(),
        }
    }
}

impl Bindings for Curl {
    fn fields(&mut self) -> Vec<Field<'_>> {
        let mut fields = vec![
            Field::new("service.name", &mut self.service.name).template(),
            Field::new("service.namespace", &mut self.service.namespace).template(),
            Field::new("service.port", &mut self.service.port).template(),
            Field::new("path", &mut self.path).template(),
            Field::new("host", &mut self.host).template(),
            Field::new("responseBody", &mut self.response_body).template(),
            Field::new("responseBodySubstring", &mut self.response_body_substring).template(),
            Field::new("delay", &mut self.delay).default("1s").template(),
        ];
        fields.extend(template_map(&mut self.headers));
        fields
    }
}

impl Curl {
    /// Retry until the response matches, returning the last failure when
    /// every attempt fails
    pub async fn ensure(&self, input: &InputParams) -> Result<()> {
        let curl = bind(self, input).await?;
        require("curl", "service.name", &curl.service.name)?;
        if curl.attempts == 0 {
            return Err(WorkflowError::invalid("curl: 'attempts' must be at least 1"));
        }
        let delay = wait::parse_duration("delay", &curl.delay)?;

        info!(service = %curl.service.name, path = %curl.path, attempts = curl.attempts, "checking http endpoint");
        let mut attempt = 1;
        loop {
            let err = match curl.check(input).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_cancelled() || attempt >= curl.attempts => return Err(e),
                Err(e) => e,
            };
            warn!(attempt, attempts = curl.attempts, error = %err, "http check failed, retrying in {:?}", delay);
            wait::sleep(delay, &input.cancel).await?;
            attempt += 1;
        }
    }

    async fn check(&self, input: &InputParams) -> Result<()> {
        let address = ingress_host(input, &self.service).await?;
        let path = self.path.trim_start_matches('/');
        let url = format!("http://{}/{}", address, path);

        let mut request = HttpRequest::get(&url);
        for (name, value) in &self.headers {
            request = request.header(name, value);
        }
        if !self.host.is_empty() {
            request = request.header("Host", &self.host);
        }

        let response = input.request(&request).await?;
        if response.status != self.status_code {
            return Err(WorkflowError::UnexpectedStatusCode {
                url,
                expected: self.status_code,
                actual: response.status,
            });
        }
        if !self.response_body.is_empty() && response.body != self.response_body {
            return Err(WorkflowError::UnexpectedResponseBody {
                url,
                message: format!("expected '{}', got '{}'", self.response_body, response.body),
            });
        }
        if !self.response_body_substring.is_empty()
            && !response.body.contains(&self.response_body_substring)
        {
            return Err(WorkflowError::UnexpectedResponseBody {
                url,
                message: format!(
                    "'{}' does not contain '{}'",
                    response.body, self.response_body_substring
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use valet_core::{CoreError, IngressClient, MockRunner, StaticRegistry};

    struct FixedIngress(&'static str);

    #[async_trait::async_trait]
    impl IngressClient for FixedIngress {
        async fn get_ingress_host(&self, _service: &ServiceRef) -> valet_core::Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn input(runner: &MockRunner) -> InputParams {
        InputParams::for_testing(runner.clone(), StaticRegistry::new())
            .with_ingress(Arc::new(FixedIngress("34.1.2.3:80")))
    }

    fn curl() -> Curl {
        serde_yaml::from_str(
            "service: {name: gateway-proxy, namespace: gloo-system}\npath: /api/pets\nhost: petstore.example.com\nresponseBodySubstring: doggie\nattempts: 3\n",
        )
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_retries() {
        let runner = MockRunner::new();
        runner
            .respond_http_once("http://34.1.2.3:80", 503, "")
            .respond_http("http://34.1.2.3:80/api/pets", 200, r#"[{"name":"doggie"}]"#);

        curl().ensure(&input(&runner)).await.unwrap();

        let requests = runner.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].url, "http://34.1.2.3:80/api/pets");
        assert_eq!(
            requests[0].headers.get("Host").map(String::as_str),
            Some("petstore.example.com")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_last_error_after_all_attempts() {
        let runner = MockRunner::new();
        runner
            .respond_http_once("http://34.1.2.3", 503, "")
            .fail_http_once("http://34.1.2.3", "connection reset")
            .respond_http("http://34.1.2.3", 200, "cat");

        let start = tokio::time::Instant::now();
        let err = curl().ensure(&input(&runner)).await.unwrap_err();

        assert_eq!(runner.requests().len(), 3);
        assert!(matches!(err, WorkflowError::UnexpectedResponseBody { .. }));
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_mismatch() {
        let runner = MockRunner::new();
        runner.respond_http("http://34.1.2.3", 404, "");

        let err = Curl {
            attempts: 1,
            ..curl()
        }
        .ensure(&input(&runner))
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            WorkflowError::UnexpectedStatusCode {
                expected: 200,
                actual: 404,
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_is_last() {
        let runner = MockRunner::new();
        runner
            .respond_http_once("http://34.1.2.3", 500, "")
            .fail_http_once("http://34.1.2.3", "connection refused");

        let err = Curl {
            attempts: 2,
            ..curl()
        }
        .ensure(&input(&runner))
        .await
        .unwrap_err();
        assert!(matches!(err, WorkflowError::Core(CoreError::Http { .. })));
    }

    #[test]
    fn test_defaults() {
        let curl: Curl =
            serde_yaml::from_str("service: {name: gateway-proxy, namespace: gloo-system}\n")
                .unwrap();
        assert_eq!(curl.status_code, 200);
        assert_eq!(curl.attempts, 10);
    }
}
