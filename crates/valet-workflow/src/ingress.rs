//! Service address resolution through kubectl

use async_trait::async_trait;
use serde_json::Value;
use std::net::IpAddr;
use std::sync::Arc;
use valet_core::cmd::Kubectl;
use valet_core::{CoreError, IngressClient, InputParams, Runner, ServiceRef, wait};

use crate::error::{Result, WorkflowError};

/// Reads the load balancer address and named port of a Kubernetes service
pub struct KubectlIngress {
    runner: Arc<dyn Runner>,
    context: Option<String>,
}

impl KubectlIngress {
    pub fn new(runner: Arc<dyn Runner>) -> Self {
        Self {
            runner,
            context: None,
        }
    }

    /// Query the cluster behind `context` instead of the current one
    pub fn with_context(mut self, context: Option<String>) -> Self {
        self.context = context;
        self
    }
}

#[async_trait]
impl IngressClient for KubectlIngress {
    async fn get_ingress_host(&self, service: &ServiceRef) -> valet_core::Result<String> {
        let cmd = Kubectl::get("service", &service.name)
            .namespace(&service.namespace)
            .output_json()
            .build();
        let cmd = match &self.context {
            Some(context) => cmd.with_kube_context(context),
            None => cmd,
        };
        let output = self.runner.output(&cmd).await?;
        parse_service_address(&output, service.port_name()).map_err(|message| {
            CoreError::InvalidValue {
                key: format!("service {}/{}", service.namespace, service.name),
                message,
            }
        })
    }
}

/// `host:port` from a service object's load balancer status and named port
fn parse_service_address(json: &str, port_name: &str) -> std::result::Result<String, String> {
    let service: Value = serde_json::from_str(json).map_err(|e| e.to_string())?;

    let ingress = &service["status"]["loadBalancer"]["ingress"][0];
    let host = ingress["ip"]
        .as_str()
        .or_else(|| ingress["hostname"].as_str())
        .ok_or("service has no load balancer address yet")?;

    let port = service["spec"]["ports"]
        .as_array()
        .and_then(|ports| {
            ports
                .iter()
                .find(|p| p["name"].as_str() == Some(port_name))
        })
        .and_then(|p| p["port"].as_u64())
        .ok_or_else(|| format!("service has no port named '{}'", port_name))?;

    Ok(format!("{}:{}", host, port))
}

/// Resolve a service through the configured ingress client, or kubectl
pub async fn ingress_host(input: &InputParams, service: &ServiceRef) -> Result<String> {
    let host = match &input.collaborators.ingress {
        Some(client) => wait::cancellable(&input.cancel, client.get_ingress_host(service)).await?,
        None => {
            let client = KubectlIngress::new(input.collaborators.runner.clone())
                .with_context(input.kube_context.clone());
            wait::cancellable(&input.cancel, client.get_ingress_host(service)).await?
        }
    };
    Ok(host)
}

/// Strip an address to a bare IP, resolving hostnames
pub async fn bare_ip(address: &str) -> Result<String> {
    let host = match address.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host,
        _ => address,
    };

    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip.to_string());
    }

    let mut addrs = tokio::net::lookup_host((host, 0))
        .await
        .map_err(CoreError::from)?;
    addrs
        .find(|a| a.is_ipv4())
        .map(|a| a.ip().to_string())
        .ok_or_else(|| WorkflowError::invalid(format!("no IPv4 address for {}", host)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use valet_core::{MockRunner, StaticRegistry};

    const SERVICE: &str = r#"{
        "spec": {"ports": [{"name": "http", "port": 80}, {"name": "https", "port": 443}]},
        "status": {"loadBalancer": {"ingress": [{"ip": "34.1.2.3"}]}}
    }"#;

    #[tokio::test]
    async fn test_kubectl_ingress() {
        let runner = MockRunner::new();
        runner.respond("kubectl get service gateway-proxy -n gloo-system -o json", SERVICE);
        let input = InputParams::for_testing(runner, StaticRegistry::new());

        let service = ServiceRef {
            name: "gateway-proxy".to_string(),
            namespace: "gloo-system".to_string(),
            port: String::new(),
        };
        assert_eq!(ingress_host(&input, &service).await.unwrap(), "34.1.2.3:80");
    }

    #[tokio::test]
    async fn test_kubectl_ingress_follows_kube_context() {
        let runner = MockRunner::new();
        runner.respond("kubectl get service", SERVICE);
        let input = InputParams::for_testing(runner.clone(), StaticRegistry::new())
            .with_kube_context("kind-b");

        let service = ServiceRef {
            name: "gateway-proxy".to_string(),
            namespace: "gloo-system".to_string(),
            port: "https".to_string(),
        };
        assert_eq!(ingress_host(&input, &service).await.unwrap(), "34.1.2.3:443");
        assert_eq!(
            runner.calls(),
            vec!["kubectl get service gateway-proxy -n gloo-system -o json --context kind-b"]
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_service_address(r#"{"status": {}}"#, "http").is_err());
        assert!(parse_service_address(SERVICE, "grpc").is_err());
        assert_eq!(
            parse_service_address(
                r#"{"spec": {"ports": [{"name": "http", "port": 80}]}, "status": {"loadBalancer": {"ingress": [{"hostname": "a.elb.amazonaws.com"}]}}}"#,
                "http"
            )
            .unwrap(),
            "a.elb.amazonaws.com:80"
        );
    }

    #[tokio::test]
    async fn test_bare_ip() {
        assert_eq!(bare_ip("34.1.2.3:80").await.unwrap(), "34.1.2.3");
        assert_eq!(bare_ip("10.0.0.7").await.unwrap(), "10.0.0.7");
        assert_eq!(bare_ip("localhost:8080").await.unwrap(), "127.0.0.1");
    }
}
