//! Narrow interfaces to external collaborators
//!
//! The engine never talks to a DNS provider, an ingress controller or an
//! artifact store directly; it goes through these traits, which are carried in
//! `InputParams` so tests can substitute fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{CoreError, Result};

/// Logical reference to a Kubernetes service port
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ServiceRef {
    pub name: String,

    pub namespace: String,

    /// Port name on the service, `http` when unset
    #[serde(default)]
    pub port: String,
}

impl ServiceRef {
    pub fn port_name(&self) -> &str {
        if self.port.is_empty() { "http" } else { &self.port }
    }
}

/// Creates or updates DNS records
#[async_trait]
pub trait DnsClient: Send + Sync {
    /// Map `domain` to `ip` inside `hosted_zone`, replacing any existing record
    async fn create_mapping(&self, hosted_zone: &str, domain: &str, ip: &str) -> Result<()>;
}

/// Resolves a service reference to a reachable `host:port` address
#[async_trait]
pub trait IngressClient: Send + Sync {
    async fn get_ingress_host(&self, service: &ServiceRef) -> Result<String>;
}

/// Downloads release artifacts (binaries, archives) to a local path
#[async_trait]
pub trait ArtifactDownloader: Send + Sync {
    async fn download(&self, url: &str, destination: &Path) -> Result<()>;
}

/// Artifact downloader over plain HTTP(S)
#[derive(Debug, Clone, Default)]
pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArtifactDownloader for HttpDownloader {
    async fn download(&self, url: &str, destination: &Path) -> Result<()> {
        let http_err = |e: reqwest::Error| CoreError::Http {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(http_err)?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(CoreError::ArtifactNotFound {
                url: url.to_string(),
            });
        }
        let response = response.error_for_status().map_err(http_err)?;
        let bytes = response.bytes().await.map_err(http_err)?;

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(destination, &bytes).await?;
        tracing::debug!(url, path = %destination.display(), "downloaded artifact");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::path;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_service_ref_default_port() {
        let svc: ServiceRef =
            serde_yaml::from_str("name: gateway-proxy\nnamespace: gloo-system\n").unwrap();
        assert_eq!(svc.port_name(), "http");
    }

    #[tokio::test]
    async fn test_download_and_not_found() {
        let server = MockServer::start().await;
        Mock::given(path("/glooctl"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"binary".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("bin/glooctl");
        let downloader = HttpDownloader::new();

        downloader
            .download(&format!("{}/glooctl", server.uri()), &dest)
            .await
            .unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"binary");

        let err = downloader
            .download(&format!("{}/missing", server.uri()), &dest)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ArtifactNotFound { .. }));
    }
}
