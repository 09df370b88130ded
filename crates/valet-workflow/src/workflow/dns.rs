//! DNS records pointing at a service's load balancer

use serde::{Deserialize, Serialize};
use tracing::info;
use valet_core::{InputParams, ServiceRef, wait};
use valet_engine::{Bindings, Field};

use crate::error::{Result, WorkflowError};
use crate::ingress::{bare_ip, ingress_host};
use crate::resource::{bind, require};

/// Points a domain at a service's ingress IP
///
/// Records are left in place on teardown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DnsEntry {
    pub domain: String,
    /// Falls back to the `HostedZone` value
    #[serde(default)]
    pub hosted_zone: String,
    pub service: ServiceRef,
}

impl Bindings for DnsEntry {
    fn fields(&mut self) -> Vec<Field<'_>> {
        vec![
            Field::new("domain", &mut self.domain).template(),
            Field::new("hostedZone", &mut self.hosted_zone)
                .key("HostedZone")
                .template(),
            Field::new("service.name", &mut self.service.name).template(),
            Field::new("service.namespace", &mut self.service.namespace).template(),
            Field::new("service.port", &mut self.service.port).template(),
        ]
    }
}

impl DnsEntry {
    pub async fn ensure(&self, input: &InputParams) -> Result<()> {
        let entry = bind(self, input).await?;
        require("dnsEntry", "domain", &entry.domain)?;
        require("dnsEntry", "hostedZone", &entry.hosted_zone)?;

        let dns = input.dns()?;
        let address = ingress_host(input, &entry.service).await?;
        let ip = bare_ip(&address).await?;

        info!(domain = %entry.domain, ip = %ip, zone = %entry.hosted_zone, "mapping dns entry");
        wait::cancellable(
            &input.cancel,
            dns.create_mapping(&entry.hosted_zone, &entry.domain, &ip),
        )
        .await
        .map_err(|e| {
            if e.is_cancelled() {
                return WorkflowError::Core(e);
            }
            WorkflowError::DnsMapping {
                domain: entry.domain.clone(),
                hosted_zone: entry.hosted_zone.clone(),
                message: e.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use valet_core::{CoreError, DnsClient, IngressClient, MockRunner, StaticRegistry};

    #[derive(Default)]
    struct RecordingDns {
        mappings: Mutex<Vec<(String, String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl DnsClient for RecordingDns {
        async fn create_mapping(&self, hosted_zone: &str, domain: &str, ip: &str) -> valet_core::Result<()> {
            if self.fail {
                return Err(CoreError::Http {
                    url: "route53".to_string(),
                    message: "throttled".to_string(),
                });
            }
            self.mappings.lock().unwrap().push((
                hosted_zone.to_string(),
                domain.to_string(),
                ip.to_string(),
            ));
            Ok(())
        }
    }

    struct FixedIngress;

    #[async_trait]
    impl IngressClient for FixedIngress {
        async fn get_ingress_host(&self, _service: &ServiceRef) -> valet_core::Result<String> {
            Ok("34.1.2.3:80".to_string())
        }
    }

    fn entry() -> DnsEntry {
        serde_yaml::from_str(
            "domain: petstore.{{ Zone }}\nhostedZone: \"{{ Zone }}.\"\nservice: {name: gateway-proxy, namespace: gloo-system}\n",
        )
        .unwrap()
    }

    fn input(dns: Arc<RecordingDns>) -> InputParams {
        InputParams::for_testing(MockRunner::new(), StaticRegistry::new())
            .with_values([("Zone", "example.com")].into_iter().collect())
            .with_ingress(Arc::new(FixedIngress))
            .with_dns(dns)
    }

    #[tokio::test]
    async fn test_maps_domain_to_bare_ip() {
        let dns = Arc::new(RecordingDns::default());
        entry().ensure(&input(dns.clone())).await.unwrap();

        assert_eq!(
            *dns.mappings.lock().unwrap(),
            vec![(
                "example.com.".to_string(),
                "petstore.example.com".to_string(),
                "34.1.2.3".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_failure_is_wrapped() {
        let dns = Arc::new(RecordingDns {
            fail: true,
            ..Default::default()
        });
        let err = entry().ensure(&input(dns)).await.unwrap_err();
        assert!(matches!(err, WorkflowError::DnsMapping { .. }));
    }

    #[tokio::test]
    async fn test_requires_dns_client() {
        let input = InputParams::for_testing(MockRunner::new(), StaticRegistry::new())
            .with_values([("Zone", "example.com")].into_iter().collect());
        let err = entry().ensure(&input).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Core(CoreError::MissingCollaborator(_))));
    }
}
