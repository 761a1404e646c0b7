//! Multi-tenant ingress composition.
//!
//! A public microservice gets one `Ingress` per customer tenant of its environment. Each ingress
//! serves the tenant's own host with the tenant's TLS secret, and tags every request it proxies
//! with a `Tenant-ID` header so that the runtime can tell the tenants apart.

use crate::{metadata, PlatformEnvironment};
use dolittle_platform_core::{CustomerTenantInfo, Microservice};
use dolittle_platform_k8s_api::{
    api::networking::v1::{
        HTTPIngressPath, HTTPIngressRuleValue, IngressBackend, IngressRule, IngressServiceBackend,
        IngressSpec, IngressTLS, ServiceBackendPort,
    },
    Ingress,
};

pub const CLUSTER_ISSUER_ANNOTATION: &str = "cert-manager.io/cluster-issuer";
pub const CONFIGURATION_SNIPPET_ANNOTATION: &str =
    "nginx.ingress.kubernetes.io/configuration-snippet";

const INGRESS_CLASS: &str = "nginx";

/// A path routed to a service port.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimpleIngressRule {
    pub path: String,
    pub path_type: String,
    pub service_name: String,
    pub service_port: i32,
}

/// Builds one ingress per customer tenant, named `{base_name}-{customerTenantID[0:7]}`.
pub fn customer_tenant_ingresses(
    microservice: &Microservice,
    base_name: &str,
    customer_tenants: &[CustomerTenantInfo],
    rules: &[SimpleIngressRule],
    platform: PlatformEnvironment,
) -> Vec<Ingress> {
    customer_tenants
        .iter()
        .map(|tenant| ingress(microservice, base_name, tenant, rules, platform))
        .collect()
}

pub fn ingress_name(base_name: &str, tenant: &CustomerTenantInfo) -> String {
    format!("{}-{}", base_name, tenant.short_id()).to_lowercase()
}

/// The nginx snippet that sets the `Tenant-ID` header on proxied requests.
pub fn tenant_header_snippet(customer_tenant_id: &str) -> String {
    format!("proxy_set_header Tenant-ID \"{}\";\n", customer_tenant_id)
}

fn ingress(
    microservice: &Microservice,
    base_name: &str,
    tenant: &CustomerTenantInfo,
    rules: &[SimpleIngressRule],
    platform: PlatformEnvironment,
) -> Ingress {
    let mut metadata = metadata(microservice, &ingress_name(base_name, tenant));
    let annotations = metadata.annotations.get_or_insert_with(Default::default);
    annotations.insert(
        CLUSTER_ISSUER_ANNOTATION.to_string(),
        platform.cluster_issuer().to_string(),
    );
    annotations.insert(
        CONFIGURATION_SNIPPET_ANNOTATION.to_string(),
        tenant_header_snippet(&tenant.customer_tenant_id),
    );

    let host = tenant.ingress.host.clone();
    let paths = rules
        .iter()
        .map(|rule| HTTPIngressPath {
            path: Some(rule.path.clone()),
            path_type: rule.path_type.clone(),
            backend: IngressBackend {
                service: Some(IngressServiceBackend {
                    name: rule.service_name.clone(),
                    port: Some(ServiceBackendPort {
                        number: Some(rule.service_port),
                        ..Default::default()
                    }),
                }),
                ..Default::default()
            },
        })
        .collect();

    Ingress {
        metadata,
        spec: Some(IngressSpec {
            ingress_class_name: Some(INGRESS_CLASS.to_string()),
            tls: Some(vec![IngressTLS {
                hosts: Some(vec![host.clone()]),
                secret_name: Some(tenant.ingress.secret_name.clone()),
            }]),
            rules: Some(vec![IngressRule {
                host: Some(host),
                http: Some(HTTPIngressRuleValue { paths }),
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}
