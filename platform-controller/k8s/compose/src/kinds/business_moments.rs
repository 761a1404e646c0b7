use super::service_rule;
use crate::{
    compose, config::render, Head, MicroserviceResources, PlatformEnvironment, Workload,
    DEFAULT_HEAD_PORT,
};
use dolittle_platform_core::{
    request::{BusinessMomentsAdaptorExtra, BusinessMomentsConnector, WebhookAuthorization},
    CustomerTenantInfo, Microservice,
};
use serde_json::json;

/// The file the adaptor reads its connector configuration from.
pub const CONNECTOR_FILE: &str = "connector.json";

/// Business moments adaptors are always public: their webhook connector receives data from
/// outside the cluster.
pub fn resources(
    microservice: &Microservice,
    extra: &BusinessMomentsAdaptorExtra,
    customer_tenants: &[CustomerTenantInfo],
    platform: PlatformEnvironment,
) -> MicroserviceResources {
    let mut resources = compose(&Workload {
        microservice,
        head: Head {
            image: extra.head_image.clone(),
            port: DEFAULT_HEAD_PORT,
            command: Vec::new(),
            args: Vec::new(),
        },
        runtime_image: extra.runtime_image.clone(),
        public_rules: Some(vec![service_rule(microservice, &extra.ingress)]),
        customer_tenants,
        platform,
    });
    resources.set_config_file(CONNECTOR_FILE, render(&connector(&extra.connector)));
    resources
}

fn connector(connector: &BusinessMomentsConnector) -> serde_json::Value {
    let BusinessMomentsConnector::Webhook(authorization) = connector;
    let authorization = match authorization {
        WebhookAuthorization::Basic { username, password } => json!({
            "kind": "basic",
            "username": username,
            "password": password,
        }),
        WebhookAuthorization::Bearer { token } => json!({
            "kind": "bearer",
            "token": token,
        }),
    };
    json!({
        "kind": "webhook",
        "authorization": authorization,
    })
}
