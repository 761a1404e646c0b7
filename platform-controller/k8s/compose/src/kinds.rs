//! Per-kind composition.
//!
//! Each kind maps its document onto the base [`Workload`](crate::Workload), composes the base
//! object set, and then overlays its own configuration.

pub mod business_moments;
pub mod purchase_order;
pub mod raw_data_log;
pub mod simple;

use crate::{SimpleIngressRule, SERVICE_HTTP_PORT};
use dolittle_platform_core::{
    request::{IngressPath, WebhookEndpoint},
    Microservice,
};
use dolittle_platform_k8s_api::naming;
use serde_json::{json, Value};

/// Routes an ingress path to the microservice's `http` service port.
pub(crate) fn service_rule(microservice: &Microservice, ingress: &IngressPath) -> SimpleIngressRule {
    SimpleIngressRule {
        path: ingress.path.clone(),
        path_type: ingress.path_type.clone(),
        service_name: naming::resource_name(&microservice.environment, &microservice.name, None),
        service_port: SERVICE_HTTP_PORT,
    }
}

/// The in-cluster address of the environment's NATS cluster.
pub(crate) fn nats_cluster_url(microservice: &Microservice) -> String {
    format!(
        "{}-nats.application-{}.svc.cluster.local:4222",
        microservice.environment.to_lowercase(),
        microservice.application.id
    )
}

/// The `webhooks.json` document read by raw data log ingestors and purchase order APIs.
pub(crate) fn webhooks(endpoints: &[WebhookEndpoint]) -> Value {
    endpoints
        .iter()
        .map(|endpoint| {
            json!({
                "kind": endpoint.kind,
                "uriSuffix": endpoint.uri_suffix,
                "authorization": endpoint.authorization,
            })
        })
        .collect()
}
