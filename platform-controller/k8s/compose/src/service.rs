use crate::{metadata, RUNTIME_PORT, SERVICE_HTTP_PORT};
use dolittle_platform_core::Microservice;
use dolittle_platform_k8s_api::{
    api::core::v1::{ServicePort, ServiceSpec},
    labels, Service,
};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

pub(crate) fn service(microservice: &Microservice, name: &str, head_port: i32) -> Service {
    Service {
        metadata: metadata(microservice, name),
        spec: Some(ServiceSpec {
            type_: Some("ClusterIP".to_string()),
            selector: Some(labels::microservice_labels(microservice)),
            ports: Some(vec![
                ServicePort {
                    name: Some("http".to_string()),
                    port: SERVICE_HTTP_PORT,
                    target_port: Some(IntOrString::Int(head_port)),
                    ..Default::default()
                },
                ServicePort {
                    name: Some("runtime".to_string()),
                    port: RUNTIME_PORT,
                    target_port: Some(IntOrString::Int(RUNTIME_PORT)),
                    ..Default::default()
                },
            ]),
            ..Default::default()
        }),
        ..Default::default()
    }
}
