use crate::metadata;
use dolittle_platform_core::Microservice;
use dolittle_platform_k8s_api::{
    api::networking::v1::{NetworkPolicyIngressRule, NetworkPolicyPeer, NetworkPolicySpec},
    labels, LabelSelector, NetworkPolicy,
};
use std::collections::BTreeMap;

/// The namespace the ingress controller runs in.
const INGRESS_CONTROLLER_NAMESPACE: &str = "ingress-nginx";

/// Admits traffic to a public microservice from the ingress controller and from pods in the
/// application's own namespace.
pub(crate) fn public(microservice: &Microservice, name: &str) -> NetworkPolicy {
    let pod_selector = LabelSelector {
        match_labels: Some(labels::microservice_labels(microservice)),
        ..Default::default()
    };
    let ingress_controller = NetworkPolicyPeer {
        namespace_selector: Some(LabelSelector {
            match_labels: Some(BTreeMap::from([(
                "kubernetes.io/metadata.name".to_string(),
                INGRESS_CONTROLLER_NAMESPACE.to_string(),
            )])),
            ..Default::default()
        }),
        ..Default::default()
    };
    let same_namespace = NetworkPolicyPeer {
        pod_selector: Some(LabelSelector::default()),
        ..Default::default()
    };

    NetworkPolicy {
        metadata: metadata(microservice, name),
        spec: Some(NetworkPolicySpec {
            pod_selector: pod_selector.into(),
            policy_types: Some(vec!["Ingress".to_string()]),
            ingress: Some(vec![NetworkPolicyIngressRule {
                from: Some(vec![ingress_controller, same_namespace]),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}
