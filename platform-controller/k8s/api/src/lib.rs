#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod cluster;
pub mod labels;
pub mod naming;

pub use self::{
    cluster::{Cluster, KubeCluster, Object},
    labels::Selector,
};
pub use k8s_openapi::{
    api::{
        self,
        apps::v1::{Deployment, DeploymentSpec},
        core::v1::{ConfigMap, Container, PodSpec, Secret, Service},
        networking::v1::{Ingress, NetworkPolicy},
        rbac::v1::{PolicyRule, Role},
    },
    apimachinery::pkg::apis::meta::v1::LabelSelector,
};
pub use kube::{
    api::{ObjectMeta, ResourceExt},
    runtime::watcher,
    Client, Error, Resource,
};
