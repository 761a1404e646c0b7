//! Resource composition
//!
//! Turns a microservice's identity, its kind-specific configuration, and the customer tenants of
//! its environment into the Kubernetes objects that realize it. Composition is pure: the same
//! input always produces identical objects, and nothing here talks to the cluster.
//!
//! Every microservice is realized by the same base object set:
//!
//! - a `Deployment` with a `head` container and a `runtime` sidecar;
//! - a `Service` exposing the head's `http` port and the runtime port;
//! - the `-dolittle`, `-env-variables` and `-config-files` config maps and the
//!   `-secret-env-variables` secret;
//! - when public, a `NetworkPolicy` and one `Ingress` per customer tenant;
//! - the RBAC rules that let developers edit the microservice's configuration.
//!
//! Kinds other than [`Kind::Simple`](dolittle_platform_core::Kind) build the base set and then
//! overlay their own configuration (see [`kinds`]).

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod config;
mod deployment;
pub mod ingress;
pub mod kinds;
mod network_policy;
pub mod rbac;
mod service;

#[cfg(test)]
mod tests;

pub use self::{deployment::head_image, ingress::SimpleIngressRule};
use dolittle_platform_core::{CustomerTenantInfo, Microservice};
use dolittle_platform_k8s_api::{
    labels, naming, ConfigMap, Deployment, Ingress, NetworkPolicy, ObjectMeta, PolicyRule, Secret,
    Service,
};

/// The default port of the head container.
pub const DEFAULT_HEAD_PORT: i32 = 80;

/// The port the runtime serves its public API on.
pub const RUNTIME_PORT: i32 = 50052;

/// The port the runtime serves its private API on.
pub const RUNTIME_PRIVATE_PORT: i32 = 50053;

pub const RUNTIME_METRICS_PORT: i32 = 9700;

/// The port the `http` port of the microservice's `Service` listens on.
pub const SERVICE_HTTP_PORT: i32 = 80;

/// The platform environment the control plane runs in.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PlatformEnvironment {
    #[default]
    Dev,
    Prod,
}

#[derive(Debug, thiserror::Error)]
#[error("invalid platform environment: {0}")]
pub struct InvalidPlatformEnvironment(String);

/// The head container's configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Head {
    pub image: String,
    pub port: i32,
    pub command: Vec<String>,
    pub args: Vec<String>,
}

/// Everything the base composer needs to build a microservice's objects.
#[derive(Clone, Debug)]
pub struct Workload<'a> {
    pub microservice: &'a Microservice,
    pub head: Head,
    pub runtime_image: String,

    /// The rules every customer tenant's ingress routes, if the microservice is public.
    pub public_rules: Option<Vec<SimpleIngressRule>>,
    pub customer_tenants: &'a [CustomerTenantInfo],
    pub platform: PlatformEnvironment,
}

/// The full set of objects that realize one microservice.
#[derive(Clone, Debug, PartialEq)]
pub struct MicroserviceResources {
    pub namespace: String,
    pub dolittle_config: ConfigMap,
    pub env_variables: ConfigMap,
    pub config_files: ConfigMap,
    pub secret_env_variables: Secret,
    pub ingresses: Vec<Ingress>,
    pub network_policy: Option<NetworkPolicy>,
    pub service: Service,
    pub deployment: Deployment,
    pub policy_rules: Vec<PolicyRule>,
}

/// Composes the base object set of a microservice.
pub fn compose(workload: &Workload<'_>) -> MicroserviceResources {
    let microservice = workload.microservice;
    let names = naming::ConfigNames::new(&microservice.environment, &microservice.name);
    let name = naming::resource_name(&microservice.environment, &microservice.name, None);

    let (ingresses, network_policy) = match workload.public_rules.as_ref() {
        Some(rules) => (
            ingress::customer_tenant_ingresses(
                microservice,
                &name,
                workload.customer_tenants,
                rules,
                workload.platform,
            ),
            Some(network_policy::public(microservice, &name)),
        ),
        None => (Vec::new(), None),
    };

    MicroserviceResources {
        namespace: naming::namespace(&microservice.application.id),
        dolittle_config: config::dolittle(microservice, &names, workload.customer_tenants),
        env_variables: config::empty_config_map(microservice, &names.env_variables),
        config_files: config::empty_config_map(microservice, &names.config_files),
        secret_env_variables: config::secret(microservice, &names.secret_env_variables),
        ingresses,
        network_policy,
        service: service::service(microservice, &name, workload.head.port),
        deployment: deployment::deployment(microservice, &name, &names, workload),
        policy_rules: rbac::policy_rules(&microservice.environment, &microservice.name),
    }
}

/// Builds the metadata every object of a microservice carries.
pub(crate) fn metadata(microservice: &Microservice, name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(naming::namespace(&microservice.application.id)),
        labels: Some(labels::microservice_labels(microservice)),
        annotations: Some(labels::microservice_annotations(microservice)),
        ..Default::default()
    }
}

// === impl PlatformEnvironment ===

impl PlatformEnvironment {
    /// The cert-manager cluster issuer used for ingress certificates.
    pub fn cluster_issuer(&self) -> &'static str {
        match self {
            Self::Dev => "letsencrypt-staging",
            Self::Prod => "letsencrypt-production",
        }
    }
}

impl std::str::FromStr for PlatformEnvironment {
    type Err = InvalidPlatformEnvironment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dev" => Ok(Self::Dev),
            "prod" => Ok(Self::Prod),
            s => Err(InvalidPlatformEnvironment(s.to_string())),
        }
    }
}

// === impl MicroserviceResources ===

impl MicroserviceResources {
    pub fn config_maps(&self) -> [&ConfigMap; 3] {
        [&self.dolittle_config, &self.env_variables, &self.config_files]
    }

    /// Inserts entries into the env-variables config map.
    pub fn set_env_variables<'a>(&mut self, vars: impl IntoIterator<Item = (&'a str, String)>) {
        let data = self.env_variables.data.get_or_insert_with(Default::default);
        data.extend(vars.into_iter().map(|(k, v)| (k.to_string(), v)));
    }

    /// Inserts a file into the config-files config map.
    pub fn set_config_file(&mut self, name: &str, contents: String) {
        self.config_files
            .data
            .get_or_insert_with(Default::default)
            .insert(name.to_string(), contents);
    }
}
