use crate::identity::{ApplicationInfo, Tenant};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The number of leading characters of an ID used when building suffixes.
const SHORT_ID_LEN: usize = 7;

/// An application and the environments it is partitioned into.
///
/// Maps 1:1 to the namespace `application-{id}`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: String,
    pub name: String,
    pub tenant: Tenant,
    #[serde(default)]
    pub environments: Vec<Environment>,
}

/// A named partition of an application, e.g. `Dev` or `Prod`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub name: String,
    #[serde(default)]
    pub customer_tenants: Vec<CustomerTenantInfo>,

    /// Infrastructure connections observed in the cluster, keyed by connector name.
    #[serde(default)]
    pub connections: BTreeMap<String, bool>,
}

/// An end customer served through an application environment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerTenantInfo {
    pub customer_tenant_id: String,
    #[serde(default)]
    pub alias: String,
    pub environment: String,
    pub ingress: CustomerTenantIngress,
    #[serde(default)]
    pub microservices_rel: Vec<MicroserviceRel>,
    #[serde(default)]
    pub runtime_database_prefix: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerTenantIngress {
    pub host: String,
    #[serde(default)]
    pub domain_prefix: String,
    pub secret_name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MicroserviceRel {
    pub microservice_id: String,
    pub hash: String,
}

/// Builds the `{microserviceID[0:7]}_{customerTenantID[0:7]}` hash that partitions databases and
/// ingresses between customer tenants.
pub fn customer_tenant_hash(microservice_id: &str, customer_tenant_id: &str) -> String {
    format!(
        "{}_{}",
        short_id(microservice_id),
        short_id(customer_tenant_id)
    )
}

/// Returns the first seven characters of an ID.
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(SHORT_ID_LEN) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

// === impl Application ===

impl Application {
    pub fn info(&self) -> ApplicationInfo {
        ApplicationInfo {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }

    pub fn environment(&self, name: &str) -> Option<&Environment> {
        crate::get_environment(&self.environments, name)
    }

    pub fn environment_mut(&mut self, name: &str) -> Option<&mut Environment> {
        self.environments.iter_mut().find(|env| env.name == name)
    }
}

// === impl Environment ===

impl Environment {
    pub fn connection(&self, connector: &str) -> bool {
        self.connections.get(connector).copied().unwrap_or(false)
    }

    /// Sets a connection flag, returning true if the value changed.
    pub fn set_connection(&mut self, connector: &str, connected: bool) -> bool {
        if self.connection(connector) == connected {
            return false;
        }
        self.connections.insert(connector.to_string(), connected);
        true
    }
}

// === impl CustomerTenantInfo ===

impl CustomerTenantInfo {
    /// The hash recorded for a microservice, falling back to a freshly derived one.
    pub fn hash_for(&self, microservice_id: &str) -> String {
        self.microservices_rel
            .iter()
            .find(|rel| rel.microservice_id == microservice_id)
            .map(|rel| rel.hash.clone())
            .unwrap_or_else(|| customer_tenant_hash(microservice_id, &self.customer_tenant_id))
    }

    pub fn short_id(&self) -> &str {
        short_id(&self.customer_tenant_id)
    }
}
