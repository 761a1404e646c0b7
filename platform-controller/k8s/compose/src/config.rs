use crate::{metadata, RUNTIME_METRICS_PORT, RUNTIME_PORT, RUNTIME_PRIVATE_PORT};
use dolittle_platform_core::{CustomerTenantInfo, Microservice};
use dolittle_platform_k8s_api::{naming::ConfigNames, ConfigMap, Secret};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Files of the `-dolittle` config map, as read by the runtime from `/app/.dolittle`.
pub(crate) const RUNTIME_FILES: [&str; 6] = [
    "resources.json",
    "event-horizons.json",
    "event-horizon-consents.json",
    "microservices.json",
    "endpoints.json",
    "appsettings.json",
];

pub(crate) const PLATFORM_FILE: &str = "platform.json";
const METRICS_FILE: &str = "metrics.json";

const MONGO_PORT: u16 = 27017;

/// Builds the `-dolittle` config map, keyed per customer tenant.
pub(crate) fn dolittle(
    microservice: &Microservice,
    names: &ConfigNames,
    customer_tenants: &[CustomerTenantInfo],
) -> ConfigMap {
    let data: BTreeMap<String, String> = [
        ("resources.json", resources(microservice, customer_tenants)),
        ("event-horizons.json", per_tenant_list(customer_tenants)),
        ("event-horizon-consents.json", per_tenant_list(customer_tenants)),
        ("microservices.json", json!({})),
        (
            "endpoints.json",
            json!({
                "public": { "port": RUNTIME_PORT },
                "private": { "port": RUNTIME_PRIVATE_PORT },
            }),
        ),
        ("appsettings.json", appsettings()),
        (METRICS_FILE, json!({ "port": RUNTIME_METRICS_PORT })),
        (PLATFORM_FILE, platform(microservice)),
    ]
    .into_iter()
    .map(|(file, value)| (file.to_string(), render(&value)))
    .collect();

    ConfigMap {
        metadata: metadata(microservice, &names.dolittle),
        data: Some(data),
        ..Default::default()
    }
}

pub(crate) fn empty_config_map(microservice: &Microservice, name: &str) -> ConfigMap {
    ConfigMap {
        metadata: metadata(microservice, name),
        data: Some(BTreeMap::new()),
        ..Default::default()
    }
}

pub(crate) fn secret(microservice: &Microservice, name: &str) -> Secret {
    Secret {
        metadata: metadata(microservice, name),
        type_: Some("Opaque".to_string()),
        string_data: Some(BTreeMap::new()),
        ..Default::default()
    }
}

/// The in-cluster host of the environment's MongoDB.
pub(crate) fn mongo_host(microservice: &Microservice) -> String {
    format!(
        "{}-mongo.application-{}.svc.cluster.local",
        microservice.environment.to_lowercase(),
        microservice.application.id
    )
}

pub(crate) fn mongo_url(microservice: &Microservice) -> String {
    format!("mongodb://{}:{}", mongo_host(microservice), MONGO_PORT)
}

/// The stem of every database a customer tenant's data is stored in.
///
/// A tenant's runtime database prefix replaces the `{application}_{environment}_{microservice}`
/// stem; the customer tenant hash is always appended so that tenants never share a database.
pub(crate) fn database_stem(microservice: &Microservice, tenant: &CustomerTenantInfo) -> String {
    let prefix = if tenant.runtime_database_prefix.is_empty() {
        format!(
            "{}_{}_{}",
            microservice.application.name, microservice.environment, microservice.name
        )
    } else {
        tenant.runtime_database_prefix.clone()
    };
    format!("{}_{}", prefix, tenant.hash_for(&microservice.id)).to_lowercase()
}

fn resources(microservice: &Microservice, customer_tenants: &[CustomerTenantInfo]) -> Value {
    let host = mongo_host(microservice);
    let url = mongo_url(microservice);
    let tenants: Map<String, Value> = customer_tenants
        .iter()
        .map(|tenant| {
            let db = database_stem(microservice, tenant);
            let resources = json!({
                "eventStore": {
                    "servers": [host],
                    "database": format!("{}_eventstore", db),
                },
                "projections": {
                    "servers": [host],
                    "database": format!("{}_projections", db),
                },
                "embeddings": {
                    "servers": [host],
                    "database": format!("{}_embeddings", db),
                },
                "readModels": {
                    "host": url,
                    "database": format!("{}_readmodels", db),
                    "useSSL": false,
                },
            });
            (tenant.customer_tenant_id.clone(), resources)
        })
        .collect();
    Value::Object(tenants)
}

fn per_tenant_list(customer_tenants: &[CustomerTenantInfo]) -> Value {
    Value::Object(
        customer_tenants
            .iter()
            .map(|tenant| (tenant.customer_tenant_id.clone(), json!([])))
            .collect(),
    )
}

fn appsettings() -> Value {
    json!({
        "Logging": {
            "IncludeScopes": false,
            "LogLevel": {
                "Default": "Information",
                "System": "Information",
                "Microsoft": "Information",
            },
            "Console": {
                "IncludeScopes": true,
                "TimestampFormat": "[yyyy-MM-dd HH:mm:ss] ",
            },
        },
    })
}

fn platform(microservice: &Microservice) -> Value {
    json!({
        "applicationName": microservice.application.name,
        "applicationID": microservice.application.id,
        "microserviceName": microservice.name,
        "microserviceID": microservice.id,
        "customerName": microservice.tenant.name,
        "customerID": microservice.tenant.id,
        "environment": microservice.environment,
    })
}

/// Pretty-prints a config file.
pub(crate) fn render(value: &Value) -> String {
    format!("{:#}", value)
}
