use super::{nats_cluster_url, service_rule, webhooks};
use crate::{compose, config::render, Head, MicroserviceResources, PlatformEnvironment, Workload};
use dolittle_platform_core::{request::RawDataLogIngestorExtra, CustomerTenantInfo, Microservice};

pub const HEAD_PORT: i32 = 8080;

/// The file the ingestor reads its webhook definitions from.
pub const WEBHOOKS_FILE: &str = "webhooks.json";

/// The destination that logs ingested data instead of publishing it.
pub const WRITE_TO_STDOUT: &str = "stdout";

/// Destinations ending with this suffix publish to NATS.
pub const WRITE_TO_NATS_SUFFIX: &str = "nats";

const DATA_DIR: &str = "/app/data";

pub fn resources(
    microservice: &Microservice,
    extra: &RawDataLogIngestorExtra,
    customer_tenants: &[CustomerTenantInfo],
    platform: PlatformEnvironment,
) -> MicroserviceResources {
    let mut resources = compose(&Workload {
        microservice,
        head: Head {
            image: extra.head_image.clone(),
            port: HEAD_PORT,
            command: vec!["/app/bin/app".to_string()],
            args: vec!["raw-data-log".to_string(), "server".to_string()],
        },
        runtime_image: extra.runtime_image.clone(),
        public_rules: Some(vec![service_rule(microservice, &extra.ingress)]),
        customer_tenants,
        platform,
    });

    resources.set_env_variables([
        ("LOG_LEVEL", "debug".to_string()),
        ("LISTEN_ON", format!("0.0.0.0:{}", HEAD_PORT)),
        ("WEBHOOK_PREFIX", extra.ingress.path.clone()),
        ("DATA_DIR", DATA_DIR.to_string()),
        ("WEBHOOK_REPO", extra.write_to.clone()),
        ("NATS_CLUSTER_URL", nats_cluster_url(microservice)),
        ("STAN_CLUSTER_ID", "stan".to_string()),
        ("TOPIC", "topics.raw-data-log".to_string()),
    ]);
    resources.set_config_file(WEBHOOKS_FILE, render(&webhooks(&extra.webhooks)));
    resources
}

/// Returns true if the ingestor can write to the given destination.
pub fn is_valid_destination(write_to: &str) -> bool {
    write_to == WRITE_TO_STDOUT || write_to.ends_with(WRITE_TO_NATS_SUFFIX)
}
