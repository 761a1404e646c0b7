use super::{nats_cluster_url, webhooks};
use crate::{
    compose,
    config::{mongo_url, render},
    Head, MicroserviceResources, PlatformEnvironment, Workload,
};
use dolittle_platform_core::{request::PurchaseOrderApiExtra, CustomerTenantInfo, Microservice};

pub const HEAD_PORT: i32 = 8080;

pub const WEBHOOKS_FILE: &str = "webhooks.json";

/// Purchase order APIs consume from the environment's raw data log and are never public.
pub fn resources(
    microservice: &Microservice,
    extra: &PurchaseOrderApiExtra,
    customer_tenants: &[CustomerTenantInfo],
    platform: PlatformEnvironment,
) -> MicroserviceResources {
    let mut resources = compose(&Workload {
        microservice,
        head: Head {
            image: extra.head_image.clone(),
            port: HEAD_PORT,
            command: Vec::new(),
            args: Vec::new(),
        },
        runtime_image: extra.runtime_image.clone(),
        public_rules: None,
        customer_tenants,
        platform,
    });

    resources.set_env_variables([
        ("LOG_LEVEL", "debug".to_string()),
        ("NODE_ENV", "production".to_string()),
        ("NATS_CLUSTER_URL", nats_cluster_url(microservice)),
        ("NATS_START_FROM_BEGINNING", "false".to_string()),
        ("DATABASE_READMODELS_URL", mongo_url(microservice)),
    ]);
    resources.set_config_file(WEBHOOKS_FILE, render(&webhooks(&extra.webhooks)));
    resources
}
