use super::service_rule;
use crate::{compose, Head, MicroserviceResources, PlatformEnvironment, Workload, DEFAULT_HEAD_PORT};
use dolittle_platform_core::{request::SimpleExtra, CustomerTenantInfo, Microservice};

pub fn resources(
    microservice: &Microservice,
    extra: &SimpleExtra,
    customer_tenants: &[CustomerTenantInfo],
    platform: PlatformEnvironment,
) -> MicroserviceResources {
    let command = extra.head_command.clone().unwrap_or_default();
    compose(&Workload {
        microservice,
        head: Head {
            image: extra.head_image.clone(),
            port: extra.head_port.unwrap_or(DEFAULT_HEAD_PORT),
            command: command.command,
            args: command.args,
        },
        runtime_image: extra.runtime_image.clone(),
        public_rules: extra
            .is_public
            .then(|| vec![service_rule(microservice, &extra.ingress)]),
        customer_tenants,
        platform,
    })
}
