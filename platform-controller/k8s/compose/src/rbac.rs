//! Rules granted on the application's shared `developer` role.

use dolittle_platform_k8s_api::{naming::ConfigNames, PolicyRule};

/// The role shared by all developers of an application.
pub const DEVELOPER_ROLE: &str = "developer";

const VERBS: [&str; 2] = ["get", "patch"];

/// The rules that let developers read and edit a microservice's configuration.
///
/// Scoped by resource name to the microservice's env-variables and config-files config maps and
/// its secret, so the rules of two microservices never overlap.
pub fn policy_rules(environment: &str, microservice: &str) -> Vec<PolicyRule> {
    let names = ConfigNames::new(environment, microservice);
    vec![
        rule("configmaps", vec![names.env_variables, names.config_files]),
        rule("secrets", vec![names.secret_env_variables]),
    ]
}

fn rule(resource: &str, names: Vec<String>) -> PolicyRule {
    PolicyRule {
        api_groups: Some(vec![String::new()]),
        resources: Some(vec![resource.to_string()]),
        resource_names: Some(names),
        verbs: VERBS.iter().map(ToString::to_string).collect(),
        ..Default::default()
    }
}
