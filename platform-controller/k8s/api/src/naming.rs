//! Names of the objects generated for a microservice.

/// The namespace an application's objects live in.
pub fn namespace(application_id: &str) -> String {
    format!("application-{}", application_id)
}

/// Builds `{environment}-{microservice}[-{suffix}]`, lower-cased.
pub fn resource_name(environment: &str, microservice: &str, suffix: Option<&str>) -> String {
    let name = match suffix {
        Some(suffix) => format!("{}-{}-{}", environment, microservice, suffix),
        None => format!("{}-{}", environment, microservice),
    };
    name.to_lowercase()
}

/// The names of the per-microservice config maps and secret.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigNames {
    pub dolittle: String,
    pub env_variables: String,
    pub config_files: String,
    pub secret_env_variables: String,
}

impl ConfigNames {
    pub fn new(environment: &str, microservice: &str) -> Self {
        Self {
            dolittle: resource_name(environment, microservice, Some("dolittle")),
            env_variables: resource_name(environment, microservice, Some("env-variables")),
            config_files: resource_name(environment, microservice, Some("config-files")),
            secret_env_variables: resource_name(
                environment,
                microservice,
                Some("secret-env-variables"),
            ),
        }
    }
}
