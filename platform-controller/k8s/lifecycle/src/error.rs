use dolittle_platform_k8s_api::Object;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to {verb} {kind} {namespace}/{name}: {source}")]
    Api {
        verb: &'static str,
        kind: String,
        namespace: String,
        name: String,
        #[source]
        source: kube::Error,
    },

    #[error("no deployment found for microservice {microservice_id} in {namespace}")]
    DeploymentNotFound {
        namespace: String,
        microservice_id: String,
    },

    /// The live deployment lacks one of the identity labels, so no selector can be derived that
    /// is limited to a single microservice.
    #[error("deployment {namespace}/{name} is missing identity labels")]
    IncompleteLabels { namespace: String, name: String },

    #[error("microservice belongs in namespace {expected}, not {actual}")]
    NamespaceMismatch { expected: String, actual: String },
}

impl Error {
    pub(crate) fn api<K: Object>(
        verb: &'static str,
        namespace: &str,
        name: &str,
        source: kube::Error,
    ) -> Self {
        Self::Api {
            verb,
            kind: K::kind(&()).to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
            source,
        }
    }

    /// The underlying API error, if any.
    pub fn api_error(&self) -> Option<&kube::Error> {
        match self {
            Self::Api { source, .. } => Some(source),
            _ => None,
        }
    }
}
