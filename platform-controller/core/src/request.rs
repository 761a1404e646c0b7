//! Inbound microservice documents.
//!
//! A document is accepted by the dispatcher, realized in the cluster, and then persisted to the
//! declarative store as-is. The stored document, not the live cluster state, is what later reads
//! and re-creations work from.

use crate::identity::Kind;
use serde::{Deserialize, Serialize};

/// The default path type of an ingress rule.
pub const DEFAULT_PATH_TYPE: &str = "Prefix";

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum MicroserviceRequest {
    Simple(SimpleRequest),
    BusinessMomentsAdaptor(BusinessMomentsAdaptorRequest),
    RawDataLogIngestor(RawDataLogIngestorRequest),
    PurchaseOrderApi(PurchaseOrderApiRequest),
    Webhook(WebhookRequest),
}

/// The IDs a document claims to belong to.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DolittleIds {
    pub tenant_id: String,
    pub application_id: String,
    pub microservice_id: String,
}

/// Fields shared by every kind of document.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MicroserviceBase {
    pub dolittle: DolittleIds,
    pub name: String,
    pub environment: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressPath {
    #[serde(default)]
    pub path: String,
    #[serde(default = "default_path_type")]
    pub path_type: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct HeadCommand {
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct SimpleRequest {
    #[serde(flatten)]
    pub base: MicroserviceBase,
    pub extra: SimpleExtra,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleExtra {
    pub head_image: String,
    pub runtime_image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_port: Option<i32>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub ingress: IngressPath,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_command: Option<HeadCommand>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct BusinessMomentsAdaptorRequest {
    #[serde(flatten)]
    pub base: MicroserviceBase,
    pub extra: BusinessMomentsAdaptorExtra,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessMomentsAdaptorExtra {
    pub head_image: String,
    pub runtime_image: String,
    #[serde(default)]
    pub ingress: IngressPath,
    pub connector: BusinessMomentsConnector,
}

/// Where a business moments adaptor receives its data from.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", content = "config", rename_all = "lowercase")]
pub enum BusinessMomentsConnector {
    Webhook(WebhookAuthorization),
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", content = "config", rename_all = "lowercase")]
pub enum WebhookAuthorization {
    Basic { username: String, password: String },
    Bearer { token: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct RawDataLogIngestorRequest {
    #[serde(flatten)]
    pub base: MicroserviceBase,
    pub extra: RawDataLogIngestorExtra,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDataLogIngestorExtra {
    pub head_image: String,
    pub runtime_image: String,
    #[serde(default)]
    pub ingress: IngressPath,

    /// Either `stdout` or the name of a NATS destination (ending in `nats`).
    pub write_to: String,
    #[serde(default)]
    pub webhooks: Vec<WebhookEndpoint>,
}

/// A webhook exposed by a raw data log ingestor.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEndpoint {
    pub kind: String,
    pub uri_suffix: String,
    #[serde(default)]
    pub authorization: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct PurchaseOrderApiRequest {
    #[serde(flatten)]
    pub base: MicroserviceBase,
    pub extra: PurchaseOrderApiExtra,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderApiExtra {
    pub head_image: String,
    pub runtime_image: String,
    #[serde(default)]
    pub webhooks: Vec<WebhookEndpoint>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct WebhookRequest {
    #[serde(flatten)]
    pub base: MicroserviceBase,
    #[serde(default)]
    pub extra: serde_json::Value,
}

fn default_path_type() -> String {
    DEFAULT_PATH_TYPE.to_string()
}

// === impl MicroserviceRequest ===

impl MicroserviceRequest {
    pub fn kind(&self) -> Kind {
        match self {
            Self::Simple(_) => Kind::Simple,
            Self::BusinessMomentsAdaptor(_) => Kind::BusinessMomentsAdaptor,
            Self::RawDataLogIngestor(_) => Kind::RawDataLogIngestor,
            Self::PurchaseOrderApi(_) => Kind::PurchaseOrderApi,
            Self::Webhook(_) => Kind::Webhook,
        }
    }

    pub fn base(&self) -> &MicroserviceBase {
        match self {
            Self::Simple(req) => &req.base,
            Self::BusinessMomentsAdaptor(req) => &req.base,
            Self::RawDataLogIngestor(req) => &req.base,
            Self::PurchaseOrderApi(req) => &req.base,
            Self::Webhook(req) => &req.base,
        }
    }

    pub fn microservice_id(&self) -> &str {
        &self.base().dolittle.microservice_id
    }

    pub fn environment(&self) -> &str {
        &self.base().environment
    }

    /// The head image the document declares, if its kind has one.
    pub fn head_image(&self) -> Option<&str> {
        match self {
            Self::Simple(req) => Some(&req.extra.head_image),
            Self::BusinessMomentsAdaptor(req) => Some(&req.extra.head_image),
            Self::RawDataLogIngestor(req) => Some(&req.extra.head_image),
            Self::PurchaseOrderApi(req) => Some(&req.extra.head_image),
            Self::Webhook(_) => None,
        }
    }

    /// The ingress path the microservice is publicly reachable on, if any.
    pub fn public_path(&self) -> Option<&str> {
        let path = match self {
            Self::Simple(req) if req.extra.is_public => &req.extra.ingress.path,
            Self::BusinessMomentsAdaptor(req) => &req.extra.ingress.path,
            Self::RawDataLogIngestor(req) => &req.extra.ingress.path,
            _ => return None,
        };
        Some(path.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_document() {
        let req: MicroserviceRequest = serde_json::from_value(serde_json::json!({
            "dolittle": {
                "applicationId": "cc142a0d-deac-4974-ada9-de6e21337dca",
                "tenantId": "4acf7a6e-6b1c-4a0d-9c8f-1f0b0e6e7a3d",
                "microserviceId": "c974e5a2-3f7c-4b25-a1b2-6d38b7c2a9a1"
            },
            "name": "LeliaKim",
            "kind": "simple",
            "environment": "AndreJensen",
            "extra": {
                "headImage": "dolittle/spinner:0.0.0",
                "runtimeImage": "dolittle/runtime:5.6.0",
                "isPublic": true,
                "ingress": { "path": "/" }
            }
        }))
        .unwrap();

        assert_eq!(req.kind(), Kind::Simple);
        assert_eq!(req.environment(), "AndreJensen");
        assert_eq!(req.public_path(), Some("/"));
        match req {
            MicroserviceRequest::Simple(simple) => {
                assert_eq!(simple.extra.ingress.path_type, "Prefix");
                assert_eq!(simple.extra.head_port, None);
            }
            other => panic!("unexpected kind {:?}", other.kind()),
        }
    }

    #[test]
    fn parses_business_moments_connector() {
        let extra: BusinessMomentsAdaptorExtra = serde_json::from_value(serde_json::json!({
            "headImage": "dolittle/bma:1",
            "runtimeImage": "dolittle/runtime:5.6.0",
            "ingress": { "path": "/bma", "pathType": "Exact" },
            "connector": {
                "kind": "webhook",
                "config": { "kind": "bearer", "config": { "token": "t0k3n" } }
            }
        }))
        .unwrap();
        assert_eq!(
            extra.connector,
            BusinessMomentsConnector::Webhook(WebhookAuthorization::Bearer {
                token: "t0k3n".to_string()
            })
        );
        assert_eq!(extra.ingress.path_type, "Exact");
    }

    #[test]
    fn rejects_unknown_kind() {
        let res = serde_json::from_value::<MicroserviceRequest>(serde_json::json!({
            "dolittle": { "applicationId": "a", "tenantId": "t", "microserviceId": "m" },
            "name": "n",
            "kind": "mystery",
            "environment": "Dev",
            "extra": {}
        }));
        assert!(res.is_err());
    }

    #[test]
    fn private_simple_microservices_have_no_public_path() {
        let req = MicroserviceRequest::Simple(SimpleRequest {
            base: MicroserviceBase {
                dolittle: DolittleIds {
                    tenant_id: "t".to_string(),
                    application_id: "a".to_string(),
                    microservice_id: "m".to_string(),
                },
                name: "n".to_string(),
                environment: "Dev".to_string(),
            },
            extra: SimpleExtra {
                head_image: "img".to_string(),
                runtime_image: "rt".to_string(),
                head_port: None,
                is_public: false,
                ingress: IngressPath {
                    path: "/".to_string(),
                    path_type: DEFAULT_PATH_TYPE.to_string(),
                },
                head_command: None,
            },
        });
        assert_eq!(req.public_path(), None);
    }
}
