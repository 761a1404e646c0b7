use serde::{Deserialize, Serialize};
use std::fmt;

/// A customer of the platform.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Tenant {
    pub id: String,
    pub name: String,
}

/// The identifying part of an [`Application`](crate::Application).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct ApplicationInfo {
    pub id: String,
    pub name: String,
}

/// Selects the resource composition and lifecycle used for a microservice.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Kind {
    Simple,
    BusinessMomentsAdaptor,
    RawDataLogIngestor,
    PurchaseOrderApi,
    Webhook,
}

/// A microservice's identity.
///
/// Once a microservice has been created none of these fields change; every Kubernetes object
/// that realizes it is labeled and annotated from this value.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Microservice {
    pub id: String,
    pub name: String,
    pub kind: Kind,
    pub tenant: Tenant,
    pub application: ApplicationInfo,
    pub environment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}

// === impl Kind ===

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::BusinessMomentsAdaptor => "business-moments-adaptor",
            Self::RawDataLogIngestor => "raw-data-log-ingestor",
            Self::PurchaseOrderApi => "purchase-order-api",
            Self::Webhook => "webhook",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Kind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        for kind in [
            Self::Simple,
            Self::BusinessMomentsAdaptor,
            Self::RawDataLogIngestor,
            Self::PurchaseOrderApi,
            Self::Webhook,
        ] {
            if kind.as_str() == s {
                return Ok(kind);
            }
        }
        Err(UnknownKind(s.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown microservice kind: {0}")]
pub struct UnknownKind(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_round_trip_through_serde() {
        for kind in [
            Kind::Simple,
            Kind::BusinessMomentsAdaptor,
            Kind::RawDataLogIngestor,
            Kind::PurchaseOrderApi,
            Kind::Webhook,
        ] {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, serde_json::Value::String(kind.to_string()));
            assert_eq!(kind.as_str().parse::<Kind>().unwrap(), kind);
        }
        assert!("Simple".parse::<Kind>().is_err());
    }
}
