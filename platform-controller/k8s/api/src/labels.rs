//! The label and annotation contract shared by every object of a microservice.

use dolittle_platform_core::Microservice;
use std::{collections::BTreeMap, fmt};

pub const TENANT: &str = "tenant";
pub const APPLICATION: &str = "application";
pub const ENVIRONMENT: &str = "environment";
pub const MICROSERVICE: &str = "microservice";

pub const TENANT_ID: &str = "dolittle.io/tenant-id";
pub const APPLICATION_ID: &str = "dolittle.io/application-id";
pub const MICROSERVICE_ID: &str = "dolittle.io/microservice-id";
pub const MICROSERVICE_KIND: &str = "dolittle.io/microservice-kind";

/// The label keys that identify a microservice's objects.
pub const IDENTITY_LABELS: [&str; 4] = [TENANT, APPLICATION, ENVIRONMENT, MICROSERVICE];

pub type Map = BTreeMap<String, String>;

/// Selects objects whose labels contain every key-value pair of the selector.
#[derive(Clone, Debug, Eq, PartialEq, Default)]
pub struct Selector {
    match_labels: Map,
}

/// Labels every object of a microservice carries.
pub fn microservice_labels(microservice: &Microservice) -> Map {
    [
        (TENANT, microservice.tenant.name.as_str()),
        (APPLICATION, microservice.application.name.as_str()),
        (ENVIRONMENT, microservice.environment.as_str()),
        (MICROSERVICE, microservice.name.as_str()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Annotations every object of a microservice carries.
pub fn microservice_annotations(microservice: &Microservice) -> Map {
    [
        (TENANT_ID, microservice.tenant.id.as_str()),
        (APPLICATION_ID, microservice.application.id.as_str()),
        (MICROSERVICE_ID, microservice.id.as_str()),
        (MICROSERVICE_KIND, microservice.kind.as_str()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

// === Selector ===

impl Selector {
    pub fn from_map(map: Map) -> Self {
        Self { match_labels: map }
    }

    /// Builds the selector matching all objects of the microservice that owns an object with the
    /// given labels.
    ///
    /// Returns `None` unless every identity label is present, so that a partially-labeled object
    /// can never produce a selector broader than a single microservice.
    pub fn for_microservice(labels: &Map) -> Option<Self> {
        IDENTITY_LABELS
            .iter()
            .map(|key| {
                labels
                    .get(*key)
                    .map(|value| (key.to_string(), value.clone()))
            })
            .collect::<Option<Map>>()
            .map(Self::from_map)
    }

    pub fn is_empty(&self) -> bool {
        self.match_labels.is_empty()
    }

    pub fn matches(&self, labels: &Map) -> bool {
        self.match_labels
            .iter()
            .all(|(k, v)| labels.get(k) == Some(v))
    }

    pub fn match_labels(&self) -> &Map {
        &self.match_labels
    }
}

/// Formats the selector as a Kubernetes label selector query, e.g. `a=b,c=d`.
impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (k, v) in self.match_labels.iter() {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{}={}", k, v)?;
            first = false;
        }
        Ok(())
    }
}

impl std::iter::FromIterator<(String, String)> for Selector {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self::from_map(iter.into_iter().collect())
    }
}

impl std::iter::FromIterator<(&'static str, &'static str)> for Selector {
    fn from_iter<T: IntoIterator<Item = (&'static str, &'static str)>>(iter: T) -> Self {
        Self::from_map(
            iter.into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}
