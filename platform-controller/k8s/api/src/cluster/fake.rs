//! An in-memory [`Cluster`] that mimics the API server's create/replace/delete semantics.

use super::{Cluster, Object};
use crate::labels::{Map, Selector};
use kube::core::ErrorResponse;
use parking_lot::Mutex;
use serde_json::Value;
use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Verb {
    Create,
    Get,
    List,
    Replace,
    Delete,
    Scale,
}

/// A recorded API request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Call {
    pub verb: Verb,
    pub kind: String,
    pub namespace: String,
    pub name: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct FakeCluster {
    state: Arc<Mutex<State>>,
}

type Key = (String, String, String);

#[derive(Debug, Default)]
struct State {
    objects: BTreeMap<Key, Value>,
    failures: HashSet<(Verb, String)>,
    calls: Vec<Call>,
    version: u64,
}

fn api_error(code: u16, reason: &str, message: String) -> kube::Error {
    kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message,
        reason: reason.to_string(),
        code,
    })
}

fn kind_of<K: Object>() -> String {
    K::kind(&()).to_string()
}

fn labels_of(value: &Value) -> Map {
    value
        .pointer("/metadata/labels")
        .and_then(Value::as_object)
        .map(|labels| {
            labels
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

fn decode<K: Object>(value: &Value) -> kube::Result<K> {
    serde_json::from_value(value.clone()).map_err(kube::Error::SerdeError)
}

// === impl FakeCluster ===

impl FakeCluster {
    /// Seeds an object without recording a call.
    pub fn insert<K: Object>(&self, namespace: &str, object: K) {
        let mut state = self.state.lock();
        let name = object.meta().name.clone().unwrap_or_default();
        let value = state.stamp(namespace, &object);
        state
            .objects
            .insert((kind_of::<K>(), namespace.to_string(), name), value);
    }

    /// Returns every object of a kind in a namespace.
    pub fn objects<K: Object>(&self, namespace: &str) -> Vec<K> {
        let kind = kind_of::<K>();
        self.state
            .lock()
            .objects
            .iter()
            .filter(|((k, ns, _), _)| *k == kind && ns == namespace)
            .filter_map(|(_, v)| decode(v).ok())
            .collect()
    }

    pub fn object<K: Object>(&self, namespace: &str, name: &str) -> Option<K> {
        let key = (kind_of::<K>(), namespace.to_string(), name.to_string());
        self.state
            .lock()
            .objects
            .get(&key)
            .and_then(|v| decode(v).ok())
    }

    /// Makes every subsequent request of `verb` against `K` fail with an internal error.
    pub fn fail<K: Object>(&self, verb: Verb) {
        self.state.lock().failures.insert((verb, kind_of::<K>()));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    fn begin<K: Object>(&self, verb: Verb, namespace: &str, name: Option<&str>) -> kube::Result<()> {
        let kind = kind_of::<K>();
        let mut state = self.state.lock();
        state.calls.push(Call {
            verb,
            kind: kind.clone(),
            namespace: namespace.to_string(),
            name: name.map(ToString::to_string),
        });
        if state.failures.contains(&(verb, kind.clone())) {
            return Err(api_error(
                500,
                "InternalError",
                format!("injected {:?} failure for {}", verb, kind),
            ));
        }
        Ok(())
    }
}

impl State {
    fn stamp<K: Object>(&mut self, namespace: &str, object: &K) -> Value {
        self.version += 1;
        let mut value = serde_json::to_value(object).expect("objects must serialize");
        if let Some(meta) = value.get_mut("metadata").and_then(Value::as_object_mut) {
            meta.insert("namespace".into(), Value::String(namespace.to_string()));
            meta.insert(
                "resourceVersion".into(),
                Value::String(self.version.to_string()),
            );
        }
        value
    }
}

fn not_found<K: Object>(name: &str) -> kube::Error {
    api_error(
        404,
        "NotFound",
        format!("{} \"{}\" not found", kind_of::<K>(), name),
    )
}

#[async_trait::async_trait]
impl Cluster for FakeCluster {
    async fn create<K: Object>(&self, namespace: &str, object: &K) -> kube::Result<K> {
        let name = object.meta().name.clone().unwrap_or_default();
        self.begin::<K>(Verb::Create, namespace, Some(&name))?;

        let mut state = self.state.lock();
        let key = (kind_of::<K>(), namespace.to_string(), name.clone());
        if state.objects.contains_key(&key) {
            return Err(api_error(
                409,
                "AlreadyExists",
                format!("{} \"{}\" already exists", kind_of::<K>(), name),
            ));
        }
        let value = state.stamp(namespace, object);
        let created = decode(&value)?;
        state.objects.insert(key, value);
        Ok(created)
    }

    async fn get<K: Object>(&self, namespace: &str, name: &str) -> kube::Result<K> {
        self.begin::<K>(Verb::Get, namespace, Some(name))?;
        let key = (kind_of::<K>(), namespace.to_string(), name.to_string());
        match self.state.lock().objects.get(&key) {
            Some(value) => decode(value),
            None => Err(not_found::<K>(name)),
        }
    }

    async fn list<K: Object>(&self, namespace: &str, selector: &Selector) -> kube::Result<Vec<K>> {
        self.begin::<K>(Verb::List, namespace, None)?;
        let kind = kind_of::<K>();
        self.state
            .lock()
            .objects
            .iter()
            .filter(|((k, ns, _), v)| {
                *k == kind && ns == namespace && selector.matches(&labels_of(v))
            })
            .map(|(_, v)| decode(v))
            .collect()
    }

    async fn replace<K: Object>(
        &self,
        namespace: &str,
        name: &str,
        object: &K,
    ) -> kube::Result<K> {
        self.begin::<K>(Verb::Replace, namespace, Some(name))?;

        let mut state = self.state.lock();
        let key = (kind_of::<K>(), namespace.to_string(), name.to_string());
        let current = match state.objects.get(&key) {
            Some(value) => value
                .pointer("/metadata/resourceVersion")
                .and_then(Value::as_str)
                .map(ToString::to_string),
            None => return Err(not_found::<K>(name)),
        };
        if let Some(version) = object.meta().resource_version.as_ref() {
            if current.as_ref() != Some(version) {
                return Err(api_error(
                    409,
                    "Conflict",
                    "the object has been modified; please apply your changes to the latest version"
                        .to_string(),
                ));
            }
        }
        let value = state.stamp(namespace, object);
        let replaced = decode(&value)?;
        state.objects.insert(key, value);
        Ok(replaced)
    }

    async fn delete<K: Object>(&self, namespace: &str, name: &str) -> kube::Result<()> {
        self.begin::<K>(Verb::Delete, namespace, Some(name))?;
        let key = (kind_of::<K>(), namespace.to_string(), name.to_string());
        match self.state.lock().objects.remove(&key) {
            Some(_) => Ok(()),
            None => Err(not_found::<K>(name)),
        }
    }

    async fn scale<K: Object>(
        &self,
        namespace: &str,
        name: &str,
        replicas: i32,
    ) -> kube::Result<()> {
        self.begin::<K>(Verb::Scale, namespace, Some(name))?;
        let key = (kind_of::<K>(), namespace.to_string(), name.to_string());
        let mut state = self.state.lock();
        state.version += 1;
        let version = state.version.to_string();
        let value = match state.objects.get_mut(&key) {
            Some(value) => value,
            None => return Err(not_found::<K>(name)),
        };
        if let Some(obj) = value.as_object_mut() {
            let spec = obj
                .entry("spec")
                .or_insert_with(|| Value::Object(Default::default()));
            if let Some(spec) = spec.as_object_mut() {
                spec.insert("replicas".into(), Value::from(replicas));
            }
        }
        if let Some(meta) = value.get_mut("metadata").and_then(Value::as_object_mut) {
            meta.insert("resourceVersion".into(), Value::String(version));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cluster::is_already_exists, cluster::is_not_found, ConfigMap, ObjectMeta};
    use maplit::btreemap;

    fn config_map(name: &str, labels: Map) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                labels: Some(labels),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_is_rejected_when_the_object_exists() {
        let cluster = FakeCluster::default();
        let cm = config_map("a", Map::default());
        cluster.create("ns", &cm).await.unwrap();
        let err = cluster.create("ns", &cm).await.unwrap_err();
        assert!(is_already_exists(&err));
        assert_eq!(cluster.objects::<ConfigMap>("ns").len(), 1);
    }

    #[tokio::test]
    async fn list_filters_by_namespace_and_selector() {
        let cluster = FakeCluster::default();
        cluster.insert("ns", config_map("a", btreemap! { "x".into() => "1".into() }));
        cluster.insert("ns", config_map("b", btreemap! { "x".into() => "2".into() }));
        cluster.insert("other", config_map("c", btreemap! { "x".into() => "1".into() }));

        let selected = cluster
            .list::<ConfigMap>("ns", &Selector::from_iter(Some(("x", "1"))))
            .await
            .unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].metadata.name.as_deref(), Some("a"));

        let all = cluster
            .list::<ConfigMap>("ns", &Selector::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn replace_enforces_resource_versions() {
        let cluster = FakeCluster::default();
        cluster.insert("ns", config_map("a", Map::default()));
        let current: ConfigMap = cluster.get("ns", "a").await.unwrap();

        let mut stale = current.clone();
        stale.metadata.resource_version = Some("0".to_string());
        let err = cluster.replace("ns", "a", &stale).await.unwrap_err();
        assert!(matches!(err, kube::Error::Api(ref rsp) if rsp.reason == "Conflict"));

        cluster.replace("ns", "a", &current).await.unwrap();
        cluster.delete::<ConfigMap>("ns", "a").await.unwrap();
        let err = cluster.delete::<ConfigMap>("ns", "a").await.unwrap_err();
        assert!(is_not_found(&err));
    }
}
