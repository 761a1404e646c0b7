//! The seam between the platform and the Kubernetes API.
//!
//! Lifecycle operations are written against [`Cluster`] so that they can run either against the
//! live API server ([`KubeCluster`]) or, in tests, against an in-memory fake.

use crate::labels::Selector;
use kube::{
    api::{Api, DeleteParams, ListParams, Patch, PatchParams, PostParams},
    core::NamespaceResourceScope,
    Resource,
};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;

#[cfg(any(test, feature = "test-util"))]
pub mod fake;

const FIELD_MANAGER: &str = "platform.dolittle.io";

/// A namespaced Kubernetes object type.
pub trait Object:
    Resource<Scope = NamespaceResourceScope, DynamicType = ()>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<K> Object for K where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// Namespaced object operations.
///
/// Each call is a single API request; no retries or timeouts are applied beyond what the
/// underlying client does.
#[async_trait::async_trait]
pub trait Cluster: Clone + Send + Sync + 'static {
    async fn create<K: Object>(&self, namespace: &str, object: &K) -> kube::Result<K>;

    async fn get<K: Object>(&self, namespace: &str, name: &str) -> kube::Result<K>;

    /// Lists objects in a namespace. An empty selector lists every object.
    async fn list<K: Object>(&self, namespace: &str, selector: &Selector) -> kube::Result<Vec<K>>;

    /// Replaces an object, subject to its `resourceVersion`.
    async fn replace<K: Object>(&self, namespace: &str, name: &str, object: &K)
        -> kube::Result<K>;

    async fn delete<K: Object>(&self, namespace: &str, name: &str) -> kube::Result<()>;

    /// Sets the replica count through the scale subresource.
    async fn scale<K: Object>(&self, namespace: &str, name: &str, replicas: i32)
        -> kube::Result<()>;
}

/// Returns true if the API server rejected a create because the object already exists.
pub fn is_already_exists(error: &kube::Error) -> bool {
    matches!(error, kube::Error::Api(rsp) if rsp.reason == "AlreadyExists")
}

pub fn is_not_found(error: &kube::Error) -> bool {
    matches!(error, kube::Error::Api(rsp) if rsp.code == 404)
}

/// A [`Cluster`] backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeCluster {
    client: kube::Client,
}

// === impl KubeCluster ===

impl KubeCluster {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }

    fn api<K: Object>(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn post_params() -> PostParams {
        PostParams {
            dry_run: false,
            field_manager: Some(FIELD_MANAGER.to_string()),
        }
    }
}

#[async_trait::async_trait]
impl Cluster for KubeCluster {
    async fn create<K: Object>(&self, namespace: &str, object: &K) -> kube::Result<K> {
        self.api::<K>(namespace)
            .create(&Self::post_params(), object)
            .await
    }

    async fn get<K: Object>(&self, namespace: &str, name: &str) -> kube::Result<K> {
        self.api::<K>(namespace).get(name).await
    }

    async fn list<K: Object>(&self, namespace: &str, selector: &Selector) -> kube::Result<Vec<K>> {
        let params = if selector.is_empty() {
            ListParams::default()
        } else {
            ListParams::default().labels(&selector.to_string())
        };
        let list = self.api::<K>(namespace).list(&params).await?;
        Ok(list.items)
    }

    async fn replace<K: Object>(
        &self,
        namespace: &str,
        name: &str,
        object: &K,
    ) -> kube::Result<K> {
        self.api::<K>(namespace)
            .replace(name, &Self::post_params(), object)
            .await
    }

    async fn delete<K: Object>(&self, namespace: &str, name: &str) -> kube::Result<()> {
        self.api::<K>(namespace)
            .delete(name, &DeleteParams::background())
            .await?;
        Ok(())
    }

    async fn scale<K: Object>(
        &self,
        namespace: &str,
        name: &str,
        replicas: i32,
    ) -> kube::Result<()> {
        let patch = serde_json::json!({ "spec": { "replicas": replicas } });
        self.api::<K>(namespace)
            .patch_scale(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }
}
