//! Folds the presence of connector marker config maps into environment connection flags.

use crate::{enqueue, is_application_namespace, Metrics, CONNECTOR_CONTROLLER};
use ahash::{AHashMap as HashMap, AHashSet as HashSet};
use dolittle_platform_core::{Store, StoreError};
use dolittle_platform_k8s_api::{labels, ConfigMap, ResourceExt};
use kubert::index::{IndexNamespacedResource, NamespacedRemoved};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

pub type SharedConnectorIndex = Arc<RwLock<ConnectorIndex>>;

/// Tracks the connector marker config maps of application namespaces.
#[derive(Debug)]
pub struct ConnectorIndex {
    marker_suffix: String,

    /// The owner of every indexed marker, so that deletes can be attributed.
    owners: HashMap<(String, String), Owner>,
    updates: mpsc::Sender<ConnectorEvent>,
    metrics: Metrics,
}

/// The environment a marker belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Owner {
    pub tenant_id: String,
    pub application_id: String,
    pub environment: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectorEvent {
    pub owner: Owner,
    pub connected: bool,
}

pub struct ConnectorController<S: ?Sized> {
    store: Arc<S>,
    connector: String,
    updates: mpsc::Receiver<ConnectorEvent>,
    metrics: Metrics,
}

/// Sets the connector flag of the owner's environment.
///
/// Returns true if the store was written, which only happens when the flag changes.
pub async fn reconcile_connector<S: Store + ?Sized>(
    store: &S,
    connector: &str,
    event: &ConnectorEvent,
) -> Result<bool, StoreError> {
    let Owner {
        tenant_id,
        application_id,
        environment,
    } = &event.owner;

    let mut application = store.get_application(tenant_id, application_id).await?;
    let env = application
        .environment_mut(environment)
        .ok_or_else(|| StoreError::EnvironmentNotFound(environment.clone()))?;
    if !env.set_connection(connector, event.connected) {
        return Ok(false);
    }
    store.save_application(&application).await?;
    Ok(true)
}

// === impl ConnectorIndex ===

impl ConnectorIndex {
    pub fn shared(
        marker_suffix: impl ToString,
        updates: mpsc::Sender<ConnectorEvent>,
        metrics: Metrics,
    ) -> SharedConnectorIndex {
        Arc::new(RwLock::new(Self {
            marker_suffix: marker_suffix.to_string(),
            owners: HashMap::new(),
            updates,
            metrics,
        }))
    }

    fn is_marker(&self, namespace: &str, name: &str) -> bool {
        is_application_namespace(namespace) && name.ends_with(&self.marker_suffix)
    }

    fn send(&self, event: ConnectorEvent) -> bool {
        enqueue(CONNECTOR_CONTROLLER, &self.updates, &self.metrics, event)
    }
}

impl IndexNamespacedResource<ConfigMap> for ConnectorIndex {
    fn apply(&mut self, config_map: ConfigMap) {
        let namespace = config_map.namespace().unwrap_or_default();
        let name = config_map.name_unchecked();
        if !self.is_marker(&namespace, &name) {
            return;
        }

        let owner = match Owner::from_config_map(&config_map) {
            Some(owner) => owner,
            None => {
                warn!(%namespace, %name, "Connector marker is missing its owner metadata; skipping");
                return;
            }
        };
        self.owners.insert((namespace, name), owner.clone());
        self.send(ConnectorEvent {
            owner,
            connected: true,
        });
    }

    /// The owner is forgotten only once its disconnect is queued.
    fn delete(&mut self, namespace: String, name: String) {
        let key = (namespace, name);
        let owner = match self.owners.get(&key) {
            Some(owner) => owner.clone(),
            None => return,
        };
        if self.send(ConnectorEvent {
            owner,
            connected: false,
        }) {
            self.owners.remove(&key);
        }
    }

    /// Markers whose disconnect was dropped are no longer reported as removed by the watch, so
    /// every indexed marker missing from the relist is deleted again.
    fn reset(&mut self, config_maps: Vec<ConfigMap>, _removed: NamespacedRemoved) {
        let live = config_maps
            .iter()
            .map(|cm| (cm.namespace().unwrap_or_default(), cm.name_unchecked()))
            .collect::<HashSet<_>>();
        for config_map in config_maps {
            self.apply(config_map);
        }

        let stale = self
            .owners
            .keys()
            .filter(|key| !live.contains(*key))
            .cloned()
            .collect::<Vec<_>>();
        for (namespace, name) in stale {
            self.delete(namespace, name);
        }
    }
}

// === impl Owner ===

impl Owner {
    fn from_config_map(config_map: &ConfigMap) -> Option<Self> {
        let annotations = config_map.annotations();
        Some(Self {
            tenant_id: annotations.get(labels::TENANT_ID)?.clone(),
            application_id: annotations.get(labels::APPLICATION_ID)?.clone(),
            environment: config_map.labels().get(labels::ENVIRONMENT)?.clone(),
        })
    }
}

// === impl ConnectorController ===

impl<S: Store + ?Sized> ConnectorController<S> {
    pub fn new(
        store: Arc<S>,
        connector: impl ToString,
        updates: mpsc::Receiver<ConnectorEvent>,
        metrics: Metrics,
    ) -> Self {
        Self {
            store,
            connector: connector.to_string(),
            updates,
            metrics,
        }
    }

    /// Handles events until every sender is dropped.
    pub async fn run(mut self) {
        while let Some(event) = self.updates.recv().await {
            self.process(&event).await;
        }
        debug!("Connector updates closed");
    }

    pub(crate) async fn process(&self, event: &ConnectorEvent) {
        self.metrics.events.inc();
        let Owner {
            tenant_id,
            application_id,
            environment,
        } = &event.owner;

        match reconcile_connector(&*self.store, &self.connector, event).await {
            Ok(true) => {
                self.metrics.store_writes.inc();
                info!(
                    %tenant_id,
                    %application_id,
                    %environment,
                    connector = %self.connector,
                    connected = event.connected,
                    "Updated environment connection"
                );
            }
            Ok(false) => {
                debug!(%tenant_id, %application_id, %environment, "Environment connection unchanged");
            }
            Err(error) if error.is_not_found() => {
                // Applications and environments may not be synced to the store yet.
                debug!(%tenant_id, %application_id, %environment, %error, "Skipping connector update");
            }
            Err(error) => {
                self.metrics.errors.inc();
                error!(%tenant_id, %application_id, %environment, %error, "Failed to update environment connection");
            }
        }
    }
}
