//! Detects deployments whose head image has drifted from the stored microservice document.
//!
//! Drift is surfaced (logged and counted) but never written back.

use crate::{enqueue, is_application_namespace, Metrics, IMAGE_CONTROLLER};
use ahash::AHashMap as HashMap;
use dolittle_platform_core::{Store, StoreError};
use dolittle_platform_k8s_api::{labels, Deployment, ResourceExt};
use dolittle_platform_k8s_compose::head_image;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

pub type SharedImageIndex = Arc<RwLock<ImageIndex>>;

/// Tracks the head images of microservice deployments.
#[derive(Debug)]
pub struct ImageIndex {
    images: HashMap<(String, String), String>,
    updates: mpsc::Sender<ImageEvent>,
    metrics: Metrics,
}

/// Identifies the microservice a deployment realizes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MicroserviceDeployment {
    pub namespace: String,
    pub name: String,
    pub tenant_id: String,
    pub application_id: String,
    pub environment: String,
    pub microservice_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageEvent {
    pub deployment: MicroserviceDeployment,
    pub image: String,
}

/// A head image that differs from the stored one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageChange {
    pub from: String,
    pub to: String,
}

pub struct ImageController<S: ?Sized> {
    store: Arc<S>,
    updates: mpsc::Receiver<ImageEvent>,
    metrics: Metrics,
}

/// Compares the live head image with the one the stored microservice declares.
pub async fn reconcile_image<S: Store + ?Sized>(
    store: &S,
    event: &ImageEvent,
) -> Result<Option<ImageChange>, StoreError> {
    let MicroserviceDeployment {
        tenant_id,
        application_id,
        environment,
        microservice_id,
        ..
    } = &event.deployment;

    let microservice = store
        .get_microservice(tenant_id, application_id, environment, microservice_id)
        .await?;
    let change = microservice
        .head_image()
        .filter(|declared| *declared != event.image)
        .map(|declared| ImageChange {
            from: declared.to_string(),
            to: event.image.clone(),
        });
    Ok(change)
}

// === impl ImageIndex ===

impl ImageIndex {
    pub fn shared(updates: mpsc::Sender<ImageEvent>, metrics: Metrics) -> SharedImageIndex {
        Arc::new(RwLock::new(Self {
            images: HashMap::new(),
            updates,
            metrics,
        }))
    }
}

impl kubert::index::IndexNamespacedResource<Deployment> for ImageIndex {
    fn apply(&mut self, deployment: Deployment) {
        let namespace = deployment.namespace().unwrap_or_default();
        if !is_application_namespace(&namespace) {
            return;
        }
        let name = deployment.name_unchecked();

        let owner = match MicroserviceDeployment::from_deployment(&deployment) {
            Some(owner) => owner,
            None => {
                warn!(%namespace, %name, "Deployment is missing microservice metadata; skipping");
                return;
            }
        };
        let image = match deployment
            .spec
            .as_ref()
            .and_then(|spec| spec.template.spec.as_ref())
            .and_then(head_image)
        {
            Some(image) => image.to_string(),
            None => {
                debug!(%namespace, %name, "Deployment has no head container");
                return;
            }
        };

        let key = (namespace, name);
        if self.images.get(&key) == Some(&image) {
            return;
        }
        let event = ImageEvent {
            deployment: owner,
            image: image.clone(),
        };
        if enqueue(IMAGE_CONTROLLER, &self.updates, &self.metrics, event) {
            self.images.insert(key, image);
        }
    }

    fn delete(&mut self, namespace: String, name: String) {
        self.images.remove(&(namespace, name));
    }
}

// === impl MicroserviceDeployment ===

impl MicroserviceDeployment {
    fn from_deployment(deployment: &Deployment) -> Option<Self> {
        let annotations = deployment.annotations();
        Some(Self {
            namespace: deployment.namespace()?,
            name: deployment.name_unchecked(),
            tenant_id: annotations.get(labels::TENANT_ID)?.clone(),
            application_id: annotations.get(labels::APPLICATION_ID)?.clone(),
            microservice_id: annotations.get(labels::MICROSERVICE_ID)?.clone(),
            environment: deployment.labels().get(labels::ENVIRONMENT)?.clone(),
        })
    }
}

// === impl ImageController ===

impl<S: Store + ?Sized> ImageController<S> {
    pub fn new(store: Arc<S>, updates: mpsc::Receiver<ImageEvent>, metrics: Metrics) -> Self {
        Self {
            store,
            updates,
            metrics,
        }
    }

    /// Handles events until every sender is dropped.
    pub async fn run(mut self) {
        while let Some(event) = self.updates.recv().await {
            self.process(&event).await;
        }
        debug!("Image updates closed");
    }

    pub(crate) async fn process(&self, event: &ImageEvent) -> Option<ImageChange> {
        self.metrics.events.inc();
        let MicroserviceDeployment {
            namespace, name, ..
        } = &event.deployment;

        match reconcile_image(&*self.store, event).await {
            Ok(Some(change)) => {
                self.metrics.image_drift.inc();
                warn!(%namespace, %name, from = %change.from, to = %change.to, "Head image differs from the stored microservice");
                Some(change)
            }
            Ok(None) => {
                debug!(%namespace, %name, image = %event.image, "Head image matches");
                None
            }
            Err(error) if error.is_not_found() => {
                debug!(%namespace, %name, %error, "Microservice not in the store; skipping");
                None
            }
            Err(error) => {
                self.metrics.errors.inc();
                error!(%namespace, %name, %error, "Failed to compare head image");
                None
            }
        }
    }
}
