//! Routes microservice documents to the lifecycle manager of their kind.
//!
//! A document is validated against the caller's identity and the microservices already stored
//! for its application before anything is applied to the cluster. Once the cluster objects are
//! created the accepted document is saved to the store, which is the source of truth for every
//! later read.

use crate::{
    compose::{kinds::raw_data_log, PlatformEnvironment},
    core::{
        request::{
            DolittleIds, IngressPath, DEFAULT_PATH_TYPE, MicroserviceBase, PurchaseOrderApiRequest,
            RawDataLogIngestorExtra, RawDataLogIngestorRequest,
        },
        Application, Environment, Kind, Microservice, MicroserviceRequest, Store, StoreError,
    },
    k8s::{naming, Cluster},
    lifecycle::{
        self, BusinessMomentsAdaptorManager, Lifecycle, PurchaseOrderApiManager,
        RawDataLogIngestorManager, SimpleManager,
    },
};
use hyper::http::StatusCode;
use std::sync::Arc;
use tracing::{debug, info};

/// The name of the raw data log ingestor created for a purchase order API.
pub const DEFAULT_RAW_DATA_LOG_NAME: &str = "RawDataLogIngestor";
pub const DEFAULT_RAW_DATA_LOG_IMAGE: &str = "dolittle/platform-api:latest";
pub const DEFAULT_RAW_DATA_LOG_PATH: &str = "/api/webhooks";
pub const DEFAULT_RAW_DATA_LOG_DESTINATION: &str = "nats";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid request: {0}")]
    Invalid(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("microservice kind {0} is not supported")]
    Unsupported(Kind),

    #[error(transparent)]
    Lifecycle(#[from] lifecycle::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct Dispatcher<C, S: ?Sized> {
    store: Arc<S>,
    simple: SimpleManager<C>,
    business_moments: BusinessMomentsAdaptorManager<C>,
    raw_data_log: RawDataLogIngestorManager<C>,
    purchase_order: PurchaseOrderApiManager<C>,
}

/// Checks a document against the microservices already stored for its application.
pub fn validate(
    request: &MicroserviceRequest,
    existing: &[MicroserviceRequest],
) -> Result<(), Error> {
    let base = request.base();
    if base.name.is_empty() || base.dolittle.microservice_id.is_empty() {
        return Err(Error::Invalid(
            "microservice name and ID must be set".to_string(),
        ));
    }

    match request {
        MicroserviceRequest::Webhook(_) => return Err(Error::Unsupported(Kind::Webhook)),
        MicroserviceRequest::Simple(simple) => {
            if let Some(port) = simple.extra.head_port {
                if !(1..=i32::from(u16::MAX)).contains(&port) {
                    return Err(Error::Invalid(format!("invalid head port {}", port)));
                }
            }
        }
        MicroserviceRequest::RawDataLogIngestor(rdl) => {
            if !raw_data_log::is_valid_destination(&rdl.extra.write_to) {
                return Err(Error::Forbidden(format!(
                    "cannot write to {}; must be stdout or a nats destination",
                    rdl.extra.write_to
                )));
            }
        }
        MicroserviceRequest::BusinessMomentsAdaptor(_)
        | MicroserviceRequest::PurchaseOrderApi(_) => {}
    }

    // Microservice IDs are owned by a single name, kind and environment.
    if let Some(owner) = existing
        .iter()
        .find(|ms| ms.microservice_id() == request.microservice_id())
    {
        if owner.base().name != base.name
            || owner.environment() != request.environment()
            || owner.kind() != request.kind()
        {
            return Err(Error::Conflict(format!(
                "microservice {} already exists as {} in {}",
                request.microservice_id(),
                owner.base().name,
                owner.environment()
            )));
        }
    }

    if let Some(path) = request.public_path() {
        let taken = existing.iter().any(|ms| {
            ms.environment() == request.environment()
                && ms.microservice_id() != request.microservice_id()
                && ms.public_path() == Some(path)
        });
        if taken {
            return Err(Error::Conflict(format!(
                "ingress path {} is already in use in {}",
                path,
                request.environment()
            )));
        }
    }

    Ok(())
}

/// The raw data log ingestor a purchase order API consumes from when its environment has none.
pub fn default_raw_data_log(purchase_order: &PurchaseOrderApiRequest) -> MicroserviceRequest {
    let base = &purchase_order.base;
    MicroserviceRequest::RawDataLogIngestor(RawDataLogIngestorRequest {
        base: MicroserviceBase {
            dolittle: DolittleIds {
                tenant_id: base.dolittle.tenant_id.clone(),
                application_id: base.dolittle.application_id.clone(),
                microservice_id: uuid::Uuid::new_v4().to_string(),
            },
            name: DEFAULT_RAW_DATA_LOG_NAME.to_string(),
            environment: base.environment.clone(),
        },
        extra: RawDataLogIngestorExtra {
            head_image: DEFAULT_RAW_DATA_LOG_IMAGE.to_string(),
            runtime_image: purchase_order.extra.runtime_image.clone(),
            ingress: IngressPath {
                path: DEFAULT_RAW_DATA_LOG_PATH.to_string(),
                path_type: DEFAULT_PATH_TYPE.to_string(),
            },
            write_to: DEFAULT_RAW_DATA_LOG_DESTINATION.to_string(),
            webhooks: purchase_order.extra.webhooks.clone(),
        },
    })
}

fn identity(application: &Application, request: &MicroserviceRequest) -> Microservice {
    let base = request.base();
    Microservice {
        id: base.dolittle.microservice_id.clone(),
        name: base.name.clone(),
        kind: request.kind(),
        tenant: application.tenant.clone(),
        application: application.info(),
        environment: base.environment.clone(),
        resource_id: None,
    }
}

// === impl Error ===

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Invalid(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unsupported(_) => StatusCode::NOT_IMPLEMENTED,
            Self::Lifecycle(lifecycle::Error::DeploymentNotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Store(error) if error.is_not_found() => StatusCode::NOT_FOUND,
            Self::Lifecycle(_) | Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// === impl Dispatcher ===

impl<C: Cluster, S: Store + ?Sized> Dispatcher<C, S> {
    pub fn new(store: Arc<S>, cluster: C, platform: PlatformEnvironment) -> Self {
        Self {
            store,
            simple: SimpleManager::new(cluster.clone(), platform),
            business_moments: BusinessMomentsAdaptorManager::new(cluster.clone(), platform),
            raw_data_log: RawDataLogIngestorManager::new(cluster.clone(), platform),
            purchase_order: PurchaseOrderApiManager::new(cluster, platform),
        }
    }

    /// Creates a microservice from a raw document on behalf of a tenant, returning the accepted
    /// document.
    pub async fn create(
        &self,
        tenant_id: &str,
        body: &[u8],
    ) -> Result<MicroserviceRequest, Error> {
        let request = serde_json::from_slice::<MicroserviceRequest>(body)
            .map_err(|error| Error::Invalid(format!("invalid microservice document: {}", error)))?;

        let ids = &request.base().dolittle;
        if ids.tenant_id != tenant_id {
            return Err(Error::Forbidden(format!(
                "tenant {} cannot create microservices for tenant {}",
                tenant_id, ids.tenant_id
            )));
        }
        let application = self.application(tenant_id, &ids.application_id).await?;
        let environment = application
            .environment(request.environment())
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "environment {} of application {}",
                    request.environment(),
                    application.id
                ))
            })?;

        let existing = self
            .store
            .get_microservices(&application.tenant.id, &application.id)
            .await?;
        validate(&request, &existing)?;

        if let MicroserviceRequest::PurchaseOrderApi(purchase_order) = &request {
            let has_raw_data_log = existing.iter().any(|ms| {
                ms.kind() == Kind::RawDataLogIngestor && ms.environment() == request.environment()
            });
            if !has_raw_data_log {
                let raw_data_log = default_raw_data_log(purchase_order);
                validate(&raw_data_log, &existing)?;
                self.apply(&application, environment, &raw_data_log).await?;
                info!(
                    environment = %request.environment(),
                    id = %raw_data_log.microservice_id(),
                    "Created raw data log ingestor for purchase order API"
                );
            }
        }

        self.apply(&application, environment, &request).await?;
        Ok(request)
    }

    /// Deletes a stored microservice and its cluster objects.
    pub async fn delete(
        &self,
        tenant_id: &str,
        application_id: &str,
        environment: &str,
        microservice_id: &str,
    ) -> Result<(), Error> {
        let application = self.application(tenant_id, application_id).await?;
        let request = match self
            .store
            .get_microservice(tenant_id, &application.id, environment, microservice_id)
            .await
        {
            Ok(request) => request,
            Err(error) if error.is_not_found() => {
                return Err(Error::NotFound(format!(
                    "microservice {} in environment {}",
                    microservice_id, environment
                )))
            }
            Err(error) => return Err(error.into()),
        };

        let deleted = match request.kind() {
            Kind::Simple => {
                self.simple
                    .delete(application_id, environment, microservice_id)
                    .await
            }
            Kind::BusinessMomentsAdaptor => {
                self.business_moments
                    .delete(application_id, environment, microservice_id)
                    .await
            }
            Kind::RawDataLogIngestor => {
                self.raw_data_log
                    .delete(application_id, environment, microservice_id)
                    .await
            }
            Kind::PurchaseOrderApi => {
                self.purchase_order
                    .delete(application_id, environment, microservice_id)
                    .await
            }
            Kind::Webhook => return Err(Error::Unsupported(Kind::Webhook)),
        };
        match deleted {
            Ok(()) => {}
            // The objects are already gone; only the stored document remains.
            Err(lifecycle::Error::DeploymentNotFound { .. }) => {
                info!(%application_id, %environment, %microservice_id, "No deployment to delete");
            }
            Err(error) => return Err(error.into()),
        }

        self.store
            .delete_microservice(tenant_id, application_id, environment, microservice_id)
            .await?;
        Ok(())
    }

    async fn application(&self, tenant_id: &str, application_id: &str) -> Result<Application, Error> {
        match self.store.get_application(tenant_id, application_id).await {
            Ok(application) => Ok(application),
            Err(error) if error.is_not_found() => Err(Error::Forbidden(format!(
                "application {} does not belong to tenant {}",
                application_id, tenant_id
            ))),
            Err(error) => Err(error.into()),
        }
    }

    /// Creates the cluster objects of a validated document and stores it.
    async fn apply(
        &self,
        application: &Application,
        environment: &Environment,
        request: &MicroserviceRequest,
    ) -> Result<(), Error> {
        let microservice = identity(application, request);
        let namespace = naming::namespace(&application.id);
        let tenants = environment.customer_tenants.as_slice();
        debug!(%namespace, kind = %microservice.kind, name = %microservice.name, "Creating microservice");

        match request {
            MicroserviceRequest::Simple(req) => {
                self.simple
                    .create(&namespace, &microservice, tenants, &req.extra)
                    .await?
            }
            MicroserviceRequest::BusinessMomentsAdaptor(req) => {
                self.business_moments
                    .create(&namespace, &microservice, tenants, &req.extra)
                    .await?
            }
            MicroserviceRequest::RawDataLogIngestor(req) => {
                self.raw_data_log
                    .create(&namespace, &microservice, tenants, &req.extra)
                    .await?
            }
            MicroserviceRequest::PurchaseOrderApi(req) => {
                self.purchase_order
                    .create(&namespace, &microservice, tenants, &req.extra)
                    .await?
            }
            MicroserviceRequest::Webhook(_) => return Err(Error::Unsupported(Kind::Webhook)),
        }

        self.store
            .save_microservice(&application.tenant.id, &application.id, request)
            .await?;
        Ok(())
    }
}

impl<C: Clone, S: ?Sized> Clone for Dispatcher<C, S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            simple: self.simple.clone(),
            business_moments: self.business_moments.clone(),
            raw_data_log: self.raw_data_log.clone(),
            purchase_order: self.purchase_order.clone(),
        }
    }
}
