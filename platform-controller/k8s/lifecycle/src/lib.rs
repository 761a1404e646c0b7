//! Microservice lifecycle management
//!
//! A [`Manager`] applies the objects composed for a microservice to the cluster and removes them
//! again. There is one manager per microservice kind; they differ only in how the objects are
//! composed; creation and deletion are shared.
//!
//! Neither operation is transactional. A failed create or delete leaves behind whatever was
//! already applied, and both operations are safe to retry.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod create;
mod delete;
mod error;
mod rbac;


pub use self::{error::Error, rbac::DeveloperRole};
use dolittle_platform_core::{
    request::{
        BusinessMomentsAdaptorExtra, PurchaseOrderApiExtra, RawDataLogIngestorExtra, SimpleExtra,
    },
    CustomerTenantInfo, Kind, Microservice,
};
use dolittle_platform_k8s_api::Cluster;
use dolittle_platform_k8s_compose::{kinds, MicroserviceResources, PlatformEnvironment};
use std::marker::PhantomData;
use tracing::info;

/// Creates and deletes the objects of one kind of microservice.
#[async_trait::async_trait]
pub trait Lifecycle: Send + Sync {
    /// The kind-specific configuration of a microservice.
    type Extra: Send + Sync;

    async fn create(
        &self,
        namespace: &str,
        microservice: &Microservice,
        customer_tenants: &[CustomerTenantInfo],
        extra: &Self::Extra,
    ) -> Result<(), Error>;

    async fn delete(
        &self,
        application_id: &str,
        environment: &str,
        microservice_id: &str,
    ) -> Result<(), Error>;
}

/// Composes the objects of one kind of microservice.
pub trait Composer: Send + Sync + 'static {
    type Extra: Send + Sync;

    const KIND: Kind;

    fn compose(
        microservice: &Microservice,
        extra: &Self::Extra,
        customer_tenants: &[CustomerTenantInfo],
        platform: PlatformEnvironment,
    ) -> MicroserviceResources;
}

#[derive(Debug)]
pub struct Manager<C, K> {
    cluster: C,
    platform: PlatformEnvironment,
    _kind: PhantomData<fn() -> K>,
}

pub type SimpleManager<C> = Manager<C, Simple>;
pub type BusinessMomentsAdaptorManager<C> = Manager<C, BusinessMomentsAdaptor>;
pub type RawDataLogIngestorManager<C> = Manager<C, RawDataLogIngestor>;
pub type PurchaseOrderApiManager<C> = Manager<C, PurchaseOrderApi>;

#[derive(Copy, Clone, Debug)]
pub struct Simple(());

#[derive(Copy, Clone, Debug)]
pub struct BusinessMomentsAdaptor(());

#[derive(Copy, Clone, Debug)]
pub struct RawDataLogIngestor(());

#[derive(Copy, Clone, Debug)]
pub struct PurchaseOrderApi(());

// === impl Manager ===

impl<C: Cluster, K: Composer> Manager<C, K> {
    pub fn new(cluster: C, platform: PlatformEnvironment) -> Self {
        Self {
            cluster,
            platform,
            _kind: PhantomData,
        }
    }
}

impl<C: Clone, K> Clone for Manager<C, K> {
    fn clone(&self) -> Self {
        Self {
            cluster: self.cluster.clone(),
            platform: self.platform,
            _kind: PhantomData,
        }
    }
}

#[async_trait::async_trait]
impl<C: Cluster, K: Composer> Lifecycle for Manager<C, K> {
    type Extra = K::Extra;

    async fn create(
        &self,
        namespace: &str,
        microservice: &Microservice,
        customer_tenants: &[CustomerTenantInfo],
        extra: &Self::Extra,
    ) -> Result<(), Error> {
        let resources = K::compose(microservice, extra, customer_tenants, self.platform);
        if resources.namespace != namespace {
            return Err(Error::NamespaceMismatch {
                expected: resources.namespace,
                actual: namespace.to_string(),
            });
        }

        create::create(&self.cluster, &resources).await?;
        info!(
            kind = %K::KIND,
            %namespace,
            microservice = %microservice.name,
            id = %microservice.id,
            "Created microservice"
        );
        Ok(())
    }

    async fn delete(
        &self,
        application_id: &str,
        environment: &str,
        microservice_id: &str,
    ) -> Result<(), Error> {
        delete::delete(&self.cluster, application_id, environment, microservice_id).await?;
        info!(
            kind = %K::KIND,
            %application_id,
            %environment,
            %microservice_id,
            "Deleted microservice"
        );
        Ok(())
    }
}

// === impl Simple ===

impl Composer for Simple {
    type Extra = SimpleExtra;

    const KIND: Kind = Kind::Simple;

    fn compose(
        microservice: &Microservice,
        extra: &SimpleExtra,
        customer_tenants: &[CustomerTenantInfo],
        platform: PlatformEnvironment,
    ) -> MicroserviceResources {
        kinds::simple::resources(microservice, extra, customer_tenants, platform)
    }
}

// === impl BusinessMomentsAdaptor ===

impl Composer for BusinessMomentsAdaptor {
    type Extra = BusinessMomentsAdaptorExtra;

    const KIND: Kind = Kind::BusinessMomentsAdaptor;

    fn compose(
        microservice: &Microservice,
        extra: &BusinessMomentsAdaptorExtra,
        customer_tenants: &[CustomerTenantInfo],
        platform: PlatformEnvironment,
    ) -> MicroserviceResources {
        kinds::business_moments::resources(microservice, extra, customer_tenants, platform)
    }
}

// === impl RawDataLogIngestor ===

impl Composer for RawDataLogIngestor {
    type Extra = RawDataLogIngestorExtra;

    const KIND: Kind = Kind::RawDataLogIngestor;

    fn compose(
        microservice: &Microservice,
        extra: &RawDataLogIngestorExtra,
        customer_tenants: &[CustomerTenantInfo],
        platform: PlatformEnvironment,
    ) -> MicroserviceResources {
        kinds::raw_data_log::resources(microservice, extra, customer_tenants, platform)
    }
}

// === impl PurchaseOrderApi ===

impl Composer for PurchaseOrderApi {
    type Extra = PurchaseOrderApiExtra;

    const KIND: Kind = Kind::PurchaseOrderApi;

    fn compose(
        microservice: &Microservice,
        extra: &PurchaseOrderApiExtra,
        customer_tenants: &[CustomerTenantInfo],
        platform: PlatformEnvironment,
    ) -> MicroserviceResources {
        kinds::purchase_order::resources(microservice, extra, customer_tenants, platform)
    }
}
