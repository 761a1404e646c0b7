//! The declarative store.
//!
//! Applications (with their environments) and accepted microservice documents are read from and
//! written to the store. The store provides no locking: concurrent read-modify-write cycles on the
//! same record rely on the backing implementation's own write semantics.

use crate::{request::MicroserviceRequest, tenancy::Environment, Application};
use parking_lot::RwLock;
use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicUsize, Ordering},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("application {application_id} not found for tenant {tenant_id}")]
    ApplicationNotFound {
        tenant_id: String,
        application_id: String,
    },

    #[error("microservice {microservice_id} not found in environment {environment}")]
    MicroserviceNotFound {
        environment: String,
        microservice_id: String,
    },

    #[error("environment {0} not found")]
    EnvironmentNotFound(String),

    #[error("store i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid store document: {0}")]
    Json(#[from] serde_json::Error),
}

#[async_trait::async_trait]
pub trait Store: Send + Sync {
    async fn get_application(
        &self,
        tenant_id: &str,
        application_id: &str,
    ) -> Result<Application, StoreError>;

    async fn save_application(&self, application: &Application) -> Result<(), StoreError>;

    async fn get_microservice(
        &self,
        tenant_id: &str,
        application_id: &str,
        environment: &str,
        microservice_id: &str,
    ) -> Result<MicroserviceRequest, StoreError>;

    /// Lists every microservice document of an application, across environments.
    async fn get_microservices(
        &self,
        tenant_id: &str,
        application_id: &str,
    ) -> Result<Vec<MicroserviceRequest>, StoreError>;

    async fn save_microservice(
        &self,
        tenant_id: &str,
        application_id: &str,
        request: &MicroserviceRequest,
    ) -> Result<(), StoreError>;

    async fn delete_microservice(
        &self,
        tenant_id: &str,
        application_id: &str,
        environment: &str,
        microservice_id: &str,
    ) -> Result<(), StoreError>;
}

/// Finds an environment by name.
pub fn get_environment<'e>(environments: &'e [Environment], name: &str) -> Option<&'e Environment> {
    environments.iter().find(|env| env.name == name)
}

// === impl StoreError ===

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ApplicationNotFound { .. }
                | Self::MicroserviceNotFound { .. }
                | Self::EnvironmentNotFound(_)
        )
    }
}

/// A store held in process memory.
///
/// Counts the writes it performs so that callers can observe whether an operation touched the
/// store at all.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    writes: AtomicUsize,
}

type ApplicationKey = (String, String);
type MicroserviceKey = (String, String, String, String);

#[derive(Debug, Default)]
struct MemoryState {
    applications: BTreeMap<ApplicationKey, Application>,
    microservices: BTreeMap<MicroserviceKey, MicroserviceRequest>,
}

// === impl MemoryStore ===

impl MemoryStore {
    pub fn with_application(application: Application) -> Self {
        let store = Self::default();
        store.state.write().applications.insert(
            (application.tenant.id.clone(), application.id.clone()),
            application,
        );
        store
    }

    /// The number of writes performed since the store was created.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Acquire)
    }

    fn wrote(&self) {
        self.writes.fetch_add(1, Ordering::AcqRel);
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn get_application(
        &self,
        tenant_id: &str,
        application_id: &str,
    ) -> Result<Application, StoreError> {
        self.state
            .read()
            .applications
            .get(&(tenant_id.to_string(), application_id.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::ApplicationNotFound {
                tenant_id: tenant_id.to_string(),
                application_id: application_id.to_string(),
            })
    }

    async fn save_application(&self, application: &Application) -> Result<(), StoreError> {
        self.state.write().applications.insert(
            (application.tenant.id.clone(), application.id.clone()),
            application.clone(),
        );
        self.wrote();
        Ok(())
    }

    async fn get_microservice(
        &self,
        tenant_id: &str,
        application_id: &str,
        environment: &str,
        microservice_id: &str,
    ) -> Result<MicroserviceRequest, StoreError> {
        let key = (
            tenant_id.to_string(),
            application_id.to_string(),
            environment.to_string(),
            microservice_id.to_string(),
        );
        self.state
            .read()
            .microservices
            .get(&key)
            .cloned()
            .ok_or_else(|| StoreError::MicroserviceNotFound {
                environment: environment.to_string(),
                microservice_id: microservice_id.to_string(),
            })
    }

    async fn get_microservices(
        &self,
        tenant_id: &str,
        application_id: &str,
    ) -> Result<Vec<MicroserviceRequest>, StoreError> {
        Ok(self
            .state
            .read()
            .microservices
            .iter()
            .filter(|((t, a, _, _), _)| t == tenant_id && a == application_id)
            .map(|(_, req)| req.clone())
            .collect())
    }

    async fn save_microservice(
        &self,
        tenant_id: &str,
        application_id: &str,
        request: &MicroserviceRequest,
    ) -> Result<(), StoreError> {
        let key = (
            tenant_id.to_string(),
            application_id.to_string(),
            request.environment().to_string(),
            request.microservice_id().to_string(),
        );
        self.state.write().microservices.insert(key, request.clone());
        self.wrote();
        Ok(())
    }

    async fn delete_microservice(
        &self,
        tenant_id: &str,
        application_id: &str,
        environment: &str,
        microservice_id: &str,
    ) -> Result<(), StoreError> {
        let key = (
            tenant_id.to_string(),
            application_id.to_string(),
            environment.to_string(),
            microservice_id.to_string(),
        );
        if self.state.write().microservices.remove(&key).is_none() {
            return Err(StoreError::MicroserviceNotFound {
                environment: environment.to_string(),
                microservice_id: microservice_id.to_string(),
            });
        }
        self.wrote();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Tenant;

    fn application() -> Application {
        Application {
            id: "app-1".to_string(),
            name: "AlejandroRiley".to_string(),
            tenant: Tenant {
                id: "tenant-1".to_string(),
                name: "JeanetteJohnston".to_string(),
            },
            environments: vec![Environment {
                name: "Dev".to_string(),
                ..Default::default()
            }],
        }
    }

    #[tokio::test]
    async fn applications_are_scoped_by_tenant() {
        let store = MemoryStore::with_application(application());
        assert!(store.get_application("tenant-1", "app-1").await.is_ok());
        let err = store
            .get_application("tenant-2", "app-1")
            .await
            .expect_err("application must not be visible to other tenants");
        assert!(err.is_not_found());
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn writes_are_counted() {
        let store = MemoryStore::with_application(application());
        let mut app = store.get_application("tenant-1", "app-1").await.unwrap();
        app.environment_mut("Dev")
            .unwrap()
            .set_connection("m3Connector", true);
        store.save_application(&app).await.unwrap();
        assert_eq!(store.writes(), 1);
        let app = store.get_application("tenant-1", "app-1").await.unwrap();
        assert!(app.environment("Dev").unwrap().connection("m3Connector"));
        assert!(get_environment(&app.environments, "Prod").is_none());
    }
}
