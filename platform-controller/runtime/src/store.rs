use crate::core::{Application, MicroserviceRequest, Store, StoreError};
use std::{
    io,
    path::{Path, PathBuf},
};
use tracing::debug;

const APPLICATION_FILE: &str = "application.json";
const MICROSERVICE_PREFIX: &str = "ms_";
const JSON_EXTENSION: &str = ".json";

/// A store of JSON documents in a directory tree.
///
/// ```text
/// {root}/{tenantID}/{applicationID}/application.json
/// {root}/{tenantID}/{applicationID}/{environment}/ms_{microserviceID}.json
/// ```
#[derive(Clone, Debug)]
pub struct FsStore {
    root: PathBuf,
}

// === impl FsStore ===

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn application_dir(&self, tenant_id: &str, application_id: &str) -> io::Result<PathBuf> {
        Ok(self
            .root
            .join(component(tenant_id)?)
            .join(component(application_id)?))
    }

    fn microservice_path(
        &self,
        tenant_id: &str,
        application_id: &str,
        environment: &str,
        microservice_id: &str,
    ) -> io::Result<PathBuf> {
        let file = format!(
            "{}{}{}",
            MICROSERVICE_PREFIX,
            component(microservice_id)?,
            JSON_EXTENSION
        );
        Ok(self
            .application_dir(tenant_id, application_id)?
            .join(component(environment)?)
            .join(file))
    }

    async fn write(path: &Path, json: Vec<u8>) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, json).await?;
        debug!(path = %path.display(), "Wrote document");
        Ok(())
    }
}

#[async_trait::async_trait]
impl Store for FsStore {
    async fn get_application(
        &self,
        tenant_id: &str,
        application_id: &str,
    ) -> Result<Application, StoreError> {
        let path = self
            .application_dir(tenant_id, application_id)?
            .join(APPLICATION_FILE);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::ApplicationNotFound {
                    tenant_id: tenant_id.to_string(),
                    application_id: application_id.to_string(),
                })
            }
            Err(error) => return Err(error.into()),
        };
        let application = serde_json::from_slice::<Application>(&bytes)?;

        // The directory layout, not the document, decides ownership.
        if application.tenant.id != tenant_id || application.id != application_id {
            return Err(StoreError::ApplicationNotFound {
                tenant_id: tenant_id.to_string(),
                application_id: application_id.to_string(),
            });
        }
        Ok(application)
    }

    async fn save_application(&self, application: &Application) -> Result<(), StoreError> {
        let path = self
            .application_dir(&application.tenant.id, &application.id)?
            .join(APPLICATION_FILE);
        Self::write(&path, serde_json::to_vec_pretty(application)?).await
    }

    async fn get_microservice(
        &self,
        tenant_id: &str,
        application_id: &str,
        environment: &str,
        microservice_id: &str,
    ) -> Result<MicroserviceRequest, StoreError> {
        let path =
            self.microservice_path(tenant_id, application_id, environment, microservice_id)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::MicroserviceNotFound {
                    environment: environment.to_string(),
                    microservice_id: microservice_id.to_string(),
                })
            }
            Err(error) => Err(error.into()),
        }
    }

    async fn get_microservices(
        &self,
        tenant_id: &str,
        application_id: &str,
    ) -> Result<Vec<MicroserviceRequest>, StoreError> {
        let dir = self.application_dir(tenant_id, application_id)?;
        let mut environments = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(error.into()),
        };

        let mut microservices = Vec::new();
        while let Some(environment) = environments.next_entry().await? {
            if !environment.file_type().await?.is_dir() {
                continue;
            }
            let mut files = tokio::fs::read_dir(environment.path()).await?;
            while let Some(file) = files.next_entry().await? {
                let name = file.file_name();
                let is_microservice = name.to_str().is_some_and(|name| {
                    name.starts_with(MICROSERVICE_PREFIX) && name.ends_with(JSON_EXTENSION)
                });
                if !is_microservice {
                    continue;
                }
                let bytes = tokio::fs::read(file.path()).await?;
                microservices.push(serde_json::from_slice(&bytes)?);
            }
        }
        Ok(microservices)
    }

    async fn save_microservice(
        &self,
        tenant_id: &str,
        application_id: &str,
        request: &MicroserviceRequest,
    ) -> Result<(), StoreError> {
        let path = self.microservice_path(
            tenant_id,
            application_id,
            request.environment(),
            request.microservice_id(),
        )?;
        Self::write(&path, serde_json::to_vec_pretty(request)?).await
    }

    async fn delete_microservice(
        &self,
        tenant_id: &str,
        application_id: &str,
        environment: &str,
        microservice_id: &str,
    ) -> Result<(), StoreError> {
        let path =
            self.microservice_path(tenant_id, application_id, environment, microservice_id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Removed document");
                Ok(())
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::MicroserviceNotFound {
                    environment: environment.to_string(),
                    microservice_id: microservice_id.to_string(),
                })
            }
            Err(error) => Err(error.into()),
        }
    }
}

/// Validates that an ID names a single path component.
fn component(id: &str) -> io::Result<&str> {
    if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\']) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid store key {:?}", id),
        ));
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Environment, Tenant};
    use pretty_assertions::assert_eq;

    const TENANT_ID: &str = "4acf7a6e-6b1c-4a0d-9c8f-1f0b0e6e7a3d";
    const APPLICATION_ID: &str = "cc142a0d-deac-4974-ada9-de6e21337dca";

    fn application() -> Application {
        Application {
            id: APPLICATION_ID.to_string(),
            name: "AlejandroRiley".to_string(),
            tenant: Tenant {
                id: TENANT_ID.to_string(),
                name: "JeanetteJohnston".to_string(),
            },
            environments: vec![Environment {
                name: "Dev".to_string(),
                ..Default::default()
            }],
        }
    }

    fn microservice(id: &str, environment: &str) -> MicroserviceRequest {
        serde_json::from_value(serde_json::json!({
            "dolittle": {
                "tenantId": TENANT_ID,
                "applicationId": APPLICATION_ID,
                "microserviceId": id,
            },
            "name": "Orders",
            "kind": "simple",
            "environment": environment,
            "extra": {
                "headImage": "dolittle/spinner:0.0.0",
                "runtimeImage": "dolittle/runtime:5.6.0",
            },
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn applications_round_trip_through_the_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());

        let err = store
            .get_application(TENANT_ID, APPLICATION_ID)
            .await
            .expect_err("nothing stored yet");
        assert!(err.is_not_found());

        store.save_application(&application()).await.unwrap();
        assert!(dir
            .path()
            .join(TENANT_ID)
            .join(APPLICATION_ID)
            .join(APPLICATION_FILE)
            .is_file());
        assert_eq!(
            store
                .get_application(TENANT_ID, APPLICATION_ID)
                .await
                .unwrap(),
            application()
        );
    }

    #[tokio::test]
    async fn microservices_are_listed_across_environments() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        store.save_application(&application()).await.unwrap();

        assert!(store
            .get_microservices(TENANT_ID, APPLICATION_ID)
            .await
            .unwrap()
            .is_empty());

        let dev = microservice("ms-dev", "Dev");
        let prod = microservice("ms-prod", "Prod");
        store
            .save_microservice(TENANT_ID, APPLICATION_ID, &dev)
            .await
            .unwrap();
        store
            .save_microservice(TENANT_ID, APPLICATION_ID, &prod)
            .await
            .unwrap();
        assert!(dir
            .path()
            .join(TENANT_ID)
            .join(APPLICATION_ID)
            .join("Dev")
            .join("ms_ms-dev.json")
            .is_file());

        let mut ids = store
            .get_microservices(TENANT_ID, APPLICATION_ID)
            .await
            .unwrap()
            .iter()
            .map(|ms| ms.microservice_id().to_string())
            .collect::<Vec<_>>();
        ids.sort();
        assert_eq!(ids, vec!["ms-dev".to_string(), "ms-prod".to_string()]);

        assert_eq!(
            store
                .get_microservice(TENANT_ID, APPLICATION_ID, "Dev", "ms-dev")
                .await
                .unwrap(),
            dev
        );
    }

    #[tokio::test]
    async fn deleted_microservices_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        store
            .save_microservice(TENANT_ID, APPLICATION_ID, &microservice("ms-dev", "Dev"))
            .await
            .unwrap();

        store
            .delete_microservice(TENANT_ID, APPLICATION_ID, "Dev", "ms-dev")
            .await
            .unwrap();
        let err = store
            .get_microservice(TENANT_ID, APPLICATION_ID, "Dev", "ms-dev")
            .await
            .expect_err("document was deleted");
        assert!(err.is_not_found());
        let err = store
            .delete_microservice(TENANT_ID, APPLICATION_ID, "Dev", "ms-dev")
            .await
            .expect_err("document was deleted");
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn rejects_keys_that_escape_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());

        for id in ["..", "a/b", "", "a\\b"] {
            let err = store
                .get_application(TENANT_ID, id)
                .await
                .expect_err("key must be rejected");
            assert!(
                matches!(&err, StoreError::Io(e) if e.kind() == io::ErrorKind::InvalidInput),
                "{:?}",
                err
            );
        }
    }
}
