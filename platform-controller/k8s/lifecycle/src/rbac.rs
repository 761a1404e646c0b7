//! The shared `developer` role of an application namespace.
//!
//! Every microservice appends its own rules to the role and removes exactly those rules when it
//! is deleted. Rules are scoped by resource name, so the rules of two microservices never overlap
//! and the role itself is never recreated.

use crate::Error;
use dolittle_platform_k8s_api::{
    cluster::{is_already_exists, is_not_found},
    Cluster, ObjectMeta, PolicyRule, Role,
};
use dolittle_platform_k8s_compose::rbac::DEVELOPER_ROLE;
use tracing::{debug, info};

#[derive(Clone, Debug)]
pub struct DeveloperRole<C> {
    cluster: C,
    namespace: String,
}

// === impl DeveloperRole ===

impl<C: Cluster> DeveloperRole<C> {
    pub fn new(cluster: C, namespace: impl Into<String>) -> Self {
        Self {
            cluster,
            namespace: namespace.into(),
        }
    }

    /// Appends every rule that the role does not already grant.
    ///
    /// The role is created if it does not exist yet.
    pub async fn add_rules(&self, rules: &[PolicyRule]) -> Result<(), Error> {
        match self.cluster.get::<Role>(&self.namespace, DEVELOPER_ROLE).await {
            Ok(role) => return self.append(role, rules).await,
            Err(error) if is_not_found(&error) => {}
            Err(source) => return Err(self.error("get", source)),
        }

        let role = Role {
            metadata: ObjectMeta {
                name: Some(DEVELOPER_ROLE.to_string()),
                namespace: Some(self.namespace.clone()),
                ..Default::default()
            },
            rules: Some(rules.to_vec()),
        };
        match self.cluster.create(&self.namespace, &role).await {
            Ok(_) => {
                debug!(namespace = %self.namespace, rules = rules.len(), "Created developer role");
                Ok(())
            }
            Err(error) if is_already_exists(&error) => {
                // Another writer created the role in the meantime; append to theirs.
                info!(namespace = %self.namespace, "Developer role already exists");
                let role = self
                    .cluster
                    .get::<Role>(&self.namespace, DEVELOPER_ROLE)
                    .await
                    .map_err(|source| self.error("get", source))?;
                self.append(role, rules).await
            }
            Err(source) => Err(self.error("create", source)),
        }
    }

    /// Removes the given rules, leaving every other rule of the role in place.
    pub async fn remove_rules(&self, rules: &[PolicyRule]) -> Result<(), Error> {
        let mut role = match self.cluster.get::<Role>(&self.namespace, DEVELOPER_ROLE).await {
            Ok(role) => role,
            Err(error) if is_not_found(&error) => {
                debug!(namespace = %self.namespace, "No developer role to remove rules from");
                return Ok(());
            }
            Err(source) => return Err(self.error("get", source)),
        };

        let current = role.rules.take().unwrap_or_default();
        let before = current.len();
        let remaining = current
            .into_iter()
            .filter(|rule| !rules.contains(rule))
            .collect::<Vec<_>>();
        if remaining.len() == before {
            debug!(namespace = %self.namespace, "Developer role does not grant the rules");
            return Ok(());
        }
        role.rules = Some(remaining);
        self.replace(&role).await
    }

    async fn append(&self, mut role: Role, rules: &[PolicyRule]) -> Result<(), Error> {
        let current = role.rules.get_or_insert_with(Vec::new);
        let missing = rules
            .iter()
            .filter(|rule| !current.contains(rule))
            .cloned()
            .collect::<Vec<_>>();
        if missing.is_empty() {
            info!(namespace = %self.namespace, "Developer role already grants the rules; skipping");
            return Ok(());
        }
        current.extend(missing);
        self.replace(&role).await
    }

    /// Replaces the role, subject to the resource version it was read at.
    async fn replace(&self, role: &Role) -> Result<(), Error> {
        self.cluster
            .replace(&self.namespace, DEVELOPER_ROLE, role)
            .await
            .map_err(|source| self.error("replace", source))?;
        debug!(namespace = %self.namespace, "Updated developer role");
        Ok(())
    }

    fn error(&self, verb: &'static str, source: kube::Error) -> Error {
        Error::api::<Role>(verb, &self.namespace, DEVELOPER_ROLE, source)
    }
}
