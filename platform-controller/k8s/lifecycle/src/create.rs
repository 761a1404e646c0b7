use crate::{DeveloperRole, Error};
use dolittle_platform_k8s_api::{cluster::is_already_exists, Cluster, Object, ResourceExt};
use dolittle_platform_k8s_compose::MicroserviceResources;
use tracing::{debug, info};

/// Creates every object of a microservice, in dependency order.
///
/// Objects that already exist are skipped, so a failed create may be retried as a whole. Any
/// other failure aborts the sequence and leaves the objects created so far in place.
pub(crate) async fn create<C: Cluster>(
    cluster: &C,
    resources: &MicroserviceResources,
) -> Result<(), Error> {
    let namespace = resources.namespace.as_str();

    for config_map in resources.config_maps() {
        create_object(cluster, namespace, config_map).await?;
    }
    create_object(cluster, namespace, &resources.secret_env_variables).await?;
    for ingress in resources.ingresses.iter() {
        create_object(cluster, namespace, ingress).await?;
    }
    if let Some(network_policy) = resources.network_policy.as_ref() {
        create_object(cluster, namespace, network_policy).await?;
    }
    create_object(cluster, namespace, &resources.service).await?;
    create_object(cluster, namespace, &resources.deployment).await?;

    DeveloperRole::new(cluster.clone(), namespace)
        .add_rules(&resources.policy_rules)
        .await
}

async fn create_object<C: Cluster, K: Object>(
    cluster: &C,
    namespace: &str,
    object: &K,
) -> Result<(), Error> {
    let name = object.name_any();
    match cluster.create(namespace, object).await {
        Ok(_) => {
            debug!(kind = %K::kind(&()), %namespace, %name, "Created");
            Ok(())
        }
        Err(error) if is_already_exists(&error) => {
            info!(kind = %K::kind(&()), %namespace, %name, "Already exists; skipping");
            Ok(())
        }
        Err(source) => Err(Error::api::<K>("create", namespace, &name, source)),
    }
}
