use crate::{DeveloperRole, Error};
use dolittle_platform_k8s_api::{
    cluster::is_not_found, labels, naming, Cluster, ConfigMap, Deployment, Ingress,
    NetworkPolicy, Object, ResourceExt, Secret, Selector, Service,
};
use dolittle_platform_k8s_compose::rbac;
use tracing::{debug, info};

/// Tears down every object of a microservice.
///
/// The objects are discovered through the labels of the live deployment rather than recomposed,
/// so that objects created by an older composition are removed as well. The deployment is
/// stopped first and deleted last.
pub(crate) async fn delete<C: Cluster>(
    cluster: &C,
    application_id: &str,
    environment: &str,
    microservice_id: &str,
) -> Result<(), Error> {
    let namespace = naming::namespace(application_id);
    let deployment = find_deployment(cluster, &namespace, environment, microservice_id).await?;
    let name = deployment.name_any();

    let selector = Selector::for_microservice(deployment.labels()).ok_or_else(|| {
        Error::IncompleteLabels {
            namespace: namespace.clone(),
            name: name.clone(),
        }
    })?;
    debug!(%namespace, deployment = %name, %selector, "Deleting microservice");

    cluster
        .scale::<Deployment>(&namespace, &name, 0)
        .await
        .map_err(|source| Error::api::<Deployment>("scale", &namespace, &name, source))?;
    info!(%namespace, deployment = %name, "Stopped");

    delete_selected::<C, ConfigMap>(cluster, &namespace, &selector).await?;
    delete_selected::<C, Secret>(cluster, &namespace, &selector).await?;
    delete_selected::<C, Ingress>(cluster, &namespace, &selector).await?;
    delete_selected::<C, NetworkPolicy>(cluster, &namespace, &selector).await?;
    delete_selected::<C, Service>(cluster, &namespace, &selector).await?;

    let identity = selector.match_labels();
    let rules = rbac::policy_rules(
        &identity[labels::ENVIRONMENT],
        &identity[labels::MICROSERVICE],
    );
    DeveloperRole::new(cluster.clone(), namespace.as_str())
        .remove_rules(&rules)
        .await?;

    delete_object::<C, Deployment>(cluster, &namespace, &name).await
}

/// Finds the deployment annotated with the microservice's ID.
async fn find_deployment<C: Cluster>(
    cluster: &C,
    namespace: &str,
    environment: &str,
    microservice_id: &str,
) -> Result<Deployment, Error> {
    let deployments = cluster
        .list::<Deployment>(namespace, &Selector::default())
        .await
        .map_err(|source| Error::api::<Deployment>("list", namespace, "", source))?;

    deployments
        .into_iter()
        .find(|deployment| {
            let annotated = deployment
                .annotations()
                .get(labels::MICROSERVICE_ID)
                .map(|id| id == microservice_id)
                .unwrap_or(false);
            let in_environment = deployment
                .labels()
                .get(labels::ENVIRONMENT)
                .map(|env| env.eq_ignore_ascii_case(environment))
                .unwrap_or(true);
            annotated && in_environment
        })
        .ok_or_else(|| Error::DeploymentNotFound {
            namespace: namespace.to_string(),
            microservice_id: microservice_id.to_string(),
        })
}

async fn delete_selected<C: Cluster, K: Object>(
    cluster: &C,
    namespace: &str,
    selector: &Selector,
) -> Result<(), Error> {
    let objects = cluster
        .list::<K>(namespace, selector)
        .await
        .map_err(|source| Error::api::<K>("list", namespace, "", source))?;
    for object in objects {
        delete_object::<C, K>(cluster, namespace, &object.name_any()).await?;
    }
    Ok(())
}

async fn delete_object<C: Cluster, K: Object>(
    cluster: &C,
    namespace: &str,
    name: &str,
) -> Result<(), Error> {
    match cluster.delete::<K>(namespace, name).await {
        Ok(()) => {
            debug!(kind = %K::kind(&()), %namespace, %name, "Deleted");
            Ok(())
        }
        Err(error) if is_not_found(&error) => {
            debug!(kind = %K::kind(&()), %namespace, %name, "Already deleted");
            Ok(())
        }
        Err(source) => Err(Error::api::<K>("delete", namespace, name, source)),
    }
}
