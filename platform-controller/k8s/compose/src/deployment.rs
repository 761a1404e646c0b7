use crate::{
    config::{PLATFORM_FILE, RUNTIME_FILES},
    metadata, Workload, RUNTIME_METRICS_PORT, RUNTIME_PORT, RUNTIME_PRIVATE_PORT,
};
use dolittle_platform_core::Microservice;
use dolittle_platform_k8s_api::{
    api::core::v1::{
        ConfigMapEnvSource, ConfigMapVolumeSource, Container, ContainerPort, EnvFromSource,
        PodSpec, PodTemplateSpec, SecretEnvSource, Volume, VolumeMount,
    },
    labels,
    naming::ConfigNames,
    Deployment, DeploymentSpec, LabelSelector, ObjectMeta,
};

pub(crate) const HEAD_CONTAINER: &str = "head";
pub(crate) const RUNTIME_CONTAINER: &str = "runtime";

const DOLITTLE_CONFIG_VOLUME: &str = "dolittle-config";
const CONFIG_FILES_VOLUME: &str = "config-files";

/// Where the runtime reads its configuration files from.
const DOLITTLE_DIR: &str = "/app/.dolittle";
const APPSETTINGS_PATH: &str = "/app/appsettings.json";
const CONFIG_FILES_DIR: &str = "/app/data";

pub(crate) fn deployment(
    microservice: &Microservice,
    name: &str,
    names: &ConfigNames,
    workload: &Workload<'_>,
) -> Deployment {
    let labels = labels::microservice_labels(microservice);
    let annotations = labels::microservice_annotations(microservice);

    Deployment {
        metadata: metadata(microservice, name),
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    annotations: Some(annotations),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![head(names, workload), runtime(&workload.runtime_image)],
                    volumes: Some(volumes(names)),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn head(names: &ConfigNames, workload: &Workload<'_>) -> Container {
    let head = &workload.head;
    Container {
        name: HEAD_CONTAINER.to_string(),
        image: Some(head.image.clone()),
        command: (!head.command.is_empty()).then(|| head.command.clone()),
        args: (!head.args.is_empty()).then(|| head.args.clone()),
        ports: Some(vec![port("http", head.port)]),
        env_from: Some(vec![
            EnvFromSource {
                config_map_ref: Some(ConfigMapEnvSource {
                    name: names.env_variables.clone().into(),
                    ..Default::default()
                }),
                ..Default::default()
            },
            EnvFromSource {
                secret_ref: Some(SecretEnvSource {
                    name: names.secret_env_variables.clone().into(),
                    ..Default::default()
                }),
                ..Default::default()
            },
        ]),
        volume_mounts: Some(vec![
            mount(
                DOLITTLE_CONFIG_VOLUME,
                format!("{}/{}", DOLITTLE_DIR, PLATFORM_FILE),
                Some(PLATFORM_FILE),
            ),
            mount(CONFIG_FILES_VOLUME, CONFIG_FILES_DIR.to_string(), None),
        ]),
        ..Default::default()
    }
}

fn runtime(image: &str) -> Container {
    let mut mounts: Vec<VolumeMount> = RUNTIME_FILES
        .iter()
        .map(|&file| {
            mount(
                DOLITTLE_CONFIG_VOLUME,
                format!("{}/{}", DOLITTLE_DIR, file),
                Some(file),
            )
        })
        .collect();
    mounts.push(mount(
        DOLITTLE_CONFIG_VOLUME,
        APPSETTINGS_PATH.to_string(),
        Some("appsettings.json"),
    ));

    Container {
        name: RUNTIME_CONTAINER.to_string(),
        image: Some(image.to_string()),
        ports: Some(vec![
            port("runtime", RUNTIME_PORT),
            port("runtime-private", RUNTIME_PRIVATE_PORT),
            port("runtime-metrics", RUNTIME_METRICS_PORT),
        ]),
        volume_mounts: Some(mounts),
        ..Default::default()
    }
}

fn volumes(names: &ConfigNames) -> Vec<Volume> {
    [
        (DOLITTLE_CONFIG_VOLUME, &names.dolittle),
        (CONFIG_FILES_VOLUME, &names.config_files),
    ]
    .into_iter()
    .map(|(volume, config_map)| Volume {
        name: volume.to_string(),
        config_map: Some(ConfigMapVolumeSource {
            name: config_map.clone().into(),
            ..Default::default()
        }),
        ..Default::default()
    })
    .collect()
}

fn port(name: &str, port: i32) -> ContainerPort {
    ContainerPort {
        name: Some(name.to_string()),
        container_port: port,
        ..Default::default()
    }
}

fn mount(volume: &str, path: String, sub_path: Option<&str>) -> VolumeMount {
    VolumeMount {
        name: volume.to_string(),
        mount_path: path,
        sub_path: sub_path.map(ToString::to_string),
        ..Default::default()
    }
}

/// Returns the image of the `head` container of a pod spec.
pub fn head_image(spec: &PodSpec) -> Option<&str> {
    spec.containers
        .iter()
        .find(|c| c.name == HEAD_CONTAINER)
        .and_then(|c| c.image.as_deref())
}
