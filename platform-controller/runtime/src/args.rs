use crate::{
    api::Api,
    compose::PlatformEnvironment,
    dispatch::Dispatcher,
    k8s::{labels, ConfigMap, Deployment, KubeCluster},
    reconcile::{
        ConnectorController, ConnectorIndex, ControllerMetrics, ImageController, ImageIndex,
        CONNECTOR_CONTROLLER, IMAGE_CONTROLLER,
    },
    store::FsStore,
};
use anyhow::{bail, Result};
use clap::Parser;
use kube::runtime::watcher;
use prometheus_client::registry::Registry;
use std::{path::PathBuf, sync::Arc};
use tokio::sync::mpsc;
use tracing::{info, info_span, Instrument};

#[derive(Debug, Parser)]
#[clap(
    name = "platform-controller",
    about = "Manages the microservices of Dolittle platform applications"
)]
pub struct Args {
    #[clap(
        long,
        default_value = "dolittle=info,warn",
        env = "DOLITTLE_PLATFORM_CONTROLLER_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    client: kubert::ClientArgs,

    #[clap(flatten)]
    server: kubert::ServerArgs,

    #[clap(flatten)]
    admin: kubert::AdminArgs,

    /// Disables the microservice API server.
    #[clap(long)]
    api_disabled: bool,

    /// Selects the certificate issuer of customer tenant ingresses (`dev` or `prod`).
    #[clap(long, default_value = "dev")]
    platform_environment: PlatformEnvironment,

    /// The root directory of the declarative store.
    #[clap(long, default_value = "/var/lib/dolittle/platform")]
    store_dir: PathBuf,

    /// Config maps whose names end with this suffix mark an environment as connected.
    #[clap(long, default_value = "-kafka-files")]
    connector_marker_suffix: String,

    #[clap(long, default_value = "m3Connector")]
    connector_name: String,

    /// The number of watch events each controller buffers.
    #[clap(long, default_value = "1024")]
    controller_queue_size: usize,
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            admin,
            client,
            log_level,
            log_format,
            server,
            api_disabled,
            platform_environment,
            store_dir,
            connector_marker_suffix,
            connector_name,
            controller_queue_size,
        } = self;

        let server = if api_disabled { None } else { Some(server) };

        let mut prom = <Registry>::default();
        let controller_metrics = ControllerMetrics::register(&mut prom);
        let rt_metrics = kubert::RuntimeMetrics::register(prom.sub_registry_with_prefix("kube"));

        let mut runtime = kubert::Runtime::builder()
            .with_log(log_level, log_format)
            .with_metrics(rt_metrics)
            .with_admin(admin.into_builder().with_prometheus(prom))
            .with_client(client)
            .with_optional_server(server)
            .build()
            .await?;

        let store = Arc::new(FsStore::new(store_dir));
        info!(
            platform = ?platform_environment,
            connector = %connector_name,
            "Starting platform controller"
        );

        // Connector marker config maps feed the connector controller.
        let (connector_tx, connector_rx) = mpsc::channel(controller_queue_size);
        let connector_metrics = controller_metrics.controller(CONNECTOR_CONTROLLER);
        let connector_index = ConnectorIndex::shared(
            connector_marker_suffix,
            connector_tx,
            connector_metrics.clone(),
        );
        let config_maps = runtime.watch_all::<ConfigMap>(watcher::Config::default());
        tokio::spawn(
            kubert::index::namespaced(connector_index, config_maps)
                .instrument(info_span!("configmaps")),
        );
        tokio::spawn(
            ConnectorController::new(
                store.clone(),
                connector_name,
                connector_rx,
                connector_metrics,
            )
            .run()
            .instrument(info_span!("connector_controller")),
        );

        // Microservice deployments feed the image controller.
        let (image_tx, image_rx) = mpsc::channel(controller_queue_size);
        let image_metrics = controller_metrics.controller(IMAGE_CONTROLLER);
        let image_index = ImageIndex::shared(image_tx, image_metrics.clone());
        let deployments = runtime
            .watch_all::<Deployment>(watcher::Config::default().labels(labels::MICROSERVICE));
        tokio::spawn(
            kubert::index::namespaced(image_index, deployments)
                .instrument(info_span!("deployments")),
        );
        tokio::spawn(
            ImageController::new(store.clone(), image_rx, image_metrics)
                .run()
                .instrument(info_span!("image_controller")),
        );

        let dispatcher = Dispatcher::new(
            store,
            KubeCluster::new(runtime.client()),
            platform_environment,
        );
        let api = Api::new(dispatcher);
        let runtime = runtime.spawn_server(move || api.clone());

        // Block the main thread on the shutdown signal. Once it fires, wait for the background tasks to
        // complete before exiting.
        if runtime.run().await.is_err() {
            bail!("Aborted");
        }

        Ok(())
    }
}
