//! Reconciliation controllers
//!
//! Each controller is split in two halves, connected by a bounded queue:
//!
//! - an index, updated synchronously by a `kubert` watch, that filters the watched objects down to
//!   the ones the controller cares about and enqueues an event per relevant change;
//! - a controller task that drains the queue in order and folds each event into the declarative
//!   store.
//!
//! Watches deliver events at least once, so every event is handled idempotently. When a queue is
//! full the event is dropped and counted. Indexes only record a change once its event is queued,
//! so the next apply, delete or relist of the object enqueues it again.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod connector;
mod image;
mod metrics;


pub use self::{
    connector::{
        reconcile_connector, ConnectorController, ConnectorEvent, ConnectorIndex, Owner,
        SharedConnectorIndex,
    },
    image::{
        reconcile_image, ImageChange, ImageController, ImageEvent, ImageIndex,
        MicroserviceDeployment, SharedImageIndex,
    },
    metrics::{ControllerMetrics, Metrics},
};
use tokio::sync::mpsc;

/// Application namespaces are named `application-{applicationID}`.
pub const APPLICATION_NAMESPACE_PREFIX: &str = "application-";

pub const CONNECTOR_CONTROLLER: &str = "connector";
pub const IMAGE_CONTROLLER: &str = "image";

pub(crate) fn is_application_namespace(namespace: &str) -> bool {
    namespace.starts_with(APPLICATION_NAMESPACE_PREFIX)
}

/// Enqueues an event without blocking the watch, counting it if the queue is full.
///
/// Returns false if the event was dropped.
pub(crate) fn enqueue<T: std::fmt::Debug>(
    controller: &'static str,
    updates: &mpsc::Sender<T>,
    metrics: &Metrics,
    event: T,
) -> bool {
    match updates.try_send(event) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(event)) => {
            metrics.queue_overflows.inc();
            tracing::warn!(controller, ?event, "Queue full; dropping event");
            false
        }
        Err(mpsc::error::TrySendError::Closed(event)) => {
            tracing::error!(controller, ?event, "Controller stopped; dropping event");
            false
        }
    }
}
