use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family},
    registry::Registry,
};

/// Counters shared by the reconciliation controllers, labeled by controller.
#[derive(Clone, Debug, Default)]
pub struct ControllerMetrics {
    events: Family<ControllerLabels, Counter>,
    errors: Family<ControllerLabels, Counter>,
    store_writes: Family<ControllerLabels, Counter>,
    queue_overflows: Family<ControllerLabels, Counter>,
    image_drift: Counter,
}

/// The counters of a single controller.
#[derive(Clone, Debug, Default)]
pub struct Metrics {
    pub(crate) events: Counter,
    pub(crate) errors: Counter,
    pub(crate) store_writes: Counter,
    pub(crate) queue_overflows: Counter,
    pub(crate) image_drift: Counter,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct ControllerLabels {
    controller: String,
}

// === impl ControllerMetrics ===

impl ControllerMetrics {
    pub fn register(prom: &mut Registry) -> Self {
        let events = Family::default();
        prom.register(
            "reconcile_events",
            "Count of watch events handled by a controller",
            events.clone(),
        );

        let errors = Family::default();
        prom.register(
            "reconcile_errors",
            "Count of watch events a controller failed to handle",
            errors.clone(),
        );

        let store_writes = Family::default();
        prom.register(
            "store_writes",
            "Count of writes a controller made to the declarative store",
            store_writes.clone(),
        );

        let queue_overflows = Family::default();
        prom.register(
            "queue_overflows",
            "Count of watch events dropped because a controller's queue was full",
            queue_overflows.clone(),
        );

        let image_drift = Counter::default();
        prom.register(
            "image_drift",
            "Count of deployments whose head image differs from the stored microservice",
            image_drift.clone(),
        );

        Self {
            events,
            errors,
            store_writes,
            queue_overflows,
            image_drift,
        }
    }

    pub fn controller(&self, controller: &str) -> Metrics {
        let labels = ControllerLabels {
            controller: controller.to_string(),
        };
        Metrics {
            events: self.events.get_or_create(&labels).clone(),
            errors: self.errors.get_or_create(&labels).clone(),
            store_writes: self.store_writes.get_or_create(&labels).clone(),
            queue_overflows: self.queue_overflows.get_or_create(&labels).clone(),
            image_drift: self.image_drift.clone(),
        }
    }
}

// === impl Metrics ===

impl Metrics {
    pub fn events(&self) -> u64 {
        self.events.get()
    }

    pub fn errors(&self) -> u64 {
        self.errors.get()
    }

    pub fn store_writes(&self) -> u64 {
        self.store_writes.get()
    }

    pub fn queue_overflows(&self) -> u64 {
        self.queue_overflows.get()
    }

    pub fn image_drift(&self) -> u64 {
        self.image_drift.get()
    }
}
