pub mod collector;
pub mod collectors;
pub mod handlers;
pub mod registry;
pub mod router;
pub mod types;

#[cfg(test)]
mod testing;

pub use collector::{
    CollectOutcome, Collector, MAX_SCRAPE_TIMEOUT, SampleSink, ScrapeContext,
};
pub use collectors::{
    AccountCollector, BuildInfo, ExporterCollector, InstanceCollector, NodeBalancerCollector,
    TicketCollector, TransferCollector,
};
pub use registry::{CollectorRegistry, render_prometheus};
pub use router::{ExporterState, exporter_router};
pub use types::{LabelValueSet, MetricDescriptor, MetricFamily, Sample, ValueKind};
