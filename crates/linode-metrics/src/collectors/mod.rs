pub mod account;
pub mod exporter;
pub mod instance;
pub mod nodebalancer;
pub mod ticket;
pub mod transfer;

use std::sync::Arc;

use crate::types::{LabelValueSet, MetricDescriptor};

pub use account::AccountCollector;
pub use exporter::{BuildInfo, ExporterCollector};
pub use instance::InstanceCollector;
pub use nodebalancer::NodeBalancerCollector;
pub use ticket::TicketCollector;
pub use transfer::TransferCollector;

pub const BYTES_PER_MEBIBYTE: f64 = 1024.0 * 1024.0;
pub const BYTES_PER_GIBIBYTE: f64 = 1024.0 * 1024.0 * 1024.0;

/// Label schema shared by every per-resource metric.
pub const RESOURCE_LABELS: [&str; 3] = ["resource_id", "label", "region"];

fn descriptor(
    namespace: &str,
    subsystem: &str,
    name: &str,
    help: &str,
    variable_labels: &[&str],
) -> Arc<MetricDescriptor> {
    Arc::new(MetricDescriptor::new(
        namespace,
        subsystem,
        name,
        help,
        variable_labels,
    ))
}

fn resource_labels(id: u64, label: &str, region: &str) -> LabelValueSet {
    LabelValueSet::new([id.to_string(), label.to_string(), region.to_string()])
}
