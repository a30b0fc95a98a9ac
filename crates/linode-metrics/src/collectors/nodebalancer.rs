use std::sync::Arc;

use async_trait::async_trait;
use linode_client::LinodeApi;
use linode_common::{NodeBalancer, Result};
use tracing::{debug, warn};

use crate::{
    collector::{CollectOutcome, Collector, SampleSink, ScrapeContext},
    collectors::{BYTES_PER_MEBIBYTE, RESOURCE_LABELS, descriptor, resource_labels},
    types::MetricDescriptor,
};

const SUBSYSTEM: &str = "nodebalancer";

pub struct NodeBalancerCollector {
    client: Arc<dyn LinodeApi>,
    transfer_in_bytes: Arc<MetricDescriptor>,
    transfer_out_bytes: Arc<MetricDescriptor>,
    transfer_total_bytes: Arc<MetricDescriptor>,
    client_conn_throttle: Arc<MetricDescriptor>,
    descriptors: Vec<Arc<MetricDescriptor>>,
}

impl NodeBalancerCollector {
    pub fn new(namespace: &str, client: Arc<dyn LinodeApi>) -> Self {
        let transfer_in_bytes = descriptor(
            namespace,
            SUBSYSTEM,
            "transfer_in_bytes",
            "Inbound transfer this month",
            &RESOURCE_LABELS,
        );
        let transfer_out_bytes = descriptor(
            namespace,
            SUBSYSTEM,
            "transfer_out_bytes",
            "Outbound transfer this month",
            &RESOURCE_LABELS,
        );
        let transfer_total_bytes = descriptor(
            namespace,
            SUBSYSTEM,
            "transfer_total_bytes",
            "Total transfer this month",
            &RESOURCE_LABELS,
        );
        let client_conn_throttle = descriptor(
            namespace,
            SUBSYSTEM,
            "client_conn_throttle",
            "Connections per second allowed per client IP (0 disables throttling)",
            &RESOURCE_LABELS,
        );

        Self {
            client,
            descriptors: vec![
                Arc::clone(&transfer_in_bytes),
                Arc::clone(&transfer_out_bytes),
                Arc::clone(&transfer_total_bytes),
                Arc::clone(&client_conn_throttle),
            ],
            transfer_in_bytes,
            transfer_out_bytes,
            transfer_total_bytes,
            client_conn_throttle,
        }
    }

    async fn emit(&self, sink: &SampleSink, nodebalancer: &NodeBalancer) -> Result<()> {
        let labels = resource_labels(nodebalancer.id, &nodebalancer.label, &nodebalancer.region);

        // transfer figures are MB and may still be null early in the month
        let transfer = [
            (&self.transfer_in_bytes, nodebalancer.transfer.inbound),
            (&self.transfer_out_bytes, nodebalancer.transfer.outbound),
            (&self.transfer_total_bytes, nodebalancer.transfer.total),
        ];
        for (descriptor, megabytes) in transfer {
            if let Some(megabytes) = megabytes {
                sink.gauge(descriptor, megabytes * BYTES_PER_MEBIBYTE, &labels)
                    .await?;
            }
        }

        sink.gauge(
            &self.client_conn_throttle,
            f64::from(nodebalancer.client_conn_throttle),
            &labels,
        )
        .await
    }
}

#[async_trait]
impl Collector for NodeBalancerCollector {
    fn name(&self) -> &str {
        SUBSYSTEM
    }

    fn describe(&self) -> &[Arc<MetricDescriptor>] {
        &self.descriptors
    }

    async fn collect(&self, ctx: &ScrapeContext, sink: &SampleSink) -> CollectOutcome {
        debug!(collector = SUBSYSTEM, "collect started");

        let nodebalancers = match ctx
            .bounded("list_nodebalancers", self.client.list_nodebalancers())
            .await
        {
            Ok(nodebalancers) => nodebalancers,
            Err(err) => {
                warn!(collector = SUBSYSTEM, error = %err, kind = err.kind(), "failed to list nodebalancers");
                return CollectOutcome::Failed;
            }
        };

        for nodebalancer in &nodebalancers {
            if let Err(err) = self.emit(sink, nodebalancer).await {
                warn!(collector = SUBSYSTEM, error = %err, "stopped emitting samples");
                return CollectOutcome::Failed;
            }
        }

        debug!(collector = SUBSYSTEM, nodebalancers = nodebalancers.len(), "collect completed");
        CollectOutcome::Complete
    }
}
