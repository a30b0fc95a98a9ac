use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use linode_client::LinodeApi;
use tracing::{debug, warn};

use crate::{
    collector::{CollectOutcome, Collector, SampleSink, ScrapeContext},
    collectors::descriptor,
    types::{LabelValueSet, MetricDescriptor},
};

const SUBSYSTEM: &str = "ticket";

pub struct TicketCollector {
    client: Arc<dyn LinodeApi>,
    count: Arc<MetricDescriptor>,
    descriptors: Vec<Arc<MetricDescriptor>>,
}

impl TicketCollector {
    pub fn new(namespace: &str, client: Arc<dyn LinodeApi>) -> Self {
        let count = descriptor(
            namespace,
            SUBSYSTEM,
            "count",
            "Number of support tickets by status",
            &["status"],
        );

        Self {
            client,
            descriptors: vec![Arc::clone(&count)],
            count,
        }
    }
}

#[async_trait]
impl Collector for TicketCollector {
    fn name(&self) -> &str {
        SUBSYSTEM
    }

    fn describe(&self) -> &[Arc<MetricDescriptor>] {
        &self.descriptors
    }

    async fn collect(&self, ctx: &ScrapeContext, sink: &SampleSink) -> CollectOutcome {
        debug!(collector = SUBSYSTEM, "collect started");

        let tickets = match ctx.bounded("list_tickets", self.client.list_tickets()).await {
            Ok(tickets) => tickets,
            Err(err) => {
                warn!(collector = SUBSYSTEM, error = %err, kind = err.kind(), "failed to list tickets");
                return CollectOutcome::Failed;
            }
        };

        let mut by_status: BTreeMap<String, usize> = BTreeMap::new();
        for ticket in tickets {
            *by_status.entry(ticket.status).or_default() += 1;
        }

        for (status, count) in by_status {
            let labels = LabelValueSet::new([status]);
            if let Err(err) = sink.gauge(&self.count, count as f64, &labels).await {
                warn!(collector = SUBSYSTEM, error = %err, "stopped emitting samples");
                return CollectOutcome::Failed;
            }
        }

        debug!(collector = SUBSYSTEM, "collect completed");
        CollectOutcome::Complete
    }
}
