use std::sync::Arc;

use async_trait::async_trait;
use linode_client::LinodeApi;
use tracing::{debug, warn};

use crate::{
    collector::{CollectOutcome, Collector, SampleSink, ScrapeContext},
    collectors::descriptor,
    types::{LabelValueSet, MetricDescriptor},
};

const SUBSYSTEM: &str = "account";

pub struct AccountCollector {
    client: Arc<dyn LinodeApi>,
    balance: Arc<MetricDescriptor>,
    uninvoiced_balance: Arc<MetricDescriptor>,
    descriptors: Vec<Arc<MetricDescriptor>>,
}

impl AccountCollector {
    pub fn new(namespace: &str, client: Arc<dyn LinodeApi>) -> Self {
        let balance = descriptor(
            namespace,
            SUBSYSTEM,
            "balance",
            "Account balance in USD",
            &["company"],
        );
        let uninvoiced_balance = descriptor(
            namespace,
            SUBSYSTEM,
            "uninvoiced_balance",
            "Charges accrued since the last invoice in USD",
            &["company"],
        );

        Self {
            client,
            descriptors: vec![Arc::clone(&balance), Arc::clone(&uninvoiced_balance)],
            balance,
            uninvoiced_balance,
        }
    }
}

#[async_trait]
impl Collector for AccountCollector {
    fn name(&self) -> &str {
        SUBSYSTEM
    }

    fn describe(&self) -> &[Arc<MetricDescriptor>] {
        &self.descriptors
    }

    async fn collect(&self, ctx: &ScrapeContext, sink: &SampleSink) -> CollectOutcome {
        debug!(collector = SUBSYSTEM, "collect started");

        let account = match ctx.bounded("get_account", self.client.get_account()).await {
            Ok(account) => account,
            Err(err) => {
                warn!(collector = SUBSYSTEM, error = %err, kind = err.kind(), "failed to fetch account");
                return CollectOutcome::Failed;
            }
        };

        let labels = LabelValueSet::new([account.company]);
        let emitted = async {
            sink.gauge(&self.balance, account.balance, &labels).await?;
            sink.gauge(&self.uninvoiced_balance, account.balance_uninvoiced, &labels)
                .await
        };
        if let Err(err) = emitted.await {
            warn!(collector = SUBSYSTEM, error = %err, "stopped emitting samples");
            return CollectOutcome::Failed;
        }

        debug!(collector = SUBSYSTEM, "collect completed");
        CollectOutcome::Complete
    }
}
