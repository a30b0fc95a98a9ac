use std::sync::Arc;

use async_trait::async_trait;
use linode_client::LinodeApi;
use linode_common::{Instance, InstanceTransfer, Result};
use tracing::{debug, warn};

use crate::{
    collector::{CollectOutcome, Collector, SampleSink, ScrapeContext},
    collectors::{BYTES_PER_GIBIBYTE, RESOURCE_LABELS, descriptor, resource_labels},
    types::MetricDescriptor,
};

const SUBSYSTEM: &str = "transfer";

/// Per-instance network transfer for the current billing period.
///
/// One list call, then one transfer call per instance. A failed list call ends the
/// cycle; a failed transfer call skips only that instance.
pub struct TransferCollector {
    client: Arc<dyn LinodeApi>,
    used_bytes: Arc<MetricDescriptor>,
    quota_bytes: Arc<MetricDescriptor>,
    billable_bytes: Arc<MetricDescriptor>,
    descriptors: Vec<Arc<MetricDescriptor>>,
}

impl TransferCollector {
    pub fn new(namespace: &str, client: Arc<dyn LinodeApi>) -> Self {
        let used_bytes = descriptor(
            namespace,
            SUBSYSTEM,
            "used_bytes",
            "Total transfer used in current billing period",
            &RESOURCE_LABELS,
        );
        let quota_bytes = descriptor(
            namespace,
            SUBSYSTEM,
            "quota_bytes",
            "Monthly transfer quota",
            &RESOURCE_LABELS,
        );
        let billable_bytes = descriptor(
            namespace,
            SUBSYSTEM,
            "billable_bytes",
            "Transfer that exceeds quota (billable)",
            &RESOURCE_LABELS,
        );

        Self {
            client,
            descriptors: vec![
                Arc::clone(&used_bytes),
                Arc::clone(&quota_bytes),
                Arc::clone(&billable_bytes),
            ],
            used_bytes,
            quota_bytes,
            billable_bytes,
        }
    }

    async fn emit(
        &self,
        sink: &SampleSink,
        instance: &Instance,
        transfer: InstanceTransfer,
    ) -> Result<()> {
        let labels = resource_labels(instance.id, &instance.label, &instance.region);

        // used and billable arrive in bytes; quota arrives in GiB
        sink.gauge(&self.used_bytes, transfer.used as f64, &labels)
            .await?;
        sink.gauge(&self.quota_bytes, quota_bytes(transfer.quota), &labels)
            .await?;
        sink.gauge(&self.billable_bytes, transfer.billable as f64, &labels)
            .await
    }
}

fn quota_bytes(quota_gib: u64) -> f64 {
    quota_gib as f64 * BYTES_PER_GIBIBYTE
}

#[async_trait]
impl Collector for TransferCollector {
    fn name(&self) -> &str {
        SUBSYSTEM
    }

    fn describe(&self) -> &[Arc<MetricDescriptor>] {
        debug!(collector = SUBSYSTEM, "describe");
        &self.descriptors
    }

    async fn collect(&self, ctx: &ScrapeContext, sink: &SampleSink) -> CollectOutcome {
        debug!(collector = SUBSYSTEM, "collect started");

        let instances = match ctx
            .bounded("list_instances", self.client.list_instances())
            .await
        {
            Ok(instances) => instances,
            Err(err) => {
                warn!(
                    collector = SUBSYSTEM,
                    error = %err,
                    kind = err.kind(),
                    "failed to list instances"
                );
                return CollectOutcome::Failed;
            }
        };
        debug!(collector = SUBSYSTEM, instances = instances.len(), "listed instances");

        let mut skipped = 0;
        for instance in &instances {
            let transfer = match ctx
                .bounded(
                    "get_instance_transfer",
                    self.client.get_instance_transfer(instance.id),
                )
                .await
            {
                Ok(transfer) => transfer,
                Err(err) => {
                    warn!(
                        collector = SUBSYSTEM,
                        resource_id = instance.id,
                        error = %err,
                        kind = err.kind(),
                        "failed to fetch instance transfer, skipping"
                    );
                    skipped += 1;
                    continue;
                }
            };

            if let Err(err) = self.emit(sink, instance, transfer).await {
                warn!(collector = SUBSYSTEM, error = %err, "stopped emitting samples");
                return CollectOutcome::Failed;
            }
        }

        debug!(collector = SUBSYSTEM, skipped, "collect completed");
        CollectOutcome::from_skipped(skipped)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::atomic::Ordering,
        time::Duration,
    };

    use super::*;
    use crate::testing::{MockLinodeApi, drain, instance, values_of};

    fn transfer(used: u64, quota: u64, billable: u64) -> InstanceTransfer {
        InstanceTransfer {
            used,
            quota,
            billable,
        }
    }

    fn two_instance_api() -> MockLinodeApi {
        MockLinodeApi {
            instances: vec![
                instance(100, "web-1", "us-east"),
                instance(101, "web-2", "us-east"),
            ],
            transfers: HashMap::from([
                (100, transfer(5_000_000_000, 2, 0)),
                (101, transfer(3_000_000_000_000, 4, 1_000_000_000)),
            ]),
            ..Default::default()
        }
    }

    fn scrape_ctx() -> ScrapeContext {
        ScrapeContext::with_timeout(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn emits_one_triple_per_instance() {
        let collector = TransferCollector::new("linode", Arc::new(two_instance_api()));

        let (outcome, samples) = drain(&collector, &scrape_ctx()).await;

        assert_eq!(outcome, CollectOutcome::Complete);
        assert_eq!(samples.len(), 6);

        let quotas = values_of(&samples, "linode_transfer_quota_bytes");
        assert_eq!(quotas.len(), 2);
        assert_eq!(quotas[0].label("resource_id"), Some("100"));
        assert_eq!(quotas[0].value(), 2_147_483_648.0);
        assert_eq!(quotas[1].label("resource_id"), Some("101"));
        assert_eq!(quotas[1].value(), 4_294_967_296.0);

        let used = values_of(&samples, "linode_transfer_used_bytes");
        assert_eq!(used[0].value(), 5e9);
        assert_eq!(used[1].value(), 3e12);

        let billable = values_of(&samples, "linode_transfer_billable_bytes");
        assert_eq!(billable[0].value(), 0.0);
        assert_eq!(billable[1].value(), 1e9);
    }

    #[tokio::test]
    async fn samples_of_one_instance_share_labels() {
        let collector = TransferCollector::new("linode", Arc::new(two_instance_api()));

        let (_, samples) = drain(&collector, &scrape_ctx()).await;

        for triple in samples.chunks(3) {
            let labels = triple[0].labels();
            assert!(triple.iter().all(|sample| sample.labels() == labels));
        }
        assert_eq!(
            samples[3].labels().values(),
            &["101".to_string(), "web-2".to_string(), "us-east".to_string()]
        );
    }

    #[tokio::test]
    async fn list_failure_emits_nothing() {
        let api = Arc::new(MockLinodeApi {
            fail_lists: true,
            ..two_instance_api()
        });
        let collector = TransferCollector::new("linode", api.clone());

        let (outcome, samples) = drain(&collector, &scrape_ctx()).await;

        assert_eq!(outcome, CollectOutcome::Failed);
        assert!(samples.is_empty());
        assert_eq!(api.detail_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn detail_failure_skips_only_that_instance() {
        let mut api = two_instance_api();
        api.instances.insert(1, instance(102, "db-1", "eu-west"));
        let api = Arc::new(api);
        let collector = TransferCollector::new("linode", api.clone());

        let (outcome, samples) = drain(&collector, &scrape_ctx()).await;

        assert_eq!(outcome, CollectOutcome::Partial { skipped: 1 });
        assert_eq!(samples.len(), 6);
        assert!(samples.iter().all(|sample| sample.label("resource_id") != Some("102")));
        assert_eq!(api.detail_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn hung_detail_call_is_skipped_at_deadline() {
        let mut api = two_instance_api();
        api.hang_transfers.insert(100);
        let collector = TransferCollector::new("linode", Arc::new(api));
        let ctx = ScrapeContext::with_timeout(Duration::from_millis(50));

        let (outcome, samples) = drain(&collector, &ctx).await;

        // 101 answers immediately, so it still lands after the deadline has passed
        assert_eq!(outcome, CollectOutcome::Partial { skipped: 1 });
        assert_eq!(samples.len(), 3);
        assert!(samples.iter().all(|sample| sample.label("resource_id") == Some("101")));
    }

    #[tokio::test]
    async fn slow_detail_after_deadline_is_skipped() {
        let mut api = two_instance_api();
        api.hang_transfers.insert(100);
        api.slow_transfers.insert(101, Duration::from_millis(500));
        let api = Arc::new(api);
        let collector = TransferCollector::new("linode", api.clone());
        let ctx = ScrapeContext::with_timeout(Duration::from_millis(50));

        let (outcome, samples) = drain(&collector, &ctx).await;

        assert_eq!(outcome, CollectOutcome::Partial { skipped: 2 });
        assert!(samples.is_empty());
        assert_eq!(api.detail_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn slow_detail_within_deadline_is_kept() {
        let mut api = two_instance_api();
        api.slow_transfers.insert(100, Duration::from_millis(20));
        let collector = TransferCollector::new("linode", Arc::new(api));

        let (outcome, samples) = drain(&collector, &scrape_ctx()).await;

        assert_eq!(outcome, CollectOutcome::Complete);
        assert_eq!(samples.len(), 6);
    }

    #[tokio::test]
    async fn hung_list_call_fails_the_cycle() {
        let api = MockLinodeApi {
            hang_lists: true,
            ..two_instance_api()
        };
        let collector = TransferCollector::new("linode", Arc::new(api));
        let ctx = ScrapeContext::with_timeout(Duration::from_millis(50));

        let (outcome, samples) = drain(&collector, &ctx).await;

        assert_eq!(outcome, CollectOutcome::Failed);
        assert!(samples.is_empty());
    }

    #[tokio::test]
    async fn describe_is_static() {
        let api = Arc::new(two_instance_api());
        let collector = TransferCollector::new("linode", api.clone());

        let first = collector
            .describe()
            .iter()
            .map(|descriptor| descriptor.name().to_string())
            .collect::<Vec<_>>();
        let second = collector
            .describe()
            .iter()
            .map(|descriptor| descriptor.name().to_string())
            .collect::<Vec<_>>();

        assert_eq!(
            first,
            vec![
                "linode_transfer_used_bytes",
                "linode_transfer_quota_bytes",
                "linode_transfer_billable_bytes",
            ]
        );
        assert_eq!(first, second);
        assert!(
            collector
                .describe()
                .iter()
                .all(|descriptor| descriptor.variable_labels() == RESOURCE_LABELS)
        );
        assert_eq!(api.list_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn quota_conversion_is_exact() {
        for quota in [0_u64, 1, 2, 4, 1_000, 20_000] {
            assert_eq!(quota_bytes(quota), (quota * 1024 * 1024 * 1024) as f64);
        }
    }
}
