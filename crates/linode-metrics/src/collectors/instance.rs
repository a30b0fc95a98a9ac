use std::sync::Arc;

use async_trait::async_trait;
use linode_client::LinodeApi;
use linode_common::{Instance, Result};
use tracing::{debug, warn};

use crate::{
    collector::{CollectOutcome, Collector, SampleSink, ScrapeContext},
    collectors::{BYTES_PER_MEBIBYTE, descriptor},
    types::{LabelValueSet, MetricDescriptor},
};

const SUBSYSTEM: &str = "instance";
const INSTANCE_LABELS: [&str; 4] = ["resource_id", "label", "region", "type"];

/// Status and plan size of every instance. Needs only the list call.
pub struct InstanceCollector {
    client: Arc<dyn LinodeApi>,
    up: Arc<MetricDescriptor>,
    vcpus: Arc<MetricDescriptor>,
    memory_bytes: Arc<MetricDescriptor>,
    disk_bytes: Arc<MetricDescriptor>,
    descriptors: Vec<Arc<MetricDescriptor>>,
}

impl InstanceCollector {
    pub fn new(namespace: &str, client: Arc<dyn LinodeApi>) -> Self {
        let up = descriptor(
            namespace,
            SUBSYSTEM,
            "up",
            "Whether the instance is running (1) or not (0)",
            &INSTANCE_LABELS,
        );
        let vcpus = descriptor(
            namespace,
            SUBSYSTEM,
            "vcpus",
            "Number of virtual CPUs in the instance plan",
            &INSTANCE_LABELS,
        );
        let memory_bytes = descriptor(
            namespace,
            SUBSYSTEM,
            "memory_bytes",
            "Memory in the instance plan",
            &INSTANCE_LABELS,
        );
        let disk_bytes = descriptor(
            namespace,
            SUBSYSTEM,
            "disk_bytes",
            "Disk space in the instance plan",
            &INSTANCE_LABELS,
        );

        Self {
            client,
            descriptors: vec![
                Arc::clone(&up),
                Arc::clone(&vcpus),
                Arc::clone(&memory_bytes),
                Arc::clone(&disk_bytes),
            ],
            up,
            vcpus,
            memory_bytes,
            disk_bytes,
        }
    }

    async fn emit(&self, sink: &SampleSink, instance: &Instance) -> Result<()> {
        let labels = LabelValueSet::new([
            instance.id.to_string(),
            instance.label.clone(),
            instance.region.clone(),
            instance.instance_type.clone(),
        ]);
        let up = if instance.is_running() { 1.0 } else { 0.0 };

        sink.gauge(&self.up, up, &labels).await?;
        sink.gauge(&self.vcpus, f64::from(instance.specs.vcpus), &labels)
            .await?;
        sink.gauge(
            &self.memory_bytes,
            instance.specs.memory as f64 * BYTES_PER_MEBIBYTE,
            &labels,
        )
        .await?;
        sink.gauge(
            &self.disk_bytes,
            instance.specs.disk as f64 * BYTES_PER_MEBIBYTE,
            &labels,
        )
        .await
    }
}

#[async_trait]
impl Collector for InstanceCollector {
    fn name(&self) -> &str {
        SUBSYSTEM
    }

    fn describe(&self) -> &[Arc<MetricDescriptor>] {
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
                warn!(collector = SUBSYSTEM, error = %err, kind = err.kind(), "failed to list instances");
                return CollectOutcome::Failed;
            }
        };

        for instance in &instances {
            if let Err(err) = self.emit(sink, instance).await {
                warn!(collector = SUBSYSTEM, error = %err, "stopped emitting samples");
                return CollectOutcome::Failed;
            }
        }

        debug!(collector = SUBSYSTEM, instances = instances.len(), "collect completed");
        CollectOutcome::Complete
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing::{MockLinodeApi, drain, instance, values_of};

    #[tokio::test]
    async fn reports_status_and_plan_size() {
        let mut stopped = instance(101, "web-2", "us-east");
        stopped.status = "offline".to_string();
        let api = MockLinodeApi {
            instances: vec![instance(100, "web-1", "us-east"), stopped],
            ..Default::default()
        };
        let collector = InstanceCollector::new("linode", Arc::new(api));
        let ctx = ScrapeContext::with_timeout(Duration::from_secs(5));

        let (outcome, samples) = drain(&collector, &ctx).await;

        assert_eq!(outcome, CollectOutcome::Complete);
        assert_eq!(samples.len(), 8);

        let up = values_of(&samples, "linode_instance_up");
        assert_eq!(up[0].value(), 1.0);
        assert_eq!(up[1].value(), 0.0);
        assert_eq!(up[0].label("type"), Some("g6-standard-1"));

        let memory = values_of(&samples, "linode_instance_memory_bytes");
        assert_eq!(memory[0].value(), 2_048.0 * 1024.0 * 1024.0);
        assert_eq!(values_of(&samples, "linode_instance_vcpus")[0].value(), 1.0);
    }

    #[tokio::test]
    async fn list_failure_emits_nothing() {
        let api = MockLinodeApi {
            instances: vec![instance(100, "web-1", "us-east")],
            fail_lists: true,
            ..Default::default()
        };
        let collector = InstanceCollector::new("linode", Arc::new(api));
        let ctx = ScrapeContext::with_timeout(Duration::from_secs(5));

        let (outcome, samples) = drain(&collector, &ctx).await;

        assert_eq!(outcome, CollectOutcome::Failed);
        assert!(samples.is_empty());
    }
}
