use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use linode_common::Result;
use tracing::warn;

use crate::{
    collector::{CollectOutcome, Collector, SampleSink, ScrapeContext},
    collectors::descriptor,
    types::{LabelValueSet, MetricDescriptor},
};

const SUBSYSTEM: &str = "exporter";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    pub os_version: String,
    pub git_commit: String,
}

impl BuildInfo {
    /// Reads `OS_VERSION` and `GIT_COMMIT` captured at compile time.
    pub fn from_build_env() -> Self {
        Self {
            os_version: option_env!("OS_VERSION").unwrap_or("unknown").to_string(),
            git_commit: option_env!("GIT_COMMIT").unwrap_or("unknown").to_string(),
        }
    }
}

/// Facts about the exporter process itself. Never calls upstream.
pub struct ExporterCollector {
    build_info: BuildInfo,
    started_at: DateTime<Utc>,
    info: Arc<MetricDescriptor>,
    start_time_seconds: Arc<MetricDescriptor>,
    descriptors: Vec<Arc<MetricDescriptor>>,
}

impl ExporterCollector {
    pub fn new(namespace: &str, build_info: BuildInfo) -> Self {
        let info = descriptor(
            namespace,
            SUBSYSTEM,
            "build_info",
            "A metric with a constant '1' value labeled by build metadata",
            &["os_version", "git_commit"],
        );
        let start_time_seconds = descriptor(
            namespace,
            SUBSYSTEM,
            "start_time_seconds",
            "Exporter start time since unix epoch in seconds",
            &[],
        );

        Self {
            build_info,
            started_at: Utc::now(),
            descriptors: vec![Arc::clone(&info), Arc::clone(&start_time_seconds)],
            info,
            start_time_seconds,
        }
    }

    async fn emit(&self, sink: &SampleSink) -> Result<()> {
        let labels = LabelValueSet::new([
            self.build_info.os_version.as_str(),
            self.build_info.git_commit.as_str(),
        ]);
        sink.gauge(&self.info, 1.0, &labels).await?;

        let started_at = self.started_at.timestamp_millis() as f64 / 1000.0;
        sink.gauge(&self.start_time_seconds, started_at, &LabelValueSet::empty())
            .await
    }
}

#[async_trait]
impl Collector for ExporterCollector {
    fn name(&self) -> &str {
        SUBSYSTEM
    }

    fn describe(&self) -> &[Arc<MetricDescriptor>] {
        &self.descriptors
    }

    async fn collect(&self, _ctx: &ScrapeContext, sink: &SampleSink) -> CollectOutcome {
        match self.emit(sink).await {
            Ok(()) => CollectOutcome::Complete,
            Err(err) => {
                warn!(collector = SUBSYSTEM, error = %err, "stopped emitting samples");
                CollectOutcome::Failed
            }
        }
    }
}
