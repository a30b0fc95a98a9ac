use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use linode_common::{LinodeError, Result};
use tokio::{
    sync::mpsc,
    time::{Instant, timeout_at},
};

use crate::types::{LabelValueSet, MetricDescriptor, Sample};

pub const SAMPLE_CHANNEL_CAPACITY: usize = 256;

/// Longest scrape deadline accepted; larger timeouts are clamped to it.
pub const MAX_SCRAPE_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// A source of samples for one resource type.
///
/// `describe` is static: no upstream I/O, same answer every call. `collect` runs once
/// per scrape, streams samples into `sink`, and handles its own upstream failures.
/// A failing upstream lowers the completeness of the output, it never fails the scrape.
#[async_trait]
pub trait Collector: Send + Sync {
    fn name(&self) -> &str;

    fn describe(&self) -> &[Arc<MetricDescriptor>];

    async fn collect(&self, ctx: &ScrapeContext, sink: &SampleSink) -> CollectOutcome;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectOutcome {
    Complete,
    /// Some resources were skipped after their detail call failed.
    Partial { skipped: usize },
    /// Nothing was collected this cycle.
    Failed,
}

impl CollectOutcome {
    pub fn from_skipped(skipped: usize) -> Self {
        if skipped == 0 {
            Self::Complete
        } else {
            Self::Partial { skipped }
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed)
    }
}

/// Per-scrape state handed to every collector: currently the deadline that bounds
/// each upstream call.
#[derive(Debug, Clone, Copy)]
pub struct ScrapeContext {
    deadline: Instant,
}

impl ScrapeContext {
    pub fn with_timeout(timeout: Duration) -> Self {
        let now = Instant::now();
        let deadline = now
            .checked_add(timeout.min(MAX_SCRAPE_TIMEOUT))
            .unwrap_or(now);
        Self { deadline }
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self { deadline }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub async fn bounded<T, F>(&self, operation: &str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match timeout_at(self.deadline, call).await {
            Ok(result) => result,
            Err(_) => Err(LinodeError::DeadlineExceeded {
                operation: operation.to_string(),
            }),
        }
    }
}

/// Sending half of a per-scrape sample stream. Dropping it ends the stream.
pub struct SampleSink {
    tx: mpsc::Sender<Sample>,
}

impl SampleSink {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Sample>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    pub async fn send(&self, sample: Sample) -> Result<()> {
        self.tx
            .send(sample)
            .await
            .map_err(|_| LinodeError::SinkClosed)
    }

    pub async fn gauge(
        &self,
        descriptor: &Arc<MetricDescriptor>,
        value: f64,
        labels: &LabelValueSet,
    ) -> Result<()> {
        self.send(Sample::gauge(descriptor, value, labels.clone())?)
            .await
    }
}
