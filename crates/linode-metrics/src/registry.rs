use std::{
    collections::{BTreeMap, HashSet},
    sync::{Arc, RwLock},
    time::Instant,
};

use futures::future::join_all;
use linode_common::{LinodeError, Result};
use tracing::{debug, info, warn};

use crate::{
    collector::{CollectOutcome, Collector, SAMPLE_CHANNEL_CAPACITY, SampleSink, ScrapeContext},
    types::{
        LabelValueSet, MetricDescriptor, MetricFamily, Sample, is_valid_label_name,
        is_valid_metric_name,
    },
};

const SUBSYSTEM: &str = "exporter";

/// A collector plus the metric names it described at registration.
#[derive(Clone)]
struct RegisteredCollector {
    collector: Arc<dyn Collector>,
    described: Arc<HashSet<String>>,
}

#[derive(Default)]
struct Registered {
    collectors: Vec<RegisteredCollector>,
    collector_names: HashSet<String>,
    metric_names: HashSet<String>,
}

/// Set of collectors scraped together into one exposition.
///
/// Besides the collectors' own metrics every gather adds
/// `<namespace>_exporter_collector_success` and
/// `<namespace>_exporter_collector_duration_seconds` per collector.
pub struct CollectorRegistry {
    registered: RwLock<Registered>,
    collector_success: Arc<MetricDescriptor>,
    collector_duration: Arc<MetricDescriptor>,
}

struct CollectorScrape {
    name: String,
    described: Arc<HashSet<String>>,
    outcome: CollectOutcome,
    samples: Vec<Sample>,
    elapsed_seconds: f64,
}

impl CollectorRegistry {
    pub fn new(namespace: &str) -> Self {
        let collector_success = Arc::new(MetricDescriptor::new(
            namespace,
            SUBSYSTEM,
            "collector_success",
            "Whether the collector's last scrape reached the upstream API (1) or failed (0)",
            &["collector"],
        ));
        let collector_duration = Arc::new(MetricDescriptor::new(
            namespace,
            SUBSYSTEM,
            "collector_duration_seconds",
            "Duration of the collector's last scrape in seconds",
            &["collector"],
        ));

        let mut registered = Registered::default();
        registered
            .metric_names
            .insert(collector_success.name().to_string());
        registered
            .metric_names
            .insert(collector_duration.name().to_string());

        Self {
            registered: RwLock::new(registered),
            collector_success,
            collector_duration,
        }
    }

    pub fn register(&self, collector: Arc<dyn Collector>) -> Result<()> {
        let name = collector.name().to_string();
        let descriptors = collector.describe();

        let mut seen = HashSet::new();
        for descriptor in descriptors {
            validate_descriptor(descriptor)?;
            if !seen.insert(descriptor.name()) {
                return Err(LinodeError::DuplicateMetric(descriptor.name().to_string()));
            }
        }

        let mut registered = self.registered.write().map_err(|_| {
            LinodeError::InternalError("failed to acquire collector registry lock".to_string())
        })?;

        if registered.collector_names.contains(&name) {
            return Err(LinodeError::InvalidArgument(format!(
                "collector already registered: {name}"
            )));
        }
        if let Some(duplicate) = descriptors
            .iter()
            .find(|descriptor| registered.metric_names.contains(descriptor.name()))
        {
            return Err(LinodeError::DuplicateMetric(duplicate.name().to_string()));
        }

        let described = descriptors
            .iter()
            .map(|descriptor| descriptor.name().to_string())
            .collect::<HashSet<_>>();
        let metrics = described.len();
        registered.metric_names.extend(described.iter().cloned());
        registered.collector_names.insert(name.clone());
        registered.collectors.push(RegisteredCollector {
            collector,
            described: Arc::new(described),
        });

        info!(collector = %name, metrics, "registered collector");
        Ok(())
    }

    /// Every descriptor a gather may produce, registry metrics first.
    pub fn describe_all(&self) -> Vec<Arc<MetricDescriptor>> {
        let registered = match self.registered.read() {
            Ok(guard) => guard,
            Err(_) => return Vec::new(),
        };

        let mut descriptors = vec![
            Arc::clone(&self.collector_success),
            Arc::clone(&self.collector_duration),
        ];
        for entry in &registered.collectors {
            descriptors.extend(entry.collector.describe().iter().cloned());
        }
        descriptors
    }

    pub async fn gather(&self, ctx: &ScrapeContext) -> Vec<MetricFamily> {
        let collectors = match self.registered.read() {
            Ok(guard) => guard.collectors.clone(),
            Err(_) => return Vec::new(),
        };

        let scrapes = join_all(
            collectors
                .iter()
                .map(|entry| scrape_collector(entry, ctx)),
        )
        .await;

        let mut families: BTreeMap<String, MetricFamily> = BTreeMap::new();
        for scrape in scrapes {
            for sample in scrape.samples {
                if !scrape.described.contains(sample.descriptor().name()) {
                    warn!(
                        collector = %scrape.name,
                        metric = sample.descriptor().name(),
                        "dropping sample for undescribed metric"
                    );
                    continue;
                }
                push_sample(&mut families, sample);
            }

            let labels = LabelValueSet::new([scrape.name.as_str()]);
            let success = if scrape.outcome.is_success() { 1.0 } else { 0.0 };
            let status = [
                Sample::gauge(&self.collector_success, success, labels.clone()),
                Sample::gauge(&self.collector_duration, scrape.elapsed_seconds, labels),
            ];
            for sample in status {
                match sample {
                    Ok(sample) => push_sample(&mut families, sample),
                    Err(err) => warn!(error = %err, "failed to build scrape status sample"),
                }
            }
        }

        families.into_values().collect()
    }
}

async fn scrape_collector(
    registered: &RegisteredCollector,
    ctx: &ScrapeContext,
) -> CollectorScrape {
    let collector = registered.collector.as_ref();
    let started_at = Instant::now();
    let (sink, mut receiver) = SampleSink::channel(SAMPLE_CHANNEL_CAPACITY);

    let produce = async move {
        let outcome = collector.collect(ctx, &sink).await;
        drop(sink);
        outcome
    };
    let consume = async {
        let mut samples = Vec::new();
        while let Some(sample) = receiver.recv().await {
            samples.push(sample);
        }
        samples
    };
    let (outcome, samples) = tokio::join!(produce, consume);

    let elapsed_seconds = started_at.elapsed().as_secs_f64();
    debug!(
        collector = collector.name(),
        ?outcome,
        samples = samples.len(),
        elapsed_seconds,
        "collector scraped"
    );

    CollectorScrape {
        name: collector.name().to_string(),
        described: Arc::clone(&registered.described),
        outcome,
        samples,
        elapsed_seconds,
    }
}

fn push_sample(families: &mut BTreeMap<String, MetricFamily>, sample: Sample) {
    let family = families
        .entry(sample.descriptor().name().to_string())
        .or_insert_with(|| MetricFamily {
            descriptor: Arc::clone(sample.descriptor()),
            kind: sample.kind(),
            samples: Vec::new(),
        });

    if family.kind != sample.kind() {
        warn!(
            metric = family.descriptor.name(),
            "dropping sample whose value kind differs from its family"
        );
        return;
    }
    family.samples.push(sample);
}

fn validate_descriptor(descriptor: &MetricDescriptor) -> Result<()> {
    if !is_valid_metric_name(descriptor.name()) {
        return Err(LinodeError::InvalidArgument(format!(
            "invalid metric name: {}",
            descriptor.name()
        )));
    }

    let mut labels = HashSet::new();
    for label in descriptor.variable_labels() {
        if !is_valid_label_name(label) || !labels.insert(label.as_str()) {
            return Err(LinodeError::InvalidArgument(format!(
                "invalid or repeated label {label} on metric {}",
                descriptor.name()
            )));
        }
    }

    Ok(())
}

/// Renders gathered families in the Prometheus text exposition format (0.0.4).
pub fn render_prometheus(families: &[MetricFamily]) -> String {
    let mut output = String::new();

    for family in families.iter().filter(|family| !family.samples.is_empty()) {
        let name = family.descriptor.name();

        output.push_str("# HELP ");
        output.push_str(name);
        output.push(' ');
        output.push_str(&escape_help(family.descriptor.help()));
        output.push('\n');

        output.push_str("# TYPE ");
        output.push_str(name);
        output.push(' ');
        output.push_str(family.kind.as_prometheus_type());
        output.push('\n');

        for sample in &family.samples {
            output.push_str(&render_sample_line(name, sample));
        }
    }

    output
}

fn render_sample_line(name: &str, sample: &Sample) -> String {
    let mut rendered = String::new();
    rendered.push_str(name);

    if !sample.labels().is_empty() {
        rendered.push('{');
        for (index, (key, value)) in sample.label_pairs().enumerate() {
            if index > 0 {
                rendered.push(',');
            }
            rendered.push_str(key);
            rendered.push_str("=\"");
            rendered.push_str(&escape_label_value(value));
            rendered.push('"');
        }
        rendered.push('}');
    }

    rendered.push(' ');
    rendered.push_str(&format_metric_value(sample.value()));
    rendered.push('\n');
    rendered
}

fn format_metric_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

fn escape_help(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\n', "\\n")
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('"', "\\\"")
}
