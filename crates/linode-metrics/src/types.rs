use std::sync::Arc;

use linode_common::{LinodeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Counter,
    Gauge,
}

impl ValueKind {
    pub fn as_prometheus_type(&self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
        }
    }
}

/// Static shape of one published metric. Built once per collector and shared
/// read-only across scrapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDescriptor {
    name: String,
    help: String,
    variable_labels: Vec<String>,
}

impl MetricDescriptor {
    pub fn new(
        namespace: &str,
        subsystem: &str,
        name: &str,
        help: &str,
        variable_labels: &[&str],
    ) -> Self {
        Self {
            name: build_fq_name(namespace, subsystem, name),
            help: help.to_string(),
            variable_labels: variable_labels
                .iter()
                .map(|label| (*label).to_string())
                .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn variable_labels(&self) -> &[String] {
        &self.variable_labels
    }
}

/// Joins the non-empty parts with `_`.
pub fn build_fq_name(namespace: &str, subsystem: &str, name: &str) -> String {
    [namespace, subsystem, name]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

pub fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' || first == ':' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == ':')
}

pub fn is_valid_label_name(name: &str) -> bool {
    if name.starts_with("__") {
        return false;
    }
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

/// Label values aligned by position with a descriptor's label names. Cloning shares
/// the underlying values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelValueSet(Arc<[String]>);

impl LabelValueSet {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(values.into_iter().map(Into::into).collect())
    }

    pub fn empty() -> Self {
        Self::new(std::iter::empty::<String>())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> &[String] {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct Sample {
    descriptor: Arc<MetricDescriptor>,
    value: f64,
    labels: LabelValueSet,
    kind: ValueKind,
}

impl Sample {
    pub fn new(
        descriptor: &Arc<MetricDescriptor>,
        kind: ValueKind,
        value: f64,
        labels: LabelValueSet,
    ) -> Result<Self> {
        let expected = descriptor.variable_labels.len();
        if labels.len() != expected {
            return Err(LinodeError::LabelCardinality {
                metric: descriptor.name.clone(),
                expected,
                actual: labels.len(),
            });
        }

        Ok(Self {
            descriptor: Arc::clone(descriptor),
            value,
            labels,
            kind,
        })
    }

    pub fn gauge(
        descriptor: &Arc<MetricDescriptor>,
        value: f64,
        labels: LabelValueSet,
    ) -> Result<Self> {
        Self::new(descriptor, ValueKind::Gauge, value, labels)
    }

    pub fn descriptor(&self) -> &Arc<MetricDescriptor> {
        &self.descriptor
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn labels(&self) -> &LabelValueSet {
        &self.labels
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Label value for `name`, if the descriptor declares it.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.descriptor
            .variable_labels
            .iter()
            .position(|label| label == name)
            .and_then(|index| self.labels.values().get(index))
            .map(String::as_str)
    }

    pub fn label_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.descriptor
            .variable_labels
            .iter()
            .map(String::as_str)
            .zip(self.labels.values().iter().map(String::as_str))
    }
}

/// Samples of one metric gathered during a scrape.
#[derive(Debug, Clone)]
pub struct MetricFamily {
    pub descriptor: Arc<MetricDescriptor>,
    pub kind: ValueKind,
    pub samples: Vec<Sample>,
}
