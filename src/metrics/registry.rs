use super::{Descriptor, LabelSet, MetricKind};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::time::SystemTime;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum RegistryError {
    /// The catalog declares the same metric twice. This is a configuration
    /// error and is fatal at startup.
    #[error("metric `{0}` is registered more than once")]
    DuplicateDescriptor(String),
    #[error("metric `{0}` is not registered")]
    UnknownDescriptor(String),
    #[error("labels for `{metric}` do not match its schema (missing: {missing:?}, unexpected: {unexpected:?})")]
    LabelSchemaMismatch {
        metric: String,
        missing: Vec<String>,
        unexpected: Vec<String>,
    },
    #[error("counter `{metric}` cannot be incremented by {delta}")]
    InvalidDelta { metric: String, delta: f64 },
}

/// A single pending write.
#[derive(Clone, Debug)]
pub struct Sample {
    metric: &'static str,
    labels: LabelSet,
    value: f64,
}

/// A group of writes which are applied all together or not at all.
#[derive(Clone, Debug)]
pub struct Batch {
    scope: String,
    samples: Vec<Sample>,
}

impl Batch {
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            samples: Vec::new(),
        }
    }

    /// Queue a write. For gauges the value replaces the current value, for
    /// counters it is the (non-negative) amount to add.
    pub fn push(&mut self, metric: &'static str, labels: &LabelSet, value: f64) {
        self.samples.push(Sample {
            metric,
            labels: labels.clone(),
            value,
        });
    }

    #[allow(dead_code)]
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &LabelSet, f64)> {
        self.samples.iter().map(|s| (s.metric, &s.labels, s.value))
    }
}

/// A batch that failed validation and was not applied.
#[derive(Debug)]
pub struct Rejection {
    pub scope: String,
    pub error: RegistryError,
}

/// The outcome of committing a set of batches.
#[derive(Debug, Default)]
pub struct CommitReport {
    pub batches: usize,
    pub samples: usize,
    pub rejected: Vec<Rejection>,
}

#[derive(Default)]
struct Inner {
    series: HashMap<&'static str, BTreeMap<LabelSet, f64>>,
    commits: u64,
}

impl Inner {
    fn apply(&mut self, descriptor: &Descriptor, labels: LabelSet, value: f64) {
        let entry = self
            .series
            .entry(descriptor.name())
            .or_default()
            .entry(labels)
            .or_insert(0.0);

        match descriptor.kind() {
            MetricKind::Gauge => *entry = value,
            MetricKind::Counter => *entry += value,
        }
    }
}

/// Owns every metric descriptor and the live series written against them.
///
/// Descriptors are fixed once the registry is shared. Series are created on
/// first write and are never removed. All writes happen under a single
/// reader-writer lock so a snapshot never observes half of a commit.
pub struct Registry {
    descriptors: BTreeMap<&'static str, Descriptor>,
    inner: RwLock<Inner>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            descriptors: BTreeMap::new(),
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Create a registry from a list of descriptors, failing on the first
    /// duplicated name.
    pub fn with_descriptors<'a>(
        descriptors: impl IntoIterator<Item = &'a Descriptor>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for descriptor in descriptors {
            registry.register(*descriptor)?;
        }
        Ok(registry)
    }

    /// Create a registry holding the full metric catalog.
    pub fn with_catalog() -> Result<Self, RegistryError> {
        Self::with_descriptors(super::catalog::CATALOG)
    }

    pub fn register(&mut self, descriptor: Descriptor) -> Result<(), RegistryError> {
        if self.descriptors.contains_key(descriptor.name()) {
            return Err(RegistryError::DuplicateDescriptor(
                descriptor.name().to_string(),
            ));
        }

        self.descriptors.insert(descriptor.name(), descriptor);
        Ok(())
    }

    #[allow(dead_code)]
    pub fn descriptor(&self, name: &str) -> Option<&Descriptor> {
        self.descriptors.get(name)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &Descriptor> {
        self.descriptors.values()
    }

    /// Write a single value. Gauges are replaced, counters accumulate.
    #[allow(dead_code)]
    pub fn upsert(&self, metric: &str, labels: LabelSet, value: f64) -> Result<(), RegistryError> {
        let descriptor = self.validate(metric, &labels, value)?;
        self.inner.write().apply(descriptor, labels, value);
        Ok(())
    }

    /// Apply a set of batches within one write section. Each batch is
    /// checked in full before any of its samples are applied; a batch with
    /// an invalid sample is skipped and reported while the others proceed.
    pub fn commit(&self, batches: impl IntoIterator<Item = Batch>) -> CommitReport {
        let mut report = CommitReport::default();
        let mut accepted = Vec::new();

        for batch in batches {
            let checked: Result<Vec<&Descriptor>, RegistryError> = batch
                .samples
                .iter()
                .map(|s| self.validate(s.metric, &s.labels, s.value))
                .collect();

            match checked {
                Ok(descriptors) => accepted.push((batch, descriptors)),
                Err(error) => report.rejected.push(Rejection {
                    scope: batch.scope,
                    error,
                }),
            }
        }

        let mut inner = self.inner.write();

        for (batch, descriptors) in accepted {
            report.batches += 1;
            report.samples += batch.samples.len();

            for (sample, descriptor) in batch.samples.into_iter().zip(descriptors) {
                inner.apply(descriptor, sample.labels, sample.value);
            }
        }

        inner.commits += 1;

        report
    }

    fn validate(
        &self,
        metric: &str,
        labels: &LabelSet,
        value: f64,
    ) -> Result<&Descriptor, RegistryError> {
        let descriptor = self
            .descriptors
            .get(metric)
            .ok_or_else(|| RegistryError::UnknownDescriptor(metric.to_string()))?;

        let (missing, unexpected) = labels.diff(descriptor.label_names());
        if !missing.is_empty() || !unexpected.is_empty() {
            return Err(RegistryError::LabelSchemaMismatch {
                metric: metric.to_string(),
                missing,
                unexpected,
            });
        }

        if descriptor.kind() == MetricKind::Counter && !(value >= 0.0 && value.is_finite()) {
            return Err(RegistryError::InvalidDelta {
                metric: metric.to_string(),
                delta: value,
            });
        }

        Ok(descriptor)
    }

    /// The number of live series.
    pub fn len(&self) -> usize {
        self.inner.read().series.values().map(|s| s.len()).sum()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy out every descriptor and its series at a single point in time.
    pub fn snapshot(&self) -> Snapshot {
        let inner = self.inner.read();

        let families = self
            .descriptors
            .values()
            .map(|descriptor| Family {
                name: descriptor.name(),
                help: descriptor.help(),
                kind: descriptor.kind(),
                series: inner
                    .series
                    .get(descriptor.name())
                    .map(|series| {
                        series
                            .iter()
                            .map(|(labels, value)| Series {
                                labels: labels.clone(),
                                value: *value,
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
            })
            .collect();

        Snapshot {
            systemtime: SystemTime::now(),
            commits: inner.commits,
            families,
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time copy of the registry.
#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub systemtime: SystemTime,
    pub commits: u64,
    pub families: Vec<Family>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Family {
    pub name: &'static str,
    pub help: &'static str,
    pub kind: MetricKind,
    pub series: Vec<Series>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Series {
    pub labels: LabelSet,
    pub value: f64,
}

impl Snapshot {
    #[allow(dead_code)]
    pub fn family(&self, name: &str) -> Option<&Family> {
        self.families.iter().find(|f| f.name == name)
    }

    /// Total number of series across all families.
    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.families.iter().map(|f| f.series.len()).sum()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Family {
    /// Finds the series whose label `name` equals `value`.
    #[allow(dead_code)]
    pub fn find(&self, name: &str, value: &str) -> Option<&Series> {
        self.series.iter().find(|s| s.labels.get(name) == Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::catalog::*;
    use crate::metrics::LabelSchema;

    fn device_labels(gpu: &str) -> LabelSet {
        LabelSchema::Device
            .names()
            .iter()
            .map(|name| (*name, if *name == "gpu" { gpu } else { "x" }))
            .collect()
    }

    #[test]
    fn duplicate_descriptor_is_rejected() {
        let descriptor = Descriptor::gauge("test_gauge", "help", LabelSchema::Node);
        let result = Registry::with_descriptors(&[descriptor, descriptor]);

        assert_eq!(
            result.err(),
            Some(RegistryError::DuplicateDescriptor("test_gauge".to_string()))
        );
    }

    #[test]
    fn catalog_registers_cleanly() {
        let registry = Registry::with_catalog().expect("catalog has duplicates");
        assert_eq!(registry.descriptors().count(), CATALOG.len());
        assert!(registry.is_empty());
    }

    #[test]
    fn unknown_descriptor() {
        let registry = Registry::with_catalog().unwrap();

        assert_eq!(
            registry.upsert("not_a_metric", LabelSet::new(), 1.0),
            Err(RegistryError::UnknownDescriptor("not_a_metric".to_string()))
        );
    }

    #[test]
    fn label_schema_mismatch() {
        let registry = Registry::with_catalog().unwrap();

        let missing = LabelSet::new().with("gpu", "0");
        assert!(matches!(
            registry.upsert(DEV_GPU_TEMP, missing, 30.0),
            Err(RegistryError::LabelSchemaMismatch { .. })
        ));

        let extra = device_labels("0").with("extra", "1");
        match registry.upsert(DEV_GPU_TEMP, extra, 30.0) {
            Err(RegistryError::LabelSchemaMismatch {
                missing,
                unexpected,
                ..
            }) => {
                assert!(missing.is_empty());
                assert_eq!(unexpected, vec!["extra".to_string()]);
            }
            other => panic!("unexpected result: {other:?}"),
        }

        assert!(registry.is_empty());
    }

    #[test]
    fn gauge_replaces() {
        let registry = Registry::with_catalog().unwrap();

        registry.upsert(DEV_GPU_TEMP, device_labels("0"), 30.0).unwrap();
        registry.upsert(DEV_GPU_TEMP, device_labels("0"), 35.0).unwrap();

        let snapshot = registry.snapshot();
        let family = snapshot.family(DEV_GPU_TEMP).unwrap();
        assert_eq!(family.series.len(), 1);
        assert_eq!(family.series[0].value, 35.0);
    }

    #[test]
    fn counter_accumulates() {
        let registry = Registry::with_catalog().unwrap();

        registry.upsert(DEV_RETIRED_SBE, device_labels("0"), 2.0).unwrap();
        registry.upsert(DEV_RETIRED_SBE, device_labels("0"), 3.0).unwrap();
        registry.upsert(DEV_RETIRED_SBE, device_labels("0"), 0.0).unwrap();

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.family(DEV_RETIRED_SBE).unwrap().series[0].value, 5.0);
    }

    #[test]
    fn counter_rejects_negative_delta() {
        let registry = Registry::with_catalog().unwrap();

        registry.upsert(DEV_RETIRED_DBE, device_labels("0"), 1.0).unwrap();

        assert!(matches!(
            registry.upsert(DEV_RETIRED_DBE, device_labels("0"), -1.0),
            Err(RegistryError::InvalidDelta { .. })
        ));
        assert!(matches!(
            registry.upsert(DEV_RETIRED_DBE, device_labels("0"), f64::NAN),
            Err(RegistryError::InvalidDelta { .. })
        ));

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.family(DEV_RETIRED_DBE).unwrap().series[0].value, 1.0);
    }

    #[test]
    fn distinct_label_sets_are_distinct_series() {
        let registry = Registry::with_catalog().unwrap();

        registry.upsert(DEV_FB_USED, device_labels("0"), 1.0).unwrap();
        registry.upsert(DEV_FB_USED, device_labels("1"), 2.0).unwrap();

        let snapshot = registry.snapshot();
        let family = snapshot.family(DEV_FB_USED).unwrap();
        assert_eq!(family.series.len(), 2);
        assert_eq!(family.find("gpu", "1").unwrap().value, 2.0);
    }

    #[test]
    fn invalid_batch_is_not_applied() {
        let registry = Registry::with_catalog().unwrap();

        let mut good = Batch::new("nvidia0");
        good.push(DEV_FB_USED, &device_labels("0"), 10.0);
        good.push(DEV_FB_FREE, &device_labels("0"), 90.0);

        let mut bad = Batch::new("nvidia1");
        bad.push(DEV_FB_USED, &device_labels("1"), 10.0);
        bad.push(DEV_FB_FREE, &LabelSet::new(), 90.0);

        let report = registry.commit(vec![good, bad]);

        assert_eq!(report.batches, 1);
        assert_eq!(report.samples, 2);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].scope, "nvidia1");

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.commits, 1);
        assert!(snapshot.family(DEV_FB_USED).unwrap().find("gpu", "1").is_none());
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn rejected_batch_keeps_prior_values() {
        let registry = Registry::with_catalog().unwrap();

        let mut first = Batch::new("nvidia0");
        first.push(DEV_FB_USED, &device_labels("0"), 10.0);
        first.push(DEV_FB_FREE, &device_labels("0"), 90.0);
        registry.commit(vec![first]);

        let mut second = Batch::new("nvidia0");
        second.push(DEV_FB_USED, &device_labels("0"), 40.0);
        second.push(DEV_FB_FREE, &device_labels("0"), 60.0);
        second.push(DEV_RETIRED_SBE, &device_labels("0"), -1.0);
        let report = registry.commit(vec![second]);
        assert_eq!(report.rejected.len(), 1);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.family(DEV_FB_USED).unwrap().series[0].value, 10.0);
        assert_eq!(snapshot.family(DEV_FB_FREE).unwrap().series[0].value, 90.0);
    }

    #[test]
    fn snapshot_lists_every_descriptor() {
        let registry = Registry::with_catalog().unwrap();
        let snapshot = registry.snapshot();

        assert_eq!(snapshot.families.len(), CATALOG.len());
        assert!(snapshot.is_empty());
    }

    #[test]
    fn snapshots_never_observe_a_partial_cycle() {
        use crate::samplers::{Generator, NodeIdentity};
        use rand::rngs::StdRng;
        use rand::SeedableRng;
        use std::sync::atomic::{AtomicBool, Ordering};

        let registry = Registry::with_catalog().unwrap();
        let done = AtomicBool::new(false);

        let node = NodeIdentity {
            name: "node-a".to_string(),
            pool_id: "np-1".to_string(),
            pod_source: "ecs".to_string(),
            driver_version: "1.5.1-1d747a".to_string(),
        };
        let mut generator = Generator::new(node, 16, StdRng::seed_from_u64(21));

        let (registry, done) = (&registry, &done);

        std::thread::scope(|s| {
            let readers: Vec<_> = (0..4)
                .map(|_| {
                    s.spawn(move || {
                        let mut snapshots = 0;

                        while !done.load(Ordering::Acquire) {
                            let snapshot = registry.snapshot();
                            let used = snapshot.family(DEV_FB_USED).unwrap();
                            let free = snapshot.family(DEV_FB_FREE).unwrap();

                            assert_eq!(used.series.len(), free.series.len());

                            for series in &used.series {
                                let free = free
                                    .series
                                    .iter()
                                    .find(|f| f.labels == series.labels)
                                    .unwrap();
                                assert_eq!(series.value + free.value, 98304.0);
                            }

                            snapshots += 1;
                        }

                        snapshots
                    })
                })
                .collect();

            for _ in 0..500 {
                let report = generator.generate_cycle(registry);
                assert!(report.rejected.is_empty());
            }

            done.store(true, Ordering::Release);

            for reader in readers {
                reader.join().unwrap();
            }
        });

        assert_eq!(registry.snapshot().commits, 500);
    }
}
