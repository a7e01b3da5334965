use serde::Serialize;

/// How successive writes to a series combine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// A point-in-time value, replaced on every write.
    Gauge,
    /// A monotonically non-decreasing value, each write adds a delta.
    Counter,
}

/// The fixed label shapes a descriptor may declare.
///
/// Label names are kept in lexicographic order, which is also the order in
/// which a [`LabelSet`](super::LabelSet) iterates and the order they are
/// exposed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelSchema {
    /// Node-level metrics with no labels at all.
    Node,
    /// Host and node identity plus device identity.
    Device,
    /// Device identity plus driver version and the DCGM support flag. Carries
    /// no hostname.
    CustomDevice,
    /// Device identity plus attribution of the offending process and workload.
    IllegalProcess,
}

const DEVICE_LABELS: &[&str] = &[
    "Hostname",
    "NodeName",
    "NodePoolId",
    "PodSource",
    "UUID",
    "device",
    "gpu",
    "modelName",
];

const CUSTOM_DEVICE_LABELS: &[&str] = &[
    "DriverVersion",
    "NodeName",
    "NodePoolId",
    "PodSource",
    "SupportDCGM",
    "UUID",
    "device",
    "gpu",
    "modelName",
];

const ILLEGAL_PROCESS_LABELS: &[&str] = &[
    "AllocateMode",
    "ContainerName",
    "NamespaceName",
    "NodeName",
    "NodePoolId",
    "PodName",
    "PodSource",
    "ProcessId",
    "ProcessName",
    "ProcessType",
    "UUID",
    "device",
    "gpu",
    "modelName",
];

impl LabelSchema {
    pub const fn names(self) -> &'static [&'static str] {
        match self {
            Self::Node => &[],
            Self::Device => DEVICE_LABELS,
            Self::CustomDevice => CUSTOM_DEVICE_LABELS,
            Self::IllegalProcess => ILLEGAL_PROCESS_LABELS,
        }
    }
}

/// Immutable metadata for one metric family.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Descriptor {
    name: &'static str,
    help: &'static str,
    kind: MetricKind,
    schema: LabelSchema,
}

impl Descriptor {
    pub const fn gauge(name: &'static str, help: &'static str, schema: LabelSchema) -> Self {
        Self {
            name,
            help,
            kind: MetricKind::Gauge,
            schema,
        }
    }

    pub const fn counter(name: &'static str, help: &'static str, schema: LabelSchema) -> Self {
        Self {
            name,
            help,
            kind: MetricKind::Counter,
            schema,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn help(&self) -> &'static str {
        self.help
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    #[allow(dead_code)]
    pub fn schema(&self) -> LabelSchema {
        self.schema
    }

    pub fn label_names(&self) -> &'static [&'static str] {
        self.schema.names()
    }
}
