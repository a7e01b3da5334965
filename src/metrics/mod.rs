pub mod catalog;

mod descriptor;
mod labels;
mod registry;

pub use descriptor::{Descriptor, LabelSchema, MetricKind};
pub use labels::LabelSet;
pub use registry::{Batch, CommitReport, Family, Registry, Snapshot};

#[cfg(test)]
pub use registry::RegistryError;
