use super::device::{DeviceIdentity, MODEL_NAME};
use crate::config;
use crate::metrics::catalog::*;
use crate::metrics::{Batch, CommitReport, LabelSet, Registry};

use rand::rngs::StdRng;
use rand::Rng;
use std::ops::Range;
use tracing::{trace, warn};

// Memory sizes are in MiB.
const FB_TOTAL: f64 = 98304.0;
const FB_USED_IDLE: Range<f64> = 18.0..118.0;
const FB_USED_BUSY: Range<f64> = 500.0..4500.0;

// Devices running a workload, these report far more framebuffer in use.
const BUSY_DEVICES: [usize; 2] = [0, 14];

const GPU_UTIL: Range<f64> = 0.0..10.0;
const MEM_COPY_UTIL: Range<f64> = 0.0..5.0;
const DRAM_ACTIVE: Range<f64> = 0.0..5.0;

// Temperatures in C, power in W.
const GPU_TEMP: Range<f64> = 30.0..40.0;
const MEMORY_TEMP_OFFSET: Range<f64> = 2.0..5.0;
const POWER_USAGE: Range<f64> = 80.0..95.0;

// Clocks in MHz.
const APP_MEM_CLOCK: f64 = 1800.0;
const APP_SM_CLOCK: f64 = 1700.0;
const MEM_CLOCK: f64 = 1800.0;
const SM_CLOCK: f64 = 200.0;
const VIDEO_CLOCK: f64 = 1000.0;

const THROTTLE_IDLE: f64 = 1.0;
const THROTTLE_POWER_LIMIT: f64 = 5.0;
const THROTTLE_POWER_LIMIT_PROBABILITY: f64 = 0.2;

/// A process found using a device it was not allocated.
struct IllegalProcess {
    device: usize,
    mem_copy_util: f64,
    mem_used: f64,
}

static ILLEGAL_PROCESSES: [IllegalProcess; 2] = [
    IllegalProcess {
        device: 0,
        mem_copy_util: 0.0,
        mem_used: 544.0,
    },
    IllegalProcess {
        device: 14,
        mem_copy_util: 4.0,
        mem_used: 4454.0,
    },
];

/// Identity of the node, applied to the labels of every series.
#[derive(Clone, Debug)]
pub struct NodeIdentity {
    pub name: String,
    pub pool_id: String,
    pub pod_source: String,
    pub driver_version: String,
}

impl From<&config::Node> for NodeIdentity {
    fn from(node: &config::Node) -> Self {
        Self {
            name: node.name().to_string(),
            pool_id: node.pool_id().to_string(),
            pod_source: node.pod_source().to_string(),
            driver_version: node.driver_version().to_string(),
        }
    }
}

/// The values drawn for one device in one cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceSample {
    pub fb_total: f64,
    pub fb_used: f64,
    pub fb_free: f64,
    pub gpu_util: f64,
    pub mem_copy_util: f64,
    pub dram_active: f64,
    pub gpu_temp: f64,
    pub memory_temp: f64,
    pub power_usage: f64,
    pub throttle_reasons: f64,
}

impl DeviceSample {
    pub fn draw<R: Rng>(index: usize, rng: &mut R) -> Self {
        let fb_used = if BUSY_DEVICES.contains(&index) {
            rng.random_range(FB_USED_BUSY)
        } else {
            rng.random_range(FB_USED_IDLE)
        };

        let throttle_reasons = if rng.random_bool(THROTTLE_POWER_LIMIT_PROBABILITY) {
            THROTTLE_POWER_LIMIT
        } else {
            THROTTLE_IDLE
        };

        let gpu_util = rng.random_range(GPU_UTIL);
        let mem_copy_util = rng.random_range(MEM_COPY_UTIL);
        let gpu_temp = rng.random_range(GPU_TEMP);
        let memory_temp = gpu_temp + rng.random_range(MEMORY_TEMP_OFFSET);
        let power_usage = rng.random_range(POWER_USAGE);
        let dram_active = rng.random_range(DRAM_ACTIVE);

        Self {
            fb_total: FB_TOTAL,
            fb_used,
            fb_free: FB_TOTAL - fb_used,
            gpu_util,
            mem_copy_util,
            dram_active,
            gpu_temp,
            memory_temp,
            power_usage,
            throttle_reasons,
        }
    }
}

/// Produces a consistent set of values for every simulated device on each
/// cycle and writes them into the registry.
pub struct Generator {
    node: NodeIdentity,
    devices: Vec<DeviceIdentity>,
    rng: StdRng,
}

impl Generator {
    /// Device identities are resolved once here and reused on every cycle so
    /// that synthesized UUIDs stay stable for the life of the process.
    pub fn new(node: NodeIdentity, device_count: usize, mut rng: StdRng) -> Self {
        let devices = (0..device_count)
            .map(|index| DeviceIdentity::resolve(index, &mut rng))
            .collect();

        Self { node, devices, rng }
    }

    pub fn devices(&self) -> &[DeviceIdentity] {
        &self.devices
    }

    /// Run one cycle against the registry. Devices whose writes are rejected
    /// keep the values from the previous cycle.
    pub fn generate_cycle(&mut self, registry: &Registry) -> CommitReport {
        let report = registry.commit(self.cycle());

        for rejection in &report.rejected {
            warn!(
                "skipping update for {}: {}",
                rejection.scope, rejection.error
            );
        }

        trace!(
            "cycle wrote {} samples across {} batches",
            report.samples,
            report.batches
        );

        report
    }

    /// Draw the writes for one cycle. There is one batch for node level
    /// metrics and one per device, each applied atomically.
    pub fn cycle(&mut self) -> Vec<Batch> {
        if self.devices.is_empty() {
            return Vec::new();
        }

        let mut batches = Vec::with_capacity(self.devices.len() + 1);

        let mut node = Batch::new(self.node.name.clone());
        let labels = LabelSet::new();
        node.push(CUSTOM_ALLOCATE_MODE, &labels, 0.0);
        node.push(DEV_COUNT, &labels, self.devices.len() as f64);
        batches.push(node);

        for device in &self.devices {
            let sample = DeviceSample::draw(device.index(), &mut self.rng);
            batches.push(self.device_batch(device, &sample));
        }

        batches
    }

    fn device_batch(&self, device: &DeviceIdentity, sample: &DeviceSample) -> Batch {
        let mut batch = Batch::new(device.name());

        let custom = self.custom_device_labels(device);
        batch.push(CUSTOM_DEV_FB_ALLOCATED, &custom, 0.0);
        batch.push(CUSTOM_DEV_FB_TOTAL, &custom, sample.fb_total);

        let labels = self.device_labels(device);

        // clocks
        batch.push(DEV_APP_MEM_CLOCK, &labels, APP_MEM_CLOCK);
        batch.push(DEV_APP_SM_CLOCK, &labels, APP_SM_CLOCK);
        batch.push(DEV_MEM_CLOCK, &labels, MEM_CLOCK);
        batch.push(DEV_SM_CLOCK, &labels, SM_CLOCK);
        batch.push(DEV_VIDEO_CLOCK, &labels, VIDEO_CLOCK);
        batch.push(DEV_CLOCK_THROTTLE_REASONS, &labels, sample.throttle_reasons);

        // memory
        batch.push(DEV_BAR1_TOTAL, &labels, sample.fb_total);
        batch.push(DEV_BAR1_USED, &labels, sample.fb_used);
        batch.push(DEV_FB_FREE, &labels, sample.fb_free);
        batch.push(DEV_FB_USED, &labels, sample.fb_used);

        // utilization
        batch.push(DEV_DEC_UTIL, &labels, 0.0);
        batch.push(DEV_ENC_UTIL, &labels, 0.0);
        batch.push(DEV_GPU_UTIL, &labels, sample.gpu_util);
        batch.push(DEV_MEM_COPY_UTIL, &labels, sample.mem_copy_util);

        // thermals and power
        batch.push(DEV_GPU_TEMP, &labels, sample.gpu_temp);
        batch.push(DEV_MEMORY_TEMP, &labels, sample.memory_temp);
        batch.push(DEV_POWER_USAGE, &labels, sample.power_usage);

        // errors, the simulated fleet never has any
        batch.push(DEV_RETIRED_DBE, &labels, 0.0);
        batch.push(DEV_RETIRED_PENDING, &labels, 0.0);
        batch.push(DEV_RETIRED_SBE, &labels, 0.0);
        batch.push(DEV_XID_ERRORS, &labels, 0.0);

        // interconnect
        batch.push(DEV_NVLINK_BANDWIDTH_TOTAL, &labels, 0.0);
        batch.push(PROF_NVLINK_RX_BYTES, &labels, 0.0);
        batch.push(PROF_NVLINK_TX_BYTES, &labels, 0.0);
        batch.push(PROF_PCIE_RX_BYTES, &labels, 0.0);
        batch.push(PROF_PCIE_TX_BYTES, &labels, 0.0);

        batch.push(PROF_DRAM_ACTIVE, &labels, sample.dram_active);

        if let Some(process) = ILLEGAL_PROCESSES
            .iter()
            .find(|p| p.device == device.index())
        {
            let labels = self.illegal_process_labels(device);
            batch.push(CUSTOM_ILLEGAL_PROCESS_DECODE_UTIL, &labels, 0.0);
            batch.push(CUSTOM_ILLEGAL_PROCESS_ENCODE_UTIL, &labels, 0.0);
            batch.push(
                CUSTOM_ILLEGAL_PROCESS_MEM_COPY_UTIL,
                &labels,
                process.mem_copy_util,
            );
            batch.push(CUSTOM_ILLEGAL_PROCESS_MEM_USED, &labels, process.mem_used);
            batch.push(CUSTOM_ILLEGAL_PROCESS_SM_UTIL, &labels, 0.0);
        }

        batch
    }

    // The upstream DCGM exporter leaves `modelName` blank on device scoped
    // series, only the custom series carry it.
    fn device_labels(&self, device: &DeviceIdentity) -> LabelSet {
        let gpu = device.index().to_string();
        LabelSet::from_iter([
            ("Hostname", self.node.name.as_str()),
            ("NodeName", self.node.name.as_str()),
            ("NodePoolId", self.node.pool_id.as_str()),
            ("PodSource", self.node.pod_source.as_str()),
            ("UUID", device.uuid()),
            ("device", device.name()),
            ("gpu", gpu.as_str()),
            ("modelName", ""),
        ])
    }

    fn custom_device_labels(&self, device: &DeviceIdentity) -> LabelSet {
        let gpu = device.index().to_string();
        LabelSet::from_iter([
            ("DriverVersion", self.node.driver_version.as_str()),
            ("NodeName", self.node.name.as_str()),
            ("NodePoolId", self.node.pool_id.as_str()),
            ("PodSource", self.node.pod_source.as_str()),
            ("SupportDCGM", "Yes"),
            ("UUID", device.uuid()),
            ("device", device.name()),
            ("gpu", gpu.as_str()),
            ("modelName", MODEL_NAME),
        ])
    }

    fn illegal_process_labels(&self, device: &DeviceIdentity) -> LabelSet {
        let gpu = device.index().to_string();
        LabelSet::from_iter([
            ("AllocateMode", "none"),
            ("ContainerName", ""),
            ("NamespaceName", ""),
            ("NodeName", self.node.name.as_str()),
            ("NodePoolId", self.node.pool_id.as_str()),
            ("PodName", ""),
            ("PodSource", self.node.pod_source.as_str()),
            ("ProcessId", "3003"),
            ("ProcessName", "python"),
            ("ProcessType", "C"),
            ("UUID", device.uuid()),
            ("device", device.name()),
            ("gpu", gpu.as_str()),
            ("modelName", MODEL_NAME),
        ])
    }
}
