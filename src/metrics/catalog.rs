//! The catalog of metrics exposed by the exporter.
//!
//! Names and help text follow the DCGM exporter so existing dashboards and
//! alert rules work against the simulated fleet unchanged.

use super::{Descriptor, LabelSchema::*};

// Custom metrics

pub const CUSTOM_ALLOCATE_MODE: &str = "DCGM_CUSTOM_ALLOCATE_MODE";
pub const CUSTOM_DEV_FB_ALLOCATED: &str = "DCGM_CUSTOM_DEV_FB_ALLOCATED";
pub const CUSTOM_DEV_FB_TOTAL: &str = "DCGM_CUSTOM_DEV_FB_TOTAL";
pub const CUSTOM_ILLEGAL_PROCESS_DECODE_UTIL: &str = "DCGM_CUSTOM_ILLEGAL_PROCESS_DECODE_UTIL";
pub const CUSTOM_ILLEGAL_PROCESS_ENCODE_UTIL: &str = "DCGM_CUSTOM_ILLEGAL_PROCESS_ENCODE_UTIL";
pub const CUSTOM_ILLEGAL_PROCESS_MEM_COPY_UTIL: &str = "DCGM_CUSTOM_ILLEGAL_PROCESS_MEM_COPY_UTIL";
pub const CUSTOM_ILLEGAL_PROCESS_MEM_USED: &str = "DCGM_CUSTOM_ILLEGAL_PROCESS_MEM_USED";
pub const CUSTOM_ILLEGAL_PROCESS_SM_UTIL: &str = "DCGM_CUSTOM_ILLEGAL_PROCESS_SM_UTIL";

// Device telemetry

pub const DEV_APP_MEM_CLOCK: &str = "DCGM_FI_DEV_APP_MEM_CLOCK";
pub const DEV_APP_SM_CLOCK: &str = "DCGM_FI_DEV_APP_SM_CLOCK";
pub const DEV_BAR1_TOTAL: &str = "DCGM_FI_DEV_BAR1_TOTAL";
pub const DEV_BAR1_USED: &str = "DCGM_FI_DEV_BAR1_USED";
pub const DEV_CLOCK_THROTTLE_REASONS: &str = "DCGM_FI_DEV_CLOCK_THROTTLE_REASONS";
pub const DEV_COUNT: &str = "DCGM_FI_DEV_COUNT";
pub const DEV_DEC_UTIL: &str = "DCGM_FI_DEV_DEC_UTIL";
pub const DEV_ENC_UTIL: &str = "DCGM_FI_DEV_ENC_UTIL";
pub const DEV_FB_FREE: &str = "DCGM_FI_DEV_FB_FREE";
pub const DEV_FB_USED: &str = "DCGM_FI_DEV_FB_USED";
pub const DEV_GPU_TEMP: &str = "DCGM_FI_DEV_GPU_TEMP";
pub const DEV_GPU_UTIL: &str = "DCGM_FI_DEV_GPU_UTIL";
pub const DEV_MEMORY_TEMP: &str = "DCGM_FI_DEV_MEMORY_TEMP";
pub const DEV_MEM_CLOCK: &str = "DCGM_FI_DEV_MEM_CLOCK";
pub const DEV_MEM_COPY_UTIL: &str = "DCGM_FI_DEV_MEM_COPY_UTIL";
pub const DEV_NVLINK_BANDWIDTH_TOTAL: &str = "DCGM_FI_DEV_NVLINK_BANDWIDTH_TOTAL";
pub const DEV_POWER_USAGE: &str = "DCGM_FI_DEV_POWER_USAGE";
pub const DEV_RETIRED_DBE: &str = "DCGM_FI_DEV_RETIRED_DBE";
pub const DEV_RETIRED_PENDING: &str = "DCGM_FI_DEV_RETIRED_PENDING";
pub const DEV_RETIRED_SBE: &str = "DCGM_FI_DEV_RETIRED_SBE";
pub const DEV_SM_CLOCK: &str = "DCGM_FI_DEV_SM_CLOCK";
pub const DEV_VIDEO_CLOCK: &str = "DCGM_FI_DEV_VIDEO_CLOCK";
pub const DEV_XID_ERRORS: &str = "DCGM_FI_DEV_XID_ERRORS";

// Profiling

pub const PROF_DRAM_ACTIVE: &str = "DCGM_FI_PROF_DRAM_ACTIVE";
pub const PROF_NVLINK_RX_BYTES: &str = "DCGM_FI_PROF_NVLINK_RX_BYTES";
pub const PROF_NVLINK_TX_BYTES: &str = "DCGM_FI_PROF_NVLINK_TX_BYTES";
pub const PROF_PCIE_RX_BYTES: &str = "DCGM_FI_PROF_PCIE_RX_BYTES";
pub const PROF_PCIE_TX_BYTES: &str = "DCGM_FI_PROF_PCIE_TX_BYTES";

pub static CATALOG: &[Descriptor] = &[
    Descriptor::gauge(
        CUSTOM_ALLOCATE_MODE,
        "GPU allocate mode of node,value in [None:0,Exclusive:1,Share:2]",
        Node,
    ),
    Descriptor::gauge(
        CUSTOM_DEV_FB_ALLOCATED,
        "Allocated framebuffer memory ratio(0~1) of device,it is a custom metric created by ack",
        CustomDevice,
    ),
    Descriptor::gauge(
        CUSTOM_DEV_FB_TOTAL,
        "Total framebuffer memory of device(in MiB),it is a custom metric created by ack",
        CustomDevice,
    ),
    Descriptor::gauge(
        CUSTOM_ILLEGAL_PROCESS_DECODE_UTIL,
        "Decode utilization of illegal gpu process(container request gpus with NVIDIA_VISIBLE_DEVICES=all),it is a custom metric defined by ACK",
        IllegalProcess,
    ),
    Descriptor::gauge(
        CUSTOM_ILLEGAL_PROCESS_ENCODE_UTIL,
        "Encode utilization of illegal gpu process(container request gpus with NVIDIA_VISIBLE_DEVICES=all),it is a custom metric defined by ACK",
        IllegalProcess,
    ),
    Descriptor::gauge(
        CUSTOM_ILLEGAL_PROCESS_MEM_COPY_UTIL,
        "Memory copy utilization of illegal gpu process(container request gpus with NVIDIA_VISIBLE_DEVICES=all),it is a custom metric defined by ACK",
        IllegalProcess,
    ),
    Descriptor::gauge(
        CUSTOM_ILLEGAL_PROCESS_MEM_USED,
        "Used memory(in MiB) of illegal gpu process(container request gpus with NVIDIA_VISIBLE_DEVICES=all),it is a custom metric defined by ACK",
        IllegalProcess,
    ),
    Descriptor::gauge(
        CUSTOM_ILLEGAL_PROCESS_SM_UTIL,
        "SM utilization of illegal gpu process(container request gpus with NVIDIA_VISIBLE_DEVICES=all),it is a custom metric defined by ACK",
        IllegalProcess,
    ),
    Descriptor::gauge(DEV_APP_MEM_CLOCK, "Memory Application clocks(in MHz).", Device),
    Descriptor::gauge(DEV_APP_SM_CLOCK, "SM Application clocks (in MHz).", Device),
    Descriptor::gauge(DEV_BAR1_TOTAL, "Total BAR1 of the GPU in MB", Device),
    Descriptor::gauge(DEV_BAR1_USED, "Used BAR1 of the GPU in MB", Device),
    Descriptor::gauge(
        DEV_CLOCK_THROTTLE_REASONS,
        "A bitmap of why the clock is throttled.",
        Device,
    ),
    Descriptor::gauge(DEV_COUNT, "total devices on the node.", Node),
    Descriptor::gauge(DEV_DEC_UTIL, "Decoder utilization (in %).", Device),
    Descriptor::gauge(DEV_ENC_UTIL, "Encoder utilization (in %).", Device),
    Descriptor::gauge(DEV_FB_FREE, "Framebuffer memory free (in MiB).", Device),
    Descriptor::gauge(DEV_FB_USED, "Framebuffer memory used (in MiB).", Device),
    Descriptor::gauge(DEV_GPU_TEMP, "GPU temperature (in C).", Device),
    Descriptor::gauge(DEV_GPU_UTIL, "GPU utilization (in %).", Device),
    Descriptor::gauge(DEV_MEMORY_TEMP, "Memory temperature (in C).", Device),
    Descriptor::gauge(DEV_MEM_CLOCK, "Memory clock frequency (in MHz).", Device),
    Descriptor::gauge(DEV_MEM_COPY_UTIL, "Memory utilization (in %).", Device),
    Descriptor::counter(
        DEV_NVLINK_BANDWIDTH_TOTAL,
        "Total number of NVLink bandwidth counters for all lanes.",
        Device,
    ),
    Descriptor::gauge(DEV_POWER_USAGE, "Power draw (in W).", Device),
    Descriptor::counter(
        DEV_RETIRED_DBE,
        "Total number of retired pages due to double-bit errors.",
        Device,
    ),
    Descriptor::counter(
        DEV_RETIRED_PENDING,
        "Total number of pages pending retirement.",
        Device,
    ),
    Descriptor::counter(
        DEV_RETIRED_SBE,
        "Total number of retired pages due to single-bit errors.",
        Device,
    ),
    Descriptor::gauge(DEV_SM_CLOCK, "SM clock frequency (in MHz).", Device),
    Descriptor::gauge(
        DEV_VIDEO_CLOCK,
        "Video encoder/decoder clock for the device.",
        Device,
    ),
    Descriptor::gauge(
        DEV_XID_ERRORS,
        "Value of the last XID error encountered.",
        Device,
    ),
    Descriptor::gauge(
        PROF_DRAM_ACTIVE,
        "Ratio of cycles the device memory interface is active sending or receiving data (in %).",
        Device,
    ),
    Descriptor::counter(
        PROF_NVLINK_RX_BYTES,
        "The number of bytes of active NvLink rx (receive) data including both header and payload.",
        Device,
    ),
    Descriptor::counter(
        PROF_NVLINK_TX_BYTES,
        "The number of bytes of active NvLink tx (transmit) data including both header and payload.",
        Device,
    ),
    Descriptor::gauge(
        PROF_PCIE_RX_BYTES,
        "The rate of data received over the PCIe bus - including both protocol headers and data payloads - in bytes per second.",
        Device,
    ),
    Descriptor::gauge(
        PROF_PCIE_TX_BYTES,
        "The rate of data transmitted over the PCIe bus - including both protocol headers and data payloads - in bytes per second.",
        Device,
    ),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{LabelSchema, MetricKind};
    use std::collections::HashSet;

    #[test]
    fn names_are_unique() {
        let mut seen = HashSet::new();
        for descriptor in CATALOG {
            assert!(seen.insert(descriptor.name()), "{}", descriptor.name());
        }
        assert_eq!(seen.len(), 36);
    }

    #[test]
    fn counters() {
        let counters: HashSet<&str> = CATALOG
            .iter()
            .filter(|d| d.kind() == MetricKind::Counter)
            .map(|d| d.name())
            .collect();

        assert_eq!(
            counters,
            [
                DEV_NVLINK_BANDWIDTH_TOTAL,
                DEV_RETIRED_DBE,
                DEV_RETIRED_PENDING,
                DEV_RETIRED_SBE,
                PROF_NVLINK_RX_BYTES,
                PROF_NVLINK_TX_BYTES,
            ]
            .into_iter()
            .collect()
        );
    }

    #[test]
    fn node_level_gauges_are_unlabeled() {
        for descriptor in CATALOG.iter().filter(|d| d.schema() == LabelSchema::Node) {
            assert!(descriptor.label_names().is_empty());
            assert!([CUSTOM_ALLOCATE_MODE, DEV_COUNT].contains(&descriptor.name()));
        }
    }
}
