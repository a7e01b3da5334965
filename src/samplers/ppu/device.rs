use rand::Rng;

/// Model name reported for every simulated device.
pub const MODEL_NAME: &str = "PPU-ZW810E";

const DEVICE_PREFIX: &str = "nvidia";

// Identifiers taken from a real 16-device node so demo output is stable and
// looks plausible.
static CANNED_UUIDS: [&str; 16] = [
    "GPU-019e0219-0331-020a-0000-0000608e8e2e",
    "GPU-019e0225-c611-0110-0000-0000c0663c0e",
    "GPU-019e120d-8850-032c-0000-0000406a3958",
    "GPU-019e120d-8930-0516-0000-000040b6030b",
    "GPU-019e1211-40c0-0624-0000-000060f3f056",
    "GPU-019e1211-4120-0524-0000-0000c09f426b",
    "GPU-019e1215-0231-0014-0000-000060512b5e",
    "GPU-019e1215-0241-0820-0000-0000a0087936",
    "GPU-019e1215-0281-0210-0000-0000a0d60a51",
    "GPU-019e1215-c280-0416-0000-0000407aa063",
    "GPU-019e1215-c2a0-0226-0000-0000c0c6fa0a",
    "GPU-019e4201-0591-0330-0000-000060416e2b",
    "GPU-019e4201-8920-0430-0000-0000605abd70",
    "GPU-019e4201-8920-0614-0000-0000603e9c39",
    "GPU-019e4201-8930-0014-0000-000020029626",
    "GPU-019ec20c-49c2-0224-0000-0000e02b8d24",
];

/// The identity attributes of one simulated device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceIdentity {
    index: usize,
    uuid: String,
    name: String,
}

impl DeviceIdentity {
    /// Resolve the identity of the device at `index`.
    ///
    /// Indices covered by the canned table always resolve to the same UUID
    /// and leave `rng` untouched. Beyond the table a UUID is synthesized from
    /// the index plus random fill, so it differs between runs. Callers that
    /// need a stable identity for the whole run should resolve once and keep
    /// the result.
    pub fn resolve<R: Rng>(index: usize, rng: &mut R) -> Self {
        let uuid = match canned_uuid(index) {
            Some(uuid) => uuid.to_string(),
            None => format!(
                "GPU-019e{:04}-{:04}-{:04}-0000-0000{:08x}",
                index,
                rng.random_range(0..10_000u32),
                rng.random_range(0..10_000u32),
                rng.random_range(0..0xFFFF_FFFFu32),
            ),
        };

        Self {
            index,
            uuid,
            name: device_name(index),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[allow(dead_code)]
    pub fn model(&self) -> &'static str {
        MODEL_NAME
    }
}

pub fn canned_uuid(index: usize) -> Option<&'static str> {
    CANNED_UUIDS.get(index).copied()
}

pub fn device_name(index: usize) -> String {
    format!("{DEVICE_PREFIX}{index}")
}
