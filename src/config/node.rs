use super::*;

fn name() -> String {
    "ppu-worker-mock".into()
}

fn pool_id() -> String {
    "default".into()
}

fn pod_source() -> String {
    "ecs".into()
}

fn driver_version() -> String {
    "1.5.1-1d747a".into()
}

/// Identity of the node the simulated devices are attached to. These values
/// are passed through to the labels of every series untouched.
#[derive(Deserialize)]
pub struct Node {
    #[serde(default = "name")]
    pub(super) name: String,
    #[serde(default = "pool_id")]
    pub(super) pool_id: String,
    #[serde(default = "pod_source")]
    pub(super) pod_source: String,
    #[serde(default = "driver_version")]
    pub(super) driver_version: String,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            name: name(),
            pool_id: pool_id(),
            pod_source: pod_source(),
            driver_version: driver_version(),
        }
    }
}

impl Node {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pool_id(&self) -> &str {
        &self.pool_id
    }

    pub fn pod_source(&self) -> &str {
        &self.pod_source
    }

    pub fn driver_version(&self) -> &str {
        &self.driver_version
    }
}
