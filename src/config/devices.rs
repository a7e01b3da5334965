use super::*;

fn count() -> usize {
    16
}

#[derive(Deserialize)]
pub struct Devices {
    #[serde(default = "count")]
    pub(super) count: usize,

    // fixes the random source, making every cycle reproducible
    #[serde(default)]
    pub(super) seed: Option<u64>,
}

impl Default for Devices {
    fn default() -> Self {
        Self {
            count: count(),
            seed: None,
        }
    }
}

impl Devices {
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }
}
