const NAME: &str = "ppu";

use crate::config::Config;
use crate::metrics::Registry;
use crate::samplers::*;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::Mutex;
use tracing::info;

mod device;
mod generator;
mod stats;

pub(crate) use generator::Generator;

#[cfg(test)]
pub(crate) use generator::NodeIdentity;

use stats::*;

#[distributed_slice(SAMPLERS)]
fn init(config: Arc<Config>, registry: Arc<Registry>) -> SamplerResult {
    let rng = match config.devices().seed() {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::try_from_os_rng()?,
    };

    let generator = Generator::new(config.node().into(), config.devices().count(), rng);

    info!(
        "simulating {} {} devices on node {}",
        generator.devices().len(),
        device::MODEL_NAME,
        config.node().name()
    );

    Ok(Some(Box::new(Ppu {
        registry,
        inner: generator.into(),
    })))
}

struct Ppu {
    registry: Arc<Registry>,
    inner: Mutex<Generator>,
}

#[async_trait]
impl Sampler for Ppu {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn refresh(&self) {
        let mut generator = self.inner.lock().await;

        let start = Instant::now();
        let report = generator.generate_cycle(&self.registry);

        CYCLES.increment();
        CYCLE_LATENCY.set(start.elapsed().as_nanos() as i64);
        SAMPLES_WRITTEN.add(report.samples as u64);
        DEVICES_SKIPPED.add(report.rejected.len() as u64);
        SERIES.set(self.registry.len() as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::catalog::DEV_FB_USED;

    #[tokio::test]
    async fn refresh_populates_registry() {
        let config = Arc::new(Config::default());
        let registry = Arc::new(Registry::with_catalog().unwrap());

        let sampler = init(config, registry.clone())
            .unwrap()
            .expect("sampler should be enabled");

        assert_eq!(sampler.name(), "ppu");
        assert!(registry.is_empty());

        let cycles = CYCLES.value();
        let written = SAMPLES_WRITTEN.value();

        sampler.refresh().await;

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.commits, 1);
        assert_eq!(snapshot.family(DEV_FB_USED).unwrap().series.len(), 16);

        // other tests may refresh concurrently, so only lower bounds hold
        assert!(CYCLES.value() > cycles);
        assert!(SAMPLES_WRITTEN.value() >= written + snapshot.len() as u64);
        assert!(SERIES.value() > 0);
    }
}
