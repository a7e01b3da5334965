use crate::config::Config;
use crate::metrics::Registry;

use async_trait::async_trait;
use linkme::distributed_slice;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

mod ppu;

#[cfg(test)]
pub(crate) use ppu::{Generator, NodeIdentity};

#[distributed_slice]
pub static SAMPLERS: [fn(config: Arc<Config>, registry: Arc<Registry>) -> SamplerResult] = [..];

#[async_trait]
pub trait Sampler: Send + Sync {
    fn name(&self) -> &'static str;

    /// Produce a new set of values and write them into the registry.
    async fn refresh(&self);

    async fn refresh_with_logging(&self) {
        let start = Instant::now();
        self.refresh().await;
        debug!(
            "{} refresh latency: {} us",
            self.name(),
            start.elapsed().as_micros()
        );
    }
}

pub type SamplerResult = anyhow::Result<Option<Box<dyn Sampler>>>;

/// Initialize every registered sampler. Samplers which fail to initialize
/// are logged and left out.
pub fn init(config: Arc<Config>, registry: Arc<Registry>) -> Box<[Box<dyn Sampler>]> {
    let mut samplers = Vec::new();

    for init in SAMPLERS {
        match init(config.clone(), registry.clone()) {
            Ok(Some(s)) => samplers.push(s),
            Ok(None) => {}
            Err(e) => tracing::error!("failed to initialize sampler: {e}"),
        }
    }

    samplers.into_boxed_slice()
}

/// Refresh every sampler concurrently.
pub async fn refresh(samplers: &[Box<dyn Sampler>]) {
    let s: Vec<_> = samplers.iter().map(|s| s.refresh_with_logging()).collect();

    let start = Instant::now();
    futures::future::join_all(s).await;
    debug!("sampling latency: {} us", start.elapsed().as_micros());
}
