use metriken::*;

#[metric(
    name = "exporter_generation_cycles",
    description = "The number of generation cycles the exporter has run"
)]
pub static CYCLES: LazyCounter = LazyCounter::new(Counter::default);

#[metric(
    name = "exporter_generation_latency",
    description = "The time taken by the most recent generation cycle",
    metadata = { unit = "nanoseconds" }
)]
pub static CYCLE_LATENCY: LazyGauge = LazyGauge::new(Gauge::default);

#[metric(
    name = "exporter_samples_written",
    description = "The number of samples written into the metric registry"
)]
pub static SAMPLES_WRITTEN: LazyCounter = LazyCounter::new(Counter::default);

#[metric(
    name = "exporter_devices_skipped",
    description = "The number of device updates skipped due to a rejected write"
)]
pub static DEVICES_SKIPPED: LazyCounter = LazyCounter::new(Counter::default);

#[metric(
    name = "exporter_series",
    description = "The number of live series held by the metric registry"
)]
pub static SERIES: LazyGauge = LazyGauge::new(Gauge::default);
