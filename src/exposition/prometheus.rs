use crate::metrics::{Family, MetricKind, Snapshot};

use prometheus::proto::{Counter, Gauge, LabelPair, Metric, MetricFamily, MetricType};
use prometheus::{Encoder, TextEncoder};

pub use prometheus::TEXT_FORMAT;

/// Convert a registry snapshot into metric families for the Prometheus text
/// encoder. Families without any series are left out.
pub fn families(snapshot: &Snapshot) -> Vec<MetricFamily> {
    snapshot
        .families
        .iter()
        .filter(|family| !family.series.is_empty())
        .map(family)
        .collect()
}

fn family(family: &Family) -> MetricFamily {
    let mut mf = MetricFamily::default();
    mf.set_name(family.name.to_string());
    mf.set_help(family.help.to_string());
    mf.set_field_type(match family.kind {
        MetricKind::Gauge => MetricType::GAUGE,
        MetricKind::Counter => MetricType::COUNTER,
    });

    for series in &family.series {
        let mut metric = Metric::default();

        for (name, value) in series.labels.iter() {
            let mut pair = LabelPair::default();
            pair.set_name(name.to_string());
            pair.set_value(value.to_string());
            metric.mut_label().push(pair);
        }

        match family.kind {
            MetricKind::Gauge => {
                let mut gauge = Gauge::default();
                gauge.set_value(series.value);
                metric.set_gauge(gauge);
            }
            MetricKind::Counter => {
                let mut counter = Counter::default();
                counter.set_value(series.value);
                metric.set_counter(counter);
            }
        }

        mf.mut_metric().push(metric);
    }

    mf
}

/// Render a snapshot in the Prometheus text exposition format.
pub fn encode(snapshot: &Snapshot) -> prometheus::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&families(snapshot), &mut buffer)?;
    Ok(buffer)
}
