use backtrace::Backtrace;
use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};
use tracing_subscriber::filter::LevelFilter;

mod config;
mod exposition;
mod metrics;
mod samplers;

use config::Config;
use metrics::Registry;

fn main() {
    // custom panic hook to terminate whole process after unwinding
    std::panic::set_hook(Box::new(|s| {
        eprintln!("{s}");
        eprintln!("{:?}", Backtrace::new());
        std::process::exit(101);
    }));

    let config: Arc<Config> = match Config::try_from(command().get_matches()) {
        Ok(c) => c.into(),
        Err(error) => {
            eprintln!("error loading config: {error}");
            std::process::exit(1);
        }
    };

    // configure debug log, the guard flushes on drop so it must outlive the
    // runtime
    let (writer, _guard) = tracing_appender::non_blocking(std::io::stderr());

    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::from(config.log().level()))
        .with_writer(writer)
        .init();

    // both were validated during config load
    let (listen, period) = match (config.general().listen(), config.general().interval()) {
        (Ok(listen), Ok(period)) => (listen, period),
        (Err(e), _) | (_, Err(e)) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    let registry: Arc<Registry> = match Registry::with_catalog() {
        Ok(r) => r.into(),
        Err(e) => {
            error!("failed to register metric catalog: {e}");
            std::process::exit(1);
        }
    };

    debug!("registered {} metric descriptors", registry.descriptors().count());

    // initialize async runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("ppu-exporter")
        .build()
        .expect("failed to launch async runtime");

    ctrlc::set_handler(move || {
        std::process::exit(2);
    })
    .expect("failed to set ctrl-c handler");

    let samplers = samplers::init(config.clone(), registry.clone());

    if samplers.is_empty() {
        error!("no samplers were initialized");
        std::process::exit(1);
    }

    // regenerate on a fixed period, the first tick completes immediately so
    // the registry is populated before the first scrape arrives
    rt.spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            samplers::refresh(&samplers).await;
        }
    });

    info!(
        "ppu-exporter {} regenerating every {}",
        env!("CARGO_PKG_VERSION"),
        humantime::format_duration(period)
    );

    if let Err(e) = rt.block_on(exposition::http::serve(listen, registry)) {
        error!("failed to serve metrics on {listen}: {e}");
        std::process::exit(1);
    }
}

pub fn command() -> Command {
    Command::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_about(
            "Serves synthetic PPU accelerator telemetry as DCGM-compatible \
            Prometheus metrics.",
        )
        .arg(
            Arg::new("CONFIG")
                .help("Exporter configuration file")
                .value_parser(value_parser!(PathBuf))
                .action(ArgAction::Set)
                .index(1),
        )
        .arg(
            Arg::new("NODE_NAME")
                .long("node-name")
                .help("Node name attached to every series")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("NODE_POOL_ID")
                .long("node-pool-id")
                .help("Node pool identifier attached to every series")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("POD_SOURCE")
                .long("pod-source")
                .help("Value of the PodSource label")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("DRIVER_VERSION")
                .long("driver-version")
                .help("Value of the DriverVersion label")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("PORT")
                .long("port")
                .help("Listen on 0.0.0.0 at this port")
                .value_parser(value_parser!(u16))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("GPU_COUNT")
                .long("gpu-count")
                .help("Number of simulated devices")
                .value_parser(value_parser!(usize))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("SEED")
                .long("seed")
                .help("Seed for reproducible values and identities")
                .value_parser(value_parser!(u64))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("VERBOSE")
                .short('v')
                .long("verbose")
                .help("Increase log verbosity, repeat for more")
                .action(ArgAction::Count),
        )
}
