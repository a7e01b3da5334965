use clap::ArgMatches;
use serde::Deserialize;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

mod devices;
mod general;
mod log;
mod node;

pub use devices::Devices;
pub use general::General;
pub use log::{Log, LogLevel};
pub use node::Node;

fn listen() -> String {
    "0.0.0.0:8080".into()
}

fn interval() -> String {
    "30s".into()
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unable to open config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("bad listen address `{addr}`: {source}")]
    Listen {
        addr: String,
        source: std::io::Error,
    },
    #[error("could not resolve listen address `{0}`")]
    Unresolved(String),
    #[error("refresh interval `{value}` couldn't be parsed: {source}")]
    Interval {
        value: String,
        source: humantime::DurationError,
    },
    #[error("refresh interval must be greater than zero")]
    ZeroInterval,
}

#[derive(Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    general: General,
    #[serde(default)]
    node: Node,
    #[serde(default)]
    devices: Devices,
    #[serde(default)]
    log: Log,
}

impl TryFrom<ArgMatches> for Config {
    type Error = ConfigError;

    fn try_from(args: ArgMatches) -> Result<Self, Self::Error> {
        let mut config = match args.get_one::<PathBuf>("CONFIG") {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(name) = args.get_one::<String>("NODE_NAME") {
            config.node.name = name.clone();
        }

        if let Some(pool) = args.get_one::<String>("NODE_POOL_ID") {
            config.node.pool_id = pool.clone();
        }

        if let Some(source) = args.get_one::<String>("POD_SOURCE") {
            config.node.pod_source = source.clone();
        }

        if let Some(version) = args.get_one::<String>("DRIVER_VERSION") {
            config.node.driver_version = version.clone();
        }

        if let Some(port) = args.get_one::<u16>("PORT") {
            config.general.listen = format!("0.0.0.0:{port}");
        }

        if let Some(count) = args.get_one::<usize>("GPU_COUNT") {
            config.devices.count = *count;
        }

        if let Some(seed) = args.get_one::<u64>("SEED") {
            config.devices.seed = Some(*seed);
        }

        match args.get_one::<u8>("VERBOSE").copied().unwrap_or(0) {
            0 => {}
            1 => config.log.level = LogLevel::Debug,
            _ => config.log.level = LogLevel::Trace,
        }

        config.check()?;

        Ok(config)
    }
}

impl Config {
    pub fn load(path: &dyn AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Config = toml::from_str(&content)?;

        config.check()?;

        Ok(config)
    }

    pub fn check(&self) -> Result<(), ConfigError> {
        self.general.check()
    }

    pub fn general(&self) -> &General {
        &self.general
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn devices(&self) -> &Devices {
        &self.devices
    }

    pub fn log(&self) -> &Log {
        &self.log
    }
}
