use super::*;

#[derive(Deserialize)]
pub struct General {
    #[serde(default = "listen")]
    pub(super) listen: String,

    // samples are regenerated on this period, scrapes in between are served
    // the values from the most recent cycle
    #[serde(default = "interval")]
    interval: String,
}

impl Default for General {
    fn default() -> Self {
        Self {
            listen: listen(),
            interval: interval(),
        }
    }
}

impl General {
    pub fn check(&self) -> Result<(), ConfigError> {
        self.listen()?;

        if self.interval()?.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }

        Ok(())
    }

    pub fn listen(&self) -> Result<SocketAddr, ConfigError> {
        self.listen
            .to_socket_addrs()
            .map_err(|source| ConfigError::Listen {
                addr: self.listen.clone(),
                source,
            })?
            .next()
            .ok_or_else(|| ConfigError::Unresolved(self.listen.clone()))
    }

    pub fn interval(&self) -> Result<Duration, ConfigError> {
        self.interval
            .parse::<humantime::Duration>()
            .map(Into::into)
            .map_err(|source| ConfigError::Interval {
                value: self.interval.clone(),
                source,
            })
    }
}
