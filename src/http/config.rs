use std::{
    net::{Ipv4Addr, SocketAddr},
    time::Duration,
};

use tokio::sync::Semaphore;

use crate::params::Limits;

pub struct Config {
    pub listen_addr: SocketAddr,
    pub limits: Limits,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub shutdown_timeout: Duration,
    pub max_connections: usize,
}

impl Default for Config {
    fn default() -> Self {
        let limits = Limits::default();
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080)),
            limits,
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(limits.time_max),
            shutdown_timeout: Duration::from_secs(15),
            max_connections: 1024,
        }
    }
}

impl Config {
    /// Builds a config whose write timeout follows `limits.time_max`.
    pub fn new(listen_addr: SocketAddr, limits: Limits) -> Self {
        Self {
            listen_addr,
            limits,
            write_timeout: Duration::from_secs(limits.time_max),
            ..Default::default()
        }
    }

    pub fn with_timeouts(mut self, read_timeout: Duration, shutdown_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self.shutdown_timeout = shutdown_timeout;
        self
    }

    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections.clamp(1, Semaphore::MAX_PERMITS);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_timeout_tracks_time_max() {
        let limits = Limits {
            time_max: 42,
            ..Limits::default()
        };
        let config = Config::new("127.0.0.1:0".parse().unwrap(), limits);
        assert_eq!(config.write_timeout, Duration::from_secs(42));
        assert_eq!(config.read_timeout, Duration::from_secs(30));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(15));
    }

    #[test]
    fn max_connections_stays_within_semaphore_bounds() {
        let config = Config::default().with_max_connections(0);
        assert_eq!(config.max_connections, 1);
        let config = Config::default().with_max_connections(usize::MAX);
        assert_eq!(config.max_connections, Semaphore::MAX_PERMITS);
    }
}
