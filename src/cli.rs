use std::{
    net::{SocketAddr, ToSocketAddrs},
    path::PathBuf,
    time::Duration,
};

use anyhow::{anyhow, Context};
use clap::Parser;
use log::LevelFilter;

use crate::{http::Config, params::Limits};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Server listen address; a bare ":port" listens on every interface
    #[arg(long, default_value = ":8080")]
    pub listen_addr: String,

    /// Maximum response body size in [byte] for randomly generating the response body
    #[arg(long, default_value_t = 10 * 1024 * 1024, value_parser = clap::value_parser!(u64).range(1..))]
    pub length_max: u64,

    /// Default number of bytes written in a single chunk
    #[arg(long, default_value_t = 1024, value_parser = clap::value_parser!(u64).range(1..))]
    pub unit_default: u64,

    /// Maximum response time in [sec] for randomly determining the processing time
    #[arg(long, default_value_t = 600, value_parser = clap::value_parser!(u64).range(1..))]
    pub time_max: u64,

    /// Time in [sec] a client may take to send request headers, and may stay idle between requests
    #[arg(long, default_value_t = 30)]
    pub read_timeout: u64,

    /// Grace period in [sec] for in-flight requests after an interrupt
    #[arg(long, default_value_t = 15)]
    pub shutdown_timeout: u64,

    /// Maximum number of requests handled concurrently
    #[arg(long, default_value_t = 1024, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_connections: u64,

    /// Log level when no log config file is given
    #[arg(long, default_value = "info")]
    pub log_level: LevelFilter,

    /// log4rs YAML configuration file
    #[arg(long)]
    pub log_config: Option<PathBuf>,
}

impl Cli {
    pub fn limits(&self) -> Limits {
        Limits {
            length_max: self.length_max,
            unit_default: self.unit_default,
            time_max: self.time_max,
        }
    }

    pub fn config(&self) -> anyhow::Result<Config> {
        let listen_addr = parse_listen_addr(&self.listen_addr)?;
        Ok(Config::new(listen_addr, self.limits())
            .with_timeouts(
                Duration::from_secs(self.read_timeout),
                Duration::from_secs(self.shutdown_timeout),
            )
            .with_max_connections(usize::try_from(self.max_connections).unwrap_or(usize::MAX)))
    }
}

/// Accepts `host:port`, `ip:port` and `:port`.
pub fn parse_listen_addr(addr: &str) -> anyhow::Result<SocketAddr> {
    let addr = match addr.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{port}"),
        None => addr.to_string(),
    };
    addr.to_socket_addrs()
        .with_context(|| format!("invalid listen address {addr:?}"))?
        .next()
        .ok_or_else(|| anyhow!("listen address {addr:?} did not resolve"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cli = Cli::parse_from(["trickle"]);
        assert_eq!(cli.limits(), Limits::default());
        let config = cli.config().unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.write_timeout, Duration::from_secs(600));
        assert_eq!(config.read_timeout, Duration::from_secs(30));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(15));
        assert_eq!(cli.log_level, LevelFilter::Info);
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from([
            "trickle",
            "--listen-addr",
            "127.0.0.1:9000",
            "--length-max",
            "100",
            "--unit-default",
            "10",
            "--time-max",
            "5",
            "--log-level",
            "debug",
        ]);
        let config = cli.config().unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(
            config.limits,
            Limits {
                length_max: 100,
                unit_default: 10,
                time_max: 5
            }
        );
        assert_eq!(config.write_timeout, Duration::from_secs(5));
        assert_eq!(cli.log_level, LevelFilter::Debug);
    }

    #[test]
    fn zero_and_garbage_limits_are_rejected() {
        assert!(Cli::try_parse_from(["trickle", "--unit-default", "0"]).is_err());
        assert!(Cli::try_parse_from(["trickle", "--length-max", "abc"]).is_err());
        assert!(Cli::try_parse_from(["trickle", "--time-max", "-1"]).is_err());
    }

    #[test]
    fn listen_addr_forms() {
        assert_eq!(parse_listen_addr(":3000").unwrap(), "0.0.0.0:3000".parse().unwrap());
        assert_eq!(parse_listen_addr("127.0.0.1:80").unwrap(), "127.0.0.1:80".parse().unwrap());
        assert!(parse_listen_addr("not an address").is_err());
    }
}
