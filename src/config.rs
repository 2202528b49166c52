use std::time::Duration;

use clap::Parser;

use crate::codec::DEFAULT_MAX_BULK_LEN;
use crate::store::DEFAULT_SHARDS;

pub const DEFAULT_PORT: u16 = 6379;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Server settings. Every flag can also be given through the environment.
#[derive(Parser, Clone, Debug, PartialEq)]
#[command(name = "kache", version, about = "In-memory key-value cache server")]
pub struct Config {
    /// The address to listen on
    #[arg(long, env = "KACHE_BIND", default_value = DEFAULT_BIND)]
    pub bind: String,

    /// The port to listen on
    #[arg(short, long, env = "KACHE_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Number of independently locked partitions of the key space
    #[arg(long, env = "KACHE_SHARDS", default_value_t = DEFAULT_SHARDS)]
    pub shards: usize,

    /// Largest bulk string accepted from a client, in bytes
    #[arg(long, env = "KACHE_MAX_BULK_LEN", default_value_t = DEFAULT_MAX_BULK_LEN)]
    pub max_bulk_len: usize,

    /// Seconds a connection may stay silent before it is closed, 0 to never close it
    #[arg(long, env = "KACHE_IDLE_TIMEOUT", default_value_t = 0)]
    pub idle_timeout: u64,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "KACHE_LOG_LEVEL", default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,
}

impl Config {
    pub fn idle_timeout(&self) -> Option<Duration> {
        match self.idle_timeout {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            port: DEFAULT_PORT,
            shards: DEFAULT_SHARDS,
            max_bulk_len: DEFAULT_MAX_BULK_LEN,
            idle_timeout: 0,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let config = Config::try_parse_from([
            "kache",
            "--port",
            "7000",
            "--bind",
            "0.0.0.0",
            "--shards",
            "4",
            "--idle-timeout",
            "30",
        ])
        .unwrap();

        assert_eq!(config.port, 7000);
        assert_eq!(config.bind, "0.0.0.0");
        assert_eq!(config.shards, 4);
        assert_eq!(config.idle_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn short_port_flag() {
        let config = Config::try_parse_from(["kache", "-p", "6380"]).unwrap();

        assert_eq!(config.port, 6380);
    }

    #[test]
    fn zero_idle_timeout_disables_it() {
        assert_eq!(Config::default().idle_timeout(), None);
    }

    #[test]
    fn invalid_port() {
        assert!(Config::try_parse_from(["kache", "--port", "not-a-port"]).is_err());
    }
}
