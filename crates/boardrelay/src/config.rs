//! Server configuration, read from the environment.

use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use boardrelay_board::BoardConfig;
use boardrelay_store::{Credentials, StoreConfig};

/// Everything the binary needs to start a server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_host: IpAddr,
    /// Port to listen on.
    pub port: u16,
    /// Number of workers sharing the listener.
    pub workers: usize,
    /// Store login presented by every worker.
    pub credentials: Credentials,
    /// Board sizing.
    pub board: BoardConfig,
    /// Board directory size before the oldest board is evicted.
    pub board_collection_cap: usize,
    /// Event log size before the oldest record is evicted.
    pub event_collection_cap: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let store = StoreConfig::default();
        Self {
            bind_host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3000,
            workers: std::thread::available_parallelism().map_or(1, |n| n.get()),
            credentials: Credentials::default(),
            board: BoardConfig::default(),
            board_collection_cap: store.board_capacity,
            event_collection_cap: store.event_capacity,
        }
    }
}

impl ServerConfig {
    /// Loads config from the environment, keeping the default for any
    /// variable that is unset or invalid.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads config through `lookup` instead of the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        config.bind_host = parse_var(&lookup, "BIND_HOST", config.bind_host, |_| true);
        config.port = parse_var(&lookup, "APP_PORT", config.port, |p| *p > 0);
        config.workers = parse_var(&lookup, "WORKERS", config.workers, |n| *n > 0);
        config.board.max_capacity =
            parse_var(&lookup, "MAX_PLAYERS", config.board.max_capacity, |n| *n > 0);
        config.board_collection_cap = parse_var(
            &lookup,
            "BOARD_COLLECTION_CAP",
            config.board_collection_cap,
            |n| *n > 0,
        );
        config.event_collection_cap = parse_var(
            &lookup,
            "EVENT_COLLECTION_CAP",
            config.event_collection_cap,
            |n| *n > 0,
        );

        if let Some(user) = lookup("DB_USER") {
            config.credentials.user = user;
        }
        if let Some(password) = lookup("DB_PASSWORD") {
            config.credentials.password = password;
        }

        config.board = config.board.validated();
        config
    }

    /// `host:port` string to bind to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }

    /// Store sizing and accepted login for an in-process store.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            board_capacity: self.board_collection_cap,
            event_capacity: self.event_collection_cap,
            credentials: self.credentials.clone(),
        }
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
    valid: impl Fn(&T) -> bool,
) -> T {
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.parse::<T>() {
        Ok(parsed) if valid(&parsed) => parsed,
        _ => {
            tracing::warn!("Invalid {key} '{raw}', using default");
            default
        }
    }
}
