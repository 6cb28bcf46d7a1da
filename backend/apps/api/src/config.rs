//! Server configuration
//!
//! Everything is read once at startup. Unset or unparseable optional values
//! fall back to the development defaults in debug builds and to the
//! production defaults otherwise.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};
use auth::AuthConfig;
use base64::Engine;
use base64::engine::general_purpose;
use credential::CredentialConfig;
use ledger::LedgerConfig;
use notification::EventBusConfig;
use platform::config::{env_bool, env_list, env_opt, env_parse, env_required};
use platform::rate_limit::RateLimitConfig;

const DEFAULT_PORT: u16 = 31113;
const DEFAULT_ORIGINS: &[&str] = &["http://localhost:40922", "http://127.0.0.1:40922"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    /// Process-local stores, nothing survives a restart
    Memory,
}

impl StorageBackend {
    pub const fn code(&self) -> &'static str {
        match self {
            StorageBackend::Postgres => "postgres",
            StorageBackend::Memory => "memory",
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" | "in-memory" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown storage backend '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub storage: StorageBackend,
    /// Required for [`StorageBackend::Postgres`]
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub frontend_origins: Vec<String>,
    pub rate_limit: RateLimitConfig,
    pub auth: AuthConfig,
    pub ledger: LedgerConfig,
    pub credential: CredentialConfig,
    pub event_bus: EventBusConfig,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let development = cfg!(debug_assertions);

        let host = env_parse::<IpAddr>("HOST", IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        let port = env_parse::<u16>("PORT", DEFAULT_PORT);

        let storage = env_parse("STORAGE_BACKEND", StorageBackend::Postgres);
        let database_url = match storage {
            StorageBackend::Postgres => Some(env_required("DATABASE_URL")?),
            StorageBackend::Memory => env_opt("DATABASE_URL"),
        };

        let mut frontend_origins = env_list("FRONTEND_ORIGINS");
        if frontend_origins.is_empty() {
            frontend_origins = DEFAULT_ORIGINS.iter().map(|o| o.to_string()).collect();
        }

        Ok(Self {
            bind_addr: SocketAddr::new(host, port),
            storage,
            database_url,
            db_max_connections: env_parse("DATABASE_MAX_CONNECTIONS", 5),
            frontend_origins,
            rate_limit: RateLimitConfig::new(
                env_parse("RATE_LIMIT_MAX_REQUESTS", 100),
                env_parse("RATE_LIMIT_WINDOW_SECS", 60),
            ),
            auth: auth_config(development)?,
            ledger: ledger_config(development),
            credential: credential_config(development),
            event_bus: event_bus_config(development),
        })
    }
}

fn auth_config(development: bool) -> anyhow::Result<AuthConfig> {
    let base = match env_opt("SESSION_SECRET") {
        Some(encoded) => AuthConfig {
            session_secret: decode_secret(&encoded).context("SESSION_SECRET")?,
            ..AuthConfig::default()
        },
        None if development => AuthConfig::development(),
        None => bail!("SESSION_SECRET must be set in production"),
    };

    Ok(AuthConfig {
        cookie_secure: env_bool("COOKIE_SECURE", base.cookie_secure && !development),
        password_pepper: env_opt("PASSWORD_PEPPER").map(String::into_bytes),
        ..base
    })
}

/// Base64 encoded 32-byte key
fn decode_secret(encoded: &str) -> anyhow::Result<[u8; 32]> {
    let bytes = general_purpose::STANDARD.decode(encoded)?;
    <[u8; 32]>::try_from(bytes.as_slice())
        .map_err(|_| anyhow::anyhow!("expected 32 bytes, got {}", bytes.len()))
}

fn ledger_config(development: bool) -> LedgerConfig {
    let base = if development {
        LedgerConfig::development()
    } else {
        LedgerConfig::default()
    };

    let peers = env_list("LEDGER_PEERS");
    LedgerConfig {
        network_name: env_opt("LEDGER_NETWORK_NAME").unwrap_or(base.network_name.clone()),
        required_endorsements: env_opt("LEDGER_REQUIRED_ENDORSEMENTS")
            .and_then(|raw| raw.parse().ok())
            .or(base.required_endorsements),
        latency: Duration::from_millis(env_parse(
            "LEDGER_LATENCY_MS",
            base.latency.as_millis() as u64,
        )),
        peers: if peers.is_empty() { base.peers.clone() } else { peers },
        ..base
    }
}

fn credential_config(development: bool) -> CredentialConfig {
    let base = if development {
        CredentialConfig::development()
    } else {
        CredentialConfig::default()
    };

    CredentialConfig {
        anchor_max_retries: env_parse("ANCHOR_MAX_RETRIES", base.anchor_max_retries),
        anchor_poll_interval: Duration::from_secs(env_parse(
            "ANCHOR_POLL_INTERVAL_SECS",
            base.anchor_poll_interval.as_secs(),
        )),
        expiry_sweep_interval: Duration::from_secs(env_parse(
            "EXPIRY_SWEEP_INTERVAL_SECS",
            base.expiry_sweep_interval.as_secs(),
        )),
        analytics_months: env_parse("ANALYTICS_MONTHS", base.analytics_months),
        ..base
    }
}

fn event_bus_config(development: bool) -> EventBusConfig {
    let base = if development {
        EventBusConfig::development()
    } else {
        EventBusConfig::default()
    };

    EventBusConfig {
        channel_capacity: env_parse("EVENT_BUS_CAPACITY", base.channel_capacity),
        replay_capacity: env_parse("EVENT_REPLAY_CAPACITY", base.replay_capacity),
        ..base
    }
}
