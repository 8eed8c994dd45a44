//! Runtime configuration.

use std::time::Duration;

use serde::Deserialize;

/// Ledger configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Account number issuing.
    pub issuer: IssuerConfig,
    /// Account locking.
    pub ledger: LockConfig,
    /// Audit trail behaviour.
    pub audit: AuditConfig,
    /// Logging.
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IssuerConfig {
    /// Random draws before giving up with `CapacityExhausted`.
    pub max_attempts: u32,
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Longest wait for an account lock before failing with `Busy`.
    pub lock_timeout_ms: u64,
}

impl LockConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Record a `transfer_in` entry for the recipient of every transfer.
    pub mirror_transfers: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive, overridden by `RUST_LOG`.
    pub filter: String,
    /// Emit JSON lines instead of human readable output.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

impl LedgerConfig {
    /// Loads `config/default` (optional) and then `CIPHER_LEDGER__*` environment variables,
    /// e.g. `CIPHER_LEDGER__LEDGER__LOCK_TIMEOUT_MS=250`.
    ///
    /// # Errors
    ///
    /// Returns an error if a source is malformed or a value has the wrong type.
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::Environment::with_prefix("CIPHER_LEDGER").separator("__"))
            .build()?
            .try_deserialize()
    }
}
