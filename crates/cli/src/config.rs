//! Command-line surface for the counter binary (spec §6): `-listen`,
//! `-atomic-addr`, `-durable-dsn`, `-batch-size`, `-flush-interval`,
//! `-timezone`, `-retention-days`, plus the privileged reset credential
//! and boot timeout needed to make exit codes 1/2 meaningful.

use clap::Parser;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "systems-cli", about = "Counter service HTTP surface")]
pub struct CliArgs {
    /// Address to bind the HTTP listener on.
    #[arg(long = "listen", env = "COUNTER_LISTEN", default_value = "127.0.0.1:8080")]
    pub listen: SocketAddr,

    /// Address of the fast (atomic) tier. The in-memory fake backing
    /// store always runs locally regardless of this value — see
    /// DESIGN.md for why a real Redis client is out of scope here — but
    /// the flag is still accepted and logged so the bring-up sequence
    /// reads the same as it would against a real dependency.
    #[arg(long = "atomic-addr", env = "COUNTER_ATOMIC_ADDR", default_value = "memory://fast-tier")]
    pub atomic_addr: String,

    /// DSN of the durable tier, same caveat as `atomic_addr`.
    #[arg(long = "durable-dsn", env = "COUNTER_DURABLE_DSN", default_value = "memory://durable-tier")]
    pub durable_dsn: String,

    /// Batcher flush trigger: batch size.
    #[arg(long = "batch-size", env = "COUNTER_BATCH_SIZE", default_value_t = 100)]
    pub batch_size: usize,

    /// Batcher flush trigger: max buffered age, in milliseconds.
    #[arg(long = "flush-interval", env = "COUNTER_FLUSH_INTERVAL_MS", default_value_t = 1000)]
    pub flush_interval_ms: u64,

    /// IANA timezone name the daily reset boundary is computed in.
    #[arg(long = "timezone", env = "COUNTER_TIMEZONE", default_value = "Asia/Taipei")]
    pub timezone: String,

    /// How many days of archived history to retain before purge.
    #[arg(long = "retention-days", env = "COUNTER_RETENTION_DAYS", default_value_t = 7)]
    pub retention_days: i64,

    /// How long dependency bring-up may take before the process exits
    /// with code 2 (spec §6).
    #[arg(long = "boot-timeout", env = "COUNTER_BOOT_TIMEOUT_MS", default_value_t = 5000)]
    pub boot_timeout_ms: u64,

    /// Privileged credential required on `POST /counters/:name/reset`,
    /// via the `X-Reset-Token` header. Sourced only from the
    /// environment or this flag, never hardcoded (spec §6).
    #[arg(long = "reset-token", env = "COUNTER_RESET_TOKEN")]
    pub reset_token: Option<String>,
}

/// Configuration error surfaced before any dependency is touched —
/// maps to exit code 1 (spec §6).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown timezone {0:?}")]
    UnknownTimezone(String),
    #[error("reset token must be non-empty when set")]
    EmptyResetToken,
}

/// Parsed, validated configuration ready to drive bring-up.
pub struct ResolvedConfig {
    pub listen: SocketAddr,
    pub atomic_addr: String,
    pub durable_dsn: String,
    pub counter: counter_core::CounterConfig,
    pub boot_timeout: Duration,
    pub reset_token: Option<String>,
}

impl CliArgs {
    pub fn resolve(self) -> Result<ResolvedConfig, ConfigError> {
        let tz = chrono_tz::Tz::from_str(&self.timezone)
            .map_err(|_| ConfigError::UnknownTimezone(self.timezone.clone()))?;
        if matches!(self.reset_token.as_deref(), Some("")) {
            return Err(ConfigError::EmptyResetToken);
        }

        let mut counter = counter_core::CounterConfig::default();
        counter.batch_size = self.batch_size;
        counter.flush_interval = Duration::from_millis(self.flush_interval_ms);
        counter.reset_timezone = tz;
        counter.archive_retention = chrono::Duration::days(self.retention_days);

        Ok(ResolvedConfig {
            listen: self.listen,
            atomic_addr: self.atomic_addr,
            durable_dsn: self.durable_dsn,
            counter,
            boot_timeout: Duration::from_millis(self.boot_timeout_ms),
            reset_token: self.reset_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> CliArgs {
        let mut argv = vec!["systems-cli"];
        argv.extend_from_slice(extra);
        CliArgs::parse_from(argv)
    }

    #[test]
    fn defaults_resolve_to_taipei_and_seven_day_retention() {
        let resolved = args(&[]).resolve().unwrap();
        assert_eq!(resolved.counter.reset_timezone, chrono_tz::Asia::Taipei);
        assert_eq!(resolved.counter.archive_retention, chrono::Duration::days(7));
        assert_eq!(resolved.boot_timeout, Duration::from_millis(5000));
        assert!(resolved.reset_token.is_none());
    }

    #[test]
    fn unknown_timezone_is_a_config_error() {
        let err = args(&["--timezone", "Nowhere/Imaginary"]).resolve().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownTimezone(_)));
    }

    #[test]
    fn empty_reset_token_is_rejected() {
        let err = args(&["--reset-token", ""]).resolve().unwrap_err();
        assert!(matches!(err, ConfigError::EmptyResetToken));
    }

    #[test]
    fn flags_override_batch_and_flush_settings() {
        let resolved = args(&["--batch-size", "50", "--flush-interval", "250"]).resolve().unwrap();
        assert_eq!(resolved.counter.batch_size, 50);
        assert_eq!(resolved.counter.flush_interval, Duration::from_millis(250));
    }
}
