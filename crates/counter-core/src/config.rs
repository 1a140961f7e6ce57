//! Explicit configuration for the Counter facade. No global/static
//! config: every value is a constructor parameter (spec §9).

use chrono_tz::Tz;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CounterConfig {
    /// How often the health gate probes the fast tier. Default 5s.
    pub probe_interval: Duration,
    /// Consecutive probe failures/successes needed to flip `degraded`.
    pub health_hysteresis: u32,
    /// Batcher flush trigger: batch size. Default 100.
    pub batch_size: usize,
    /// Batcher flush trigger: max buffered age. Default 1s.
    pub flush_interval: Duration,
    /// Bound on the batcher's ingress channel; producers block when full
    /// (spec §5: "block on full").
    pub batcher_channel_capacity: usize,
    /// Timezone the daily reset boundary is computed in. Default
    /// Asia/Taipei.
    pub reset_timezone: Tz,
    /// How long archive rows are retained. Default 7 days.
    pub archive_retention: chrono::Duration,
    /// How long processed write-queue entries are retained before purge.
    /// Not explicit in the spec narrative; 24h is the stated safe
    /// default (spec §9 open question).
    pub queue_retention: chrono::Duration,
    /// How many durable rows the recovery worker reloads per batch.
    pub recovery_batch_size: usize,
}

impl Default for CounterConfig {
    fn default() -> Self {
        CounterConfig {
            probe_interval: Duration::from_secs(5),
            health_hysteresis: 2,
            batch_size: 100,
            flush_interval: Duration::from_secs(1),
            batcher_channel_capacity: 1024,
            reset_timezone: chrono_tz::Asia::Taipei,
            archive_retention: chrono::Duration::days(7),
            queue_retention: chrono::Duration::hours(24),
            recovery_batch_size: 500,
        }
    }
}
