//! Fixed-rate ticks for Terrabound sessions.
//!
//! A session applies queued inputs and broadcasts its state once per
//! tick. [`TickScheduler`] decides when that happens, flags ticks that
//! start late, and measures how much of the period each tick body used.
//!
//! The scheduler is polled from the session actor's `select!` loop
//! alongside the command channel:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = commands.recv() => handle(cmd),
//!         tick = scheduler.wait_for_tick() => {
//!             step(&mut state, tick.number);
//!             scheduler.record_tick_end();
//!         }
//!     }
//! }
//! ```

use std::time::{Duration, Instant};

use rand::Rng;
use tokio::time::Instant as Deadline;

/// Handling of a tick that starts late.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickPolicy {
    /// Rebase: the next tick is one period after this one actually
    /// fired. Missed periods are counted and dropped.
    #[default]
    Skip,
    /// Stay on the fixed grid. Ticks that are already due fire back to
    /// back until the schedule is caught up.
    Drop,
}

#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Ticks per second, `1..=MAX_TICK_RATE_HZ`.
    pub tick_rate_hz: u32,
    pub policy: TickPolicy,
    /// Share of the period a tick body may use before a warning.
    pub budget_warn_ratio: f64,
    /// Upper bound of a random delay before the first tick. Spreads
    /// sessions created together across the period.
    pub initial_jitter_us: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: Self::DEFAULT_TICK_RATE_HZ,
            policy: TickPolicy::Skip,
            budget_warn_ratio: 0.8,
            initial_jitter_us: 2_000,
        }
    }
}

impl TickConfig {
    pub const DEFAULT_TICK_RATE_HZ: u32 = 10;
    pub const MAX_TICK_RATE_HZ: u32 = 128;

    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self {
            tick_rate_hz,
            ..Self::default()
        }
    }

    /// Clamps the rate into `1..=MAX_TICK_RATE_HZ` and the warning ratio
    /// into `0.0..=1.0`.
    pub fn validated(mut self) -> Self {
        let rate = self.tick_rate_hz.clamp(1, Self::MAX_TICK_RATE_HZ);
        if rate != self.tick_rate_hz {
            tracing::warn!(requested = self.tick_rate_hz, using = rate, "tick rate out of range");
            self.tick_rate_hz = rate;
        }
        self.budget_warn_ratio = self.budget_warn_ratio.clamp(0.0, 1.0);
        self
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate_hz.max(1)))
    }
}

/// A tick that just fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tick {
    /// 1 for the first tick.
    pub number: u64,
    /// How far past its deadline the tick started.
    pub late_by: Duration,
    /// Periods dropped to catch up. Always 0 under [`TickPolicy::Drop`].
    pub skipped: u64,
}

/// Running totals for one scheduler.
#[derive(Debug, Clone, Default)]
pub struct TickStats {
    pub fired: u64,
    pub overruns: u64,
    pub skipped: u64,
    /// Longest tick body measured by `record_tick_end`.
    pub longest_body: Duration,
    /// Share of the period the last measured body used.
    pub last_utilization: f64,
}

/// Lateness beyond a tenth of a period counts as an overrun.
fn overrun_slack(period: Duration) -> Duration {
    period / 10
}

fn whole_periods(late_by: Duration, period: Duration) -> u64 {
    u64::try_from(late_by.as_nanos() / period.as_nanos().max(1)).unwrap_or(u64::MAX)
}

/// Paces one session.
pub struct TickScheduler {
    config: TickConfig,
    period: Duration,
    deadline: Deadline,
    body_started: Option<Instant>,
    stats: TickStats,
}

impl TickScheduler {
    /// The first tick is due one period plus a random jitter from now.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        let period = config.period();
        let jitter = match config.initial_jitter_us {
            0 => Duration::ZERO,
            max => Duration::from_micros(rand::rng().random_range(0..max)),
        };

        tracing::debug!(rate_hz = config.tick_rate_hz, policy = ?config.policy, ?jitter, "tick scheduler ready");

        Self {
            deadline: Deadline::now() + period + jitter,
            config,
            period,
            body_started: None,
            stats: TickStats::default(),
        }
    }

    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self::new(TickConfig::with_rate(tick_rate_hz))
    }

    /// Sleeps until the next deadline.
    ///
    /// Cancel-safe: dropping the future before it completes leaves the
    /// schedule untouched.
    pub async fn wait_for_tick(&mut self) -> Tick {
        let due = self.deadline;
        tokio::time::sleep_until(due).await;

        let fired_at = Deadline::now();
        self.body_started = Some(Instant::now());
        self.stats.fired += 1;

        let late_by = fired_at.saturating_duration_since(due);
        let overrun = late_by > overrun_slack(self.period);
        let skipped = match self.config.policy {
            TickPolicy::Skip if overrun => whole_periods(late_by, self.period),
            _ => 0,
        };
        self.deadline = match self.config.policy {
            TickPolicy::Skip => fired_at + self.period,
            TickPolicy::Drop => due + self.period,
        };

        if overrun {
            self.stats.overruns += 1;
            self.stats.skipped += skipped;
            tracing::warn!(
                tick = self.stats.fired,
                late_ms = late_by.as_secs_f64() * 1000.0,
                skipped,
                "tick started late"
            );
        } else {
            tracing::trace!(tick = self.stats.fired, "tick");
        }

        Tick {
            number: self.stats.fired,
            late_by,
            skipped,
        }
    }

    /// Closes the tick body opened by the last `wait_for_tick`. Does
    /// nothing if no body is open.
    pub fn record_tick_end(&mut self) {
        let Some(started) = self.body_started.take() else {
            return;
        };
        let body = started.elapsed();
        let utilization = body.as_secs_f64() / self.period.as_secs_f64();

        if utilization >= self.config.budget_warn_ratio {
            tracing::warn!(
                tick = self.stats.fired,
                body_ms = body.as_secs_f64() * 1000.0,
                period_ms = self.period.as_secs_f64() * 1000.0,
                "tick body close to or over budget"
            );
        }

        self.stats.last_utilization = utilization;
        self.stats.longest_body = self.stats.longest_body.max(body);
    }

    pub fn tick_count(&self) -> u64 {
        self.stats.fired
    }

    pub fn tick_rate_hz(&self) -> u32 {
        self.config.tick_rate_hz
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn stats(&self) -> &TickStats {
        &self.stats
    }
}
