//! Fixed-timestep scheduler for the per-room game loop.
//!
//! The scheduler only decides *when* a tick fires; what happens on a tick is
//! up to the caller. It is meant to sit in a `tokio::select!` loop next to
//! other event sources:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = commands.recv() => { /* handle commands */ }
//!         info = scheduler.wait_for_tick() => {
//!             world.step(info.dt.as_secs_f64());
//!         }
//!     }
//! }
//! ```
//!
//! A tick rate of 0 means "never tick": [`TickScheduler::wait_for_tick`]
//! pends forever so the other `select!` branches keep running.

use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

/// What to do when a tick fires late.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TickPolicy {
    /// Forget the missed ticks and schedule the next one a full period from
    /// now.
    #[default]
    Skip,
    /// Keep the original cadence. The next tick fires at its planned time,
    /// which may be immediately.
    Drop,
}

/// Scheduler settings.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Ticks per second. 0 disables ticking.
    pub tick_rate_hz: u32,
    pub policy: TickPolicy,
    /// Upper bound for a random delay added before the first tick, in
    /// microseconds. Rooms started in the same instant then don't all wake
    /// together.
    pub initial_jitter_us: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 0,
            policy: TickPolicy::default(),
            initial_jitter_us: 2_000,
        }
    }
}

impl TickConfig {
    /// Highest supported tick rate.
    pub const MAX_TICK_RATE_HZ: u32 = 128;

    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self {
            tick_rate_hz,
            ..Default::default()
        }
    }

    /// Clamps the tick rate to [`Self::MAX_TICK_RATE_HZ`].
    pub fn validated(mut self) -> Self {
        if self.tick_rate_hz > Self::MAX_TICK_RATE_HZ {
            warn!(
                rate = self.tick_rate_hz,
                max = Self::MAX_TICK_RATE_HZ,
                "tick rate too high, clamping"
            );
            self.tick_rate_hz = Self::MAX_TICK_RATE_HZ;
        }
        self
    }

    /// Length of one tick, or `None` when ticking is disabled.
    pub fn tick_duration(&self) -> Option<Duration> {
        match self.tick_rate_hz {
            0 => None,
            hz => Some(Duration::from_secs_f64(1.0 / f64::from(hz))),
        }
    }
}

/// Returned by [`TickScheduler::wait_for_tick`].
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// Tick number, starting at 1.
    pub tick: u64,
    /// Fixed step for this tick. Use this rather than wall-clock time so
    /// every peer integrates with the same numbers.
    pub dt: Duration,
    /// The tick woke up more than 10% of a period late.
    pub overrun: bool,
    /// Whole periods lost to the overrun.
    pub ticks_skipped: u64,
}

/// Drives one game loop at a fixed rate.
pub struct TickScheduler {
    policy: TickPolicy,
    tick_rate_hz: u32,
    period: Option<Duration>,
    next_tick: Option<Instant>,
    tick_count: u64,
    overruns: u64,
    paused: bool,
}

impl TickScheduler {
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        let period = config.tick_duration();

        let next_tick = period.map(|period| {
            let jitter = match config.initial_jitter_us {
                0 => Duration::ZERO,
                max => Duration::from_micros(rand::rng().random_range(0..max)),
            };
            Instant::now() + period + jitter
        });

        match period {
            Some(period) => debug!(
                rate_hz = config.tick_rate_hz,
                period_ms = period.as_secs_f64() * 1000.0,
                policy = ?config.policy,
                "tick scheduler created"
            ),
            None => debug!("tick scheduler created with ticking disabled"),
        }

        Self {
            policy: config.policy,
            tick_rate_hz: config.tick_rate_hz,
            period,
            next_tick,
            tick_count: 0,
            overruns: 0,
            paused: false,
        }
    }

    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self::new(TickConfig::with_rate(tick_rate_hz))
    }

    /// Sleeps until the next tick is due.
    ///
    /// Pends forever when ticking is disabled or the scheduler is paused.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let (due, period) = match (self.next_tick, self.period) {
            (Some(due), Some(period)) if !self.paused => (due, period),
            _ => std::future::pending().await,
        };

        time::sleep_until(due).await;

        let now = Instant::now();
        self.tick_count += 1;

        let late_by = now.saturating_duration_since(due);
        let overrun = late_by > period / 10;
        let ticks_skipped = if overrun {
            self.overruns += 1;
            (late_by.as_nanos() / period.as_nanos()) as u64
        } else {
            0
        };

        self.next_tick = Some(match self.policy {
            TickPolicy::Skip => {
                if ticks_skipped > 0 {
                    warn!(
                        tick = self.tick_count,
                        skipped = ticks_skipped,
                        late_ms = late_by.as_secs_f64() * 1000.0,
                        "tick overrun, skipping ahead"
                    );
                }
                now + period
            }
            TickPolicy::Drop => {
                if overrun {
                    warn!(
                        tick = self.tick_count,
                        late_ms = late_by.as_secs_f64() * 1000.0,
                        "tick overrun, keeping cadence"
                    );
                }
                due + period
            }
        });

        trace!(tick = self.tick_count, overrun, "tick");

        TickInfo {
            tick: self.tick_count,
            dt: period,
            overrun,
            ticks_skipped,
        }
    }

    /// Stops ticking until [`resume`](Self::resume). Idempotent.
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            debug!(tick = self.tick_count, "tick scheduler paused");
        }
    }

    /// Restarts ticking one full period from now, so time spent paused
    /// does not show up as an overrun.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.next_tick = self.period.map(|period| Instant::now() + period);
            debug!(tick = self.tick_count, "tick scheduler resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_disabled(&self) -> bool {
        self.period.is_none()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Number of ticks that fired late.
    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    pub fn tick_rate_hz(&self) -> u32 {
        self.tick_rate_hz
    }

    pub fn tick_duration(&self) -> Option<Duration> {
        self.period
    }
}
