//! Fixed-period driver for ingestion cycles.
//!
//! The first tick fires immediately so a freshly started process ingests
//! right away. Each tick spawns its cycle on its own task, so a slow cycle
//! never delays the timer. Whether a tick may start while an earlier cycle
//! is still running is governed by [`OverlapPolicy`].

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::{IngestContext, run_cycle};

/// Poll period used when none is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(120);

/// What to do when a tick arrives while a previous cycle is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapPolicy {
    /// Start the new cycle anyway; cycles may run concurrently.
    #[default]
    Allow,
    /// Skip the tick and wait for the next one.
    Skip,
}

/// Timing configuration for [`run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Time between cycle starts. Must be non-zero.
    pub period: Duration,
    /// Behaviour on overlapping ticks.
    pub overlap: OverlapPolicy,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            period: DEFAULT_POLL_INTERVAL,
            overlap: OverlapPolicy::default(),
        }
    }
}

/// Counters reported by [`run`] when it shuts down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Cycles spawned.
    pub dispatched: u64,
    /// Ticks skipped under [`OverlapPolicy::Skip`].
    pub skipped: u64,
}

/// Decrements the in-flight counter when a cycle task ends, even if the
/// cycle panics.
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Runs ingestion cycles every `schedule.period` until `shutdown`
/// resolves.
///
/// In-flight cycles and their notifications are abandoned on shutdown.
///
/// # Panics
///
/// Panics if `schedule.period` is zero.
pub async fn run<F>(ctx: IngestContext, schedule: Schedule, shutdown: F) -> SchedulerStats
where
    F: Future<Output = ()> + Send,
{
    let in_flight = Arc::new(AtomicUsize::new(0));
    let mut stats = SchedulerStats::default();

    let mut ticker = tokio::time::interval(schedule.period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => {
                log::info!(
                    "Shutting down scheduler ({} cycle(s) still running)",
                    in_flight.load(Ordering::Acquire)
                );
                break;
            }
            _ = ticker.tick() => {
                let running = in_flight.load(Ordering::Acquire);
                if running > 0 {
                    if schedule.overlap == OverlapPolicy::Skip {
                        stats.skipped += 1;
                        log::warn!("Previous cycle still running, skipping this tick");
                        continue;
                    }
                    log::debug!("Starting cycle while {running} earlier cycle(s) still run");
                }

                stats.dispatched += 1;
                in_flight.fetch_add(1, Ordering::AcqRel);

                let cycle = stats.dispatched;
                let ctx = ctx.clone();
                let guard = InFlight(in_flight.clone());

                tokio::spawn(async move {
                    let _guard = guard;
                    match run_cycle(&ctx).await {
                        // Dropping the report detaches its notifications.
                        Ok(report) => drop(report),
                        Err(e) => log::error!("Cycle {cycle} failed: {e}"),
                    }
                });
            }
        }
    }

    stats
}
