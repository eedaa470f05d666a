//! # Monitor Loop
//!
//! Continuous monitoring: repeatedly run a poll cycle on an interval until
//! cancelled, handing each snapshot to a render callback and accumulating
//! cycle metrics.
//!
//! Cancellation is a structured [`CancellationToken`] polled between cycles
//! only: a cycle in flight always completes, bounded by the adapter's
//! per-machine timeouts. There is no global "keep running" flag; every run
//! owns its pool, token, and metrics.

use std::time::Duration;

use log::debug;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::adapter::CncAdapter;
use crate::poller::{poll_cycle, MultiMachineSnapshot};
use crate::pool::ConnectionPool;
use crate::DEFAULT_MONITOR_INTERVAL_SECS;

/// Monitor loop configuration
#[derive(Debug, Clone)]
pub struct MonitorOptions {
    /// Pause between poll cycles
    pub interval: Duration,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_MONITOR_INTERVAL_SECS),
        }
    }
}

/// Accumulated statistics over the poll cycles of one run
#[derive(Debug, Clone, Default)]
pub struct PollMetrics {
    pub total_cycles: u64,
    /// Cycles where every enabled machine produced data
    pub complete_cycles: u64,
    /// Cycles that lost at least one machine
    pub degraded_cycles: u64,
    /// Machine entries reported across all cycles
    pub machines_reported: u64,
    /// Entries served from cache instead of a fresh read
    pub cache_hits: u64,
    pub total_duration: Duration,
    pub min_cycle: Option<Duration>,
    pub max_cycle: Option<Duration>,
}

impl PollMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one snapshot into the totals
    pub fn record(&mut self, snapshot: &MultiMachineSnapshot) {
        self.total_cycles += 1;
        if snapshot.all_succeeded() {
            self.complete_cycles += 1;
        } else {
            self.degraded_cycles += 1;
        }
        self.machines_reported += snapshot.machine_count() as u64;
        self.cache_hits += snapshot.machines.iter().filter(|m| m.cached).count() as u64;
        self.total_duration += snapshot.duration;

        self.min_cycle = Some(
            self.min_cycle
                .map_or(snapshot.duration, |min| min.min(snapshot.duration)),
        );
        self.max_cycle = Some(
            self.max_cycle
                .map_or(snapshot.duration, |max| max.max(snapshot.duration)),
        );
    }

    /// Mean cycle duration
    pub fn avg_cycle(&self) -> Duration {
        if self.total_cycles == 0 {
            return Duration::ZERO;
        }
        self.total_duration / self.total_cycles as u32
    }

    /// Share of cycles that were complete, as a percentage
    pub fn completeness_rate(&self) -> f64 {
        if self.total_cycles == 0 {
            return 0.0;
        }
        (self.complete_cycles as f64 / self.total_cycles as f64) * 100.0
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// One-block summary for end-of-run reporting
    pub fn summary(&self) -> String {
        format!(
            "Poll cycles: {} total, {} complete ({:.1}%), {} degraded\n\
             Machine reads: {} reported, {} served from cache\n\
             Cycle duration: avg {:?}, min {:?}, max {:?}",
            self.total_cycles,
            self.complete_cycles,
            self.completeness_rate(),
            self.degraded_cycles,
            self.machines_reported,
            self.cache_hits,
            self.avg_cycle(),
            self.min_cycle.unwrap_or(Duration::ZERO),
            self.max_cycle.unwrap_or(Duration::ZERO),
        )
    }
}

/// Interval-driven fleet monitor
///
/// Owns the pool for the duration of the run. The cancellation token can be
/// cloned out and triggered from a signal handler; the loop exits after the
/// cycle in progress, never mid-cycle.
pub struct Monitor<A: CncAdapter> {
    pool: ConnectionPool<A>,
    options: MonitorOptions,
    cancel: CancellationToken,
    metrics: PollMetrics,
}

impl<A: CncAdapter> Monitor<A> {
    pub fn new(pool: ConnectionPool<A>, options: MonitorOptions) -> Self {
        Self {
            pool,
            options,
            cancel: CancellationToken::new(),
            metrics: PollMetrics::new(),
        }
    }

    /// Token to cancel this run from elsewhere
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn pool(&self) -> &ConnectionPool<A> {
        &self.pool
    }

    pub fn pool_mut(&mut self) -> &mut ConnectionPool<A> {
        &mut self.pool
    }

    pub fn metrics(&self) -> &PollMetrics {
        &self.metrics
    }

    /// Run a single cycle outside the loop (one-shot mode)
    pub async fn poll_once(&mut self) -> MultiMachineSnapshot {
        let snapshot = poll_cycle(&mut self.pool).await;
        self.metrics.record(&snapshot);
        snapshot
    }

    /// Poll until cancelled, handing each snapshot to `render`
    ///
    /// Returns the metrics accumulated over the run. Cancellation requested
    /// during a cycle takes effect once the cycle completes; cancellation
    /// during the interval pause takes effect immediately.
    pub async fn run<F>(&mut self, mut render: F) -> PollMetrics
    where
        F: FnMut(&MultiMachineSnapshot),
    {
        loop {
            let snapshot = poll_cycle(&mut self.pool).await;
            self.metrics.record(&snapshot);
            render(&snapshot);
            debug!(
                "Cycle {} finished: {} ok, {} failed, {:?}",
                self.metrics.total_cycles,
                snapshot.successful_reads,
                snapshot.failed_reads,
                snapshot.duration
            );

            if self.cancel.is_cancelled() {
                break;
            }
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = sleep(self.options.interval) => {}
            }
        }
        self.metrics.clone()
    }

    /// Disconnect the fleet and tear the pool down
    pub async fn shutdown(&mut self) {
        self.pool.cleanup().await;
    }
}
