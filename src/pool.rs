//! # Connection Pool
//!
//! Lifecycle management for a bounded fleet of machine registrations and
//! their live adapter sessions.
//!
//! The pool owns every [`MachineRecord`] exclusively: registrations are
//! append-only with stable indices, capacity is a hard bound, and all state
//! transitions happen inside pool operations. One pool instance serves one
//! monitoring run; there is no shared or global pool.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use focas_monitor::{ConnectionPool, PoolConfig, SimulatedCnc};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut pool = ConnectionPool::new(SimulatedCnc::new(), PoolConfig::default());
//!
//!     pool.add_machine("Mill1", "192.168.1.100", 8193)?;
//!     pool.add_machine("Lathe1", "192.168.1.101", 8193)?;
//!
//!     let summary = pool.connect_all().await;
//!     println!("{} connected, {} failed", summary.successful, summary.failed);
//!
//!     pool.cleanup().await;
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{info, warn};

use crate::adapter::CncAdapter;
use crate::error::{FocasError, FocasResult};
use crate::machine::{ConnectionState, MachineRecord};
use crate::{DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_POOL_CAPACITY};

/// Pool configuration
///
/// `diagnostics` folds the verbose troubleshooting output into the one pool
/// implementation instead of a separate code path: when set, connection
/// failures log the operator hints for the vendor error code.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Hard upper bound on registrations; exceeding it rejects the add
    pub capacity: usize,
    /// Timeout handed to the adapter for each connect attempt
    pub connect_timeout: Duration,
    /// Log troubleshooting detail on connection failures
    pub diagnostics: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_POOL_CAPACITY,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            diagnostics: false,
        }
    }
}

/// Outcome of a `connect_all` sweep
///
/// Skipped (disabled) and already-connected machines count as successful,
/// matching the per-machine no-op semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectSummary {
    pub successful: usize,
    pub failed: usize,
}

impl ConnectSummary {
    /// True iff every machine ended the sweep without a failure
    pub fn all_connected(&self) -> bool {
        self.failed == 0
    }
}

/// Bounded collection of machine records plus their adapter sessions
///
/// Generic over the protocol adapter so the same pool drives the vendor
/// library in production and scripted adapters in tests.
pub struct ConnectionPool<A: CncAdapter> {
    adapter: A,
    config: PoolConfig,
    machines: Vec<MachineRecord>,
    created: DateTime<Utc>,
    total_connections: u64,
    successful_operations: u64,
    failed_operations: u64,
}

impl<A: CncAdapter> ConnectionPool<A> {
    /// Create an initialized, empty pool
    ///
    /// A constructed pool is always usable; re-initialization is `reset`.
    pub fn new(adapter: A, config: PoolConfig) -> Self {
        Self {
            adapter,
            config,
            machines: Vec::new(),
            created: Utc::now(),
            total_connections: 0,
            successful_operations: 0,
            failed_operations: 0,
        }
    }

    /// Register a machine; returns its stable index
    ///
    /// Fails with `PoolFull` at capacity and `InvalidConfig` on an empty
    /// name or address. Indices are assigned append-only and never reused,
    /// so the returned index equals the previous machine count.
    pub fn add_machine(&mut self, name: &str, ip: &str, port: u16) -> FocasResult<usize> {
        if name.is_empty() || ip.is_empty() {
            return Err(FocasError::invalid_config(
                "machine name and address must be non-empty",
            ));
        }
        if self.machines.len() >= self.config.capacity {
            return Err(FocasError::pool_full(self.config.capacity));
        }

        let index = self.machines.len();
        self.machines.push(MachineRecord::new(name, ip, port));
        Ok(index)
    }

    /// Connect one machine
    ///
    /// No-op success when the machine is disabled or already connected.
    /// Otherwise transitions `Connecting` → `Connected` (stamping times,
    /// clearing the retry counter) or `Connecting` → `Error` (bumping the
    /// retry counter and recording the formatted vendor error). Never waits
    /// longer than the adapter's own connect timeout.
    pub async fn connect(&mut self, id: usize) -> FocasResult<()> {
        let record = self
            .machines
            .get(id)
            .ok_or_else(|| FocasError::machine_not_found(id))?;

        if !record.enabled || record.state == ConnectionState::Connected {
            return Ok(());
        }

        let name = record.name.clone();
        let ip = record.ip.clone();
        let port = record.port;

        self.machines[id].state = ConnectionState::Connecting;
        info!(
            "Connecting to {} at {}:{} (timeout: {}s)...",
            name,
            ip,
            port,
            self.config.connect_timeout.as_secs()
        );

        let result = self
            .adapter
            .connect(&ip, port, self.config.connect_timeout)
            .await;

        match result {
            Ok(handle) => {
                self.machines[id].mark_connected(handle);
                self.total_connections += 1;
                info!("Connected to {} (handle: {})", name, handle);
                Ok(())
            }
            Err(err) => {
                let message = err.message();
                self.machines[id].mark_connect_failed(message.clone());
                warn!("Connection to {} failed ({})", name, message);
                if self.config.diagnostics {
                    for line in err.code.troubleshooting().lines() {
                        warn!("  {}", line);
                    }
                }
                Err(FocasError::connection_failed(format!("{}: {}", name, message)))
            }
        }
    }

    /// Connect every machine, one attempt each, in registration order
    ///
    /// Never short-circuits: a failure moves on to the next machine. The
    /// summary reports how the sweep went; `all_connected()` is the
    /// aggregate success condition.
    pub async fn connect_all(&mut self) -> ConnectSummary {
        let mut summary = ConnectSummary {
            successful: 0,
            failed: 0,
        };

        for id in 0..self.machines.len() {
            match self.connect(id).await {
                Ok(()) => summary.successful += 1,
                Err(_) => summary.failed += 1,
            }
        }

        if summary.failed > 0 {
            warn!(
                "Connection summary: {} successful, {} failed",
                summary.successful, summary.failed
            );
            if summary.failed == self.machines.len() {
                warn!("All machines failed to connect. Common solutions:");
                warn!("  * Verify machine IP addresses are correct");
                warn!("  * Check network connectivity (ping machines)");
                warn!("  * Ensure machines are powered on");
                warn!("  * Verify FOCAS ethernet option is enabled");
                warn!("  * Check firewall settings");
            }
        }

        summary
    }

    /// Disconnect one machine
    ///
    /// Releases the adapter session if one is held, then unconditionally
    /// leaves the record `Disconnected` with the handle cleared. Idempotent.
    pub async fn disconnect(&mut self, id: usize) -> FocasResult<()> {
        let record = self
            .machines
            .get(id)
            .ok_or_else(|| FocasError::machine_not_found(id))?;

        if let Some(handle) = record.handle {
            self.adapter.disconnect(handle).await;
        }
        self.machines[id].mark_disconnected();
        Ok(())
    }

    /// Disconnect every machine; idempotent
    pub async fn disconnect_all(&mut self) {
        for id in 0..self.machines.len() {
            // Index is always in range here, the error path is unreachable.
            let _ = self.disconnect(id).await;
        }
    }

    /// Disconnect everything and restore the empty zero state
    pub async fn cleanup(&mut self) {
        self.disconnect_all().await;
        self.reset();
    }

    /// Drop all registrations and counters; the pool stays usable
    pub fn reset(&mut self) {
        self.machines.clear();
        self.created = Utc::now();
        self.total_connections = 0;
        self.successful_operations = 0;
        self.failed_operations = 0;
    }

    /// Enable or disable a machine without compacting indices
    pub fn set_enabled(&mut self, id: usize, enabled: bool) -> FocasResult<()> {
        let record = self
            .machines
            .get_mut(id)
            .ok_or_else(|| FocasError::machine_not_found(id))?;
        record.enabled = enabled;
        Ok(())
    }

    /// Borrow one machine record
    pub fn machine(&self, id: usize) -> FocasResult<&MachineRecord> {
        self.machines
            .get(id)
            .ok_or_else(|| FocasError::machine_not_found(id))
    }

    /// All records in registration order
    pub fn machines(&self) -> &[MachineRecord] {
        &self.machines
    }

    pub fn machine_count(&self) -> usize {
        self.machines.len()
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    /// Connections established over the pool's lifetime
    pub fn total_connections(&self) -> u64 {
        self.total_connections
    }

    /// Reads that produced fresh or cached data
    pub fn successful_operations(&self) -> u64 {
        self.successful_operations
    }

    /// Reads that produced nothing
    pub fn failed_operations(&self) -> u64 {
        self.failed_operations
    }

    pub(crate) fn adapter(&self) -> &A {
        &self.adapter
    }

    pub(crate) fn machine_mut(&mut self, id: usize) -> &mut MachineRecord {
        &mut self.machines[id]
    }

    pub(crate) fn note_read_success(&mut self) {
        self.successful_operations += 1;
    }

    pub(crate) fn note_read_failure(&mut self) {
        self.failed_operations += 1;
    }

    /// Render the pool status block the `--status` flag prints
    pub fn status_report(&self) -> String {
        let now = Utc::now();
        let mut out = String::new();
        out.push_str("=== Connection Pool Status ===\n");
        out.push_str(&format!(
            "Machines configured: {} / {}\n",
            self.machines.len(),
            self.config.capacity
        ));
        out.push_str(&format!("Total connections: {}\n", self.total_connections));
        out.push_str(&format!(
            "Successful operations: {}\n",
            self.successful_operations
        ));
        out.push_str(&format!("Failed operations: {}\n", self.failed_operations));
        out.push_str(&format!(
            "Pool created: {} seconds ago\n",
            (now - self.created).num_seconds()
        ));
        out.push_str("\n--- Machine Details ---\n");
        for (id, machine) in self.machines.iter().enumerate() {
            out.push_str(&format!(
                "[{}] {} ({})\n",
                id,
                machine.name,
                machine.endpoint()
            ));
            out.push_str(&format!("    State: {}\n", machine.state));
            out.push_str(&format!(
                "    Enabled: {}\n",
                if machine.enabled { "Yes" } else { "No" }
            ));
            out.push_str(&format!("    Retry count: {}\n", machine.retry_count));
            out.push_str(&format!("    Last error: {}\n", machine.last_error));
            if machine.state == ConnectionState::Connected {
                if let Some(connected) = machine.connect_time {
                    out.push_str(&format!(
                        "    Connected for: {} seconds\n",
                        (now - connected).num_seconds()
                    ));
                }
                if let Some(activity) = machine.last_activity {
                    out.push_str(&format!(
                        "    Last activity: {} seconds ago\n",
                        (now - activity).num_seconds()
                    ));
                }
            }
            out.push_str(&format!(
                "    Cached info valid: {}\n\n",
                if machine.has_cache() { "Yes" } else { "No" }
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{SimProfile, SimulatedCnc};

    async fn sim_pool(capacity: usize) -> ConnectionPool<SimulatedCnc> {
        let adapter = SimulatedCnc::new();
        adapter.register("10.0.0.1", 8193, SimProfile::default()).await;
        adapter.register("10.0.0.2", 8193, SimProfile::default()).await;
        ConnectionPool::new(
            adapter,
            PoolConfig {
                capacity,
                ..PoolConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn test_add_machine_assigns_stable_indices() {
        let mut pool = sim_pool(4).await;
        assert_eq!(pool.add_machine("Mill1", "10.0.0.1", 8193).unwrap(), 0);
        assert_eq!(pool.add_machine("Lathe1", "10.0.0.2", 8193).unwrap(), 1);
        assert_eq!(pool.machine_count(), 2);
    }

    #[tokio::test]
    async fn test_add_machine_rejects_at_capacity() {
        let mut pool = sim_pool(2).await;
        pool.add_machine("A", "10.0.0.1", 8193).unwrap();
        pool.add_machine("B", "10.0.0.2", 8193).unwrap();

        let err = pool.add_machine("C", "10.0.0.3", 8193).unwrap_err();
        assert_eq!(err, FocasError::pool_full(2));
        assert_eq!(pool.machine_count(), 2);
    }

    #[tokio::test]
    async fn test_add_machine_rejects_empty_fields() {
        let mut pool = sim_pool(4).await;
        assert!(matches!(
            pool.add_machine("", "10.0.0.1", 8193),
            Err(FocasError::InvalidConfig { .. })
        ));
        assert!(matches!(
            pool.add_machine("Mill1", "", 8193),
            Err(FocasError::InvalidConfig { .. })
        ));
        assert_eq!(pool.machine_count(), 0);
    }

    #[tokio::test]
    async fn test_connect_success_resets_retry_counter() {
        let mut pool = sim_pool(4).await;
        let id = pool.add_machine("Mill1", "10.0.0.1", 8193).unwrap();

        pool.connect(id).await.unwrap();
        let machine = pool.machine(id).unwrap();
        assert!(machine.is_connected());
        assert_eq!(machine.retry_count, 0);
        assert!(machine.connect_time.is_some());
        assert_eq!(pool.total_connections(), 1);

        // Reconnecting a connected machine is a no-op.
        pool.connect(id).await.unwrap();
        assert_eq!(pool.total_connections(), 1);
    }

    #[tokio::test]
    async fn test_connect_failure_increments_retry_counter() {
        let mut pool = sim_pool(4).await;
        let id = pool.add_machine("Ghost", "10.0.0.99", 8193).unwrap();

        assert!(pool.connect(id).await.unwrap_err().is_recoverable());
        let machine = pool.machine(id).unwrap();
        assert_eq!(machine.state, ConnectionState::Error);
        assert_eq!(machine.retry_count, 1);
        assert!(machine.last_error.contains("FOCAS error -16"));

        assert!(pool.connect(id).await.is_err());
        assert_eq!(pool.machine(id).unwrap().retry_count, 2);
    }

    #[tokio::test]
    async fn test_connect_skips_disabled_machines() {
        let mut pool = sim_pool(4).await;
        let id = pool.add_machine("Mill1", "10.0.0.1", 8193).unwrap();
        pool.set_enabled(id, false).unwrap();

        pool.connect(id).await.unwrap();
        assert_eq!(pool.machine(id).unwrap().state, ConnectionState::Disconnected);
        assert_eq!(pool.total_connections(), 0);
    }

    #[tokio::test]
    async fn test_connect_all_does_not_short_circuit() {
        let mut pool = sim_pool(8).await;
        pool.add_machine("Ghost1", "10.0.1.1", 8193).unwrap();
        pool.add_machine("Mill1", "10.0.0.1", 8193).unwrap();
        pool.add_machine("Ghost2", "10.0.1.2", 8193).unwrap();
        pool.add_machine("Lathe1", "10.0.0.2", 8193).unwrap();

        let summary = pool.connect_all().await;
        assert_eq!(summary.successful, 2);
        assert_eq!(summary.failed, 2);
        assert!(!summary.all_connected());

        // The machines after the failures still got their attempt.
        assert!(pool.machine(1).unwrap().is_connected());
        assert!(pool.machine(3).unwrap().is_connected());
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let mut pool = sim_pool(4).await;
        let id = pool.add_machine("Mill1", "10.0.0.1", 8193).unwrap();
        pool.connect(id).await.unwrap();

        pool.disconnect(id).await.unwrap();
        assert_eq!(pool.machine(id).unwrap().state, ConnectionState::Disconnected);
        assert!(pool.machine(id).unwrap().handle.is_none());

        pool.disconnect(id).await.unwrap();
        assert_eq!(pool.machine(id).unwrap().state, ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_out_of_range_index_is_caller_error() {
        let mut pool = sim_pool(4).await;
        assert_eq!(
            pool.connect(9).await.unwrap_err(),
            FocasError::machine_not_found(9)
        );
        assert_eq!(
            pool.disconnect(9).await.unwrap_err(),
            FocasError::machine_not_found(9)
        );
        assert!(pool.machine(9).is_err());
    }

    #[tokio::test]
    async fn test_cleanup_restores_zero_state() {
        let mut pool = sim_pool(4).await;
        let id = pool.add_machine("Mill1", "10.0.0.1", 8193).unwrap();
        pool.connect(id).await.unwrap();

        pool.cleanup().await;
        assert_eq!(pool.machine_count(), 0);
        assert_eq!(pool.total_connections(), 0);

        // Pool stays usable after cleanup.
        assert_eq!(pool.add_machine("Mill1", "10.0.0.1", 8193).unwrap(), 0);
    }
}
