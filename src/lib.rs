//! # FOCAS Monitor - Multi-Machine CNC Fleet Monitoring
//!
//! A connection-pool and polling engine for FANUC CNC controllers reachable
//! over FOCAS/Ethernet, designed for factory fleets where individual
//! machines come and go without warning.
//!
//! ## Features
//!
//! - **Connection pooling**: bounded fleet of long-lived sessions with
//!   per-machine lifecycle state and retry bookkeeping
//! - **Degraded-but-available polling**: one bad controller never withholds
//!   the fleet report; failed reads fall back to cached snapshots
//! - **Automatic reconnection**: stale sessions are detected mid-cycle and
//!   reconnected once before giving up for the cycle
//! - **Typed adapter seam**: the vendor protocol stays behind a trait, with
//!   a simulated controller shipped for demos and tests
//! - **Structured cancellation**: the monitor loop stops between cycles via
//!   a cancellation token, no globals involved
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use focas_monitor::{
//!     poll_cycle, ConnectionPool, PoolConfig, SimProfile, SimulatedCnc,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let adapter = SimulatedCnc::new();
//!     adapter.register("192.168.1.100", 8193, SimProfile::default()).await;
//!
//!     let mut pool = ConnectionPool::new(adapter, PoolConfig::default());
//!     pool.add_machine("Mill1", "192.168.1.100", 8193)?;
//!     pool.add_machine("Lathe1", "192.168.1.101", 8193)?;
//!
//!     let summary = pool.connect_all().await;
//!     println!("{} connected, {} failed", summary.successful, summary.failed);
//!
//!     let snapshot = poll_cycle(&mut pool).await;
//!     for reading in &snapshot.machines {
//!         println!("{}: {}", reading.name, reading.info.status);
//!     }
//!
//!     pool.cleanup().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐
//! │  Monitor Loop   │────▶│  Fleet Poller   │
//! │ (interval+stop) │     │ (read/fallback) │
//! └─────────────────┘     └─────────────────┘
//!                                  │
//!                         ┌─────────────────┐
//!                         │ Connection Pool │
//!                         │ (machine state) │
//!                         └─────────────────┘
//!                                  │
//!                         ┌─────────────────┐
//!                         │   CNC Adapter   │
//!                         │ (vendor FOCAS)  │
//!                         └─────────────────┘
//! ```
//!
//! Polling is strictly sequential: one machine at a time in registration
//! order, so a cycle's worst case is N × the per-machine connect timeout.
//! This keeps every machine record free of contention; parallel fan-out
//! would require per-record locking and is deliberately not done here.

/// Error taxonomy and result handling
pub mod error;

/// Vendor protocol adapter seam and the simulated controller
pub mod adapter;

/// Machine data model: states, records, telemetry snapshots
pub mod machine;

/// Connection pool lifecycle management
pub mod pool;

/// Fleet poll cycle with cached fallback
pub mod poller;

/// Interval-driven monitor loop and cycle metrics
pub mod monitor;

/// CLI configuration and machine list files
pub mod config;

/// Console/JSON/CSV snapshot renderers
pub mod output;

// Re-export main types for convenience
pub use adapter::{
    AdapterError, AdapterResult, AlarmReading, CncAdapter, CncId, ErrorCode, PositionReading,
    ProgramReading, SessionHandle, SimProfile, SimulatedCnc, SpeedReading, StatusReading,
};
pub use config::{
    load_machines, parse_machine_spec, save_machines, CliRequest, Config, InfoKind, MachineSpec,
    OutputFormat,
};
pub use error::{FocasError, FocasResult};
pub use machine::{AlarmInfo, ConnectionState, MachineInfo, MachineRecord, PositionInfo, SpeedInfo};
pub use monitor::{Monitor, MonitorOptions, PollMetrics};
pub use output::render;
pub use poller::{poll_cycle, MachineReading, MultiMachineSnapshot};
pub use pool::{ConnectSummary, ConnectionPool, PoolConfig};

/// Maximum number of machines per connection pool
pub const DEFAULT_POOL_CAPACITY: usize = 50;

/// Default connection timeout handed to the adapter (seconds)
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default monitoring interval (seconds)
pub const DEFAULT_MONITOR_INTERVAL_SECS: u64 = 30;

/// Standard FOCAS/Ethernet port
pub const DEFAULT_FOCAS_PORT: u16 = 8193;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
