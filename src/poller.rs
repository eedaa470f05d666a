//! # Fleet Poller
//!
//! One poll cycle reads every enabled machine in registration order and
//! assembles a [`MultiMachineSnapshot`], maximizing coverage despite
//! individual machine failures.
//!
//! ## Read-with-fallback algorithm
//!
//! Per machine:
//! 1. A live connection is read directly.
//! 2. A failed read means the session went stale: disconnect, one reconnect,
//!    one re-read. Nothing further this cycle.
//! 3. A machine that starts the cycle disconnected gets a connect attempt
//!    first.
//! 4. A fresh read refreshes the machine's cache and counts as successful.
//! 5. Otherwise the cached snapshot is reported (still a successful read,
//!    with its original capture timestamp); with no cache the machine is
//!    omitted and counted as failed.
//!
//! A fleet of N machines never has its whole report withheld because one
//! controller is offline: the snapshot is always produced, degraded if
//! necessary. Machines are polled strictly sequentially, so a cycle's
//! worst-case duration is N × the per-machine connect timeout.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;

use crate::adapter::{AdapterResult, CncAdapter, SessionHandle};
use crate::machine::{status_label, ConnectionState, MachineInfo, PositionInfo, SpeedInfo, AlarmInfo};
use crate::pool::ConnectionPool;

/// Axes requested from the position read; only the first is populated.
const POSITION_AXES: u8 = 3;

/// One machine's contribution to a snapshot
#[derive(Debug, Clone, Serialize)]
pub struct MachineReading {
    pub name: String,
    /// Connection state the machine ended the cycle in
    pub state: ConnectionState,
    /// True when this entry was served from cache instead of a fresh read
    pub cached: bool,
    pub info: MachineInfo,
}

/// Aggregated result of one poll cycle
///
/// Produced fresh each cycle and never mutated afterwards. A non-zero
/// `failed_reads` does not mean the snapshot is empty: entries for the
/// machines that did produce data are always present.
#[derive(Debug, Clone, Serialize)]
pub struct MultiMachineSnapshot {
    pub machines: Vec<MachineReading>,
    pub successful_reads: usize,
    pub failed_reads: usize,
    pub collection_time: DateTime<Utc>,
    pub duration: Duration,
}

impl MultiMachineSnapshot {
    /// True iff every enabled machine produced data this cycle
    pub fn all_succeeded(&self) -> bool {
        self.failed_reads == 0
    }

    /// Number of machines present in the snapshot
    pub fn machine_count(&self) -> usize {
        self.machines.len()
    }
}

/// Read one complete telemetry snapshot through a live session
///
/// The identity read doubles as the session liveness probe: its failure
/// fails the whole read and triggers the caller's reconnect step. The
/// remaining reads degrade per field to UNKNOWN/zero values, the way the
/// vendor tooling behaves on partially supported controllers. Only the
/// first axis of the position read is populated; Y/Z stay zero.
pub(crate) async fn read_machine_info<A: CncAdapter>(
    adapter: &A,
    handle: SessionHandle,
) -> AdapterResult<MachineInfo> {
    let machine_id = adapter.read_id(handle).await?.to_string();

    let (program_name, program_number) = match adapter.read_program(handle).await {
        Ok(program) => (program.name, program.number),
        Err(_) => ("UNKNOWN".to_string(), 0),
    };

    let status = match adapter.read_status(handle).await {
        Ok(reading) => status_label(reading.run, reading.motion),
        Err(_) => "UNKNOWN".to_string(),
    };

    let sequence_number = adapter.read_sequence(handle).await.unwrap_or(0);

    let position = match adapter.read_position(handle, POSITION_AXES).await {
        Ok(reading) => PositionInfo {
            x_abs: reading.abs,
            x_rel: reading.rel,
            ..PositionInfo::default()
        },
        Err(_) => PositionInfo::default(),
    };

    let speed = match adapter.read_speed(handle).await {
        Ok(reading) => SpeedInfo {
            feed_rate: reading.feed_rate,
            spindle_speed: reading.spindle_speed,
        },
        Err(_) => SpeedInfo::default(),
    };

    let alarm = match adapter.read_alarm(handle).await {
        Ok(reading) => AlarmInfo {
            alarm_status: reading.status,
            has_alarm: reading.active,
        },
        Err(_) => AlarmInfo::default(),
    };

    Ok(MachineInfo {
        machine_id,
        program_name,
        program_number,
        status,
        sequence_number,
        position,
        speed,
        alarm,
        last_updated: Utc::now(),
    })
}

fn live_handle<A: CncAdapter>(pool: &ConnectionPool<A>, id: usize) -> Option<SessionHandle> {
    let record = pool.machines().get(id)?;
    if record.state == ConnectionState::Connected {
        record.handle
    } else {
        None
    }
}

async fn connect_and_read<A: CncAdapter>(
    pool: &mut ConnectionPool<A>,
    id: usize,
) -> Option<MachineInfo> {
    if pool.connect(id).await.is_err() {
        return None;
    }
    let handle = live_handle(pool, id)?;
    read_machine_info(pool.adapter(), handle).await.ok()
}

/// Run one poll cycle over every enabled machine
///
/// Always returns a snapshot; aggregate success is `all_succeeded()`.
pub async fn poll_cycle<A: CncAdapter>(pool: &mut ConnectionPool<A>) -> MultiMachineSnapshot {
    let started = Instant::now();
    let collection_time = Utc::now();
    let mut machines = Vec::new();
    let mut successful_reads = 0;
    let mut failed_reads = 0;

    for id in 0..pool.machine_count() {
        let record = &pool.machines()[id];
        if !record.enabled {
            continue;
        }
        let name = record.name.clone();

        let fresh = if let Some(handle) = live_handle(pool, id) {
            let direct = read_machine_info(pool.adapter(), handle).await;
            match direct {
                Ok(info) => Some(info),
                Err(err) => {
                    warn!(
                        "Persistent connection to {} failed ({}), attempting automatic reconnection...",
                        name, err
                    );
                    let _ = pool.disconnect(id).await;
                    connect_and_read(pool, id).await
                }
            }
        } else {
            connect_and_read(pool, id).await
        };

        match fresh {
            Some(info) => {
                let record = pool.machine_mut(id);
                record.last_activity = Some(Utc::now());
                record.last_info = Some(info.clone());
                let state = record.state;
                pool.note_read_success();
                successful_reads += 1;
                machines.push(MachineReading {
                    name,
                    state,
                    cached: false,
                    info,
                });
            }
            None => {
                let record = &pool.machines()[id];
                if let Some(cached) = record.last_info.clone() {
                    info!("Using cached data for {}", name);
                    let state = record.state;
                    successful_reads += 1;
                    machines.push(MachineReading {
                        name,
                        state,
                        cached: true,
                        info: cached,
                    });
                } else {
                    warn!(
                        "Failed to read from {}: {}; no cached data available, machine missing from this cycle",
                        name, record.last_error
                    );
                    pool.note_read_failure();
                    failed_reads += 1;
                }
            }
        }
    }

    MultiMachineSnapshot {
        machines,
        successful_reads,
        failed_reads,
        collection_time,
        duration: started.elapsed(),
    }
}
