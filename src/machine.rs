//! Machine data model: connection state, telemetry snapshots, and the
//! per-machine record owned by the connection pool.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::adapter::SessionHandle;

/// Connection lifecycle state of one machine
///
/// Driven exclusively by pool operations and the poller's reconnect step.
/// `Busy` is reserved for future concurrent-access guarding; no transition
/// currently enters it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
    Busy,
}

impl ConnectionState {
    /// Human-readable state name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
            Self::Error => "Error",
            Self::Busy => "Busy",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tool position in millimeters, absolute and relative per axis
///
/// Only X carries data: the read path issues the vendor position call for
/// the first axis only, and Y/Z stay zero-filled. Downstream consumers rely
/// on all six fields being present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PositionInfo {
    pub x_abs: f64,
    pub y_abs: f64,
    pub z_abs: f64,
    pub x_rel: f64,
    pub y_rel: f64,
    pub z_rel: f64,
}

/// Actual feed rate (mm/min) and spindle speed (RPM)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SpeedInfo {
    pub feed_rate: i32,
    pub spindle_speed: i32,
}

/// Alarm word and derived active flag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AlarmInfo {
    pub alarm_status: i32,
    pub has_alarm: bool,
}

/// One complete telemetry snapshot of a machine
///
/// Immutable once produced; a machine's record keeps the latest successful
/// one as cache. `last_updated` is the capture time, which for a cached
/// fallback predates the cycle that reported it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MachineInfo {
    pub machine_id: String,
    /// O-number format, e.g. "O1234"
    pub program_name: String,
    pub program_number: i32,
    /// RUNNING/STOPPED/PAUSED/ALARM, with " (MOVING)" appended while in motion
    pub status: String,
    pub sequence_number: u32,
    pub position: PositionInfo,
    pub speed: SpeedInfo,
    pub alarm: AlarmInfo,
    pub last_updated: DateTime<Utc>,
}

/// Format the run/motion words into the status label
pub fn status_label(run: i16, motion: i16) -> String {
    let mut label = match run {
        0 => "STOPPED".to_string(),
        1 => "RUNNING".to_string(),
        2 => "PAUSED".to_string(),
        3 => "ALARM".to_string(),
        other => format!("UNKNOWN({})", other),
    };
    if motion == 1 {
        label.push_str(" (MOVING)");
    }
    label
}

/// Per-machine registration and connection bookkeeping
///
/// Owned exclusively by the connection pool; the index assigned at
/// registration stays valid for the pool's lifetime. `last_info` doubles as
/// the cache-validity flag.
#[derive(Debug, Clone)]
pub struct MachineRecord {
    pub name: String,
    pub ip: String,
    pub port: u16,
    pub handle: Option<SessionHandle>,
    pub state: ConnectionState,
    pub connect_time: Option<DateTime<Utc>>,
    pub last_activity: Option<DateTime<Utc>>,
    pub retry_count: u32,
    pub last_error: String,
    pub last_info: Option<MachineInfo>,
    pub enabled: bool,
}

impl MachineRecord {
    pub fn new(name: &str, ip: &str, port: u16) -> Self {
        Self {
            name: name.to_string(),
            ip: ip.to_string(),
            port,
            handle: None,
            state: ConnectionState::Disconnected,
            connect_time: None,
            last_activity: None,
            retry_count: 0,
            last_error: "Not connected".to_string(),
            last_info: None,
            enabled: true,
        }
    }

    /// "ip:port" endpoint label for logs
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected && self.handle.is_some()
    }

    /// Whether a cached snapshot is available for fallback
    pub fn has_cache(&self) -> bool {
        self.last_info.is_some()
    }

    pub(crate) fn mark_connected(&mut self, handle: SessionHandle) {
        let now = Utc::now();
        self.handle = Some(handle);
        self.state = ConnectionState::Connected;
        self.connect_time = Some(now);
        self.last_activity = Some(now);
        self.retry_count = 0;
        self.last_error = "Connected successfully".to_string();
    }

    pub(crate) fn mark_connect_failed(&mut self, message: String) {
        self.handle = None;
        self.state = ConnectionState::Error;
        self.retry_count += 1;
        self.last_error = message;
    }

    pub(crate) fn mark_disconnected(&mut self) {
        self.handle = None;
        self.state = ConnectionState::Disconnected;
        self.last_error = "Disconnected".to_string();
    }
}
