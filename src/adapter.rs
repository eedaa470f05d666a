//! # CNC Protocol Adapter
//!
//! This module defines the seam between the fleet monitoring engine and the
//! vendor FOCAS/Ethernet library. The engine never touches the wire: it talks
//! to a [`CncAdapter`], which opens sessions and issues typed reads against
//! one controller at a time.
//!
//! ## Adapter Contract
//!
//! - `connect` resolves to an opaque [`SessionHandle`] or a negative
//!   [`ErrorCode`]; the call observes its own timeout, the engine adds none.
//! - Each read operation returns a typed value or an [`AdapterError`]
//!   carrying the vendor code.
//! - `disconnect` releases the session; releasing an unknown handle is a
//!   no-op.
//!
//! A production build links the adapter against the FANUC library; this crate
//! ships [`SimulatedCnc`], an in-process stand-in with configurable fault
//! injection for demos and tests.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::sync::Mutex;

/// Vendor protocol error code
///
/// Small negative integers as reported by the FOCAS library. Known codes map
/// to a fixed human-readable table; anything else reads as an unknown
/// protocol error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorCode(pub i16);

impl ErrorCode {
    pub const BUSY: ErrorCode = ErrorCode(-1);
    pub const RESET: ErrorCode = ErrorCode(-2);
    pub const MMCSYS: ErrorCode = ErrorCode(-3);
    pub const PARITY: ErrorCode = ErrorCode(-4);
    pub const SYSTEM: ErrorCode = ErrorCode(-5);
    pub const UNEXP: ErrorCode = ErrorCode(-6);
    pub const VERSION: ErrorCode = ErrorCode(-7);
    pub const HANDLE: ErrorCode = ErrorCode(-8);
    pub const HSSB: ErrorCode = ErrorCode(-9);
    pub const SYSTEM2: ErrorCode = ErrorCode(-10);
    pub const BUS: ErrorCode = ErrorCode(-11);
    pub const DTSRVR: ErrorCode = ErrorCode(-12);
    pub const MODE: ErrorCode = ErrorCode(-13);
    pub const REJECT: ErrorCode = ErrorCode(-14);
    pub const NODLL: ErrorCode = ErrorCode(-15);
    pub const SOCKET: ErrorCode = ErrorCode(-16);
    pub const PROTOCOL: ErrorCode = ErrorCode(-17);
    pub const PASSWD: ErrorCode = ErrorCode(-18);
    pub const NOOPT: ErrorCode = ErrorCode(-19);
    pub const FUNC: ErrorCode = ErrorCode(-20);
    pub const ALARM: ErrorCode = ErrorCode(-21);

    /// Raw vendor code value
    pub fn value(&self) -> i16 {
        self.0
    }

    /// Map the code to its fixed human-readable description
    pub fn describe(&self) -> &'static str {
        match *self {
            Self::BUSY => "Busy",
            Self::RESET => "Reset required",
            Self::MMCSYS => "MMC system error",
            Self::PARITY => "Parity error",
            Self::SYSTEM => "System error",
            Self::UNEXP => "Unexpected error",
            Self::VERSION => "Version mismatch",
            Self::HANDLE => "Invalid handle",
            Self::HSSB => "HSSB communication error",
            Self::SYSTEM2 => "System error",
            Self::BUS => "Bus error",
            Self::DTSRVR => "Data server error",
            Self::MODE => "Mode error",
            Self::REJECT => "Execution rejected",
            Self::NODLL => "DLL not found",
            Self::SOCKET => "Socket communication error",
            Self::PROTOCOL => "Protocol error",
            Self::PASSWD => "Password error",
            Self::NOOPT => "Option not available",
            Self::FUNC => "Function not supported",
            Self::ALARM => "Alarm state",
            _ => "Unknown protocol error",
        }
    }

    /// Operator-facing troubleshooting hints for connection failures
    ///
    /// Connection-class codes carry multi-line guidance (one step per line);
    /// everything else falls back to the plain description.
    pub fn troubleshooting(&self) -> &'static str {
        match *self {
            Self::SOCKET => {
                "Network connection failed\n\
                 > Check if machine IP address is correct and reachable (try: ping <ip>)\n\
                 > Verify port 8193 is open on the machine (try: telnet <ip> 8193)\n\
                 > Ensure machine is powered on and network cable is connected\n\
                 > Check if firewall is blocking the connection"
            }
            Self::PROTOCOL => {
                "FOCAS protocol error\n\
                 > Machine may not support FOCAS ethernet communication\n\
                 > Verify correct port number (standard FOCAS port is 8193)\n\
                 > Check machine ethernet board configuration\n\
                 > Ensure FOCAS ethernet option is installed on the machine"
            }
            Self::PASSWD => {
                "Authentication failed\n\
                 > Check if machine requires password for FOCAS connections\n\
                 > Verify password settings in machine parameters"
            }
            Self::NODLL => {
                "FOCAS library not found or incompatible\n\
                 > Ensure all required vendor libraries are installed\n\
                 > Check if library version matches the machine's FOCAS version"
            }
            Self::VERSION => {
                "FOCAS version mismatch\n\
                 > Machine FOCAS version incompatible with library version\n\
                 > Check machine's FOCAS specification and requirements"
            }
            Self::HANDLE => {
                "Invalid connection handle\n\
                 > Previous connection may have been unexpectedly closed\n\
                 > Machine may have reset or been power cycled\n\
                 > Network connection was interrupted"
            }
            Self::BUSY => {
                "Machine is busy or overloaded\n\
                 > Too many simultaneous FOCAS connections to machine\n\
                 > Wait and retry connection later"
            }
            Self::ALARM => {
                "Machine is in alarm state\n\
                 > Resolve all active alarms on the machine before connecting\n\
                 > Check machine display for alarm messages"
            }
            Self::NOOPT => {
                "FOCAS option not enabled\n\
                 > Ethernet FOCAS option not purchased/enabled on machine\n\
                 > Check machine option list and parameter settings"
            }
            Self::FUNC => {
                "Function not supported\n\
                 > This FOCAS function is not available on this machine model"
            }
            Self::MODE => {
                "Machine mode error\n\
                 > Machine may be in wrong mode for FOCAS communication\n\
                 > Check if machine is in appropriate operating mode"
            }
            _ => self.describe(),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Adapter-level failure: which operation failed and the vendor code
///
/// These are operational data, not crate errors: the pool translates them
/// into per-machine state and a formatted message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterError {
    pub operation: &'static str,
    pub code: ErrorCode,
}

impl AdapterError {
    pub fn new(operation: &'static str, code: ErrorCode) -> Self {
        Self { operation, code }
    }

    /// Format the code the way the operator log expects it
    pub fn message(&self) -> String {
        format!("FOCAS error {}: {}", self.code, self.code.describe())
    }
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed: FOCAS error {} ({})",
            self.operation,
            self.code,
            self.code.describe()
        )
    }
}

impl std::error::Error for AdapterError {}

/// Opaque handle to one controller session
///
/// Handles are non-zero while a session is live; the adapter owns the state
/// behind the handle, exactly as the vendor library does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle(pub u16);

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Controller identity: four 32-bit words
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CncId(pub [u32; 4]);

impl fmt::Display for CncId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:08x}-{:08x}-{:08x}-{:08x}",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

/// Current program as reported by the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramReading {
    /// O-number format, e.g. "O1234"
    pub name: String,
    pub number: i32,
}

/// Run/motion state words
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReading {
    /// 0 stopped, 1 running, 2 paused, 3 alarm; other values pass through
    pub run: i16,
    /// 1 while an axis is in motion
    pub motion: i16,
}

/// First-axis position, already scaled to millimeters
///
/// The vendor call is per-axis; the read path only issues it for the first
/// axis, so Y/Z never appear here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionReading {
    pub abs: f64,
    pub rel: f64,
}

/// Actual feed and spindle speeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeedReading {
    pub feed_rate: i32,
    pub spindle_speed: i32,
}

/// Alarm word: raw status plus the derived active flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmReading {
    pub status: i32,
    pub active: bool,
}

/// Result type for adapter operations
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Typed session interface to one CNC controller
///
/// All methods take `&self`: the adapter keeps its session table internally,
/// mirroring the vendor library's handle-based API. Implementations must be
/// `Send + Sync` so one adapter can serve the whole pool.
#[async_trait]
pub trait CncAdapter: Send + Sync {
    /// Open a session to the controller at `ip:port`
    ///
    /// The adapter observes `timeout` itself; callers never wait longer than
    /// the adapter's own bound.
    async fn connect(&self, ip: &str, port: u16, timeout: Duration) -> AdapterResult<SessionHandle>;

    /// Read the controller identity
    async fn read_id(&self, handle: SessionHandle) -> AdapterResult<CncId>;

    /// Read the current program name and number
    async fn read_program(&self, handle: SessionHandle) -> AdapterResult<ProgramReading>;

    /// Read run state and motion flag
    async fn read_status(&self, handle: SessionHandle) -> AdapterResult<StatusReading>;

    /// Read the current sequence (N-line) number
    async fn read_sequence(&self, handle: SessionHandle) -> AdapterResult<u32>;

    /// Read the scaled first-axis position
    async fn read_position(&self, handle: SessionHandle, axis_count: u8)
        -> AdapterResult<PositionReading>;

    /// Read actual feed rate and spindle speed
    async fn read_speed(&self, handle: SessionHandle) -> AdapterResult<SpeedReading>;

    /// Read the alarm word
    async fn read_alarm(&self, handle: SessionHandle) -> AdapterResult<AlarmReading>;

    /// Release the session; unknown handles are ignored
    async fn disconnect(&self, handle: SessionHandle);
}

/// Delegation for shared adapters
///
/// Lets a pool own `Arc<SimulatedCnc>` while tests and demos keep a handle
/// to script the same adapter.
#[async_trait]
impl<A: CncAdapter + ?Sized> CncAdapter for std::sync::Arc<A> {
    async fn connect(&self, ip: &str, port: u16, timeout: Duration) -> AdapterResult<SessionHandle> {
        (**self).connect(ip, port, timeout).await
    }

    async fn read_id(&self, handle: SessionHandle) -> AdapterResult<CncId> {
        (**self).read_id(handle).await
    }

    async fn read_program(&self, handle: SessionHandle) -> AdapterResult<ProgramReading> {
        (**self).read_program(handle).await
    }

    async fn read_status(&self, handle: SessionHandle) -> AdapterResult<StatusReading> {
        (**self).read_status(handle).await
    }

    async fn read_sequence(&self, handle: SessionHandle) -> AdapterResult<u32> {
        (**self).read_sequence(handle).await
    }

    async fn read_position(
        &self,
        handle: SessionHandle,
        axis_count: u8,
    ) -> AdapterResult<PositionReading> {
        (**self).read_position(handle, axis_count).await
    }

    async fn read_speed(&self, handle: SessionHandle) -> AdapterResult<SpeedReading> {
        (**self).read_speed(handle).await
    }

    async fn read_alarm(&self, handle: SessionHandle) -> AdapterResult<AlarmReading> {
        (**self).read_alarm(handle).await
    }

    async fn disconnect(&self, handle: SessionHandle) {
        (**self).disconnect(handle).await
    }
}

/// Behavior profile for one simulated controller
#[derive(Debug, Clone)]
pub struct SimProfile {
    /// Whether connect attempts succeed
    pub reachable: bool,
    /// Code returned while unreachable
    pub connect_error: ErrorCode,
    /// Fraction of reads that fail spuriously (0.0 = never)
    pub read_fault_rate: f64,
    pub program_number: i32,
    pub run_state: i16,
    pub feed_rate: i32,
    pub spindle_speed: i32,
    pub alarm_status: i32,
}

impl Default for SimProfile {
    fn default() -> Self {
        Self {
            reachable: true,
            connect_error: ErrorCode::SOCKET,
            read_fault_rate: 0.0,
            program_number: 1234,
            run_state: 1,
            feed_rate: 1200,
            spindle_speed: 8000,
            alarm_status: 0,
        }
    }
}

struct SimSession {
    ip: String,
    port: u16,
}

struct SimState {
    profiles: HashMap<(String, u16), SimProfile>,
    sessions: HashMap<u16, SimSession>,
    next_handle: u16,
    sequence: u32,
}

/// In-process stand-in for the vendor adapter
///
/// Registered machines accept connections and serve jittered telemetry;
/// anything else fails with a socket error, like an unplugged controller.
/// Profiles can be flipped at runtime to script stale-connection and
/// fault-injection scenarios.
pub struct SimulatedCnc {
    state: Mutex<SimState>,
}

impl SimulatedCnc {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SimState {
                profiles: HashMap::new(),
                sessions: HashMap::new(),
                next_handle: 1,
                sequence: 10,
            }),
        }
    }

    /// Register a controller at `ip:port` with the given behavior
    pub async fn register(&self, ip: &str, port: u16, profile: SimProfile) {
        let mut state = self.state.lock().await;
        state.profiles.insert((ip.to_string(), port), profile);
    }

    /// Flip reachability of a registered controller
    ///
    /// Live sessions stay in the table, so reads through an existing handle
    /// keep working until the session is dropped; set `read_fault_rate` to
    /// 1.0 as well to kill an established connection.
    pub async fn set_reachable(&self, ip: &str, port: u16, reachable: bool) {
        let mut state = self.state.lock().await;
        if let Some(profile) = state.profiles.get_mut(&(ip.to_string(), port)) {
            profile.reachable = reachable;
        }
    }

    /// Update the fault rate of a registered controller
    pub async fn set_read_fault_rate(&self, ip: &str, port: u16, rate: f64) {
        let mut state = self.state.lock().await;
        if let Some(profile) = state.profiles.get_mut(&(ip.to_string(), port)) {
            profile.read_fault_rate = rate;
        }
    }

    /// Number of live sessions (for tests)
    pub async fn session_count(&self) -> usize {
        self.state.lock().await.sessions.len()
    }

    async fn profile_for(&self, handle: SessionHandle) -> AdapterResult<SimProfile> {
        let state = self.state.lock().await;
        let session = state
            .sessions
            .get(&handle.0)
            .ok_or_else(|| AdapterError::new("read", ErrorCode::HANDLE))?;
        let key = (session.ip.clone(), session.port);
        state
            .profiles
            .get(&key)
            .cloned()
            .ok_or_else(|| AdapterError::new("read", ErrorCode::HANDLE))
    }

    fn roll_fault(profile: &SimProfile, operation: &'static str) -> AdapterResult<()> {
        if profile.read_fault_rate > 0.0
            && rand::thread_rng().gen_bool(profile.read_fault_rate.clamp(0.0, 1.0))
        {
            return Err(AdapterError::new(operation, ErrorCode::SOCKET));
        }
        Ok(())
    }
}

impl Default for SimulatedCnc {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CncAdapter for SimulatedCnc {
    async fn connect(&self, ip: &str, port: u16, _timeout: Duration) -> AdapterResult<SessionHandle> {
        let mut state = self.state.lock().await;
        let key = (ip.to_string(), port);
        let refusal = match state.profiles.get(&key) {
            Some(profile) if profile.reachable => None,
            Some(profile) => Some(profile.connect_error),
            None => Some(ErrorCode::SOCKET),
        };
        if let Some(code) = refusal {
            return Err(AdapterError::new("connect", code));
        }

        let handle = state.next_handle;
        state.next_handle = state.next_handle.wrapping_add(1).max(1);
        state.sessions.insert(
            handle,
            SimSession {
                ip: ip.to_string(),
                port,
            },
        );
        Ok(SessionHandle(handle))
    }

    async fn read_id(&self, handle: SessionHandle) -> AdapterResult<CncId> {
        let profile = self.profile_for(handle).await?;
        Self::roll_fault(&profile, "read_id")?;
        let seed = handle.0 as u32;
        Ok(CncId([0x1A2B0000 | seed, 0x3C4D, 0x5E6F, seed.wrapping_mul(0x9E37)]))
    }

    async fn read_program(&self, handle: SessionHandle) -> AdapterResult<ProgramReading> {
        let profile = self.profile_for(handle).await?;
        Self::roll_fault(&profile, "read_program")?;
        Ok(ProgramReading {
            name: format!("O{:04}", profile.program_number),
            number: profile.program_number,
        })
    }

    async fn read_status(&self, handle: SessionHandle) -> AdapterResult<StatusReading> {
        let profile = self.profile_for(handle).await?;
        Self::roll_fault(&profile, "read_status")?;
        Ok(StatusReading {
            run: profile.run_state,
            motion: if profile.run_state == 1 { 1 } else { 0 },
        })
    }

    async fn read_sequence(&self, handle: SessionHandle) -> AdapterResult<u32> {
        let profile = self.profile_for(handle).await?;
        Self::roll_fault(&profile, "read_sequence")?;
        let mut state = self.state.lock().await;
        state.sequence = state.sequence.wrapping_add(10);
        Ok(state.sequence)
    }

    async fn read_position(
        &self,
        handle: SessionHandle,
        _axis_count: u8,
    ) -> AdapterResult<PositionReading> {
        let profile = self.profile_for(handle).await?;
        Self::roll_fault(&profile, "read_position")?;
        let jitter = rand::thread_rng().gen_range(-0.05..0.05);
        Ok(PositionReading {
            abs: 125.400 + jitter,
            rel: 10.250 + jitter,
        })
    }

    async fn read_speed(&self, handle: SessionHandle) -> AdapterResult<SpeedReading> {
        let profile = self.profile_for(handle).await?;
        Self::roll_fault(&profile, "read_speed")?;
        let mut rng = rand::thread_rng();
        Ok(SpeedReading {
            feed_rate: profile.feed_rate + rng.gen_range(-25..=25),
            spindle_speed: profile.spindle_speed + rng.gen_range(-100..=100),
        })
    }

    async fn read_alarm(&self, handle: SessionHandle) -> AdapterResult<AlarmReading> {
        let profile = self.profile_for(handle).await?;
        Self::roll_fault(&profile, "read_alarm")?;
        Ok(AlarmReading {
            status: profile.alarm_status,
            active: profile.alarm_status != 0,
        })
    }

    async fn disconnect(&self, handle: SessionHandle) {
        let mut state = self.state.lock().await;
        state.sessions.remove(&handle.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_table() {
        assert_eq!(ErrorCode::SOCKET.describe(), "Socket communication error");
        assert_eq!(ErrorCode::BUSY.describe(), "Busy");
        assert_eq!(ErrorCode(-99).describe(), "Unknown protocol error");
    }

    #[test]
    fn test_troubleshooting_falls_back_to_description() {
        assert!(ErrorCode::SOCKET.troubleshooting().contains("ping"));
        assert_eq!(ErrorCode::RESET.troubleshooting(), "Reset required");
    }

    #[test]
    fn test_adapter_error_message() {
        let err = AdapterError::new("connect", ErrorCode::SOCKET);
        assert_eq!(err.message(), "FOCAS error -16: Socket communication error");
        assert!(format!("{}", err).contains("connect failed"));
    }

    #[test]
    fn test_cnc_id_display() {
        let id = CncId([0x1, 0x2, 0xAB, 0xCDEF]);
        assert_eq!(format!("{}", id), "00000001-00000002-000000ab-0000cdef");
    }

    #[tokio::test]
    async fn test_simulated_connect_and_read() {
        let sim = SimulatedCnc::new();
        sim.register("10.0.0.1", 8193, SimProfile::default()).await;

        let handle = sim
            .connect("10.0.0.1", 8193, Duration::from_secs(1))
            .await
            .expect("registered machine should accept connections");
        assert_ne!(handle.0, 0);

        let program = sim.read_program(handle).await.unwrap();
        assert_eq!(program.name, "O1234");
        assert_eq!(program.number, 1234);

        let status = sim.read_status(handle).await.unwrap();
        assert_eq!(status.run, 1);

        sim.disconnect(handle).await;
        assert_eq!(sim.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_simulated_unknown_machine_refuses() {
        let sim = SimulatedCnc::new();
        let err = sim
            .connect("10.0.0.99", 8193, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::SOCKET);
    }

    #[tokio::test]
    async fn test_simulated_unreachable_uses_profile_code() {
        let sim = SimulatedCnc::new();
        sim.register(
            "10.0.0.2",
            8193,
            SimProfile {
                reachable: false,
                connect_error: ErrorCode::PROTOCOL,
                ..SimProfile::default()
            },
        )
        .await;

        let err = sim
            .connect("10.0.0.2", 8193, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PROTOCOL);
    }

    #[tokio::test]
    async fn test_stale_handle_read_fails() {
        let sim = SimulatedCnc::new();
        sim.register("10.0.0.3", 8193, SimProfile::default()).await;
        let handle = sim
            .connect("10.0.0.3", 8193, Duration::from_secs(1))
            .await
            .unwrap();
        sim.disconnect(handle).await;

        let err = sim.read_status(handle).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::HANDLE);
    }
}
