//! # FOCAS Monitor Error Handling
//!
//! This module provides the error taxonomy for the fleet monitoring engine,
//! separating operational failures (a controller that cannot be reached) from
//! caller mistakes (a full pool, a bad machine index).
//!
//! ## Error Categories
//!
//! ### Operational Errors
//! - **Connection Errors**: adapter connect/read failures against a machine;
//!   always retryable, the poller degrades to cached data instead of aborting
//!
//! ### Caller Errors
//! - **Pool Full**: capacity exceeded on `add_machine`; not retryable
//! - **Machine Not Found**: index out of range; programmer error
//! - **Invalid Config**: empty machine name/address, unusable machine list
//!   file, or other configuration misuse; programmer error
//!
//! ## Error Recovery
//!
//! The poller never lets an adapter error escape a poll cycle: failures are
//! recorded on the machine record and the cycle continues with the next
//! machine. Only pool misuse surfaces as an immediate error to the caller:
//!
//! ```rust
//! use focas_monitor::{FocasError, FocasResult};
//!
//! fn handle_error(result: FocasResult<usize>) {
//!     match result {
//!         Ok(id) => println!("Machine registered at index {}", id),
//!         Err(error) => {
//!             if error.is_recoverable() {
//!                 println!("Retryable error: {}", error);
//!             } else {
//!                 println!("Caller error, fix the call site: {}", error);
//!             }
//!         }
//!     }
//! }
//! ```

use thiserror::Error;

/// Result type alias for fleet monitoring operations
///
/// Convenience alias using `FocasError` as the error type throughout
/// the crate.
pub type FocasResult<T> = Result<T, FocasError>;

/// Fleet monitoring error types
///
/// The taxonomy deliberately stays small: adapter-level protocol failures are
/// operational data (recorded per machine record, reported in snapshots) and
/// only reach this enum as `ConnectionFailed`. The remaining variants mark
/// misuse of the pool API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FocasError {
    /// Connection or read failure against a machine
    ///
    /// The adapter could not establish a session or a read through an
    /// existing session failed. Retryable; the poller falls back to cached
    /// data when available.
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    /// Pool capacity exceeded
    ///
    /// `add_machine` was called on a pool that already holds its configured
    /// maximum. The add is rejected, the pool is unchanged.
    #[error("Connection pool full: capacity {capacity} reached")]
    PoolFull { capacity: usize },

    /// Machine index out of range
    ///
    /// A pool operation referenced an index that was never assigned.
    /// Indices are append-only and stable, so this is a programmer error.
    #[error("Machine not found: index {index}")]
    MachineNotFound { index: usize },

    /// Configuration misuse
    ///
    /// Empty machine name/address, a machine list file with no valid
    /// entries, or similarly unusable configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl FocasError {
    /// Create a new connection failure error
    pub fn connection_failed<S: Into<String>>(message: S) -> Self {
        Self::ConnectionFailed { message: message.into() }
    }

    /// Create a pool-full error
    pub fn pool_full(capacity: usize) -> Self {
        Self::PoolFull { capacity }
    }

    /// Create a machine-not-found error
    pub fn machine_not_found(index: usize) -> Self {
        Self::MachineNotFound { index }
    }

    /// Create an invalid-configuration error
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig { message: message.into() }
    }

    /// Check if the error is recoverable (can retry)
    ///
    /// `true` only for connection failures: the machine may come back, and
    /// the poller retries it every cycle. The caller-error variants stay
    /// failed no matter how often they are retried.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use focas_monitor::FocasError;
    ///
    /// assert!(FocasError::connection_failed("socket error").is_recoverable());
    /// assert!(!FocasError::pool_full(50).is_recoverable());
    /// ```
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ConnectionFailed { .. })
    }

    /// Check if the error marks misuse by the caller
    ///
    /// Pool-full, bad index, and invalid configuration are call-site bugs,
    /// not conditions of the machine fleet.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::PoolFull { .. } | Self::MachineNotFound { .. } | Self::InvalidConfig { .. }
        )
    }
}

/// Convert from std::io::Error
///
/// File-level failures (machine list loading) surface as configuration
/// errors, preserving the original message.
impl From<std::io::Error> for FocasError {
    fn from(err: std::io::Error) -> Self {
        Self::invalid_config(err.to_string())
    }
}
