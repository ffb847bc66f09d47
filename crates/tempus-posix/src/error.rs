//! Subsystem error kinds.
//!
//! Every failure is detected and reported before any state mutation;
//! there is no exception-like control flow. Alongside the typed error,
//! each reported failure also updates the calling thread's last-error
//! cell (see [`crate::errno`]).

use tempus_core::units::Timespec;

/// Errors reported by the clock, timer and sleep entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TimeError {
    /// Out-of-range clock id, negative or out-of-range time fields,
    /// an unsupported notification kind, or a handle that does not
    /// refer to a live timer.
    #[error("invalid argument")]
    InvalidArgument,

    /// No RTC device is configured. A configuration condition, distinct
    /// from an invalid argument: dependent operations degrade rather
    /// than crash, and leave the clock offset untouched.
    #[error("no RTC device present")]
    NoRtc,

    /// The timer table is full.
    #[error("out of timer objects")]
    OutOfMemory,

    /// A sleep was woken before its deadline. Not a failure of the
    /// operation itself; carries the time still outstanding, computed
    /// from the ticks actually elapsed.
    #[error("interrupted with {}s {}ns remaining", remaining.sec, remaining.nsec)]
    Interrupted {
        /// Requested duration minus elapsed ticks.
        remaining: Timespec,
    },

    /// Intentionally unimplemented feature (overrun counting).
    #[error("not supported")]
    Unsupported,
}

pub type Result<T> = core::result::Result<T, TimeError>;
