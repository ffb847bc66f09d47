//! Host-kernel collaborator traits.
//!
//! The subsystem never talks to hardware or the scheduler directly;
//! everything arrives through these traits. The host kernel supplies a
//! free-running tick counter, an optional RTC device, a software timer
//! primitive, a thread-blocking delay primitive, optional signal
//! delivery, and an optional high-resolution cycle counter.

use std::sync::Arc;

use tempus_core::units::Timeval;

use crate::error::Result;

/// Free-running counter incremented at a fixed, configured frequency.
/// Read-only from this subsystem.
pub trait TickSource: Send + Sync {
    /// Current tick count since boot.
    fn now(&self) -> u64;
}

/// Battery-backed real-time clock device. Each call is a complete
/// open/access/close cycle on the device; atomicity beyond a single
/// access is not guaranteed.
pub trait RtcDevice: Send + Sync {
    /// Reads the current epoch seconds (UTC).
    fn read_seconds(&self) -> Result<i64>;

    /// Reads a full seconds/microseconds value.
    fn read(&self) -> Result<Timeval>;

    /// Writes epoch seconds (UTC).
    fn write_seconds(&self, sec: i64) -> Result<()>;

    /// Writes a full seconds/microseconds value.
    fn write(&self, tv: Timeval) -> Result<()>;
}

/// Firing mode of a software timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerMode {
    /// Expire once, then stop.
    OneShot,
    /// Restart automatically with the configured tick count.
    Periodic,
}

/// One schedulable countdown owned by the host kernel's timer wheel.
///
/// The expiry callback supplied at creation runs in timer context, not
/// in a full thread. It must not block, and the service must not hold
/// internal locks for this timer while invoking it, so the callback may
/// call [`SoftTimer::set_ticks`] to reprogram the next expiration.
pub trait SoftTimer: Send {
    fn set_mode(&mut self, mode: TimerMode);

    /// Sets the countdown length for the next start (or the next
    /// automatic restart in periodic mode).
    fn set_ticks(&mut self, ticks: u64);

    fn start(&mut self);

    fn stop(&mut self);

    /// Ticks until the pending expiration; 0 when not running.
    fn remaining_ticks(&self) -> u64;
}

/// Expiry callback type for [`TimerService::create_timer`].
pub type ExpiryFn = Box<dyn FnMut() + Send>;

/// Factory for [`SoftTimer`] instances.
pub trait TimerService: Send + Sync {
    /// Creates a stopped one-shot timer named `name` that invokes
    /// `expiry` from timer context when it fires.
    fn create_timer(&self, name: &str, expiry: ExpiryFn) -> Box<dyn SoftTimer>;
}

/// Result of a blocking delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayOutcome {
    /// The full delay elapsed.
    Completed,
    /// The thread was woken early by an external interruption.
    Interrupted,
}

/// Suspends the calling thread only; never invoked from timer context.
pub trait Blocker: Send + Sync {
    fn delay_ticks(&self, ticks: u64) -> DelayOutcome;
}

/// Delivers a named signal to a destination process. Used by the
/// signal-notification mode of interval timers, from timer context, so
/// implementations must not block.
pub trait SignalDispatch: Send + Sync {
    fn deliver(&self, pid: i32, signo: i32) -> Result<()>;
}

/// Optional high-resolution counter backing the CPU-time clock.
pub trait CycleCounter: Send + Sync {
    /// Current cycle count.
    fn now(&self) -> u64;

    /// Nanoseconds per cycle; implementation-defined, not tied to the
    /// scheduler tick.
    fn resolution_ns(&self) -> f64;
}

/// The full set of collaborators wired in at construction.
#[derive(Clone)]
pub struct Hal {
    pub ticks: Arc<dyn TickSource>,
    /// Absent RTC degrades the wall clock and legacy accessors to a
    /// reported unavailable condition instead of crashing.
    pub rtc: Option<Arc<dyn RtcDevice>>,
    pub timers: Arc<dyn TimerService>,
    pub blocker: Arc<dyn Blocker>,
    pub signals: Option<Arc<dyn SignalDispatch>>,
    pub cycles: Option<Arc<dyn CycleCounter>>,
}
