//! POSIX-flavored time services for a tick-driven kernel.
//!
//! Everything here sits on top of the host kernel's primitives, reached
//! through the traits in [`hal`]: a tick counter, an optional RTC, a
//! software timer service, a blocking delay primitive, and optional
//! signal delivery and cycle counting. On top of those this crate
//! builds the tick-synchronized realtime clock ([`clock::WallClock`]),
//! per-process interval timers ([`timer::TimerManager`]), and the sleep
//! entry points ([`sleep`]).
//!
//! [`TimeSubsystem`] bundles the pieces behind the familiar
//! `clock_gettime`/`timer_create`/`nanosleep` names, taking raw POSIX
//! clock ids. The typed building blocks stay public for callers that
//! want them directly.

#![deny(unsafe_code)]

pub mod clock;
pub mod errno;
pub mod error;
pub mod hal;
pub mod sleep;
pub mod timer;

#[cfg(test)]
mod testutil;

pub use clock::{ClockConfig, DEFAULT_TIMEZONE_HOURS, ObsoleteTimezone, WallClock};
pub use error::{Result, TimeError};
pub use hal::Hal;
pub use timer::{Notify, TIMER_MAX, TimerId, TimerManager};

pub use tempus_core::calendar::{CalendarTime, FORMATTED_LEN};
pub use tempus_core::units::{
    CLOCK_CPUTIME_ID, CLOCK_REALTIME, ClockId, Itimerspec, Timespec, Timeval, difftime,
};

use std::sync::Arc;

use crate::hal::Blocker;

/// The assembled subsystem: wall clock, interval timers and sleeps over
/// one [`Hal`] bundle, exposed under the POSIX entry-point names.
pub struct TimeSubsystem {
    clock: Arc<WallClock>,
    timers: TimerManager,
    blocker: Arc<dyn Blocker>,
}

impl TimeSubsystem {
    /// Wires the subsystem to the host kernel. Performs the one startup
    /// RTC resynchronization; an absent or unreadable RTC leaves the
    /// clock reporting unavailable rather than failing construction.
    pub fn new(config: ClockConfig, hal: Hal) -> Self {
        let clock = Arc::new(WallClock::new(config, hal.ticks, hal.rtc, hal.cycles));
        let timers = TimerManager::new(clock.clone(), hal.timers, hal.signals);
        TimeSubsystem {
            clock,
            timers,
            blocker: hal.blocker,
        }
    }

    /// The underlying wall clock.
    #[inline]
    pub fn clock(&self) -> &Arc<WallClock> {
        &self.clock
    }

    /// The underlying timer manager.
    #[inline]
    pub fn timers(&self) -> &TimerManager {
        &self.timers
    }

    fn parse_clock(raw: i32) -> Result<ClockId> {
        ClockId::from_raw(raw).ok_or_else(|| errno::fail(TimeError::InvalidArgument))
    }

    // -----------------------------------------------------------------
    // Clocks
    // -----------------------------------------------------------------

    /// Equivalent to C `clock_gettime`.
    pub fn clock_gettime(&self, clock_id: i32) -> Result<Timespec> {
        self.clock.now_for(Self::parse_clock(clock_id)?)
    }

    /// Equivalent to C `clock_settime`. Only the realtime clock can be
    /// set; sub-second precision of `tp` is dropped to the second the
    /// RTC stores.
    pub fn clock_settime(&self, clock_id: i32, tp: Timespec) -> Result<()> {
        if Self::parse_clock(clock_id)? != ClockId::Realtime || !tp.is_valid() {
            return Err(errno::fail(TimeError::InvalidArgument));
        }
        self.clock.set(tp.sec)
    }

    /// Equivalent to C `clock_getres`.
    pub fn clock_getres(&self, clock_id: i32) -> Result<Timespec> {
        self.clock.resolution(Self::parse_clock(clock_id)?)
    }

    // -----------------------------------------------------------------
    // Sleeps
    // -----------------------------------------------------------------

    /// Equivalent to C `nanosleep`.
    pub fn nanosleep(&self, duration: Timespec) -> Result<()> {
        sleep::sleep_for(&self.clock, self.blocker.as_ref(), duration)
    }

    /// Equivalent to C `clock_nanosleep`; `absolute` stands in for the
    /// `TIMER_ABSTIME` flag.
    pub fn clock_nanosleep(&self, clock_id: i32, absolute: bool, deadline: Timespec) -> Result<()> {
        sleep::sleep_until(
            &self.clock,
            self.blocker.as_ref(),
            Self::parse_clock(clock_id)?,
            absolute,
            deadline,
        )
    }

    // -----------------------------------------------------------------
    // Interval timers
    // -----------------------------------------------------------------

    /// Equivalent to C `timer_create`.
    pub fn timer_create(&self, clock_id: i32, notify: Notify) -> Result<TimerId> {
        self.timers.create(Self::parse_clock(clock_id)?, notify)
    }

    /// Equivalent to C `timer_settime`; returns the previous setting
    /// when `want_old` is set.
    pub fn timer_settime(
        &self,
        id: TimerId,
        absolute: bool,
        new: &Itimerspec,
        want_old: bool,
    ) -> Result<Option<Itimerspec>> {
        self.timers.settime(id, absolute, new, want_old)
    }

    /// Equivalent to C `timer_gettime`.
    pub fn timer_gettime(&self, id: TimerId) -> Result<Itimerspec> {
        self.timers.gettime(id)
    }

    /// Equivalent to C `timer_getoverrun`; overrun counting is not
    /// implemented.
    pub fn timer_getoverrun(&self, id: TimerId) -> Result<u32> {
        self.timers.getoverrun(id)
    }

    /// Equivalent to C `timer_delete`.
    pub fn timer_delete(&self, id: TimerId) -> Result<()> {
        self.timers.delete(id)
    }

    // -----------------------------------------------------------------
    // Legacy second-resolution accessors and timezone
    // -----------------------------------------------------------------

    /// Equivalent to C `time`.
    pub fn time(&self) -> Result<i64> {
        self.clock.time()
    }

    /// Equivalent to C `stime`.
    pub fn stime(&self, sec: i64) -> Result<()> {
        self.clock.stime(sec)
    }

    /// Equivalent to C `gettimeofday`.
    pub fn gettimeofday(&self) -> Result<(Timeval, ObsoleteTimezone)> {
        self.clock.gettimeofday()
    }

    /// Equivalent to C `settimeofday`.
    pub fn settimeofday(&self, tv: Timeval) -> Result<()> {
        self.clock.settimeofday(tv)
    }

    /// Sets the process timezone in whole hours east of UTC.
    pub fn tz_set(&self, hours: i8) {
        self.clock.tz_set(hours);
    }

    /// Process timezone in whole hours east of UTC.
    pub fn tz_get(&self) -> i8 {
        self.clock.tz_get()
    }

    /// Daylight saving is never applied.
    pub fn tz_is_dst(&self) -> bool {
        self.clock.tz_is_dst()
    }

    /// Equivalent to C `localtime_r` at the process timezone.
    pub fn localtime(&self, epoch_secs: i64) -> CalendarTime {
        self.clock.localtime(epoch_secs)
    }

    /// Equivalent to C `mktime`; canonicalizes `t` in place.
    pub fn mktime(&self, t: &mut CalendarTime) -> Result<i64> {
        self.clock.mktime(t)
    }

    /// Equivalent to C `ctime_r` at the process timezone.
    pub fn ctime(&self, epoch_secs: i64) -> [u8; FORMATTED_LEN] {
        self.clock.ctime(epoch_secs)
    }
}
