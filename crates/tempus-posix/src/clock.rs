//! Tick-synchronized wall clock.
//!
//! A process-wide offset maps the free-running tick counter to
//! wall-clock time: `wall(tick) = base + tick/hz`. The offset is
//! resynchronized from the RTC device once at startup and rewritten by
//! the set-time entry points; every read or write of it happens under
//! one short lock so concurrent readers never observe a torn update.
//! The legacy second-resolution accessors (`time`, `stime`,
//! `gettimeofday`, `settimeofday`) bypass the offset and talk to the
//! RTC directly, so they can diverge slightly from the tick-derived
//! clock between RTC reads.

use std::sync::Arc;
use std::sync::atomic::{AtomicI8, Ordering};

use parking_lot::Mutex;

use tempus_core::calendar::{self, CalendarTime, FORMATTED_LEN};
use tempus_core::units::{ClockId, MICROS_PER_SEC, NANOS_PER_SEC, Timespec, Timeval};

use crate::errno;
use crate::error::{Result, TimeError};
use crate::hal::{CycleCounter, RtcDevice, TickSource};

/// Warning logged whenever an RTC-dependent operation finds no device.
const WARNING_NO_RTC: &str = "Cannot find a RTC device!";

/// Default process timezone: UTC+8, whole hours.
pub const DEFAULT_TIMEZONE_HOURS: i8 = 8;

/// Static clock configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockConfig {
    /// Scheduler tick frequency in Hz.
    pub tick_hz: u32,
}

impl Default for ClockConfig {
    fn default() -> Self {
        ClockConfig { tick_hz: 1_000 }
    }
}

/// Wall-clock value at tick 0 of the current offset epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ClockOffset {
    base_sec: i64,
    base_usec: i64,
}

/// Obsolete BSD timezone report, kept for `gettimeofday` compatibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObsoleteTimezone {
    /// Minutes west of Greenwich.
    pub minuteswest: i32,
    /// DST correction type; always 0 (none).
    pub dsttime: i32,
}

/// The tick-synchronized realtime clock plus the process timezone.
pub struct WallClock {
    ticks: Arc<dyn TickSource>,
    rtc: Option<Arc<dyn RtcDevice>>,
    cycles: Option<Arc<dyn CycleCounter>>,
    offset: Mutex<ClockOffset>,
    tick_hz: u32,
    us_per_tick: i64,
    tz_hours: AtomicI8,
}

impl WallClock {
    /// Builds the clock and performs the one startup RTC
    /// resynchronization. Without an RTC (or on a failed read) the
    /// offset starts zeroed; this is the only time a failure zeroes it.
    pub fn new(
        config: ClockConfig,
        ticks: Arc<dyn TickSource>,
        rtc: Option<Arc<dyn RtcDevice>>,
        cycles: Option<Arc<dyn CycleCounter>>,
    ) -> Self {
        assert!(config.tick_hz > 0, "tick frequency must be non-zero");
        let clock = WallClock {
            ticks,
            rtc,
            cycles,
            offset: Mutex::new(ClockOffset::default()),
            tick_hz: config.tick_hz,
            us_per_tick: MICROS_PER_SEC / config.tick_hz as i64,
            tz_hours: AtomicI8::new(DEFAULT_TIMEZONE_HOURS),
        };
        let _ = clock.resync_from_rtc();
        clock
    }

    /// Tick frequency in Hz.
    #[inline]
    pub fn tick_hz(&self) -> u32 {
        self.tick_hz
    }

    /// Raw tick counter value.
    #[inline]
    pub fn tick_now(&self) -> u64 {
        self.ticks.now()
    }

    fn rtc(&self) -> Result<&Arc<dyn RtcDevice>> {
        match &self.rtc {
            Some(device) => Ok(device),
            None => {
                log::warn!("{WARNING_NO_RTC}");
                Err(errno::fail(TimeError::NoRtc))
            }
        }
    }

    /// Re-reads the RTC and rebases the offset on the current tick.
    ///
    /// `base_sec = rtc_sec - tick/hz - 1`; the extra second absorbs the
    /// truncation of the integer tick division. The sub-second part is
    /// seeded from the tick fraction.
    pub fn resync_from_rtc(&self) -> Result<()> {
        let sec = self.rtc()?.read_seconds()?;
        let hz = self.tick_hz as u64;
        let mut offset = self.offset.lock();
        let tick = self.ticks.now();
        offset.base_usec = (tick % hz) as i64 * self.us_per_tick;
        offset.base_sec = sec - (tick / hz) as i64 - 1;
        Ok(())
    }

    /// Current realtime clock value.
    ///
    /// Tick and offset are read under one lock. Successive calls
    /// without an intervening set never go backwards. An absent RTC is
    /// a configuration failure reported as [`TimeError::NoRtc`],
    /// distinct from an invalid argument.
    pub fn now(&self) -> Result<Timespec> {
        if self.rtc.is_none() {
            log::warn!("{WARNING_NO_RTC}");
            return Err(errno::fail(TimeError::NoRtc));
        }
        let hz = self.tick_hz as u64;
        let offset = self.offset.lock();
        let tick = self.ticks.now();
        let mut sec = offset.base_sec + (tick / hz) as i64;
        let mut nsec = (offset.base_usec + (tick % hz) as i64 * self.us_per_tick) * 1_000;
        if nsec >= NANOS_PER_SEC {
            sec += nsec / NANOS_PER_SEC;
            nsec %= NANOS_PER_SEC;
        }
        Ok(Timespec::new(sec, nsec))
    }

    /// Current value of `clock_id`.
    pub fn now_for(&self, clock_id: ClockId) -> Result<Timespec> {
        match clock_id {
            ClockId::Realtime => self.now(),
            ClockId::Cputime => {
                let counter = self.cycle_counter()?;
                let ns = (counter.now() as f64 * counter.resolution_ns()) as i64;
                Ok(Timespec::new(ns / NANOS_PER_SEC, ns % NANOS_PER_SEC))
            }
        }
    }

    /// Sets the realtime clock to `sec`, rebasing the offset and
    /// writing the RTC device. Without an RTC nothing is touched and
    /// the failure is reported.
    ///
    /// The sub-second base is chosen so that an immediate read returns
    /// `sec` to within one tick period.
    pub fn set(&self, sec: i64) -> Result<()> {
        let rtc = self.rtc()?;
        let hz = self.tick_hz as u64;
        {
            let mut offset = self.offset.lock();
            let tick = self.ticks.now();
            offset.base_usec = MICROS_PER_SEC - (tick % hz) as i64 * self.us_per_tick;
            offset.base_sec = sec - (tick / hz) as i64 - 1;
        }
        rtc.write_seconds(sec)
    }

    /// Resolution of `clock_id`: one tick period for the realtime
    /// clock, the cycle counter's own unit for the CPU-time clock.
    pub fn resolution(&self, clock_id: ClockId) -> Result<Timespec> {
        match clock_id {
            ClockId::Realtime => Ok(Timespec::new(0, NANOS_PER_SEC / self.tick_hz as i64)),
            ClockId::Cputime => {
                let counter = self.cycle_counter()?;
                Ok(Timespec::new(0, counter.resolution_ns() as i64))
            }
        }
    }

    fn cycle_counter(&self) -> Result<&Arc<dyn CycleCounter>> {
        // No cycle counter means the CPU-time clock id is simply not a
        // valid clock on this platform.
        self.cycles
            .as_ref()
            .ok_or_else(|| errno::fail(TimeError::InvalidArgument))
    }

    pub(crate) fn cycle_counter_ref(&self) -> Option<&Arc<dyn CycleCounter>> {
        self.cycles.as_ref()
    }

    /// Converts an absolute realtime deadline to a relative tick delay
    /// from the current tick, clamped to zero if already due. Used by
    /// absolute-time timer arming and absolute sleeps.
    pub fn deadline_to_relative_ticks(&self, deadline: Timespec) -> Result<u64> {
        if self.rtc.is_none() {
            log::warn!("{WARNING_NO_RTC}");
            return Err(errno::fail(TimeError::NoRtc));
        }
        let hz = self.tick_hz as i128;
        let offset = self.offset.lock();
        let tick = self.ticks.now();
        let target = (deadline.sec as i128 - offset.base_sec as i128) * hz
            + ((deadline.nsec as i128 - offset.base_usec as i128 * 1_000) * hz)
                / NANOS_PER_SEC as i128;
        let delta = target - tick as i128;
        if delta <= 0 {
            Ok(0)
        } else {
            Ok(u64::try_from(delta).unwrap_or(u64::MAX))
        }
    }

    // -----------------------------------------------------------------
    // Legacy second-resolution accessors (RTC direct, offset bypassed)
    // -----------------------------------------------------------------

    /// Current epoch seconds straight from the RTC.
    pub fn time(&self) -> Result<i64> {
        self.rtc()?.read_seconds()
    }

    /// Writes epoch seconds straight to the RTC.
    pub fn stime(&self, sec: i64) -> Result<()> {
        self.rtc()?.write_seconds(sec)
    }

    /// Full seconds/microseconds straight from the RTC, plus the
    /// obsolete timezone report.
    pub fn gettimeofday(&self) -> Result<(Timeval, ObsoleteTimezone)> {
        let tv = self.rtc()?.read()?;
        let tz = ObsoleteTimezone {
            minuteswest: -(self.tz_get() as i32) * 60,
            dsttime: 0,
        };
        Ok((tv, tz))
    }

    /// Writes a full seconds/microseconds value straight to the RTC.
    pub fn settimeofday(&self, tv: Timeval) -> Result<()> {
        if !tv.is_valid() {
            return Err(errno::fail(TimeError::InvalidArgument));
        }
        self.rtc()?.write(tv)
    }

    // -----------------------------------------------------------------
    // Timezone
    // -----------------------------------------------------------------

    /// Sets the process timezone, in whole hours east of UTC.
    #[inline]
    pub fn tz_set(&self, hours: i8) {
        self.tz_hours.store(hours, Ordering::Relaxed);
    }

    /// Current process timezone in whole hours east of UTC.
    #[inline]
    pub fn tz_get(&self) -> i8 {
        self.tz_hours.load(Ordering::Relaxed)
    }

    /// Daylight saving is never applied.
    #[inline]
    pub fn tz_is_dst(&self) -> bool {
        false
    }

    // -----------------------------------------------------------------
    // Calendar conveniences at the process timezone
    // -----------------------------------------------------------------

    /// Broken-down local time for an epoch instant (`localtime_r`).
    pub fn localtime(&self, epoch_secs: i64) -> CalendarTime {
        calendar::encode_local(epoch_secs, self.tz_get())
    }

    /// Epoch seconds for broken-down local time (`mktime`); the input
    /// is canonicalized in place.
    pub fn mktime(&self, t: &mut CalendarTime) -> Result<i64> {
        calendar::decode_local(t, self.tz_get())
            .map_err(|_| errno::fail(TimeError::InvalidArgument))
    }

    /// Fixed-width local-time rendering of an epoch instant
    /// (`ctime_r`).
    pub fn ctime(&self, epoch_secs: i64) -> [u8; FORMATTED_LEN] {
        calendar::format_epoch_local(epoch_secs, self.tz_get())
    }
}
