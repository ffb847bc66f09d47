//! Time-unit types and conversions.
//!
//! `Timespec`/`Timeval` mirror the POSIX structs; the tick conversions
//! are written for tick frequencies that need not divide one second
//! evenly (100, 1000, 1024, ...), so sub-second conversions go through
//! a scaled-millisecond intermediate instead of truncating division.

/// Nanoseconds per second.
pub const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Microseconds per second.
pub const MICROS_PER_SEC: i64 = 1_000_000;

/// Milliseconds per second.
pub const MILLIS_PER_SEC: i64 = 1_000;

/// Seconds per day.
pub const SECS_PER_DAY: i64 = 24 * 60 * 60;

/// Clock identifiers accepted by the clock and sleep entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockId {
    /// Tick-synchronized wall clock (`CLOCK_REALTIME`).
    Realtime,
    /// Cycle-counter-backed clock (`CLOCK_PROCESS_CPUTIME_ID`), present
    /// only when the platform provides a high-resolution counter.
    Cputime,
}

/// Raw value for [`ClockId::Realtime`].
pub const CLOCK_REALTIME: i32 = 0;
/// Raw value for [`ClockId::Cputime`].
pub const CLOCK_CPUTIME_ID: i32 = 2;

impl ClockId {
    /// Parses a raw POSIX clock id. Returns `None` for unsupported ids.
    #[inline]
    pub const fn from_raw(raw: i32) -> Option<ClockId> {
        match raw {
            CLOCK_REALTIME => Some(ClockId::Realtime),
            CLOCK_CPUTIME_ID => Some(ClockId::Cputime),
            _ => None,
        }
    }

    /// Raw POSIX clock id value.
    #[inline]
    pub const fn to_raw(self) -> i32 {
        match self {
            ClockId::Realtime => CLOCK_REALTIME,
            ClockId::Cputime => CLOCK_CPUTIME_ID,
        }
    }
}

/// A second/nanosecond pair (like `struct timespec`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timespec {
    /// Seconds.
    pub sec: i64,
    /// Nanoseconds (0 to 999 999 999 when valid).
    pub nsec: i64,
}

impl Timespec {
    /// The zero duration / epoch instant.
    pub const ZERO: Timespec = Timespec { sec: 0, nsec: 0 };

    #[inline]
    pub const fn new(sec: i64, nsec: i64) -> Timespec {
        Timespec { sec, nsec }
    }

    /// Returns `true` if both fields are non-negative and the
    /// sub-second field is below one second.
    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.sec >= 0 && self.nsec >= 0 && self.nsec < NANOS_PER_SEC
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.sec == 0 && self.nsec == 0
    }

    /// Converts a (valid) duration to a tick count at `tick_hz`.
    ///
    /// Saturates at `u64::MAX` rather than wrapping.
    pub fn to_ticks(&self, tick_hz: u32) -> u64 {
        let hz = tick_hz as u128;
        let ticks = self.sec.max(0) as u128 * hz
            + (self.nsec.max(0) as u128 * hz) / NANOS_PER_SEC as u128;
        u64::try_from(ticks).unwrap_or(u64::MAX)
    }

    /// Converts a tick count back to seconds/nanoseconds.
    ///
    /// The sub-second part goes through milliseconds first so that
    /// frequencies such as 1024 Hz do not truncate to zero:
    /// `ns = (ticks mod hz) * 1000 * 1_000_000 / hz`.
    pub fn from_ticks(ticks: u64, tick_hz: u32) -> Timespec {
        let hz = tick_hz as u64;
        let sec = (ticks / hz) as i64;
        let nsec = (((ticks % hz) * MILLIS_PER_SEC as u64) * MICROS_PER_SEC as u64 / hz) as i64;
        Timespec { sec, nsec }
    }
}

/// A second/microsecond pair (like `struct timeval`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timeval {
    /// Seconds.
    pub sec: i64,
    /// Microseconds.
    pub usec: i64,
}

impl Timeval {
    pub const ZERO: Timeval = Timeval { sec: 0, usec: 0 };

    #[inline]
    pub const fn new(sec: i64, usec: i64) -> Timeval {
        Timeval { sec, usec }
    }

    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.sec >= 0 && self.usec >= 0 && self.usec < MICROS_PER_SEC
    }

    /// Widens to a `Timespec`.
    #[inline]
    pub const fn to_timespec(self) -> Timespec {
        Timespec {
            sec: self.sec,
            nsec: self.usec * 1_000,
        }
    }
}

/// Interval-timer setting (like `struct itimerspec`): the time until
/// next expiration plus the reload interval for periodic timers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Itimerspec {
    /// Reload interval; zero means one-shot.
    pub interval: Timespec,
    /// Time until next expiration; zero disarms.
    pub value: Timespec,
}

/// Difference between two epoch-second values, in seconds.
///
/// Equivalent to C `difftime`.
#[inline]
pub fn difftime(time1: i64, time0: i64) -> f64 {
    (time1 - time0) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timespec_validation() {
        assert!(Timespec::new(0, 0).is_valid());
        assert!(Timespec::new(5, 999_999_999).is_valid());
        assert!(!Timespec::new(-1, 0).is_valid());
        assert!(!Timespec::new(0, -1).is_valid());
        assert!(!Timespec::new(0, NANOS_PER_SEC).is_valid());
    }

    #[test]
    fn ticks_round_down() {
        // 1.5 s at 100 Hz is exactly 150 ticks.
        assert_eq!(Timespec::new(1, 500_000_000).to_ticks(100), 150);
        // Sub-tick remainders truncate.
        assert_eq!(Timespec::new(0, 9_999_999).to_ticks(100), 0);
    }

    #[test]
    fn from_ticks_non_divisor_frequency() {
        // 512 ticks at 1024 Hz is exactly half a second; the
        // millisecond-scaled path must not truncate it to zero.
        let ts = Timespec::from_ticks(512, 1024);
        assert_eq!(ts.sec, 0);
        assert_eq!(ts.nsec, 500_000_000);
    }

    #[test]
    fn from_ticks_whole_seconds() {
        let ts = Timespec::from_ticks(3_000, 1000);
        assert_eq!(ts, Timespec::new(3, 0));
    }

    #[test]
    fn clock_id_raw_round_trip() {
        assert_eq!(ClockId::from_raw(CLOCK_REALTIME), Some(ClockId::Realtime));
        assert_eq!(ClockId::from_raw(CLOCK_CPUTIME_ID), Some(ClockId::Cputime));
        assert_eq!(ClockId::from_raw(7), None);
        assert_eq!(ClockId::Realtime.to_raw(), CLOCK_REALTIME);
    }

    #[test]
    fn difftime_signed() {
        assert_eq!(difftime(10, 4), 6.0);
        assert_eq!(difftime(4, 10), -6.0);
    }
}
