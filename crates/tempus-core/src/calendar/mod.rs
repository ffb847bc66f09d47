//! Calendar conversion between epoch seconds and broken-down time.
//!
//! Implements the `gmtime`/`timegm`/`asctime` family as pure functions.
//! The epoch base is 1970-01-01T00:00:00Z (a Thursday); years are
//! stored relative to 1900 like `struct tm`. The decode path accepts
//! denormalized fields (seconds beyond 59, months beyond 11, days past
//! the end of the month) and canonicalizes its input in place before
//! converting — callers must treat the argument as mutated.

use crate::units::SECS_PER_DAY;

/// Cumulative days before each month for a non-leap year.
/// `DAYS_BEFORE_MONTH[m+1] - DAYS_BEFORE_MONTH[m]` is the length of
/// month `m`.
const DAYS_BEFORE_MONTH: [i32; 13] = [
    0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334, 365,
];

/// Three-letter day names, each padded to four bytes.
const DAY_NAMES: &[u8] = b"Sun Mon Tue Wed Thu Fri Sat ";

/// Three-letter month names, each padded to four bytes.
const MONTH_NAMES: &[u8] = b"Jan Feb Mar Apr May Jun Jul Aug Sep Oct Nov Dec ";

/// Length of the fixed `asctime`-style output: 24 visible characters
/// plus a newline and a NUL terminator.
pub const FORMATTED_LEN: usize = 26;

/// Errors from the decode path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CalendarError {
    /// Calendar years before 1970 have no epoch-second representation
    /// in this subsystem.
    #[error("calendar year precedes 1970")]
    PreEpochYear,
}

/// Broken-down time (like `struct tm`).
///
/// Fields are normalized after [`encode`] and after a successful
/// [`decode`]; only the decode path accepts denormalized input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalendarTime {
    /// Seconds (0-59; 60 tolerated on the decode path for a leap second).
    pub sec: i32,
    /// Minutes (0-59).
    pub min: i32,
    /// Hours (0-23).
    pub hour: i32,
    /// Day of month (1-31).
    pub mday: i32,
    /// Month (0-11).
    pub mon: i32,
    /// Years since 1900.
    pub year: i32,
    /// Day of week (0-6, Sunday = 0).
    pub wday: i32,
    /// Day of year (0-365).
    pub yday: i32,
    /// Daylight saving flag; always 0, DST is never applied.
    pub isdst: i32,
}

/// Returns `true` if `year` (a full calendar year) is a Gregorian leap
/// year: divisible by 4 and either not by 100 or also by 400.
#[inline]
pub fn is_leap_year(year: i64) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

/// Days in `mon` (0-11) of the full calendar year `year`.
#[inline]
fn days_in_month(mon: i32, year: i64) -> i32 {
    let m = mon as usize;
    DAYS_BEFORE_MONTH[m + 1] - DAYS_BEFORE_MONTH[m] + (mon == 1 && is_leap_year(year)) as i32
}

/// Converts epoch seconds to broken-down UTC time.
///
/// Equivalent to `gmtime_r`. Negative epochs (pre-1970 instants) are
/// handled by borrowing a day so the in-day fields stay non-negative.
pub fn encode(epoch_secs: i64) -> CalendarTime {
    let mut rem = epoch_secs % SECS_PER_DAY;
    let mut days = epoch_secs / SECS_PER_DAY;
    if rem < 0 {
        rem += SECS_PER_DAY;
        days -= 1;
    }

    let sec = (rem % 60) as i32;
    let min = ((rem / 60) % 60) as i32;
    let hour = (rem / 3600) as i32;

    // Epoch day (1970-01-01) was a Thursday.
    let wday = ((days % 7 + 4) % 7 + 7) % 7;

    // Walk whole years away from 1970 until the remainder fits.
    let mut year: i64 = 1970;
    let mut work = days;
    if work >= 0 {
        loop {
            let len = if is_leap_year(year) { 366 } else { 365 };
            if work < len {
                break;
            }
            work -= len;
            year += 1;
        }
    } else {
        loop {
            year -= 1;
            let len = if is_leap_year(year) { 366 } else { 365 };
            work += len;
            if work >= 0 {
                break;
            }
        }
    }

    let yday = work as i32;
    let mut work = yday;

    // Locate the month from the cumulative table. In a leap year every
    // day from March onward sits one slot later, and day 59/60 is
    // February 29th itself.
    let mut mday = 1;
    if is_leap_year(year) && work > 58 {
        if work == 59 {
            mday = 2;
        }
        work -= 1;
    }
    let mut mon = 11;
    while mon > 0 && DAYS_BEFORE_MONTH[mon as usize] > work {
        mon -= 1;
    }
    mday += work - DAYS_BEFORE_MONTH[mon as usize];

    CalendarTime {
        sec,
        min,
        hour,
        mday,
        mon,
        year: (year - 1900) as i32,
        wday: wday as i32,
        yday,
        isdst: 0,
    }
}

/// Converts broken-down UTC time to epoch seconds.
///
/// Equivalent to `timegm`. Out-of-range fields are carried into the
/// next larger unit first (seconds past 60 into minutes, months past 11
/// into years, days past the end of the month across month and year
/// boundaries), then `wday` and `yday` are recomputed, so on return the
/// input has been canonicalized in place. Years before 1970 are
/// rejected.
pub fn decode(t: &mut CalendarTime) -> Result<i64, CalendarError> {
    // Seconds may legitimately reach 60 for a leap second; only carry
    // beyond that.
    if t.sec > 60 {
        t.min += t.sec / 60;
        t.sec %= 60;
    }
    if t.min >= 60 {
        t.hour += t.min / 60;
        t.min %= 60;
    }
    if t.hour >= 24 {
        t.mday += t.hour / 24;
        t.hour %= 24;
    }
    if t.mon >= 12 {
        t.year += t.mon / 12;
        t.mon %= 12;
    }
    loop {
        let len = days_in_month(t.mon, 1900 + t.year as i64);
        if t.mday <= len {
            break;
        }
        t.mday -= len;
        t.mon += 1;
        if t.mon > 11 {
            t.mon = 0;
            t.year += 1;
        }
    }

    if t.year < 70 {
        return Err(CalendarError::PreEpochYear);
    }

    // Days since 1970: 365 per year plus one per leap year. Past 2100
    // the simple (years+1)/4 estimate over-counts century years that
    // are not divisible by 400, three per 400-year block beyond the
    // initial 131-year span.
    let years = t.year as i64 - 70;
    let mut day = years * 365 + (years + 1) / 4;
    if years >= 131 {
        let mut centuries = (years - 131) / 100;
        day -= (centuries >> 2) * 3 + 1;
        centuries &= 3;
        if centuries == 3 {
            centuries -= 1;
        }
        day -= centuries;
    }

    let leap_past_feb = is_leap_year(1900 + t.year as i64) && t.mon > 1;
    t.yday = DAYS_BEFORE_MONTH[t.mon as usize] + t.mday - 1 + leap_past_feb as i32;
    day += t.yday as i64;

    t.wday = ((day + 4) % 7) as i32;

    Ok(((day * 24 + t.hour as i64) * 60 + t.min as i64) * 60 + t.sec as i64)
}

/// Renders two decimal digits. Total for any input: the value is
/// reduced modulo 100 first, so malformed fields cannot underflow the
/// digit arithmetic.
#[inline]
fn num2str(buf: &mut [u8], v: i32) {
    let v = v.rem_euclid(100);
    buf[0] = b'0' + (v / 10) as u8;
    buf[1] = b'0' + (v % 10) as u8;
}

/// Formats broken-down time into the fixed 26-byte `asctime` layout:
/// `"Www Mon dd hh:mm:ss yyyy\n\0"`, with a single-digit day padded
/// with a space.
///
/// Equivalent to `asctime_r`, re-entrant form only. A `wday` or `mon`
/// outside the lookup tables is clamped to a deterministic fallback
/// (Sunday, January, year 2000) and logged; the output in that case is
/// safe but not a validated calendar result.
pub fn format_into(t: &CalendarTime, buf: &mut [u8; FORMATTED_LEN]) {
    let in_range = (0..7).contains(&t.wday) && (0..12).contains(&t.mon);
    let (wday, mon, year) = if in_range {
        (t.wday as usize, t.mon as usize, 1900 + t.year)
    } else {
        log::warn!(
            "calendar fields exceed the lookup tables (wday {}, mon {}); substituting fallback",
            t.wday,
            t.mon
        );
        (0, 0, 2000)
    };

    buf[0..4].copy_from_slice(&DAY_NAMES[wday * 4..wday * 4 + 4]);
    buf[4..8].copy_from_slice(&MONTH_NAMES[mon * 4..mon * 4 + 4]);
    num2str(&mut buf[8..10], t.mday);
    if buf[8] == b'0' {
        buf[8] = b' ';
    }
    buf[10] = b' ';
    num2str(&mut buf[11..13], t.hour);
    buf[13] = b':';
    num2str(&mut buf[14..16], t.min);
    buf[16] = b':';
    num2str(&mut buf[17..19], t.sec);
    buf[19] = b' ';
    num2str(&mut buf[20..22], year / 100);
    num2str(&mut buf[22..24], year % 100);
    buf[24] = b'\n';
    buf[25] = 0;
}

/// Formats broken-down time into a freshly zeroed buffer.
pub fn format(t: &CalendarTime) -> [u8; FORMATTED_LEN] {
    let mut buf = [0u8; FORMATTED_LEN];
    format_into(t, &mut buf);
    buf
}

/// Converts epoch seconds to broken-down time at a fixed whole-hour
/// offset from UTC.
///
/// Equivalent to `localtime_r` with the process timezone passed
/// explicitly. DST is never applied.
#[inline]
pub fn encode_local(epoch_secs: i64, tz_hours: i8) -> CalendarTime {
    encode(epoch_secs + tz_hours as i64 * 3600)
}

/// Converts broken-down local time (at `tz_hours` east of UTC) to
/// epoch seconds. Equivalent to `mktime` with an explicit timezone.
/// Canonicalizes the input in place like [`decode`].
#[inline]
pub fn decode_local(t: &mut CalendarTime, tz_hours: i8) -> Result<i64, CalendarError> {
    Ok(decode(t)? - tz_hours as i64 * 3600)
}

/// Formats an epoch instant as local time in the fixed `asctime`
/// layout. Equivalent to `ctime_r` with an explicit timezone.
#[inline]
pub fn format_epoch_local(epoch_secs: i64, tz_hours: i8) -> [u8; FORMATTED_LEN] {
    format(&encode_local(epoch_secs, tz_hours))
}
