//! Sleep primitives.
//!
//! A requested duration (or absolute deadline) becomes a tick count on
//! the host kernel's blocking delay primitive. Interruption is not a
//! failure of the sleep itself: the remaining time is computed from the
//! ticks that actually elapsed, never assumed to be the full request,
//! and handed back in the error value.

use tempus_core::units::{ClockId, NANOS_PER_SEC, Timespec};

use crate::clock::WallClock;
use crate::errno;
use crate::error::{Result, TimeError};
use crate::hal::{Blocker, DelayOutcome};

/// Blocks the calling thread for a relative duration.
///
/// Equivalent to `nanosleep`. On interruption returns
/// [`TimeError::Interrupted`] carrying the unslept remainder, rounded
/// to the tick.
pub fn sleep_for(clock: &WallClock, blocker: &dyn Blocker, duration: Timespec) -> Result<()> {
    if !duration.is_valid() {
        return Err(errno::fail(TimeError::InvalidArgument));
    }
    let tick_hz = clock.tick_hz();
    let requested = duration.to_ticks(tick_hz);
    block_ticks(clock, blocker, requested)
}

/// Blocks the calling thread until a deadline on `clock_id`.
///
/// Equivalent to `clock_nanosleep`. With `absolute` set, the deadline
/// is converted through the tick clock offset to a relative delay,
/// clamped to zero when already due; otherwise this behaves like
/// [`sleep_for`]. Only the realtime clock and, where a cycle counter
/// exists, the CPU-time clock are supported.
pub fn sleep_until(
    clock: &WallClock,
    blocker: &dyn Blocker,
    clock_id: ClockId,
    absolute: bool,
    deadline: Timespec,
) -> Result<()> {
    if !deadline.is_valid() {
        return Err(errno::fail(TimeError::InvalidArgument));
    }
    match clock_id {
        ClockId::Realtime => {
            let ticks = if absolute {
                clock.deadline_to_relative_ticks(deadline)?
            } else {
                deadline.to_ticks(clock.tick_hz())
            };
            block_ticks(clock, blocker, ticks)
        }
        ClockId::Cputime => sleep_on_cycles(clock, blocker, absolute, deadline),
    }
}

/// Common tick-delay path: remember where the sleep started so an
/// interruption can report what is still outstanding.
fn block_ticks(clock: &WallClock, blocker: &dyn Blocker, requested: u64) -> Result<()> {
    let start = clock.tick_now();
    match blocker.delay_ticks(requested) {
        DelayOutcome::Completed => Ok(()),
        DelayOutcome::Interrupted => {
            let elapsed = clock.tick_now().saturating_sub(start);
            let remaining = requested.saturating_sub(elapsed);
            Err(errno::fail(TimeError::Interrupted {
                remaining: Timespec::from_ticks(remaining, clock.tick_hz()),
            }))
        }
    }
}

/// CPU-time sleeps run in cycle units and fall back to the scheduler
/// tick for the actual block.
fn sleep_on_cycles(
    clock: &WallClock,
    blocker: &dyn Blocker,
    absolute: bool,
    deadline: Timespec,
) -> Result<()> {
    let counter = clock
        .cycle_counter_ref()
        .ok_or_else(|| errno::fail(TimeError::InvalidArgument))?;
    let unit_ns = counter.resolution_ns();
    let start_cycle = counter.now();

    let deadline_ns = deadline.sec as i128 * NANOS_PER_SEC as i128 + deadline.nsec as i128;
    let mut cycles = (deadline_ns as f64 / unit_ns) as u64;
    if absolute {
        cycles = cycles.saturating_sub(start_cycle);
    }

    let ticks =
        (cycles as f64 * unit_ns * clock.tick_hz() as f64 / NANOS_PER_SEC as f64) as u64;
    match blocker.delay_ticks(ticks) {
        DelayOutcome::Completed => Ok(()),
        DelayOutcome::Interrupted => {
            let elapsed = counter.now().saturating_sub(start_cycle);
            let remaining_ns = ((cycles.saturating_sub(elapsed)) as f64 * unit_ns) as i64;
            Err(errno::fail(TimeError::Interrupted {
                remaining: Timespec::new(
                    remaining_ns / NANOS_PER_SEC,
                    remaining_ns % NANOS_PER_SEC,
                ),
            }))
        }
    }
}
