//! Per-process interval timers.
//!
//! Each timer wraps one host-kernel software timer. Periodicity is
//! never delegated to the primitive's own repeat feature alone: the
//! reload tick count is recomputed on every expiration, because
//! nanosecond remainders need not divide evenly into ticks. Handles
//! are indices into a bounded generational arena, so a stale or
//! foreign handle is rejected as an invalid argument instead of being
//! dereferenced.
//!
//! Operations on one handle are serialized against that timer's own
//! expiration by a per-object lock; interleaving `settime`/`delete`
//! calls on the same handle from several threads beyond that is the
//! caller's responsibility.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use tempus_core::units::{ClockId, Itimerspec, Timespec};

use crate::clock::WallClock;
use crate::errno;
use crate::error::{Result, TimeError};
use crate::hal::{SignalDispatch, SoftTimer, TimerMode, TimerService};

/// Maximum number of live timer objects per process.
pub const TIMER_MAX: usize = 64;

/// Expiration notification, chosen at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notify {
    /// Expire silently; state still advances.
    None,
    /// Invoke `f(arg)` directly from timer context. Must not block.
    Callback { f: fn(usize), arg: usize },
    /// Deliver `signo` to process `pid`.
    Signal { pid: i32, signo: i32 },
    /// Thread-based notification; accepted by the type so callers can
    /// request it, but rejected by `create` as an invalid argument.
    Thread,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Inactive,
    Active,
}

/// State shared between the timer table and the expiry callback.
struct TimerShared {
    timer: Option<Box<dyn SoftTimer>>,
    /// Reload interval last set; reported verbatim by `gettime`.
    interval: Timespec,
    /// Armed value last set.
    value: Timespec,
    /// Reload tick count for the pending expiration.
    reload: u64,
    status: Status,
    notify: Notify,
}

struct Slot {
    shared: Option<Arc<Mutex<TimerShared>>>,
    generation: u32,
}

struct TimerTable {
    slots: Vec<Slot>,
    free: Vec<usize>,
}

/// Opaque timer handle: arena index plus generation counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerId {
    index: u32,
    generation: u32,
}

impl TimerTable {
    fn allocate(&mut self, shared: Arc<Mutex<TimerShared>>) -> Result<TimerId> {
        let index = match self.free.pop() {
            Some(index) => index,
            None if self.slots.len() < TIMER_MAX => {
                self.slots.push(Slot {
                    shared: None,
                    generation: 0,
                });
                self.slots.len() - 1
            }
            None => return Err(errno::fail(TimeError::OutOfMemory)),
        };
        let slot = &mut self.slots[index];
        slot.shared = Some(shared);
        Ok(TimerId {
            index: index as u32,
            generation: slot.generation,
        })
    }

    fn get(&self, id: TimerId) -> Result<Arc<Mutex<TimerShared>>> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.shared.clone())
            .ok_or_else(|| errno::fail(TimeError::InvalidArgument))
    }

    /// Removes the slot's object and bumps the generation so the
    /// handle (and any copy of it) goes stale.
    fn release(&mut self, id: TimerId) -> Result<Arc<Mutex<TimerShared>>> {
        let slot = self
            .slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .ok_or_else(|| errno::fail(TimeError::InvalidArgument))?;
        let shared = slot
            .shared
            .take()
            .ok_or_else(|| errno::fail(TimeError::InvalidArgument))?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index as usize);
        Ok(shared)
    }
}

/// Owner of all per-process timer objects.
pub struct TimerManager {
    clock: Arc<WallClock>,
    service: Arc<dyn TimerService>,
    signals: Option<Arc<dyn SignalDispatch>>,
    table: Mutex<TimerTable>,
}

impl TimerManager {
    pub fn new(
        clock: Arc<WallClock>,
        service: Arc<dyn TimerService>,
        signals: Option<Arc<dyn SignalDispatch>>,
    ) -> Self {
        TimerManager {
            clock,
            service,
            signals,
            table: Mutex::new(TimerTable {
                slots: Vec::new(),
                free: Vec::new(),
            }),
        }
    }

    /// Creates a disarmed timer on `clock_id` with the given
    /// notification. Thread-based notification is rejected.
    pub fn create(&self, _clock_id: ClockId, notify: Notify) -> Result<TimerId> {
        if matches!(notify, Notify::Thread) {
            return Err(errno::fail(TimeError::InvalidArgument));
        }

        let shared = Arc::new(Mutex::new(TimerShared {
            timer: None,
            interval: Timespec::ZERO,
            value: Timespec::ZERO,
            reload: 0,
            status: Status::Inactive,
            notify,
        }));
        let id = self.table.lock().allocate(shared.clone())?;

        let weak = Arc::downgrade(&shared);
        let tick_hz = self.clock.tick_hz();
        let signals = self.signals.clone();
        let name = format!("ptimer{:02}", id.index);
        let soft = self.service.create_timer(
            &name,
            Box::new(move || on_expire(&weak, tick_hz, signals.as_deref())),
        );
        shared.lock().timer = Some(soft);
        Ok(id)
    }

    /// Arms, re-arms or disarms a timer.
    ///
    /// All fields are validated before anything changes. A zero `value`
    /// disarms without touching the stored interval. `absolute` treats
    /// `value` as a wall-clock deadline converted through the tick
    /// clock offset, clamped to fire immediately when already past.
    pub fn settime(
        &self,
        id: TimerId,
        absolute: bool,
        new: &Itimerspec,
        want_old: bool,
    ) -> Result<Option<Itimerspec>> {
        let shared = self.table.lock().get(id)?;
        if !new.interval.is_valid() || !new.value.is_valid() {
            return Err(errno::fail(TimeError::InvalidArgument));
        }

        let old = want_old.then(|| read_spec(&shared, self.clock.tick_hz()));

        if new.value.is_zero() {
            let mut t = shared.lock();
            if t.status == Status::Active {
                if let Some(timer) = t.timer.as_mut() {
                    timer.stop();
                }
            }
            t.status = Status::Inactive;
            return Ok(old);
        }

        let reload = if absolute {
            self.clock.deadline_to_relative_ticks(new.value)?
        } else {
            new.value.to_ticks(self.clock.tick_hz())
        };

        let mut t = shared.lock();
        t.reload = reload;
        t.interval = new.interval;
        t.value = new.value;
        if t.status == Status::Active {
            if let Some(timer) = t.timer.as_mut() {
                timer.stop();
            }
        }
        t.status = Status::Active;
        if let Some(timer) = t.timer.as_mut() {
            let mode = if new.interval.is_zero() {
                TimerMode::OneShot
            } else {
                TimerMode::Periodic
            };
            timer.set_mode(mode);
            timer.set_ticks(reload);
            timer.start();
        }
        Ok(old)
    }

    /// Remaining time and last-set interval.
    ///
    /// The interval is reported verbatim regardless of arm state; the
    /// remaining value is zero for a disarmed timer.
    pub fn gettime(&self, id: TimerId) -> Result<Itimerspec> {
        let shared = self.table.lock().get(id)?;
        Ok(read_spec(&shared, self.clock.tick_hz()))
    }

    /// Overrun counting is not implemented.
    pub fn getoverrun(&self, _id: TimerId) -> Result<u32> {
        Err(errno::fail(TimeError::Unsupported))
    }

    /// Stops (if armed) and destroys a timer. A handle that does not
    /// name a live timer fails with no side effect.
    pub fn delete(&self, id: TimerId) -> Result<()> {
        let shared = self.table.lock().release(id)?;
        let mut t = shared.lock();
        if t.status == Status::Active {
            if let Some(timer) = t.timer.as_mut() {
                timer.stop();
            }
            t.status = Status::Inactive;
        }
        t.timer = None;
        Ok(())
    }
}

/// Converts remaining ticks to a `Timespec` through a millisecond
/// intermediate so frequencies that do not divide one second (1024 Hz)
/// do not truncate the sub-second part.
fn remaining_to_timespec(remaining: u64, tick_hz: u32) -> Timespec {
    Timespec::from_ticks(remaining, tick_hz)
}

fn read_spec(shared: &Arc<Mutex<TimerShared>>, tick_hz: u32) -> Itimerspec {
    let t = shared.lock();
    let value = match (&t.status, &t.timer) {
        (Status::Active, Some(timer)) => remaining_to_timespec(timer.remaining_ticks(), tick_hz),
        _ => Timespec::ZERO,
    };
    Itimerspec {
        interval: t.interval,
        value,
    }
}

/// Expiration path, invoked by the timer primitive from timer context.
///
/// Recomputes the reload from the stored interval and reprograms the
/// primitive before dispatching the notification; a zero reload stops
/// the primitive and marks the timer inactive on this expiration. The notification itself runs
/// after the object lock is dropped and must not block.
fn on_expire(shared: &Weak<Mutex<TimerShared>>, tick_hz: u32, signals: Option<&dyn SignalDispatch>) {
    // A deleted timer may still see one in-flight expiration; it finds
    // the object gone and does nothing.
    let Some(shared) = shared.upgrade() else {
        return;
    };

    let notify;
    {
        let mut t = shared.lock();
        let reload = t.interval.to_ticks(tick_hz);
        t.reload = reload;
        if reload == 0 {
            // No next expiration: stop the primitive too, so a
            // sub-tick periodic interval cannot keep firing from a
            // timer that reports itself disarmed.
            t.status = Status::Inactive;
            if let Some(timer) = t.timer.as_mut() {
                timer.stop();
            }
        } else if let Some(timer) = t.timer.as_mut() {
            timer.set_ticks(reload);
        }
        notify = t.notify;
    }

    match notify {
        Notify::Signal { pid, signo } => {
            if let Some(signals) = signals {
                if let Err(err) = signals.deliver(pid, signo) {
                    log::warn!("timer signal delivery to pid {pid} failed: {err}");
                }
            } else {
                log::warn!("timer armed for signal delivery but no signal path is wired");
            }
        }
        Notify::Callback { f, arg } => f(arg),
        Notify::None | Notify::Thread => {}
    }
}
