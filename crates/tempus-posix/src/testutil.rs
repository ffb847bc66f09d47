//! Mock collaborators shared by the unit tests: an atomic tick
//! counter, an in-memory RTC, a manually-fired timer service and a
//! scripted blocking primitive.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use tempus_core::units::Timeval;

use crate::error::Result;
use crate::hal::{
    Blocker, CycleCounter, DelayOutcome, ExpiryFn, RtcDevice, SignalDispatch, SoftTimer,
    TickSource, TimerMode, TimerService,
};

pub struct MockTicks(AtomicU64);

impl MockTicks {
    pub fn new(start: u64) -> Self {
        MockTicks(AtomicU64::new(start))
    }

    pub fn now(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn advance(&self, ticks: u64) {
        self.0.fetch_add(ticks, Ordering::SeqCst);
    }
}

impl TickSource for MockTicks {
    fn now(&self) -> u64 {
        MockTicks::now(self)
    }
}

pub struct MockRtc {
    stored: Mutex<Timeval>,
}

impl MockRtc {
    pub fn new(sec: i64) -> Self {
        MockRtc {
            stored: Mutex::new(Timeval::new(sec, 0)),
        }
    }

    pub fn stored_seconds(&self) -> i64 {
        self.stored.lock().sec
    }
}

impl RtcDevice for MockRtc {
    fn read_seconds(&self) -> Result<i64> {
        Ok(self.stored.lock().sec)
    }

    fn read(&self) -> Result<Timeval> {
        Ok(*self.stored.lock())
    }

    fn write_seconds(&self, sec: i64) -> Result<()> {
        *self.stored.lock() = Timeval::new(sec, 0);
        Ok(())
    }

    fn write(&self, tv: Timeval) -> Result<()> {
        *self.stored.lock() = tv;
        Ok(())
    }
}

struct ManualTimerState {
    expiry: Mutex<ExpiryFn>,
    mode: Mutex<TimerMode>,
    ticks: AtomicU64,
    running: AtomicBool,
}

struct ManualSoftTimer {
    state: Arc<ManualTimerState>,
}

impl SoftTimer for ManualSoftTimer {
    fn set_mode(&mut self, mode: TimerMode) {
        *self.state.mode.lock() = mode;
    }

    fn set_ticks(&mut self, ticks: u64) {
        self.state.ticks.store(ticks, Ordering::SeqCst);
    }

    fn start(&mut self) {
        self.state.running.store(true, Ordering::SeqCst);
    }

    fn stop(&mut self) {
        self.state.running.store(false, Ordering::SeqCst);
    }

    fn remaining_ticks(&self) -> u64 {
        self.state.ticks.load(Ordering::SeqCst)
    }
}

/// Timer service whose timers fire only when the test says so.
pub struct ManualTimerService {
    timers: Mutex<Vec<Arc<ManualTimerState>>>,
}

impl ManualTimerService {
    pub fn new() -> Self {
        ManualTimerService {
            timers: Mutex::new(Vec::new()),
        }
    }

    pub fn ticks_of(&self, index: usize) -> u64 {
        self.timers.lock()[index].ticks.load(Ordering::SeqCst)
    }

    pub fn is_running(&self, index: usize) -> bool {
        self.timers.lock()[index].running.load(Ordering::SeqCst)
    }

    /// Simulates an expiration of timer `index`, including one that
    /// arrives after the owner stopped caring (an in-flight fire).
    pub fn fire(&self, index: usize) {
        let state = self.timers.lock()[index].clone();
        if *state.mode.lock() == TimerMode::OneShot {
            state.running.store(false, Ordering::SeqCst);
        }
        (state.expiry.lock())();
    }
}

impl TimerService for ManualTimerService {
    fn create_timer(&self, _name: &str, expiry: ExpiryFn) -> Box<dyn SoftTimer> {
        let state = Arc::new(ManualTimerState {
            expiry: Mutex::new(expiry),
            mode: Mutex::new(TimerMode::OneShot),
            ticks: AtomicU64::new(0),
            running: AtomicBool::new(false),
        });
        self.timers.lock().push(state.clone());
        Box::new(ManualSoftTimer { state })
    }
}

/// Blocking primitive that advances the mock tick counter instead of
/// suspending, optionally waking early once.
pub struct MockBlocker {
    ticks: Arc<MockTicks>,
    interrupt_after: Mutex<Option<u64>>,
    last_request: Mutex<Option<u64>>,
}

impl MockBlocker {
    pub fn new(ticks: Arc<MockTicks>) -> Self {
        MockBlocker {
            ticks,
            interrupt_after: Mutex::new(None),
            last_request: Mutex::new(None),
        }
    }

    /// Makes the next delay wake early after `elapsed` ticks.
    pub fn interrupt_after(&self, elapsed: u64) {
        *self.interrupt_after.lock() = Some(elapsed);
    }

    pub fn last_request(&self) -> Option<u64> {
        *self.last_request.lock()
    }
}

impl Blocker for MockBlocker {
    fn delay_ticks(&self, ticks: u64) -> DelayOutcome {
        *self.last_request.lock() = Some(ticks);
        match self.interrupt_after.lock().take() {
            Some(elapsed) if elapsed < ticks => {
                self.ticks.advance(elapsed);
                DelayOutcome::Interrupted
            }
            _ => {
                self.ticks.advance(ticks);
                DelayOutcome::Completed
            }
        }
    }
}

pub struct MockSignals {
    delivered: Mutex<Vec<(i32, i32)>>,
}

impl MockSignals {
    pub fn new() -> Self {
        MockSignals {
            delivered: Mutex::new(Vec::new()),
        }
    }

    pub fn delivered(&self) -> Vec<(i32, i32)> {
        self.delivered.lock().clone()
    }
}

impl SignalDispatch for MockSignals {
    fn deliver(&self, pid: i32, signo: i32) -> Result<()> {
        self.delivered.lock().push((pid, signo));
        Ok(())
    }
}

pub struct MockCycles {
    count: AtomicU64,
    resolution_ns: f64,
}

impl MockCycles {
    pub fn new(count: u64, resolution_ns: f64) -> Self {
        MockCycles {
            count: AtomicU64::new(count),
            resolution_ns,
        }
    }
}

impl CycleCounter for MockCycles {
    fn now(&self) -> u64 {
        self.count.load(Ordering::SeqCst)
    }

    fn resolution_ns(&self) -> f64 {
        self.resolution_ns
    }
}
