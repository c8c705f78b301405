use std::time::Instant;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::error::AppError;
use crate::gpio::{Level, PinBackend, PinId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockOp {
    Ensure,
    Write(Level),
    Read,
    Release,
}

#[derive(Debug, Clone, Copy)]
pub struct MockCall {
    pub pin: u32,
    pub op: MockOp,
    pub at: Instant,
}

/// In-memory backend for off-target runs and tests. Every call is recorded,
/// failed ones included.
#[derive(Default)]
pub struct MockPinBackend {
    state: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    pins: FxHashMap<u32, Level>, // exported pins only
    calls: Vec<MockCall>,
    unavailable: bool,
    fail_reads: bool,
    fail_writes: Option<Level>,
}

impl MockPinBackend {
    /// Behaves like a host without the export capability.
    pub fn unavailable() -> Self {
        let backend = Self::default();
        backend.state.lock().unavailable = true;
        backend
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.state.lock().fail_reads = fail;
    }

    /// Makes every write of `level` fail; `None` clears it.
    pub fn set_fail_writes(&self, level: Option<Level>) {
        self.state.lock().fail_writes = level;
    }

    /// Level of an exported pin as the device would report it.
    pub fn level(&self, pin: u32) -> Option<Level> {
        self.state.lock().pins.get(&pin).copied()
    }

    pub fn is_exported(&self, pin: u32) -> bool {
        self.state.lock().pins.contains_key(&pin)
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().calls.clone()
    }

    pub fn calls_for(&self, pin: u32) -> Vec<MockCall> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.pin == pin)
            .copied()
            .collect()
    }
}

impl MockState {
    fn record(&mut self, pin: PinId, op: MockOp) {
        self.calls.push(MockCall {
            pin: pin.get(),
            op,
            at: Instant::now(),
        });
    }
}

impl PinBackend for MockPinBackend {
    fn ensure(&self, pin: PinId) -> Result<bool, AppError> {
        let mut state = self.state.lock();
        state.record(pin, MockOp::Ensure);

        if state.unavailable {
            return Err(AppError::HardwareUnavailable("mock export missing".into()));
        }
        if state.pins.contains_key(&pin.get()) {
            return Ok(false);
        }
        state.pins.insert(pin.get(), Level::Low);
        Ok(true)
    }

    fn write(&self, pin: PinId, level: Level) -> Result<(), AppError> {
        let mut state = self.state.lock();
        state.record(pin, MockOp::Write(level));

        if state.fail_writes == Some(level) {
            return Err(AppError::Io(format!("mock write {level} to pin {pin} failed")));
        }
        let value = state
            .pins
            .get_mut(&pin.get())
            .ok_or_else(|| AppError::Io(format!("pin {pin} is not exported")))?;
        *value = level;
        Ok(())
    }

    fn read(&self, pin: PinId) -> Result<Level, AppError> {
        let mut state = self.state.lock();
        state.record(pin, MockOp::Read);

        if state.fail_reads {
            return Err(AppError::Io(format!("mock read of pin {pin} failed")));
        }
        state
            .pins
            .get(&pin.get())
            .copied()
            .ok_or_else(|| AppError::Io(format!("pin {pin} is not exported")))
    }

    fn release(&self, pin: PinId) -> Result<bool, AppError> {
        let mut state = self.state.lock();
        state.record(pin, MockOp::Release);

        Ok(state.pins.remove(&pin.get()).is_some())
    }
}
