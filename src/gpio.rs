use std::fmt;
use std::sync::Arc;

use log::{info, warn};
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const DEFAULT_PINS: [u32; 17] = [
    4, 5, 6, 12, 13, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 26, 27,
];

/// A GPIO number that has been checked against the [`AllowList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PinId(u32);

impl PinId {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sorted, de-duplicated set of GPIO numbers clients may address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<u32>", into = "Vec<u32>")]
pub struct AllowList(Vec<u32>);

impl AllowList {
    pub fn new(pins: impl IntoIterator<Item = u32>) -> Self {
        let mut pins: Vec<u32> = pins.into_iter().collect();
        pins.sort_unstable();
        pins.dedup();
        Self(pins)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, pin: u32) -> bool {
        self.0.binary_search(&pin).is_ok()
    }

    pub fn pins(&self) -> impl Iterator<Item = PinId> + '_ {
        self.0.iter().copied().map(PinId)
    }

    pub fn validate_id(&self, pin: u32) -> Result<PinId, AppError> {
        if self.contains(pin) {
            Ok(PinId(pin))
        } else {
            Err(AppError::InvalidPin {
                pin: pin.to_string(),
                allowed: self.clone(),
            })
        }
    }

    /// Only the canonical decimal spelling is accepted: no sign, padding or
    /// leading zeros.
    pub fn validate(&self, raw: &str) -> Result<PinId, AppError> {
        match raw.parse::<u32>() {
            Ok(pin) if pin.to_string() == raw => self.validate_id(pin),
            _ => Err(AppError::InvalidPin {
                pin: raw.to_string(),
                allowed: self.clone(),
            }),
        }
    }
}

impl Default for AllowList {
    fn default() -> Self {
        Self::new(DEFAULT_PINS)
    }
}

impl From<Vec<u32>> for AllowList {
    fn from(pins: Vec<u32>) -> Self {
        Self::new(pins)
    }
}

impl From<AllowList> for Vec<u32> {
    fn from(list: AllowList) -> Self {
        list.0
    }
}

impl fmt::Display for AllowList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, pin) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{pin}")?;
        }
        f.write_str("]")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    /// Text written to the value file.
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Low => "0",
            Level::High => "1",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text.trim() {
            "0" => Some(Level::Low),
            "1" => Some(Level::High),
            _ => None,
        }
    }

    pub fn inverted(self) -> Self {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Low => "low",
            Level::High => "high",
        })
    }
}

/// OS resource behind a [`PinController`].
///
/// Implementations hold no cached pin level: `read` always asks the device.
pub trait PinBackend: Send + Sync {
    /// Exports the pin as an output if needed. Returns `true` when an export
    /// actually happened.
    fn ensure(&self, pin: PinId) -> Result<bool, AppError>;
    fn write(&self, pin: PinId, level: Level) -> Result<(), AppError>;
    fn read(&self, pin: PinId) -> Result<Level, AppError>;
    /// Unexports the pin. Returns `false` when it was not exported.
    fn release(&self, pin: PinId) -> Result<bool, AppError>;
}

pub struct PinController {
    backend: Arc<dyn PinBackend>,
    ensured: Mutex<FxHashSet<PinId>>,
}

impl PinController {
    pub fn new(backend: Arc<dyn PinBackend>) -> Self {
        Self {
            backend,
            ensured: Mutex::new(FxHashSet::default()),
        }
    }

    pub fn ensure(&self, pin: PinId) -> Result<(), AppError> {
        // recorded before the attempt, a half-finished export still needs releasing
        self.ensured.lock().insert(pin);

        if self.backend.ensure(pin)? {
            info!("Output {pin} ready for work");
        }
        Ok(())
    }

    pub fn write(&self, pin: PinId, level: Level) -> Result<(), AppError> {
        self.backend.write(pin, level)
    }

    pub fn read(&self, pin: PinId) -> Result<Level, AppError> {
        self.backend.read(pin)
    }

    pub fn release(&self, pin: PinId) {
        self.ensured.lock().remove(&pin);

        match self.backend.release(pin) {
            Ok(true) => info!("Released pin {pin}"),
            Ok(false) => {}
            Err(e) => warn!("Can't release pin {pin}: {e}"),
        }
    }

    /// Drains the set of pins ensured so far, in ascending order.
    pub fn take_ensured(&self) -> Vec<PinId> {
        let mut pins: Vec<PinId> = self.ensured.lock().drain().collect();
        pins.sort_unstable();
        pins
    }
}
