use std::path::PathBuf;

use libgpiod::{chip::Chip, line, request};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::error::AppError;
use crate::gpio::{Level, PinBackend, PinId};

/// Character-device backend. Pin ids are line offsets on a single chip and a
/// line stays requested from `ensure` until `release`.
pub struct LibgpiodBackend {
    chip: PathBuf,
    requests: Mutex<FxHashMap<u32, request::Request>>, // keyed by line offset
}

impl LibgpiodBackend {
    pub fn new(chip: impl Into<PathBuf>) -> Self {
        Self {
            chip: chip.into(),
            requests: Mutex::new(FxHashMap::default()),
        }
    }

    fn open_chip(&self) -> Result<Chip, AppError> {
        if !self.chip.exists() {
            return Err(AppError::HardwareUnavailable(format!(
                "{} does not exist",
                self.chip.display()
            )));
        }
        Chip::open(&self.chip)
            .map_err(|e| AppError::HardwareUnavailable(format!("open chip {}: {e}", self.chip.display())))
    }

    fn output_line_config(offset: u32) -> Result<line::Config, AppError> {
        let mut ls =
            line::Settings::new().map_err(|e| AppError::Io(format!("libgpiod settings: {e}")))?;
        ls.set_direction(line::Direction::Output)
            .map_err(|e| AppError::Io(format!("set direction: {e}")))?;
        ls.set_drive(line::Drive::PushPull)
            .map_err(|e| AppError::Io(format!("set drive: {e}")))?;

        let mut cfg =
            line::Config::new().map_err(|e| AppError::Io(format!("line config: {e}")))?;
        cfg.add_line_settings(&[offset], ls)
            .map_err(|e| AppError::Io(format!("line config add settings: {e}")))?;
        Ok(cfg)
    }

    fn request_line(chip: &Chip, line_cfg: &line::Config) -> Result<request::Request, AppError> {
        let mut req_cfg =
            request::Config::new().map_err(|e| AppError::Io(format!("request config: {e}")))?;
        req_cfg
            .set_consumer(env!("CARGO_PKG_NAME"))
            .map_err(|e| AppError::Io(format!("request consumer: {e}")))?;
        chip.request_lines(Some(&req_cfg), line_cfg)
            .map_err(|e| AppError::Io(format!("request lines: {e}")))
    }
}

impl PinBackend for LibgpiodBackend {
    fn ensure(&self, pin: PinId) -> Result<bool, AppError> {
        let mut requests = self.requests.lock();
        if requests.contains_key(&pin.get()) {
            return Ok(false);
        }

        let chip = self.open_chip()?;
        let line_cfg = Self::output_line_config(pin.get())?;
        let request = Self::request_line(&chip, &line_cfg)?;
        requests.insert(pin.get(), request);
        Ok(true)
    }

    fn write(&self, pin: PinId, level: Level) -> Result<(), AppError> {
        let mut requests = self.requests.lock();
        let request = requests
            .get_mut(&pin.get())
            .ok_or_else(|| AppError::Io(format!("line {pin} is not requested")))?;

        let value = match level {
            Level::Low => line::Value::InActive,
            Level::High => line::Value::Active,
        };
        request
            .set_value(pin.get(), value)
            .map_err(|e| AppError::Io(format!("set value: {e}")))?;
        Ok(())
    }

    fn read(&self, pin: PinId) -> Result<Level, AppError> {
        let requests = self.requests.lock();
        let request = requests
            .get(&pin.get())
            .ok_or_else(|| AppError::Io(format!("line {pin} is not requested")))?;

        let value = request
            .value(pin.get())
            .map_err(|e| AppError::Io(format!("get value: {e}")))?;
        Ok(match value {
            line::Value::InActive => Level::Low,
            line::Value::Active => Level::High,
        })
    }

    fn release(&self, pin: PinId) -> Result<bool, AppError> {
        // dropping the request hands the line back to the kernel
        Ok(self.requests.lock().remove(&pin.get()).is_some())
    }
}
