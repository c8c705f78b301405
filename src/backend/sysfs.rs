use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rustc_hash::FxHashSet;

use crate::error::AppError;
use crate::gpio::{Level, PinBackend, PinId};

pub const DEFAULT_SYSFS_PATH: &str = "/sys/class/gpio";

/// Legacy `/sys/class/gpio` interface.
pub struct SysfsBackend {
    base: PathBuf,
    outputs: Mutex<FxHashSet<PinId>>, // direction confirmed as "out"
}

impl SysfsBackend {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            outputs: Mutex::new(FxHashSet::default()),
        }
    }

    fn export_path(&self) -> PathBuf {
        self.base.join("export")
    }

    fn unexport_path(&self) -> PathBuf {
        self.base.join("unexport")
    }

    fn pin_dir(&self, pin: PinId) -> PathBuf {
        self.base.join(format!("gpio{pin}"))
    }

    fn direction_path(&self, pin: PinId) -> PathBuf {
        self.pin_dir(pin).join("direction")
    }

    fn value_path(&self, pin: PinId) -> PathBuf {
        self.pin_dir(pin).join("value")
    }

    fn write_file(path: &Path, contents: &str) -> Result<(), AppError> {
        fs::write(path, contents)
            .map_err(|e| AppError::Io(format!("write {:?} to {}: {e}", contents, path.display())))
    }

    fn export(&self, pin: PinId) -> Result<(), AppError> {
        let export = self.export_path();
        if !export.exists() {
            return Err(AppError::HardwareUnavailable(format!(
                "{} does not exist",
                export.display()
            )));
        }
        Self::write_file(&export, &pin.to_string())
    }

    fn set_output(&self, pin: PinId) -> Result<(), AppError> {
        let path = self.direction_path(pin);
        let current = fs::read_to_string(&path).unwrap_or_default();
        if current.trim() != "out" {
            Self::write_file(&path, "out")?;
        }
        Ok(())
    }
}

impl Default for SysfsBackend {
    fn default() -> Self {
        Self::new(DEFAULT_SYSFS_PATH)
    }
}

impl PinBackend for SysfsBackend {
    fn ensure(&self, pin: PinId) -> Result<bool, AppError> {
        let mut outputs = self.outputs.lock();

        let exported = if self.pin_dir(pin).exists() {
            false
        } else {
            // unexported behind our back, the direction has to be set again
            outputs.remove(&pin);
            self.export(pin)?;
            true
        };

        // a pin exported by an earlier attempt may still be an input
        if !outputs.contains(&pin) {
            self.set_output(pin)?;
            outputs.insert(pin);
        }
        Ok(exported)
    }

    fn write(&self, pin: PinId, level: Level) -> Result<(), AppError> {
        Self::write_file(&self.value_path(pin), level.as_str())
    }

    fn read(&self, pin: PinId) -> Result<Level, AppError> {
        let path = self.value_path(pin);
        let contents = fs::read_to_string(&path)
            .map_err(|e| AppError::Io(format!("read {}: {e}", path.display())))?;

        Level::parse(&contents).ok_or_else(|| {
            AppError::Io(format!(
                "unexpected value {:?} in {}",
                contents.trim(),
                path.display()
            ))
        })
    }

    fn release(&self, pin: PinId) -> Result<bool, AppError> {
        self.outputs.lock().remove(&pin);
        if !self.pin_dir(pin).exists() {
            return Ok(false);
        }

        match fs::write(self.unexport_path(), pin.to_string()) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AppError::Io(format!("unexport pin {pin}: {e}"))),
        }
    }
}
