#[cfg(feature = "chardev-gpio")]
pub mod libgpiod;
pub mod mock;
pub mod sysfs;

use std::sync::Arc;

use log::warn;

#[cfg(feature = "chardev-gpio")]
pub use libgpiod::LibgpiodBackend;
pub use mock::{MockCall, MockOp, MockPinBackend};
pub use sysfs::{DEFAULT_SYSFS_PATH, SysfsBackend};

use crate::config::BackendConfig;
use crate::error::AppError;
use crate::gpio::PinBackend;

pub fn from_config(config: &BackendConfig) -> Result<Arc<dyn PinBackend>, AppError> {
    match config {
        BackendConfig::Sysfs { path } => Ok(Arc::new(SysfsBackend::new(path))),
        #[cfg(feature = "chardev-gpio")]
        BackendConfig::Chardev { chip } => Ok(Arc::new(LibgpiodBackend::new(chip))),
        #[cfg(not(feature = "chardev-gpio"))]
        BackendConfig::Chardev { .. } => Err(AppError::Config(
            "the chardev backend requires the 'chardev-gpio' feature".into(),
        )),
        BackendConfig::Mock => {
            warn!("Using the mock GPIO backend, no hardware will be driven");
            Ok(Arc::new(MockPinBackend::default()))
        }
    }
}
