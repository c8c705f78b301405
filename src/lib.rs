pub mod backend;
mod command;
mod config;
pub mod duration;
mod error;
mod executor;
mod gpio;
mod routes;
pub mod shutdown;

pub use command::{ActionKind, Command, TriggerQuery};
pub use config::{AppConfig, BackendConfig, HttpConfig};
pub use error::AppError;
pub use executor::ActionExecutor;
pub use gpio::{AllowList, DEFAULT_PINS, Level, PinBackend, PinController, PinId};
pub use routes::{AppState, api_scope};
pub use shutdown::Shutdown;

#[cfg(feature = "chardev-gpio")]
pub use backend::LibgpiodBackend;
pub use backend::{MockPinBackend, SysfsBackend};
