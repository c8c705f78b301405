use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::backend::DEFAULT_SYSFS_PATH;
use crate::error::AppError;
use crate::gpio::{AllowList, PinId};

const DEFAULT_PIN: u32 = 18;
const DEFAULT_DELAY: Duration = Duration::from_secs(2);
const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);
const DEFAULT_HTTP_TIMEOUT: u64 = 30;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
    pub unix_socket: Option<String>,
    pub host: Option<String>,
    #[serde(default)]
    pub path: String,
    #[serde(default = "default_http_timeout")]
    pub timeout: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum BackendConfig {
    Sysfs {
        #[serde(default = "default_sysfs_path")]
        path: String,
    },
    Chardev {
        chip: String,
    },
    Mock,
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Sysfs {
            path: default_sysfs_path(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub http: HttpConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub pins: AllowList,
    #[serde(default = "default_pin")]
    pub default_pin: u32,
    #[serde(default = "default_delay", with = "crate::duration")]
    pub default_delay: Duration,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_shutdown_grace", with = "crate::duration")]
    pub shutdown_grace: Duration,
}

impl AppConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let contents = fs::read_to_string(&path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self, AppError> {
        let config: Self = serde_json::from_str(contents)
            .map_err(|e| AppError::Config(format!("Invalid config json: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.pins.is_empty() {
            return Err(AppError::Config("'pins' must not be empty".into()));
        }
        if !self.pins.contains(self.default_pin) {
            return Err(AppError::Config(format!(
                "default pin {} is not one of {}",
                self.default_pin, self.pins
            )));
        }
        if self.password.as_deref() == Some("") {
            return Err(AppError::Config("'password' can't be empty".into()));
        }
        if self.http.unix_socket.is_none() && self.http.host.is_none() {
            return Err(AppError::Config(
                "either 'unix_socket' or 'host' must be specified".into(),
            ));
        }
        // zero durations are already refused by the duration parser
        Ok(())
    }

    pub fn default_pin(&self) -> Result<PinId, AppError> {
        self.pins.validate_id(self.default_pin)
    }
}

fn default_http_timeout() -> u64 {
    DEFAULT_HTTP_TIMEOUT
}

fn default_sysfs_path() -> String {
    DEFAULT_SYSFS_PATH.to_string()
}

fn default_pin() -> u32 {
    DEFAULT_PIN
}

fn default_delay() -> Duration {
    DEFAULT_DELAY
}

fn default_shutdown_grace() -> Duration {
    DEFAULT_SHUTDOWN_GRACE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_takes_defaults() {
        let config = AppConfig::from_json(r#"{ "http": { "host": "127.0.0.1:8080" } }"#).unwrap();

        assert_eq!(config.default_pin, 18);
        assert_eq!(config.default_delay, Duration::from_secs(2));
        assert_eq!(config.shutdown_grace, Duration::from_secs(5));
        assert_eq!(config.pins, AllowList::default());
        assert_eq!(
            config.backend,
            BackendConfig::Sysfs {
                path: "/sys/class/gpio".into()
            }
        );
        assert!(config.password.is_none());
    }

    #[test]
    fn full_config_round_trips_through_json() {
        let config = AppConfig::from_json(
            r#"{
                "http": { "host": "0.0.0.0:80", "path": "/door" },
                "backend": { "kind": "mock" },
                "pins": [21, 4, 21],
                "default_pin": 21,
                "default_delay": "3s",
                "password": "secret",
                "shutdown_grace": "500ms"
            }"#,
        )
        .unwrap();

        assert_eq!(config.pins.to_string(), "[4 21]");
        assert_eq!(config.backend, BackendConfig::Mock);
        assert_eq!(config.default_delay, Duration::from_secs(3));
        assert_eq!(config.shutdown_grace, Duration::from_millis(500));

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["default_delay"], "3s");
        assert_eq!(json["pins"], serde_json::json!([4, 21]));
    }

    #[test]
    fn rejects_inconsistent_config() {
        let cases = [
            r#"{ "http": { "host": "h:1" }, "pins": [] }"#,
            r#"{ "http": { "host": "h:1" }, "pins": [4], "default_pin": 18 }"#,
            r#"{ "http": { "host": "h:1" }, "password": "" }"#,
            r#"{ "http": { "host": "h:1" }, "default_delay": "0s" }"#,
            r#"{ "http": { "host": "h:1" }, "shutdown_grace": "-1s" }"#,
            r#"{ "http": {} }"#,
        ];
        for case in cases {
            assert!(
                matches!(AppConfig::from_json(case), Err(AppError::Config(_))),
                "{case} should be rejected"
            );
        }
    }
}
