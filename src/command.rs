use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::config::AppConfig;
use crate::duration;
use crate::error::AppError;
use crate::gpio::PinId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionKind {
    /// Drive high, hold for the delay, drive low.
    #[default]
    Timer,
    /// Invert the level the device currently reports.
    Toggle,
}

impl FromStr for ActionKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "timer" => Ok(ActionKind::Timer),
            "toggle" => Ok(ActionKind::Toggle),
            other => Err(AppError::InvalidAction(other.to_string())),
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ActionKind::Timer => "timer",
            ActionKind::Toggle => "toggle",
        })
    }
}

/// Raw trigger parameters as they arrive on the query string.
#[derive(Debug, Default, Deserialize)]
pub struct TriggerQuery {
    pub pin: Option<String>,
    pub delay: Option<String>,
    pub action: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub pass: Option<String>,
}

/// One validated unit of work for the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub action: ActionKind,
    pub pin: PinId,
    pub delay: Duration,
}

impl Command {
    /// Missing or empty parameters take their default; an explicit value is
    /// either valid or an error.
    pub fn from_query(
        query: &TriggerQuery,
        config: &AppConfig,
        default_action: ActionKind,
    ) -> Result<Self, AppError> {
        let action = match explicit(&query.action).or_else(|| explicit(&query.kind)) {
            Some(raw) => raw.parse()?,
            None => default_action,
        };
        let delay = match explicit(&query.delay) {
            Some(raw) => duration::parse(raw)?,
            None => config.default_delay,
        };
        let pin = match explicit(&query.pin) {
            Some(raw) => config.pins.validate(raw)?,
            None => config.default_pin()?,
        };

        Ok(Self { action, pin, delay })
    }
}

fn explicit(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig::from_json(
            r#"{ "http": { "host": "127.0.0.1:8080" }, "pins": [18, 21], "default_pin": 21 }"#,
        )
        .unwrap()
    }

    fn query(pairs: &[(&str, &str)]) -> TriggerQuery {
        let mut q = TriggerQuery::default();
        for (k, v) in pairs {
            let v = Some(v.to_string());
            match *k {
                "pin" => q.pin = v,
                "delay" => q.delay = v,
                "action" => q.action = v,
                "type" => q.kind = v,
                _ => q.pass = v,
            }
        }
        q
    }

    #[test]
    fn empty_query_uses_defaults() {
        let cfg = config();
        let cmd = Command::from_query(&query(&[]), &cfg, ActionKind::Timer).unwrap();

        assert_eq!(cmd.action, ActionKind::Timer);
        assert_eq!(cmd.pin.get(), 21);
        assert_eq!(cmd.delay, Duration::from_secs(2));

        let cmd = Command::from_query(&query(&[("pin", ""), ("delay", "")]), &cfg, ActionKind::Toggle)
            .unwrap();
        assert_eq!(cmd.action, ActionKind::Toggle);
        assert_eq!(cmd.pin.get(), 21);
    }

    #[test]
    fn explicit_values_override_defaults() {
        let cfg = config();
        let cmd = Command::from_query(
            &query(&[("pin", "18"), ("delay", "1.5s"), ("type", "toggle")]),
            &cfg,
            ActionKind::Timer,
        )
        .unwrap();

        assert_eq!(cmd.action, ActionKind::Toggle);
        assert_eq!(cmd.pin.get(), 18);
        assert_eq!(cmd.delay, Duration::from_millis(1500));
    }

    #[test]
    fn action_wins_over_type_alias() {
        let cmd = Command::from_query(
            &query(&[("action", "timer"), ("type", "toggle")]),
            &config(),
            ActionKind::Toggle,
        )
        .unwrap();
        assert_eq!(cmd.action, ActionKind::Timer);
    }

    #[test]
    fn invalid_explicit_values_are_not_defaulted() {
        let cfg = config();

        let err = Command::from_query(&query(&[("pin", "99")]), &cfg, ActionKind::Timer).unwrap_err();
        assert_eq!(err.to_string(), "Invalid GPIO pin 99, choose one of: [18 21]");

        for raw in ["abc", "+21", "021", " 21", "21 "] {
            let err =
                Command::from_query(&query(&[("pin", raw)]), &cfg, ActionKind::Timer).unwrap_err();
            assert!(matches!(err, AppError::InvalidPin { .. }), "{raw:?}");
        }

        let err =
            Command::from_query(&query(&[("delay", "soon")]), &cfg, ActionKind::Timer).unwrap_err();
        assert!(matches!(err, AppError::InvalidDelay(_)));

        let err =
            Command::from_query(&query(&[("delay", "-2s")]), &cfg, ActionKind::Timer).unwrap_err();
        assert!(matches!(err, AppError::InvalidDelay(_)));

        let err =
            Command::from_query(&query(&[("action", "bogus")]), &cfg, ActionKind::Timer).unwrap_err();
        assert!(matches!(err, AppError::InvalidAction(_)));
        assert!(err.is_validation());
    }
}
