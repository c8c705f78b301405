//! Runs validated [`Command`]s against the [`PinController`].
//!
//! Commands on the same pin are serialized: a per-pin lock is taken before
//! `ensure` and held through the final write, and waiters are served in
//! arrival order. Commands on different pins run in parallel.
//!
//! On shutdown, a timer that is still holding its pin high stops sleeping,
//! drives the pin low and reports [`AppError::ShutdownInProgress`].

use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use rustc_hash::FxHashMap;
use tokio::sync::Mutex;
use tokio::time::{Instant, timeout_at};

use crate::command::{ActionKind, Command};
use crate::duration;
use crate::error::AppError;
use crate::gpio::{AllowList, Level, PinController, PinId};
use crate::shutdown::Shutdown;

pub struct ActionExecutor {
    controller: Arc<PinController>,
    pins: AllowList,
    locks: FxHashMap<PinId, Mutex<()>>,
    shutdown: Shutdown,
    grace: Duration,
}

impl ActionExecutor {
    pub fn new(
        controller: Arc<PinController>,
        pins: &AllowList,
        shutdown: Shutdown,
        grace: Duration,
    ) -> Self {
        let locks = pins.pins().map(|pin| (pin, Mutex::new(()))).collect();

        Self {
            controller,
            pins: pins.clone(),
            locks,
            shutdown,
            grace,
        }
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    pub async fn execute(&self, command: Command) -> Result<String, AppError> {
        let pin = command.pin;
        let lock = self.locks.get(&pin).ok_or_else(|| AppError::InvalidPin {
            pin: pin.to_string(),
            allowed: self.pins.clone(),
        })?;

        self.reject_if_shutting_down()?;
        let _guard = lock.lock().await;
        // the queue may have been long enough for a shutdown to begin
        self.reject_if_shutting_down()?;

        let result = match command.action {
            ActionKind::Timer => self.run_timer(pin, command.delay).await,
            ActionKind::Toggle => self.run_toggle(pin),
        };

        match &result {
            Ok(outcome) => info!("{outcome}"),
            Err(e) => error!("{} on pin {pin} failed: {e}", command.action),
        }
        result
    }

    fn reject_if_shutting_down(&self) -> Result<(), AppError> {
        if self.shutdown.is_triggered() {
            return Err(AppError::ShutdownInProgress(
                "not accepting new commands".into(),
            ));
        }
        Ok(())
    }

    async fn run_timer(&self, pin: PinId, delay: Duration) -> Result<String, AppError> {
        self.controller.ensure(pin)?;
        self.controller.write(pin, Level::High)?;

        let interrupted = tokio::select! {
            _ = tokio::time::sleep(delay) => false,
            _ = self.shutdown.wait() => true,
        };

        self.controller
            .write(pin, Level::Low)
            .map_err(|e| match e {
                AppError::Io(msg) => AppError::Io(format!("pin {pin} may be stuck high, {msg}")),
                other => other,
            })?;

        if interrupted {
            return Err(AppError::ShutdownInProgress(format!(
                "pin {pin} forced low before the end of its {} timer",
                duration::format(delay)
            )));
        }
        Ok(format!("pin {pin} high for {}", duration::format(delay)))
    }

    fn run_toggle(&self, pin: PinId) -> Result<String, AppError> {
        self.controller.ensure(pin)?;

        let current = match self.controller.read(pin) {
            Ok(level) => level,
            Err(e) => {
                warn!("Can't read pin {pin}, treating it as low: {e}");
                Level::Low
            }
        };
        let next = current.inverted();
        self.controller.write(pin, next)?;

        Ok(format!("pin {pin} now {next}"))
    }

    /// Triggers shutdown, waits up to the grace period for in-flight commands,
    /// then releases every pin ensured so far. Returns how many were released.
    pub async fn release_all(&self) -> usize {
        if self.shutdown.trigger() {
            info!("Shutdown started");
        }

        let deadline = Instant::now() + self.grace;
        let mut guards = Vec::with_capacity(self.locks.len());
        for (pin, lock) in &self.locks {
            match timeout_at(deadline, lock.lock()).await {
                Ok(guard) => guards.push(guard),
                Err(_) => warn!("Pin {pin} still busy after the shutdown grace period"),
            }
        }

        let pins = self.controller.take_ensured();
        for pin in &pins {
            self.controller.release(*pin);
        }
        pins.len()
    }
}
