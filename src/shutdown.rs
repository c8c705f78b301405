use std::io;
use std::sync::Arc;

use log::{error, info};
use tokio::signal::unix::{Signal, SignalKind, signal};
use tokio::sync::watch;

use crate::executor::ActionExecutor;

/// Process-wide cancellation signal. Triggered once; every clone observes it.
#[derive(Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Returns `true` only for the call that actually started the shutdown.
    pub fn trigger(&self) -> bool {
        self.tx.send_if_modified(|started| !std::mem::replace(started, true))
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`trigger`](Self::trigger) has been called.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // the sender lives in `self`, so the channel can't close under us
        let _ = rx.wait_for(|started| *started).await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// SIGINT and SIGTERM handlers. Construction fails if either can't be
/// installed, so build it before serving.
pub struct SignalListener {
    interrupt: Signal,
    terminate: Signal,
}

impl SignalListener {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Waits for the next SIGINT or SIGTERM and returns its name.
    pub async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        }
    }
}

/// Drives `server` to completion, then releases every ensured pin whether the
/// server stopped cleanly or not. The server's own result is returned.
pub async fn serve_then_release<F>(server: F, executor: &ActionExecutor) -> io::Result<()>
where
    F: Future<Output = io::Result<()>>,
{
    let result = server.await;
    if let Err(e) = &result {
        error!("Server stopped with an error: {e}");
    }

    let released = executor.release_all().await;
    info!("Released {released} pin(s)");
    result
}
