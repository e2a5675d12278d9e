//! Shutdown signalling: process signals, an explicit stop handle, and a
//! console stop command

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

/// Resolves on SIGTERM, SIGINT (Ctrl+C), or an explicit stop
pub struct ShutdownSignal {
    stop: Arc<Notify>,
}

/// Requests shutdown from anywhere in the process
#[derive(Debug, Clone)]
pub struct StopHandle {
    stop: Arc<Notify>,
}

impl StopHandle {
    pub fn stop(&self) {
        // notify_one keeps a permit if nobody is waiting yet
        self.stop.notify_one();
    }
}

impl ShutdownSignal {
    /// Create a new shutdown signal handler
    pub fn new() -> Self {
        Self {
            stop: Arc::new(Notify::new()),
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            stop: Arc::clone(&self.stop),
        }
    }

    /// Wait for a shutdown signal
    pub async fn wait(&self) {
        tokio::select! {
            _ = interrupted() => {}
            _ = self.stop.notified() => {
                debug!("explicit stop requested");
            }
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
async fn interrupted() {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(term), Ok(int)) => (term, int),
        (Err(e), _) | (_, Err(e)) => {
            warn!(?e, "failed to register signal handlers, only explicit stop will work");
            return std::future::pending().await;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => {
            debug!("received SIGTERM");
        }
        _ = sigint.recv() => {
            debug!("received SIGINT");
        }
    }
}

#[cfg(not(unix))]
async fn interrupted() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => debug!("received Ctrl+C"),
        Err(e) => {
            warn!(?e, "failed to listen for Ctrl+C, only explicit stop will work");
            std::future::pending::<()>().await
        }
    }
}

/// Whether a console line asks the blocker to stop
fn is_stop_command(line: &str) -> bool {
    matches!(
        line.trim().to_ascii_lowercase().as_str(),
        "q" | "quit" | "stop" | "exit"
    )
}

/// Stop when `stop`/`quit` is typed on the console
///
/// Returns without stopping when stdin closes, so a detached process keeps
/// running.
pub async fn watch_stdin(stop: StopHandle) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if is_stop_command(&line) => {
                info!("stop requested from console");
                stop.stop();
                return;
            }
            Ok(Some(_)) => {}
            Ok(None) => {
                debug!("stdin closed, console stop disabled");
                return;
            }
            Err(e) => {
                warn!(?e, "failed to read stdin, console stop disabled");
                return;
            }
        }
    }
}
