//! The seam between the interceptor and the OS input hook

use std::sync::{Arc, Mutex};

use tracing::error;

use super::matcher::KeyInput;

/// Errors that can occur while installing the input hook
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HookError {
    #[error("not permitted to install a global input hook - check Accessibility/Input Monitoring permissions")]
    PermissionDenied,

    #[error("hotkeys are already registered")]
    AlreadyRegistered,

    #[error("input subsystem unavailable: {0}")]
    Unavailable(String),
}

/// How the hook treats the events it receives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HookMode {
    /// Matched events are consumed before they reach the OS
    Suppress,
    /// Events are observed but always delivered (degraded mode)
    ListenOnly,
}

impl std::fmt::Display for HookMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HookMode::Suppress => write!(f, "suppress"),
            HookMode::ListenOnly => write!(f, "listen-only"),
        }
    }
}

/// Raw input as seen by the hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Key(KeyInput),
    /// Primary pointer button pressed anywhere on screen
    PointerDown,
}

/// Verdict returned to the backend for one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Pass,
    Suppress,
}

/// Handler invoked on the hook thread for every event
///
/// Runs inside the OS input pipeline and must return quickly.
pub type InputSink = Arc<dyn Fn(InputEvent) -> Disposition + Send + Sync>;

/// Whether an installed hook is still working
///
/// Backends mark it lost when the OS tears their hook down after
/// `install` already succeeded; status reporting reads it.
#[derive(Debug, Clone, Default)]
pub struct HookHealth {
    lost: Arc<Mutex<Option<String>>>,
}

impl HookHealth {
    pub fn mark_lost(&self, reason: impl Into<String>) {
        let reason = reason.into();
        error!(%reason, "input hook lost, screenshots are no longer blocked");
        if let Ok(mut lost) = self.lost.lock() {
            *lost = Some(reason);
        }
    }

    /// Clear a previous loss after a successful install
    pub fn mark_restored(&self) {
        if let Ok(mut lost) = self.lost.lock() {
            lost.take();
        }
    }

    /// Why the hook stopped, if it has
    pub fn lost_reason(&self) -> Option<String> {
        self.lost.lock().ok().and_then(|lost| lost.clone())
    }
}

/// A platform mechanism that can observe and consume global input
pub trait HookBackend: Send {
    /// Install the hook. On error nothing may be left installed that
    /// `uninstall` cannot remove.
    fn install(&mut self, mode: HookMode, sink: InputSink) -> Result<(), HookError>;

    /// Remove the hook. Must be a no-op when nothing is installed.
    fn uninstall(&mut self) -> Result<(), HookError>;

    /// Health flag shared with the hook thread
    fn health(&self) -> HookHealth;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_tracks_loss_and_restore() {
        let health = HookHealth::default();
        let observer = health.clone();
        assert_eq!(observer.lost_reason(), None);

        health.mark_lost("grab thread exited");
        assert_eq!(observer.lost_reason().as_deref(), Some("grab thread exited"));

        health.mark_restored();
        assert_eq!(observer.lost_reason(), None);
    }
}
