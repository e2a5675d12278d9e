//! Input hook using macOS CGEventTap
//!
//! The tap lives on a dedicated thread with its own CFRunLoop. In
//! [`HookMode::Suppress`] the tap is an active filter: returning `None`
//! from the callback drops the event before any application sees it.
//!
//! The system disables a tap whose callback is too slow. The callback only
//! flags that; the run loop re-enables the tap on its next slice.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use core_foundation::runloop::{kCFRunLoopCommonModes, kCFRunLoopDefaultMode, CFRunLoop};
use core_graphics::event::{
    CGEvent, CGEventTap, CGEventTapLocation, CGEventTapOptions, CGEventTapPlacement,
    CGEventTapProxy, CGEventType, EventField,
};
use tracing::{debug, error, info};

use super::backend::{
    Disposition, HookBackend, HookError, HookHealth, HookMode, InputEvent, InputSink,
};
use super::keys::{Key, Modifiers};
use super::matcher::{KeyAction, KeyInput};

/// How long `install` waits for the tap thread to report
const READY_TIMEOUT: Duration = Duration::from_secs(2);

/// Run loop slice between checks of the running flag
const LOOP_SLICE: Duration = Duration::from_millis(100);

/// Re-enable attempts after which the tap is reported lost
const MAX_REENABLES: u64 = 50;

/// CGEventTap-backed hook
#[derive(Default)]
pub struct EventTapBackend {
    running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
    health: HookHealth,
}

/// Raised by the tap callback when the system disables the tap
#[derive(Debug, Default)]
struct TapDisabled {
    pending: AtomicBool,
    total: AtomicU64,
}

impl TapDisabled {
    fn mark(&self) {
        self.total.fetch_add(1, Ordering::SeqCst);
        self.pending.store(true, Ordering::SeqCst);
    }

    /// Consume a pending disable; returns how many have occurred so far
    fn take(&self) -> Option<u64> {
        self.pending
            .swap(false, Ordering::SeqCst)
            .then(|| self.total.load(Ordering::SeqCst))
    }
}

impl HookBackend for EventTapBackend {
    fn install(&mut self, mode: HookMode, sink: InputSink) -> Result<(), HookError> {
        if self.thread.is_some() {
            return Err(HookError::AlreadyRegistered);
        }

        let (ready_tx, ready_rx) = mpsc::channel();
        let running = Arc::clone(&self.running);
        running.store(true, Ordering::SeqCst);
        let health = self.health.clone();

        let handle = thread::Builder::new()
            .name("hotkey-hook".to_string())
            .spawn(move || {
                info!(%mode, "hook thread started");
                run_event_loop(mode, sink, &running, &health, ready_tx);
                running.store(false, Ordering::SeqCst);
                info!("hook thread stopped");
            })
            .map_err(|e| HookError::Unavailable(e.to_string()))?;
        self.thread = Some(handle);

        match ready_rx.recv_timeout(READY_TIMEOUT) {
            Ok(Ok(())) => {
                self.health.mark_restored();
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(HookError::Unavailable(
                "event tap thread did not start".to_string(),
            )),
        }
    }

    fn uninstall(&mut self) -> Result<(), HookError> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            handle
                .join()
                .map_err(|_| HookError::Unavailable("hook thread panicked".to_string()))?;
            debug!("event tap removed");
        }
        Ok(())
    }

    fn health(&self) -> HookHealth {
        self.health.clone()
    }
}

impl Drop for EventTapBackend {
    fn drop(&mut self) {
        let _ = self.uninstall();
    }
}

/// Translate one tap event into crate terms
fn translate(event_type: CGEventType, event: &CGEvent) -> Option<InputEvent> {
    let action = match event_type {
        CGEventType::KeyDown => KeyAction::Down,
        CGEventType::KeyUp => KeyAction::Up,
        CGEventType::LeftMouseDown => return Some(InputEvent::PointerDown),
        _ => return None,
    };
    let code = event.get_integer_value_field(EventField::KEYBOARD_EVENT_KEYCODE) as u16;
    Some(InputEvent::Key(KeyInput {
        key: Key::from_mac_keycode(code),
        action,
        modifiers: Modifiers::from_flags(event.get_flags()),
    }))
}

/// Create the tap and service its run loop until `running` clears
fn run_event_loop(
    mode: HookMode,
    sink: InputSink,
    running: &AtomicBool,
    health: &HookHealth,
    ready: mpsc::Sender<Result<(), HookError>>,
) {
    let options = match mode {
        HookMode::Suppress => CGEventTapOptions::Default,
        HookMode::ListenOnly => CGEventTapOptions::ListenOnly,
    };

    let disabled = Arc::new(TapDisabled::default());
    let tap_disabled = Arc::clone(&disabled);

    // Must be fast and non-blocking: it sits in the system input path
    let callback = move |_proxy: CGEventTapProxy,
                         event_type: CGEventType,
                         event: &CGEvent|
                         -> Option<CGEvent> {
        match event_type {
            CGEventType::TapDisabledByTimeout | CGEventType::TapDisabledByUserInput => {
                tap_disabled.mark();
                return Some(event.clone());
            }
            _ => {}
        }
        match translate(event_type, event).map(|input| sink(input)) {
            Some(Disposition::Suppress) => None,
            _ => Some(event.clone()),
        }
    };

    let tap = match CGEventTap::new(
        CGEventTapLocation::Session,
        CGEventTapPlacement::HeadInsertEventTap,
        options,
        vec![
            CGEventType::KeyDown,
            CGEventType::KeyUp,
            CGEventType::LeftMouseDown,
        ],
        callback,
    ) {
        Ok(tap) => tap,
        Err(()) => {
            error!("failed to create event tap - is Accessibility permission granted?");
            let _ = ready.send(Err(HookError::PermissionDenied));
            return;
        }
    };

    let run_loop_source = match tap.mach_port.create_runloop_source(0) {
        Ok(source) => source,
        Err(()) => {
            let _ = ready.send(Err(HookError::Unavailable(
                "failed to create run loop source".to_string(),
            )));
            return;
        }
    };

    let run_loop = CFRunLoop::get_current();
    unsafe {
        run_loop.add_source(&run_loop_source, kCFRunLoopCommonModes);
    }
    tap.enable();

    info!(%mode, "event tap created and enabled");
    let _ = ready.send(Ok(()));

    while running.load(Ordering::SeqCst) {
        unsafe {
            CFRunLoop::run_in_mode(kCFRunLoopDefaultMode, LOOP_SLICE, true);
        }

        if let Some(total) = disabled.take() {
            if total > MAX_REENABLES {
                health.mark_lost(format!("event tap disabled {} times", total));
                break;
            }
            error!(total, "event tap disabled by the system, re-enabling");
            tap.enable();
        }
    }

    // Tap and source are released when they go out of scope
}
