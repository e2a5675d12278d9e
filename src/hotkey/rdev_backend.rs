//! Input hook for Windows/Linux using rdev
//!
//! `rdev::grab` (suppressing) and `rdev::listen` (listen-only) block their
//! thread for the life of the process and offer no way to stop. Each
//! listener therefore reads its sink from a slot; uninstalling empties the
//! slot and the still-running listener passes every event through.
//!
//! A listener that dies after the start-up grace period can no longer fail
//! `install`; it marks the backend's [`HookHealth`] lost instead.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::Duration;

use rdev::{Button, Event, EventType};
use tracing::{debug, error, info};

use super::backend::{
    Disposition, HookBackend, HookError, HookHealth, HookMode, InputEvent, InputSink,
};
use super::keys::{Key, Modifier, Modifiers};
use super::matcher::{KeyAction, KeyInput};

/// rdev reports start-up failures immediately; silence means running
const STARTUP_GRACE: Duration = Duration::from_millis(300);

type SinkSlot = Arc<RwLock<Option<InputSink>>>;

/// rdev-backed hook
#[derive(Default)]
pub struct RdevBackend {
    listeners: HashMap<HookMode, SinkSlot>,
    health: HookHealth,
}

impl RdevBackend {
    fn spawn_listener(&mut self, mode: HookMode) -> Result<SinkSlot, HookError> {
        let slot: SinkSlot = Arc::new(RwLock::new(None));
        let thread_slot = Arc::clone(&slot);
        let (error_tx, error_rx) = mpsc::channel::<String>();
        let health = self.health.clone();

        thread::Builder::new()
            .name("hotkey-hook".to_string())
            .spawn(move || {
                info!(%mode, "hook thread started");
                let result = match mode {
                    HookMode::Suppress => {
                        let handler = EventHandler::new(thread_slot);
                        rdev::grab(move |event| match handler.handle(&event) {
                            Disposition::Suppress => None,
                            Disposition::Pass => Some(event),
                        })
                        .map_err(|e| format!("{:?}", e))
                    }
                    HookMode::ListenOnly => {
                        let handler = EventHandler::new(thread_slot);
                        rdev::listen(move |event| {
                            handler.handle(&event);
                        })
                        .map_err(|e| format!("{:?}", e))
                    }
                };
                let reason = match result {
                    Ok(()) => format!("{} listener returned", mode),
                    Err(e) => e,
                };
                error!(%reason, "hook listener exited");
                report_exit(&error_tx, &health, reason);
            })
            .map_err(|e| HookError::Unavailable(e.to_string()))?;

        match error_rx.recv_timeout(STARTUP_GRACE) {
            Ok(message) => Err(classify(&message)),
            Err(_) => Ok(slot),
        }
    }
}

impl HookBackend for RdevBackend {
    fn install(&mut self, mode: HookMode, sink: InputSink) -> Result<(), HookError> {
        let slot = match self.listeners.get(&mode) {
            Some(slot) => Arc::clone(slot),
            None => {
                let slot = self.spawn_listener(mode)?;
                self.listeners.insert(mode, Arc::clone(&slot));
                slot
            }
        };

        let mut guard = slot
            .write()
            .map_err(|_| HookError::Unavailable("hook state poisoned".to_string()))?;
        if guard.is_some() {
            return Err(HookError::AlreadyRegistered);
        }
        *guard = Some(sink);
        self.health.mark_restored();
        Ok(())
    }

    fn uninstall(&mut self) -> Result<(), HookError> {
        for slot in self.listeners.values() {
            if let Ok(mut guard) = slot.write() {
                guard.take();
            }
        }
        debug!("rdev hook detached");
        Ok(())
    }

    fn health(&self) -> HookHealth {
        self.health.clone()
    }
}

/// Hand an exit to `install` if it is still waiting, else mark the hook lost
fn report_exit(waiting: &mpsc::Sender<String>, health: &HookHealth, reason: String) {
    if let Err(mpsc::SendError(reason)) = waiting.send(reason) {
        health.mark_lost(reason);
    }
}

fn classify(message: &str) -> HookError {
    let lower = message.to_lowercase();
    if lower.contains("permission") || lower.contains("access") {
        HookError::PermissionDenied
    } else {
        HookError::Unavailable(message.to_string())
    }
}

/// Per-thread event translation; rdev carries no modifier flags
struct EventHandler {
    slot: SinkSlot,
    modifiers: RefCell<Modifiers>,
}

impl EventHandler {
    fn new(slot: SinkSlot) -> Self {
        Self {
            slot,
            modifiers: RefCell::new(Modifiers::NONE),
        }
    }

    fn handle(&self, event: &Event) -> Disposition {
        let input = match event.event_type {
            EventType::KeyPress(key) => self.key_input(key, KeyAction::Down),
            EventType::KeyRelease(key) => self.key_input(key, KeyAction::Up),
            EventType::ButtonPress(Button::Left) => InputEvent::PointerDown,
            _ => return Disposition::Pass,
        };

        let sink = self.slot.read().ok().and_then(|guard| guard.clone());
        match sink {
            Some(sink) => sink(input),
            None => Disposition::Pass,
        }
    }

    fn key_input(&self, key: rdev::Key, action: KeyAction) -> InputEvent {
        let key = translate_key(key);
        if let Key::Modifier(modifier) = key {
            self.modifiers
                .borrow_mut()
                .set(modifier, action == KeyAction::Down);
        }
        InputEvent::Key(KeyInput {
            key,
            action,
            modifiers: *self.modifiers.borrow(),
        })
    }
}

fn translate_key(key: rdev::Key) -> Key {
    use rdev::Key as K;

    let c = match key {
        K::KeyA => 'a',
        K::KeyB => 'b',
        K::KeyC => 'c',
        K::KeyD => 'd',
        K::KeyE => 'e',
        K::KeyF => 'f',
        K::KeyG => 'g',
        K::KeyH => 'h',
        K::KeyI => 'i',
        K::KeyJ => 'j',
        K::KeyK => 'k',
        K::KeyL => 'l',
        K::KeyM => 'm',
        K::KeyN => 'n',
        K::KeyO => 'o',
        K::KeyP => 'p',
        K::KeyQ => 'q',
        K::KeyR => 'r',
        K::KeyS => 's',
        K::KeyT => 't',
        K::KeyU => 'u',
        K::KeyV => 'v',
        K::KeyW => 'w',
        K::KeyX => 'x',
        K::KeyY => 'y',
        K::KeyZ => 'z',
        K::Num0 => '0',
        K::Num1 => '1',
        K::Num2 => '2',
        K::Num3 => '3',
        K::Num4 => '4',
        K::Num5 => '5',
        K::Num6 => '6',
        K::Num7 => '7',
        K::Num8 => '8',
        K::Num9 => '9',
        K::PrintScreen => return Key::PrintScreen,
        K::Escape => return Key::Escape,
        K::F1 => return Key::F(1),
        K::F2 => return Key::F(2),
        K::F3 => return Key::F(3),
        K::F4 => return Key::F(4),
        K::F5 => return Key::F(5),
        K::F6 => return Key::F(6),
        K::F7 => return Key::F(7),
        K::F8 => return Key::F(8),
        K::F9 => return Key::F(9),
        K::F10 => return Key::F(10),
        K::F11 => return Key::F(11),
        K::F12 => return Key::F(12),
        K::ShiftLeft | K::ShiftRight => return Key::Modifier(Modifier::Shift),
        K::ControlLeft | K::ControlRight => return Key::Modifier(Modifier::Control),
        K::Alt | K::AltGr => return Key::Modifier(Modifier::Alt),
        K::MetaLeft | K::MetaRight => return Key::Modifier(Modifier::Meta),
        K::Unknown(code) => return Key::Other(code),
        _ => return Key::Other(0),
    };
    Key::Char(c)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn key_event(event_type: EventType) -> Event {
        Event {
            time: std::time::SystemTime::now(),
            name: None,
            event_type,
        }
    }

    #[test]
    fn test_translate_key() {
        assert_eq!(translate_key(rdev::Key::KeyS), Key::Char('s'));
        assert_eq!(translate_key(rdev::Key::Num4), Key::Char('4'));
        assert_eq!(translate_key(rdev::Key::PrintScreen), Key::PrintScreen);
        assert_eq!(
            translate_key(rdev::Key::MetaLeft),
            Key::Modifier(Modifier::Meta)
        );
    }

    #[test]
    fn test_handler_tracks_modifiers() {
        let slot: SinkSlot = Arc::new(RwLock::new(None));
        let seen = Arc::new(RwLock::new(Vec::new()));
        let record = Arc::clone(&seen);
        *slot.write().unwrap() = Some(Arc::new(move |event| {
            record.write().unwrap().push(event);
            Disposition::Suppress
        }));
        let handler = EventHandler::new(Arc::clone(&slot));

        handler.handle(&key_event(EventType::KeyPress(rdev::Key::Alt)));
        let verdict = handler.handle(&key_event(EventType::KeyPress(rdev::Key::PrintScreen)));
        assert_eq!(verdict, Disposition::Suppress);

        let events = seen.read().unwrap();
        assert_eq!(
            events[1],
            InputEvent::Key(KeyInput::down(
                Key::PrintScreen,
                Modifiers::NONE.with(Modifier::Alt)
            ))
        );
    }

    #[test]
    fn test_empty_slot_passes_everything() {
        let slot: SinkSlot = Arc::new(RwLock::new(None));
        let handler = EventHandler::new(slot);
        let verdict = handler.handle(&key_event(EventType::KeyPress(rdev::Key::PrintScreen)));
        assert_eq!(verdict, Disposition::Pass);
    }

    #[test]
    fn test_uninstall_detaches_sink() {
        let calls = Arc::new(AtomicUsize::new(0));
        let slot: SinkSlot = Arc::new(RwLock::new(None));
        let counter = Arc::clone(&calls);
        *slot.write().unwrap() = Some(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Disposition::Suppress
        }));

        let mut backend = RdevBackend::default();
        backend.listeners.insert(HookMode::Suppress, Arc::clone(&slot));
        backend.uninstall().unwrap();
        backend.uninstall().unwrap();

        let handler = EventHandler::new(slot);
        let verdict = handler.handle(&key_event(EventType::ButtonPress(Button::Left)));
        assert_eq!(verdict, Disposition::Pass);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_exit_during_startup_fails_install() {
        let health = HookHealth::default();
        let (tx, rx) = mpsc::channel();
        report_exit(&tx, &health, "MissingDisplayError".to_string());
        assert_eq!(rx.recv().unwrap(), "MissingDisplayError");
        assert_eq!(health.lost_reason(), None);
    }

    #[test]
    fn test_exit_after_startup_marks_hook_lost() {
        let backend = RdevBackend::default();
        let health = backend.health();
        let (tx, rx) = mpsc::channel::<String>();
        drop(rx);

        report_exit(&tx, &backend.health, "grab thread died".to_string());
        assert_eq!(health.lost_reason().as_deref(), Some("grab thread died"));
    }

    #[test]
    fn test_classify_errors() {
        assert_eq!(classify("Permission denied"), HookError::PermissionDenied);
        assert!(matches!(
            classify("MissingDisplayError"),
            HookError::Unavailable(_)
        ));
    }
}
