//! Global hotkey interceptor
//!
//! Owns a [`HookBackend`] and decides, for every raw input event, whether
//! it reaches the OS. Matches are reported through a single callback that
//! must only enqueue work; it runs on the hook thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use tracing::{debug, error, info, warn};

use crate::events::BlockEvent;

use super::backend::{
    Disposition, HookBackend, HookError, HookHealth, HookMode, InputEvent, InputSink,
};
use super::keys::Key;
use super::matcher::{KeyAction, Matcher};
use super::pattern::HotkeyPattern;

type MatchCallback = Arc<dyn Fn(BlockEvent) + Send + Sync>;
type AcknowledgeCallback = Arc<dyn Fn() + Send + Sync>;

/// Identifies one successful registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookHandle {
    id: u64,
    mode: HookMode,
}

impl HookHandle {
    pub fn mode(&self) -> HookMode {
        self.mode
    }
}

/// Exclusive keyboard capture shared between the overlay and the hook
///
/// While held, every key press that is not a registered pattern is
/// swallowed, and the dismiss key or a pointer press is reported as an
/// acknowledgement.
#[derive(Debug, Clone, Default)]
pub struct InputGrab {
    held: Arc<AtomicBool>,
}

impl InputGrab {
    pub fn acquire(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.held.store(false, Ordering::SeqCst);
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }
}

/// State reachable from the hook thread
struct Shared {
    matcher: Mutex<Matcher>,
    on_match: RwLock<Option<MatchCallback>>,
    on_acknowledge: RwLock<Option<AcknowledgeCallback>>,
    grab: InputGrab,
    dismiss_key: Key,
}

impl Shared {
    fn handle(&self, event: InputEvent) -> Disposition {
        let input = match event {
            InputEvent::PointerDown if self.grab.is_held() => {
                self.acknowledge();
                return Disposition::Suppress;
            }
            InputEvent::PointerDown => return Disposition::Pass,
            InputEvent::Key(input) => input,
        };

        let outcome = match self.matcher.lock() {
            Ok(mut matcher) => matcher.process(input),
            Err(poisoned) => poisoned.into_inner().process(input),
        };

        if let Some(pattern) = outcome.matched {
            debug!(%pattern, suppress = outcome.suppress, "hotkey matched");
            self.emit(BlockEvent::now(pattern));
        }
        if outcome.suppress {
            return Disposition::Suppress;
        }

        // Releases and bare modifiers pass so no key is left stuck down
        // once the grab ends.
        if self.grab.is_held()
            && input.action == KeyAction::Down
            && !matches!(input.key, Key::Modifier(_))
        {
            if input.key == self.dismiss_key {
                self.acknowledge();
            }
            return Disposition::Suppress;
        }

        Disposition::Pass
    }

    fn emit(&self, event: BlockEvent) {
        let callback = self.on_match.read().ok().and_then(|guard| guard.clone());
        match callback {
            Some(callback) => callback(event),
            None => warn!(pattern = %event.pattern, "hotkey matched with no consumer registered"),
        }
    }

    fn acknowledge(&self) {
        let callback = self
            .on_acknowledge
            .read()
            .ok()
            .and_then(|guard| guard.clone());
        if let Some(callback) = callback {
            callback();
        }
    }
}

/// Registers hotkey patterns with the OS and reports matches
pub struct Interceptor<B: HookBackend> {
    backend: B,
    shared: Arc<Shared>,
    active: Option<HookHandle>,
    next_id: u64,
}

impl<B: HookBackend> Interceptor<B> {
    /// Create an interceptor; nothing is installed until [`register`](Self::register)
    pub fn new(backend: B, dismiss_key: Key) -> Self {
        Self {
            backend,
            shared: Arc::new(Shared {
                matcher: Mutex::new(Matcher::new([])),
                on_match: RwLock::new(None),
                on_acknowledge: RwLock::new(None),
                grab: InputGrab::default(),
                dismiss_key,
            }),
            active: None,
            next_id: 1,
        }
    }

    /// Set the single match consumer, replacing any previous one
    pub fn on_match<F>(&self, callback: F)
    where
        F: Fn(BlockEvent) + Send + Sync + 'static,
    {
        if let Ok(mut slot) = self.shared.on_match.write() {
            if slot.replace(Arc::new(callback)).is_some() {
                debug!("match callback replaced");
            }
        }
    }

    /// Set the consumer for dismiss gestures seen while the grab is held
    pub fn on_acknowledge<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        if let Ok(mut slot) = self.shared.on_acknowledge.write() {
            *slot = Some(Arc::new(callback));
        }
    }

    /// The grab flag this interceptor honours
    pub fn input_grab(&self) -> InputGrab {
        self.shared.grab.clone()
    }

    /// Install a suppressing hook for all patterns at once
    pub fn register(
        &mut self,
        patterns: impl IntoIterator<Item = HotkeyPattern>,
    ) -> Result<HookHandle, HookError> {
        self.register_with_mode(patterns, HookMode::Suppress)
    }

    /// Install the hook in the given mode
    ///
    /// Fails with [`HookError::AlreadyRegistered`] while a previous
    /// registration is active; that registration is left untouched.
    pub fn register_with_mode(
        &mut self,
        patterns: impl IntoIterator<Item = HotkeyPattern>,
        mode: HookMode,
    ) -> Result<HookHandle, HookError> {
        if self.active.is_some() {
            return Err(HookError::AlreadyRegistered);
        }

        let matcher = Matcher::new(patterns);
        let count = matcher.patterns().len();
        if count == 0 {
            warn!("registering with no hotkey patterns");
        }
        match self.shared.matcher.lock() {
            Ok(mut slot) => *slot = matcher,
            Err(poisoned) => *poisoned.into_inner() = matcher,
        }

        let shared = Arc::clone(&self.shared);
        let sink: InputSink = Arc::new(move |event| shared.handle(event));

        if let Err(e) = self.backend.install(mode, sink) {
            error!(?e, %mode, "failed to install input hook");
            // Leave no partial hook behind
            if let Err(cleanup) = self.backend.uninstall() {
                warn!(?cleanup, "cleanup after failed install also failed");
            }
            return Err(e);
        }

        let handle = HookHandle {
            id: self.next_id,
            mode,
        };
        self.next_id += 1;
        self.active = Some(handle);

        info!(patterns = count, %mode, "hotkeys registered");
        Ok(handle)
    }

    /// Remove the hook for `handle`; a stale or repeated handle is a no-op
    pub fn unregister(&mut self, handle: HookHandle) {
        if self.active != Some(handle) {
            debug!(?handle, "unregister ignored, handle not active");
            return;
        }
        self.active = None;
        self.teardown();
        info!("hotkeys unregistered");
    }

    /// Remove whatever the backend may hold, registered or not
    pub fn shutdown(&mut self) {
        self.active = None;
        self.teardown();
    }

    /// Liveness of the installed hook, for status reporting
    pub fn health(&self) -> HookHealth {
        self.backend.health()
    }

    pub fn handle(&self) -> Option<HookHandle> {
        self.active
    }

    fn teardown(&mut self) {
        self.shared.grab.release();
        if let Err(e) = self.backend.uninstall() {
            warn!(?e, "failed to remove input hook");
        }
        if let Ok(mut matcher) = self.shared.matcher.lock() {
            matcher.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use super::*;
    use crate::hotkey::backend::testing::FakeBackend;
    use crate::hotkey::keys::{Modifier, Modifiers};
    use crate::hotkey::matcher::KeyInput;

    fn patterns() -> Vec<HotkeyPattern> {
        ["win+shift+s", "print screen", "alt+print screen"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect()
    }

    fn recording(interceptor: &Interceptor<FakeBackend>) -> Arc<StdMutex<Vec<BlockEvent>>> {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        interceptor.on_match(move |event| sink.lock().unwrap().push(event));
        seen
    }

    fn press(backend: &FakeBackend, key: Key, modifiers: Modifiers) -> Option<Disposition> {
        let down = backend.inject(InputEvent::Key(KeyInput::down(key, modifiers)));
        backend.inject(InputEvent::Key(KeyInput::up(key, modifiers)));
        down
    }

    #[test]
    fn test_register_suppresses_and_reports() {
        let backend = FakeBackend::default();
        let mut interceptor = Interceptor::new(backend.clone(), Key::Escape);
        let seen = recording(&interceptor);

        let handle = interceptor.register(patterns()).unwrap();
        assert_eq!(handle.mode(), HookMode::Suppress);

        let verdict = press(&backend, Key::PrintScreen, Modifiers::NONE);
        assert_eq!(verdict, Some(Disposition::Suppress));
        assert_eq!(seen.lock().unwrap().len(), 1);

        let other = press(&backend, Key::Char('a'), Modifiers::NONE);
        assert_eq!(other, Some(Disposition::Pass));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_second_register_fails_and_first_stays_active() {
        let backend = FakeBackend::default();
        let mut interceptor = Interceptor::new(backend.clone(), Key::Escape);
        let seen = recording(&interceptor);

        let first = interceptor.register(patterns()).unwrap();
        let second = interceptor.register(patterns());
        assert_eq!(second, Err(HookError::AlreadyRegistered));
        assert_eq!(interceptor.handle(), Some(first));
        assert_eq!(backend.installs(), 1);

        let shift_win = Modifiers::NONE.with(Modifier::Shift).with(Modifier::Meta);
        let verdict = press(&backend, Key::Char('s'), shift_win);
        assert_eq!(verdict, Some(Disposition::Suppress));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let backend = FakeBackend::default();
        let mut interceptor = Interceptor::new(backend.clone(), Key::Escape);
        let handle = interceptor.register(patterns()).unwrap();

        interceptor.unregister(handle);
        interceptor.unregister(handle);
        assert_eq!(backend.uninstalls(), 1);
        assert_eq!(interceptor.handle(), None);
        assert_eq!(press(&backend, Key::PrintScreen, Modifiers::NONE), None);

        // registering again after unregister is allowed
        assert!(interceptor.register(patterns()).is_ok());
    }

    #[test]
    fn test_failed_install_cleans_up_and_unregister_is_safe() {
        let backend = FakeBackend::default();
        backend.fail_next_install(HookError::PermissionDenied);
        let mut interceptor = Interceptor::new(backend.clone(), Key::Escape);

        let result = interceptor.register(patterns());
        assert_eq!(result, Err(HookError::PermissionDenied));
        assert_eq!(backend.uninstalls(), 1);
        assert_eq!(interceptor.handle(), None);

        backend.fail_uninstall(HookError::Unavailable("gone".into()));
        interceptor.shutdown();
        interceptor.shutdown();
        assert_eq!(backend.uninstalls(), 3);
    }

    #[test]
    fn test_listen_only_observes_without_suppressing() {
        let backend = FakeBackend::default();
        let mut interceptor = Interceptor::new(backend.clone(), Key::Escape);
        let seen = recording(&interceptor);

        interceptor
            .register_with_mode(patterns(), HookMode::ListenOnly)
            .unwrap();
        assert_eq!(backend.installed_mode(), Some(HookMode::ListenOnly));

        let verdict = press(&backend, Key::PrintScreen, Modifiers::NONE);
        assert_eq!(verdict, Some(Disposition::Pass));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_last_match_callback_wins() {
        let backend = FakeBackend::default();
        let mut interceptor = Interceptor::new(backend.clone(), Key::Escape);
        let old = recording(&interceptor);
        let new = recording(&interceptor);
        interceptor.register(patterns()).unwrap();

        press(&backend, Key::PrintScreen, Modifiers::NONE);
        assert!(old.lock().unwrap().is_empty());
        assert_eq!(new.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_grab_swallows_input_and_reports_dismiss() {
        let backend = FakeBackend::default();
        let mut interceptor = Interceptor::new(backend.clone(), Key::Escape);
        let seen = recording(&interceptor);
        let acks = Arc::new(StdMutex::new(0));
        let counter = Arc::clone(&acks);
        interceptor.on_acknowledge(move || *counter.lock().unwrap() += 1);
        interceptor.register(patterns()).unwrap();

        let grab = interceptor.input_grab();
        assert_eq!(press(&backend, Key::Char('a'), Modifiers::NONE), Some(Disposition::Pass));

        grab.acquire();
        assert_eq!(press(&backend, Key::Char('a'), Modifiers::NONE), Some(Disposition::Suppress));
        assert_eq!(
            backend.inject(InputEvent::Key(KeyInput::up(Key::Char('a'), Modifiers::NONE))),
            Some(Disposition::Pass)
        );
        assert_eq!(*acks.lock().unwrap(), 0);

        // patterns are still counted while grabbed
        press(&backend, Key::PrintScreen, Modifiers::NONE);
        assert_eq!(seen.lock().unwrap().len(), 1);

        press(&backend, Key::Escape, Modifiers::NONE);
        assert_eq!(backend.inject(InputEvent::PointerDown), Some(Disposition::Suppress));
        assert_eq!(*acks.lock().unwrap(), 2);

        grab.release();
        assert_eq!(backend.inject(InputEvent::PointerDown), Some(Disposition::Pass));
        assert_eq!(*acks.lock().unwrap(), 2);
    }

    #[test]
    fn test_shutdown_releases_grab() {
        let backend = FakeBackend::default();
        let mut interceptor = Interceptor::new(backend, Key::Escape);
        interceptor.register(patterns()).unwrap();
        let grab = interceptor.input_grab();
        grab.acquire();

        interceptor.shutdown();
        assert!(!grab.is_held());
    }
}
