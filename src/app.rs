//! Start/stop lifecycle tying the interceptor to the overlay controller

use std::future::Future;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::config::{Config, HookFailurePolicy};
use crate::events::OverlayCommand;
use crate::hotkey::{HookBackend, HookError, HookMode, Interceptor};
use crate::overlay::{self, BlockCountReader, OverlayController, OverlayState, SurfaceFactory};
use crate::status::StatusReporter;

/// The screenshot blocker: one hook, one overlay controller
pub struct App<B: HookBackend, F: SurfaceFactory> {
    config: Config,
    interceptor: Interceptor<B>,
    controller: OverlayController<F>,
    commands: Option<mpsc::UnboundedReceiver<OverlayCommand>>,
}

impl<B: HookBackend, F: SurfaceFactory> App<B, F> {
    pub fn new(config: Config, backend: B, factory: F) -> Self {
        let interceptor = Interceptor::new(backend, config.dismiss_key);
        let controller =
            OverlayController::new(factory, interceptor.input_grab(), config.dismiss_key);

        // The hook thread only ever enqueues
        let (overlay, commands) = overlay::channel();
        let on_match = overlay.clone();
        interceptor.on_match(move |event| on_match.show(event));
        interceptor.on_acknowledge(move || overlay.acknowledge());

        Self {
            config,
            interceptor,
            controller,
            commands: Some(commands),
        }
    }

    /// Install the hook, applying the configured failure policy
    ///
    /// Returns the mode the hook actually runs in. `ListenOnly` means
    /// attempts are seen and counted but not prevented.
    pub fn start(&mut self) -> Result<HookMode, HookError> {
        let patterns = self.config.patterns.clone();

        let err = match self.interceptor.register(patterns.iter().copied()) {
            Ok(handle) => return Ok(handle.mode()),
            Err(e) => e,
        };

        error!(%err, "screenshot hotkeys cannot be suppressed");
        if self.config.on_hook_failure == HookFailurePolicy::Exit
            || err == HookError::AlreadyRegistered
        {
            return Err(err);
        }

        warn!("continuing in degraded mode: attempts are observed but not blocked");
        match self
            .interceptor
            .register_with_mode(patterns.iter().copied(), HookMode::ListenOnly)
        {
            Ok(handle) => Ok(handle.mode()),
            Err(fallback) => {
                error!(%fallback, "listen-only hook also failed");
                Err(err)
            }
        }
    }

    /// Drive the overlay until `stop` resolves
    pub async fn run(&mut self, stop: impl Future<Output = ()>) {
        let Some(commands) = self.commands.take() else {
            warn!("run called twice, ignoring");
            return;
        };
        let status = StatusReporter::new(
            self.counter_reader(),
            self.interceptor.health(),
            self.config.status_interval,
        );

        tokio::select! {
            _ = self.controller.run(commands) => {
                info!("overlay queue closed");
            }
            _ = status.run() => {}
            _ = stop => {
                info!("stop requested");
            }
        }
    }

    /// Tear down: hook first so no match fires into a closed overlay
    pub fn stop(&mut self) {
        match self.interceptor.handle() {
            Some(handle) => self.interceptor.unregister(handle),
            None => self.interceptor.shutdown(),
        }
        self.controller.shutdown();

        info!(
            total_blocked = self.controller.block_count(),
            "screenshot guard stopped"
        );
    }

    pub fn state(&self) -> OverlayState {
        self.controller.state()
    }

    pub fn counter_reader(&self) -> BlockCountReader {
        self.controller.counter_reader()
    }

    /// Apply everything queued so far without awaiting
    #[cfg(test)]
    fn drain(&mut self) {
        if let Some(commands) = self.commands.as_mut() {
            while let Ok(command) = commands.try_recv() {
                self.controller.handle(command);
            }
        }
    }
}
