//! Overlay controller state machine
//!
//! Two states, Hidden and Showing. A block event while Hidden creates the
//! single overlay surface; a block event while Showing is coalesced into
//! the existing surface (the counter still moves); an acknowledgement
//! returns to Hidden. The controller holds window-system handles and is
//! therefore not `Send`: other threads reach it through an
//! [`OverlayHandle`], which queues commands for the owning thread.

use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::events::{BlockEvent, OverlayCommand};
use crate::hotkey::{InputGrab, Key};

use super::content::OverlayContent;
use super::state::{BlockCountReader, BlockCounter, OverlayState};
use super::surface::{log_notice, Surface, SurfaceFactory};

/// How often window-system events are serviced while showing
const PUMP_INTERVAL: Duration = Duration::from_millis(16);

/// Sending half of the controller queue; safe to use from any thread
#[derive(Debug, Clone)]
pub struct OverlayHandle {
    tx: mpsc::UnboundedSender<OverlayCommand>,
}

impl OverlayHandle {
    /// Queue a block event for the controller
    ///
    /// Never blocks, so it is safe to call from the input hook.
    pub fn show(&self, event: BlockEvent) {
        self.send(OverlayCommand::Block(event));
    }

    /// Queue a dismissal
    pub fn acknowledge(&self) {
        self.send(OverlayCommand::Acknowledge);
    }

    fn send(&self, command: OverlayCommand) {
        if let Err(e) = self.tx.send(command) {
            debug!(command = %e.0, "overlay controller gone, command dropped");
        }
    }
}

/// Create the ordered command queue between the hook and the controller
pub fn channel() -> (OverlayHandle, mpsc::UnboundedReceiver<OverlayCommand>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (OverlayHandle { tx }, rx)
}

/// The presentation the controller currently owns
enum Presentation {
    Hidden,
    Showing {
        surface: Box<dyn Surface>,
        shown_at: Instant,
    },
}

/// Drives the overlay on the UI-owning thread
pub struct OverlayController<F: SurfaceFactory> {
    factory: F,
    presentation: Presentation,
    counter: BlockCounter,
    grab: InputGrab,
    dismiss_key: Key,
}

impl<F: SurfaceFactory> OverlayController<F> {
    pub fn new(factory: F, grab: InputGrab, dismiss_key: Key) -> Self {
        Self {
            factory,
            presentation: Presentation::Hidden,
            counter: BlockCounter::new(),
            grab,
            dismiss_key,
        }
    }

    pub fn state(&self) -> OverlayState {
        match self.presentation {
            Presentation::Hidden => OverlayState::Hidden,
            Presentation::Showing { .. } => OverlayState::Showing,
        }
    }

    pub fn block_count(&self) -> u64 {
        self.counter.get()
    }

    /// Read-only counter access for status pollers
    pub fn counter_reader(&self) -> BlockCountReader {
        self.counter.reader()
    }

    /// Process commands until every [`OverlayHandle`] is dropped
    pub async fn run(&mut self, mut rx: mpsc::UnboundedReceiver<OverlayCommand>) {
        info!("overlay controller started in Hidden state");

        let mut pump = tokio::time::interval(PUMP_INTERVAL);
        pump.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                command = rx.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                _ = pump.tick(), if self.state() == OverlayState::Showing => self.pump(),
            }
        }

        info!("overlay controller stopped");
    }

    /// Apply one queued command
    pub fn handle(&mut self, command: OverlayCommand) {
        debug!(%command, state = %self.state(), "overlay command");
        match command {
            OverlayCommand::Block(event) => self.show(event),
            OverlayCommand::Acknowledge => self.dismiss(),
        }
    }

    /// Count the attempt and show the overlay, or refresh it if showing
    pub fn show(&mut self, event: BlockEvent) {
        let count = self.counter.increment();
        info!(attempt = count, pattern = %event.pattern, "screenshot attempt blocked");

        let content = OverlayContent {
            block_count: count,
            timestamp: event.timestamp,
            dismiss_key: self.dismiss_key,
        };

        match &mut self.presentation {
            Presentation::Showing { surface, .. } => {
                if let Err(e) = surface.update(&content) {
                    warn!(?e, "failed to refresh overlay");
                }
                debug!(count, "overlay already showing, refreshed in place");
            }
            Presentation::Hidden => match self.factory.create(&content) {
                Ok(surface) => {
                    self.grab.acquire();
                    self.presentation = Presentation::Showing {
                        surface,
                        shown_at: Instant::now(),
                    };
                    info!(count, "overlay shown");
                }
                Err(e) => {
                    warn!(?e, "overlay unavailable, falling back to log notice");
                    log_notice(&content);
                }
            },
        }
    }

    /// Release the grab and destroy the overlay; no-op while hidden
    pub fn dismiss(&mut self) {
        let Presentation::Showing { surface, shown_at } =
            std::mem::replace(&mut self.presentation, Presentation::Hidden)
        else {
            debug!("dismiss ignored, overlay hidden");
            return;
        };

        self.grab.release();
        if let Err(e) = surface.close() {
            warn!(?e, "failed to close overlay surface");
        }
        info!(
            visible_ms = shown_at.elapsed().as_millis() as u64,
            "overlay closed"
        );
    }

    /// Terminal transition: Hidden with no surface and no grab
    pub fn shutdown(&mut self) {
        self.dismiss();
        self.grab.release();
    }

    fn pump(&mut self) {
        if let Presentation::Showing { surface, .. } = &mut self.presentation {
            surface.pump();
        }
    }
}
