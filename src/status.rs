//! Periodic status reporting from the block counter and hook health

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::hotkey::HookHealth;
use crate::overlay::BlockCountReader;

/// Polls the block counter and hook health, logging changes
pub struct StatusReporter {
    reader: BlockCountReader,
    health: HookHealth,
    interval: Duration,
    last_reported: u64,
    hook_lost: bool,
}

impl StatusReporter {
    pub fn new(reader: BlockCountReader, health: HookHealth, interval: Duration) -> Self {
        Self {
            reader,
            health,
            interval,
            last_reported: 0,
            hook_lost: false,
        }
    }

    /// Read the counter once; returns the new total if it moved
    pub fn poll(&mut self) -> Option<u64> {
        let current = self.reader.current_block_count();
        if current == self.last_reported {
            return None;
        }
        self.last_reported = current;
        info!(blocked = current, "screenshot guard active");
        Some(current)
    }

    /// Returns the reason the first time the hook is seen lost
    pub fn check_hook(&mut self) -> Option<String> {
        match self.health.lost_reason() {
            Some(reason) if !self.hook_lost => {
                self.hook_lost = true;
                error!(%reason, "screenshot protection inactive");
                Some(reason)
            }
            Some(_) => None,
            None => {
                if self.hook_lost {
                    info!("screenshot protection restored");
                }
                self.hook_lost = false;
                None
            }
        }
    }

    /// Poll forever at the configured interval
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.poll();
            self.check_hook();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::BlockEvent;
    use crate::hotkey::testing::FakeBackend;
    use crate::hotkey::{HookBackend, InputGrab, Key};
    use crate::overlay::testing::RecordingFactory;
    use crate::overlay::OverlayController;

    #[test]
    fn test_poll_reports_only_changes() {
        let mut controller =
            OverlayController::new(RecordingFactory::default(), InputGrab::default(), Key::Escape);
        let mut reporter = StatusReporter::new(
            controller.counter_reader(),
            HookHealth::default(),
            Duration::from_secs(1),
        );

        assert_eq!(reporter.poll(), None);

        controller.show(BlockEvent::now("print screen".parse().unwrap()));
        controller.show(BlockEvent::now("print screen".parse().unwrap()));
        assert_eq!(reporter.poll(), Some(2));
        assert_eq!(reporter.poll(), None);
    }

    #[test]
    fn test_lost_hook_reported_once() {
        let backend = FakeBackend::default();
        let controller =
            OverlayController::new(RecordingFactory::default(), InputGrab::default(), Key::Escape);
        let mut reporter = StatusReporter::new(
            controller.counter_reader(),
            backend.health(),
            Duration::from_secs(1),
        );
        assert_eq!(reporter.check_hook(), None);

        backend.lose_hook("grab thread exited");
        assert_eq!(reporter.check_hook().as_deref(), Some("grab thread exited"));
        assert_eq!(reporter.check_hook(), None);
    }
}
