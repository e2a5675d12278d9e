//! Overlay state and the block counter

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

/// Whether the blocking overlay is on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayState {
    /// No overlay surface exists
    #[default]
    Hidden,
    /// Exactly one overlay surface is live and holds the input grab
    Showing,
}

impl std::fmt::Display for OverlayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverlayState::Hidden => write!(f, "Hidden"),
            OverlayState::Showing => write!(f, "Showing"),
        }
    }
}

/// Count of screenshot attempts seen this run
///
/// Only the overlay controller holds one of these; it never decrements.
/// Everyone else reads through a [`BlockCountReader`].
#[derive(Debug, Default)]
pub struct BlockCounter {
    value: Arc<AtomicU64>,
}

impl BlockCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one attempt and return the new total
    pub(crate) fn increment(&self) -> u64 {
        self.value.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::SeqCst)
    }

    pub fn reader(&self) -> BlockCountReader {
        BlockCountReader {
            value: Arc::clone(&self.value),
        }
    }
}

/// Read-only view of the block counter for status pollers
#[derive(Debug, Clone)]
pub struct BlockCountReader {
    value: Arc<AtomicU64>,
}

impl BlockCountReader {
    pub fn current_block_count(&self) -> u64 {
        self.value.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        assert_eq!(OverlayState::default(), OverlayState::Hidden);
    }

    #[test]
    fn test_counter_is_visible_to_readers() {
        let counter = BlockCounter::new();
        let reader = counter.reader();
        assert_eq!(reader.current_block_count(), 0);

        assert_eq!(counter.increment(), 1);
        assert_eq!(counter.increment(), 2);
        assert_eq!(reader.clone().current_block_count(), 2);
        assert_eq!(counter.get(), 2);
    }
}
