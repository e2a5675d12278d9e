//! Events flowing from the hook thread to the overlay controller
//!
//! The hook thread never touches overlay state. It only produces
//! [`OverlayCommand`]s, which are delivered in detection order to the
//! thread that owns the overlay.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::hotkey::HotkeyPattern;

/// One detected screenshot attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockEvent {
    /// Local wall-clock time of the detection
    pub timestamp: DateTime<Local>,

    /// The configured pattern that matched
    pub pattern: HotkeyPattern,
}

impl BlockEvent {
    /// Create an event stamped with the current local time
    pub fn now(pattern: HotkeyPattern) -> Self {
        Self {
            timestamp: Local::now(),
            pattern,
        }
    }
}

/// Commands consumed by the overlay controller, in arrival order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OverlayCommand {
    /// A pattern matched; show or refresh the overlay
    Block(BlockEvent),

    /// The user acknowledged the overlay (dismiss key or click)
    Acknowledge,
}

impl std::fmt::Display for OverlayCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverlayCommand::Block(event) => write!(
                f,
                "BLOCK ({} at {})",
                event.pattern,
                event.timestamp.format("%H:%M:%S")
            ),
            OverlayCommand::Acknowledge => write!(f, "ACKNOWLEDGE"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern() -> HotkeyPattern {
        "win+shift+s".parse().unwrap()
    }

    #[test]
    fn test_command_serialization() {
        let command = OverlayCommand::Block(BlockEvent::now(pattern()));
        let json = serde_json::to_string(&command).unwrap();
        assert!(json.contains(r#""type":"block""#));
        assert!(json.contains("shift+win+s"));
    }

    #[test]
    fn test_command_deserialization() {
        let json = r#"{"type":"acknowledge"}"#;
        let command: OverlayCommand = serde_json::from_str(json).unwrap();
        assert_eq!(command, OverlayCommand::Acknowledge);
    }

    #[test]
    fn test_display() {
        let command = OverlayCommand::Block(BlockEvent::now(pattern()));
        assert!(command.to_string().starts_with("BLOCK (shift+win+s at "));
        assert_eq!(OverlayCommand::Acknowledge.to_string(), "ACKNOWLEDGE");
    }
}
