//! Text shown on the blocking overlay

use chrono::{DateTime, Local};

use crate::hotkey::Key;

pub const TITLE: &str = "SCREENSHOT BLOCKED";
pub const SUBTITLE: &str = "Screen capture protection is active";

/// Everything a surface needs to draw the overlay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayContent {
    pub block_count: u64,
    pub timestamp: DateTime<Local>,
    pub dismiss_key: Key,
}

impl OverlayContent {
    pub fn title(&self) -> &'static str {
        TITLE
    }

    pub fn subtitle(&self) -> &'static str {
        SUBTITLE
    }

    /// Body text: explanation, counter and time of the latest attempt
    pub fn details(&self) -> String {
        format!(
            "This screenshot attempt has been blocked.\n\n\
             Blocked screenshots: {}\n\
             Time: {}",
            self.block_count,
            self.timestamp.format("%H:%M:%S"),
        )
    }

    pub fn dismiss_hint(&self) -> String {
        format!(
            "Click anywhere or press {} to close",
            self.dismiss_key.to_string().to_uppercase()
        )
    }

    /// All lines as one block, for the log notice
    pub fn text(&self) -> String {
        format!(
            "{}\n{}\n\n{}\n\n{}",
            self.title(),
            self.subtitle(),
            self.details(),
            self.dismiss_hint()
        )
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn content(count: u64) -> OverlayContent {
        OverlayContent {
            block_count: count,
            timestamp: Local.with_ymd_and_hms(2024, 5, 1, 9, 7, 3).unwrap(),
            dismiss_key: Key::Escape,
        }
    }

    #[test]
    fn test_details_show_count_and_time() {
        let details = content(3).details();
        assert!(details.contains("Blocked screenshots: 3"));
        assert!(details.contains("Time: 09:07:03"));
    }

    #[test]
    fn test_dismiss_hint_names_key() {
        assert_eq!(
            content(1).dismiss_hint(),
            "Click anywhere or press ESC to close"
        );
    }

    #[test]
    fn test_text_starts_with_title() {
        let text = content(1).text();
        assert!(text.starts_with("SCREENSHOT BLOCKED\n"));
        assert!(text.ends_with("to close"));
    }
}
