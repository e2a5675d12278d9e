//! Hotkey patterns: a modifier set plus one primary key

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::keys::{Key, Modifier, Modifiers};

/// An immutable key combination to intercept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HotkeyPattern {
    modifiers: Modifiers,
    key: Key,
    suppress: bool,
}

impl HotkeyPattern {
    /// Create a pattern whose native action is suppressed
    pub fn new(modifiers: Modifiers, key: Key) -> Self {
        Self {
            modifiers,
            key,
            suppress: true,
        }
    }

    /// Create a pattern that is reported but still reaches the OS
    pub fn observe_only(modifiers: Modifiers, key: Key) -> Self {
        Self {
            suppress: false,
            ..Self::new(modifiers, key)
        }
    }

    pub fn key(&self) -> Key {
        self.key
    }

    /// Whether the OS default action must be prevented
    pub fn suppress(&self) -> bool {
        self.suppress
    }

    /// Exact match on the modifier set and the primary key
    pub fn matches(&self, key: Key, modifiers: Modifiers) -> bool {
        self.key == key && self.modifiers == modifiers
    }
}

impl fmt::Display for HotkeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.suppress {
            f.write_str("~")?;
        }
        if self.modifiers.is_empty() {
            write!(f, "{}", self.key)
        } else {
            write!(f, "{}+{}", self.modifiers, self.key)
        }
    }
}

/// Errors from parsing a hotkey string such as `win+shift+s`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("empty hotkey")]
    Empty,

    #[error("unknown key or modifier '{0}'")]
    UnknownToken(String),

    #[error("hotkey '{0}' has no primary key")]
    MissingKey(String),

    #[error("hotkey '{0}' has more than one primary key")]
    MultipleKeys(String),
}

impl FromStr for HotkeyPattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        // A leading '~' lets the combination through to the OS
        let (suppress, normalized) = match normalized.strip_prefix('~') {
            Some(rest) => (false, rest.trim()),
            None => (true, normalized.as_str()),
        };
        if normalized.is_empty() {
            return Err(PatternError::Empty);
        }

        let mut modifiers = Modifiers::NONE;
        let mut key = None;

        for token in normalized.split('+').map(str::trim) {
            if let Some(modifier) = Modifier::from_name(token) {
                modifiers.set(modifier, true);
                continue;
            }
            let parsed =
                Key::from_name(token).ok_or_else(|| PatternError::UnknownToken(token.to_string()))?;
            if key.replace(parsed).is_some() {
                return Err(PatternError::MultipleKeys(s.trim().to_string()));
            }
        }

        let key = key.ok_or_else(|| PatternError::MissingKey(s.trim().to_string()))?;
        Ok(if suppress {
            HotkeyPattern::new(modifiers, key)
        } else {
            HotkeyPattern::observe_only(modifiers, key)
        })
    }
}

impl Serialize for HotkeyPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for HotkeyPattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_capture_tool_shortcut() {
        let pattern: HotkeyPattern = "Win+Shift+S".parse().unwrap();
        assert_eq!(pattern.key(), Key::Char('s'));
        assert!(pattern.modifiers.meta);
        assert!(pattern.modifiers.shift);
        assert!(!pattern.modifiers.control);
        assert!(pattern.suppress());
    }

    #[test]
    fn test_parse_is_order_independent() {
        let a: HotkeyPattern = "shift+win+s".parse().unwrap();
        let b: HotkeyPattern = "cmd+shift+s".parse().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_parse_print_screen_variants() {
        let plain: HotkeyPattern = "print screen".parse().unwrap();
        let alt: HotkeyPattern = "alt+print screen".parse().unwrap();
        assert_eq!(plain.key(), Key::PrintScreen);
        assert!(plain.modifiers.is_empty());
        assert!(alt.modifiers.alt);
        assert_ne!(plain, alt);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<HotkeyPattern>(), Err(PatternError::Empty));
        assert_eq!(
            "ctrl+shift".parse::<HotkeyPattern>(),
            Err(PatternError::MissingKey("ctrl+shift".into()))
        );
        assert_eq!(
            "ctrl+a+b".parse::<HotkeyPattern>(),
            Err(PatternError::MultipleKeys("ctrl+a+b".into()))
        );
        assert!(matches!(
            "hyper+x".parse::<HotkeyPattern>(),
            Err(PatternError::UnknownToken(_))
        ));
    }

    #[test]
    fn test_parse_observe_only() {
        let pattern: HotkeyPattern = "~ctrl+print screen".parse().unwrap();
        assert!(!pattern.suppress());
        assert_eq!(pattern.to_string(), "~ctrl+print screen");
        assert_eq!("~".parse::<HotkeyPattern>(), Err(PatternError::Empty));
    }

    #[test]
    fn test_matches_requires_exact_modifiers() {
        let pattern: HotkeyPattern = "win+shift+s".parse().unwrap();
        let exact = Modifiers::NONE.with(Modifier::Meta).with(Modifier::Shift);
        assert!(pattern.matches(Key::Char('s'), exact));
        assert!(!pattern.matches(Key::Char('s'), exact.with(Modifier::Control)));
        assert!(!pattern.matches(Key::Char('s'), Modifiers::NONE.with(Modifier::Shift)));
        assert!(!pattern.matches(Key::Char('a'), exact));
    }

    #[test]
    fn test_display_and_serde() {
        let pattern: HotkeyPattern = "alt+print screen".parse().unwrap();
        assert_eq!(pattern.to_string(), "alt+print screen");

        let json = serde_json::to_string(&pattern).unwrap();
        assert_eq!(json, r#""alt+print screen""#);
        let back: HotkeyPattern = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pattern);
    }
}
