//! Pattern matching with per-pattern press debouncing
//!
//! Keyboard auto-repeat produces a stream of key-down events while a key
//! is held. Each pattern remembers whether it is currently down and only
//! reports a match on the up-to-down transition.

use super::keys::{Key, Modifiers};
use super::pattern::HotkeyPattern;

/// Direction of a key event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Down,
    Up,
}

/// A key event as translated by a hook backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub key: Key,
    pub action: KeyAction,
    /// Modifiers held when the event was generated
    pub modifiers: Modifiers,
}

impl KeyInput {
    pub fn down(key: Key, modifiers: Modifiers) -> Self {
        Self {
            key,
            action: KeyAction::Down,
            modifiers,
        }
    }

    pub fn up(key: Key, modifiers: Modifiers) -> Self {
        Self {
            key,
            action: KeyAction::Up,
            modifiers,
        }
    }
}

/// Result of feeding one key event to the matcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchOutcome {
    /// Pattern that transitioned to down on this event
    pub matched: Option<HotkeyPattern>,
    /// The event belongs to a suppressing pattern and must not reach the OS
    pub suppress: bool,
}

/// Matches key events against an ordered list of patterns
#[derive(Debug, Clone)]
pub struct Matcher {
    patterns: Vec<HotkeyPattern>,
    down: Vec<bool>,
}

impl Matcher {
    /// Create a matcher; duplicate patterns keep their first position
    pub fn new(patterns: impl IntoIterator<Item = HotkeyPattern>) -> Self {
        let mut unique: Vec<HotkeyPattern> = Vec::new();
        for pattern in patterns {
            if !unique.contains(&pattern) {
                unique.push(pattern);
            }
        }
        let down = vec![false; unique.len()];
        Self {
            patterns: unique,
            down,
        }
    }

    pub fn patterns(&self) -> &[HotkeyPattern] {
        &self.patterns
    }

    /// Process one key event
    pub fn process(&mut self, input: KeyInput) -> MatchOutcome {
        match input.action {
            KeyAction::Down => self.process_down(input),
            KeyAction::Up => self.process_up(input.key),
        }
    }

    fn process_down(&mut self, input: KeyInput) -> MatchOutcome {
        let Some(index) = self
            .patterns
            .iter()
            .position(|p| p.matches(input.key, input.modifiers))
        else {
            return MatchOutcome::default();
        };

        let pattern = self.patterns[index];
        let was_down = std::mem::replace(&mut self.down[index], true);

        MatchOutcome {
            matched: (!was_down).then_some(pattern),
            suppress: pattern.suppress(),
        }
    }

    fn process_up(&mut self, key: Key) -> MatchOutcome {
        // The release is matched on the key alone: modifiers may already be
        // released by the time the primary key comes up.
        let mut suppress = false;
        for (pattern, down) in self.patterns.iter().zip(self.down.iter_mut()) {
            if pattern.key() == key && *down {
                *down = false;
                suppress |= pattern.suppress();
            }
        }
        MatchOutcome {
            matched: None,
            suppress,
        }
    }

    /// Forget all held keys
    pub fn reset(&mut self) {
        self.down.iter_mut().for_each(|d| *d = false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::keys::Modifier;

    fn win_shift() -> Modifiers {
        Modifiers::NONE.with(Modifier::Meta).with(Modifier::Shift)
    }

    fn matcher() -> Matcher {
        Matcher::new(
            ["win+shift+s", "print screen", "alt+print screen"]
                .iter()
                .map(|s| s.parse().unwrap()),
        )
    }

    #[test]
    fn test_match_emits_once_per_press() {
        let mut m = matcher();
        let s = Key::Char('s');

        let first = m.process(KeyInput::down(s, win_shift()));
        assert_eq!(first.matched.map(|p| p.to_string()), Some("shift+win+s".into()));
        assert!(first.suppress);

        // auto-repeat while held
        for _ in 0..25 {
            let repeat = m.process(KeyInput::down(s, win_shift()));
            assert_eq!(repeat.matched, None);
            assert!(repeat.suppress);
        }

        let release = m.process(KeyInput::up(s, win_shift()));
        assert_eq!(release.matched, None);
        assert!(release.suppress);

        let again = m.process(KeyInput::down(s, win_shift()));
        assert!(again.matched.is_some());
    }

    #[test]
    fn test_repeat_suppression_counts_press_transitions() {
        let mut m = matcher();
        let mut emitted = 0;
        let presses = [1usize, 4, 0, 12, 2];

        for repeats in presses {
            let mut events = vec![KeyInput::down(Key::PrintScreen, Modifiers::NONE)];
            events.extend(
                std::iter::repeat(KeyInput::down(Key::PrintScreen, Modifiers::NONE)).take(repeats),
            );
            events.push(KeyInput::up(Key::PrintScreen, Modifiers::NONE));

            for event in events {
                if m.process(event).matched.is_some() {
                    emitted += 1;
                }
            }
        }

        assert_eq!(emitted, presses.len());
    }

    #[test]
    fn test_modifiers_must_match_exactly() {
        let mut m = matcher();
        let extra = win_shift().with(Modifier::Control);
        let outcome = m.process(KeyInput::down(Key::Char('s'), extra));
        assert_eq!(outcome, MatchOutcome::default());

        let plain = m.process(KeyInput::down(Key::Char('s'), Modifiers::NONE));
        assert_eq!(plain, MatchOutcome::default());
    }

    #[test]
    fn test_print_screen_variants_are_distinct() {
        let mut m = matcher();
        let alt = Modifiers::NONE.with(Modifier::Alt);

        let plain = m.process(KeyInput::down(Key::PrintScreen, Modifiers::NONE));
        assert_eq!(plain.matched.map(|p| p.to_string()), Some("print screen".into()));
        m.process(KeyInput::up(Key::PrintScreen, Modifiers::NONE));

        let with_alt = m.process(KeyInput::down(Key::PrintScreen, alt));
        assert_eq!(with_alt.matched.map(|p| p.to_string()), Some("alt+print screen".into()));
    }

    #[test]
    fn test_release_after_modifiers_lifted_clears_state() {
        let mut m = matcher();
        m.process(KeyInput::down(Key::Char('s'), win_shift()));

        let release = m.process(KeyInput::up(Key::Char('s'), Modifiers::NONE));
        assert!(release.suppress);

        assert!(m
            .process(KeyInput::down(Key::Char('s'), win_shift()))
            .matched
            .is_some());
    }

    #[test]
    fn test_unmatched_release_passes() {
        let mut m = matcher();
        let release = m.process(KeyInput::up(Key::Char('s'), Modifiers::NONE));
        assert!(!release.suppress);
    }

    #[test]
    fn test_observe_only_pattern_is_not_suppressed() {
        let mut m = Matcher::new(["~ctrl+p".parse().unwrap()]);
        let ctrl = Modifiers::NONE.with(Modifier::Control);
        let outcome = m.process(KeyInput::down(Key::Char('p'), ctrl));
        assert!(outcome.matched.is_some());
        assert!(!outcome.suppress);
    }

    #[test]
    fn test_duplicates_and_reset() {
        let mut m = Matcher::new(
            ["print screen", "PrtSc", "print screen"]
                .iter()
                .map(|s| s.parse().unwrap()),
        );
        assert_eq!(m.patterns().len(), 1);

        m.process(KeyInput::down(Key::PrintScreen, Modifiers::NONE));
        m.reset();
        assert!(m
            .process(KeyInput::down(Key::PrintScreen, Modifiers::NONE))
            .matched
            .is_some());
    }
}
