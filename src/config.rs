//! Configuration loading and management
//!
//! There is no config file: defaults cover the common capture shortcuts
//! and a couple of environment variables can override them.

use std::time::Duration;

use anyhow::{Context, Result};

use crate::hotkey::{HotkeyPattern, Key};

/// Comma-separated hotkeys replacing the default list
pub const HOTKEYS_VAR: &str = "SCREENSHOT_GUARD_HOTKEYS";

/// Set to `1`/`true` to exit instead of running degraded
pub const STRICT_VAR: &str = "SCREENSHOT_GUARD_STRICT";

/// Capture shortcuts intercepted on every platform
const DEFAULT_HOTKEYS: &[&str] = &["win+shift+s", "print screen", "alt+print screen"];

/// The native macOS capture shortcuts
#[cfg(target_os = "macos")]
const NATIVE_HOTKEYS: &[&str] = &["cmd+shift+3", "cmd+shift+4", "cmd+shift+5"];
#[cfg(not(target_os = "macos"))]
const NATIVE_HOTKEYS: &[&str] = &[];

/// What to do when the suppressing hook cannot be installed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookFailurePolicy {
    /// Keep running with a listen-only hook: attempts are counted and
    /// shown but not prevented
    Degraded,
    /// Report the error and exit
    Exit,
}

/// Blocker configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Patterns to intercept, in priority order
    pub patterns: Vec<HotkeyPattern>,

    /// Key that dismisses the overlay
    pub dismiss_key: Key,

    pub on_hook_failure: HookFailurePolicy,

    /// How often the status poller reads the block counter
    pub status_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            patterns: Self::default_patterns(),
            dismiss_key: Key::Escape,
            on_hook_failure: HookFailurePolicy::Degraded,
            status_interval: Duration::from_secs(1),
        }
    }
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(list) = lookup(HOTKEYS_VAR) {
            config.patterns = parse_list(&list)
                .with_context(|| format!("invalid {}", HOTKEYS_VAR))?;
        }

        if let Some(strict) = lookup(STRICT_VAR) {
            if matches!(strict.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes") {
                config.on_hook_failure = HookFailurePolicy::Exit;
            }
        }

        Ok(config)
    }

    /// The built-in pattern list for this platform
    pub fn default_patterns() -> Vec<HotkeyPattern> {
        DEFAULT_HOTKEYS
            .iter()
            .chain(NATIVE_HOTKEYS)
            .filter_map(|s| s.parse().ok())
            .collect()
    }

    /// Patterns joined for display
    pub fn describe_patterns(&self) -> String {
        self.patterns
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn parse_list(list: &str) -> Result<Vec<HotkeyPattern>> {
    let patterns = list
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| {
            s.parse::<HotkeyPattern>()
                .with_context(|| format!("bad hotkey '{}'", s.trim()))
        })
        .collect::<Result<Vec<_>>>()?;
    anyhow::ensure!(!patterns.is_empty(), "no hotkeys given");
    Ok(patterns)
}
