//! Hotkey module for global keyboard interception
//!
//! Matches screenshot shortcuts against an OS-level input hook and keeps
//! them from reaching the system. macOS uses CGEventTap; other platforms
//! use rdev.

mod backend;
mod interceptor;
mod keys;
mod matcher;
mod pattern;

#[cfg(target_os = "macos")]
mod macos;
#[cfg(not(target_os = "macos"))]
mod rdev_backend;

#[cfg(test)]
pub(crate) use backend::testing;
pub use backend::{HookBackend, HookError, HookHealth, HookMode};
pub use interceptor::{InputGrab, Interceptor};
pub use keys::Key;
pub use pattern::HotkeyPattern;

#[cfg(test)]
pub(crate) use backend::{Disposition, InputEvent};
#[cfg(test)]
pub(crate) use keys::{Modifier, Modifiers};
#[cfg(test)]
pub(crate) use matcher::KeyInput;

/// The hook backend for the current platform
#[cfg(target_os = "macos")]
pub type PlatformBackend = macos::EventTapBackend;

/// The hook backend for the current platform
#[cfg(not(target_os = "macos"))]
pub type PlatformBackend = rdev_backend::RdevBackend;
