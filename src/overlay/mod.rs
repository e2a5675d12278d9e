//! Overlay module: the blocking fullscreen notice
//!
//! Provides an explicit two-state machine (Hidden, Showing) that owns the
//! one overlay surface and the block counter.

mod content;
mod controller;
mod state;
mod surface;

#[cfg(target_os = "macos")]
mod macos;
#[cfg(windows)]
mod win32;

pub use controller::{channel, OverlayController};
pub use state::{BlockCountReader, OverlayState};
#[cfg(not(any(target_os = "macos", windows)))]
pub use surface::HeadlessSurfaceFactory;
pub use surface::SurfaceFactory;

#[cfg(test)]
pub(crate) use surface::testing;

/// The window backend for the current platform
#[cfg(target_os = "macos")]
pub type PlatformSurfaceFactory = macos::WindowSurfaceFactory;

/// The window backend for the current platform
#[cfg(windows)]
pub type PlatformSurfaceFactory = win32::PopupSurfaceFactory;

/// No window backend here: every attempt falls back to a log notice
#[cfg(not(any(target_os = "macos", windows)))]
pub type PlatformSurfaceFactory = HeadlessSurfaceFactory;
