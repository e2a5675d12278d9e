//! Surfaces the overlay controller draws on

use tracing::warn;

use super::content::OverlayContent;

/// Errors raised by overlay surfaces
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OverlayError {
    #[error("failed to create overlay surface: {0}")]
    SurfaceCreationFailed(String),

    #[cfg_attr(not(windows), allow(dead_code))]
    #[error("overlay surface error: {0}")]
    Surface(String),
}

/// One live fullscreen overlay
///
/// Surfaces belong to the UI-owning thread and are not `Send`.
pub trait Surface {
    /// Redraw with new content in place
    fn update(&mut self, content: &OverlayContent) -> Result<(), OverlayError>;

    /// Process pending window-system events
    fn pump(&mut self) {}

    /// Destroy the surface
    fn close(self: Box<Self>) -> Result<(), OverlayError>;
}

/// Creates fullscreen, topmost surfaces
pub trait SurfaceFactory {
    fn create(&mut self, content: &OverlayContent) -> Result<Box<dyn Surface>, OverlayError>;
}

/// Write the overlay text to the log
///
/// This is the best-effort notice used when no window can be created.
pub fn log_notice(content: &OverlayContent) {
    warn!(
        block_count = content.block_count,
        "screenshot blocked without overlay\n{}",
        content.text()
    );
}

/// Factory for hosts without a window backend
///
/// Always fails, so the controller stays Hidden, takes no input grab and
/// falls back to [`log_notice`].
#[derive(Debug, Default)]
#[cfg_attr(any(target_os = "macos", windows), allow(dead_code))]
pub struct HeadlessSurfaceFactory;

impl SurfaceFactory for HeadlessSurfaceFactory {
    fn create(&mut self, _content: &OverlayContent) -> Result<Box<dyn Surface>, OverlayError> {
        Err(OverlayError::SurfaceCreationFailed(
            "no overlay window backend on this platform".to_string(),
        ))
    }
}
