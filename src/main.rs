//! screenshot-guard: blocks screen capture shortcuts and tells the user
//!
//! Runs in the background and provides:
//! - A global input hook that swallows capture hotkeys (Print Screen,
//!   Win+Shift+S, Cmd+Shift+3/4/5 on macOS)
//! - A fullscreen "SCREENSHOT BLOCKED" overlay with a running count
//! - Dismissal by click or Escape
//!
//! Type `q` on stdin or send SIGINT/SIGTERM to stop.

mod app;
mod config;
mod events;
mod hotkey;
mod lifecycle;
mod overlay;
mod status;

use anyhow::Result;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::config::Config;
use crate::hotkey::{HookMode, PlatformBackend};
use crate::lifecycle::{watch_stdin, ShutdownSignal};
use crate::overlay::PlatformSurfaceFactory;

// The overlay owns window-system handles, so everything UI-side stays on
// the main thread.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "screenshot-guard starting"
    );

    let config = Config::load()?;
    info!(
        hotkeys = %config.describe_patterns(),
        policy = ?config.on_hook_failure,
        "configuration loaded"
    );

    let shutdown = ShutdownSignal::new();
    tokio::spawn(watch_stdin(shutdown.stop_handle()));

    let mut app = App::new(
        config,
        PlatformBackend::default(),
        PlatformSurfaceFactory::default(),
    );

    match app.start() {
        Ok(HookMode::Suppress) => info!("screenshot protection active"),
        Ok(HookMode::ListenOnly) => info!("screenshot monitoring active (not blocking)"),
        Err(e) => {
            error!(%e, "failed to start screenshot protection");
            app.stop();
            return Err(e.into());
        }
    }
    info!("press Ctrl+C or type 'q' to stop");

    app.run(shutdown.wait()).await;

    info!("shutting down...");
    app.stop();

    Ok(())
}
