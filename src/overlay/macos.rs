//! Fullscreen overlay window for macOS
//!
//! One borderless window per screen at screen-saver level; the one on the
//! main screen is made key so it takes keyboard focus. Must be used from
//! the main thread.

#![allow(deprecated)] // cocoa types are deprecated in favour of objc2

use cocoa::appkit::{
    NSApp, NSApplication, NSApplicationActivationPolicy, NSBackingStoreType, NSColor, NSEventMask,
    NSScreen, NSView, NSWindow, NSWindowStyleMask,
};
use cocoa::base::{id, nil, NO, YES};
use cocoa::foundation::{NSArray, NSAutoreleasePool, NSPoint, NSRect, NSSize, NSString};
use objc::{class, msg_send, sel, sel_impl};
use tracing::debug;

use super::content::OverlayContent;
use super::surface::{OverlayError, Surface, SurfaceFactory};

/// NSScreenSaverWindowLevel; above the menu bar and the Dock
const SCREEN_SAVER_LEVEL: i64 = 1000;

/// NSTextAlignmentCenter differs between the arm64 and x86_64 ABIs
#[cfg(target_arch = "aarch64")]
const TEXT_ALIGN_CENTER: u64 = 1;
#[cfg(not(target_arch = "aarch64"))]
const TEXT_ALIGN_CENTER: u64 = 2;

type Rgb = (f64, f64, f64);

const BACKGROUND: Rgb = (0.102, 0.102, 0.180);
const TITLE_COLOR: Rgb = (1.0, 0.420, 0.420);
const SUBTITLE_COLOR: Rgb = (0.306, 0.804, 0.769);
const BODY_COLOR: Rgb = (1.0, 1.0, 1.0);

/// Creates overlay windows; activates the application on first use
#[derive(Debug, Default)]
pub struct WindowSurfaceFactory {
    app_ready: bool,
}

impl WindowSurfaceFactory {
    fn ensure_app(&mut self) {
        if self.app_ready {
            return;
        }
        unsafe {
            let app = NSApp();
            app.setActivationPolicy_(
                NSApplicationActivationPolicy::NSApplicationActivationPolicyAccessory,
            );
            app.finishLaunching();
        }
        self.app_ready = true;
        debug!("NSApplication initialised for overlay windows");
    }
}

impl SurfaceFactory for WindowSurfaceFactory {
    fn create(&mut self, content: &OverlayContent) -> Result<Box<dyn Surface>, OverlayError> {
        self.ensure_app();
        unsafe {
            let pool = NSAutoreleasePool::new(nil);
            let result = WindowSurface::open(content);
            pool.drain();
            result.map(|surface| Box::new(surface) as Box<dyn Surface>)
        }
    }
}

struct WindowSurface {
    screens: Vec<ScreenWindow>,
}

struct ScreenWindow {
    window: id,
    details: id,
}

impl WindowSurface {
    unsafe fn open(content: &OverlayContent) -> Result<Self, OverlayError> {
        let screens = NSScreen::screens(nil);
        let count = if screens == nil { 0 } else { screens.count() };
        if count == 0 {
            return Err(OverlayError::SurfaceCreationFailed(
                "no screens attached".to_string(),
            ));
        }

        let mut surface = Self {
            screens: Vec::with_capacity(count as usize),
        };
        // Index 0 is the screen with the menu bar
        for index in 0..count {
            let screen = screens.objectAtIndex(index);
            match ScreenWindow::open(screen, content) {
                Ok(window) => surface.screens.push(window),
                Err(e) => {
                    surface.close_all();
                    return Err(e);
                }
            }
        }

        if let Some(main) = surface.screens.first() {
            main.window.makeKeyAndOrderFront_(nil);
        }
        NSApp().activateIgnoringOtherApps_(YES);
        debug!(screens = count, "overlay windows opened");

        Ok(surface)
    }

    unsafe fn close_all(&mut self) {
        for screen in self.screens.drain(..) {
            screen.window.orderOut_(nil);
            screen.window.close();
            let _: () = msg_send![screen.window, release];
        }
    }
}

impl ScreenWindow {
    unsafe fn open(screen: id, content: &OverlayContent) -> Result<Self, OverlayError> {
        let frame = NSScreen::frame(screen);

        let window = NSWindow::alloc(nil).initWithContentRect_styleMask_backing_defer_(
            frame,
            NSWindowStyleMask::NSBorderlessWindowMask,
            NSBackingStoreType::NSBackingStoreBuffered,
            NO,
        );
        if window == nil {
            return Err(OverlayError::SurfaceCreationFailed(
                "NSWindow allocation failed".to_string(),
            ));
        }

        let _: () = msg_send![window, setReleasedWhenClosed: NO];
        window.setLevel_(SCREEN_SAVER_LEVEL);
        window.setOpaque_(YES);
        window.setBackgroundColor_(color(BACKGROUND));

        let view = window.contentView();
        let [title_frame, subtitle_frame, details_frame, hint_frame] = label_frames(frame);

        let title = label(content.title(), 48.0, true, TITLE_COLOR);
        let _: () = msg_send![title, setFrame: title_frame];
        view.addSubview_(title);

        let subtitle = label(content.subtitle(), 24.0, false, SUBTITLE_COLOR);
        let _: () = msg_send![subtitle, setFrame: subtitle_frame];
        view.addSubview_(subtitle);

        let details = label(&content.details(), 18.0, false, BODY_COLOR);
        let _: () = msg_send![details, setFrame: details_frame];
        view.addSubview_(details);

        let hint = label(&content.dismiss_hint(), 18.0, true, TITLE_COLOR);
        let _: () = msg_send![hint, setFrame: hint_frame];
        view.addSubview_(hint);

        window.orderFront_(nil);
        Ok(Self { window, details })
    }
}

impl Surface for WindowSurface {
    fn update(&mut self, content: &OverlayContent) -> Result<(), OverlayError> {
        unsafe {
            let pool = NSAutoreleasePool::new(nil);
            let details = ns_string(&content.details());
            for screen in &self.screens {
                let _: () = msg_send![screen.details, setStringValue: details];
            }
            if let Some(main) = self.screens.first() {
                main.window.makeKeyAndOrderFront_(nil);
            }
            pool.drain();
        }
        Ok(())
    }

    fn pump(&mut self) {
        unsafe {
            let pool = NSAutoreleasePool::new(nil);
            let app = NSApp();
            let mode = ns_string("kCFRunLoopDefaultMode");
            loop {
                let past: id = msg_send![class!(NSDate), distantPast];
                let event = app.nextEventMatchingMask_untilDate_inMode_dequeue_(
                    NSEventMask::NSAnyEventMask.bits(),
                    past,
                    mode,
                    YES,
                );
                if event == nil {
                    break;
                }
                app.sendEvent_(event);
            }
            pool.drain();
        }
    }

    fn close(mut self: Box<Self>) -> Result<(), OverlayError> {
        unsafe {
            self.close_all();
        }
        Ok(())
    }
}

unsafe fn ns_string(text: &str) -> id {
    NSString::alloc(nil).init_str(text).autorelease()
}

unsafe fn color((r, g, b): Rgb) -> id {
    NSColor::colorWithRed_green_blue_alpha_(nil, r, g, b, 1.0)
}

/// Label frames in window coordinates: title, subtitle, details, hint
///
/// `screen` is in global coordinates; secondary screens may have a
/// negative or offset origin, which the window-local frames ignore.
fn label_frames(screen: NSRect) -> [NSRect; 4] {
    let width = screen.size.width;
    let height = screen.size.height;
    [
        band(width, height * 0.62, 70.0),
        band(width, height * 0.55, 40.0),
        band(width, height * 0.35, 140.0),
        band(width, height * 0.25, 40.0),
    ]
}

/// A full-width horizontal strip centred on `center_y`
fn band(width: f64, center_y: f64, height: f64) -> NSRect {
    NSRect::new(
        NSPoint::new(0.0, center_y - height / 2.0),
        NSSize::new(width, height),
    )
}

unsafe fn label(text: &str, size: f64, bold: bool, rgb: Rgb) -> id {
    let field: id = msg_send![class!(NSTextField), alloc];
    let field: id = msg_send![field, init];
    let _: () = msg_send![field, setEditable: NO];
    let _: () = msg_send![field, setSelectable: NO];
    let _: () = msg_send![field, setBezeled: NO];
    let _: () = msg_send![field, setDrawsBackground: NO];
    let _: () = msg_send![field, setAlignment: TEXT_ALIGN_CENTER];
    let font: id = if bold {
        msg_send![class!(NSFont), boldSystemFontOfSize: size]
    } else {
        msg_send![class!(NSFont), systemFontOfSize: size]
    };
    let _: () = msg_send![field, setFont: font];
    let _: () = msg_send![field, setTextColor: color(rgb)];
    let _: () = msg_send![field, setStringValue: ns_string(text)];
    let _: id = msg_send![field, autorelease];
    field
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_frames_are_window_local_on_every_screen() {
        let main = NSRect::new(NSPoint::new(0.0, 0.0), NSSize::new(1440.0, 900.0));
        let left_of_main = NSRect::new(NSPoint::new(-1920.0, -180.0), NSSize::new(1920.0, 1080.0));

        for screen in [main, left_of_main] {
            for frame in label_frames(screen) {
                assert_eq!(frame.origin.x, 0.0);
                assert_eq!(frame.size.width, screen.size.width);
                assert!(frame.origin.y >= 0.0);
                assert!(frame.origin.y + frame.size.height <= screen.size.height);
            }
        }
    }
}
