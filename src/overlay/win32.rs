//! Fullscreen overlay window for Windows
//!
//! A topmost popup spanning the virtual screen, so every monitor is
//! covered, painted with GDI. Created and pumped on the main thread; the
//! content to paint lives in a thread-local read by the window procedure.

use std::cell::RefCell;

use tracing::debug;
use windows::core::{w, PCWSTR};
use windows::Win32::Foundation::{COLORREF, HINSTANCE, HWND, LPARAM, LRESULT, RECT, WPARAM};
use windows::Win32::Graphics::Gdi::{
    BeginPaint, CreateFontIndirectW, CreateSolidBrush, DeleteObject, DrawTextW, EndPaint,
    FillRect, InvalidateRect, SelectObject, SetBkMode, SetTextColor, DT_CENTER, DT_WORDBREAK, HDC,
    HGDIOBJ, LOGFONTW, PAINTSTRUCT, TRANSPARENT,
};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetClientRect,
    GetSystemMetrics, PeekMessageW, RegisterClassW, SetForegroundWindow, ShowWindow,
    TranslateMessage, MSG, PM_REMOVE, SM_CXVIRTUALSCREEN, SM_CYVIRTUALSCREEN, SM_XVIRTUALSCREEN,
    SM_YVIRTUALSCREEN, SW_SHOW, WM_ERASEBKGND, WM_PAINT, WNDCLASSW, WS_EX_TOOLWINDOW,
    WS_EX_TOPMOST, WS_POPUP,
};

use super::content::OverlayContent;
use super::surface::{OverlayError, Surface, SurfaceFactory};

fn class_name() -> PCWSTR {
    w!("ScreenshotGuardOverlay")
}

const BACKGROUND: COLORREF = rgb(0x1a, 0x1a, 0x2e);
const TITLE_COLOR: COLORREF = rgb(0xff, 0x6b, 0x6b);
const SUBTITLE_COLOR: COLORREF = rgb(0x4e, 0xcd, 0xc4);
const BODY_COLOR: COLORREF = rgb(0xff, 0xff, 0xff);

const FONT_NORMAL: i32 = 400;
const FONT_BOLD: i32 = 700;

thread_local! {
    static PAINTED: RefCell<Option<OverlayContent>> = const { RefCell::new(None) };
}

const fn rgb(r: u8, g: u8, b: u8) -> COLORREF {
    COLORREF((r as u32) | ((g as u32) << 8) | ((b as u32) << 16))
}

/// Creates overlay windows; registers the window class on first use
#[derive(Debug, Default)]
pub struct PopupSurfaceFactory {
    instance: Option<HINSTANCE>,
}

impl PopupSurfaceFactory {
    fn register_class(&mut self) -> Result<HINSTANCE, OverlayError> {
        if let Some(instance) = self.instance {
            return Ok(instance);
        }
        let instance: HINSTANCE = unsafe { GetModuleHandleW(None) }
            .map_err(|e| OverlayError::SurfaceCreationFailed(e.to_string()))?
            .into();

        let class = WNDCLASSW {
            lpfnWndProc: Some(window_proc),
            hInstance: instance,
            lpszClassName: class_name(),
            ..Default::default()
        };
        if unsafe { RegisterClassW(&class) } == 0 {
            return Err(OverlayError::SurfaceCreationFailed(
                "failed to register overlay window class".to_string(),
            ));
        }

        debug!("overlay window class registered");
        self.instance = Some(instance);
        Ok(instance)
    }
}

impl SurfaceFactory for PopupSurfaceFactory {
    fn create(&mut self, content: &OverlayContent) -> Result<Box<dyn Surface>, OverlayError> {
        let instance = self.register_class()?;
        PAINTED.with(|painted| *painted.borrow_mut() = Some(content.clone()));

        let hwnd = unsafe {
            CreateWindowExW(
                WS_EX_TOPMOST | WS_EX_TOOLWINDOW,
                class_name(),
                w!("Screenshot blocked"),
                WS_POPUP,
                GetSystemMetrics(SM_XVIRTUALSCREEN),
                GetSystemMetrics(SM_YVIRTUALSCREEN),
                GetSystemMetrics(SM_CXVIRTUALSCREEN),
                GetSystemMetrics(SM_CYVIRTUALSCREEN),
                None,
                None,
                instance,
                None,
            )
        }
        .map_err(|e| {
            PAINTED.with(|painted| painted.borrow_mut().take());
            OverlayError::SurfaceCreationFailed(e.to_string())
        })?;

        unsafe {
            let _ = ShowWindow(hwnd, SW_SHOW);
            let _ = SetForegroundWindow(hwnd);
        }
        Ok(Box::new(PopupSurface { hwnd }))
    }
}

struct PopupSurface {
    hwnd: HWND,
}

impl Surface for PopupSurface {
    fn update(&mut self, content: &OverlayContent) -> Result<(), OverlayError> {
        PAINTED.with(|painted| *painted.borrow_mut() = Some(content.clone()));
        if unsafe { InvalidateRect(self.hwnd, None, true) }.as_bool() {
            Ok(())
        } else {
            Err(OverlayError::Surface("failed to repaint overlay".to_string()))
        }
    }

    fn pump(&mut self) {
        let mut msg = MSG::default();
        unsafe {
            while PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE).as_bool() {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
    }

    fn close(self: Box<Self>) -> Result<(), OverlayError> {
        PAINTED.with(|painted| painted.borrow_mut().take());
        unsafe { DestroyWindow(self.hwnd) }.map_err(|e| OverlayError::Surface(e.to_string()))
    }
}

unsafe extern "system" fn window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        WM_PAINT => {
            paint(hwnd);
            LRESULT(0)
        }
        WM_ERASEBKGND => LRESULT(1),
        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}

unsafe fn paint(hwnd: HWND) {
    let mut ps = PAINTSTRUCT::default();
    let hdc = BeginPaint(hwnd, &mut ps);

    let mut client = RECT::default();
    if GetClientRect(hwnd, &mut client).is_ok() {
        let brush = CreateSolidBrush(BACKGROUND);
        FillRect(hdc, &client, brush);
        let _ = DeleteObject(HGDIOBJ(brush.0));

        PAINTED.with(|painted| {
            if let Some(content) = painted.borrow().as_ref() {
                draw_content(hdc, client, content);
            }
        });
    }

    let _ = EndPaint(hwnd, &ps);
}

unsafe fn draw_content(hdc: HDC, client: RECT, content: &OverlayContent) {
    SetBkMode(hdc, TRANSPARENT);
    let height = client.bottom - client.top;
    let band = |top: f64, bottom: f64| RECT {
        left: client.left,
        right: client.right,
        top: client.top + (height as f64 * top) as i32,
        bottom: client.top + (height as f64 * bottom) as i32,
    };

    draw_line(hdc, content.title(), band(0.30, 0.40), 64, FONT_BOLD, TITLE_COLOR);
    draw_line(hdc, content.subtitle(), band(0.40, 0.46), 32, FONT_NORMAL, SUBTITLE_COLOR);
    draw_line(hdc, &content.details(), band(0.50, 0.66), 24, FONT_NORMAL, BODY_COLOR);
    draw_line(hdc, &content.dismiss_hint(), band(0.70, 0.76), 24, FONT_BOLD, TITLE_COLOR);
}

unsafe fn draw_line(hdc: HDC, text: &str, mut rect: RECT, size: i32, weight: i32, color: COLORREF) {
    let mut face = [0u16; 32];
    for (slot, unit) in face.iter_mut().zip("Segoe UI".encode_utf16()) {
        *slot = unit;
    }
    let font = CreateFontIndirectW(&LOGFONTW {
        lfHeight: -size,
        lfWeight: weight,
        lfFaceName: face,
        ..Default::default()
    });
    let previous = SelectObject(hdc, HGDIOBJ(font.0));

    SetTextColor(hdc, color);
    let mut wide: Vec<u16> = text.encode_utf16().collect();
    DrawTextW(hdc, &mut wide, &mut rect, DT_CENTER | DT_WORDBREAK);

    SelectObject(hdc, previous);
    let _ = DeleteObject(HGDIOBJ(font.0));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_packs_bgr() {
        assert_eq!(rgb(0x11, 0x22, 0x33), COLORREF(0x0033_2211));
    }
}
