//! Win32 window discovery and GDI capture.

use image::{ImageBuffer, Rgba, RgbaImage};
use std::ffi::OsString;
use std::mem::size_of;
use std::os::windows::ffi::OsStringExt;
use std::sync::Arc;

use windows::Win32::Foundation::{BOOL, HWND, LPARAM, RECT, TRUE};
use windows::Win32::Graphics::Gdi::{
    BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject, GetDC, GetDIBits,
    ReleaseDC, SelectObject, BITMAPINFO, BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS, HGDIOBJ,
    SRCCOPY,
};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetClientRect, GetWindowTextLengthW, GetWindowTextW, IsIconic, IsWindow,
    IsWindowVisible,
};

use super::window::{
    check_region, single_match, CaptureError, GameWindow, WindowLocator, WindowResolutionError,
};
use crate::automation::config::PixelRect;

/// Finds top-level windows by exact title.
pub struct Win32Locator;

impl WindowLocator for Win32Locator {
    fn locate(&self, title: &str) -> Result<Arc<dyn GameWindow>, WindowResolutionError> {
        struct EnumData<'a> {
            title: &'a str,
            matches: Vec<isize>,
        }

        unsafe extern "system" fn enum_callback(hwnd: HWND, lparam: LPARAM) -> BOOL {
            unsafe {
                let data = &mut *(lparam.0 as *mut EnumData);

                if !IsWindowVisible(hwnd).as_bool() {
                    return TRUE;
                }

                if window_title(hwnd) == data.title {
                    data.matches.push(hwnd.0 as isize);
                }

                TRUE
            }
        }

        crate::log(&format!("Searching for window \"{}\"...", title));
        let mut data = EnumData {
            title,
            matches: Vec::new(),
        };
        unsafe {
            let _ = EnumWindows(Some(enum_callback), LPARAM(&mut data as *mut _ as isize));
        }

        let handle = single_match(title, data.matches)?;
        crate::log(&format!("Found window \"{}\" ({:#x})", title, handle));
        Ok(Arc::new(Win32Window {
            handle,
            title: title.to_string(),
        }))
    }
}

fn window_title(hwnd: HWND) -> String {
    unsafe {
        let len = GetWindowTextLengthW(hwnd);
        if len <= 0 {
            return String::new();
        }
        let mut buf: Vec<u16> = vec![0; (len + 1) as usize];
        let copied = GetWindowTextW(hwnd, &mut buf).max(0) as usize;
        OsString::from_wide(&buf[..copied])
            .to_string_lossy()
            .to_string()
    }
}

/// A window handle stored as an integer so the window can cross threads.
pub struct Win32Window {
    handle: isize,
    title: String,
}

impl Win32Window {
    fn hwnd(&self) -> HWND {
        HWND(self.handle as *mut _)
    }

    /// Copies `region` of the client area with BitBlt and converts BGRA to RGBA.
    fn blit(&self, region: PixelRect) -> Result<RgbaImage, CaptureError> {
        let hwnd = self.hwnd();
        let (width, height) = (region.width as i32, region.height as i32);

        unsafe {
            let window_dc = GetDC(hwnd);
            if window_dc.is_invalid() {
                return Err(CaptureError::BlitFailed("GetDC failed".to_string()));
            }
            let memory_dc = CreateCompatibleDC(window_dc);
            let bitmap = CreateCompatibleBitmap(window_dc, width, height);
            let previous = SelectObject(memory_dc, HGDIOBJ(bitmap.0));

            let copied = BitBlt(
                memory_dc,
                0,
                0,
                width,
                height,
                window_dc,
                region.x as i32,
                region.y as i32,
                SRCCOPY,
            );

            let mut info = BITMAPINFO {
                bmiHeader: BITMAPINFOHEADER {
                    biSize: size_of::<BITMAPINFOHEADER>() as u32,
                    biWidth: width,
                    // Negative height gives top-down rows
                    biHeight: -height,
                    biPlanes: 1,
                    biBitCount: 32,
                    biCompression: BI_RGB.0,
                    ..Default::default()
                },
                ..Default::default()
            };
            let mut pixels = vec![0u8; (region.width * region.height * 4) as usize];
            let lines = if copied.is_ok() {
                GetDIBits(
                    memory_dc,
                    bitmap,
                    0,
                    region.height,
                    Some(pixels.as_mut_ptr().cast()),
                    &mut info,
                    DIB_RGB_COLORS,
                )
            } else {
                0
            };

            SelectObject(memory_dc, previous);
            let _ = DeleteObject(HGDIOBJ(bitmap.0));
            let _ = DeleteDC(memory_dc);
            ReleaseDC(hwnd, window_dc);

            if let Err(e) = copied {
                return Err(CaptureError::BlitFailed(e.to_string()));
            }
            if lines != height {
                return Err(CaptureError::BlitFailed(format!(
                    "GetDIBits returned {} of {} rows",
                    lines, height
                )));
            }

            for px in pixels.chunks_exact_mut(4) {
                px.swap(0, 2);
                // GDI leaves alpha undefined
                px[3] = 255;
            }

            ImageBuffer::<Rgba<u8>, _>::from_raw(region.width, region.height, pixels).ok_or_else(
                || CaptureError::BlitFailed("pixel buffer size mismatch".to_string()),
            )
        }
    }
}

impl GameWindow for Win32Window {
    fn title(&self) -> &str {
        &self.title
    }

    fn is_minimized(&self) -> bool {
        unsafe { IsIconic(self.hwnd()).as_bool() }
    }

    fn is_open(&self) -> bool {
        unsafe { IsWindow(self.hwnd()).as_bool() }
    }

    fn client_size(&self) -> Option<(u32, u32)> {
        let mut rect = RECT::default();
        unsafe { GetClientRect(self.hwnd(), &mut rect).ok()? };
        let width = u32::try_from(rect.right - rect.left).ok()?;
        let height = u32::try_from(rect.bottom - rect.top).ok()?;
        Some((width, height))
    }

    fn capture(&self, region: Option<PixelRect>) -> Result<RgbaImage, CaptureError> {
        if self.is_minimized() {
            return Err(CaptureError::WindowMinimized);
        }
        let (width, height) = self
            .client_size()
            .ok_or_else(|| CaptureError::BlitFailed("GetClientRect failed".to_string()))?;

        let region = match region {
            Some(r) => {
                check_region(r, width, height)?;
                r
            }
            None => PixelRect::new(0, 0, width, height),
        };
        if region.width == 0 || region.height == 0 {
            return Err(CaptureError::BlitFailed(format!(
                "client area is {}x{}",
                width, height
            )));
        }

        let frame = self.blit(region)?;
        crate::log(&format!(
            "Captured {}x{} from \"{}\"",
            frame.width(),
            frame.height(),
            self.title
        ));
        Ok(frame)
    }
}
