//! Platform-neutral view of the game window, plus the close watcher.

use image::RgbaImage;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

use crate::automation::config::PixelRect;
use crate::automation::poller::CancelToken;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CaptureError {
    #[error("window is minimized")]
    WindowMinimized,
    #[error("region {region:?} is outside the {width}x{height} client area")]
    RegionOutOfBounds {
        region: PixelRect,
        width: u32,
        height: u32,
    },
    #[error("failed to copy window pixels: {0}")]
    BlitFailed(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum WindowResolutionError {
    #[error("no window titled \"{0}\"")]
    NoMatch(String),
    #[error("{count} windows titled \"{title}\"")]
    MultipleMatches { title: String, count: usize },
}

/// A located top-level window that can be captured.
pub trait GameWindow: Send + Sync {
    fn title(&self) -> &str;
    fn is_minimized(&self) -> bool;
    /// False once the window has been destroyed.
    fn is_open(&self) -> bool;
    /// Client area size, `None` if it cannot be queried.
    fn client_size(&self) -> Option<(u32, u32)>;
    /// Captures the client area, or only `region` of it.
    fn capture(&self, region: Option<PixelRect>) -> Result<RgbaImage, CaptureError>;
}

pub trait WindowLocator: Send + Sync {
    fn locate(&self, title: &str) -> Result<Arc<dyn GameWindow>, WindowResolutionError>;
}

/// Reduces all windows with a matching title to exactly one.
pub fn single_match<T>(title: &str, mut matches: Vec<T>) -> Result<T, WindowResolutionError> {
    match matches.len() {
        0 => Err(WindowResolutionError::NoMatch(title.to_string())),
        1 => Ok(matches.remove(0)),
        count => Err(WindowResolutionError::MultipleMatches {
            title: title.to_string(),
            count,
        }),
    }
}

/// Checks a requested capture region against the client area.
pub fn check_region(region: PixelRect, width: u32, height: u32) -> Result<(), CaptureError> {
    if region.fits_within(width, height) {
        Ok(())
    } else {
        Err(CaptureError::RegionOutOfBounds {
            region,
            width,
            height,
        })
    }
}

/// Locator for platforms without a capture backend. Never finds a window.
pub struct NoWindowLocator;

impl WindowLocator for NoWindowLocator {
    fn locate(&self, title: &str) -> Result<Arc<dyn GameWindow>, WindowResolutionError> {
        Err(WindowResolutionError::NoMatch(title.to_string()))
    }
}

#[cfg(windows)]
pub fn platform_locator() -> Box<dyn WindowLocator> {
    Box::new(super::win32::Win32Locator)
}

#[cfg(not(windows))]
pub fn platform_locator() -> Box<dyn WindowLocator> {
    crate::log("Window capture is only supported on Windows");
    Box::new(NoWindowLocator)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    /// The window watched under `generation` was closed.
    Closed { generation: u64 },
}

/// Polls a window on a background thread and reports when it closes.
pub struct WindowWatcher {
    cancel: CancelToken,
    handle: Option<JoinHandle<()>>,
}

impl WindowWatcher {
    pub fn spawn(
        window: Arc<dyn GameWindow>,
        generation: u64,
        interval: Duration,
        events: Sender<WindowEvent>,
    ) -> Self {
        let cancel = CancelToken::new();
        let token = cancel.clone();
        let handle = thread::spawn(move || {
            while !token.sleep_or_cancel(interval) {
                if !window.is_open() {
                    crate::log(&format!("Window \"{}\" was closed", window.title()));
                    let _ = events.send(WindowEvent::Closed { generation });
                    break;
                }
            }
        });

        Self {
            cancel,
            handle: Some(handle),
        }
    }

    pub fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for WindowWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}


#[cfg(test)]
mod tests {
    use super::fake::FakeWindow;
    use super::*;
    use std::sync::atomic::Ordering;
    use std::sync::mpsc;

    #[test]
    fn test_single_match() {
        assert_eq!(single_match("Uranium", vec![7]), Ok(7));
        assert_eq!(
            single_match::<u8>("Uranium", vec![]),
            Err(WindowResolutionError::NoMatch("Uranium".to_string()))
        );
        assert_eq!(
            single_match("Uranium", vec![1, 2]),
            Err(WindowResolutionError::MultipleMatches {
                title: "Uranium".to_string(),
                count: 2
            })
        );
    }

    #[test]
    fn test_check_region() {
        assert!(check_region(PixelRect::new(0, 0, 10, 10), 10, 10).is_ok());
        assert!(matches!(
            check_region(PixelRect::new(5, 5, 10, 10), 10, 10),
            Err(CaptureError::RegionOutOfBounds { width: 10, height: 10, .. })
        ));
    }

    #[test]
    fn test_no_window_locator() {
        assert!(matches!(
            NoWindowLocator.locate("Pokemon Uranium"),
            Err(WindowResolutionError::NoMatch(_))
        ));
    }

    #[test]
    fn test_watcher_reports_close_with_generation() {
        let window = Arc::new(FakeWindow::new(4, 4));
        let (tx, rx) = mpsc::channel();
        let _watcher = WindowWatcher::spawn(window.clone(), 3, Duration::from_millis(10), tx);

        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
        window.open.store(false, Ordering::SeqCst);
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(2)),
            Ok(WindowEvent::Closed { generation: 3 })
        );
    }

    #[test]
    fn test_stopped_watcher_stays_silent() {
        let window = Arc::new(FakeWindow::new(4, 4));
        let (tx, rx) = mpsc::channel();
        let mut watcher = WindowWatcher::spawn(window.clone(), 1, Duration::from_millis(10), tx);

        watcher.stop();
        window.open.store(false, Ordering::SeqCst);
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }
}
