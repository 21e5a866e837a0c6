//! Game window discovery and capture.
//!
//! This module provides:
//! - Window lookup by exact title (`WindowLocator`)
//! - Client-area capture (`GameWindow::capture`)
//! - Close notification (`WindowWatcher`)

#[cfg(windows)]
pub mod win32;
pub mod window;

pub use window::{platform_locator, GameWindow, WindowEvent, WindowLocator, WindowWatcher};
