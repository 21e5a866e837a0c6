//! The companion's actions: watching the game window, analyzing frames and
//! the key bindings that expose them.

use chrono::Local;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use super::config::CompanionConfig;
use super::poller::PollingScheduler;
use super::report::summarize;
use crate::capture::{GameWindow, WindowEvent, WindowLocator, WindowWatcher};
use crate::console::{Dispatcher, KeyChord, StatusLine};
use crate::dex::Catalog;
use crate::ocr::RegionInspector;

pub const NOT_WATCHING: &str = "Not watching any window";

struct Watched {
    window: Arc<dyn GameWindow>,
    generation: u64,
    _watcher: WindowWatcher,
}

#[derive(Default)]
struct WindowSlot {
    last_generation: u64,
    current: Option<Watched>,
}

pub struct Companion {
    locator: Box<dyn WindowLocator>,
    catalog: Arc<Catalog>,
    inspector: RegionInspector,
    status: Arc<dyn StatusLine>,
    events: Sender<WindowEvent>,
    window_title: String,
    check_interval: Duration,
    debug_dir: PathBuf,
    slot: Mutex<WindowSlot>,
}

impl Companion {
    pub fn new(
        config: &CompanionConfig,
        locator: Box<dyn WindowLocator>,
        catalog: Arc<Catalog>,
        inspector: RegionInspector,
        status: Arc<dyn StatusLine>,
        events: Sender<WindowEvent>,
    ) -> Self {
        Self {
            locator,
            catalog,
            inspector,
            status,
            events,
            window_title: config.window_title.clone(),
            check_interval: Duration::from_millis(config.window_check_interval_ms),
            debug_dir: crate::paths::get_debug_dir(),
            slot: Mutex::new(WindowSlot::default()),
        }
    }

    /// Where region previews from a debug analysis are written.
    #[cfg(test)]
    pub fn debug_dir(mut self, dir: PathBuf) -> Self {
        self.debug_dir = dir;
        self
    }

    fn lock_slot(&self) -> std::sync::MutexGuard<'_, WindowSlot> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn current_window(&self) -> Option<Arc<dyn GameWindow>> {
        self.lock_slot()
            .current
            .as_ref()
            .map(|w| Arc::clone(&w.window))
    }

    #[cfg(test)]
    pub fn is_watching(&self) -> bool {
        self.lock_slot().current.is_some()
    }

    /// Finds the game window again and starts watching it for closure.
    pub fn relocate(&self) -> String {
        let window = match self.locator.locate(&self.window_title) {
            Ok(window) => window,
            Err(e) => {
                crate::log(&format!("Failed to locate game window: {}", e));
                return format!(
                    "Unable to locate exactly one window named '{}' ({})",
                    self.window_title, e
                );
            }
        };

        let title = window.title().to_string();
        let previous = {
            let mut slot = self.lock_slot();
            slot.last_generation += 1;
            let generation = slot.last_generation;
            let watcher = WindowWatcher::spawn(
                Arc::clone(&window),
                generation,
                self.check_interval,
                self.events.clone(),
            );
            slot.current.replace(Watched {
                window,
                generation,
                _watcher: watcher,
            })
        };
        // Joins the old watcher outside the lock
        drop(previous);

        self.status.set_status(&format!("Watching '{}'", title));
        format!("Now watching '{}'", title)
    }

    /// Forgets the window if the event is about the one currently watched.
    /// Returns true if the window was dropped.
    pub fn handle_event(&self, event: WindowEvent) -> bool {
        let WindowEvent::Closed { generation } = event;
        let closed = {
            let mut slot = self.lock_slot();
            match &slot.current {
                Some(w) if w.generation == generation => slot.current.take(),
                _ => None,
            }
        };

        match closed {
            Some(_) => {
                self.status.set_status(NOT_WATCHING);
                true
            }
            None => false,
        }
    }

    /// Captures the watched window, reads the name plates and describes
    /// each Pokemon found.
    pub fn analyze(&self, debug: bool) -> String {
        let Some(window) = self.current_window() else {
            return NOT_WATCHING.to_string();
        };
        if window.is_minimized() {
            return "Window is minimized".to_string();
        }

        let frame = match window.capture(None) {
            Ok(frame) => frame,
            Err(e) => {
                crate::log(&format!("Capture failed: {}", e));
                return format!("Failed to inspect game window: {}", e);
            }
        };

        let mut notes = String::new();
        if debug {
            notes = match self.save_region_preview(&frame) {
                Ok(path) => format!("Region preview saved to {}\n\n", path.display()),
                Err(e) => {
                    crate::log(&format!("Failed to save region preview: {}", e));
                    format!("Failed to save region preview: {}\n\n", e)
                }
            };
        }

        match self.inspector.inspect(frame) {
            Ok(result) => notes + &summarize(&self.catalog, &result),
            Err(e) => {
                crate::log(&format!("Inspection failed: {}", e));
                format!("{}Failed to inspect game window: {}", notes, e)
            }
        }
    }

    fn save_region_preview(&self, frame: &image::RgbaImage) -> anyhow::Result<PathBuf> {
        let preview = self.inspector.render_regions(frame)?;
        std::fs::create_dir_all(&self.debug_dir)?;
        let timestamp = Local::now().format("%Y%m%d_%H%M%S%3f");
        let path = self.debug_dir.join(format!("regions_{}.png", timestamp));
        preview.save(&path)?;
        crate::log(&format!("Saved region preview to {}", path.display()));
        Ok(path)
    }
}

pub const KEY_RELOCATE: char = 'G';
pub const KEY_ANALYZE: char = 'A';
pub const KEY_TOGGLE_AUTO: char = 'S';
pub const KEY_EXIT: char = 'Q';

/// Binds the companion's actions in menu order.
///
/// The poller holds only a weak reference to the dispatcher, so dropping the
/// dispatcher ends automatic updates.
pub fn register_bindings(
    dispatcher: &Arc<Dispatcher>,
    companion: Arc<Companion>,
    scheduler: Arc<PollingScheduler>,
    poll_interval: Duration,
    exit_requested: Arc<AtomicBool>,
) {
    let c = Arc::clone(&companion);
    dispatcher.register(KeyChord::plain(KEY_RELOCATE), "Relocate game window", move || {
        Some(c.relocate())
    });

    let c = Arc::clone(&companion);
    dispatcher.register(KeyChord::plain(KEY_ANALYZE), "Analyze current frame", move || {
        Some(c.analyze(false))
    });

    let c = Arc::clone(&companion);
    dispatcher.register(KeyChord::ctrl(KEY_ANALYZE), "Debug current frame", move || {
        Some(c.analyze(true))
    });

    let weak: Weak<Dispatcher> = Arc::downgrade(dispatcher);
    let s = Arc::clone(&scheduler);
    dispatcher.register(KeyChord::plain(KEY_TOGGLE_AUTO), "Toggle automatic updates", move || {
        let weak = weak.clone();
        let running = s.toggle(poll_interval, move || {
            if let Some(dispatcher) = weak.upgrade() {
                dispatcher.trigger(KeyChord::plain(KEY_ANALYZE), true, true);
            }
        });
        Some(if running {
            "Automatic updates started".to_string()
        } else {
            "Automatic updates stopped".to_string()
        })
    });

    let s = Arc::clone(&scheduler);
    dispatcher.register(KeyChord::ctrl(KEY_TOGGLE_AUTO), "Stop automatic updates", move || {
        s.stop();
        Some("Automatic updates stopped".to_string())
    });

    dispatcher.register(KeyChord::plain(KEY_EXIT), "Exit", move || {
        exit_requested.store(true, Ordering::SeqCst);
        None
    });
}
