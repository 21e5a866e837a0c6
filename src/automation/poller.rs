//! Background timer that repeatedly fires a trigger.
//!
//! At most one poll loop is active per scheduler. Cancellation is
//! cooperative: a loop notices it at its next sleep boundary, and a trigger
//! that is already running is allowed to finish.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Longest uninterrupted sleep, bounds how long cancellation takes to be seen.
const SLEEP_SLICE: Duration = Duration::from_millis(25);

/// Shared cancellation flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Sleeps for `duration` in short slices. Returns true if cancelled.
    pub fn sleep_or_cancel(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_cancelled() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            thread::sleep((deadline - now).min(SLEEP_SLICE));
        }
    }

    fn same_as(&self, other: &CancelToken) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

type Slot = Arc<Mutex<Option<CancelToken>>>;

/// Runs when a poll thread exits, even on panic. Empties the slot if this
/// loop was still the current one, then decrements the live loop count.
struct LiveGuard {
    live: Arc<AtomicUsize>,
    token: CancelToken,
    slot: Slot,
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        {
            let mut current = self.slot.lock().unwrap_or_else(|e| e.into_inner());
            if current.as_ref().is_some_and(|t| t.same_as(&self.token)) {
                *current = None;
                crate::log("Automatic updates ended unexpectedly");
            }
        }
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Single-slot background repeater.
#[derive(Default)]
pub struct PollingScheduler {
    current: Slot,
    live: Arc<AtomicUsize>,
}

impl PollingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels any running loop and starts a new one that sleeps `interval`
    /// then calls `trigger`, until stopped.
    pub fn start<F>(&self, interval: Duration, trigger: F)
    where
        F: Fn() + Send + 'static,
    {
        let token = CancelToken::new();
        {
            let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(previous) = current.replace(token.clone()) {
                previous.cancel();
            }
        }

        self.live.fetch_add(1, Ordering::SeqCst);
        let guard = LiveGuard {
            live: Arc::clone(&self.live),
            token: token.clone(),
            slot: Arc::clone(&self.current),
        };

        crate::log(&format!(
            "Automatic updates started ({} ms interval)",
            interval.as_millis()
        ));

        thread::spawn(move || {
            let _guard = guard;
            while !token.sleep_or_cancel(interval) {
                trigger();
            }
        });
    }

    /// Requests cancellation of the running loop. Does nothing if stopped.
    ///
    /// Never waits for the loop to exit, so it is safe to call from inside
    /// the trigger itself.
    pub fn stop(&self) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(token) = current.take() {
            token.cancel();
            crate::log("Automatic updates stopped");
        }
    }

    /// Starts if stopped, stops if running. Returns whether it is now running.
    pub fn toggle<F>(&self, interval: Duration, trigger: F) -> bool
    where
        F: Fn() + Send + 'static,
    {
        if self.is_running() {
            self.stop();
            false
        } else {
            self.start(interval, trigger);
            true
        }
    }

    pub fn is_running(&self) -> bool {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Number of poll threads that have not exited yet. A cancelled loop
    /// counts until it reaches its next sleep boundary.
    #[cfg(test)]
    pub fn active_pollers(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl Drop for PollingScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
