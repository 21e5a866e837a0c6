//! Pokemon Uranium Companion
//!
//! A console companion for Pokemon Uranium. It reads the Pokemon names off
//! the battle screen with Tesseract, resolves them against the Pokedex and
//! shows each one's type effectiveness.

mod automation;
mod capture;
mod console;
mod dex;
mod ocr;
mod paths;

use anyhow::Result;
use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::time::Duration;

use automation::{register_bindings, Companion, PollingScheduler, NOT_WATCHING};
use capture::{platform_locator, WindowEvent};
use console::{next_chord, ConsoleView, Dispatcher, TerminalGuard};
use dex::{Catalog, TypeChart};
use ocr::{RegionInspector, TesseractRecognizer, TextRecognizer, UnavailableRecognizer};

const LOG_FILE: &str = "uranium_companion.log";
const HEADER: &str = "Pokemon Uranium Companion";

/// How long the menu waits for a key before checking window events.
const INPUT_POLL: Duration = Duration::from_millis(100);

/// Set while the menu owns the terminal; log lines then go to the file only.
static MENU_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Logs a message to the log file with timestamp, and to stderr until the
/// menu starts.
pub fn log(msg: &str) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}] {}\n", timestamp, msg);
    if !MENU_ACTIVE.load(Ordering::SeqCst) {
        eprint!("{}", line);
    }
    let log_path = paths::get_logs_dir().join(LOG_FILE);
    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        let _ = file.write_all(line.as_bytes());
    }
}

/// Formats a fatal error with suggestions for fixing it.
fn exit_message(issue: &str, help: &[String]) -> String {
    let mut message = format!("{}\n\nHelp:", issue);
    for option in help {
        message.push_str("\n  - ");
        message.push_str(option);
    }
    message
}

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = panic_info
            .location()
            .map(|loc| format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_default();
        let log_msg = format!("[PANIC]{} {}\n", location, msg);
        if !MENU_ACTIVE.load(Ordering::SeqCst) {
            eprint!("{}", log_msg);
        }
        let log_path = paths::get_logs_dir().join(LOG_FILE);
        if let Ok(mut file) = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
        {
            let _ = file.write_all(log_msg.as_bytes());
        }
    }));
}

fn main() -> ExitCode {
    install_panic_hook();

    match run() {
        Ok(code) => code,
        Err(e) => {
            MENU_ACTIVE.store(false, Ordering::SeqCst);
            log(&format!("Fatal error: {:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    paths::ensure_directories()?;
    log("Starting Pokemon Uranium Companion");

    automation::init_config();
    let config = automation::get_config();

    let catalog_path = config.resolved_catalog_path();
    let catalog = match Catalog::load(&catalog_path, &TypeChart::uranium()) {
        Ok(catalog) => Arc::new(catalog),
        Err(e) => {
            log(&format!("Failed to load Pokedex: {}", e));
            let help = [
                format!(
                    "Is the Pokedex data located at {}?",
                    catalog_path.display()
                ),
                "Is the data formatted correctly? You can re-scrape it if you're not sure."
                    .to_string(),
            ];
            println!(
                "{}",
                exit_message(&format!("Failed to load Uranium Pokedex: {}", e), &help)
            );
            return Ok(ExitCode::FAILURE);
        }
    };

    let recognizer: Arc<dyn TextRecognizer> = match ocr::ensure_tesseract(&config.ocr_language) {
        Ok(tesseract) => Arc::new(TesseractRecognizer::new(tesseract, &config.ocr_language)),
        Err(e) => {
            log(&format!("Warning: Failed to setup Tesseract: {}", e));
            log("Frame analysis will not work until Tesseract is installed.");
            Arc::new(UnavailableRecognizer::new(e.to_string()))
        }
    };

    let inspector = config.regions.iter().fold(
        RegionInspector::new(recognizer).ink_range(config.ink_range),
        |inspector, region| inspector.region(&region.name, region.rect),
    );

    let view = Arc::new(ConsoleView::new(HEADER, NOT_WATCHING));
    let (events_tx, events_rx) = mpsc::channel();
    let companion = Arc::new(Companion::new(
        config,
        platform_locator(),
        catalog,
        inspector,
        view.clone(),
        events_tx,
    ));

    let dispatcher = Arc::new(Dispatcher::new(view));
    let scheduler = Arc::new(PollingScheduler::new());
    let exit_requested = Arc::new(AtomicBool::new(false));
    register_bindings(
        &dispatcher,
        Arc::clone(&companion),
        Arc::clone(&scheduler),
        Duration::from_millis(config.poll_interval_ms),
        Arc::clone(&exit_requested),
    );

    // Try to attach to the game right away
    log(&companion.relocate());

    let result = run_menu(&dispatcher, &companion, &events_rx, &exit_requested);
    scheduler.stop();
    MENU_ACTIVE.store(false, Ordering::SeqCst);
    result?;

    log("Exiting");
    Ok(ExitCode::SUCCESS)
}

/// Foreground loop: draw, wait for a key, dispatch it. Window events are
/// drained between key waits.
fn run_menu(
    dispatcher: &Dispatcher,
    companion: &Companion,
    events: &Receiver<WindowEvent>,
    exit_requested: &AtomicBool,
) -> Result<()> {
    let _terminal = TerminalGuard::enter()?;
    MENU_ACTIVE.store(true, Ordering::SeqCst);
    dispatcher.render();

    while !exit_requested.load(Ordering::SeqCst) {
        let mut window_changed = false;
        while let Ok(event) = events.try_recv() {
            window_changed |= companion.handle_event(event);
        }
        if window_changed {
            dispatcher.render();
        }

        if let Some(chord) = next_chord(INPUT_POLL)? {
            if !dispatcher.trigger(chord, false, true) {
                dispatcher.render();
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_message() {
        let help = vec!["Is the file there?".to_string(), "Re-scrape it.".to_string()];
        assert_eq!(
            exit_message("Failed to load Uranium Pokedex.", &help),
            "Failed to load Uranium Pokedex.\n\nHelp:\n  - Is the file there?\n  - Re-scrape it."
        );
    }
}
