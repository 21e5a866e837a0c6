//! Terminal menu rendering and key input with crossterm.

use crossterm::cursor::{MoveTo, MoveToNextLine};
use crossterm::event::{self, Event};
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::{queue, QueueableCommand};
use std::io::{self, Write};
use std::sync::Mutex;
use std::time::Duration;

use super::dispatcher::{DispatchState, DispatchView, MenuItem};
use super::keys::KeyChord;

const HEADER_COLOR: Color = Color::DarkGreen;
const MUTED_COLOR: Color = Color::DarkGrey;

const PROMPT_INPUT: &str = "Input: ";
const PROMPT_BUSY: &str = "Processing...";

/// Builds the body of the menu: one line per binding with the chords
/// right-aligned, then the last output if there is one.
pub fn menu_lines(menu: &[MenuItem], state: &DispatchState) -> Vec<String> {
    let chords: Vec<String> = menu.iter().map(|m| m.chord.to_string()).collect();
    let width = chords.iter().map(|c| c.chars().count()).max().unwrap_or(0);

    let mut lines: Vec<String> = menu
        .iter()
        .zip(&chords)
        .map(|(item, chord)| format!("[{:>width$}] {}", chord, item.label, width = width))
        .collect();

    if let Some(output) = &state.last_output {
        lines.push(String::new());
        lines.push("Last command output:".to_string());
        lines.push(String::new());
        lines.extend(output.lines().map(str::to_string));
    }
    lines
}

/// Receives the one-line status shown under the header.
pub trait StatusLine: Send + Sync {
    fn set_status(&self, status: &str);
}

/// Full-screen console menu with a header and a changeable status line.
pub struct ConsoleView {
    header: String,
    status: Mutex<String>,
}

impl ConsoleView {
    pub fn new(header: &str, status: &str) -> Self {
        Self {
            header: header.to_string(),
            status: Mutex::new(status.to_string()),
        }
    }

    pub fn status(&self) -> String {
        self.status.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn try_draw(&self, menu: &[MenuItem], state: &DispatchState) -> io::Result<()> {
        let mut out = io::stdout().lock();
        queue!(
            out,
            Clear(ClearType::All),
            MoveTo(0, 0),
            SetForegroundColor(HEADER_COLOR),
            Print(&self.header),
            ResetColor,
            MoveToNextLine(1),
            SetForegroundColor(MUTED_COLOR),
            Print(self.status()),
            ResetColor,
            MoveToNextLine(2),
            SetForegroundColor(MUTED_COLOR),
        )?;
        for line in menu_lines(menu, state) {
            queue!(out, Print(line), MoveToNextLine(1))?;
        }
        out.queue(ResetColor)?;
        write_prompt(&mut out, PROMPT_INPUT)?;
        out.flush()
    }
}

/// Writes `text` over the last terminal row.
fn write_prompt(out: &mut impl Write, text: &str) -> io::Result<()> {
    let (_, rows) = terminal::size()?;
    queue!(
        out,
        MoveTo(0, rows.saturating_sub(1)),
        Clear(ClearType::CurrentLine),
        Print(text),
    )?;
    out.flush()
}

impl StatusLine for ConsoleView {
    /// Takes effect on the next draw.
    fn set_status(&self, status: &str) {
        let mut current = self.status.lock().unwrap_or_else(|e| e.into_inner());
        *current = status.to_string();
    }
}

impl DispatchView for ConsoleView {
    fn draw(&self, menu: &[MenuItem], state: &DispatchState) {
        if let Err(e) = self.try_draw(menu, state) {
            crate::log(&format!("Failed to draw menu: {}", e));
        }
    }

    fn before_action(&self) {
        let _ = write_prompt(&mut io::stdout().lock(), PROMPT_BUSY);
    }

    fn after_action(&self) {
        let _ = write_prompt(&mut io::stdout().lock(), PROMPT_INPUT);
    }
}

/// Waits up to `timeout` for a key press that maps to a chord.
pub fn next_chord(timeout: Duration) -> io::Result<Option<KeyChord>> {
    if !event::poll(timeout)? {
        return Ok(None);
    }
    match event::read()? {
        Event::Key(key) => Ok(KeyChord::from_key_event(&key)),
        _ => Ok(None),
    }
}

/// Puts the terminal in raw mode on an alternate screen until dropped.
pub struct TerminalGuard;

impl TerminalGuard {
    pub fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        io::stdout().queue(terminal::EnterAlternateScreen)?.flush()?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = io::stdout()
            .queue(terminal::LeaveAlternateScreen)
            .and_then(|out| out.flush());
        let _ = terminal::disable_raw_mode();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(chord: KeyChord, label: &str) -> MenuItem {
        MenuItem {
            chord,
            label: label.to_string(),
        }
    }

    #[test]
    fn test_menu_lines_right_align_chords() {
        let menu = vec![
            item(KeyChord::plain('g'), "Relocate game window"),
            item(KeyChord::ctrl('a'), "Debug current frame"),
        ];
        let lines = menu_lines(&menu, &DispatchState::default());
        assert_eq!(
            lines,
            vec![
                "[     G] Relocate game window",
                "[Ctrl+A] Debug current frame",
            ]
        );
    }

    #[test]
    fn test_menu_lines_include_last_output() {
        let menu = vec![item(KeyChord::plain('a'), "Analyze current frame")];
        let state = DispatchState {
            last_input: Some(KeyChord::plain('a')),
            last_output: Some("Opponent 1: No Pokemon\nAlly 1: No Pokemon".to_string()),
        };
        let lines = menu_lines(&menu, &state);
        assert_eq!(
            &lines[1..],
            &[
                "",
                "Last command output:",
                "",
                "Opponent 1: No Pokemon",
                "Ally 1: No Pokemon",
            ]
        );
    }

    #[test]
    fn test_set_status() {
        let view = ConsoleView::new("Pokemon Uranium Companion", "Not watching any window");
        view.set_status("Watching 'Pokemon Uranium'");
        assert_eq!(view.status(), "Watching 'Pokemon Uranium'");
    }
}
