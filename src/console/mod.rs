//! Interactive console: key chords, the action dispatcher and the
//! crossterm menu.

pub mod dispatcher;
pub mod keys;
pub mod render;

pub use dispatcher::Dispatcher;
pub use keys::KeyChord;
pub use render::{next_chord, ConsoleView, StatusLine, TerminalGuard};
