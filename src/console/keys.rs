//! Key chords: a key plus an optional modifier set.

use bitflags::bitflags;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::fmt;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        const CONTROL = 0b001;
        const SHIFT = 0b010;
        const ALT = 0b100;
    }
}

/// An immutable (key, modifiers) pair used as a binding key.
///
/// Keys are stored upper-case and an empty modifier set is stored as `None`,
/// so `A` and `a` with no modifiers are the same chord.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyChord {
    key: char,
    modifiers: Option<Modifiers>,
}

impl KeyChord {
    pub fn new(key: char, modifiers: Option<Modifiers>) -> Self {
        Self {
            key: key.to_ascii_uppercase(),
            modifiers: modifiers.filter(|m| !m.is_empty()),
        }
    }

    pub fn plain(key: char) -> Self {
        Self::new(key, None)
    }

    pub fn ctrl(key: char) -> Self {
        Self::new(key, Some(Modifiers::CONTROL))
    }

    /// Converts a terminal key press. Releases, repeats and non-character
    /// keys yield `None`.
    pub fn from_key_event(event: &KeyEvent) -> Option<Self> {
        if event.kind != KeyEventKind::Press {
            return None;
        }
        let KeyCode::Char(c) = event.code else {
            return None;
        };

        let mut modifiers = Modifiers::empty();
        if event.modifiers.contains(KeyModifiers::CONTROL) {
            modifiers |= Modifiers::CONTROL;
        }
        if event.modifiers.contains(KeyModifiers::ALT) {
            modifiers |= Modifiers::ALT;
        }
        if event.modifiers.contains(KeyModifiers::SHIFT) {
            modifiers |= Modifiers::SHIFT;
        }
        Some(Self::new(c, Some(modifiers)))
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(m) = self.modifiers {
            if m.contains(Modifiers::CONTROL) {
                write!(f, "Ctrl+")?;
            }
            if m.contains(Modifiers::SHIFT) {
                write!(f, "Shift+")?;
            }
            if m.contains(Modifiers::ALT) {
                write!(f, "Alt+")?;
            }
        }
        write!(f, "{}", self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_structural_equality() {
        assert_eq!(KeyChord::plain('a'), KeyChord::plain('A'));
        assert_eq!(
            KeyChord::new('a', Some(Modifiers::empty())),
            KeyChord::plain('a')
        );
        assert_ne!(KeyChord::plain('a'), KeyChord::ctrl('a'));

        let set: HashSet<_> = [KeyChord::plain('s'), KeyChord::plain('S'), KeyChord::ctrl('s')]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_display() {
        assert_eq!(KeyChord::plain('g').to_string(), "G");
        assert_eq!(KeyChord::ctrl('s').to_string(), "Ctrl+S");
        let all = Modifiers::CONTROL | Modifiers::SHIFT | Modifiers::ALT;
        assert_eq!(KeyChord::new('q', Some(all)).to_string(), "Ctrl+Shift+Alt+Q");
    }

    #[test]
    fn test_from_key_event() {
        let ctrl_a = KeyEvent::new(KeyCode::Char('a'), KeyModifiers::CONTROL);
        assert_eq!(KeyChord::from_key_event(&ctrl_a), Some(KeyChord::ctrl('a')));

        let shift_a = KeyEvent::new(KeyCode::Char('A'), KeyModifiers::SHIFT);
        assert_eq!(
            KeyChord::from_key_event(&shift_a),
            Some(KeyChord::new('a', Some(Modifiers::SHIFT)))
        );
        assert_ne!(KeyChord::from_key_event(&shift_a), Some(KeyChord::plain('a')));

        let ctrl_shift_s = KeyEvent::new(
            KeyCode::Char('S'),
            KeyModifiers::CONTROL | KeyModifiers::SHIFT,
        );
        assert_eq!(
            KeyChord::from_key_event(&ctrl_shift_s),
            Some(KeyChord::new('s', Some(Modifiers::CONTROL | Modifiers::SHIFT)))
        );

        let enter = KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(KeyChord::from_key_event(&enter), None);
    }
}
