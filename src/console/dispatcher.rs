//! Key binding registry and serialized action dispatch.
//!
//! Interactive key presses and programmatic triggers from the poller both go
//! through [`Dispatcher::trigger`], which runs at most one action at a time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::keys::KeyChord;

/// A bound action. Its return value becomes the last command output.
pub type Action = Arc<dyn Fn() -> Option<String> + Send + Sync>;

/// One menu line.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuItem {
    pub chord: KeyChord,
    pub label: String,
}

/// What the menu shows besides the bindings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchState {
    pub last_input: Option<KeyChord>,
    pub last_output: Option<String>,
}

/// Renders the menu and reacts around each action.
pub trait DispatchView: Send + Sync {
    fn draw(&self, menu: &[MenuItem], state: &DispatchState);
    fn before_action(&self) {}
    fn after_action(&self) {}
}

struct Binding {
    item: MenuItem,
    action: Action,
}

#[derive(Default)]
struct Bindings {
    ordered: Vec<Binding>,
    index: HashMap<KeyChord, usize>,
}

pub struct Dispatcher {
    bindings: Mutex<Bindings>,
    state: Mutex<DispatchState>,
    /// Held for the whole of a dispatch step.
    turn: Mutex<()>,
    view: Arc<dyn DispatchView>,
}

impl Dispatcher {
    pub fn new(view: Arc<dyn DispatchView>) -> Self {
        Self {
            bindings: Mutex::new(Bindings::default()),
            state: Mutex::new(DispatchState::default()),
            turn: Mutex::new(()),
            view,
        }
    }

    /// Binds `chord`. Rebinding replaces the label and action but keeps the
    /// chord's place in the menu.
    pub fn register<F>(&self, chord: KeyChord, label: &str, action: F)
    where
        F: Fn() -> Option<String> + Send + Sync + 'static,
    {
        let binding = Binding {
            item: MenuItem {
                chord,
                label: label.to_string(),
            },
            action: Arc::new(action),
        };

        let mut bindings = self.bindings.lock().unwrap_or_else(|e| e.into_inner());
        match bindings.index.get(&chord).copied() {
            Some(i) => bindings.ordered[i] = binding,
            None => {
                let i = bindings.ordered.len();
                bindings.ordered.push(binding);
                bindings.index.insert(chord, i);
            }
        }
    }

    /// Runs the action bound to `chord`. Returns false if nothing is bound,
    /// in which case only the last input changes.
    pub fn trigger(&self, chord: KeyChord, suppress_hooks: bool, redraw: bool) -> bool {
        let _turn = self.turn.lock().unwrap_or_else(|e| e.into_inner());

        let action = {
            let bindings = self.bindings.lock().unwrap_or_else(|e| e.into_inner());
            bindings
                .index
                .get(&chord)
                .map(|&i| Arc::clone(&bindings.ordered[i].action))
        };

        self.lock_state().last_input = Some(chord);

        let Some(action) = action else {
            return false;
        };

        if !suppress_hooks {
            self.view.before_action();
        }
        let output = action();
        self.lock_state().last_output = output;
        if !suppress_hooks {
            self.view.after_action();
        }

        if redraw {
            self.render();
        }
        true
    }

    /// Draws the menu with the current state.
    pub fn render(&self) {
        let menu = self.menu();
        let state = self.state();
        self.view.draw(&menu, &state);
    }

    pub fn menu(&self) -> Vec<MenuItem> {
        let bindings = self.bindings.lock().unwrap_or_else(|e| e.into_inner());
        bindings.ordered.iter().map(|b| b.item.clone()).collect()
    }

    pub fn state(&self) -> DispatchState {
        self.lock_state().clone()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, DispatchState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}


#[cfg(test)]
mod tests {
    use super::recording::RecordingView;
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    fn dispatcher() -> (Arc<RecordingView>, Dispatcher) {
        let view = Arc::new(RecordingView::default());
        let dispatcher = Dispatcher::new(view.clone());
        (view, dispatcher)
    }

    #[test]
    fn test_hit_runs_hooks_action_and_redraw() {
        let (view, dispatcher) = dispatcher();
        dispatcher.register(KeyChord::plain('a'), "Analyze", || Some("done".to_string()));

        assert!(dispatcher.trigger(KeyChord::plain('a'), false, true));

        assert_eq!(
            view.events(),
            vec!["before", "after", "draw 1 Some(\"done\")"]
        );
        assert_eq!(
            dispatcher.state(),
            DispatchState {
                last_input: Some(KeyChord::plain('a')),
                last_output: Some("done".to_string()),
            }
        );
    }

    #[test]
    fn test_miss_only_updates_last_input() {
        let (view, dispatcher) = dispatcher();
        dispatcher.register(KeyChord::plain('a'), "Analyze", || Some("done".to_string()));
        dispatcher.trigger(KeyChord::plain('a'), true, false);

        assert!(!dispatcher.trigger(KeyChord::ctrl('z'), false, true));

        let state = dispatcher.state();
        assert_eq!(state.last_input, Some(KeyChord::ctrl('z')));
        assert_eq!(state.last_output, Some("done".to_string()));
        assert!(view.events().is_empty());
    }

    #[test]
    fn test_suppressed_hooks() {
        let (view, dispatcher) = dispatcher();
        dispatcher.register(KeyChord::plain('a'), "Analyze", || None);

        dispatcher.trigger(KeyChord::plain('a'), true, true);
        assert_eq!(view.events(), vec!["draw 1 None"]);

        dispatcher.trigger(KeyChord::plain('a'), true, false);
        assert_eq!(view.events().len(), 1);
    }

    #[test]
    fn test_modifiers_distinguish_bindings() {
        let (_, dispatcher) = dispatcher();
        dispatcher.register(KeyChord::plain('s'), "Toggle", || Some("toggle".to_string()));
        dispatcher.register(KeyChord::ctrl('s'), "Stop", || Some("stop".to_string()));

        dispatcher.trigger(KeyChord::ctrl('s'), true, false);
        assert_eq!(dispatcher.state().last_output, Some("stop".to_string()));
        dispatcher.trigger(KeyChord::plain('S'), true, false);
        assert_eq!(dispatcher.state().last_output, Some("toggle".to_string()));
    }

    #[test]
    fn test_shift_is_part_of_the_chord() {
        use crate::console::keys::Modifiers;
        use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

        let (_, dispatcher) = dispatcher();
        dispatcher.register(KeyChord::plain('a'), "Analyze", || Some("plain".to_string()));
        dispatcher.register(
            KeyChord::new('b', Some(Modifiers::SHIFT)),
            "Shifted",
            || Some("shifted".to_string()),
        );

        let shift_a = KeyEvent::new(KeyCode::Char('A'), KeyModifiers::SHIFT);
        let chord = KeyChord::from_key_event(&shift_a).unwrap();
        assert!(!dispatcher.trigger(chord, true, false));
        assert_eq!(dispatcher.state().last_output, None);

        let shift_b = KeyEvent::new(KeyCode::Char('B'), KeyModifiers::SHIFT);
        let chord = KeyChord::from_key_event(&shift_b).unwrap();
        assert!(dispatcher.trigger(chord, true, false));
        assert_eq!(dispatcher.state().last_output, Some("shifted".to_string()));
    }

    #[test]
    fn test_rebinding_keeps_menu_position() {
        let (_, dispatcher) = dispatcher();
        dispatcher.register(KeyChord::plain('g'), "Relocate", || None);
        dispatcher.register(KeyChord::plain('a'), "Analyze", || None);
        dispatcher.register(KeyChord::plain('g'), "Find window", || Some("found".to_string()));

        let labels: Vec<_> = dispatcher.menu().into_iter().map(|m| m.label).collect();
        assert_eq!(labels, vec!["Find window", "Analyze"]);

        dispatcher.trigger(KeyChord::plain('g'), true, false);
        assert_eq!(dispatcher.state().last_output, Some("found".to_string()));
    }

    #[test]
    fn test_concurrent_triggers_never_overlap() {
        let (_, dispatcher) = dispatcher();
        let running = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let (r, m) = (Arc::clone(&running), Arc::clone(&max_seen));
        dispatcher.register(KeyChord::plain('a'), "Analyze", move || {
            let now = r.fetch_add(1, Ordering::SeqCst) + 1;
            m.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(5));
            r.fetch_sub(1, Ordering::SeqCst);
            None
        });

        let dispatcher = Arc::new(dispatcher);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let d = Arc::clone(&dispatcher);
                thread::spawn(move || {
                    for _ in 0..5 {
                        d.trigger(KeyChord::plain('a'), true, false);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }
}
