use std::collections::BTreeMap;
use std::fmt;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Action {
    // Handled by the overlay engine
    Dismiss,
    FocusNext,
    FocusPrev,
    // Demo shell
    Quit,
    OpenDialog,
    OpenAppDialog,
    OpenNestedDialog,
    OpenPopup,
    OpenNotification,
    ToggleViewActive,
    ToggleMaximize,
    CloseAll,
}

impl Action {
    /// Actions the engine consumes itself; the rest belong to the host.
    pub fn is_overlay_action(self) -> bool {
        matches!(self, Action::Dismiss | Action::FocusNext | Action::FocusPrev)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Dismiss => "dismiss overlay",
            Action::FocusNext => "focus next element",
            Action::FocusPrev => "focus previous element",
            Action::Quit => "quit",
            Action::OpenDialog => "open view dialog",
            Action::OpenAppDialog => "open application dialog",
            Action::OpenNestedDialog => "open nested dialog",
            Action::OpenPopup => "open popup",
            Action::OpenNotification => "show notification",
            Action::ToggleViewActive => "toggle view activation",
            Action::ToggleMaximize => "toggle maximized main area",
            Action::CloseAll => "close view overlays",
        })
    }
}

/// One key chord. Character chords compare the character itself, so `D`
/// matches whether or not the terminal also reports SHIFT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyChord {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyChord {
    pub const fn plain(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::NONE,
        }
    }

    pub const fn ctrl(c: char) -> Self {
        Self {
            code: KeyCode::Char(c),
            modifiers: KeyModifiers::CONTROL,
        }
    }

    pub fn matches(&self, key: &KeyEvent) -> bool {
        if key.code != self.code {
            return false;
        }
        let relevant = match key.code {
            KeyCode::Char(_) | KeyCode::BackTab => key.modifiers - KeyModifiers::SHIFT,
            _ => key.modifiers,
        };
        relevant == self.modifiers - KeyModifiers::SHIFT
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.contains(KeyModifiers::CONTROL) {
            f.write_str("^")?;
        }
        if self.modifiers.contains(KeyModifiers::ALT) {
            f.write_str("M-")?;
        }
        match self.code {
            KeyCode::Char(c) if self.modifiers.contains(KeyModifiers::CONTROL) => {
                write!(f, "{}", c.to_ascii_uppercase())
            }
            KeyCode::Char(c) => write!(f, "{c}"),
            KeyCode::BackTab => f.write_str("S-Tab"),
            KeyCode::F(n) => write!(f, "F{n}"),
            other => write!(f, "{other:?}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct KeyBindings {
    map: BTreeMap<Action, Vec<KeyChord>>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        use Action::*;
        let mut kb = Self::new();
        kb.bind(Dismiss, KeyChord::plain(KeyCode::Esc));
        kb.bind(FocusNext, KeyChord::plain(KeyCode::Tab));
        kb.bind(FocusPrev, KeyChord::plain(KeyCode::BackTab));
        kb.bind(Quit, KeyChord::ctrl('q'));
        for (action, c) in [
            (OpenDialog, 'd'),
            (OpenAppDialog, 'a'),
            (OpenNestedDialog, 'D'),
            (OpenPopup, 'p'),
            (OpenNotification, 'n'),
            (ToggleViewActive, 'v'),
            (ToggleMaximize, 'm'),
            (CloseAll, 'x'),
        ] {
            kb.bind(action, KeyChord::plain(KeyCode::Char(c)));
        }
        kb
    }
}

impl KeyBindings {
    pub fn new() -> Self {
        Self {
            map: BTreeMap::new(),
        }
    }

    pub fn bind(&mut self, action: Action, chord: KeyChord) {
        self.map.entry(action).or_default().push(chord);
    }

    /// Drop every chord bound to `action`.
    pub fn unbind(&mut self, action: Action) {
        self.map.remove(&action);
    }

    pub fn action_for_key(&self, key: &KeyEvent) -> Option<Action> {
        self.map
            .iter()
            .find(|(_, chords)| chords.iter().any(|c| c.matches(key)))
            .map(|(action, _)| *action)
    }

    /// Chord labels per action, in action order.
    pub fn help_entries(&self) -> Vec<(Action, Vec<String>)> {
        self.map
            .iter()
            .map(|(action, chords)| (*action, chords.iter().map(|c| c.to_string()).collect()))
            .collect()
    }
}
