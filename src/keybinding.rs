//! Keybinding descriptors and key-event matching.
//!
//! A binding lists its keys as strings: modifier names (`ctrl`, `shift`, `alt`,
//! `meta`) plus exactly one key name compared case-insensitively with the
//! event's key (`"g"`, `"Escape"`, `" "`/`"space"`).

use serde::{Deserialize, Serialize};

/// Whether a binding reacts to key press or key release.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyEventKind {
    #[default]
    KeyDown,
    KeyUp,
}

/// Scope restriction of a tool binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingScope {
    /// Only fires while the owning tool is active
    Active,
}

/// One command or several commands triggered by a binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyAction {
    One(String),
    Many(Vec<String>),
}

impl KeyAction {
    /// Command names in call order.
    pub fn commands(&self) -> Vec<&str> {
        match self {
            KeyAction::One(name) => vec![name.as_str()],
            KeyAction::Many(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

/// A keyboard shortcut bound to commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keybinding {
    pub keys: Vec<String>,
    pub action: KeyAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<BindingScope>,
    #[serde(default, rename = "eventType")]
    pub event_type: KeyEventKind,
}

impl Keybinding {
    /// Key-down binding for a single command.
    pub fn new(keys: &[&str], action: &str) -> Self {
        Self {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            action: KeyAction::One(action.to_string()),
            when: None,
            event_type: KeyEventKind::KeyDown,
        }
    }

    /// Restrict the binding to the active tool.
    pub fn when_active(mut self) -> Self {
        self.when = Some(BindingScope::Active);
        self
    }

    pub fn on_key_up(mut self) -> Self {
        self.event_type = KeyEventKind::KeyUp;
        self
    }

    /// Whether `event` triggers this binding.
    pub fn matches(&self, event: &KeyEvent) -> bool {
        if event.kind != self.event_type {
            return false;
        }

        let mut ctrl = false;
        let mut shift = false;
        let mut alt = false;
        let mut meta = false;
        let mut key: Option<&str> = None;
        for k in &self.keys {
            match k.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => ctrl = true,
                "shift" => shift = true,
                "alt" => alt = true,
                "meta" | "cmd" => meta = true,
                _ => {
                    if key.is_some() {
                        return false;
                    }
                    key = Some(k.as_str());
                }
            }
        }

        let Some(key) = key else {
            return false;
        };
        ctrl == event.ctrl
            && shift == event.shift
            && alt == event.alt
            && meta == event.meta
            && key_names_equal(key, &event.key)
    }
}

fn key_names_equal(binding: &str, event: &str) -> bool {
    let normalize = |k: &str| {
        if k == " " {
            "space".to_string()
        } else {
            k.to_ascii_lowercase()
        }
    };
    normalize(binding) == normalize(event)
}

/// A key event delivered to the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: String,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
    pub kind: KeyEventKind,
    /// Set by the editor when a binding handled the event
    pub default_prevented: bool,
}

impl KeyEvent {
    /// Key-down event without modifiers.
    pub fn key_down(key: &str) -> Self {
        Self {
            key: key.to_string(),
            ctrl: false,
            shift: false,
            alt: false,
            meta: false,
            kind: KeyEventKind::KeyDown,
            default_prevented: false,
        }
    }

    pub fn key_up(key: &str) -> Self {
        Self {
            kind: KeyEventKind::KeyUp,
            ..Self::key_down(key)
        }
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }
}
