//! Key routing for the dashboard runtime.
//!
//! Precedence: the help overlay swallows everything but Ctrl+C; then global
//! keys; anything else passes through to the focused panel.

#![allow(missing_docs)]

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::model::PanelId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputContext {
    pub focus: PanelId,
    pub help_open: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    Quit,
    ToggleHelp,
    CloseHelp,
    TogglePause,
    Refresh,
    Retry,
    Export,
    Copy,
    ToggleTheme,
    IncreaseInterval,
    DecreaseInterval,
    /// Esc: close help, or clear the shown error.
    Dismiss,
    FocusNext,
    FocusPrev,
    Focus(PanelId),
    ToggleSidebar,
    ToggleBottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputResolution {
    pub action: Option<InputAction>,
    pub consumed: bool,
}

impl InputResolution {
    const fn action(action: InputAction) -> Self {
        Self {
            action: Some(action),
            consumed: true,
        }
    }

    const fn passthrough() -> Self {
        Self {
            action: None,
            consumed: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HelpBinding {
    pub keys: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HelpSection {
    pub title: &'static str,
    pub bindings: &'static [HelpBinding],
}

const fn binding(keys: &'static str, description: &'static str) -> HelpBinding {
    HelpBinding { keys, description }
}

const GLOBAL_BINDINGS: [HelpBinding; 11] = [
    binding("q / Ctrl+C", "Quit"),
    binding("? / H", "Toggle this help"),
    binding("Space", "Pause / resume live updates"),
    binding("r", "Refresh now"),
    binding("Ctrl+R", "Retry after an error"),
    binding("e", "Export the active tab"),
    binding("c", "Copy the active tab"),
    binding("t", "Toggle dark / light theme"),
    binding("+ / -", "Change refresh interval"),
    binding("Esc", "Close help / clear error"),
    binding("[ / ]", "Collapse sidebar / bottom panel"),
];

const FOCUS_BINDINGS: [HelpBinding; 3] = [
    binding("Tab / Shift+Tab", "Cycle panel focus"),
    binding("w", "Focus workloads"),
    binding("m", "Focus main panel"),
];

const MAIN_BINDINGS: [HelpBinding; 3] = [
    binding("1-4", "Jump to tab"),
    binding("h / l", "Previous / next tab"),
    binding("j / k", "Scroll"),
];

const SIDEBAR_BINDINGS: [HelpBinding; 2] = [
    binding("j / k", "Move selection"),
    binding("Enter", "Show workload"),
];

const BOTTOM_BINDINGS: [HelpBinding; 2] = [
    binding("b", "Cycle Logs / Metrics / Events / Info"),
    binding("j / k", "Scroll"),
];

const HELP_SECTIONS: [HelpSection; 5] = [
    HelpSection {
        title: "Global",
        bindings: &GLOBAL_BINDINGS,
    },
    HelpSection {
        title: "Focus",
        bindings: &FOCUS_BINDINGS,
    },
    HelpSection {
        title: "Main panel",
        bindings: &MAIN_BINDINGS,
    },
    HelpSection {
        title: "Workloads",
        bindings: &SIDEBAR_BINDINGS,
    },
    HelpSection {
        title: "Bottom panel",
        bindings: &BOTTOM_BINDINGS,
    },
];

/// Help overlay content grouped by scope.
#[must_use]
pub const fn help_sections() -> &'static [HelpSection] {
    &HELP_SECTIONS
}

/// Resolve a key event using deterministic precedence rules:
/// help overlay first, then global keys.
#[must_use]
pub fn resolve_key_event(key: &KeyEvent, context: InputContext) -> InputResolution {
    if context.help_open {
        return resolve_help_key(key);
    }
    resolve_global_key(key)
}

fn ctrl(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL)
}

fn resolve_help_key(key: &KeyEvent) -> InputResolution {
    match key.code {
        KeyCode::Char('c') if ctrl(key) => InputResolution::action(InputAction::Quit),
        _ => InputResolution::action(InputAction::CloseHelp),
    }
}

fn resolve_global_key(key: &KeyEvent) -> InputResolution {
    let action = match key.code {
        KeyCode::Char('c') if ctrl(key) => InputAction::Quit,
        KeyCode::Char('r') if ctrl(key) => InputAction::Retry,
        _ if ctrl(key) => return InputResolution::passthrough(),
        KeyCode::Char('q') => InputAction::Quit,
        KeyCode::Char('?' | 'H') => InputAction::ToggleHelp,
        KeyCode::Char(' ') => InputAction::TogglePause,
        KeyCode::Char('r') => InputAction::Refresh,
        KeyCode::Char('e') => InputAction::Export,
        KeyCode::Char('c') => InputAction::Copy,
        KeyCode::Char('t') => InputAction::ToggleTheme,
        KeyCode::Char('+' | '=') => InputAction::IncreaseInterval,
        KeyCode::Char('-' | '_') => InputAction::DecreaseInterval,
        KeyCode::Esc => InputAction::Dismiss,
        KeyCode::Tab => InputAction::FocusNext,
        KeyCode::BackTab => InputAction::FocusPrev,
        KeyCode::Char('w') => InputAction::Focus(PanelId::Sidebar),
        KeyCode::Char('m') => InputAction::Focus(PanelId::Main),
        KeyCode::Char('[') => InputAction::ToggleSidebar,
        KeyCode::Char(']') => InputAction::ToggleBottom,
        _ => return InputResolution::passthrough(),
    };
    InputResolution::action(action)
}
