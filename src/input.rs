use crate::app::InputMode;
use crate::catalog::Catalog;
use crate::dispatch::RowAction;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Quit,
    OpenPalette,
    ToggleHelp,
    FocusFilter,
    Refresh,
    ClearOverlays,
    SelectKind(&'static str),
    Down,
    Up,
    PageDown,
    PageUp,
    Top,
    Bottom,
    Row(RowAction),
    OpenClusterPicker,
    ScaleUpCluster,
    StartScaleDown,
    RefreshLifecycle,
    SubmitInput,
    CancelInput,
    Backspace,
    InputChar(char),
    ConfirmYes,
    ConfirmNo,
}

/// Maps a key press to an action for the given input context. Text-owning
/// modes never see router shortcuts.
pub fn map_key(mode: InputMode, key: KeyEvent, catalog: &Catalog) -> Option<Action> {
    match mode {
        InputMode::Normal => map_normal_mode_key(key, catalog),
        InputMode::Filter
        | InputMode::Palette
        | InputMode::ScalePrompt
        | InputMode::ScaleDownConfirm => map_input_mode_key(key),
        InputMode::ClusterPicker => map_picker_key(key),
        InputMode::ConfirmDelete => map_confirm_key(key),
        InputMode::Viewer => map_viewer_key(key),
    }
}

fn map_normal_mode_key(key: KeyEvent, catalog: &Catalog) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(Action::Quit),
            KeyCode::Char('d') => Some(Action::Row(RowAction::Delete)),
            _ => None,
        };
    }
    if key.modifiers.contains(KeyModifiers::ALT) {
        return None;
    }

    match key.code {
        KeyCode::Char(':') => Some(Action::OpenPalette),
        KeyCode::Char('?') => Some(Action::ToggleHelp),
        KeyCode::Char('/') => Some(Action::FocusFilter),
        KeyCode::Char('r') if key.modifiers.is_empty() => Some(Action::Refresh),
        KeyCode::Esc => Some(Action::ClearOverlays),
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Down => Some(Action::Down),
        KeyCode::Up => Some(Action::Up),
        KeyCode::PageDown => Some(Action::PageDown),
        KeyCode::PageUp => Some(Action::PageUp),
        KeyCode::Home => Some(Action::Top),
        KeyCode::End => Some(Action::Bottom),
        KeyCode::Enter | KeyCode::Char('x') => Some(Action::Row(RowAction::Describe)),
        KeyCode::Char('y') => Some(Action::Row(RowAction::Yaml)),
        KeyCode::Char('l') => Some(Action::Row(RowAction::Logs { previous: false })),
        KeyCode::Char('L') => Some(Action::Row(RowAction::Logs { previous: true })),
        KeyCode::Char('R') => Some(Action::Row(RowAction::Restart)),
        KeyCode::Char('S') => Some(Action::Row(RowAction::Scale)),
        KeyCode::Char('T') => Some(Action::Row(RowAction::Trigger)),
        KeyCode::Char('C') => Some(Action::OpenClusterPicker),
        KeyCode::Char('U') => Some(Action::ScaleUpCluster),
        KeyCode::Char('Z') => Some(Action::StartScaleDown),
        KeyCode::Char('N') => Some(Action::RefreshLifecycle),
        KeyCode::Char(c) => catalog
            .by_shortcut(c)
            .map(|kind| Action::SelectKind(kind.key)),
        _ => None,
    }
}

fn map_input_mode_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Esc => Some(Action::CancelInput),
        KeyCode::Enter => Some(Action::SubmitInput),
        KeyCode::Backspace => Some(Action::Backspace),
        KeyCode::Char(c) if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT => {
            Some(Action::InputChar(c))
        }
        _ => None,
    }
}

fn map_picker_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::Quit),
        KeyCode::Esc => Some(Action::CancelInput),
        KeyCode::Enter => Some(Action::SubmitInput),
        KeyCode::Down => Some(Action::Down),
        KeyCode::Up => Some(Action::Up),
        KeyCode::PageDown => Some(Action::PageDown),
        KeyCode::PageUp => Some(Action::PageUp),
        KeyCode::Home => Some(Action::Top),
        KeyCode::End => Some(Action::Bottom),
        KeyCode::Char('r') if key.modifiers.is_empty() => Some(Action::Refresh),
        KeyCode::Char('q') if key.modifiers.is_empty() => Some(Action::Quit),
        _ => None,
    }
}

fn map_confirm_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => Some(Action::ConfirmYes),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => Some(Action::ConfirmNo),
        _ => None,
    }
}

fn map_viewer_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => Some(Action::CancelInput),
        KeyCode::Down => Some(Action::Down),
        KeyCode::Up => Some(Action::Up),
        KeyCode::PageDown | KeyCode::Char(' ') => Some(Action::PageDown),
        KeyCode::PageUp => Some(Action::PageUp),
        KeyCode::Home => Some(Action::Top),
        KeyCode::End => Some(Action::Bottom),
        _ => None,
    }
}
