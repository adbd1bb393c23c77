//! Keybinding dispatcher for scrollrev.
//!
//! Translates raw crossterm key and mouse events into `AppState` mutations
//! and returns a `KeyAction` telling the event loop what to do next. The
//! dispatcher branches first on `state.mode` so HelpOverlay, Insert and
//! Normal each have an isolated handler.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Position;

use crate::app::{AppState, Mode, PanelFocus};

/// Control-flow signal returned from the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Keep running; the next render picks up the change.
    Continue,
    /// Tear down the terminal and exit.
    Quit,
    /// The draft comment is ready; the event loop stores it.
    SaveComment,
}

/// Dispatches a key event to the handler matching the current mode.
pub fn handle_key(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match state.mode {
        Mode::HelpOverlay => handle_help(key, state),
        Mode::Normal => handle_normal(key, state),
        Mode::Insert => handle_insert(key, state),
    }
}

// ---------------------------------------------------------------------------
// Normal mode
// ---------------------------------------------------------------------------

fn handle_normal(key: KeyEvent, state: &mut AppState) -> KeyAction {
    if let Some(action) = handle_scroll_key(key, state) {
        return action;
    }
    if let Some(action) = handle_file_list_key(key, state) {
        return action;
    }
    if let Some(action) = handle_selection_key(key, state) {
        return action;
    }

    match key.code {
        KeyCode::Char('H') => state.focus = state.focus.prev(),
        KeyCode::Char('L') => state.focus = state.focus.next(),

        KeyCode::Char('{') => state.step_file(-1),
        KeyCode::Char('}') => state.step_file(1),

        KeyCode::Char('m') => state.toggle_layout(),
        KeyCode::Char('r') => state.request_changed_files(),

        KeyCode::Char('?') => {
            state.help_scroll = 0;
            state.mode = Mode::HelpOverlay;
        }
        KeyCode::Char('q') => return KeyAction::Quit,
        _ => {}
    }
    KeyAction::Continue
}

/// Enter and `l` jump to the highlighted file while the file list has focus.
fn handle_file_list_key(key: KeyEvent, state: &mut AppState) -> Option<KeyAction> {
    if state.focus != PanelFocus::FileList {
        return None;
    }
    match key.code {
        KeyCode::Enter | KeyCode::Char('l') => {
            state.jump_to_list_selection();
            Some(KeyAction::Continue)
        }
        _ => None,
    }
}

/// Line selection, folds and comments. Active in the diff panel only.
fn handle_selection_key(key: KeyEvent, state: &mut AppState) -> Option<KeyAction> {
    if state.focus != PanelFocus::Diff {
        return None;
    }
    match key.code {
        KeyCode::Char(' ') => state.click_at_cursor(false),
        KeyCode::Char('J') => state.extend_cursor(1),
        KeyCode::Char('K') => state.extend_cursor(-1),
        KeyCode::Tab => state.flip_side(),
        KeyCode::Char('o') => state.toggle_fold_at_cursor(),
        KeyCode::Esc => state.session.clear_selection(),
        KeyCode::Char('c') => state.begin_comment(),
        _ => return None,
    }
    Some(KeyAction::Continue)
}

/// j / k / g / G and the Ctrl page keys, routed to the focused panel.
fn handle_scroll_key(key: KeyEvent, state: &mut AppState) -> Option<KeyAction> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Char('j') | KeyCode::Down => state.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => state.scroll_up(1),
        KeyCode::Char('g') => state.scroll_top(),
        KeyCode::Char('G') => state.scroll_bottom(),
        KeyCode::Char('d') if ctrl => state.half_page_down(),
        KeyCode::Char('u') if ctrl => state.half_page_up(),
        KeyCode::Char('f') if ctrl => state.full_page_down(),
        KeyCode::Char('b') if ctrl => state.full_page_up(),
        KeyCode::PageDown => state.full_page_down(),
        KeyCode::PageUp => state.full_page_up(),
        _ => return None,
    }
    Some(KeyAction::Continue)
}

// ---------------------------------------------------------------------------
// HelpOverlay mode
// ---------------------------------------------------------------------------

/// j / k scroll the overlay; `?`, Esc or q dismiss it.
fn handle_help(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match key.code {
        KeyCode::Char('j') => state.help_scroll = state.help_scroll.saturating_add(1),
        KeyCode::Char('k') => state.help_scroll = state.help_scroll.saturating_sub(1),
        KeyCode::Char('g') => state.help_scroll = 0,
        KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q') => state.mode = Mode::Normal,
        _ => {}
    }
    KeyAction::Continue
}

// ---------------------------------------------------------------------------
// Insert mode
// ---------------------------------------------------------------------------

/// Comment editing. Enter saves, Esc discards, Alt-Enter inserts a newline.
fn handle_insert(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match key.code {
        KeyCode::Esc => {
            state.draft.clear();
            state.mode = Mode::Normal;
        }
        KeyCode::Enter if key.modifiers.contains(KeyModifiers::ALT) => state.draft.push('\n'),
        KeyCode::Enter => return KeyAction::SaveComment,
        KeyCode::Backspace => {
            state.draft.pop();
        }
        KeyCode::Char(c) => state.draft.push(c),
        _ => {}
    }
    KeyAction::Continue
}

// ---------------------------------------------------------------------------
// Mouse events
// ---------------------------------------------------------------------------

/// Handles press, drag, release and the scroll wheel.
///
/// A press inside the diff panel goes to line selection; a press on another
/// panel only moves focus. The wheel scrolls the help overlay while it is open.
pub fn handle_mouse(mouse: MouseEvent, state: &mut AppState) -> KeyAction {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) if state.mode == Mode::Normal => {
            let shift = mouse.modifiers.contains(KeyModifiers::SHIFT);
            handle_mouse_click(mouse.column, mouse.row, shift, state);
        }
        MouseEventKind::Drag(MouseButton::Left) => state.mouse_drag(mouse.column, mouse.row),
        MouseEventKind::Up(MouseButton::Left) => state.mouse_up(),
        MouseEventKind::ScrollUp if state.mode == Mode::HelpOverlay => {
            state.help_scroll = state.help_scroll.saturating_sub(3);
        }
        MouseEventKind::ScrollDown if state.mode == Mode::HelpOverlay => {
            state.help_scroll = state.help_scroll.saturating_add(3);
        }
        MouseEventKind::ScrollUp => state.scroll_by(-3),
        MouseEventKind::ScrollDown => state.scroll_by(3),
        _ => {}
    }
    KeyAction::Continue
}

/// Routes a press by panel. Collapsed panels (zero width) never take focus.
fn handle_mouse_click(col: u16, row: u16, shift: bool, state: &mut AppState) {
    let pos = Position { x: col, y: row };
    let [left, center, right] = state.panel_rects;

    if left.width > 0 && left.contains(pos) {
        state.focus = PanelFocus::FileList;
    } else if center.contains(pos) {
        state.mouse_down(col, row, shift);
    } else if right.width > 0 && right.contains(pos) {
        state.focus = PanelFocus::Comments;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrollrev_core::config::Config;
    use scrollrev_core::session::ReviewSession;

    use crate::git::types::DiffMode;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn state() -> AppState {
        AppState::new(ReviewSession::new(Config::default().tunables()), DiffMode::Unstaged, Vec::new(), None)
    }

    #[test]
    fn help_opens_and_closes() {
        let mut s = state();
        handle_key(key(KeyCode::Char('?')), &mut s);
        assert_eq!(s.mode, Mode::HelpOverlay);
        assert_eq!(handle_key(key(KeyCode::Char('q')), &mut s), KeyAction::Continue);
        assert_eq!(s.mode, Mode::Normal);
        assert_eq!(handle_key(key(KeyCode::Char('q')), &mut s), KeyAction::Quit);
    }

    #[test]
    fn insert_mode_edits_the_draft() {
        let mut s = state();
        s.mode = Mode::Insert;
        for c in "nit!".chars() {
            handle_key(key(KeyCode::Char(c)), &mut s);
        }
        handle_key(key(KeyCode::Backspace), &mut s);
        assert_eq!(s.draft, "nit");
        assert_eq!(handle_key(key(KeyCode::Char('q')), &mut s), KeyAction::Continue);
        assert_eq!(handle_key(key(KeyCode::Enter), &mut s), KeyAction::SaveComment);

        handle_key(key(KeyCode::Esc), &mut s);
        assert_eq!(s.mode, Mode::Normal);
        assert!(s.draft.is_empty());
    }

    #[test]
    fn focus_cycles_both_ways() {
        let mut s = state();
        handle_key(key(KeyCode::Char('L')), &mut s);
        assert_eq!(s.focus, PanelFocus::Comments);
        handle_key(key(KeyCode::Char('H')), &mut s);
        handle_key(key(KeyCode::Char('H')), &mut s);
        assert_eq!(s.focus, PanelFocus::FileList);
    }
}
