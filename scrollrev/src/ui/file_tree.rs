//! File list panel renderer for scrollrev.
//!
//! One entry per changed file in document order: a status badge, the path,
//! change counts and a dot telling how close the file is to the viewport
//! (on screen, buffered, or far away and not cached).

use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem},
};

use scrollrev_core::visibility::Proximity;
use scrollrev_core::FileRef;

use crate::app::{AppState, PanelFocus};
use crate::theme::Theme;
use crate::ui::layout::panel_block;

/// Paths longer than this are shown with a leading ellipsis.
const MAX_PATH_LEN: usize = 28;

/// Renders the file list with the `ListState` selection highlight.
pub fn render_file_list(frame: &mut Frame, area: Rect, focus: PanelFocus, state: &mut AppState, theme: &Theme) {
    let is_focused = focus == PanelFocus::FileList;
    let files = state.session.order().files();
    let title = if files.is_empty() { "Files".to_owned() } else { format!("Files ({})", files.len()) };

    let items: Vec<ListItem> = if files.is_empty() {
        let msg = if state.files_loading { "Loading..." } else { "No files" };
        vec![ListItem::new(Line::raw(msg))]
    } else {
        files.iter().map(|file| file_item(state, file, theme)).collect()
    };

    let list = List::new(items)
        .block(panel_block(title, is_focused, theme))
        .highlight_style(Style::default().fg(theme.border_active).add_modifier(Modifier::BOLD));

    frame.render_stateful_widget(list, area, &mut state.file_list_state);
}

/// Format: `● [M] src/main.rs  +42 -7`.
fn file_item(state: &AppState, file: &FileRef, theme: &Theme) -> ListItem<'static> {
    let proximity = match state.session.proximity(file) {
        Proximity::Visible => Span::styled("● ", Style::default().fg(theme.border_active)),
        Proximity::Buffered => Span::styled("○ ", Style::default().fg(theme.gutter)),
        Proximity::Far => Span::raw("  "),
    };
    let mut spans = vec![proximity];

    if let Some(summary) = state.summary(file) {
        let badge_color = match summary.status {
            'A' => theme.file_added,
            'D' => theme.file_removed,
            _ => theme.file_modified,
        };
        spans.push(Span::styled(format!("[{}] ", summary.status), Style::default().fg(badge_color)));
    }
    spans.push(Span::raw(shorten(file.as_str())));
    if let Some(summary) = state.summary(file).filter(|s| s.changed() > 0) {
        spans.push(Span::styled(
            format!("  +{} -{}", summary.added, summary.removed),
            Style::default().fg(theme.gutter),
        ));
    }
    if state.comments_for(file).next().is_some() {
        spans.push(Span::styled(" ●", Style::default().fg(theme.comment_marker)));
    }
    ListItem::new(Line::from(spans))
}

fn shorten(path: &str) -> String {
    let chars = path.chars().count();
    if chars <= MAX_PATH_LEN {
        return path.to_owned();
    }
    let tail: String = path.chars().skip(chars - (MAX_PATH_LEN - 3)).collect();
    format!("...{tail}")
}
