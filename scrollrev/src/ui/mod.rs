//! UI rendering for scrollrev.
//!
//! `render()` is the single entry point called by the event loop's
//! `terminal.draw()` closure. Layout arithmetic lives in `layout.rs`, the
//! diff panel in `diff_view.rs` and the file list in `file_tree.rs`.

mod layout;
pub mod diff_view;
pub mod file_tree;
pub mod help;
pub mod keybindings;

use std::time::Instant;

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Clear, Paragraph, Wrap},
};

use crate::app::{AppState, Mode, PanelFocus};
use crate::theme::Theme;
use layout::{compute_layout, inner_rect, panel_block, render_status_bar};

/// Renders one complete frame.
///
/// Before drawing, the diff panel's inner height and the panel rects are
/// written back into `state`, and the session observes the new viewport.
/// That is what drives visibility tracking and, through it, content loading.
pub fn render(frame: &mut Frame, state: &mut AppState, theme: &Theme) {
    let [left, center, right, status_bar] = compute_layout(frame);

    state.panel_rects = [left, center, right];
    state.prepare_frame(inner_rect(center).height, Instant::now());

    let focus = state.focus;
    if left.width > 0 {
        file_tree::render_file_list(frame, left, focus, state, theme);
    }
    diff_view::render_diff(frame, center, focus, state, theme);
    if right.width > 0 {
        render_comments(frame, right, focus, state, theme);
    }
    render_status_bar(frame, status_bar, state, theme);

    if state.mode == Mode::Insert {
        render_draft(frame, center, state, theme);
    }
    if state.mode == Mode::HelpOverlay {
        help::render_help_overlay(frame, theme, state.help_scroll);
    }
}

/// Comments on the current file, ordered by line.
fn render_comments(frame: &mut Frame, area: Rect, focus: PanelFocus, state: &AppState, theme: &Theme) {
    let title = format!("Comments ({})", state.comment_count());
    let block = panel_block(title, focus == PanelFocus::Comments, theme);
    let inner = inner_rect(area);
    frame.render_widget(block, area);

    let mut lines = Vec::new();
    if let Some(file) = state.session.selected_file() {
        for comment in state.comments_for(file) {
            let range = if comment.start_line == comment.end_line {
                format!("L{}", comment.start_line)
            } else {
                format!("L{}-{}", comment.start_line, comment.end_line)
            };
            lines.push(Line::from(vec![
                Span::styled("● ", Style::default().fg(theme.comment_marker)),
                Span::styled(range, Style::default().add_modifier(Modifier::BOLD)),
                Span::styled(format!(" ({})", comment.side.as_str()), Style::default().fg(theme.gutter)),
            ]));
            lines.extend(comment.body.lines().map(|l| Line::from(format!("  {l}"))));
            lines.push(Line::default());
        }
    }
    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            "  No comments on this file. Select lines and press c.",
            Style::default().fg(theme.gutter),
        )));
    }

    frame.render_widget(
        Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false }).scroll((state.comments_scroll, 0)),
        inner,
    );
}

/// The comment editor, drawn over the bottom of the diff panel.
fn render_draft(frame: &mut Frame, center: Rect, state: &AppState, theme: &Theme) {
    let [_, area] = inner_rect(center).layout(&Layout::vertical([Constraint::Fill(1), Constraint::Length(5)]));
    let title = match state.selection_label() {
        Some(label) => format!(" Comment on {label}  - Enter save, Esc cancel "),
        None => " Comment ".to_owned(),
    };
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(format!("{}▏", state.draft))
            .wrap(Wrap { trim: false })
            .block(Block::bordered().title(title).border_style(Style::default().fg(theme.status_mode_insert))),
        area,
    );
}
