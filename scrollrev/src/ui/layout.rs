//! Responsive 3-panel layout for scrollrev.
//!
//! Pure layout arithmetic plus the shared panel chrome. Called inside
//! `terminal.draw()` on every render so every frame reflects the current
//! terminal size.
//!
//! At `>= 120` columns the file list, diff and comments panels sit side by
//! side (20 / 55 / 25 percent). Narrower terminals collapse both side panels
//! and the diff fills the full width.
//!
//! `Spacing::Overlap(1)` combined with `Block::merge_borders(MergeStrategy::Fuzzy)`
//! makes adjacent panel borders share a single column.

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Margin, Rect, Spacing},
    style::{Modifier, Style},
    symbols::merge::MergeStrategy,
    text::{Line, Span},
    widgets::{Block, BorderType, Paragraph},
};

use scrollrev_core::layout::LayoutMode;

use crate::app::{AppState, Mode};
use crate::theme::Theme;

/// Terminal width below which the side panels collapse.
const WIDE_LAYOUT_COLS: u16 = 120;

/// Returns `[left, center, right, status_bar]` panel `Rect`s for the current frame.
///
/// Collapsed side panels come back with zero width; callers skip rendering them.
pub fn compute_layout(frame: &Frame) -> [Rect; 4] {
    let [main_area, status_bar] =
        frame.area().layout(&Layout::vertical([Constraint::Fill(1), Constraint::Length(1)]));

    let horizontal = if frame.area().width >= WIDE_LAYOUT_COLS {
        Layout::horizontal([
            Constraint::Percentage(20),
            Constraint::Percentage(55),
            Constraint::Percentage(25),
        ])
    } else {
        Layout::horizontal([Constraint::Length(0), Constraint::Fill(1), Constraint::Length(0)])
    }
    .spacing(Spacing::Overlap(1));

    let [left, center, right] = main_area.layout(&horizontal);
    [left, center, right, status_bar]
}

/// Returns the inner `Rect` of a panel after removing the 1-cell border.
pub fn inner_rect(area: Rect) -> Rect {
    area.inner(Margin { vertical: 1, horizontal: 1 })
}

/// Builds a bordered `Block` for a panel.
///
/// Focused panels get a thick border in the active colour. `MergeStrategy::Fuzzy`
/// is required because `Exact` produces broken junctions when `Thick` and
/// `Plain` borders meet.
pub fn panel_block<'a>(title: impl Into<Line<'a>>, is_focused: bool, theme: &Theme) -> Block<'a> {
    let border_style = if is_focused {
        Style::default().fg(theme.border_active)
    } else {
        Style::default().fg(theme.border_inactive)
    };
    let border_type = if is_focused { BorderType::Thick } else { BorderType::Plain };

    Block::bordered()
        .title(title)
        .border_type(border_type)
        .border_style(border_style)
        .merge_borders(MergeStrategy::Fuzzy)
}

/// Renders the 1-row status bar.
///
/// Left to right: mode, diff mode, layout mode, current selection, cache
/// occupancy, a loading marker and the last status message.
pub fn render_status_bar(frame: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
    let (mode_text, mode_fg) = match state.mode {
        Mode::Insert => (" INSERT ", theme.status_mode_insert),
        Mode::Normal | Mode::HelpOverlay => (" NORMAL ", theme.status_mode_normal),
    };
    let layout = match state.session.layout_mode() {
        LayoutMode::Continuous => "all files",
        LayoutMode::SingleFile => "single file",
    };

    let mut spans = vec![
        Span::styled(mode_text, Style::default().fg(mode_fg).add_modifier(Modifier::BOLD)),
        Span::raw(format!(" {} │ {layout} ", state.diff_mode.label())),
    ];
    if let Some(label) = state.selection_label() {
        spans.push(Span::raw(format!("│ {label} ")));
    }
    spans.push(Span::raw(format!("│ cached {} ", state.session.cached_len())));
    if state.files_loading {
        spans.push(Span::styled("│ scanning… ", Style::default().add_modifier(Modifier::ITALIC)));
    }
    if let Some(status) = &state.status {
        spans.push(Span::styled(format!("│ {status}"), Style::default().fg(theme.banner)));
    }

    frame.render_widget(
        Paragraph::new(Line::from(spans))
            .style(Style::default().bg(theme.status_bar_bg).fg(theme.status_bar_fg)),
        area,
    );
}
