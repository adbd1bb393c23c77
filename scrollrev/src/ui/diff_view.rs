//! Diff panel renderer for scrollrev.
//!
//! The panel shows the stacked document: one header row per file followed by
//! its body. Only the rows inside the viewport are materialised per frame,
//! so rendering is O(viewport) no matter how many files are in the change set.
//! Files whose content has not arrived draw placeholder rows at the height
//! the layout reserved for them.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem},
};

use scrollrev_core::types::Row;
use scrollrev_core::{DiffContent, FileRef, LineEntry, Side};

use crate::app::{AppState, PanelFocus};
use crate::highlight::{word_diff_spans, Highlighter, PairHalf};
use crate::theme::Theme;
use crate::ui::layout::{inner_rect, panel_block};

/// Width of the `"{old:>5} {new:>5} "` line-number gutter.
const NUMBER_GUTTER: usize = 12;

/// Renders the diff centre panel.
pub fn render_diff(frame: &mut Frame, area: Rect, focus: PanelFocus, state: &AppState, theme: &Theme) {
    let is_focused = focus == PanelFocus::Diff;
    let title = match state.session.selected_file() {
        Some(file) => format!("Diff: {file}"),
        None => "Diff".to_owned(),
    };
    let inner = inner_rect(area);
    frame.render_widget(panel_block(title, is_focused, theme), area);

    let layout = state.layout();
    if layout.extents().is_empty() {
        let msg = if state.files_loading { "Computing changed files..." } else { "No changes to review." };
        frame.render_widget(List::new([ListItem::new(Line::raw(msg))]), inner);
        return;
    }

    let top = state.scroll;
    let bottom = top + usize::from(inner.height);
    let cursor = is_focused.then(|| state.cursor_row());
    let mut items = Vec::with_capacity(usize::from(inner.height));

    for extent in layout.extents().iter().filter(|e| e.top < bottom && e.top + e.height > top) {
        let first = top.saturating_sub(extent.top);
        let last = (bottom - extent.top).min(extent.height);
        let mut painter = FilePainter::new(state, &extent.file, theme);
        for offset in first..last {
            let mut item = ListItem::new(painter.row(offset));
            if cursor == Some(extent.top + offset) {
                item = item.style(Style::default().bg(theme.cursor_bg));
            }
            items.push(item);
        }
    }

    frame.render_widget(List::new(items), inner);
}

/// Paints the rows of one file. Built once per visible file per frame.
struct FilePainter<'a> {
    state: &'a AppState,
    file: &'a FileRef,
    theme: &'a Theme,
    content: Option<&'a DiffContent>,
    rows: Vec<Row<'a>>,
    partners: Vec<Option<usize>>,
    highlighter: Option<Highlighter>,
}

impl<'a> FilePainter<'a> {
    fn new(state: &'a AppState, file: &'a FileRef, theme: &'a Theme) -> Self {
        let content = state.session.cache_entry(file).map(|c| c.as_ref());
        let rows = content.map_or_else(Vec::new, |c| c.rows(|ix| state.session.section_expanded(file, ix)));
        let partners = pair_changes(&rows);
        let highlighter = content
            .filter(|c| !c.lines.is_empty())
            .map(|c| Highlighter::new(&c.meta, file, theme.syntax_theme));
        Self { state, file, theme, content, rows, partners, highlighter }
    }

    fn row(&mut self, offset: usize) -> Line<'static> {
        if offset == 0 {
            return self.header();
        }
        let Some(content) = self.content else {
            return self.pending(offset);
        };
        if content.meta.binary {
            return self.banner(offset, format!("binary file, {} bytes", content.meta.byte_size));
        }
        if content.lines.is_empty() {
            return self.banner(offset, "no textual changes".to_owned());
        }
        let ix = offset - 1;
        match self.rows.get(ix).copied() {
            Some(Row::Line { entry, .. }) => self.line(ix, entry),
            Some(Row::Fold { count, .. }) => Line::from(vec![
                Span::raw(" ".repeat(NUMBER_GUTTER + 3)),
                Span::styled(format!("⋯ {count} unchanged lines"), Style::default().fg(self.theme.diff_fold)),
            ]),
            None => Line::default(),
        }
    }

    fn header(&self) -> Line<'static> {
        let current = self.state.session.selected_file() == Some(self.file);
        let bar_color = if current { self.theme.border_active } else { self.theme.border_inactive };
        let mut spans = vec![
            Span::styled("▌ ", Style::default().fg(bar_color)),
            Span::styled(
                self.file.to_string(),
                Style::default().fg(self.theme.file_header).add_modifier(Modifier::BOLD),
            ),
        ];
        if let Some(summary) = self.state.summary(self.file) {
            spans.push(Span::styled(format!("  +{}", summary.added), Style::default().fg(self.theme.diff_added)));
            spans.push(Span::styled(format!(" -{}", summary.removed), Style::default().fg(self.theme.diff_removed)));
        }
        if self.state.session.is_loading(self.file) {
            spans.push(Span::styled("  loading…", Style::default().fg(self.theme.placeholder)));
        }
        Line::from(spans)
    }

    /// Body rows before the content is cached.
    fn pending(&self, offset: usize) -> Line<'static> {
        let error = self.state.session.load_error().filter(|e| &e.file == self.file);
        match (error, offset) {
            (Some(err), 1) => Line::from(Span::styled(
                format!("  ✗ could not load this file: {}", err.message),
                Style::default().fg(self.theme.error),
            )),
            (None, 1) if self.state.session.is_loading(self.file) => {
                Line::from(Span::styled("  loading…", Style::default().fg(self.theme.placeholder)))
            }
            _ => Line::from(Span::styled("  ·", Style::default().fg(self.theme.placeholder))),
        }
    }

    fn banner(&self, offset: usize, text: String) -> Line<'static> {
        if offset != 1 {
            return Line::default();
        }
        Line::from(Span::styled(
            format!("  {text}"),
            Style::default().fg(self.theme.banner).add_modifier(Modifier::ITALIC),
        ))
    }

    fn line(&mut self, ix: usize, entry: &'a LineEntry) -> Line<'static> {
        let theme = self.theme;
        let (sign, sign_color) = match entry {
            LineEntry::Added { .. } => ('+', theme.diff_added),
            LineEntry::Removed { .. } => ('-', theme.diff_removed),
            _ => (' ', theme.diff_context),
        };
        let (old, new) = (entry.old_line(), entry.new_line());
        let commented = self.state.has_comment(self.file, old, Side::Old)
            || self.state.has_comment(self.file, new, Side::New);

        let mut spans = vec![
            Span::styled(format!("{:>5} {:>5} ", number(old), number(new)), Style::default().fg(theme.gutter)),
            Span::styled(if commented { "●" } else { " " }, Style::default().fg(theme.comment_marker)),
            Span::styled(format!("{sign} "), Style::default().fg(sign_color)),
        ];

        let code = entry.content().unwrap_or_default();
        let partner = self.partners.get(ix).copied().flatten().and_then(|p| match self.rows.get(p) {
            Some(&Row::Line { entry, .. }) => entry.content(),
            _ => None,
        });
        match (entry, partner) {
            (LineEntry::Removed { .. }, Some(other)) => {
                spans.extend(word_diff_spans(code, other, PairHalf::Old, theme.diff_removed, theme.diff_context));
            }
            (LineEntry::Added { .. }, Some(other)) => {
                spans.extend(word_diff_spans(other, code, PairHalf::New, theme.diff_added, theme.diff_context));
            }
            _ => match self.highlighter.as_mut() {
                Some(h) => spans.extend(h.line(code)),
                None => spans.push(Span::raw(code.to_owned())),
            },
        }

        let mut line = Line::from(spans);
        if let Some(sel) = self.state.session.selection() {
            let side = sel.side;
            if self.state.session.is_selected(self.file, entry.line_on(side), side) {
                line = line.style(Style::default().bg(theme.selection_bg));
            } else if self.state.session.is_in_range(self.file, entry.line_on(side.flip())) {
                line = line.style(Style::default().bg(theme.range_bg));
            }
        }
        line
    }
}

fn number(line: Option<u32>) -> String {
    line.map(|n| n.to_string()).unwrap_or_default()
}

/// Pairs each removed row with the added row at the same position in the
/// run that directly follows it, so the two can be word-diffed.
fn pair_changes(rows: &[Row<'_>]) -> Vec<Option<usize>> {
    let is = |ix: usize, removed: bool| match rows.get(ix) {
        Some(Row::Line { entry: LineEntry::Removed { .. }, .. }) => removed,
        Some(Row::Line { entry: LineEntry::Added { .. }, .. }) => !removed,
        _ => false,
    };
    let mut partners = vec![None; rows.len()];
    let mut ix = 0;
    while ix < rows.len() {
        if !is(ix, true) {
            ix += 1;
            continue;
        }
        let removed_start = ix;
        while is(ix, true) {
            ix += 1;
        }
        let added_start = ix;
        while is(ix, false) {
            ix += 1;
        }
        let pairs = (added_start - removed_start).min(ix - added_start);
        for k in 0..pairs {
            partners[removed_start + k] = Some(added_start + k);
            partners[added_start + k] = Some(removed_start + k);
        }
    }
    partners
}
