//! Central application state for scrollrev.
//!
//! `AppState` wraps the core [`ReviewSession`] with everything that only
//! makes sense in a terminal: the scroll position and its anchor, the
//! keyboard cursor, panel focus, the comment draft and the panel rects used
//! for mouse hit-testing. No ratatui rendering happens here; the render
//! module reads this state and the keybinding dispatcher mutates it.

use std::collections::HashMap;
use std::time::Instant;

use crossbeam_channel::Sender;
use ratatui::layout::{Margin, Position, Rect};
use ratatui::widgets::ListState;

use scrollrev_core::layout::{DocumentLayout, ScrollAnchor};
use scrollrev_core::loader::BatchResult;
use scrollrev_core::selection::Selection;
use scrollrev_core::session::ReviewSession;
use scrollrev_core::types::{Comment, Row};
use scrollrev_core::visibility::Viewport;
use scrollrev_core::{FileRef, LoadError, Side};

use crate::git::types::{DiffMode, DiffRequest, FileSummary};

/// Columns of the diff gutter holding the old line number. A press left of
/// this column on an unchanged line selects on the old side.
pub const OLD_GUTTER_END: u16 = 6;

/// Editor mode controlling which keybinding set is active.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Normal,
    /// Typing a comment for the current selection.
    Insert,
    /// Full-screen help overlay is shown above all panels.
    HelpOverlay,
}

/// Which panel currently has keyboard focus.
///
/// Cycle order: `FileList` → `Diff` → `Comments` → `FileList`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PanelFocus {
    FileList,
    #[default]
    Diff,
    Comments,
}

impl PanelFocus {
    pub fn prev(self) -> Self {
        match self {
            PanelFocus::FileList => PanelFocus::Comments,
            PanelFocus::Diff => PanelFocus::FileList,
            PanelFocus::Comments => PanelFocus::Diff,
        }
    }

    pub fn next(self) -> Self {
        match self {
            PanelFocus::FileList => PanelFocus::Diff,
            PanelFocus::Diff => PanelFocus::Comments,
            PanelFocus::Comments => PanelFocus::FileList,
        }
    }
}

/// What occupies one row of the stacked document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowTarget {
    /// The file's header row.
    Header(FileRef),
    /// A diff line; `section` is set when it sits in an expanded fold.
    Line { file: FileRef, old: Option<u32>, new: Option<u32>, section: Option<usize> },
    /// A collapsed fold.
    Fold { file: FileRef, section: usize },
    /// Body rows without lines: placeholder, binary banner, or load error.
    Filler(FileRef),
}

impl RowTarget {
    pub fn file(&self) -> &FileRef {
        match self {
            RowTarget::Header(file)
            | RowTarget::Line { file, .. }
            | RowTarget::Fold { file, .. }
            | RowTarget::Filler(file) => file,
        }
    }

    pub fn line_on(&self, side: Side) -> Option<u32> {
        match (self, side) {
            (RowTarget::Line { old, .. }, Side::Old) => *old,
            (RowTarget::Line { new, .. }, Side::New) => *new,
            _ => None,
        }
    }

    /// The side a press on this row selects: the only side a removed or
    /// added line has, otherwise `preferred`.
    pub fn side_for(&self, preferred: Side) -> Side {
        match self {
            RowTarget::Line { old: Some(_), new: None, .. } => Side::Old,
            RowTarget::Line { old: None, new: Some(_), .. } => Side::New,
            _ => preferred,
        }
    }
}

/// All mutable UI state passed through every render cycle.
pub struct AppState {
    pub mode: Mode,
    pub focus: PanelFocus,
    pub session: ReviewSession,
    pub diff_mode: DiffMode,
    summaries: HashMap<FileRef, FileSummary>,
    /// True until the first change set arrives.
    pub files_loading: bool,

    /// Stateful list widget backing the file-list panel.
    pub file_list_state: ListState,

    layout: DocumentLayout,
    /// First document row shown in the diff panel.
    pub scroll: usize,
    /// `scroll` pinned to a file, so content arriving above it does not move
    /// the view.
    anchor: Option<ScrollAnchor>,
    /// Keyboard cursor, as an offset from `scroll`.
    pub cursor: usize,
    /// Side used for rows that carry both line numbers.
    pub cursor_side: Side,

    /// Inner height of the diff panel, cached after each render.
    pub diff_viewport_height: u16,
    /// Outer rects of the file list, diff and comments panels, cached after
    /// each render for mouse hit-testing.
    pub panel_rects: [Rect; 3],
    pub help_scroll: u16,
    pub comments_scroll: u16,

    /// Comment being typed in Insert mode.
    pub draft: String,
    comments: Vec<Comment>,
    /// One-shot message for the status bar.
    pub status: Option<String>,

    git_tx: Option<Sender<DiffRequest>>,
}

impl AppState {
    /// Builds the state around a fresh session.
    ///
    /// # Arguments
    ///
    /// * `session` - the content pipeline and selection state
    /// * `diff_mode` - comparison shown, for the status bar
    /// * `comments` - comments already stored for this review session
    /// * `git_tx` - request channel to the git worker (`None` in tests)
    pub fn new(
        session: ReviewSession,
        diff_mode: DiffMode,
        mut comments: Vec<Comment>,
        git_tx: Option<Sender<DiffRequest>>,
    ) -> Self {
        comments.sort_by(|a, b| (&a.file_path, a.start_line).cmp(&(&b.file_path, b.start_line)));
        Self {
            mode: Mode::default(),
            focus: PanelFocus::default(),
            session,
            diff_mode,
            summaries: HashMap::new(),
            files_loading: true,
            file_list_state: ListState::default(),
            layout: DocumentLayout::default(),
            scroll: 0,
            anchor: None,
            cursor: 0,
            cursor_side: Side::New,
            diff_viewport_height: 0,
            panel_rects: [Rect::default(); 3],
            help_scroll: 0,
            comments_scroll: 0,
            draft: String::new(),
            comments,
            status: None,
            git_tx,
        }
    }

    // ------------------------------------------------------------------
    // Worker traffic
    // ------------------------------------------------------------------

    fn send(&mut self, request: DiffRequest) {
        let Some(tx) = &self.git_tx else { return };
        if tx.send(request).is_err() {
            tracing::error!("git worker is gone");
            self.status = Some("git worker stopped; restart scrollrev".to_owned());
        }
    }

    pub fn request_changed_files(&mut self) {
        self.files_loading = true;
        self.send(DiffRequest::ChangedFiles);
    }

    /// Installs a change set from the worker.
    pub fn apply_changed_files(&mut self, result: Result<Vec<FileSummary>, LoadError>) {
        self.files_loading = false;
        match result {
            Ok(summaries) => {
                let files: Vec<FileRef> = summaries.iter().map(|s| s.file.clone()).collect();
                self.summaries = summaries.into_iter().map(|s| (s.file.clone(), s)).collect();
                self.session.set_files(files);
                let selected = self.session.selected_file().and_then(|f| self.session.order().position(f));
                self.file_list_state.select(selected);
                self.relayout();
            }
            Err(err) => {
                tracing::error!("listing changed files failed: {err}");
                self.status = Some(format!("cannot list changes: {err}"));
            }
        }
    }

    pub fn apply_batch(&mut self, result: BatchResult) {
        if !self.session.apply_batch(result) {
            tracing::debug!("ignored batch from before the last layout switch");
        }
    }

    /// Timer step for the debounce and eviction.
    pub fn tick(&mut self, now: Instant) {
        let outcome = self.session.tick(now);
        if !outcome.evicted.is_empty() {
            tracing::debug!(evicted = outcome.evicted.len(), cached = self.session.cached_len(), "cache trimmed");
        }
    }

    /// Drains deferred session work and hands any load batches to the worker.
    /// Called by the event loop when no input is pending.
    pub fn run_idle(&mut self) {
        if !self.session.has_idle_work() {
            return;
        }
        for batch in self.session.run_idle() {
            self.send(DiffRequest::Load(batch));
        }
    }

    // ------------------------------------------------------------------
    // Layout and scrolling
    // ------------------------------------------------------------------

    pub fn summary(&self, file: &FileRef) -> Option<&FileSummary> {
        self.summaries.get(file)
    }

    pub fn layout(&self) -> &DocumentLayout {
        &self.layout
    }

    fn viewport_rows(&self) -> usize {
        usize::from(self.diff_viewport_height).max(1)
    }

    /// Rebuilds the document layout and restores the anchored scroll row.
    pub fn relayout(&mut self) {
        let summaries = &self.summaries;
        self.layout = self.session.layout(|f| placeholder_rows(summaries, f));
        if let Some(row) = self.anchor.as_ref().and_then(|a| self.layout.resolve(a)) {
            self.scroll = row;
        }
        self.clamp_scroll();
    }

    fn clamp_scroll(&mut self) {
        let max = self.layout.total_rows().saturating_sub(self.viewport_rows());
        self.scroll = self.scroll.min(max);
        self.anchor = self.layout.anchor(self.scroll);
        let last_row = self.layout.total_rows().saturating_sub(self.scroll + 1);
        self.cursor = self.cursor.min(self.viewport_rows() - 1).min(last_row);
    }

    /// Per-frame sync: caches the viewport height, lays the document out and
    /// feeds the visible window to the session.
    pub fn prepare_frame(&mut self, viewport_height: u16, now: Instant) {
        self.diff_viewport_height = viewport_height;
        self.relayout();
        let viewport = Viewport { top: self.scroll, height: usize::from(viewport_height) };
        self.session.observe_viewport(&self.layout, viewport, now);
    }

    fn set_scroll(&mut self, row: usize) {
        self.scroll = row;
        self.clamp_scroll();
    }

    /// Scrolls the diff by `delta` rows, keeping the cursor's screen offset.
    pub fn scroll_by(&mut self, delta: isize) {
        self.set_scroll(self.scroll.saturating_add_signed(delta));
        self.sync_current_file();
    }

    pub fn cursor_row(&self) -> usize {
        self.scroll + self.cursor
    }

    /// Moves the cursor by `delta` rows, scrolling when it leaves the viewport.
    pub fn move_cursor(&mut self, delta: isize) {
        let height = self.viewport_rows();
        let last = self.layout.total_rows().saturating_sub(1);
        let target = self.cursor_row().saturating_add_signed(delta).min(last);
        if target < self.scroll {
            self.set_scroll(target);
        } else if target >= self.scroll + height {
            self.set_scroll(target + 1 - height);
        }
        self.cursor = target.saturating_sub(self.scroll).min(height - 1);
        self.sync_current_file();
    }

    pub fn scroll_to_top(&mut self) {
        self.cursor = 0;
        self.set_scroll(0);
        self.sync_current_file();
    }

    pub fn scroll_to_bottom(&mut self) {
        self.set_scroll(usize::MAX);
        self.cursor = self.viewport_rows() - 1;
        self.clamp_scroll();
        self.sync_current_file();
    }

    // ------------------------------------------------------------------
    // Focus-aware scrolling, shared by keys and the mouse wheel
    // ------------------------------------------------------------------

    /// Moves down `n` rows in the focused panel.
    pub fn scroll_down(&mut self, n: usize) {
        match self.focus {
            PanelFocus::FileList => self.step_list(n as isize),
            PanelFocus::Diff => self.move_cursor(n as isize),
            PanelFocus::Comments => self.comments_scroll = self.comments_scroll.saturating_add(n as u16),
        }
    }

    /// Moves up `n` rows in the focused panel.
    pub fn scroll_up(&mut self, n: usize) {
        match self.focus {
            PanelFocus::FileList => self.step_list(-(n as isize)),
            PanelFocus::Diff => self.move_cursor(-(n as isize)),
            PanelFocus::Comments => self.comments_scroll = self.comments_scroll.saturating_sub(n as u16),
        }
    }

    pub fn scroll_top(&mut self) {
        match self.focus {
            PanelFocus::FileList => self.file_list_state.select_first(),
            PanelFocus::Diff => self.scroll_to_top(),
            PanelFocus::Comments => self.comments_scroll = 0,
        }
    }

    pub fn scroll_bottom(&mut self) {
        match self.focus {
            PanelFocus::FileList => {
                let last = self.session.order().len().checked_sub(1);
                self.file_list_state.select(last);
            }
            PanelFocus::Diff => self.scroll_to_bottom(),
            PanelFocus::Comments => self.comments_scroll = u16::MAX / 2,
        }
    }

    pub fn half_page_down(&mut self) {
        self.page(self.viewport_rows() / 2, 1);
    }

    pub fn half_page_up(&mut self) {
        self.page(self.viewport_rows() / 2, -1);
    }

    pub fn full_page_down(&mut self) {
        self.page(self.viewport_rows(), 1);
    }

    pub fn full_page_up(&mut self) {
        self.page(self.viewport_rows(), -1);
    }

    /// Page moves scroll the diff and keep the cursor where it is on screen.
    fn page(&mut self, rows: usize, direction: isize) {
        let rows = rows.max(1) as isize * direction;
        match self.focus {
            PanelFocus::Diff => self.scroll_by(rows),
            _ if direction > 0 => self.scroll_down(rows.unsigned_abs()),
            _ => self.scroll_up(rows.unsigned_abs()),
        }
    }

    fn step_list(&mut self, delta: isize) {
        let len = self.session.order().len();
        if len == 0 {
            return;
        }
        let current = self.file_list_state.selected().unwrap_or(0);
        self.file_list_state.select(Some(current.saturating_add_signed(delta).min(len - 1)));
    }

    /// The file under the cursor becomes the current file.
    fn sync_current_file(&mut self) {
        let Some(target) = self.target_at(self.cursor_row()) else { return };
        let file = target.file().clone();
        self.session.select_file(&file);
        self.file_list_state.select(self.session.order().position(&file));
    }

    /// Scrolls so `file`'s header is at the top and makes it current.
    pub fn jump_to_file(&mut self, file: &FileRef) {
        self.session.select_file(file);
        self.file_list_state.select(self.session.order().position(file));
        self.relayout();
        let top = self.layout.extent(file).map_or(0, |e| e.top);
        self.cursor = 0;
        self.set_scroll(top);
        self.cursor = top.saturating_sub(self.scroll);
        self.clamp_scroll();
    }

    /// Jumps `delta` files forward or back in document order.
    pub fn step_file(&mut self, delta: isize) {
        if let Some(file) = self.session.step_file(delta) {
            self.jump_to_file(&file);
        }
    }

    /// Jumps the diff to the file highlighted in the file list.
    pub fn jump_to_list_selection(&mut self) {
        let file = self.file_list_state.selected().and_then(|ix| self.session.order().get(ix)).cloned();
        if let Some(file) = file {
            self.jump_to_file(&file);
            self.focus = PanelFocus::Diff;
        }
    }

    /// Switches between continuous and single-file layout.
    ///
    /// The session drops its cache; the current file's reload goes straight
    /// to the worker.
    pub fn toggle_layout(&mut self) {
        let mode = self.session.layout_mode().toggled();
        if let Some(batch) = self.session.switch_layout(mode) {
            self.send(DiffRequest::Load(batch));
        }
        self.anchor = None;
        match self.session.selected_file().cloned() {
            Some(file) => self.jump_to_file(&file),
            None => self.relayout(),
        }
    }

    // ------------------------------------------------------------------
    // Row targeting
    // ------------------------------------------------------------------

    /// What is drawn at document `row`.
    pub fn target_at(&self, row: usize) -> Option<RowTarget> {
        let (extent, offset) = self.layout.locate(row)?;
        let file = extent.file.clone();
        if offset == 0 {
            return Some(RowTarget::Header(file));
        }
        let Some(content) = self.session.cache_entry(&file) else {
            return Some(RowTarget::Filler(file));
        };
        if content.meta.binary || content.lines.is_empty() {
            return Some(RowTarget::Filler(file));
        }
        let rows = content.rows(|ix| self.session.section_expanded(&file, ix));
        match rows.get(offset - 1)? {
            Row::Line { entry, section } => Some(RowTarget::Line {
                old: entry.old_line(),
                new: entry.new_line(),
                section: *section,
                file,
            }),
            Row::Fold { section, .. } => Some(RowTarget::Fold { section: *section, file }),
        }
    }

    /// Document row and gutter column under a screen position in the diff panel.
    fn diff_hit(&self, col: u16, row: u16) -> Option<(usize, u16)> {
        let inner = self.panel_rects[1].inner(Margin { vertical: 1, horizontal: 1 });
        if !inner.contains(Position { x: col, y: row }) {
            return None;
        }
        Some((self.scroll + usize::from(row - inner.y), col - inner.x))
    }

    // ------------------------------------------------------------------
    // Selection input
    // ------------------------------------------------------------------

    /// Pointer pressed in the diff panel. A press on a fold toggles it.
    pub fn mouse_down(&mut self, col: u16, row: u16, shift: bool) {
        let Some((doc_row, x)) = self.diff_hit(col, row) else { return };
        self.focus = PanelFocus::Diff;
        self.cursor = doc_row - self.scroll;
        match self.target_at(doc_row) {
            Some(RowTarget::Fold { file, section }) => {
                self.session.select_file(&file);
                self.session.on_toggle_collapse(&file, section);
                self.relayout();
            }
            Some(target @ RowTarget::Line { .. }) => {
                let preferred = if x < OLD_GUTTER_END { Side::Old } else { Side::New };
                let side = target.side_for(preferred);
                self.cursor_side = side;
                self.session.on_line_mouse_down(target.line_on(side), side, target.file(), shift);
            }
            Some(other) => self.session.select_file(other.file()),
            None => {}
        }
        self.file_list_state.select(self.session.selected_file().and_then(|f| self.session.order().position(f)));
    }

    /// Pointer moved with the button held. Dragging past the panel edge
    /// scrolls one row.
    pub fn mouse_drag(&mut self, col: u16, row: u16) {
        if !self.session.is_dragging() {
            return;
        }
        let inner = self.panel_rects[1].inner(Margin { vertical: 1, horizontal: 1 });
        if inner.height == 0 {
            return;
        }
        if row < inner.y {
            self.scroll_by(-1);
        } else if row >= inner.bottom() {
            self.scroll_by(1);
        }
        let row = row.clamp(inner.y, inner.bottom() - 1);
        let col = col.clamp(inner.x, inner.right().saturating_sub(1));
        let Some((doc_row, _)) = self.diff_hit(col, row) else { return };
        self.cursor = doc_row - self.scroll;
        let Some(target @ RowTarget::Line { .. }) = self.target_at(doc_row) else { return };
        let side = self.session.selection().map_or(self.cursor_side, |s| s.side);
        self.session.on_line_mouse_enter(target.line_on(side), side, target.file());
    }

    pub fn mouse_up(&mut self) {
        self.session.on_line_mouse_up();
    }

    /// Keyboard equivalent of a click on the cursor row. On a fold it
    /// toggles the fold instead.
    pub fn click_at_cursor(&mut self, extend: bool) {
        match self.target_at(self.cursor_row()) {
            Some(RowTarget::Fold { file, section }) => {
                self.session.on_toggle_collapse(&file, section);
                self.relayout();
            }
            Some(target @ RowTarget::Line { .. }) => {
                let side = target.side_for(self.cursor_side);
                self.session.select_file(target.file());
                self.session.click_line(target.line_on(side), side, target.file(), extend);
            }
            _ => {}
        }
    }

    /// Moves the cursor and grows the selection to the new row.
    pub fn extend_cursor(&mut self, delta: isize) {
        self.move_cursor(delta);
        let Some(target @ RowTarget::Line { .. }) = self.target_at(self.cursor_row()) else { return };
        let side = self.session.selection().map_or_else(|| target.side_for(self.cursor_side), |s| s.side);
        self.session.extend_line(target.line_on(side), side, target.file());
    }

    pub fn flip_side(&mut self) {
        self.cursor_side = self.cursor_side.flip();
        self.status = Some(format!("selecting on the {} side", self.cursor_side.as_str()));
    }

    /// Toggles the fold under the cursor, or the expanded fold the cursor
    /// line came from.
    pub fn toggle_fold_at_cursor(&mut self) {
        match self.target_at(self.cursor_row()) {
            Some(RowTarget::Fold { file, section })
            | Some(RowTarget::Line { file, section: Some(section), .. }) => {
                self.session.on_toggle_collapse(&file, section);
                self.relayout();
            }
            _ => {}
        }
    }

    // ------------------------------------------------------------------
    // Comments
    // ------------------------------------------------------------------

    /// Enters Insert mode for the current selection.
    pub fn begin_comment(&mut self) {
        if self.session.selection().is_none() {
            self.status = Some("select lines before commenting".to_owned());
            return;
        }
        self.draft.clear();
        self.mode = Mode::Insert;
    }

    /// Leaves Insert mode and returns the selection and body to store, if
    /// the draft is not blank.
    pub fn take_comment(&mut self) -> Option<(Selection, String)> {
        self.mode = Mode::Normal;
        let body = self.draft.trim().to_owned();
        self.draft.clear();
        if body.is_empty() {
            return None;
        }
        let selection = self.session.selection()?.clone();
        Some((selection, body))
    }

    pub fn push_comment(&mut self, comment: Comment) {
        let at = self
            .comments
            .partition_point(|c| (&c.file_path, c.start_line) <= (&comment.file_path, comment.start_line));
        self.comments.insert(at, comment);
    }

    pub fn comments_for<'a>(&'a self, file: &'a FileRef) -> impl Iterator<Item = &'a Comment> + 'a {
        self.comments.iter().filter(move |c| c.file_path == file.as_str())
    }

    pub fn comment_count(&self) -> usize {
        self.comments.len()
    }

    /// Whether a stored comment covers `line` on `side` of `file`.
    pub fn has_comment(&self, file: &FileRef, line: Option<u32>, side: Side) -> bool {
        let Some(line) = line else { return false };
        self.comments_for(file).any(|c| c.side == side && (c.start_line..=c.end_line).contains(&line))
    }

    /// `path:start-end (side)` for the status bar.
    pub fn selection_label(&self) -> Option<String> {
        let s = self.session.selection()?;
        let range = if s.start_line == s.end_line {
            s.start_line.to_string()
        } else {
            format!("{}-{}", s.start_line, s.end_line)
        };
        Some(format!("{}:{} ({})", s.file, range, s.side.as_str()))
    }
}

/// Body rows reserved for a file before its content arrives: one per changed
/// line, so the document height barely moves when the diff lands.
fn placeholder_rows(summaries: &HashMap<FileRef, FileSummary>, file: &FileRef) -> usize {
    summaries.get(file).map_or(1, |s| s.changed().max(1))
}
