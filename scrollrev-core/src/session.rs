//! Review session controller.
//!
//! `ReviewSession` owns the whole content pipeline (visibility tracker,
//! loader, cache, eviction policy) alongside the selection engine and the
//! expanded-section map. Everything is mutated from one task, one step at a
//! time, so no locking is involved; the only asynchronous part is the
//! backend fetch, whose results come back through [`ReviewSession::apply_batch`].
//!
//! The host drives it with three calls:
//!
//! 1. [`observe_viewport`](ReviewSession::observe_viewport) after laying out
//!    a frame;
//! 2. [`tick`](ReviewSession::tick) on a timer (debounce flush, eviction);
//! 3. [`run_idle`](ReviewSession::run_idle) whenever input is quiet, which
//!    returns load batches to hand to the backend.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use crate::cache::ContentCache;
use crate::config::Tunables;
use crate::eviction::EvictionPolicy;
use crate::layout::{DocumentLayout, LayoutMode};
use crate::loader::{BatchResult, ContentLoader, LoadBatch};
use crate::order::DocumentOrder;
use crate::scheduler::{IdleQueue, IdleTask};
use crate::sections::ExpandedSections;
use crate::selection::{Selection, SelectionEngine};
use crate::types::{DiffContent, FileRef, Side};
use crate::visibility::{Proximity, Viewport, VisibilityTracker};

/// A failed load of the file the user is looking at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadErrorState {
    pub file: FileRef,
    pub message: String,
}

/// What a [`ReviewSession::tick`] did, for logging and redraw decisions.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    pub visibility_flushed: bool,
    pub evicted: Vec<FileRef>,
}

#[derive(Debug)]
pub struct ReviewSession {
    order: DocumentOrder,
    cache: ContentCache,
    visibility: VisibilityTracker,
    loader: ContentLoader,
    eviction: EvictionPolicy,
    idle: IdleQueue,
    selection: SelectionEngine,
    sections: ExpandedSections,
    selected_file: Option<FileRef>,
    load_error: Option<LoadErrorState>,
    dragging: bool,
    layout_mode: LayoutMode,
}

impl ReviewSession {
    pub fn new(tunables: Tunables) -> Self {
        Self {
            order: DocumentOrder::default(),
            cache: ContentCache::new(),
            visibility: VisibilityTracker::new(tunables.visibility_margin_rows, tunables.debounce),
            loader: ContentLoader::new(tunables.batch_size),
            eviction: EvictionPolicy::new(tunables.max_loaded_diffs, tunables.eviction_interval),
            idle: IdleQueue::new(),
            selection: SelectionEngine::new(),
            sections: ExpandedSections::new(),
            selected_file: None,
            load_error: None,
            dragging: false,
            layout_mode: LayoutMode::default(),
        }
    }

    // ------------------------------------------------------------------
    // Change set and current file
    // ------------------------------------------------------------------

    /// Installs a new change set in document order.
    ///
    /// Cached content and visibility for files that left the set are
    /// dropped; the current file falls back to the first file if it left.
    pub fn set_files(&mut self, files: Vec<FileRef>) {
        self.order = DocumentOrder::new(files);
        let gone: Vec<FileRef> = self.cache.files().filter(|f| !self.order.contains(f)).cloned().collect();
        for file in &gone {
            self.cache.remove(file);
            self.sections.clear_file(file);
        }
        self.visibility.retain(&self.order);
        let stale_selection = self.selection.current().is_some_and(|s| !self.order.contains(&s.file));
        if stale_selection {
            self.selection.clear();
        }
        let keep_current = self.selected_file.as_ref().is_some_and(|f| self.order.contains(f));
        if !keep_current {
            self.selected_file = self.order.get(0).cloned();
            self.load_error = None;
        }
        tracing::info!(files = self.order.len(), dropped = gone.len(), "change set updated");
        self.idle.push(IdleTask::DispatchLoads);
    }

    pub fn order(&self) -> &DocumentOrder {
        &self.order
    }

    pub fn selected_file(&self) -> Option<&FileRef> {
        self.selected_file.as_ref()
    }

    /// Makes `file` the current file. An error shown for another file goes away.
    pub fn select_file(&mut self, file: &FileRef) {
        if !self.order.contains(file) || self.selected_file.as_ref() == Some(file) {
            return;
        }
        self.selected_file = Some(file.clone());
        if self.load_error.as_ref().is_some_and(|e| &e.file != file) {
            self.load_error = None;
        }
        // Coming back to a file that failed in the background retries it.
        self.loader.forget_failure(file);
        self.idle.push(IdleTask::DispatchLoads);
    }

    /// Moves the current file by `delta` positions in document order.
    pub fn step_file(&mut self, delta: isize) -> Option<FileRef> {
        if self.order.is_empty() {
            return None;
        }
        let current = self.selected_file.as_ref().and_then(|f| self.order.position(f)).unwrap_or(0);
        let last = self.order.len() - 1;
        let target = current.saturating_add_signed(delta).min(last);
        let file = self.order.get(target)?.clone();
        self.select_file(&file);
        Some(file)
    }

    // ------------------------------------------------------------------
    // Read API for renderers
    // ------------------------------------------------------------------

    pub fn cache_entry(&self, file: &FileRef) -> Option<&Arc<DiffContent>> {
        self.cache.get(file)
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    pub fn visibility_set(&self) -> &BTreeSet<FileRef> {
        self.visibility.published()
    }

    pub fn proximity(&self, file: &FileRef) -> Proximity {
        self.visibility.classify(file, &self.order)
    }

    pub fn is_loading(&self, file: &FileRef) -> bool {
        self.loader.is_in_flight(file)
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.current()
    }

    pub fn is_selected(&self, file: &FileRef, line: Option<u32>, side: Side) -> bool {
        self.selection.is_selected(file, line, side)
    }

    pub fn is_in_range(&self, file: &FileRef, line: Option<u32>) -> bool {
        self.selection.is_in_range(file, line)
    }

    pub fn section_expanded(&self, file: &FileRef, index: usize) -> bool {
        self.sections.has(file, index)
    }

    pub fn load_error(&self) -> Option<&LoadErrorState> {
        self.load_error.as_ref()
    }

    pub fn layout_mode(&self) -> LayoutMode {
        self.layout_mode
    }

    /// Rows `file` occupies: a header plus its body. Files without content
    /// use `placeholder` body rows so the layout is stable before loading.
    pub fn file_height(&self, file: &FileRef, placeholder: usize) -> usize {
        let body = match self.cache.get(file) {
            Some(content) if content.meta.binary || content.lines.is_empty() => 1,
            Some(content) => content.rows(|ix| self.sections.has(file, ix)).len(),
            None if self.load_error.as_ref().is_some_and(|e| &e.file == file) => 1,
            None => placeholder.max(1),
        };
        1 + body
    }

    /// Lays out the document for the current mode.
    pub fn layout(&self, placeholder: impl Fn(&FileRef) -> usize) -> DocumentLayout {
        DocumentLayout::build(self.layout_mode, &self.order, self.selected_file.as_ref(), |f| {
            self.file_height(f, placeholder(f))
        })
    }

    // ------------------------------------------------------------------
    // Input API
    // ------------------------------------------------------------------

    /// Pointer pressed on a line. `line` is `None` for rows without a number
    /// on `side`, which leaves the selection alone.
    pub fn on_line_mouse_down(&mut self, line: Option<u32>, side: Side, file: &FileRef, shift: bool) {
        self.select_file(file);
        let Some(line) = line else { return };
        self.dragging = true;
        self.selection.click(line, side, file, shift);
    }

    /// Pointer moved onto a line while a button may be held.
    pub fn on_line_mouse_enter(&mut self, line: Option<u32>, side: Side, file: &FileRef) {
        if !self.dragging {
            return;
        }
        if let Some(line) = line {
            self.selection.extend(line, side, file);
        }
    }

    pub fn on_line_mouse_up(&mut self) {
        self.dragging = false;
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Keyboard click at `line`, same rules as a pointer click.
    pub fn click_line(&mut self, line: Option<u32>, side: Side, file: &FileRef, extend: bool) {
        if let Some(line) = line {
            self.selection.click(line, side, file, extend);
        }
    }

    /// Keyboard range growth, same rules as a drag.
    pub fn extend_line(&mut self, line: Option<u32>, side: Side, file: &FileRef) {
        if let Some(line) = line {
            self.selection.extend(line, side, file);
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Flips a fold; returns whether it is now expanded.
    pub fn on_toggle_collapse(&mut self, file: &FileRef, index: usize) -> bool {
        self.sections.toggle(file, index)
    }

    // ------------------------------------------------------------------
    // Pipeline
    // ------------------------------------------------------------------

    /// Feeds the extents of the frame just laid out into the visibility tracker.
    pub fn observe_viewport(&mut self, layout: &DocumentLayout, viewport: Viewport, now: Instant) {
        self.visibility.observe(layout.extents(), viewport, now);
    }

    /// Timer step: flushes due visibility changes onto the idle queue and
    /// runs the eviction pass when its interval has elapsed.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        if let Some(set) = self.visibility.flush(now) {
            self.idle.push(IdleTask::PublishVisibility(set));
            outcome.visibility_flushed = true;
        }
        if self.eviction.due(now) {
            outcome.evicted = self.evict();
        }
        outcome
    }

    /// Runs one eviction pass against the most recently published set.
    pub fn evict(&mut self) -> Vec<FileRef> {
        let keep = EvictionPolicy::keep_set(self.visibility.published(), &self.order, self.selected_file.as_ref());
        let evicted = self.eviction.run(&mut self.cache, &keep);
        for file in &evicted {
            self.sections.clear_file(file);
        }
        if !evicted.is_empty() {
            tracing::debug!(evicted = evicted.len(), cached = self.cache.len(), "eviction pass");
        }
        evicted
    }

    pub fn has_idle_work(&self) -> bool {
        !self.idle.is_empty()
    }

    /// Drains the idle queue. Returns the batches the host must fetch.
    pub fn run_idle(&mut self) -> Vec<LoadBatch> {
        let mut batches = Vec::new();
        while let Some(task) = self.idle.pop() {
            match task {
                IdleTask::PublishVisibility(set) => {
                    self.visibility.publish(set);
                    self.loader.forget_failures();
                    self.idle.push(IdleTask::DispatchLoads);
                }
                IdleTask::DispatchLoads => {
                    let queue = self.loader.queue(
                        self.visibility.published(),
                        &self.order,
                        &self.cache,
                        self.selected_file.as_ref(),
                    );
                    batches.extend(self.loader.next_batch(&queue));
                }
            }
        }
        batches
    }

    /// Merges a finished batch into the cache in one step.
    ///
    /// Failures of the current file become the visible error state; other
    /// failures are logged and retried after the next visibility update. Returns
    /// `false` for stale results from before a reset.
    pub fn apply_batch(&mut self, result: BatchResult) -> bool {
        if !self.loader.complete(&result) {
            return false;
        }
        for (file, outcome) in result.results {
            let is_current = self.selected_file.as_ref() == Some(&file);
            match outcome {
                Ok(content) => {
                    if is_current {
                        self.load_error = None;
                    }
                    self.cache.insert(file, content);
                }
                Err(err) if is_current => {
                    tracing::error!(file = %file, "loading current file failed: {err}");
                    self.load_error = Some(LoadErrorState { file, message: err.to_string() });
                }
                Err(err) => {
                    tracing::warn!(file = %file, "load failed, will retry when visible: {err}");
                }
            }
        }
        self.idle.push(IdleTask::DispatchLoads);
        true
    }

    /// Switches between continuous and single-file layout.
    ///
    /// Drops every cached entry and all in-flight work, then returns the
    /// batch that reloads the current file right away.
    pub fn switch_layout(&mut self, mode: LayoutMode) -> Option<LoadBatch> {
        if mode == self.layout_mode {
            return None;
        }
        self.layout_mode = mode;
        self.cache.clear();
        self.loader.reset();
        self.visibility.reset();
        self.load_error = None;
        tracing::info!(?mode, "layout switched, cache reset");
        let file = self.selected_file.clone()?;
        Some(self.loader.load_now(&file))
    }
}
