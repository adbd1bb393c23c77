//! Viewport visibility tracking.
//!
//! Each render produces the row extent of every file in the stacked
//! document. [`VisibilityTracker::observe`] turns those extents into per-file
//! "intersects the viewport plus margin" signals, but only *changes* are
//! recorded, into a pending map. Once the debounce window has elapsed since
//! the first pending change, [`VisibilityTracker::flush`] folds the whole map
//! into a new visibility set in one step. The caller publishes that set
//! (usually from the idle queue) with [`VisibilityTracker::publish`]; the
//! loader and the eviction pass only ever see published sets.

use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};

use crate::order::DocumentOrder;
use crate::types::FileRef;

/// Rows occupied by one file in the stacked document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileExtent {
    pub file: FileRef,
    pub top: usize,
    pub height: usize,
}

impl FileExtent {
    fn overlaps(&self, start: usize, end: usize) -> bool {
        self.top < end && start < self.top + self.height
    }
}

/// The visible window into the document, in rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub top: usize,
    pub height: usize,
}

/// How close a file is to being on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Proximity {
    /// Intersects the bare viewport.
    Visible,
    /// Inside the prefetch margin, or a neighbour of a visible file.
    Buffered,
    Far,
}

#[derive(Debug)]
pub struct VisibilityTracker {
    margin: usize,
    debounce: Duration,
    /// Last raw signal per file; events that repeat it are dropped.
    raw: HashMap<FileRef, bool>,
    pending: HashMap<FileRef, bool>,
    pending_since: Option<Instant>,
    /// Intersecting set after the most recent flush.
    flushed: BTreeSet<FileRef>,
    published: BTreeSet<FileRef>,
    on_screen: BTreeSet<FileRef>,
}

impl VisibilityTracker {
    pub fn new(margin: usize, debounce: Duration) -> Self {
        Self {
            margin,
            debounce,
            raw: HashMap::new(),
            pending: HashMap::new(),
            pending_since: None,
            flushed: BTreeSet::new(),
            published: BTreeSet::new(),
            on_screen: BTreeSet::new(),
        }
    }

    /// Records intersection signals for every extent against `viewport`.
    ///
    /// The bare on-screen set used for classification updates immediately;
    /// the margin-extended signal goes through the debounce.
    pub fn observe(&mut self, extents: &[FileExtent], viewport: Viewport, now: Instant) {
        let start = viewport.top.saturating_sub(self.margin);
        let end = viewport.top + viewport.height + self.margin;
        let screen_end = viewport.top + viewport.height;

        self.on_screen = extents
            .iter()
            .filter(|e| e.overlaps(viewport.top, screen_end))
            .map(|e| e.file.clone())
            .collect();

        for extent in extents {
            self.record(&extent.file, extent.overlaps(start, end), now);
        }
        // Files no longer laid out (single-file layout) stop intersecting.
        let gone: Vec<FileRef> = self
            .raw
            .iter()
            .filter(|&(file, &intersecting)| intersecting && !extents.iter().any(|e| &e.file == file))
            .map(|(file, _)| file.clone())
            .collect();
        for file in &gone {
            self.record(file, false, now);
        }
    }

    /// Records one raw intersection event.
    pub fn record(&mut self, file: &FileRef, intersecting: bool, now: Instant) {
        let previous = self.raw.insert(file.clone(), intersecting).unwrap_or(false);
        if previous == intersecting {
            return;
        }
        self.pending.insert(file.clone(), intersecting);
        self.pending_since.get_or_insert(now);
    }

    /// When the pending batch becomes due, if there is one.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending_since.map(|since| since + self.debounce)
    }

    /// Folds the pending map into a new visibility set once the debounce
    /// window has elapsed. Returns `None` while nothing is due.
    pub fn flush(&mut self, now: Instant) -> Option<BTreeSet<FileRef>> {
        if self.deadline()? > now {
            return None;
        }
        self.pending_since = None;
        for (file, intersecting) in self.pending.drain() {
            if intersecting {
                self.flushed.insert(file);
            } else {
                self.flushed.remove(&file);
            }
        }
        tracing::trace!(visible = self.flushed.len(), "visibility flush");
        Some(self.flushed.clone())
    }

    /// Makes `set` the visibility set observed by the rest of the pipeline.
    pub fn publish(&mut self, set: BTreeSet<FileRef>) {
        self.published = set;
    }

    pub fn published(&self) -> &BTreeSet<FileRef> {
        &self.published
    }

    pub fn on_screen(&self) -> &BTreeSet<FileRef> {
        &self.on_screen
    }

    pub fn classify(&self, file: &FileRef, order: &DocumentOrder) -> Proximity {
        if self.on_screen.contains(file) {
            return Proximity::Visible;
        }
        let near_visible = order.neighbors(file).any(|n| self.on_screen.contains(n));
        if self.published.contains(file) || near_visible {
            Proximity::Buffered
        } else {
            Proximity::Far
        }
    }

    /// Forgets every signal and set, as if nothing had been observed yet.
    pub fn reset(&mut self) {
        self.raw.clear();
        self.pending.clear();
        self.pending_since = None;
        self.flushed.clear();
        self.published.clear();
        self.on_screen.clear();
    }

    /// Forgets files that left the change set.
    pub fn retain(&mut self, order: &DocumentOrder) {
        self.raw.retain(|f, _| order.contains(f));
        self.pending.retain(|f, _| order.contains(f));
        self.flushed.retain(|f| order.contains(f));
        self.published.retain(|f| order.contains(f));
        self.on_screen.retain(|f| order.contains(f));
        if self.pending.is_empty() {
            self.pending_since = None;
        }
    }
}
