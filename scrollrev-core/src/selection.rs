//! Line-range selection state machine.
//!
//! A selection covers an inclusive range of line numbers on one side of one
//! file. Clicks start, extend or toggle off a selection; drags only ever
//! widen it. Nothing here can fail: a row without a line number on the
//! queried side is simply "not selected".

use crate::types::{FileRef, Side};

/// An inclusive line range on one side of one file. `start_line <= end_line`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub start_line: u32,
    pub end_line: u32,
    pub side: Side,
    pub file: FileRef,
}

impl Selection {
    fn single(line: u32, side: Side, file: &FileRef) -> Self {
        Self { start_line: line, end_line: line, side, file: file.clone() }
    }

    fn scoped_to(&self, side: Side, file: &FileRef) -> bool {
        self.side == side && &self.file == file
    }

    pub fn contains(&self, line: u32) -> bool {
        (self.start_line..=self.end_line).contains(&line)
    }
}

/// Owns the current selection and the anchor used by shift-click.
#[derive(Debug, Clone, Default)]
pub struct SelectionEngine {
    current: Option<Selection>,
    anchor: Option<u32>,
}

impl SelectionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&Selection> {
        self.current.as_ref()
    }

    /// Handles a click on `line`.
    ///
    /// With `extend` (shift held) and a selection on the same side and file,
    /// the range becomes the span between the anchor and `line`. Otherwise a
    /// click inside the current range clears it, and any other click starts
    /// a fresh one-line selection anchored at `line`.
    pub fn click(&mut self, line: u32, side: Side, file: &FileRef, extend: bool) {
        if let Some(sel) = self.current.as_mut().filter(|s| s.scoped_to(side, file)) {
            if extend {
                let anchor = self.anchor.unwrap_or(sel.start_line);
                sel.start_line = anchor.min(line);
                sel.end_line = anchor.max(line);
                return;
            }
            if sel.contains(line) {
                self.clear();
                return;
            }
        }
        self.current = Some(Selection::single(line, side, file));
        self.anchor = Some(line);
    }

    /// Widens the selection to include `line` while dragging.
    ///
    /// Bounds are widened against the current range rather than the anchor,
    /// so the range only grows for the duration of a drag. A drag that
    /// crosses into another file or side starts over there.
    pub fn extend(&mut self, line: u32, side: Side, file: &FileRef) {
        match self.current.as_mut().filter(|s| s.scoped_to(side, file)) {
            Some(sel) => {
                sel.start_line = sel.start_line.min(line);
                sel.end_line = sel.end_line.max(line);
            }
            None => {
                self.current = Some(Selection::single(line, side, file));
                self.anchor = Some(line);
            }
        }
    }

    pub fn clear(&mut self) {
        self.current = None;
        self.anchor = None;
    }

    pub fn is_selected(&self, file: &FileRef, line: Option<u32>, side: Side) -> bool {
        match (&self.current, line) {
            (Some(sel), Some(line)) => sel.scoped_to(side, file) && sel.contains(line),
            _ => false,
        }
    }

    /// Like [`is_selected`](Self::is_selected) but ignores the side, for
    /// highlighting a range independently of which column has focus.
    pub fn is_in_range(&self, file: &FileRef, line: Option<u32>) -> bool {
        match (&self.current, line) {
            (Some(sel), Some(line)) => &sel.file == file && sel.contains(line),
            _ => false,
        }
    }
}
