//! Expanded/collapsed state of unchanged-line folds.
//!
//! Addressed by `(file, entry index)`. Replacing a file's content does not
//! touch this map: an index that no longer points at a fold simply matches
//! nothing.

use std::collections::{BTreeSet, HashMap};

use crate::types::FileRef;

#[derive(Debug, Clone, Default)]
pub struct ExpandedSections {
    by_file: HashMap<FileRef, BTreeSet<usize>>,
}

impl ExpandedSections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips the section; returns whether it is now expanded.
    pub fn toggle(&mut self, file: &FileRef, index: usize) -> bool {
        let set = self.by_file.entry(file.clone()).or_default();
        if set.remove(&index) {
            if set.is_empty() {
                self.by_file.remove(file);
            }
            false
        } else {
            set.insert(index);
            true
        }
    }

    pub fn has(&self, file: &FileRef, index: usize) -> bool {
        self.by_file.get(file).is_some_and(|set| set.contains(&index))
    }

    pub fn expanded(&self, file: &FileRef) -> Option<&BTreeSet<usize>> {
        self.by_file.get(file)
    }

    /// Drops every expansion for `file` so it reopens fully collapsed.
    pub fn clear_file(&mut self, file: &FileRef) {
        self.by_file.remove(file);
    }

    pub fn clear(&mut self) {
        self.by_file.clear();
    }
}
