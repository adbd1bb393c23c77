//! Document order of the changed files.
//!
//! The backend's changed-file list fixes the order files are stacked in.
//! "Neighbours" of a file are its immediate predecessor and successor in that
//! order; they are prefetched and protected from eviction together with the
//! visible files.

use std::collections::{BTreeSet, HashMap};

use crate::types::FileRef;

#[derive(Debug, Clone, Default)]
pub struct DocumentOrder {
    files: Vec<FileRef>,
    index: HashMap<FileRef, usize>,
}

impl DocumentOrder {
    pub fn new(files: Vec<FileRef>) -> Self {
        let index = files.iter().enumerate().map(|(i, f)| (f.clone(), i)).collect();
        Self { files, index }
    }

    pub fn files(&self) -> &[FileRef] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn position(&self, file: &FileRef) -> Option<usize> {
        self.index.get(file).copied()
    }

    pub fn get(&self, ix: usize) -> Option<&FileRef> {
        self.files.get(ix)
    }

    pub fn contains(&self, file: &FileRef) -> bool {
        self.index.contains_key(file)
    }

    /// Immediate predecessor and successor of `file`, where they exist.
    pub fn neighbors(&self, file: &FileRef) -> impl Iterator<Item = &FileRef> {
        let (before, after) = match self.position(file) {
            Some(ix) => (ix.checked_sub(1).and_then(|p| self.files.get(p)), self.files.get(ix + 1)),
            None => (None, None),
        };
        before.into_iter().chain(after)
    }

    /// `files` plus the neighbours of each member.
    pub fn with_neighbors<'a>(&self, files: impl IntoIterator<Item = &'a FileRef>) -> BTreeSet<FileRef> {
        let mut out = BTreeSet::new();
        for file in files {
            out.extend(self.neighbors(file).cloned());
            out.insert(file.clone());
        }
        out
    }

    /// Sorts `files` into document order; unknown files go last.
    pub fn sort<'a>(&self, files: impl IntoIterator<Item = &'a FileRef>) -> Vec<FileRef> {
        let mut out: Vec<FileRef> = files.into_iter().cloned().collect();
        out.sort_by_key(|f| self.position(f).unwrap_or(usize::MAX));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(names: &[&str]) -> DocumentOrder {
        DocumentOrder::new(names.iter().map(|n| FileRef::new(n)).collect())
    }

    #[test]
    fn neighbors_stop_at_the_edges() {
        let doc = order(&["a", "b", "c"]);
        let mid: Vec<_> = doc.neighbors(&FileRef::new("b")).map(FileRef::as_str).collect();
        assert_eq!(mid, ["a", "c"]);
        let first: Vec<_> = doc.neighbors(&FileRef::new("a")).map(FileRef::as_str).collect();
        assert_eq!(first, ["b"]);
        assert_eq!(doc.neighbors(&FileRef::new("zz")).count(), 0);
    }

    #[test]
    fn with_neighbors_includes_the_files_themselves() {
        let doc = order(&["a", "b", "c", "d", "e"]);
        let set = doc.with_neighbors([&FileRef::new("a"), &FileRef::new("e")]);
        let names: Vec<_> = set.iter().map(FileRef::as_str).collect();
        assert_eq!(names, ["a", "b", "d", "e"]);
    }
}
