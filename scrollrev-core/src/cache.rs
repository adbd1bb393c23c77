//! Keyed store of loaded diff content.
//!
//! Entries are shared behind `Arc` so renderers can hold a reference across a
//! frame while the cache keeps ownership. Each insert stamps the entry with a
//! monotonically increasing sequence number; "oldest" for eviction purposes
//! means lowest stamp, which keeps the choice deterministic.

use std::collections::HashMap;
use std::sync::Arc;

use crate::types::{DiffContent, FileRef};

#[derive(Debug)]
struct Slot {
    content: Arc<DiffContent>,
    seq: u64,
}

#[derive(Debug, Default)]
pub struct ContentCache {
    slots: HashMap<FileRef, Slot>,
    next_seq: u64,
}

impl ContentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, file: &FileRef) -> Option<&Arc<DiffContent>> {
        self.slots.get(file).map(|s| &s.content)
    }

    pub fn contains(&self, file: &FileRef) -> bool {
        self.slots.contains_key(file)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Inserts or wholesale-replaces the entry for `file`.
    ///
    /// A replacement counts as a fresh entry for age ordering.
    pub fn insert(&mut self, file: FileRef, content: DiffContent) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.slots.insert(file, Slot { content: Arc::new(content), seq });
    }

    pub fn remove(&mut self, file: &FileRef) -> Option<Arc<DiffContent>> {
        self.slots.remove(file).map(|s| s.content)
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Cached files, oldest first.
    pub fn oldest_first(&self) -> Vec<FileRef> {
        let mut entries: Vec<(&FileRef, u64)> = self.slots.iter().map(|(f, s)| (f, s.seq)).collect();
        entries.sort_by_key(|&(_, seq)| seq);
        entries.into_iter().map(|(f, _)| f.clone()).collect()
    }

    pub fn files(&self) -> impl Iterator<Item = &FileRef> {
        self.slots.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replacement_moves_entry_to_the_back() {
        let mut cache = ContentCache::new();
        for name in ["a", "b", "c"] {
            cache.insert(FileRef::new(name), DiffContent::default());
        }
        cache.insert(FileRef::new("a"), DiffContent::binary(9));
        let order: Vec<_> = cache.oldest_first().iter().map(|f| f.as_str().to_owned()).collect();
        assert_eq!(order, ["b", "c", "a"]);
        assert_eq!(cache.len(), 3);
        assert!(cache.get(&FileRef::new("a")).unwrap().meta.binary);
    }

    #[test]
    fn readers_keep_their_snapshot_after_replacement() {
        let mut cache = ContentCache::new();
        let f = FileRef::new("f");
        cache.insert(f.clone(), DiffContent::default());
        let held = Arc::clone(cache.get(&f).unwrap());
        cache.insert(f.clone(), DiffContent::binary(1));
        assert!(!held.meta.binary);
        assert!(cache.get(&f).unwrap().meta.binary);
    }
}
