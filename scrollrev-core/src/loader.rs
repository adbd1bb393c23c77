//! Batched, de-duplicated diff content loading.
//!
//! The loader decides *what* to fetch; fetching itself happens wherever the
//! [`DiffSource`] lives (the git worker thread in the binary). A batch is at
//! most `batch_size` files, every member is marked in flight before the
//! batch leaves, and only one batch is outstanding at a time, which bounds
//! concurrent backend calls. Results come back as one [`BatchResult`] and are
//! merged in a single step.
//!
//! A file whose fetch failed sits out until the next visibility update
//! ([`ContentLoader::forget_failures`]) instead of being retried in a loop.
//!
//! Each [`ContentLoader::reset`] starts a new generation. Results stamped
//! with an older generation are stale and must be discarded.

use std::collections::{BTreeSet, HashSet};

use crate::cache::ContentCache;
use crate::error::LoadError;
use crate::order::DocumentOrder;
use crate::types::{DiffContent, FileRef};

/// Backend collaborator producing the change set and per-file content.
///
/// Implementations carry their own session context (repository, diff mode).
/// Calls block; callers run them off the UI task.
pub trait DiffSource {
    /// Changed files in document order.
    fn changed_files(&self) -> Result<Vec<FileRef>, LoadError>;

    fn load_diff(&self, file: &FileRef) -> Result<DiffContent, LoadError>;
}

/// Files handed to the backend in one go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadBatch {
    pub id: u64,
    pub generation: u64,
    pub files: Vec<FileRef>,
}

/// Outcome of every member of a [`LoadBatch`].
#[derive(Debug)]
pub struct BatchResult {
    pub id: u64,
    pub generation: u64,
    pub results: Vec<(FileRef, Result<DiffContent, LoadError>)>,
}

/// Runs every member of `batch` against `source`, in order.
pub fn fetch_batch(source: &dyn DiffSource, batch: &LoadBatch) -> BatchResult {
    let results = batch
        .files
        .iter()
        .map(|file| (file.clone(), source.load_diff(file)))
        .collect();
    BatchResult { id: batch.id, generation: batch.generation, results }
}

#[derive(Debug)]
pub struct ContentLoader {
    batch_size: usize,
    in_flight: HashSet<FileRef>,
    failed: HashSet<FileRef>,
    outstanding: Option<u64>,
    next_id: u64,
    generation: u64,
}

impl ContentLoader {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            in_flight: HashSet::new(),
            failed: HashSet::new(),
            outstanding: None,
            next_id: 0,
            generation: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_in_flight(&self, file: &FileRef) -> bool {
        self.in_flight.contains(file)
    }

    /// Files that should be fetched now, in priority order.
    ///
    /// That is the visible files and their neighbours, minus whatever is
    /// cached, in flight, or failed since the last visibility update.
    /// `priority` (the selected file) goes first when it is part of that
    /// set; then visible files, then neighbours, each in document order.
    pub fn queue(
        &self,
        visible: &BTreeSet<FileRef>,
        order: &DocumentOrder,
        cache: &ContentCache,
        priority: Option<&FileRef>,
    ) -> Vec<FileRef> {
        let wanted = order.with_neighbors(visible);
        let needed =
            |f: &FileRef| !cache.contains(f) && !self.in_flight.contains(f) && !self.failed.contains(f);

        let mut out: Vec<FileRef> = Vec::new();
        if let Some(p) = priority.filter(|p| wanted.contains(*p) && needed(*p)) {
            out.push(p.clone());
        }
        let (first, rest): (Vec<FileRef>, Vec<FileRef>) =
            order.sort(&wanted).into_iter().partition(|f| visible.contains(f));
        for file in first.into_iter().chain(rest) {
            if needed(&file) && !out.contains(&file) {
                out.push(file);
            }
        }
        out
    }

    /// Takes the next batch off `queue` and marks its members in flight.
    ///
    /// Returns `None` while a batch is outstanding or when nothing is queued.
    pub fn next_batch(&mut self, queue: &[FileRef]) -> Option<LoadBatch> {
        if self.outstanding.is_some() {
            return None;
        }
        let files: Vec<FileRef> = queue
            .iter()
            .filter(|f| !self.in_flight.contains(*f))
            .take(self.batch_size)
            .cloned()
            .collect();
        if files.is_empty() {
            return None;
        }
        Some(self.issue(files))
    }

    /// Builds a batch for exactly `file`, ignoring the outstanding limit.
    /// Used after a reset, when the selected file must load immediately.
    pub fn load_now(&mut self, file: &FileRef) -> LoadBatch {
        self.issue(vec![file.clone()])
    }

    fn issue(&mut self, files: Vec<FileRef>) -> LoadBatch {
        let id = self.next_id;
        self.next_id += 1;
        self.in_flight.extend(files.iter().cloned());
        self.outstanding = Some(id);
        tracing::debug!(batch = id, generation = self.generation, size = files.len(), "dispatching load batch");
        LoadBatch { id, generation: self.generation, files }
    }

    /// Clears the in-flight flags of a finished batch, success or not.
    ///
    /// Returns `false` when the batch belongs to an older generation; its
    /// results must then be dropped.
    pub fn complete(&mut self, result: &BatchResult) -> bool {
        if result.generation != self.generation {
            tracing::debug!(batch = result.id, "dropping stale batch result");
            return false;
        }
        for (file, outcome) in &result.results {
            self.in_flight.remove(file);
            if outcome.is_err() {
                self.failed.insert(file.clone());
            } else {
                self.failed.remove(file);
            }
        }
        if self.outstanding == Some(result.id) {
            self.outstanding = None;
        }
        true
    }

    /// Makes failed files eligible again. Called when a new visibility set
    /// is published.
    pub fn forget_failures(&mut self) {
        self.failed.clear();
    }

    /// Makes one failed file eligible again.
    pub fn forget_failure(&mut self, file: &FileRef) {
        self.failed.remove(file);
    }

    /// Forgets all in-flight work and starts a new generation.
    pub fn reset(&mut self) {
        self.in_flight.clear();
        self.failed.clear();
        self.outstanding = None;
        self.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(names: &[&str]) -> DocumentOrder {
        DocumentOrder::new(names.iter().map(|n| FileRef::new(n)).collect())
    }

    fn set(names: &[&str]) -> BTreeSet<FileRef> {
        names.iter().map(|n| FileRef::new(n)).collect()
    }

    fn names(files: &[FileRef]) -> Vec<&str> {
        files.iter().map(FileRef::as_str).collect()
    }

    #[test]
    fn visible_file_pulls_in_both_neighbors() {
        let loader = ContentLoader::new(3);
        let doc = order(&["A", "B", "C"]);
        let mut cache = ContentCache::new();
        let queue = loader.queue(&set(&["B"]), &doc, &cache, None);
        assert_eq!(names(&queue), ["B", "A", "C"]);

        cache.insert(FileRef::new("A"), DiffContent::default());
        let queue = loader.queue(&set(&["B"]), &doc, &cache, None);
        assert_eq!(names(&queue), ["B", "C"]);
    }

    #[test]
    fn batches_are_capped_and_never_overlap() {
        let mut loader = ContentLoader::new(3);
        let doc = order(&["a", "b", "c", "d", "e", "f"]);
        let cache = ContentCache::new();
        let queue = loader.queue(&set(&["b", "c", "d", "e"]), &doc, &cache, None);
        assert_eq!(queue.len(), 6);

        let batch = loader.next_batch(&queue).unwrap();
        assert_eq!(names(&batch.files), ["b", "c", "d"]);
        assert!(loader.next_batch(&queue).is_none(), "one batch at a time");

        // In-flight files never re-enter the queue.
        let again = loader.queue(&set(&["b", "c", "d", "e"]), &doc, &cache, None);
        assert_eq!(names(&again), ["e", "a", "f"]);

        let result = BatchResult {
            id: batch.id,
            generation: batch.generation,
            results: batch.files.iter().map(|f| (f.clone(), Err(LoadError::Backend("io".into())))).collect(),
        };
        assert!(loader.complete(&result));
        assert!(!loader.is_in_flight(&FileRef::new("b")));
        let after = loader.queue(&set(&["b", "c", "d", "e"]), &doc, &cache, None);
        assert_eq!(names(&after), ["e", "a", "f"], "failures wait for the next visibility update");
        loader.forget_failures();
        let retry = loader.queue(&set(&["b", "c", "d", "e"]), &doc, &cache, None);
        assert_eq!(retry.len(), 6);
        assert!(loader.next_batch(&retry).is_some());
    }

    #[test]
    fn priority_file_jumps_the_queue() {
        let loader = ContentLoader::new(3);
        let doc = order(&["a", "b", "c", "d"]);
        let queue = loader.queue(&set(&["b", "c"]), &doc, &ContentCache::new(), Some(&FileRef::new("d")));
        assert_eq!(names(&queue), ["d", "b", "c", "a"]);
    }

    #[test]
    fn reset_invalidates_outstanding_batches() {
        let mut loader = ContentLoader::new(3);
        let stale = loader.next_batch(&[FileRef::new("x")]).unwrap();
        loader.reset();
        assert!(!loader.is_in_flight(&FileRef::new("x")));
        let fresh = loader.load_now(&FileRef::new("x"));
        let stale_result = BatchResult { id: stale.id, generation: stale.generation, results: Vec::new() };
        assert!(!loader.complete(&stale_result));
        assert!(loader.is_in_flight(&FileRef::new("x")));
        assert_ne!(fresh.generation, stale.generation);
    }
}
