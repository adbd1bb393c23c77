//! Periodic cache reclamation.
//!
//! The pass runs on a fixed interval rather than after each insert so a fast
//! scroll does not evict and refetch the same files over and over. Files in
//! the keep-set (visible, their neighbours, the selected file) are never
//! removed, even if that leaves the cache above its ceiling.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use crate::cache::ContentCache;
use crate::order::DocumentOrder;
use crate::types::FileRef;

#[derive(Debug)]
pub struct EvictionPolicy {
    max_loaded: usize,
    interval: Duration,
    next_run: Option<Instant>,
}

impl EvictionPolicy {
    pub fn new(max_loaded: usize, interval: Duration) -> Self {
        Self { max_loaded, interval, next_run: None }
    }

    pub fn max_loaded(&self) -> usize {
        self.max_loaded
    }

    /// Arms the timer if it is not running yet.
    pub fn start(&mut self, now: Instant) {
        self.next_run.get_or_insert(now + self.interval);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.next_run
    }

    /// Whether a pass is due at `now`; re-arms the timer when it is.
    pub fn due(&mut self, now: Instant) -> bool {
        match self.next_run {
            Some(at) if at <= now => {
                self.next_run = Some(now + self.interval);
                true
            }
            Some(_) => false,
            None => {
                self.start(now);
                false
            }
        }
    }

    /// Files protected from reclamation.
    pub fn keep_set(
        visible: &BTreeSet<FileRef>,
        order: &DocumentOrder,
        selected: Option<&FileRef>,
    ) -> BTreeSet<FileRef> {
        let mut keep = order.with_neighbors(visible);
        keep.extend(selected.cloned());
        keep
    }

    /// Removes the oldest unprotected entries until the cache is back at its
    /// ceiling. Returns the evicted files, oldest first.
    pub fn run(&self, cache: &mut ContentCache, keep: &BTreeSet<FileRef>) -> Vec<FileRef> {
        let excess = cache.len().saturating_sub(self.max_loaded);
        if excess == 0 {
            return Vec::new();
        }
        let victims: Vec<FileRef> = cache
            .oldest_first()
            .into_iter()
            .filter(|f| !keep.contains(f))
            .take(excess)
            .collect();
        for file in &victims {
            cache.remove(file);
        }
        if victims.len() < excess {
            tracing::debug!(
                kept = cache.len(),
                limit = self.max_loaded,
                "keep-set exceeds cache limit"
            );
        }
        victims
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DiffContent;

    fn order(names: &[&str]) -> DocumentOrder {
        DocumentOrder::new(names.iter().map(|n| FileRef::new(n)).collect())
    }

    fn filled(names: &[&str]) -> ContentCache {
        let mut cache = ContentCache::new();
        for name in names {
            cache.insert(FileRef::new(name), DiffContent::default());
        }
        cache
    }

    fn set(names: &[&str]) -> BTreeSet<FileRef> {
        names.iter().map(|n| FileRef::new(n)).collect()
    }

    fn cached(cache: &ContentCache) -> Vec<String> {
        let mut v: Vec<String> = cache.files().map(|f| f.to_string()).collect();
        v.sort();
        v
    }

    #[test]
    fn under_the_limit_is_a_no_op() {
        let policy = EvictionPolicy::new(3, Duration::from_secs(2));
        let mut cache = filled(&["a", "b", "c"]);
        assert!(policy.run(&mut cache, &BTreeSet::new()).is_empty());
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn removes_oldest_unprotected_entries() {
        let doc = order(&["a", "b", "c", "d", "e", "f"]);
        let policy = EvictionPolicy::new(3, Duration::from_secs(2));
        let mut cache = filled(&["a", "b", "c", "d", "e", "f"]);
        let keep = EvictionPolicy::keep_set(&set(&["f"]), &doc, Some(&FileRef::new("b")));
        let evicted = policy.run(&mut cache, &keep);
        let evicted: Vec<_> = evicted.iter().map(FileRef::as_str).collect();
        assert_eq!(evicted, ["a", "c", "d"]);
        assert_eq!(cached(&cache), ["b", "e", "f"]);
    }

    #[test]
    fn selected_visible_and_neighbor_survive_a_tight_cap() {
        let doc = order(&["f1", "f2", "f3"]);
        let policy = EvictionPolicy::new(2, Duration::from_secs(2));
        let mut cache = filled(&["f1", "f2", "f3"]);
        let keep = EvictionPolicy::keep_set(&set(&["f3"]), &doc, Some(&FileRef::new("f1")));
        policy.run(&mut cache, &keep);
        // f2 is protected as f3's neighbour, so the cap cannot be met safely.
        assert_eq!(cached(&cache), ["f1", "f2", "f3"]);
    }

    #[test]
    fn non_neighbor_is_dropped_while_protected_files_stay() {
        let doc = order(&["f1", "f2", "f3", "f4", "f5"]);
        let policy = EvictionPolicy::new(2, Duration::from_secs(2));
        let mut cache = filled(&["f1", "f2", "f5", "f4"]);
        let keep = EvictionPolicy::keep_set(&set(&["f5"]), &doc, Some(&FileRef::new("f1")));
        policy.run(&mut cache, &keep);
        assert_eq!(cached(&cache), ["f1", "f4", "f5"]);
    }

    #[test]
    fn timer_rearms_after_each_pass() {
        let t0 = Instant::now();
        let mut policy = EvictionPolicy::new(2, Duration::from_secs(2));
        assert!(!policy.due(t0));
        assert!(!policy.due(t0 + Duration::from_millis(1999)));
        assert!(policy.due(t0 + Duration::from_secs(2)));
        assert_eq!(policy.deadline(), Some(t0 + Duration::from_secs(4)));
    }
}
