//! Drives a whole `ReviewSession` against an in-memory backend: viewport
//! observation, debounce, idle dispatch, batch merge, eviction and layout
//! switches.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::{Duration, Instant};

use scrollrev_core::config::Tunables;
use scrollrev_core::layout::LayoutMode;
use scrollrev_core::loader::{fetch_batch, DiffSource};
use scrollrev_core::session::ReviewSession;
use scrollrev_core::visibility::Viewport;
use scrollrev_core::{DiffContent, FileMeta, FileRef, LineEntry, LoadError, Side};

const PLACEHOLDER: usize = 9;

struct MemorySource {
    files: Vec<FileRef>,
    broken: HashSet<String>,
    fail_once: RefCell<HashSet<String>>,
    calls: RefCell<HashMap<String, usize>>,
}

impl MemorySource {
    fn new(names: &[&str]) -> Self {
        Self {
            files: names.iter().map(|n| FileRef::new(n)).collect(),
            broken: HashSet::new(),
            fail_once: RefCell::new(HashSet::new()),
            calls: RefCell::new(HashMap::new()),
        }
    }

    fn calls(&self, name: &str) -> usize {
        self.calls.borrow().get(name).copied().unwrap_or(0)
    }
}

impl DiffSource for MemorySource {
    fn changed_files(&self) -> Result<Vec<FileRef>, LoadError> {
        Ok(self.files.clone())
    }

    fn load_diff(&self, file: &FileRef) -> Result<DiffContent, LoadError> {
        *self.calls.borrow_mut().entry(file.to_string()).or_default() += 1;
        if self.broken.contains(file.as_str()) || self.fail_once.borrow_mut().remove(file.as_str()) {
            return Err(LoadError::Backend(format!("cannot read {file}")));
        }
        let lines = vec![
            LineEntry::Removed { old: 1, content: format!("old {file}") },
            LineEntry::Added { new: 1, content: format!("new {file}") },
        ];
        Ok(DiffContent::new(lines, FileMeta::default()))
    }
}

struct Harness {
    session: ReviewSession,
    source: MemorySource,
    now: Instant,
}

impl Harness {
    fn new(source: MemorySource, max_loaded_diffs: usize) -> Self {
        let tunables = Tunables {
            max_loaded_diffs,
            visibility_margin_rows: 0,
            debounce: Duration::from_millis(100),
            eviction_interval: Duration::from_secs(2),
            batch_size: 3,
        };
        let mut session = ReviewSession::new(tunables);
        session.set_files(source.changed_files().unwrap());
        Self { session, source, now: Instant::now() }
    }

    fn advance(&mut self, ms: u64) {
        self.now += Duration::from_millis(ms);
    }

    /// Shows rows `top..top + height`, waits out the debounce and publishes.
    fn scroll(&mut self, top: usize, height: usize) {
        let layout = self.session.layout(|_| PLACEHOLDER);
        self.session.observe_viewport(&layout, Viewport { top, height }, self.now);
        self.advance(100);
        self.session.tick(self.now);
    }

    /// Runs idle work and fetches until nothing is left to load.
    fn pump(&mut self) -> Vec<Vec<FileRef>> {
        let mut dispatched = Vec::new();
        loop {
            let batches = self.session.run_idle();
            if batches.is_empty() {
                return dispatched;
            }
            for batch in batches {
                assert!(batch.files.len() <= 3);
                dispatched.push(batch.files.clone());
                let result = fetch_batch(&self.source, &batch);
                self.session.apply_batch(result);
            }
        }
    }

    fn cached(&self) -> Vec<&str> {
        self.session
            .order()
            .files()
            .iter()
            .filter(|f| self.session.cache_entry(f).is_some())
            .map(FileRef::as_str)
            .collect()
    }
}

fn as_set(files: &[FileRef]) -> BTreeSet<&str> {
    files.iter().map(FileRef::as_str).collect()
}

#[test]
fn visible_file_and_both_neighbors_load_in_one_batch() {
    let mut h = Harness::new(MemorySource::new(&["A", "B", "C", "D"]), 20);
    // Each unloaded file is 10 rows tall; rows 10..15 lie inside B.
    h.scroll(10, 5);
    let names: Vec<&str> = h.session.visibility_set().iter().map(FileRef::as_str).collect();
    assert!(names.is_empty(), "flushed but not yet published");

    let dispatched = h.pump();
    assert_eq!(dispatched.len(), 1);
    assert_eq!(as_set(&dispatched[0]), BTreeSet::from(["A", "B", "C"]));
    assert_eq!(h.cached(), ["A", "B", "C"]);
    assert_eq!(h.source.calls("D"), 0);
}

#[test]
fn eviction_spares_selected_visible_and_neighbors() {
    let mut h = Harness::new(MemorySource::new(&["f1", "f2", "f3", "f4", "f5", "f6"]), 2);
    h.scroll(0, 1000);
    h.pump();
    assert_eq!(h.cached().len(), 6);

    // Loaded files are 3 rows each (header + two lines); show only f6.
    h.advance(100);
    h.scroll(15, 3);
    h.pump();
    let visible: Vec<&str> = h.session.visibility_set().iter().map(FileRef::as_str).collect();
    assert_eq!(visible, ["f6"]);

    h.advance(3000);
    let outcome = h.session.tick(h.now);
    let evicted: Vec<&str> = outcome.evicted.iter().map(FileRef::as_str).collect();
    assert_eq!(evicted, ["f2", "f3", "f4"]);
    // Keep-set {f1 selected, f6 visible, f5 neighbour} exceeds the cap of 2.
    assert_eq!(h.cached(), ["f1", "f5", "f6"]);
}

#[test]
fn keep_set_larger_than_cap_evicts_nothing() {
    let mut h = Harness::new(MemorySource::new(&["f1", "f2", "f3"]), 2);
    h.scroll(0, 1000);
    h.pump();
    h.advance(100);
    // Loaded files are 3 rows each: rows 6..9 are f3.
    h.scroll(6, 3);
    h.pump();
    h.advance(3000);
    h.session.tick(h.now);
    assert_eq!(h.session.selected_file().map(FileRef::as_str), Some("f1"));
    assert_eq!(h.cached(), ["f1", "f2", "f3"], "f2 survives as f3's neighbour");
}

#[test]
fn failed_neighbor_waits_for_the_next_visibility_update() {
    let source = MemorySource::new(&["A", "B", "C", "D", "E"]);
    source.fail_once.borrow_mut().insert("C".to_owned());
    let mut h = Harness::new(source, 20);

    h.scroll(10, 5);
    h.pump();
    assert_eq!(h.cached(), ["A", "B"]);
    assert!(h.session.load_error().is_none(), "C is not the current file");
    assert_eq!(h.source.calls("C"), 1, "no retry loop");

    // Scrolling on changes the published set; C is retried with the others.
    h.advance(100);
    h.scroll(23, 5);
    h.pump();
    assert_eq!(h.source.calls("C"), 2);
    assert!(h.cached().contains(&"C"));
}

#[test]
fn current_file_failure_is_shown_and_the_rest_stays_usable() {
    let mut source = MemorySource::new(&["A", "B", "C"]);
    source.broken.insert("A".to_owned());
    let mut h = Harness::new(source, 20);
    h.scroll(0, 12);
    h.pump();

    let err = h.session.load_error().expect("A is current");
    assert_eq!(err.file.as_str(), "A");
    assert!(err.message.contains("cannot read A"));
    assert_eq!(h.cached(), ["B", "C"]);

    let b = FileRef::new("B");
    h.session.on_line_mouse_down(Some(1), Side::New, &b, false);
    assert!(h.session.load_error().is_none(), "switching files dismisses the error");
    assert!(h.session.is_selected(&b, Some(1), Side::New));
}

#[test]
fn result_arriving_after_scrolling_away_is_still_cached() {
    let mut h = Harness::new(MemorySource::new(&["A", "B", "C", "D", "E", "F", "G"]), 20);
    h.scroll(10, 5);
    let batches = h.session.run_idle();
    assert_eq!(batches.len(), 1);

    // The user flies to the bottom before the fetch resolves.
    h.advance(50);
    h.scroll(65, 5);
    let result = fetch_batch(&h.source, &batches[0]);
    assert!(h.session.apply_batch(result));
    assert!(h.cached().starts_with(&["A", "B", "C"]));
}

#[test]
fn layout_switch_clears_cache_and_reloads_only_the_current_file() {
    let mut h = Harness::new(MemorySource::new(&["A", "B", "C"]), 20);
    h.scroll(0, 1000);
    h.pump();
    let a = FileRef::new("A");
    h.session.on_toggle_collapse(&a, 0);

    let batch = h.session.switch_layout(LayoutMode::SingleFile).expect("A is current");
    assert_eq!(batch.files, vec![a.clone()]);
    assert!(h.cached().is_empty());
    let result = fetch_batch(&h.source, &batch);
    h.session.apply_batch(result);
    assert_eq!(h.cached(), ["A"]);
    assert!(h.session.section_expanded(&a, 0), "fold state outlives the reset");
    assert!(h.session.switch_layout(LayoutMode::SingleFile).is_none(), "same mode is a no-op");
}

#[test]
fn selection_survives_cache_churn() {
    let mut h = Harness::new(MemorySource::new(&["x", "y"]), 20);
    let x = FileRef::new("x");
    h.session.on_line_mouse_down(Some(10), Side::New, &x, false);
    for line in [9, 7, 5, 3] {
        h.session.on_line_mouse_enter(Some(line), Side::New, &x);
    }
    h.session.on_line_mouse_up();
    h.scroll(0, 1000);
    h.pump();
    h.session.switch_layout(LayoutMode::SingleFile);
    let sel = h.session.selection().unwrap();
    assert_eq!((sel.start_line, sel.end_line, sel.side, sel.file.as_str()), (3, 10, Side::New, "x"));
    assert!(h.session.is_in_range(&x, Some(5)));
}

#[test]
fn stepping_through_single_file_layout_keeps_the_cache_bounded() {
    let names = ["f0", "f1", "f2", "f3", "f4", "f5", "f6", "f7"];
    let mut h = Harness::new(MemorySource::new(&names), 2);
    let batch = h.session.switch_layout(LayoutMode::SingleFile).expect("f0 is current");
    let result = fetch_batch(&h.source, &batch);
    h.session.apply_batch(result);

    for _ in 1..names.len() {
        h.scroll(0, 100);
        h.pump();
        assert_eq!(h.session.visibility_set().len(), 1, "only the current file is laid out");
        h.advance(3000);
        h.session.tick(h.now);
        assert!(h.cached().len() <= 3, "keep-set is the current file and its neighbours");
        h.session.step_file(1);
    }
    h.scroll(0, 100);
    h.pump();
    h.advance(3000);
    h.session.tick(h.now);

    let visible: Vec<&str> = h.session.visibility_set().iter().map(FileRef::as_str).collect();
    assert_eq!(visible, ["f7"]);
    assert_eq!(h.cached(), ["f6", "f7"]);
}

#[test]
fn visible_files_reload_after_a_layout_round_trip() {
    let mut h = Harness::new(MemorySource::new(&["A", "B", "C", "D"]), 20);
    h.scroll(0, 1000);
    h.pump();
    assert_eq!(h.cached(), ["A", "B", "C", "D"]);

    for mode in [LayoutMode::SingleFile, LayoutMode::Continuous] {
        let batch = h.session.switch_layout(mode).expect("A is current");
        let result = fetch_batch(&h.source, &batch);
        h.session.apply_batch(result);
    }
    assert_eq!(h.cached(), ["A"]);
    assert!(h.session.visibility_set().is_empty());

    // The same frame as before the switch must publish again.
    h.advance(100);
    h.scroll(0, 1000);
    h.pump();
    let visible: Vec<&str> = h.session.visibility_set().iter().map(FileRef::as_str).collect();
    assert_eq!(visible, ["A", "B", "C", "D"]);
    assert_eq!(h.cached(), ["A", "B", "C", "D"]);
}

#[test]
fn returning_to_a_failed_file_retries_it() {
    let mut source = MemorySource::new(&["A", "B", "C"]);
    source.broken.insert("A".to_owned());
    let mut h = Harness::new(source, 20);
    let batch = h.session.switch_layout(LayoutMode::SingleFile).expect("A is current");
    let result = fetch_batch(&h.source, &batch);
    h.session.apply_batch(result);
    h.scroll(0, 100);
    h.pump();
    assert_eq!(h.session.load_error().map(|e| e.file.as_str()), Some("A"));
    let attempts = h.source.calls("A");

    h.session.step_file(1);
    h.pump();
    assert!(h.session.load_error().is_none());

    // No viewport cycle in between: selecting A alone brings the error back.
    h.session.step_file(-1);
    h.pump();
    assert_eq!(h.source.calls("A"), attempts + 1);
    assert_eq!(h.session.load_error().map(|e| e.file.as_str()), Some("A"));
}
