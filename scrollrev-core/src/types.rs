//! Shared data types for the diff content pipeline and the comment store.
//!
//! Everything here is fully owned and `Send` so values can travel from the
//! git worker thread to the main event loop without borrowing.

use std::fmt;
use std::sync::Arc;

/// Opaque identifier (repository-relative path) of a changed file.
///
/// Cheap to clone: the path is shared behind an `Arc<str>`. Ordering is plain
/// string order, used only for deterministic set iteration; document order
/// lives in [`crate::order::DocumentOrder`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileRef(Arc<str>);

impl FileRef {
    pub fn new(path: impl AsRef<str>) -> Self {
        Self(Arc::from(path.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File extension without the dot, if the path has one.
    pub fn extension(&self) -> Option<&str> {
        let name = self.0.rsplit('/').next()?;
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() { None } else { Some(ext) }
    }
}

impl fmt::Display for FileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FileRef {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for FileRef {
    fn from(path: String) -> Self {
        Self(Arc::from(path))
    }
}

/// Which side of a diff a line number belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Side {
    /// The pre-change file.
    Old,
    /// The post-change file.
    #[default]
    New,
}

impl Side {
    pub fn flip(self) -> Self {
        match self {
            Side::Old => Side::New,
            Side::New => Side::Old,
        }
    }

    /// Stable lowercase name used by the comment store.
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Old => "old",
            Side::New => "new",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "old" => Some(Side::Old),
            "new" => Some(Side::New),
            _ => None,
        }
    }
}

/// One entry of a shaped diff.
///
/// The variants encode which line numbers exist: added lines have only a new
/// number, removed lines only an old one, unchanged lines both, and a
/// collapsible fold carries none of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEntry {
    Unchanged { old: u32, new: u32, content: String },
    Added { new: u32, content: String },
    Removed { old: u32, content: String },
    /// A run of unchanged lines hidden behind a fold until expanded.
    Collapsible { hidden: Vec<LineEntry> },
}

impl LineEntry {
    pub fn old_line(&self) -> Option<u32> {
        match self {
            LineEntry::Unchanged { old, .. } | LineEntry::Removed { old, .. } => Some(*old),
            _ => None,
        }
    }

    pub fn new_line(&self) -> Option<u32> {
        match self {
            LineEntry::Unchanged { new, .. } | LineEntry::Added { new, .. } => Some(*new),
            _ => None,
        }
    }

    /// Line number on `side`, if this entry has one.
    pub fn line_on(&self, side: Side) -> Option<u32> {
        match side {
            Side::Old => self.old_line(),
            Side::New => self.new_line(),
        }
    }

    pub fn content(&self) -> Option<&str> {
        match self {
            LineEntry::Unchanged { content, .. }
            | LineEntry::Added { content, .. }
            | LineEntry::Removed { content, .. } => Some(content),
            LineEntry::Collapsible { .. } => None,
        }
    }

    /// Number of lines a fold hides; zero for ordinary lines.
    pub fn collapsed_count(&self) -> usize {
        match self {
            LineEntry::Collapsible { hidden } => hidden.len(),
            _ => 0,
        }
    }

    pub fn is_change(&self) -> bool {
        matches!(self, LineEntry::Added { .. } | LineEntry::Removed { .. })
    }
}

/// Per-file metadata carried alongside the shaped lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileMeta {
    /// Syntax name detected for the file, e.g. `"Rust"`.
    pub language: Option<String>,
    /// Size in bytes of the newer blob (or the older one for deletions).
    pub byte_size: u64,
    /// Binary files carry no lines; the renderer shows a banner instead.
    pub binary: bool,
    /// Added plus removed lines.
    pub changed_lines: usize,
}

/// The loaded and shaped diff for one file.
///
/// Never mutated after construction; a reload replaces the whole value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffContent {
    pub lines: Vec<LineEntry>,
    pub meta: FileMeta,
}

impl DiffContent {
    pub fn new(lines: Vec<LineEntry>, mut meta: FileMeta) -> Self {
        meta.changed_lines = count_changes(&lines);
        Self { lines, meta }
    }

    pub fn binary(byte_size: u64) -> Self {
        Self {
            lines: Vec::new(),
            meta: FileMeta { binary: true, byte_size, ..FileMeta::default() },
        }
    }

    /// Flattens the entries into display rows.
    ///
    /// A fold whose index satisfies `expanded` contributes its hidden lines,
    /// any other fold contributes a single [`Row::Fold`].
    pub fn rows<'a>(&'a self, expanded: impl Fn(usize) -> bool) -> Vec<Row<'a>> {
        let mut rows = Vec::with_capacity(self.lines.len());
        for (index, entry) in self.lines.iter().enumerate() {
            match entry {
                LineEntry::Collapsible { hidden } if expanded(index) => {
                    rows.extend(hidden.iter().map(|line| Row::Line { entry: line, section: Some(index) }));
                }
                LineEntry::Collapsible { hidden } => {
                    rows.push(Row::Fold { section: index, count: hidden.len() });
                }
                other => rows.push(Row::Line { entry: other, section: None }),
            }
        }
        rows
    }
}

fn count_changes(lines: &[LineEntry]) -> usize {
    lines.iter().filter(|l| l.is_change()).count()
}

/// A display row produced by [`DiffContent::rows`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Row<'a> {
    /// A real diff line; `section` is set when it came out of an expanded fold.
    Line { entry: &'a LineEntry, section: Option<usize> },
    /// A collapsed fold at entry index `section`.
    Fold { section: usize, count: usize },
}

/// A review session tied to a specific repository and diff mode.
///
/// Sessions are keyed by UUID v4 text; a later launch with the same
/// repository and mode resumes the most recent one.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub repo_path: String,
    pub diff_mode: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A comment attached to a line range on one side of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: String,
    pub session_id: String,
    pub file_path: String,
    pub side: Side,
    pub start_line: u32,
    pub end_line: u32,
    pub body: String,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unchanged(n: u32) -> LineEntry {
        LineEntry::Unchanged { old: n, new: n, content: format!("line {n}") }
    }

    #[test]
    fn line_numbers_follow_the_entry_kind() {
        let added = LineEntry::Added { new: 4, content: "x".into() };
        let removed = LineEntry::Removed { old: 7, content: "y".into() };
        assert_eq!((added.old_line(), added.new_line()), (None, Some(4)));
        assert_eq!((removed.old_line(), removed.new_line()), (Some(7), None));
        assert_eq!(unchanged(3).line_on(Side::Old), Some(3));
        let fold = LineEntry::Collapsible { hidden: vec![unchanged(1), unchanged(2)] };
        assert_eq!((fold.old_line(), fold.new_line()), (None, None));
        assert_eq!(fold.collapsed_count(), 2);
    }

    #[test]
    fn rows_expand_only_requested_sections() {
        let content = DiffContent::new(
            vec![
                LineEntry::Collapsible { hidden: vec![unchanged(1), unchanged(2), unchanged(3)] },
                LineEntry::Added { new: 4, content: "new".into() },
            ],
            FileMeta::default(),
        );
        assert_eq!(content.meta.changed_lines, 1);
        assert_eq!(content.rows(|_| false).len(), 2);
        let expanded = content.rows(|ix| ix == 0);
        assert_eq!(expanded.len(), 4);
        assert!(matches!(expanded[0], Row::Line { section: Some(0), .. }));
    }

    #[test]
    fn extension_ignores_dotfiles() {
        assert_eq!(FileRef::new("src/main.rs").extension(), Some("rs"));
        assert_eq!(FileRef::new(".gitignore").extension(), None);
        assert_eq!(FileRef::new("Makefile").extension(), None);
    }
}
