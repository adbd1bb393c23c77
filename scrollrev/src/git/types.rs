//! Owned data types exchanged with the git background thread.
//!
//! Everything here is fully owned and `Send` so it can travel from the thread
//! that owns the `git2::Repository` to the main event loop.

use scrollrev_core::loader::LoadBatch;
use scrollrev_core::FileRef;

/// Per-file statistics for the file-list panel and placeholder sizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSummary {
    pub file: FileRef,
    /// Status character: `'M'` modified, `'A'` added, `'D'` deleted, `'R'` renamed.
    pub status: char,
    pub added: usize,
    pub removed: usize,
}

impl FileSummary {
    /// Added plus removed lines.
    pub fn changed(&self) -> usize {
        self.added + self.removed
    }
}

/// Which comparison the review session is looking at.
///
/// The default is `Unstaged` (working directory vs index).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DiffMode {
    /// Working directory vs index (`git diff`).
    #[default]
    Unstaged,
    /// Index vs HEAD (`git diff --cached`).
    Staged,
    /// Merge base of `base` and HEAD vs HEAD (`git diff base...HEAD`).
    Branch { base: String },
    /// Two explicit revisions (`git diff from..to`).
    Range { from: String, to: String },
}

impl DiffMode {
    /// Stable key used to resume comment sessions, e.g. `"branch:main"`.
    pub fn label(&self) -> String {
        match self {
            DiffMode::Unstaged => "unstaged".to_owned(),
            DiffMode::Staged => "staged".to_owned(),
            DiffMode::Branch { base } => format!("branch:{base}"),
            DiffMode::Range { from, to } => format!("range:{from}..{to}"),
        }
    }
}

/// Commands sent from the main thread to the git worker.
#[derive(Debug)]
pub enum DiffRequest {
    /// Recompute the change set.
    ChangedFiles,
    /// Fetch every file of a batch and answer with one result.
    Load(LoadBatch),
}
