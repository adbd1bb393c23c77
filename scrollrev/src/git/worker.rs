//! Background thread that owns `git2::Repository` for its lifetime.
//!
//! `git2::Repository` is `!Send`, so it is opened inside the thread, never
//! passed in. All communication is via channels: [`DiffRequest`] in,
//! `AppEvent::ChangedFiles` / `AppEvent::BatchLoaded` out.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use crossbeam_channel::Receiver;
use git2::{Delta, Diff, DiffOptions, ErrorCode, Patch, Repository, Tree};
use tokio::sync::mpsc::UnboundedSender;

use scrollrev_core::config::Config;
use scrollrev_core::diff::{shape_lines, RawKind, RawLine};
use scrollrev_core::loader::{fetch_batch, DiffSource};
use scrollrev_core::{DiffContent, FileMeta, FileRef, LoadError};

use crate::event::AppEvent;
use crate::git::types::{DiffMode, DiffRequest, FileSummary};
use crate::highlight;

/// Context requested for per-file diffs: large enough that one hunk spans
/// the whole file, so folding sees every unchanged line.
const FULL_CONTEXT: u32 = 1_000_000;

/// Limits and shaping parameters for per-file loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceOptions {
    pub max_file_bytes: u64,
    pub context_lines: usize,
    pub min_collapse: usize,
}

impl SourceOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_file_bytes: config.loader.max_file_bytes,
            context_lines: config.diff.context_lines,
            min_collapse: config.diff.min_collapse,
        }
    }
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Entry point for the background thread.
///
/// Opens the repository containing `path` and serves requests until the
/// channel closes. If the repository cannot be opened, the failure is
/// reported once as a change-set error and the thread exits.
pub fn git_worker_loop(
    path: PathBuf,
    mode: DiffMode,
    options: SourceOptions,
    rx: Receiver<DiffRequest>,
    event_tx: UnboundedSender<AppEvent>,
) {
    // Warm the syntect statics off the UI thread.
    let _ = &*highlight::SYNTAXES;

    let source = match GitSource::open(&path, mode, options) {
        Ok(source) => source,
        Err(err) => {
            tracing::error!(path = %path.display(), "cannot open repository: {err}");
            let _ = event_tx.send(AppEvent::ChangedFiles(Err(LoadError::Backend(err.message().to_owned()))));
            return;
        }
    };

    for request in rx {
        let event = match request {
            DiffRequest::ChangedFiles => AppEvent::ChangedFiles(source.summaries()),
            DiffRequest::Load(batch) => {
                tracing::debug!(batch = batch.id, files = batch.files.len(), "fetching batch");
                AppEvent::BatchLoaded(Box::new(fetch_batch(&source, &batch)))
            }
        };
        if event_tx.send(event).is_err() {
            break;
        }
    }
    tracing::debug!("git worker exiting");
}

/// [`DiffSource`] over a git repository and one [`DiffMode`].
pub struct GitSource {
    repo: Repository,
    mode: DiffMode,
    options: SourceOptions,
}

impl GitSource {
    /// Opens the repository that contains `path`.
    ///
    /// # Errors
    ///
    /// Returns `git2::Error` if no repository is found, or if the refs named
    /// by `mode` do not resolve.
    pub fn open(path: &Path, mode: DiffMode, options: SourceOptions) -> Result<Self, git2::Error> {
        let repo = Repository::discover(path)?;
        let source = Self { repo, mode, options };
        // Fail early on bad refs rather than on the first load.
        source.diff(&mut DiffOptions::new())?;
        Ok(source)
    }

    fn diff(&self, opts: &mut DiffOptions) -> Result<Diff<'_>, git2::Error> {
        let repo = &self.repo;
        match &self.mode {
            DiffMode::Unstaged => {
                opts.include_untracked(true).recurse_untracked_dirs(true).show_untracked_content(true);
                repo.diff_index_to_workdir(None, Some(opts))
            }
            DiffMode::Staged => {
                let head = head_tree(repo)?;
                repo.diff_tree_to_index(head.as_ref(), None, Some(opts))
            }
            DiffMode::Branch { base } => {
                let head = repo.head()?.peel_to_commit()?;
                let base = repo.revparse_single(base)?.peel_to_commit()?;
                let fork = repo.merge_base(base.id(), head.id())?;
                let fork_tree = repo.find_commit(fork)?.tree()?;
                repo.diff_tree_to_tree(Some(&fork_tree), Some(&head.tree()?), Some(opts))
            }
            DiffMode::Range { from, to } => {
                let old = repo.revparse_single(from)?.peel_to_tree()?;
                let new = repo.revparse_single(to)?.peel_to_tree()?;
                repo.diff_tree_to_tree(Some(&old), Some(&new), Some(opts))
            }
        }
    }

    /// Changed files with per-file line counts, in path order.
    ///
    /// Uses one `diff.foreach()` pass with a line callback so `'+'` / `'-'`
    /// lines are counted against the file whose delta fired last.
    pub fn summaries(&self) -> Result<Vec<FileSummary>, LoadError> {
        let mut opts = DiffOptions::new();
        opts.context_lines(0);
        let diff = self.diff(&mut opts).map_err(backend)?;
        let files: RefCell<Vec<FileSummary>> = RefCell::new(Vec::new());

        diff.foreach(
            &mut |delta, _progress| {
                let status = match delta.status() {
                    Delta::Added | Delta::Untracked => 'A',
                    Delta::Deleted => 'D',
                    Delta::Renamed => 'R',
                    _ => 'M',
                };
                let path = delta
                    .new_file()
                    .path()
                    .or_else(|| delta.old_file().path())
                    .map(|p| p.to_string_lossy().into_owned())
                    .unwrap_or_default();
                files.borrow_mut().push(FileSummary { file: FileRef::from(path), status, added: 0, removed: 0 });
                true
            },
            None,
            None,
            Some(&mut |_delta, _hunk, line| {
                if let Some(f) = files.borrow_mut().last_mut() {
                    match line.origin() {
                        '+' => f.added += 1,
                        '-' => f.removed += 1,
                        _ => {}
                    }
                }
                true
            }),
        )
        .map_err(backend)?;

        let files = files.into_inner();
        tracing::info!(mode = %self.mode.label(), files = files.len(), "change set computed");
        Ok(files)
    }
}

impl DiffSource for GitSource {
    fn changed_files(&self) -> Result<Vec<FileRef>, LoadError> {
        Ok(self.summaries()?.into_iter().map(|s| s.file).collect())
    }

    fn load_diff(&self, file: &FileRef) -> Result<DiffContent, LoadError> {
        let mut opts = DiffOptions::new();
        opts.pathspec(file.as_str())
            .disable_pathspec_match(true)
            .context_lines(FULL_CONTEXT)
            .interhunk_lines(0);
        let diff = self.diff(&mut opts).map_err(backend)?;
        let Some(delta) = diff.deltas().next() else {
            return Err(LoadError::Missing(file.to_string()));
        };

        let byte_size = delta.new_file().size().max(delta.old_file().size());
        if byte_size > self.options.max_file_bytes {
            return Err(LoadError::TooLarge {
                path: file.to_string(),
                bytes: byte_size,
                limit: self.options.max_file_bytes,
            });
        }

        let patch = Patch::from_diff(&diff, 0).map_err(backend)?;
        let binary = delta.flags().is_binary() || patch.as_ref().is_some_and(|p| p.delta().flags().is_binary());
        if binary {
            return Ok(DiffContent::binary(byte_size));
        }
        let meta = FileMeta { language: highlight::detect_language(file), byte_size, ..FileMeta::default() };
        let Some(patch) = patch else {
            return Ok(DiffContent::new(Vec::new(), meta));
        };

        let mut raw = Vec::new();
        for hunk in 0..patch.num_hunks() {
            let count = patch.num_lines_in_hunk(hunk).map_err(backend)?;
            for ix in 0..count {
                let line = patch.line_in_hunk(hunk, ix).map_err(backend)?;
                let kind = match line.origin() {
                    '+' => RawKind::Added,
                    '-' => RawKind::Removed,
                    ' ' => RawKind::Context,
                    // "\ No newline at end of file" markers and the like.
                    _ => continue,
                };
                let content = String::from_utf8_lossy(line.content());
                raw.push(RawLine {
                    kind,
                    old: line.old_lineno(),
                    new: line.new_lineno(),
                    content: content.trim_end_matches(['\n', '\r']).to_owned(),
                });
            }
        }

        let lines = shape_lines(raw, self.options.context_lines, self.options.min_collapse);
        Ok(DiffContent::new(lines, meta))
    }
}

/// HEAD's tree, or `None` on an unborn branch.
fn head_tree(repo: &Repository) -> Result<Option<Tree<'_>>, git2::Error> {
    match repo.head() {
        Ok(head) => head.peel_to_tree().map(Some),
        Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => Ok(None),
        Err(e) => Err(e),
    }
}

fn backend(err: git2::Error) -> LoadError {
    LoadError::Backend(err.message().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::Signature;
    use scrollrev_core::LineEntry;
    use std::fs;

    fn numbered(n: u32) -> String {
        (1..=n).map(|i| format!("line {i}\n")).collect()
    }

    /// Repository with `a.txt` (20 lines) and `img.bin` committed on HEAD.
    fn fixture() -> (tempfile::TempDir, Repository) {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        fs::write(dir.path().join("a.txt"), numbered(20)).unwrap();
        fs::write(dir.path().join("img.bin"), [0u8, 1, 2, 0, 3]).unwrap();
        {
            let mut index = repo.index().unwrap();
            index.add_path(Path::new("a.txt")).unwrap();
            index.add_path(Path::new("img.bin")).unwrap();
            index.write().unwrap();
            let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
            let sig = Signature::now("test", "test@example.com").unwrap();
            repo.commit(Some("HEAD"), &sig, &sig, "init", &tree, &[]).unwrap();
        }
        (dir, repo)
    }

    fn edit_workdir(dir: &Path) {
        let edited = numbered(20).replace("line 10\n", "line ten\n");
        fs::write(dir.join("a.txt"), edited).unwrap();
        fs::write(dir.join("img.bin"), [0u8, 9, 9, 0]).unwrap();
        fs::write(dir.join("new.rs"), "fn main() {}\n").unwrap();
    }

    #[test]
    fn unstaged_summaries_count_lines_per_file() {
        let (dir, _repo) = fixture();
        edit_workdir(dir.path());
        let source = GitSource::open(dir.path(), DiffMode::Unstaged, SourceOptions::default()).unwrap();
        let files = source.summaries().unwrap();
        let view: Vec<(&str, char, usize, usize)> =
            files.iter().map(|f| (f.file.as_str(), f.status, f.added, f.removed)).collect();
        assert_eq!(view, [("a.txt", 'M', 1, 1), ("img.bin", 'M', 0, 0), ("new.rs", 'A', 1, 0)]);
    }

    #[test]
    fn whole_file_diff_folds_head_and_tail() {
        let (dir, _repo) = fixture();
        edit_workdir(dir.path());
        let source = GitSource::open(dir.path(), DiffMode::Unstaged, SourceOptions::default()).unwrap();
        let content = source.load_diff(&FileRef::new("a.txt")).unwrap();

        assert_eq!(content.meta.changed_lines, 2);
        assert_eq!(content.lines.first().map(LineEntry::collapsed_count), Some(6));
        assert_eq!(content.lines.last().map(LineEntry::collapsed_count), Some(7));
        assert!(content.lines.contains(&LineEntry::Removed { old: 10, content: "line 10".into() }));
        assert!(content.lines.contains(&LineEntry::Added { new: 10, content: "line ten".into() }));
    }

    #[test]
    fn binary_files_load_as_banners_not_errors() {
        let (dir, _repo) = fixture();
        edit_workdir(dir.path());
        let source = GitSource::open(dir.path(), DiffMode::Unstaged, SourceOptions::default()).unwrap();
        let content = source.load_diff(&FileRef::new("img.bin")).unwrap();
        assert!(content.meta.binary);
        assert!(content.lines.is_empty());
    }

    #[test]
    fn size_limit_and_missing_paths_are_errors() {
        let (dir, _repo) = fixture();
        edit_workdir(dir.path());
        let options = SourceOptions { max_file_bytes: 10, ..SourceOptions::default() };
        let source = GitSource::open(dir.path(), DiffMode::Unstaged, options).unwrap();
        assert!(matches!(source.load_diff(&FileRef::new("a.txt")), Err(LoadError::TooLarge { limit: 10, .. })));
        assert_eq!(
            source.load_diff(&FileRef::new("nope.txt")),
            Err(LoadError::Missing("nope.txt".into()))
        );
    }

    #[test]
    fn staged_mode_sees_only_the_index() {
        let (dir, repo) = fixture();
        edit_workdir(dir.path());
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("new.rs")).unwrap();
        index.write().unwrap();

        let source = GitSource::open(dir.path(), DiffMode::Staged, SourceOptions::default()).unwrap();
        let files = source.changed_files().unwrap();
        assert_eq!(files, vec![FileRef::new("new.rs")]);
        let content = source.load_diff(&files[0]).unwrap();
        assert_eq!(content.meta.language.as_deref(), Some("Rust"));
        assert_eq!(content.lines, vec![LineEntry::Added { new: 1, content: "fn main() {}".into() }]);
    }

    #[test]
    fn unknown_base_ref_fails_to_open() {
        let (dir, _repo) = fixture();
        let mode = DiffMode::Branch { base: "does-not-exist".into() };
        assert!(GitSource::open(dir.path(), mode, SourceOptions::default()).is_err());
    }
}
