//! Shaping raw diff lines into display entries.
//!
//! Backends produce a flat whole-file diff (every line, changed or not).
//! [`shape_lines`] keeps a few lines of context around each change and folds
//! longer unchanged runs into [`LineEntry::Collapsible`] entries.

use crate::types::LineEntry;

/// Origin of a raw diff line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawKind {
    Context,
    Added,
    Removed,
}

/// One line as delivered by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    pub kind: RawKind,
    pub old: Option<u32>,
    pub new: Option<u32>,
    pub content: String,
}

impl RawLine {
    /// Converts to an entry, or `None` when the line numbers required by the
    /// kind are missing.
    fn into_entry(self) -> Option<LineEntry> {
        let RawLine { kind, old, new, content } = self;
        match kind {
            RawKind::Context => Some(LineEntry::Unchanged { old: old?, new: new?, content }),
            RawKind::Added => Some(LineEntry::Added { new: new?, content }),
            RawKind::Removed => Some(LineEntry::Removed { old: old?, content }),
        }
    }
}

/// Folds unchanged runs longer than `2 * context + min_collapse`.
///
/// A run touching the start or end of the file keeps no context on that
/// edge, so a file's unchanged head and tail fold down to nothing visible.
/// Lines whose numbers do not match their kind are dropped with a warning.
pub fn shape_lines(raw: Vec<RawLine>, context: usize, min_collapse: usize) -> Vec<LineEntry> {
    let min_collapse = min_collapse.max(1);
    let mut out = Vec::new();
    let mut run: Vec<LineEntry> = Vec::new();
    let mut at_start = true;

    for line in raw {
        let Some(entry) = line.into_entry() else {
            tracing::warn!("dropping diff line with inconsistent line numbers");
            continue;
        };
        if matches!(entry, LineEntry::Unchanged { .. }) {
            run.push(entry);
            continue;
        }
        flush_run(&mut out, std::mem::take(&mut run), at_start, false, context, min_collapse);
        at_start = false;
        out.push(entry);
    }
    flush_run(&mut out, run, at_start, true, context, min_collapse);
    out
}

fn flush_run(
    out: &mut Vec<LineEntry>,
    mut run: Vec<LineEntry>,
    at_start: bool,
    at_end: bool,
    context: usize,
    min_collapse: usize,
) {
    let head = if at_start { 0 } else { context };
    let tail = if at_end { 0 } else { context };
    if run.len() < head + tail + min_collapse {
        out.append(&mut run);
        return;
    }
    let tail_lines = run.split_off(run.len() - tail);
    let hidden = run.split_off(head);
    out.append(&mut run);
    out.push(LineEntry::Collapsible { hidden });
    out.extend(tail_lines);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(n: u32) -> RawLine {
        RawLine { kind: RawKind::Context, old: Some(n), new: Some(n), content: format!("{n}") }
    }

    fn added(n: u32) -> RawLine {
        RawLine { kind: RawKind::Added, old: None, new: Some(n), content: "+".into() }
    }

    fn describe(entries: &[LineEntry]) -> String {
        entries
            .iter()
            .map(|e| match e {
                LineEntry::Unchanged { .. } => "u".to_owned(),
                LineEntry::Added { .. } => "a".to_owned(),
                LineEntry::Removed { .. } => "r".to_owned(),
                LineEntry::Collapsible { hidden } => format!("[{}]", hidden.len()),
            })
            .collect()
    }

    #[test]
    fn long_runs_fold_between_changes() {
        let mut raw: Vec<RawLine> = (1..=20).map(ctx).collect();
        raw.push(added(21));
        raw.extend((22..=31).map(ctx));
        raw.push(added(32));
        raw.extend((33..=34).map(ctx));
        let shaped = shape_lines(raw, 3, 4);
        // Head run: no leading context. Middle run of 10 keeps 3+3, folds 4.
        assert_eq!(describe(&shaped), "[17]uuuauuu[4]uuuauu");
    }

    #[test]
    fn short_runs_stay_expanded() {
        let mut raw: Vec<RawLine> = (1..=3).map(ctx).collect();
        raw.push(added(4));
        raw.extend((5..=13).map(ctx));
        raw.push(added(14));
        let shaped = shape_lines(raw, 3, 4);
        assert_eq!(describe(&shaped), "uuuauuuuuuuuua");
    }

    #[test]
    fn inconsistent_lines_are_dropped() {
        let bad = RawLine { kind: RawKind::Removed, old: None, new: Some(1), content: "x".into() };
        let shaped = shape_lines(vec![bad, added(1)], 3, 4);
        assert_eq!(describe(&shaped), "a");
    }

    #[test]
    fn unchanged_file_folds_entirely() {
        let shaped = shape_lines((1..=8).map(ctx).collect(), 3, 4);
        assert_eq!(describe(&shaped), "[8]");
    }
}
