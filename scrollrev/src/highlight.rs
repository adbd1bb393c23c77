//! Syntax highlighting and intra-line emphasis for diff rows.
//!
//! The syntect sets are process-wide `LazyLock` statics: the git worker uses
//! them to name a file's language, the renderer to colour visible rows.

use std::sync::LazyLock;

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Span;
use similar::{ChangeTag, TextDiff};
use syntect::easy::HighlightLines;
use syntect::highlighting::{FontStyle, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};

use scrollrev_core::{FileMeta, FileRef};

pub static SYNTAXES: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
pub static THEMES: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

/// Syntax name for `file`, from its extension. `None` for plain text.
pub fn detect_language(file: &FileRef) -> Option<String> {
    let ext = file.extension()?;
    SYNTAXES.find_syntax_by_extension(ext).map(|s| s.name.clone())
}

fn syntax_for(meta: &FileMeta, file: &FileRef) -> &'static SyntaxReference {
    meta.language
        .as_deref()
        .and_then(|name| SYNTAXES.find_syntax_by_name(name))
        .or_else(|| file.extension().and_then(|ext| SYNTAXES.find_syntax_by_extension(ext)))
        .unwrap_or_else(|| SYNTAXES.find_syntax_plain_text())
}

/// Stateful highlighter for the visible rows of one file in one frame.
///
/// Rows are fed top to bottom; constructs that start above the viewport are
/// not seen, which only affects colouring.
pub struct Highlighter {
    inner: Option<HighlightLines<'static>>,
}

impl Highlighter {
    pub fn new(meta: &FileMeta, file: &FileRef, theme_name: &str) -> Self {
        let theme = THEMES.themes.get(theme_name).or_else(|| THEMES.themes.values().next());
        let inner = theme.map(|t| HighlightLines::new(syntax_for(meta, file), t));
        Self { inner }
    }

    /// Coloured spans for one line of code. Falls back to a plain span.
    pub fn line(&mut self, code: &str) -> Vec<Span<'static>> {
        let Some(h) = self.inner.as_mut() else {
            return vec![Span::raw(code.to_owned())];
        };
        let ranges = h.highlight_line(code, &SYNTAXES).unwrap_or_default();
        let spans: Vec<Span<'static>> =
            ranges.into_iter().map(|(style, text)| syntect_to_span(style, text)).collect();
        if spans.is_empty() { vec![Span::raw(code.to_owned())] } else { spans }
    }
}

/// Converts a syntect `(Style, &str)` pair to an owned ratatui span.
///
/// Backgrounds are dropped so the diff row colours show through.
fn syntect_to_span(style: syntect::highlighting::Style, content: &str) -> Span<'static> {
    let fg = style.foreground;
    let mut out = Style::default();
    if fg.a > 0 {
        out = out.fg(Color::Rgb(fg.r, fg.g, fg.b));
    }
    if style.font_style.contains(FontStyle::BOLD) {
        out = out.add_modifier(Modifier::BOLD);
    }
    if style.font_style.contains(FontStyle::ITALIC) {
        out = out.add_modifier(Modifier::ITALIC);
    }
    if style.font_style.contains(FontStyle::UNDERLINE) {
        out = out.add_modifier(Modifier::UNDERLINED);
    }
    Span::styled(content.to_owned(), out)
}

/// Which half of a removed/added pair to emphasise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairHalf {
    Old,
    New,
}

/// Word-level diff of a removed/added line pair, returning the spans of
/// `half`. Changed words are bold in `color`; shared words use `dim`.
pub fn word_diff_spans(old: &str, new: &str, half: PairHalf, color: Color, dim: Color) -> Vec<Span<'static>> {
    let diff = TextDiff::from_words(old, new);
    let wanted = match half {
        PairHalf::Old => ChangeTag::Delete,
        PairHalf::New => ChangeTag::Insert,
    };
    let mut spans = Vec::new();
    for op in diff.ops() {
        for change in diff.iter_inline_changes(op) {
            let tag = change.tag();
            if tag != wanted && tag != ChangeTag::Equal {
                continue;
            }
            for (emphasized, value) in change.iter_strings_lossy() {
                let text = value.trim_end_matches('\n').to_owned();
                let style = match tag {
                    ChangeTag::Equal => Style::default().fg(dim),
                    _ if emphasized => Style::default().fg(color).add_modifier(Modifier::BOLD),
                    _ => Style::default().fg(color),
                };
                spans.push(Span::styled(text, style));
            }
        }
    }
    spans
}
