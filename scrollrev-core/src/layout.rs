//! Row layout of the stacked document.
//!
//! Files are stacked top to bottom, each taking one header row plus its body.
//! A file whose content has not arrived yet is laid out at a placeholder
//! height, so when content lands the layout shifts. [`ScrollAnchor`] pins the
//! first visible row to a position inside a file, letting the caller restore
//! the scroll offset across such shifts instead of jumping.

use crate::order::DocumentOrder;
use crate::types::FileRef;
use crate::visibility::FileExtent;

/// Whether every file is stacked, or only the selected one is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutMode {
    #[default]
    Continuous,
    SingleFile,
}

impl LayoutMode {
    pub fn toggled(self) -> Self {
        match self {
            LayoutMode::Continuous => LayoutMode::SingleFile,
            LayoutMode::SingleFile => LayoutMode::Continuous,
        }
    }
}

/// First visible row expressed relative to the file containing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrollAnchor {
    pub file: FileRef,
    pub offset: usize,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentLayout {
    extents: Vec<FileExtent>,
    total_rows: usize,
}

impl DocumentLayout {
    /// Stacks `files` using `height` for each (clamped to at least one row).
    pub fn stack<'a>(files: impl IntoIterator<Item = &'a FileRef>, height: impl Fn(&FileRef) -> usize) -> Self {
        let mut top = 0;
        let extents = files
            .into_iter()
            .map(|file| {
                let h = height(file).max(1);
                let extent = FileExtent { file: file.clone(), top, height: h };
                top += h;
                extent
            })
            .collect();
        Self { extents, total_rows: top }
    }

    /// Lays out the files that `mode` shows.
    pub fn build(
        mode: LayoutMode,
        order: &DocumentOrder,
        selected: Option<&FileRef>,
        height: impl Fn(&FileRef) -> usize,
    ) -> Self {
        match mode {
            LayoutMode::Continuous => Self::stack(order.files(), height),
            LayoutMode::SingleFile => Self::stack(selected, height),
        }
    }

    pub fn extents(&self) -> &[FileExtent] {
        &self.extents
    }

    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    pub fn extent(&self, file: &FileRef) -> Option<&FileExtent> {
        self.extents.iter().find(|e| &e.file == file)
    }

    /// The extent containing `row` and the row's offset inside it.
    pub fn locate(&self, row: usize) -> Option<(&FileExtent, usize)> {
        let ix = self.extents.partition_point(|e| e.top + e.height <= row);
        let extent = self.extents.get(ix)?;
        Some((extent, row - extent.top))
    }

    pub fn anchor(&self, row: usize) -> Option<ScrollAnchor> {
        self.locate(row).map(|(e, offset)| ScrollAnchor { file: e.file.clone(), offset })
    }

    /// Row that `anchor` points at in this layout, clamped to its file.
    pub fn resolve(&self, anchor: &ScrollAnchor) -> Option<usize> {
        let extent = self.extent(&anchor.file)?;
        Some(extent.top + anchor.offset.min(extent.height - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(names: &[&str]) -> DocumentOrder {
        DocumentOrder::new(names.iter().map(|n| FileRef::new(n)).collect())
    }

    #[test]
    fn locate_maps_rows_to_files() {
        let doc = order(&["a", "b", "c"]);
        let layout = DocumentLayout::build(LayoutMode::Continuous, &doc, None, |f| match f.as_str() {
            "a" => 3,
            "b" => 0,
            _ => 5,
        });
        assert_eq!(layout.total_rows(), 9);
        let (e, off) = layout.locate(3).unwrap();
        assert_eq!((e.file.as_str(), off), ("b", 0));
        let (e, off) = layout.locate(8).unwrap();
        assert_eq!((e.file.as_str(), off), ("c", 4));
        assert!(layout.locate(9).is_none());
    }

    #[test]
    fn anchor_survives_growth_above_it() {
        let doc = order(&["a", "b"]);
        let before = DocumentLayout::build(LayoutMode::Continuous, &doc, None, |_| 4);
        let anchor = before.anchor(6).unwrap();
        assert_eq!(anchor, ScrollAnchor { file: FileRef::new("b"), offset: 2 });
        // "a" loads and grows from a 4-row placeholder to 40 rows.
        let after = DocumentLayout::build(LayoutMode::Continuous, &doc, None, |f| {
            if f.as_str() == "a" { 40 } else { 4 }
        });
        assert_eq!(after.resolve(&anchor), Some(42));
    }

    #[test]
    fn single_file_mode_shows_only_the_selection() {
        let doc = order(&["a", "b"]);
        let b = FileRef::new("b");
        let layout = DocumentLayout::build(LayoutMode::SingleFile, &doc, Some(&b), |_| 7);
        assert_eq!(layout.extents().len(), 1);
        assert_eq!(layout.extents()[0].file, b);
        let empty = DocumentLayout::build(LayoutMode::SingleFile, &doc, None, |_| 7);
        assert_eq!(empty.total_rows(), 0);
    }
}
