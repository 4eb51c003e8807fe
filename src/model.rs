use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;

/// Character used in run text for an explicit page break (`w:br w:type="page"`).
pub const PAGE_BREAK: char = '\u{000C}';

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize)]
pub enum VertAlign {
    #[default]
    Baseline,
    Superscript,
    Subscript,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hyperlink {
    pub rel_id: Option<String>,
    pub anchor: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct Run {
    pub text: String,
    pub font_name: Option<String>,
    /// Explicit size override in points. `None` inherits from the paragraph style.
    pub font_size: Option<f32>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub vertical_align: VertAlign,
    pub color: Option<[u8; 3]>,
    pub char_style: Option<String>,
    pub hyperlink: Option<Hyperlink>,
    /// Verbatim inline XML: `w:r` elements with non-text content (drawings,
    /// fields, note references), bookmark and comment range markers, and
    /// `w:fldSimple`. Such runs contribute no text.
    pub embedded: Option<String>,
}

impl Run {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn superscript(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            vertical_align: VertAlign::Superscript,
            ..Default::default()
        }
    }

    pub fn is_superscript(&self) -> bool {
        self.vertical_align == VertAlign::Superscript
    }

    pub fn is_embedded(&self) -> bool {
        self.embedded.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct Paragraph {
    pub runs: Vec<Run>,
    pub style_id: Option<String>,
    pub style_name: Option<String>,
    /// Verbatim `w:pPr` XML from the source document.
    pub properties_xml: Option<String>,
}

impl Paragraph {
    pub fn new(runs: Vec<Run>) -> Self {
        Self {
            runs,
            ..Default::default()
        }
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self::new(vec![Run::new(text)])
    }

    /// An empty paragraph holding only a page break.
    pub fn page_break() -> Self {
        Self::with_text(PAGE_BREAK.to_string())
    }

    pub fn with_style(mut self, id: &str, name: &str) -> Self {
        self.style_id = Some(id.to_string());
        self.style_name = Some(name.to_string());
        self
    }

    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    pub fn is_heading_style(&self) -> bool {
        self.style_name
            .as_deref()
            .or(self.style_id.as_deref())
            .is_some_and(|s| s.trim().to_lowercase().starts_with("heading"))
    }
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct TableCell {
    pub properties_xml: Option<String>,
    pub blocks: Vec<Block>,
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct TableRow {
    pub properties_xml: Option<String>,
    pub cells: Vec<TableCell>,
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct Table {
    pub properties_xml: Option<String>,
    pub grid_xml: Option<String>,
    pub rows: Vec<TableRow>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
}

#[derive(Clone, Debug, Default)]
pub struct ParagraphStyle {
    pub name: String,
    pub font_size: Option<f32>,
}

#[derive(Clone, Debug, Default)]
pub struct CharacterStyle {
    pub font_size: Option<f32>,
    pub font_name: Option<String>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub vertical_align: Option<VertAlign>,
    pub color: Option<[u8; 3]>,
}

#[derive(Clone, Debug, Default)]
pub struct StyleSheet {
    /// Run size from `w:docDefaults`.
    pub default_font_size: Option<f32>,
    /// Paragraph style marked `w:default="1"`.
    pub default_paragraph_style: Option<String>,
    pub paragraph_styles: HashMap<String, ParagraphStyle>,
    pub character_styles: HashMap<String, CharacterStyle>,
}

impl StyleSheet {
    /// Style of a paragraph; paragraphs without `w:pStyle` use the default style.
    pub fn paragraph_style(&self, style_id: Option<&str>) -> Option<&ParagraphStyle> {
        let id = style_id
            .or(self.default_paragraph_style.as_deref())
            .unwrap_or("Normal");
        self.paragraph_styles.get(id)
    }

    /// Font size carried by a paragraph's style chain, else the document default.
    pub fn paragraph_font_size(&self, style_id: Option<&str>) -> Option<f32> {
        self.paragraph_style(style_id)
            .and_then(|s| s.font_size)
            .or(self.default_font_size)
    }
}

/// Every part of the source OOXML package, in archive order.
#[derive(Debug, Default)]
pub struct Package {
    pub parts: Vec<(String, Vec<u8>)>,
}

#[derive(Clone, Debug)]
pub struct Document {
    pub blocks: Vec<Block>,
    pub styles: StyleSheet,
    /// Verbatim body-level `w:sectPr`.
    pub section_xml: Option<String>,
    pub package: Option<Arc<Package>>,
}

impl Document {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            blocks,
            styles: StyleSheet::default(),
            section_xml: None,
            package: None,
        }
    }

    pub fn from_paragraphs(paragraphs: Vec<Paragraph>) -> Self {
        Self::new(paragraphs.into_iter().map(Block::Paragraph).collect())
    }

    /// An empty document sharing this document's styles and package.
    pub fn empty_like(&self) -> Self {
        Self {
            blocks: Vec::new(),
            styles: self.styles.clone(),
            section_xml: self.section_xml.clone(),
            package: self.package.clone(),
        }
    }

    /// Top-level body paragraphs, the index space chapter boundaries refer to.
    pub fn body_paragraphs(&self) -> Vec<&Paragraph> {
        self.blocks
            .iter()
            .filter_map(|b| match b {
                Block::Paragraph(p) => Some(p),
                Block::Table(_) => None,
            })
            .collect()
    }
}

/// Reference number to full reference text.
pub type ReferenceMap = BTreeMap<u32, String>;

/// One Notes/References block: heading index, first content index, end (exclusive),
/// all in the flattened paragraph sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SectionRange {
    pub heading: usize,
    pub start: usize,
    pub end: usize,
}

impl SectionRange {
    pub fn contains(&self, index: usize) -> bool {
        index >= self.heading && index < self.end
    }
}

/// Chapter range over top-level body paragraphs, `end` inclusive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChapterBoundary {
    pub start: usize,
    pub end: usize,
    pub title: String,
}

impl ChapterBoundary {
    pub fn paragraph_count(&self) -> usize {
        self.end + 1 - self.start
    }
}
