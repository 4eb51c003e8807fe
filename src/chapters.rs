use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::Error;
use crate::model::{ChapterBoundary, Document, Paragraph, Run, StyleSheet};

const TITLE_MAX_CHARS: usize = 50;
const PREVIEW_CHARS: usize = 60;
const EXAMPLE_CHARS: usize = 80;
const EXAMPLES_PER_SIZE: usize = 5;
const FULL_DOCUMENT_TITLE: &str = "Full_Document";

static TITLE_STRIP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("static title pattern"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static whitespace pattern"));
static NUMBERED_DIVISION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(chapter|part|section|book)\s+(\d+|[ivxlcdm]+|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve)\b",
    )
    .expect("static division pattern")
});
static STRUCTURAL_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(prologue|epilogue|introduction|preface|foreword|afterword|conclusion|acknowledg(e)?ments|appendix(\s+\w+)?)\s*:?$",
    )
    .expect("static structural pattern")
});

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

fn same_size(a: f32, b: f32) -> bool {
    (a - b).abs() < 0.01
}

/// Size a run renders at: its own override, else its paragraph style's size.
pub fn effective_font_size(run: &Run, para: &Paragraph, styles: &StyleSheet) -> Option<f32> {
    run.font_size
        .or_else(|| styles.paragraph_font_size(para.style_id.as_deref()))
}

/// Largest effective size among the paragraph's text runs.
pub fn paragraph_font_size(para: &Paragraph, styles: &StyleSheet) -> Option<f32> {
    para.runs
        .iter()
        .filter(|r| !r.is_embedded() && !r.text.trim().is_empty())
        .filter_map(|r| effective_font_size(r, para, styles))
        .reduce(f32::max)
        .or_else(|| styles.paragraph_font_size(para.style_id.as_deref()))
}

#[derive(Clone, Debug, Serialize)]
pub struct FontSizeExample {
    pub index: usize,
    pub text: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct FontSizeUsage {
    pub size: f32,
    pub count: usize,
    pub examples: Vec<FontSizeExample>,
}

/// Font sizes used by non-empty body paragraphs, largest first.
pub fn font_size_report(doc: &Document) -> Vec<FontSizeUsage> {
    // Keyed by half-points so sizes group exactly.
    let mut usage: BTreeMap<u32, FontSizeUsage> = BTreeMap::new();
    for (index, para) in doc.body_paragraphs().into_iter().enumerate() {
        let text = para.text();
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        let Some(size) = paragraph_font_size(para, &doc.styles) else {
            continue;
        };
        let entry = usage
            .entry((size * 2.0).round() as u32)
            .or_insert_with(|| FontSizeUsage {
                size,
                count: 0,
                examples: Vec::new(),
            });
        entry.count += 1;
        if entry.examples.len() < EXAMPLES_PER_SIZE {
            entry.examples.push(FontSizeExample {
                index,
                text: truncate_chars(text, EXAMPLE_CHARS),
            });
        }
    }
    usage.into_values().rev().collect()
}

/// A paragraph that may start a chapter.
#[derive(Clone, Debug, Serialize)]
pub struct Candidate {
    pub index: usize,
    pub text: String,
    pub preview: String,
    pub confidence: f32,
}

impl Candidate {
    fn new(index: usize, text: &str, confidence: f32) -> Self {
        Self {
            index,
            text: text.to_string(),
            preview: truncate_chars(text, PREVIEW_CHARS),
            confidence,
        }
    }
}

/// Non-empty body paragraphs whose style size or any run size equals `size`.
pub fn font_size_candidates(doc: &Document, size: f32) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    for (index, para) in doc.body_paragraphs().into_iter().enumerate() {
        let text = para.text();
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        let style_match = doc
            .styles
            .paragraph_font_size(para.style_id.as_deref())
            .is_some_and(|s| same_size(s, size));
        let run_match = para
            .runs
            .iter()
            .filter(|r| !r.is_embedded())
            .filter_map(|r| effective_font_size(r, para, &doc.styles))
            .any(|s| same_size(s, size));
        if style_match || run_match {
            candidates.push(Candidate::new(index, text, 1.0));
        }
    }
    candidates
}

#[derive(Clone, Debug)]
pub struct HeuristicOptions {
    pub min_confidence: f32,
    /// Detections this many paragraphs apart or closer are merged.
    pub merge_window: usize,
    /// Paragraph size relative to the body size that counts as large.
    pub large_font_ratio: f32,
    pub max_heading_len: usize,
}

impl Default for HeuristicOptions {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
            merge_window: 3,
            large_font_ratio: 1.5,
            max_heading_len: 80,
        }
    }
}

/// The most common paragraph size, taken as the body text size.
fn body_font_size(doc: &Document) -> Option<f32> {
    font_size_report(doc)
        .into_iter()
        .max_by_key(|u| u.count)
        .map(|u| u.size)
        .or(doc.styles.default_font_size)
}

fn is_short_all_caps(text: &str) -> bool {
    text.chars().count() <= 60
        && text.chars().any(char::is_alphabetic)
        && !text.chars().any(char::is_lowercase)
}

fn heading_confidence(
    para: &Paragraph,
    text: &str,
    size: Option<f32>,
    body_size: Option<f32>,
    opts: &HeuristicOptions,
) -> f32 {
    let mut score: f32 = 0.0;

    let style = para
        .style_name
        .as_deref()
        .or(para.style_id.as_deref())
        .unwrap_or("")
        .to_lowercase();
    if style == "title" || style == "heading 1" || style == "heading1" {
        score += 0.5;
    } else if para.is_heading_style() {
        score += 0.3;
    }

    if let (Some(size), Some(body)) = (size, body_size)
        && size >= body * opts.large_font_ratio
    {
        score += 0.3;
    }

    if is_short_all_caps(text) {
        score += 0.2;
    }

    if NUMBERED_DIVISION.is_match(text) {
        score += 0.6;
    } else if STRUCTURAL_WORD.is_match(text) {
        score += 0.5;
    }

    score.min(1.0)
}

/// Score every short body paragraph as a possible chapter heading and keep the
/// confident ones, merging detections that land close together.
pub fn detect_headings(doc: &Document, opts: &HeuristicOptions) -> Vec<Candidate> {
    let body_size = body_font_size(doc);
    let mut detected: Vec<Candidate> = Vec::new();

    for (index, para) in doc.body_paragraphs().into_iter().enumerate() {
        let text = para.text();
        let text = text.trim();
        if text.is_empty() || text.chars().count() > opts.max_heading_len {
            continue;
        }
        let size = paragraph_font_size(para, &doc.styles);
        let confidence = heading_confidence(para, text, size, body_size, opts);
        if confidence < opts.min_confidence {
            continue;
        }

        match detected.last_mut() {
            Some(last) if index - last.index <= opts.merge_window => {
                if confidence > last.confidence {
                    log::debug!(
                        "Merging heading at {} into stronger one at {index}",
                        last.index
                    );
                    *last = Candidate::new(index, text, confidence);
                }
            }
            _ => detected.push(Candidate::new(index, text, confidence)),
        }
    }
    detected
}

/// Filesystem-safe chapter title from heading text.
pub fn chapter_title(text: &str, ordinal: usize) -> String {
    let stripped = TITLE_STRIP.replace_all(text, "");
    let slug = WHITESPACE.replace_all(stripped.trim(), "_");
    let slug: String = slug.chars().take(TITLE_MAX_CHARS).collect();
    let slug = slug.trim_matches('_');
    if slug.is_empty() {
        format!("Chapter_{ordinal}")
    } else {
        slug.to_string()
    }
}

/// Contiguous boundaries from chapter-start indices. The first chapter also
/// absorbs any paragraphs before its heading, so the whole document is covered.
pub fn boundaries_from_starts(paragraphs: &[&Paragraph], starts: &[usize]) -> Vec<ChapterBoundary> {
    let total = paragraphs.len();
    if total == 0 {
        return Vec::new();
    }

    let mut starts: Vec<usize> = starts.iter().copied().filter(|s| *s < total).collect();
    starts.sort_unstable();
    starts.dedup();

    if starts.is_empty() {
        log::warn!("No chapter candidates; treating the whole document as one chapter");
        return vec![ChapterBoundary {
            start: 0,
            end: total - 1,
            title: FULL_DOCUMENT_TITLE.to_string(),
        }];
    }

    starts
        .iter()
        .enumerate()
        .map(|(i, &heading)| ChapterBoundary {
            start: if i == 0 { 0 } else { heading },
            end: starts.get(i + 1).map_or(total - 1, |next| next - 1),
            title: chapter_title(&paragraphs[heading].text(), i + 1),
        })
        .collect()
}

/// How chapter starts are chosen.
#[derive(Clone, Debug)]
pub enum ChapterStrategy {
    /// Every paragraph set in this point size starts a chapter.
    FontSize(f32),
    /// Chapter starts confirmed by the caller, usually picked from
    /// [`font_size_candidates`].
    Selected(Vec<usize>),
    /// Multi-signal heading detection; exploratory, lower precision.
    Heuristic(HeuristicOptions),
}

pub fn segment_chapters(
    doc: &Document,
    strategy: &ChapterStrategy,
) -> Result<Vec<ChapterBoundary>, Error> {
    let paragraphs = doc.body_paragraphs();
    let starts: Vec<usize> = match strategy {
        ChapterStrategy::FontSize(size) => font_size_candidates(doc, *size)
            .into_iter()
            .map(|c| c.index)
            .collect(),
        ChapterStrategy::Selected(selected) => {
            if let Some(bad) = selected.iter().find(|i| **i >= paragraphs.len()) {
                return Err(Error::InvalidSelection(format!(
                    "paragraph {bad} is out of range (document has {} paragraphs)",
                    paragraphs.len()
                )));
            }
            selected.clone()
        }
        ChapterStrategy::Heuristic(opts) => detect_headings(doc, opts)
            .into_iter()
            .map(|c| c.index)
            .collect(),
    };
    Ok(boundaries_from_starts(&paragraphs, &starts))
}
