use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::model::{Document, Paragraph, ReferenceMap, Run, SectionRange, VertAlign};
use crate::paragraphs::for_each_paragraph_mut;

/// Numbers at or above this are years or other data, never citations.
pub const MAX_CITATION_NUMBER: u32 = 1000;

/// Default cap on `a-b` ranges; wider ones are left as literal text.
pub const DEFAULT_MAX_RANGE_SPAN: u32 = 50;

static BRACKET_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([\d,\s\-–—]+)\]").expect("static bracket pattern"));
static PAREN_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([\d,\s\-–—]+)\)").expect("static paren pattern"));
static MARKER_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\d,;\s\-–—]+$").expect("static marker pattern"));
static DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("static digits pattern"));

/// How a resolved reference is written inline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum CitationStyle {
    /// `— N. text`
    EmDash,
    /// `[N. text]`
    #[default]
    Bracketed,
    /// `(text)`
    TextOnly,
}

#[derive(Clone, Debug)]
pub struct CitationOptions {
    pub style: CitationStyle,
    /// Also rewrite `(N)` markers. Off by default: parenthesized numbers collide
    /// with inline years such as "(1801–1876)".
    pub allow_parens: bool,
    /// Largest accepted `a-b` range, counted inclusively.
    pub max_range_span: u32,
    /// Remove the Notes/References sections once citations are inlined.
    pub delete_notes: bool,
}

impl Default for CitationOptions {
    fn default() -> Self {
        Self {
            style: CitationStyle::default(),
            allow_parens: false,
            max_range_span: DEFAULT_MAX_RANGE_SPAN,
            delete_notes: false,
        }
    }
}

pub fn render_reference(style: CitationStyle, number: u32, text: &str) -> String {
    match style {
        CitationStyle::EmDash => format!("— {number}. {text}"),
        CitationStyle::Bracketed => format!("[{number}. {text}]"),
        CitationStyle::TextOnly => format!("({text})"),
    }
}

/// Render every number of one marker, joined with `"; "`. Numbers missing from
/// `refs` fall back to their bracketed literal.
pub fn render_marker(style: CitationStyle, numbers: &[u32], refs: &ReferenceMap) -> String {
    numbers
        .iter()
        .map(|n| match refs.get(n) {
            Some(text) => render_reference(style, *n, text),
            None => format!("[{n}]"),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Expand the inside of a marker such as `1, 2-4` into its numbers. Returns `None`
/// for malformed tokens, descending ranges and ranges wider than `max_span`.
pub fn expand_marker(inner: &str, max_span: u32) -> Option<Vec<u32>> {
    let mut numbers = Vec::new();
    for piece in inner.split([',', ';']) {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        if let Some((a, b)) = piece.split_once(['-', '–', '—']) {
            let a = a.trim().parse::<u32>().ok()?;
            let b = b.trim().parse::<u32>().ok()?;
            if a > b {
                return None;
            }
            if b - a >= max_span {
                log::debug!("Rejecting range {a}-{b}: wider than {max_span}");
                return None;
            }
            numbers.extend(a..=b);
        } else {
            for token in piece.split_whitespace() {
                numbers.push(token.parse::<u32>().ok()?);
            }
        }
    }
    (!numbers.is_empty()).then_some(numbers)
}

/// A marker is replaced only when every number is a known reference below
/// [`MAX_CITATION_NUMBER`].
pub fn is_eligible(numbers: &[u32], refs: &ReferenceMap) -> bool {
    !numbers.is_empty()
        && numbers
            .iter()
            .all(|n| *n < MAX_CITATION_NUMBER && refs.contains_key(n))
}

/// Numbers carried by a superscript run. Marker-shaped text (`1`, `2,3`, `4–6`)
/// expands ranges; other text yields each digit sequence.
pub fn superscript_numbers(text: &str, max_span: u32) -> Option<Vec<u32>> {
    if MARKER_SHAPE.is_match(text) {
        return expand_marker(text, max_span);
    }
    let numbers = DIGITS
        .find_iter(text)
        .map(|m| m.as_str().parse::<u32>().ok())
        .collect::<Option<Vec<_>>>()?;
    (!numbers.is_empty()).then_some(numbers)
}

fn separator_after(preceding: Option<char>) -> &'static str {
    match preceding {
        Some(c) if !c.is_whitespace() => " ",
        _ => "",
    }
}

/// A resolvable citation marker located in a paragraph's source text.
struct Marker {
    range: Range<usize>,
    numbers: Vec<u32>,
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

/// Bracketed (and, if enabled, parenthesized) markers in `text`, in order.
fn find_text_markers(text: &str, refs: &ReferenceMap, options: &CitationOptions) -> Vec<Marker> {
    let patterns = std::iter::once(&*BRACKET_MARKER)
        .chain(options.allow_parens.then_some(&*PAREN_MARKER));

    let mut markers: Vec<Marker> = Vec::new();
    for re in patterns {
        for caps in re.captures_iter(text) {
            let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if markers.iter().any(|m| overlaps(&m.range, &whole.range())) {
                continue;
            }
            match expand_marker(inner.as_str(), options.max_range_span) {
                Some(numbers) if is_eligible(&numbers, refs) => markers.push(Marker {
                    range: whole.range(),
                    numbers,
                }),
                _ => log::trace!("Leaving {:?} unchanged", whole.as_str()),
            }
        }
    }
    markers.sort_by_key(|m| m.range.start);
    markers
}

/// Build the rewritten text in one pass. Rendered references are never rescanned.
fn splice(text: &str, markers: &[Marker], refs: &ReferenceMap, style: CitationStyle) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for marker in markers {
        out.push_str(&text[last..marker.range.start]);
        out.push_str(separator_after(text[..marker.range.start].chars().last()));
        out.push_str(&render_marker(style, &marker.numbers, refs));
        last = marker.range.end;
    }
    out.push_str(&text[last..]);
    out
}

/// Rewrite bracketed (and, if enabled, parenthesized) markers in plain text.
/// Returns the new text and the number of markers replaced.
pub fn rewrite_markers(
    text: &str,
    refs: &ReferenceMap,
    options: &CitationOptions,
) -> (String, usize) {
    let markers = find_text_markers(text, refs, options);
    (splice(text, &markers, refs, options.style), markers.len())
}

/// Replace the paragraph's text runs with one run holding `text`, formatted like
/// the first text run but on the baseline. Embedded runs follow it in their
/// original order; per-run formatting and hyperlinks of the text are dropped.
pub fn collapse_runs(para: &mut Paragraph, text: String) {
    let (embedded, text_runs): (Vec<Run>, Vec<Run>) = std::mem::take(&mut para.runs)
        .into_iter()
        .partition(Run::is_embedded);

    let mut run = text_runs.into_iter().next().unwrap_or_default();
    if run.vertical_align != VertAlign::Baseline {
        run.char_style = None;
    }
    run.text = text;
    run.vertical_align = VertAlign::Baseline;
    run.hyperlink = None;

    para.runs = std::iter::once(run).chain(embedded).collect();
}

/// Rewrite every citation marker in one paragraph. Returns the number of markers replaced.
///
/// Markers are located on the paragraph's original text. Superscript runs are
/// rewritten in place unless a bracket or paren marker forces a collapse.
pub fn rewrite_paragraph(
    para: &mut Paragraph,
    refs: &ReferenceMap,
    options: &CitationOptions,
) -> usize {
    let text = para.text();

    let mut superscripts: Vec<(usize, Marker)> = Vec::new();
    let mut offset = 0;
    for (i, run) in para.runs.iter().enumerate() {
        let range = offset..offset + run.text.len();
        offset = range.end;
        if run.is_superscript()
            && !run.is_embedded()
            && let Some(numbers) = superscript_numbers(&run.text, options.max_range_span)
        {
            if is_eligible(&numbers, refs) {
                superscripts.push((i, Marker { range, numbers }));
            } else {
                log::debug!("Leaving superscript {:?} unchanged", run.text);
            }
        }
    }

    let mut text_markers = find_text_markers(&text, refs, options);
    text_markers.retain(|m| !superscripts.iter().any(|(_, s)| overlaps(&s.range, &m.range)));
    let count = superscripts.len() + text_markers.len();

    if text_markers.is_empty() {
        for (i, marker) in superscripts {
            let preceding = text[..marker.range.start].chars().last();
            let run = &mut para.runs[i];
            run.text = format!(
                "{}{}",
                separator_after(preceding),
                render_marker(options.style, &marker.numbers, refs)
            );
            run.vertical_align = VertAlign::Baseline;
            run.char_style = None;
        }
    } else {
        let mut markers: Vec<Marker> = superscripts
            .into_iter()
            .map(|(_, m)| m)
            .chain(text_markers)
            .collect();
        markers.sort_by_key(|m| m.range.start);
        collapse_runs(para, splice(&text, &markers, refs, options.style));
    }
    count
}

/// Rewrite citations in every paragraph outside `sections`.
pub fn rewrite_citations(
    doc: &mut Document,
    refs: &ReferenceMap,
    sections: &[SectionRange],
    options: &CitationOptions,
) -> usize {
    if refs.is_empty() {
        return 0;
    }
    let mut replacements = 0;
    for_each_paragraph_mut(doc, |index, para| {
        if sections.iter().any(|s| s.contains(index)) {
            return;
        }
        replacements += rewrite_paragraph(para, refs, options);
    });
    replacements
}
