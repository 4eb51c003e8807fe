use crate::model::{Paragraph, SectionRange};

const SECTION_HEADINGS: &[&str] = &[
    "notes",
    "note",
    "references",
    "reference",
    "endnotes",
    "endnote",
    "sources",
    "source",
    "bibliography",
    "citations",
    "citation",
];

/// Consecutive empty paragraphs that end a section.
const BLANK_RUN_END: usize = 2;

pub fn is_section_heading(text: &str) -> bool {
    let trimmed = text.trim();
    let trimmed = trimmed.strip_suffix(':').unwrap_or(trimmed).trim_end();
    SECTION_HEADINGS
        .iter()
        .any(|h| trimmed.eq_ignore_ascii_case(h))
}

/// Exclusive end of the section whose content starts at `start`.
pub fn find_section_end(paragraphs: &[&Paragraph], start: usize) -> usize {
    let mut consecutive_blanks = 0;
    for (i, para) in paragraphs.iter().enumerate().skip(start) {
        let text = para.text();
        let text = text.trim();
        if text.is_empty() {
            consecutive_blanks += 1;
            if consecutive_blanks >= BLANK_RUN_END {
                return i;
            }
            continue;
        }
        consecutive_blanks = 0;
        if is_section_heading(text) || para.is_heading_style() {
            return i;
        }
    }
    paragraphs.len()
}

/// Locate every Notes/References block. Ranges never overlap: the search for the
/// next heading resumes at the previous section's end.
pub fn find_sections(paragraphs: &[&Paragraph]) -> Vec<SectionRange> {
    let mut sections = Vec::new();
    let mut i = 0;
    while i < paragraphs.len() {
        if is_section_heading(&paragraphs[i].text()) {
            let start = i + 1;
            let end = find_section_end(paragraphs, start);
            log::debug!("Notes section: heading {i}, content {start}..{end}");
            sections.push(SectionRange {
                heading: i,
                start,
                end,
            });
            i = end;
        } else {
            i += 1;
        }
    }
    sections
}
