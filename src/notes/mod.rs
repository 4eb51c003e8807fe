mod citations;
mod references;
mod sections;

use serde::Serialize;

use crate::model::{Document, Paragraph, ReferenceMap, SectionRange};
use crate::paragraphs::{paragraphs, retain_paragraphs};

pub use citations::{
    CitationOptions, CitationStyle, DEFAULT_MAX_RANGE_SPAN, MAX_CITATION_NUMBER, collapse_runs,
    expand_marker, is_eligible, render_marker, render_reference, rewrite_citations,
    rewrite_markers, rewrite_paragraph, superscript_numbers,
};
pub use references::{match_entry, parse_references};
pub use sections::{find_section_end, find_sections, is_section_heading};

/// Outcome of looking for notes in one processing unit. Neither miss is an error:
/// the unit is passed through unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum NotesStatus {
    Resolved,
    NoSectionsFound,
    NoReferencesParsed,
}

#[derive(Clone, Debug, Default)]
pub struct NotesScan {
    pub sections: Vec<SectionRange>,
    pub references: ReferenceMap,
}

impl NotesScan {
    pub fn status(&self) -> NotesStatus {
        if self.sections.is_empty() {
            NotesStatus::NoSectionsFound
        } else if self.references.is_empty() {
            NotesStatus::NoReferencesParsed
        } else {
            NotesStatus::Resolved
        }
    }
}

/// Find every notes section and merge their entries. Later sections overwrite
/// numbers defined by earlier ones.
pub fn build_reference_map(doc: &Document) -> NotesScan {
    let paras: Vec<&Paragraph> = paragraphs(doc).collect();
    let sections = find_sections(&paras);
    let mut references = ReferenceMap::new();
    for section in &sections {
        references.extend(parse_references(&paras, section));
    }
    NotesScan {
        sections,
        references,
    }
}

/// Remove the heading and content paragraphs of every section. Returns the number
/// of paragraphs removed.
pub fn delete_sections(doc: &mut Document, sections: &[SectionRange]) -> usize {
    let mut removed = 0;
    retain_paragraphs(doc, |index, _| {
        let inside = sections.iter().any(|s| s.contains(index));
        if inside {
            removed += 1;
        }
        !inside
    });
    removed
}

#[derive(Clone, Debug, Serialize)]
pub struct NotesReport {
    pub status: NotesStatus,
    pub sections: usize,
    pub references: usize,
    pub replacements: usize,
    pub deleted_paragraphs: usize,
}

/// Resolve and inline the citations of one processing unit in place.
pub fn process_notes(doc: &mut Document, options: &CitationOptions) -> NotesReport {
    let scan = build_reference_map(doc);
    let status = scan.status();
    let mut report = NotesReport {
        status,
        sections: scan.sections.len(),
        references: scan.references.len(),
        replacements: 0,
        deleted_paragraphs: 0,
    };
    if status != NotesStatus::Resolved {
        return report;
    }

    report.replacements = rewrite_citations(doc, &scan.references, &scan.sections, options);
    if options.delete_notes {
        report.deleted_paragraphs = delete_sections(doc, &scan.sections);
    }
    report
}
