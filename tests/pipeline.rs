mod common;

use common::*;
use docxide_notes::model::PAGE_BREAK;
use docxide_notes::{
    ChapterStrategy, CitationOptions, CitationStyle, NotesStatus, Pipeline, chapter_file_name,
    process_docx,
};

fn heading(text: &str) -> String {
    p_runs(&[sized(18.0, text)])
}

/// Two chapters, each with its own Notes section numbered from 1, and an
/// unannotated third chapter.
fn book() -> Vec<u8> {
    build_docx(
        &[
            heading("Chapter One"),
            p_runs(&[r("The first claim."), sup("1")]),
            p("Notes"),
            p("1. Alpha source."),
            heading("Chapter Two"),
            p("The second claim [1] and more [1-2]."),
            p("References"),
            p("1. Beta source."),
            p("2. Gamma source."),
            heading("Chapter Three"),
            p("No citations here."),
        ]
        .concat(),
    )
}

#[test]
fn chapters_are_resolved_against_their_own_notes() {
    let processed = Pipeline::load_bytes(&book())
        .unwrap()
        .segment(&ChapterStrategy::FontSize(18.0))
        .unwrap()
        .process(&CitationOptions::default());

    let reports = processed.reports();
    assert_eq!(reports.len(), 3);
    assert_eq!(reports[0].title, "Chapter_One");
    assert_eq!(reports[0].status, NotesStatus::Resolved);
    assert_eq!(reports[0].replacements, 1);
    assert_eq!(reports[1].references, 2);
    assert_eq!(reports[1].replacements, 2);
    assert_eq!(reports[2].status, NotesStatus::NoSectionsFound);
    assert_eq!(processed.total_replacements(), 3);

    let joined = processed.rejoin();
    let body = body_texts(&joined);
    assert_eq!(body[1], "The first claim. [1. Alpha source.]");
    assert_eq!(
        body[6],
        "The second claim [1. Beta source.] and more [1. Beta source.]; [2. Gamma source.]."
    );
    assert_eq!(body[4], PAGE_BREAK.to_string());
    assert_eq!(body.last().map(String::as_str), Some("No citations here."));
}

#[test]
fn notes_can_be_deleted_per_chapter() {
    let options = CitationOptions {
        style: CitationStyle::TextOnly,
        delete_notes: true,
        ..CitationOptions::default()
    };
    let joined = Pipeline::load_bytes(&book())
        .unwrap()
        .segment(&ChapterStrategy::FontSize(18.0))
        .unwrap()
        .process(&options)
        .rejoin();
    let body: Vec<String> = body_texts(&joined)
        .into_iter()
        .filter(|t| !t.starts_with(PAGE_BREAK))
        .collect();
    assert_eq!(
        body,
        vec![
            "Chapter One",
            "The first claim. (Alpha source.)",
            "Chapter Two",
            "The second claim (Beta source.) and more (Beta source.); (Gamma source.).",
            "Chapter Three",
            "No citations here.",
        ]
    );
}

#[test]
fn whole_document_mode_merges_all_notes() {
    let processed = Pipeline::load_bytes(&book())
        .unwrap()
        .whole()
        .process(&CitationOptions::default());
    let reports = processed.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].title, "Full_Document");
    assert_eq!(reports[0].sections, 2);
    let body = body_texts(&processed.rejoin());
    // The later section's entry 1 wins.
    assert_eq!(body[1], "The first claim. [1. Beta source.]");
}

#[test]
fn segmenting_exposes_boundaries_and_chapters() {
    let loaded = Pipeline::load_bytes(&book()).unwrap();
    assert_eq!(loaded.font_sizes()[0].size, 18.0);
    assert_eq!(loaded.candidates(18.0).len(), 3);

    let segmented = loaded.segment(&ChapterStrategy::Selected(vec![0, 4])).unwrap();
    assert_eq!(segmented.boundaries().len(), 2);
    assert_eq!(segmented.boundaries()[0].end, 3);
    let chapters = segmented.chapters();
    assert_eq!(chapters.len(), 2);
    assert_eq!(body_texts(&chapters[1])[0], "Chapter Two");
}

#[test]
fn writes_one_file_per_chapter() {
    let dir = tempfile::tempdir().unwrap();
    let processed = Pipeline::load_bytes(&book())
        .unwrap()
        .segment(&ChapterStrategy::FontSize(18.0))
        .unwrap()
        .process(&CitationOptions::default());
    let written = processed.write_chapters(dir.path()).unwrap();
    assert_eq!(written.len(), 3);
    assert_eq!(
        written[1].file_name().and_then(|n| n.to_str()),
        Some("chapter_02_Chapter_Two.docx")
    );
    let chapter = docxide_notes::docx::parse(&written[1]).unwrap();
    assert_eq!(body_texts(&chapter)[0], "Chapter Two");
}

#[test]
fn chapter_file_names_are_zero_padded() {
    assert_eq!(chapter_file_name(3, "Intro"), "chapter_03_Intro.docx");
    assert_eq!(chapter_file_name(12, "X"), "chapter_12_X.docx");
}

#[test]
fn process_docx_writes_the_rejoined_document() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("book.docx");
    let output = dir.path().join("out.docx");
    std::fs::write(&input, book()).unwrap();

    let reports = process_docx(
        &input,
        &output,
        &ChapterStrategy::FontSize(18.0),
        &CitationOptions::default(),
    )
    .unwrap();
    assert_eq!(reports.len(), 3);

    let result = docxide_notes::docx::parse(&output).unwrap();
    assert!(
        body_texts(&result)
            .iter()
            .any(|t| t == "The first claim. [1. Alpha source.]")
    );
}

#[test]
fn missing_input_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = Pipeline::load(&dir.path().join("absent.docx"));
    assert!(matches!(result, Err(docxide_notes::Error::Io(_))));
}
