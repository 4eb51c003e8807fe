mod common;

use common::*;
use docxide_notes::model::{Document, Paragraph, Run};
use docxide_notes::{
    ChapterBoundary, ChapterStrategy, Error, HeuristicOptions, boundaries_from_starts,
    chapter_title, detect_headings, effective_font_size, font_size_candidates, font_size_report,
    segment_chapters,
};

fn heading(text: &str) -> String {
    p_runs(&[sized(20.0, text)])
}

/// 0 front matter, 1 heading, 2-3 body, 4 heading, 5 body.
fn two_chapter_doc() -> Document {
    parse(
        &[
            p("Front matter"),
            heading("Chapter One: Beginnings"),
            p("First body paragraph."),
            p("Second body paragraph."),
            heading("Chapter Two"),
            p("Closing paragraph."),
        ]
        .concat(),
    )
}

fn assert_covers(boundaries: &[ChapterBoundary], total: usize) {
    assert_eq!(boundaries.first().map(|b| b.start), Some(0));
    assert_eq!(boundaries.last().map(|b| b.end), Some(total - 1));
    for pair in boundaries.windows(2) {
        assert_eq!(pair[0].end + 1, pair[1].start);
    }
    let covered: usize = boundaries.iter().map(|b| b.paragraph_count()).sum();
    assert_eq!(covered, total);
}

#[test]
fn font_size_report_lists_sizes_largest_first() {
    let doc = two_chapter_doc();
    let report = font_size_report(&doc);
    assert_eq!(report.len(), 2);
    assert_eq!(report[0].size, 20.0);
    assert_eq!(report[0].count, 2);
    assert_eq!(
        report[0].examples.iter().map(|e| e.index).collect::<Vec<_>>(),
        vec![1, 4]
    );
    assert_eq!(report[1].size, 11.0);
    assert_eq!(report[1].count, 4);
}

#[test]
fn font_size_report_skips_empty_paragraphs_and_caps_examples() {
    let mut body = vec![p(""), p("   ")];
    body.extend((0..8).map(|i| p(&format!("Line {i}"))));
    let report = font_size_report(&parse(&body.concat()));
    assert_eq!(report.len(), 1);
    assert_eq!(report[0].count, 8);
    assert_eq!(report[0].examples.len(), 5);
    assert_eq!(report[0].examples[0].index, 2);
}

#[test]
fn long_examples_are_truncated() {
    let long = "x".repeat(200);
    let report = font_size_report(&parse(&p(&long)));
    assert_eq!(report[0].examples[0].text.chars().count(), 83);
    assert!(report[0].examples[0].text.ends_with("..."));
}

#[test]
fn candidates_for_a_size() {
    let doc = two_chapter_doc();
    let candidates = font_size_candidates(&doc, 20.0);
    assert_eq!(
        candidates.iter().map(|c| c.index).collect::<Vec<_>>(),
        vec![1, 4]
    );
    assert_eq!(candidates[0].text, "Chapter One: Beginnings");
    assert!(font_size_candidates(&doc, 72.0).is_empty());
}

#[test]
fn candidates_match_on_style_size() {
    let doc = parse(&[p_styled("Heading1", "Styled heading"), p("Body")].concat());
    let candidates = font_size_candidates(&doc, 16.0);
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].index, 0);
}

#[test]
fn font_size_resolution_order() {
    let doc = parse(&p("x"));
    let para = Paragraph::with_text("x").with_style("Heading1", "heading 1");

    let mut explicit = Run::new("x");
    explicit.font_size = Some(9.0);
    assert_eq!(effective_font_size(&explicit, &para, &doc.styles), Some(9.0));

    let inherit = Run::new("x");
    assert_eq!(effective_font_size(&inherit, &para, &doc.styles), Some(16.0));

    let bare = Document::from_paragraphs(vec![Paragraph::with_text("x")]);
    assert_eq!(
        effective_font_size(&inherit, &bare.body_paragraphs()[0], &bare.styles),
        None
    );
}

#[test]
fn font_size_strategy_builds_contiguous_boundaries() {
    let doc = two_chapter_doc();
    let boundaries = segment_chapters(&doc, &ChapterStrategy::FontSize(20.0)).unwrap();
    assert_eq!(
        boundaries,
        vec![
            ChapterBoundary {
                start: 0,
                end: 3,
                title: "Chapter_One_Beginnings".into()
            },
            ChapterBoundary {
                start: 4,
                end: 5,
                title: "Chapter_Two".into()
            },
        ]
    );
}

#[test]
fn no_candidates_means_one_chapter() {
    let doc = two_chapter_doc();
    let boundaries = segment_chapters(&doc, &ChapterStrategy::FontSize(72.0)).unwrap();
    assert_eq!(
        boundaries,
        vec![ChapterBoundary {
            start: 0,
            end: 5,
            title: "Full_Document".into()
        }]
    );
}

#[test]
fn selected_starts_are_sorted_and_deduplicated() {
    let doc = two_chapter_doc();
    let boundaries =
        segment_chapters(&doc, &ChapterStrategy::Selected(vec![4, 1, 4])).unwrap();
    assert_eq!(boundaries.len(), 2);
    assert_eq!((boundaries[0].start, boundaries[0].end), (0, 3));
    assert_eq!((boundaries[1].start, boundaries[1].end), (4, 5));
}

#[test]
fn out_of_range_selection_is_rejected() {
    let doc = two_chapter_doc();
    let err = segment_chapters(&doc, &ChapterStrategy::Selected(vec![1, 99])).unwrap_err();
    assert!(matches!(err, Error::InvalidSelection(_)), "{err}");
}

#[test]
fn n_starts_give_n_boundaries_covering_everything() {
    let paras: Vec<Paragraph> = (0..40)
        .map(|i| Paragraph::with_text(format!("Paragraph {i}")))
        .collect();
    let refs: Vec<&Paragraph> = paras.iter().collect();
    for starts in [
        vec![0],
        vec![0, 10, 20, 30],
        vec![5, 6, 7],
        vec![39],
        vec![0, 39],
        (0..40).collect::<Vec<_>>(),
    ] {
        let boundaries = boundaries_from_starts(&refs, &starts);
        assert_eq!(boundaries.len(), starts.len(), "{starts:?}");
        assert_covers(&boundaries, 40);
    }
}

#[test]
fn empty_document_has_no_boundaries() {
    assert!(boundaries_from_starts(&[], &[0]).is_empty());
}

#[test]
fn titles_are_filesystem_safe() {
    assert_eq!(chapter_title("Chapter 1: The Beginning!", 1), "Chapter_1_The_Beginning");
    assert_eq!(chapter_title("  Part   Two  ", 2), "Part_Two");
    assert_eq!(chapter_title("***", 3), "Chapter_3");
    assert_eq!(chapter_title("", 4), "Chapter_4");
    assert_eq!(chapter_title("Où est-ce?", 5), "Où_estce");
    let long = chapter_title(&"word ".repeat(30), 6);
    assert!(long.chars().count() <= 50);
    assert!(!long.ends_with('_'));
}

fn heuristic_doc() -> Document {
    let body = [
        p_styled("Title", "My Book"),
        p("An opening paragraph of ordinary prose."),
        p("More ordinary prose follows here."),
        p("And a little more of it."),
        p("Still more body text for the count."),
        p_styled("Heading1", "Chapter 1"),
        p("Body text of the first chapter."),
        p("Chapter 2"),
        p("Body text of the second chapter."),
        p("Yet another plain paragraph."),
        p("And one more plain paragraph."),
        p("EPILOGUE"),
        p("The end of the story."),
        p("SHORT CAPS"),
    ];
    parse(&body.concat())
}

#[test]
fn heuristic_scores_and_merges_nearby_detections() {
    let doc = heuristic_doc();
    let detected = detect_headings(&doc, &HeuristicOptions::default());
    assert_eq!(
        detected.iter().map(|c| c.index).collect::<Vec<_>>(),
        vec![0, 5, 11]
    );
    assert!(detected.iter().all(|c| c.confidence >= 0.5));
    assert!((detected[1].confidence - 1.0).abs() < f32::EPSILON);
}

#[test]
fn heuristic_without_merging_keeps_close_headings() {
    let doc = heuristic_doc();
    let opts = HeuristicOptions {
        merge_window: 0,
        ..HeuristicOptions::default()
    };
    let detected = detect_headings(&doc, &opts);
    assert_eq!(
        detected.iter().map(|c| c.index).collect::<Vec<_>>(),
        vec![0, 5, 7, 11]
    );
}

#[test]
fn heuristic_strategy_segments_the_document() {
    let doc = heuristic_doc();
    let boundaries =
        segment_chapters(&doc, &ChapterStrategy::Heuristic(HeuristicOptions::default())).unwrap();
    assert_eq!(boundaries.len(), 3);
    assert_eq!(boundaries[1].title, "Chapter_1");
    assert_eq!(boundaries[2].title, "EPILOGUE");
    assert_covers(&boundaries, 14);
}

/// Body text sized only by `docDefaults`, with one 20pt all-caps heading.
fn sizeless_default_doc() -> Document {
    parse_with_styles(
        &[
            p("Opening prose without any explicit size."),
            p_runs(&[sized(20.0, "THE STORM")]),
            p("Body text of the storm."),
            p("More body text."),
            p_styled("berschrift1", "Nachwort"),
        ]
        .concat(),
        SIZELESS_DEFAULT_STYLES_XML,
    )
}

#[test]
fn body_size_falls_back_to_document_defaults() {
    let doc = sizeless_default_doc();
    assert_eq!(doc.styles.default_paragraph_style.as_deref(), Some("Standard"));
    assert_eq!(doc.styles.paragraph_font_size(None), Some(12.0));
    assert_eq!(doc.body_paragraphs()[0].style_name.as_deref(), Some("Normal"));

    let report = font_size_report(&doc);
    let sizes: Vec<(f32, usize)> = report.iter().map(|u| (u.size, u.count)).collect();
    assert_eq!(sizes, vec![(20.0, 1), (16.0, 1), (12.0, 3)]);
}

#[test]
fn heuristic_large_font_signal_uses_default_body_size() {
    let doc = sizeless_default_doc();
    let detected = detect_headings(
        &doc,
        &HeuristicOptions {
            merge_window: 0,
            ..HeuristicOptions::default()
        },
    );
    // 20pt against a 12pt body plus all caps reaches the threshold.
    assert_eq!(detected.first().map(|c| c.index), Some(1));
    assert!((detected[0].confidence - 0.5).abs() < 1e-6);
}
