mod assemble;
mod chapters;
pub mod convert;
pub mod docx;
mod error;
pub mod model;
pub mod notes;
pub mod paragraphs;
mod pipeline;

pub use assemble::{extract_chapter, rejoin_chapters};
pub use chapters::{
    Candidate, ChapterStrategy, FontSizeExample, FontSizeUsage, HeuristicOptions,
    boundaries_from_starts, chapter_title, detect_headings, effective_font_size,
    font_size_candidates, font_size_report, paragraph_font_size, segment_chapters,
};
pub use error::Error;
pub use model::{ChapterBoundary, Document, ReferenceMap, SectionRange};
pub use notes::{
    CitationOptions, CitationStyle, NotesReport, NotesScan, NotesStatus, build_reference_map,
    delete_sections, process_notes, rewrite_citations,
};
pub use pipeline::{
    ChapterReport, Loaded, Pipeline, Processed, ProcessedChapter, Segmented, chapter_file_name,
};

use std::path::Path;
use std::time::Instant;

/// Segment `input`, inline the citations of every chapter and write the rejoined
/// document to `output`.
pub fn process_docx(
    input: &Path,
    output: &Path,
    strategy: &ChapterStrategy,
    options: &CitationOptions,
) -> Result<Vec<ChapterReport>, Error> {
    let t0 = Instant::now();

    let loaded = Pipeline::load(input)?;
    let t_parse = t0.elapsed();

    let processed = loaded.segment(strategy)?.process(options);
    let reports = processed.reports();
    let t_process = t0.elapsed();

    let bytes = docx::to_bytes(&processed.rejoin())?;
    std::fs::write(output, &bytes).map_err(Error::Io)?;
    let t_total = t0.elapsed();

    log::info!(
        "Timing: parse={:.1}ms, process={:.1}ms, write={:.1}ms, total={:.1}ms (output {} bytes)",
        t_parse.as_secs_f64() * 1000.0,
        (t_process - t_parse).as_secs_f64() * 1000.0,
        (t_total - t_process).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        bytes.len(),
    );

    Ok(reports)
}
