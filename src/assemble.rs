use crate::model::{Block, ChapterBoundary, Document, Paragraph};

/// Copy the paragraphs `boundary.start..=boundary.end` into a standalone document
/// sharing the source's styles and package.
///
/// A table travels with the chapter holding the paragraph just before it; tables
/// ahead of the first paragraph belong to the first chapter. Extracting every
/// boundary of a segmentation therefore places each block exactly once.
pub fn extract_chapter(doc: &Document, boundary: &ChapterBoundary) -> Document {
    let mut chapter = doc.empty_like();
    let mut seen = 0usize;
    for block in &doc.blocks {
        let owner = match block {
            Block::Paragraph(_) => seen,
            Block::Table(_) => seen.saturating_sub(1),
        };
        if owner >= boundary.start && owner <= boundary.end {
            chapter.blocks.push(block.clone());
        }
        if matches!(block, Block::Paragraph(_)) {
            seen += 1;
        }
    }
    log::debug!(
        "Extracted \"{}\": paragraphs {}..={}, {} blocks",
        boundary.title,
        boundary.start,
        boundary.end,
        chapter.blocks.len()
    );
    chapter
}

/// Concatenate chapters in order, with a page break ahead of every chapter after
/// the first. The result takes its styles and package from the first chapter.
pub fn rejoin_chapters(chapters: Vec<Document>) -> Document {
    let mut chapters = chapters.into_iter();
    let Some(mut joined) = chapters.next() else {
        return Document::new(Vec::new());
    };
    for chapter in chapters {
        joined.blocks.push(Block::Paragraph(Paragraph::page_break()));
        joined.blocks.extend(chapter.blocks);
    }
    joined
}
