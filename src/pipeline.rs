//! Staged processing: each stage consumes the previous snapshot and returns the
//! next, so callers can stop, inspect and resume between steps.

use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;

use crate::assemble::{extract_chapter, rejoin_chapters};
use crate::chapters::{
    Candidate, ChapterStrategy, FontSizeUsage, font_size_candidates, font_size_report,
    segment_chapters,
};
use crate::docx;
use crate::error::Error;
use crate::model::{ChapterBoundary, Document};
use crate::notes::{CitationOptions, NotesStatus, process_notes};

pub struct Pipeline;

impl Pipeline {
    pub fn load(path: &Path) -> Result<Loaded, Error> {
        let t0 = Instant::now();
        let document = docx::parse(path)?;
        log::info!(
            "Loaded {} ({} blocks) in {:.1}ms",
            path.display(),
            document.blocks.len(),
            t0.elapsed().as_secs_f64() * 1000.0
        );
        Ok(Loaded { document })
    }

    pub fn load_bytes(bytes: &[u8]) -> Result<Loaded, Error> {
        Ok(Loaded {
            document: docx::parse_bytes(bytes)?,
        })
    }

    pub fn from_document(document: Document) -> Loaded {
        Loaded { document }
    }
}

/// A parsed document awaiting segmentation.
pub struct Loaded {
    document: Document,
}

impl Loaded {
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn font_sizes(&self) -> Vec<FontSizeUsage> {
        font_size_report(&self.document)
    }

    pub fn candidates(&self, size: f32) -> Vec<Candidate> {
        font_size_candidates(&self.document, size)
    }

    pub fn segment(self, strategy: &ChapterStrategy) -> Result<Segmented, Error> {
        let boundaries = segment_chapters(&self.document, strategy)?;
        log::info!("Segmented into {} chapter(s)", boundaries.len());
        Ok(Segmented {
            document: self.document,
            boundaries,
        })
    }

    /// Treat the whole document as one chapter.
    pub fn whole(self) -> Segmented {
        let paragraphs = self.document.body_paragraphs();
        let boundaries = crate::chapters::boundaries_from_starts(&paragraphs, &[]);
        Segmented {
            document: self.document,
            boundaries,
        }
    }
}

pub struct Segmented {
    document: Document,
    boundaries: Vec<ChapterBoundary>,
}

impl Segmented {
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn boundaries(&self) -> &[ChapterBoundary] {
        &self.boundaries
    }

    /// Independent copies of every chapter, in boundary order.
    pub fn chapters(&self) -> Vec<Document> {
        self.boundaries
            .iter()
            .map(|b| extract_chapter(&self.document, b))
            .collect()
    }

    /// Resolve citations in every chapter independently.
    pub fn process(self, options: &CitationOptions) -> Processed {
        let t0 = Instant::now();
        let chapters: Vec<ProcessedChapter> = self
            .boundaries
            .par_iter()
            .map(|boundary| {
                let mut document = extract_chapter(&self.document, boundary);
                let notes = process_notes(&mut document, options);
                match notes.status {
                    NotesStatus::Resolved => log::info!(
                        "{}: {} reference(s), {} citation(s) inlined",
                        boundary.title,
                        notes.references,
                        notes.replacements
                    ),
                    NotesStatus::NoSectionsFound => {
                        log::warn!("{}: no Notes/References section found", boundary.title)
                    }
                    NotesStatus::NoReferencesParsed => log::warn!(
                        "{}: {} notes section(s) but no numbered entries",
                        boundary.title,
                        notes.sections
                    ),
                }
                ProcessedChapter {
                    report: ChapterReport {
                        title: boundary.title.clone(),
                        start: boundary.start,
                        end: boundary.end,
                        status: notes.status,
                        sections: notes.sections,
                        references: notes.references,
                        replacements: notes.replacements,
                        deleted_paragraphs: notes.deleted_paragraphs,
                    },
                    document,
                }
            })
            .collect();
        log::info!(
            "Processed {} chapter(s) in {:.1}ms",
            chapters.len(),
            t0.elapsed().as_secs_f64() * 1000.0
        );
        Processed { chapters }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ChapterReport {
    pub title: String,
    pub start: usize,
    pub end: usize,
    pub status: NotesStatus,
    pub sections: usize,
    pub references: usize,
    pub replacements: usize,
    pub deleted_paragraphs: usize,
}

pub struct ProcessedChapter {
    pub report: ChapterReport,
    pub document: Document,
}

pub struct Processed {
    pub chapters: Vec<ProcessedChapter>,
}

/// `chapter_03_Some_Title.docx`
pub fn chapter_file_name(ordinal: usize, title: &str) -> String {
    format!("chapter_{ordinal:02}_{title}.docx")
}

impl Processed {
    pub fn reports(&self) -> Vec<ChapterReport> {
        self.chapters.iter().map(|c| c.report.clone()).collect()
    }

    pub fn total_replacements(&self) -> usize {
        self.chapters.iter().map(|c| c.report.replacements).sum()
    }

    /// Write each chapter as its own DOCX into `dir`, creating it if needed.
    pub fn write_chapters(&self, dir: &Path) -> Result<Vec<PathBuf>, Error> {
        std::fs::create_dir_all(dir)?;
        let mut written = Vec::with_capacity(self.chapters.len());
        for (i, chapter) in self.chapters.iter().enumerate() {
            let path = dir.join(chapter_file_name(i + 1, &chapter.report.title));
            docx::write(&chapter.document, &path)?;
            written.push(path);
        }
        Ok(written)
    }

    pub fn rejoin(self) -> Document {
        rejoin_chapters(self.chapters.into_iter().map(|c| c.document).collect())
    }
}
