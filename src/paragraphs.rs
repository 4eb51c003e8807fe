//! Flattened, document-order view over every paragraph in a document:
//! body paragraphs and paragraphs inside (nested) table cells.

use std::slice;

use crate::model::{Block, Document, Paragraph, TableCell, TableRow};

/// Tables nested deeper than this are not descended into.
pub const MAX_TABLE_DEPTH: usize = 32;

enum Frame<'a> {
    Blocks(slice::Iter<'a, Block>, usize),
    Rows(slice::Iter<'a, TableRow>, usize),
    Cells(slice::Iter<'a, TableCell>, usize),
}

/// Lazy iterator over all paragraphs in document order. Calling [`paragraphs`]
/// again restarts from the beginning.
pub struct Paragraphs<'a> {
    stack: Vec<Frame<'a>>,
}

impl<'a> Iterator for Paragraphs<'a> {
    type Item = &'a Paragraph;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.stack.last_mut()?;
            match frame {
                Frame::Blocks(iter, depth) => {
                    let depth = *depth;
                    match iter.next() {
                        Some(Block::Paragraph(p)) => return Some(p),
                        Some(Block::Table(t)) => {
                            if depth >= MAX_TABLE_DEPTH {
                                log::warn!(
                                    "Table nesting exceeds {MAX_TABLE_DEPTH} levels; skipping"
                                );
                                continue;
                            }
                            self.stack.push(Frame::Rows(t.rows.iter(), depth + 1));
                        }
                        None => {
                            self.stack.pop();
                        }
                    }
                }
                Frame::Rows(iter, depth) => {
                    let depth = *depth;
                    match iter.next() {
                        Some(row) => self.stack.push(Frame::Cells(row.cells.iter(), depth)),
                        None => {
                            self.stack.pop();
                        }
                    }
                }
                Frame::Cells(iter, depth) => {
                    let depth = *depth;
                    match iter.next() {
                        Some(cell) => self.stack.push(Frame::Blocks(cell.blocks.iter(), depth)),
                        None => {
                            self.stack.pop();
                        }
                    }
                }
            }
        }
    }
}

pub fn paragraphs(doc: &Document) -> Paragraphs<'_> {
    Paragraphs {
        stack: vec![Frame::Blocks(doc.blocks.iter(), 0)],
    }
}

fn visit_blocks_mut<F>(blocks: &mut [Block], depth: usize, index: &mut usize, f: &mut F)
where
    F: FnMut(usize, &mut Paragraph),
{
    for block in blocks {
        match block {
            Block::Paragraph(p) => {
                f(*index, p);
                *index += 1;
            }
            Block::Table(t) => {
                if depth >= MAX_TABLE_DEPTH {
                    continue;
                }
                for cell in t.rows.iter_mut().flat_map(|r| r.cells.iter_mut()) {
                    visit_blocks_mut(&mut cell.blocks, depth + 1, index, f);
                }
            }
        }
    }
}

/// Visit every paragraph mutably, with its index in the [`paragraphs`] order.
pub fn for_each_paragraph_mut<F>(doc: &mut Document, mut f: F)
where
    F: FnMut(usize, &mut Paragraph),
{
    let mut index = 0;
    visit_blocks_mut(&mut doc.blocks, 0, &mut index, &mut f);
}

fn retain_blocks<F>(blocks: &mut Vec<Block>, depth: usize, index: &mut usize, keep: &mut F)
where
    F: FnMut(usize, &Paragraph) -> bool,
{
    blocks.retain_mut(|block| match block {
        Block::Paragraph(p) => {
            let kept = keep(*index, p);
            *index += 1;
            kept
        }
        Block::Table(t) => {
            if depth < MAX_TABLE_DEPTH {
                for cell in t.rows.iter_mut().flat_map(|r| r.cells.iter_mut()) {
                    retain_blocks(&mut cell.blocks, depth + 1, index, keep);
                }
            }
            true
        }
    });
}

/// Remove paragraphs for which `keep` returns false. Indices passed to `keep`
/// are positions in the [`paragraphs`] order before any removal.
pub fn retain_paragraphs<F>(doc: &mut Document, mut keep: F)
where
    F: FnMut(usize, &Paragraph) -> bool,
{
    let mut index = 0;
    retain_blocks(&mut doc.blocks, 0, &mut index, &mut keep);
}
