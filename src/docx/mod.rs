mod styles;
mod writer;

use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::Arc;

use crate::error::Error;
use crate::model::{
    Block, Document, Hyperlink, PAGE_BREAK, Package, Paragraph, Run, Table, TableCell, TableRow,
    VertAlign,
};
use crate::paragraphs::MAX_TABLE_DEPTH;

use styles::{StylesInfo, parse_styles, parse_theme, resolve_font_from_node};

pub use writer::{to_bytes, write};

pub(super) const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub(super) const DML_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub(super) const REL_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

pub(super) const DOCUMENT_PART: &str = "word/document.xml";

/// Run children that map onto modeled text. A run holding anything else is kept verbatim.
const TEXT_RUN_CHILDREN: &[&str] = &[
    "rPr",
    "t",
    "tab",
    "br",
    "cr",
    "noBreakHyphen",
    "softHyphen",
    "lastRenderedPageBreak",
];

/// Paragraph children carried through verbatim, in place, as zero-text runs.
const VERBATIM_INLINE: &[&str] = &[
    "bookmarkStart",
    "bookmarkEnd",
    "commentRangeStart",
    "commentRangeEnd",
    "fldSimple",
];

pub(super) fn parse_hex_color(val: &str) -> Option<[u8; 3]> {
    if val == "auto" || val.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&val[0..2], 16).ok()?;
    let g = u8::from_str_radix(&val[2..4], 16).ok()?;
    let b = u8::from_str_radix(&val[4..6], 16).ok()?;
    Some([r, g, b])
}

/// Parse a WML boolean toggle element (e.g., w:b, w:i).
/// Present with no val or val != "0"/"false" means true.
pub(super) fn wml_bool(parent: roxmltree::Node, name: &str) -> Option<bool> {
    wml(parent, name).map(|n| {
        n.attribute((WML_NS, "val"))
            .is_none_or(|v| v != "0" && v != "false")
    })
}

pub(super) fn wml<'a>(node: roxmltree::Node<'a, 'a>, name: &str) -> Option<roxmltree::Node<'a, 'a>> {
    node.children()
        .find(|n| n.tag_name().name() == name && n.tag_name().namespace() == Some(WML_NS))
}

pub(super) fn wml_attr<'a>(node: roxmltree::Node<'a, 'a>, child: &str) -> Option<&'a str> {
    wml(node, child).and_then(|n| n.attribute((WML_NS, "val")))
}

pub(super) fn is_wml(node: roxmltree::Node, name: &str) -> bool {
    node.tag_name().name() == name && node.tag_name().namespace() == Some(WML_NS)
}

/// Half-points (`w:sz`) to points.
pub(super) fn half_points(val: &str) -> Option<f32> {
    val.parse::<f32>().ok().map(|hp| hp / 2.0)
}

pub(super) fn parse_vert_align(val: &str) -> VertAlign {
    match val {
        "superscript" => VertAlign::Superscript,
        "subscript" => VertAlign::Subscript,
        _ => VertAlign::Baseline,
    }
}

impl Package {
    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, data)| data.as_slice())
    }

    pub(crate) fn part_text(&self, name: &str) -> Option<String> {
        self.part(name)
            .map(|data| String::from_utf8_lossy(data).into_owned())
    }
}

struct ParseContext<'s> {
    styles: &'s StylesInfo,
    source: &'s str,
}

impl ParseContext<'_> {
    fn raw(&self, node: roxmltree::Node) -> String {
        self.source[node.range()].to_string()
    }
}

fn read_package(bytes: &[u8]) -> Result<Package, Error> {
    let mut zip = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|_| Error::InvalidDocx("file is not a ZIP archive".into()))?;
    let mut parts = Vec::with_capacity(zip.len());
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        let mut data = Vec::new();
        entry.read_to_end(&mut data)?;
        parts.push((name, data));
    }
    Ok(Package { parts })
}

pub fn parse(path: &Path) -> Result<Document, Error> {
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => Error::Io(
            std::io::Error::new(e.kind(), format!("{}: {}", e, path.display())),
        ),
        _ => Error::Io(e),
    })?;
    parse_bytes(&bytes)
}

pub fn parse_bytes(bytes: &[u8]) -> Result<Document, Error> {
    let package = read_package(bytes)?;

    let styles = parse_styles(&package, parse_theme(&package));

    let xml_content = package.part_text(DOCUMENT_PART).ok_or_else(|| {
        Error::InvalidDocx("missing word/document.xml (is this a DOCX file?)".into())
    })?;
    let xml = roxmltree::Document::parse(&xml_content)?;
    let root = xml.root_element();
    let body = wml(root, "body").ok_or_else(|| Error::InvalidDocx("missing w:body".into()))?;

    let ctx = ParseContext {
        styles: &styles,
        source: &xml_content,
    };
    let blocks = parse_blocks(body, &ctx, 0);
    let section_xml = wml(body, "sectPr").map(|n| ctx.raw(n));

    log::debug!(
        "Parsed {} top-level blocks, {} paragraph styles, {} character styles",
        blocks.len(),
        styles.sheet.paragraph_styles.len(),
        styles.sheet.character_styles.len()
    );

    Ok(Document {
        blocks,
        styles: styles.sheet,
        section_xml,
        package: Some(Arc::new(package)),
    })
}

/// Flatten SDT wrappers: descend into w:sdtContent and collect effective children.
fn collect_block_nodes<'a>(parent: roxmltree::Node<'a, 'a>) -> Vec<roxmltree::Node<'a, 'a>> {
    let mut nodes = Vec::new();
    for child in parent.children() {
        if is_wml(child, "sdt") {
            if let Some(content) = wml(child, "sdtContent") {
                nodes.extend(collect_block_nodes(content));
            }
        } else if child.is_element() {
            nodes.push(child);
        }
    }
    nodes
}

fn parse_blocks(parent: roxmltree::Node, ctx: &ParseContext, depth: usize) -> Vec<Block> {
    let mut blocks = Vec::new();
    for node in collect_block_nodes(parent) {
        if node.tag_name().namespace() != Some(WML_NS) {
            continue;
        }
        match node.tag_name().name() {
            "p" => blocks.push(Block::Paragraph(parse_paragraph(node, ctx))),
            "tbl" => {
                if depth >= MAX_TABLE_DEPTH {
                    log::warn!("Skipping table nested deeper than {MAX_TABLE_DEPTH} levels");
                    continue;
                }
                blocks.push(Block::Table(parse_table(node, ctx, depth + 1)));
            }
            _ => {}
        }
    }
    blocks
}

fn parse_table(node: roxmltree::Node, ctx: &ParseContext, depth: usize) -> Table {
    let rows = collect_block_nodes(node)
        .into_iter()
        .filter(|n| is_wml(*n, "tr"))
        .map(|tr| TableRow {
            properties_xml: wml(tr, "trPr").map(|n| ctx.raw(n)),
            cells: collect_block_nodes(tr)
                .into_iter()
                .filter(|n| is_wml(*n, "tc"))
                .map(|tc| TableCell {
                    properties_xml: wml(tc, "tcPr").map(|n| ctx.raw(n)),
                    blocks: parse_blocks(tc, ctx, depth),
                })
                .collect(),
        })
        .collect();

    Table {
        properties_xml: wml(node, "tblPr").map(|n| ctx.raw(n)),
        grid_xml: wml(node, "tblGrid").map(|n| ctx.raw(n)),
        rows,
    }
}

fn parse_paragraph(node: roxmltree::Node, ctx: &ParseContext) -> Paragraph {
    let ppr = wml(node, "pPr");
    let style_id = ppr
        .and_then(|ppr| wml_attr(ppr, "pStyle"))
        .map(|s| s.to_string());
    let style_name = ctx
        .styles
        .sheet
        .paragraph_style(style_id.as_deref())
        .map(|s| s.name.clone());

    Paragraph {
        runs: parse_runs(node, ctx),
        style_id,
        style_name,
        properties_xml: ppr.map(|n| ctx.raw(n)),
    }
}

enum Inline<'a> {
    Run(roxmltree::Node<'a, 'a>),
    Verbatim(roxmltree::Node<'a, 'a>),
}

fn collect_inline_nodes<'a>(
    parent: roxmltree::Node<'a, 'a>,
    link: Option<&Hyperlink>,
    out: &mut Vec<(Inline<'a>, Option<Hyperlink>)>,
) {
    for child in parent.children() {
        if child.tag_name().namespace() != Some(WML_NS) {
            continue;
        }
        match child.tag_name().name() {
            "r" => out.push((Inline::Run(child), link.cloned())),
            "hyperlink" => {
                let link = Hyperlink {
                    rel_id: child.attribute((REL_NS, "id")).map(String::from),
                    anchor: child.attribute((WML_NS, "anchor")).map(String::from),
                };
                collect_inline_nodes(child, Some(&link), out);
            }
            "sdt" => {
                if let Some(content) = wml(child, "sdtContent") {
                    collect_inline_nodes(content, link, out);
                }
            }
            "ins" | "smartTag" | "customXml" => {
                collect_inline_nodes(child, link, out);
            }
            name if VERBATIM_INLINE.contains(&name) => {
                out.push((Inline::Verbatim(child), link.cloned()));
            }
            _ => {}
        }
    }
}

fn parse_runs(para_node: roxmltree::Node, ctx: &ParseContext) -> Vec<Run> {
    let mut inline_nodes = Vec::new();
    collect_inline_nodes(para_node, None, &mut inline_nodes);

    let mut runs = Vec::new();
    for (inline, hyperlink) in inline_nodes {
        let run_node = match inline {
            Inline::Run(node) => node,
            Inline::Verbatim(node) => {
                runs.push(Run {
                    hyperlink,
                    embedded: Some(ctx.raw(node)),
                    ..Default::default()
                });
                continue;
            }
        };
        let is_text_run = run_node
            .children()
            .filter(|c| c.is_element())
            .all(|c| {
                c.tag_name().namespace() == Some(WML_NS)
                    && TEXT_RUN_CHILDREN.contains(&c.tag_name().name())
            });

        if !is_text_run {
            runs.push(Run {
                hyperlink,
                embedded: Some(ctx.raw(run_node)),
                ..Default::default()
            });
            continue;
        }

        let mut run = parse_run_formatting(run_node, ctx);
        run.hyperlink = hyperlink;

        for child in run_node.children() {
            if child.tag_name().namespace() != Some(WML_NS) {
                continue;
            }
            match child.tag_name().name() {
                "t" => {
                    if let Some(t) = child.text() {
                        // Word treats newlines in w:t as whitespace; only w:br creates line breaks
                        run.text.push_str(&t.replace('\n', " "));
                    }
                }
                "tab" => run.text.push('\t'),
                "br" => match child.attribute((WML_NS, "type")) {
                    Some("page") => run.text.push(PAGE_BREAK),
                    _ => run.text.push('\n'),
                },
                "cr" => run.text.push('\n'),
                "noBreakHyphen" => run.text.push('-'),
                _ => {}
            }
        }

        if !run.text.is_empty() {
            runs.push(run);
        }
    }
    runs
}

fn parse_run_formatting(run_node: roxmltree::Node, ctx: &ParseContext) -> Run {
    let rpr = wml(run_node, "rPr");
    let char_style_id = rpr.and_then(|n| wml_attr(n, "rStyle"));
    let char_style = char_style_id.and_then(|id| ctx.styles.sheet.character_styles.get(id));

    let font_size = rpr
        .and_then(|n| wml_attr(n, "sz").or_else(|| wml_attr(n, "szCs")))
        .and_then(half_points)
        .or_else(|| char_style.and_then(|cs| cs.font_size));

    let font_name = rpr
        .and_then(|n| wml(n, "rFonts"))
        .and_then(|rfonts| resolve_font_from_node(rfonts, &ctx.styles.theme))
        .or_else(|| char_style.and_then(|cs| cs.font_name.clone()));

    let bold = rpr
        .and_then(|n| wml_bool(n, "b"))
        .or_else(|| char_style.and_then(|cs| cs.bold))
        .unwrap_or(false);
    let italic = rpr
        .and_then(|n| wml_bool(n, "i"))
        .or_else(|| char_style.and_then(|cs| cs.italic))
        .unwrap_or(false);
    let underline = rpr
        .and_then(|n| {
            wml(n, "u")
                .and_then(|u| u.attribute((WML_NS, "val")))
                .map(|v| v != "none")
        })
        .or_else(|| char_style.and_then(|cs| cs.underline))
        .unwrap_or(false);

    let vertical_align = rpr
        .and_then(|n| wml_attr(n, "vertAlign"))
        .map(parse_vert_align)
        .or_else(|| char_style.and_then(|cs| cs.vertical_align))
        .unwrap_or(VertAlign::Baseline);

    let color = rpr
        .and_then(|n| wml_attr(n, "color"))
        .and_then(parse_hex_color)
        .or_else(|| char_style.and_then(|cs| cs.color));

    Run {
        text: String::new(),
        font_name,
        font_size,
        bold,
        italic,
        underline,
        vertical_align,
        color,
        char_style: char_style_id.map(String::from),
        hyperlink: None,
        embedded: None,
    }
}
