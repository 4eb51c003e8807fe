use std::fmt::Write as _;
use std::io::{Cursor, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;

use crate::error::Error;
use crate::model::{Block, Document, Hyperlink, PAGE_BREAK, Paragraph, Run, Table, VertAlign};

use super::{DOCUMENT_PART, REL_NS, WML_NS};

const XML_DECLARATION: &str =
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\r\n";

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const PACKAGE_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

fn xml_escape_text(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn xml_escape_attr(value: &str) -> String {
    xml_escape_text(value)
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

pub fn write(doc: &Document, path: &Path) -> Result<(), Error> {
    let bytes = to_bytes(doc)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Serialize the document as a DOCX package. Parts other than the main document
/// are copied unchanged from the source package.
pub fn to_bytes(doc: &Document) -> Result<Vec<u8>, Error> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let source_xml = doc
        .package
        .as_ref()
        .and_then(|p| p.part_text(DOCUMENT_PART));
    let document_xml = document_xml(doc, source_xml.as_deref());

    match doc.package.as_ref() {
        Some(package) => {
            let mut wrote_document = false;
            for (name, data) in &package.parts {
                zip.start_file(name.as_str(), options)?;
                if name == DOCUMENT_PART {
                    zip.write_all(document_xml.as_bytes())?;
                    wrote_document = true;
                } else {
                    zip.write_all(data)?;
                }
            }
            if !wrote_document {
                zip.start_file(DOCUMENT_PART, options)?;
                zip.write_all(document_xml.as_bytes())?;
            }
        }
        None => {
            zip.start_file("[Content_Types].xml", options)?;
            zip.write_all(CONTENT_TYPES_XML.as_bytes())?;
            zip.start_file("_rels/.rels", options)?;
            zip.write_all(PACKAGE_RELS_XML.as_bytes())?;
            zip.start_file(DOCUMENT_PART, options)?;
            zip.write_all(document_xml.as_bytes())?;
        }
    }

    Ok(zip.finish()?.into_inner())
}

/// Opening `w:document` tag, reusing the source's namespace declarations so that
/// verbatim fragments keep resolving their prefixes.
fn root_start_tag(source_xml: Option<&str>) -> String {
    let source_tag = source_xml.and_then(|src| {
        let xml = roxmltree::Document::parse(src).ok()?;
        let start = xml.root_element().range().start;
        let end = start + src[start..].find('>')?;
        Some(src[start..end].trim_end_matches('/').to_string())
    });

    let mut tag = source_tag.unwrap_or_else(|| "<w:document".to_string());
    if !tag.contains("xmlns:w=") {
        let _ = write!(tag, " xmlns:w=\"{WML_NS}\"");
    }
    if !tag.contains("xmlns:r=") {
        let _ = write!(tag, " xmlns:r=\"{REL_NS}\"");
    }
    tag.push('>');
    tag
}

fn document_xml(doc: &Document, source_xml: Option<&str>) -> String {
    let mut out = String::from(XML_DECLARATION);
    out.push_str(&root_start_tag(source_xml));
    out.push_str("<w:body>");
    write_blocks(&mut out, &doc.blocks);
    if let Some(sect) = &doc.section_xml {
        out.push_str(sect);
    }
    out.push_str("</w:body></w:document>");
    out
}

fn write_blocks(out: &mut String, blocks: &[Block]) {
    for block in blocks {
        match block {
            Block::Paragraph(p) => write_paragraph(out, p),
            Block::Table(t) => write_table(out, t),
        }
    }
}

fn write_table(out: &mut String, table: &Table) {
    out.push_str("<w:tbl>");
    match &table.properties_xml {
        Some(pr) => out.push_str(pr),
        None => out.push_str("<w:tblPr><w:tblW w:w=\"0\" w:type=\"auto\"/></w:tblPr>"),
    }
    match &table.grid_xml {
        Some(grid) => out.push_str(grid),
        None => {
            let columns = table.rows.iter().map(|r| r.cells.len()).max().unwrap_or(0);
            out.push_str("<w:tblGrid>");
            for _ in 0..columns {
                out.push_str("<w:gridCol/>");
            }
            out.push_str("</w:tblGrid>");
        }
    }
    for row in &table.rows {
        out.push_str("<w:tr>");
        if let Some(pr) = &row.properties_xml {
            out.push_str(pr);
        }
        for cell in &row.cells {
            out.push_str("<w:tc>");
            if let Some(pr) = &cell.properties_xml {
                out.push_str(pr);
            }
            write_blocks(out, &cell.blocks);
            // A cell must end with a paragraph
            if !matches!(cell.blocks.last(), Some(Block::Paragraph(_))) {
                out.push_str("<w:p/>");
            }
            out.push_str("</w:tc>");
        }
        out.push_str("</w:tr>");
    }
    out.push_str("</w:tbl>");
}

fn write_paragraph(out: &mut String, para: &Paragraph) {
    out.push_str("<w:p>");
    match (&para.properties_xml, &para.style_id) {
        (Some(ppr), _) => out.push_str(ppr),
        (None, Some(style)) => {
            let _ = write!(
                out,
                "<w:pPr><w:pStyle w:val=\"{}\"/></w:pPr>",
                xml_escape_attr(style)
            );
        }
        (None, None) => {}
    }

    let mut open_link: Option<&Hyperlink> = None;
    for run in &para.runs {
        if run.hyperlink.as_ref() != open_link {
            if open_link.is_some() {
                out.push_str("</w:hyperlink>");
            }
            if let Some(link) = &run.hyperlink {
                out.push_str("<w:hyperlink");
                if let Some(id) = &link.rel_id {
                    let _ = write!(out, " r:id=\"{}\"", xml_escape_attr(id));
                }
                if let Some(anchor) = &link.anchor {
                    let _ = write!(out, " w:anchor=\"{}\"", xml_escape_attr(anchor));
                }
                out.push('>');
            }
            open_link = run.hyperlink.as_ref();
        }
        write_run(out, run);
    }
    if open_link.is_some() {
        out.push_str("</w:hyperlink>");
    }
    out.push_str("</w:p>");
}

fn write_run_properties(out: &mut String, run: &Run) {
    let mut rpr = String::new();
    if let Some(style) = &run.char_style {
        let _ = write!(rpr, "<w:rStyle w:val=\"{}\"/>", xml_escape_attr(style));
    }
    if let Some(font) = &run.font_name {
        let font = xml_escape_attr(font);
        let _ = write!(
            rpr,
            "<w:rFonts w:ascii=\"{font}\" w:hAnsi=\"{font}\" w:cs=\"{font}\"/>"
        );
    }
    if run.bold {
        rpr.push_str("<w:b/>");
    }
    if run.italic {
        rpr.push_str("<w:i/>");
    }
    if let Some([r, g, b]) = run.color {
        let _ = write!(rpr, "<w:color w:val=\"{r:02X}{g:02X}{b:02X}\"/>");
    }
    if let Some(size) = run.font_size {
        let half_points = (size * 2.0).round() as u32;
        let _ = write!(rpr, "<w:sz w:val=\"{half_points}\"/><w:szCs w:val=\"{half_points}\"/>");
    }
    if run.underline {
        rpr.push_str("<w:u w:val=\"single\"/>");
    }
    match run.vertical_align {
        VertAlign::Superscript => rpr.push_str("<w:vertAlign w:val=\"superscript\"/>"),
        VertAlign::Subscript => rpr.push_str("<w:vertAlign w:val=\"subscript\"/>"),
        VertAlign::Baseline => {}
    }
    if !rpr.is_empty() {
        let _ = write!(out, "<w:rPr>{rpr}</w:rPr>");
    }
}

fn write_run(out: &mut String, run: &Run) {
    if let Some(raw) = &run.embedded {
        out.push_str(raw);
        return;
    }

    out.push_str("<w:r>");
    write_run_properties(out, run);

    let mut pending = String::new();
    let flush = |out: &mut String, pending: &mut String| {
        if !pending.is_empty() {
            let _ = write!(
                out,
                "<w:t xml:space=\"preserve\">{}</w:t>",
                xml_escape_text(pending)
            );
            pending.clear();
        }
    };
    for ch in run.text.chars() {
        match ch {
            '\t' => {
                flush(out, &mut pending);
                out.push_str("<w:tab/>");
            }
            '\n' => {
                flush(out, &mut pending);
                out.push_str("<w:br/>");
            }
            PAGE_BREAK => {
                flush(out, &mut pending);
                out.push_str("<w:br w:type=\"page\"/>");
            }
            _ => pending.push(ch),
        }
    }
    flush(out, &mut pending);
    out.push_str("</w:r>");
}
