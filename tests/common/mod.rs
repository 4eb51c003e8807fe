#![allow(dead_code)]

use std::io::{Cursor, Write};

use docxide_notes::Document;
use docxide_notes::model::{Block, Paragraph};
use zip::write::SimpleFileOptions;

pub const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

/// Normal 11pt, Heading1 16pt, Title 28pt, a superscript character style.
pub const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:docDefaults><w:rPrDefault><w:rPr><w:sz w:val="22"/></w:rPr></w:rPrDefault></w:docDefaults>
<w:style w:type="paragraph" w:styleId="Normal"><w:name w:val="Normal"/><w:rPr><w:sz w:val="22"/></w:rPr></w:style>
<w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/><w:rPr><w:b/><w:sz w:val="32"/></w:rPr></w:style>
<w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/><w:basedOn w:val="Heading1"/></w:style>
<w:style w:type="paragraph" w:styleId="Title"><w:name w:val="Title"/><w:rPr><w:sz w:val="56"/></w:rPr></w:style>
<w:style w:type="character" w:styleId="EndnoteReference"><w:name w:val="endnote reference"/><w:rPr><w:vertAlign w:val="superscript"/></w:rPr></w:style>
</w:styles>"#;

/// Word's stock layout under a localized id: the default style "Standard"
/// carries no size, so body text takes the 12pt `docDefaults` size.
pub const SIZELESS_DEFAULT_STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:docDefaults><w:rPrDefault><w:rPr><w:sz w:val="24"/></w:rPr></w:rPrDefault></w:docDefaults>
<w:style w:type="paragraph" w:default="1" w:styleId="Standard"><w:name w:val="Normal"/></w:style>
<w:style w:type="paragraph" w:styleId="berschrift1"><w:name w:val="heading 1"/><w:basedOn w:val="Standard"/><w:rPr><w:sz w:val="32"/></w:rPr></w:style>
</w:styles>"#;

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// A plain run.
pub fn r(text: &str) -> String {
    format!(r#"<w:r><w:t xml:space="preserve">{}</w:t></w:r>"#, escape(text))
}

/// A run with raw `w:rPr` children.
pub fn r_with(props: &str, text: &str) -> String {
    format!(
        r#"<w:r><w:rPr>{props}</w:rPr><w:t xml:space="preserve">{}</w:t></w:r>"#,
        escape(text)
    )
}

pub fn sup(text: &str) -> String {
    r_with(r#"<w:vertAlign w:val="superscript"/>"#, text)
}

/// A run sized in points.
pub fn sized(points: f32, text: &str) -> String {
    r_with(
        &format!(r#"<w:sz w:val="{}"/>"#, (points * 2.0).round() as u32),
        text,
    )
}

/// A paragraph from raw run XML.
pub fn p_runs(runs: &[String]) -> String {
    format!("<w:p>{}</w:p>", runs.concat())
}

pub fn p(text: &str) -> String {
    if text.is_empty() {
        "<w:p/>".to_string()
    } else {
        p_runs(&[r(text)])
    }
}

pub fn p_styled(style_id: &str, text: &str) -> String {
    format!(
        r#"<w:p><w:pPr><w:pStyle w:val="{style_id}"/></w:pPr>{}</w:p>"#,
        r(text)
    )
}

/// A table with one paragraph per cell.
pub fn table(rows: &[&[&str]]) -> String {
    let rows: String = rows
        .iter()
        .map(|cells| {
            let cells: String = cells
                .iter()
                .map(|c| format!("<w:tc>{}</w:tc>", p(c)))
                .collect();
            format!("<w:tr>{cells}</w:tr>")
        })
        .collect();
    format!("<w:tbl><w:tblPr/><w:tblGrid><w:gridCol w:w=\"4000\"/></w:tblGrid>{rows}</w:tbl>")
}

pub fn document_xml(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{W_NS}" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><w:body>{body}<w:sectPr><w:pgSz w:w="12240" w:h="15840"/></w:sectPr></w:body></w:document>"#
    )
}

/// Zip the given parts into a DOCX package.
pub fn zip_parts(parts: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, content) in parts {
        zip.start_file(*name, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// A complete DOCX whose body is `body`.
pub fn build_docx(body: &str) -> Vec<u8> {
    build_docx_with_styles(body, STYLES_XML)
}

pub fn build_docx_with_styles(body: &str, styles: &str) -> Vec<u8> {
    let document = document_xml(body);
    zip_parts(&[
        ("[Content_Types].xml", CONTENT_TYPES),
        ("_rels/.rels", PACKAGE_RELS),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS),
        ("word/document.xml", &document),
        ("word/styles.xml", styles),
    ])
}

pub fn parse(body: &str) -> Document {
    docxide_notes::docx::parse_bytes(&build_docx(body)).unwrap()
}

pub fn parse_with_styles(body: &str, styles: &str) -> Document {
    docxide_notes::docx::parse_bytes(&build_docx_with_styles(body, styles)).unwrap()
}

/// Body made of one plain paragraph per line.
pub fn parse_lines(lines: &[&str]) -> Document {
    let body: String = lines.iter().map(|l| p(l)).collect();
    parse(&body)
}

/// Text of every paragraph, tables included, in document order.
pub fn texts(doc: &Document) -> Vec<String> {
    docxide_notes::paragraphs::paragraphs(doc)
        .map(Paragraph::text)
        .collect()
}

pub fn body_texts(doc: &Document) -> Vec<String> {
    doc.body_paragraphs().into_iter().map(Paragraph::text).collect()
}

pub fn first_table(doc: &Document) -> Option<&docxide_notes::model::Table> {
    doc.blocks.iter().find_map(|b| match b {
        Block::Table(t) => Some(t),
        Block::Paragraph(_) => None,
    })
}

/// Write through the DOCX writer and read the result back.
pub fn reparse(doc: &Document) -> Document {
    let bytes = docxide_notes::docx::to_bytes(doc).unwrap();
    docxide_notes::docx::parse_bytes(&bytes).unwrap()
}
