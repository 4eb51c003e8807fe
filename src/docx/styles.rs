use std::collections::HashMap;

use crate::model::{CharacterStyle, Package, ParagraphStyle, StyleSheet};

use super::{
    DML_NS, WML_NS, half_points, parse_hex_color, parse_vert_align, wml, wml_attr, wml_bool,
};

fn dml<'a>(node: roxmltree::Node<'a, 'a>, name: &str) -> Option<roxmltree::Node<'a, 'a>> {
    node.children()
        .find(|n| n.tag_name().name() == name && n.tag_name().namespace() == Some(DML_NS))
}

fn latin_typeface<'a>(node: roxmltree::Node<'a, 'a>) -> Option<&'a str> {
    dml(node, "latin")
        .and_then(|n| n.attribute("typeface"))
        .filter(|tf| !tf.is_empty())
}

pub(super) struct ThemeFonts {
    pub(super) major: String,
    pub(super) minor: String,
}

pub(super) struct StylesInfo {
    pub(super) sheet: StyleSheet,
    pub(super) theme: ThemeFonts,
}

pub(super) fn parse_theme(package: &Package) -> ThemeFonts {
    let mut major = String::from("Aptos Display");
    let mut minor = String::from("Aptos");

    let theme_name = package
        .parts
        .iter()
        .map(|(name, _)| name)
        .find(|n| n.starts_with("word/theme/") && n.ends_with(".xml"));
    let Some(xml_content) = theme_name.and_then(|name| package.part_text(name)) else {
        return ThemeFonts { major, minor };
    };
    let Ok(xml) = roxmltree::Document::parse(&xml_content) else {
        return ThemeFonts { major, minor };
    };

    for node in xml.descendants() {
        if node.tag_name().namespace() != Some(DML_NS) {
            continue;
        }
        match node.tag_name().name() {
            "majorFont" => {
                if let Some(tf) = latin_typeface(node) {
                    major = tf.to_string();
                }
            }
            "minorFont" => {
                if let Some(tf) = latin_typeface(node) {
                    minor = tf.to_string();
                }
            }
            _ => {}
        }
    }

    ThemeFonts { major, minor }
}

/// Explicit font named by a `w:rFonts` node, either directly or through a theme slot.
pub(super) fn resolve_font_from_node(rfonts: roxmltree::Node, theme: &ThemeFonts) -> Option<String> {
    if let Some(f) = rfonts.attribute((WML_NS, "ascii")) {
        return Some(f.to_string());
    }
    match rfonts.attribute((WML_NS, "asciiTheme")) {
        Some("majorHAnsi") | Some("majorAscii") => Some(theme.major.clone()),
        Some("minorHAnsi") | Some("minorAscii") => Some(theme.minor.clone()),
        _ => None,
    }
}

struct RawParagraphStyle {
    style: ParagraphStyle,
    based_on: Option<String>,
}

fn style_nodes<'a>(
    root: roxmltree::Node<'a, 'a>,
    kind: &'a str,
) -> impl Iterator<Item = (&'a str, roxmltree::Node<'a, 'a>)> {
    root.children()
        .filter(|n| n.tag_name().name() == "style" && n.tag_name().namespace() == Some(WML_NS))
        .filter(move |n| n.attribute((WML_NS, "type")) == Some(kind))
        .filter_map(|n| n.attribute((WML_NS, "styleId")).map(|id| (id, n)))
}

pub(super) fn parse_styles(package: &Package, theme: ThemeFonts) -> StylesInfo {
    let mut sheet = StyleSheet::default();

    let Some(xml_content) = package.part_text("word/styles.xml") else {
        return StylesInfo { sheet, theme };
    };
    let Ok(xml) = roxmltree::Document::parse(&xml_content) else {
        log::warn!("word/styles.xml is not well-formed; ignoring styles");
        return StylesInfo { sheet, theme };
    };

    let root = xml.root_element();

    sheet.default_font_size = wml(root, "docDefaults")
        .and_then(|n| wml(n, "rPrDefault"))
        .and_then(|n| wml(n, "rPr"))
        .and_then(|rpr| wml_attr(rpr, "sz"))
        .and_then(half_points);

    let mut raw_styles: HashMap<String, RawParagraphStyle> = HashMap::new();
    for (style_id, style_node) in style_nodes(root, "paragraph") {
        let name = wml_attr(style_node, "name").unwrap_or(style_id).to_string();
        let font_size = wml(style_node, "rPr")
            .and_then(|n| wml_attr(n, "sz"))
            .and_then(half_points);
        let based_on = wml_attr(style_node, "basedOn").map(|s| s.to_string());
        if matches!(style_node.attribute((WML_NS, "default")), Some("1" | "true" | "on")) {
            sheet.default_paragraph_style = Some(style_id.to_string());
        }
        raw_styles.insert(
            style_id.to_string(),
            RawParagraphStyle {
                style: ParagraphStyle { name, font_size },
                based_on,
            },
        );
    }
    sheet.paragraph_styles = resolve_based_on(raw_styles);

    // Character styles (e.g., "EndnoteReference" carrying superscript)
    for (style_id, style_node) in style_nodes(root, "character") {
        let Some(rpr) = wml(style_node, "rPr") else {
            continue;
        };
        let font_size = wml_attr(rpr, "sz").and_then(half_points);
        let font_name = wml(rpr, "rFonts").and_then(|rfonts| resolve_font_from_node(rfonts, &theme));
        let bold = wml_bool(rpr, "b");
        let italic = wml_bool(rpr, "i");
        let underline = wml(rpr, "u")
            .and_then(|n| n.attribute((WML_NS, "val")))
            .map(|v| v != "none");
        let vertical_align = wml_attr(rpr, "vertAlign").map(parse_vert_align);
        let color = wml_attr(rpr, "color").and_then(parse_hex_color);

        sheet.character_styles.insert(
            style_id.to_string(),
            CharacterStyle {
                font_size,
                font_name,
                bold,
                italic,
                underline,
                vertical_align,
                color,
            },
        );
    }

    StylesInfo { sheet, theme }
}

fn resolve_based_on(raw: HashMap<String, RawParagraphStyle>) -> HashMap<String, ParagraphStyle> {
    let mut resolved = HashMap::with_capacity(raw.len());
    for (id, entry) in &raw {
        let mut chain: Vec<&str> = Vec::new();
        let mut current = id.as_str();
        let mut font_size = entry.style.font_size;
        loop {
            if chain.contains(&current) {
                break;
            }
            chain.push(current);
            let Some(s) = raw.get(current) else {
                break;
            };
            if font_size.is_none() {
                font_size = s.style.font_size;
            }
            match s.based_on.as_deref() {
                Some(parent) => current = parent,
                None => break,
            }
        }
        resolved.insert(
            id.clone(),
            ParagraphStyle {
                name: entry.style.name.clone(),
                font_size,
            },
        );
    }
    resolved
}
