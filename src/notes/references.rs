use std::sync::LazyLock;

use regex::Regex;

use crate::model::{Paragraph, ReferenceMap, SectionRange};

/// Leading-number forms of a reference entry, in priority order:
/// `N.`, `N)`, `N]` (optionally `[N]`), `N` + whitespace, `N` + dash/colon.
static ENTRY_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?s)^(\d+)\.\s*(.+)$",
        r"(?s)^(\d+)\)\s*(.+)$",
        r"(?s)^\[?(\d+)\]\s*(.+)$",
        r"(?s)^(\d+)\s+([^-–—:\s].*)$",
        r"(?s)^(\d+)\s*[-–—:]\s*(.+)$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static reference pattern"))
    .collect()
});

/// Split a reference line into its number and the start of its text.
pub fn match_entry(text: &str) -> Option<(u32, &str)> {
    ENTRY_PATTERNS.iter().find_map(|re| {
        let caps = re.captures(text)?;
        let number = caps.get(1)?.as_str().parse::<u32>().ok().filter(|n| *n > 0)?;
        let rest = caps.get(2)?.as_str().trim();
        (!rest.is_empty()).then_some((number, rest))
    })
}

fn commit(refs: &mut ReferenceMap, open: Option<(u32, String)>) {
    if let Some((number, text)) = open {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if refs.insert(number, text.to_string()).is_some() {
            log::debug!("Reference {number} defined more than once; keeping the later entry");
        }
    }
}

/// Parse numbered reference entries from the content of one section. Lines that do
/// not start with a number continue the open entry.
pub fn parse_references(paragraphs: &[&Paragraph], section: &SectionRange) -> ReferenceMap {
    let mut refs = ReferenceMap::new();
    let mut open: Option<(u32, String)> = None;

    let end = section.end.min(paragraphs.len());
    for para in paragraphs.iter().take(end).skip(section.start) {
        let text = para.text();
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        match match_entry(text) {
            Some((number, rest)) => {
                commit(&mut refs, open.take());
                open = Some((number, rest.to_string()));
            }
            None => {
                if let Some((_, current)) = open.as_mut() {
                    current.push(' ');
                    current.push_str(text);
                }
            }
        }
    }
    commit(&mut refs, open);
    refs
}
