//! Markdown chapters to DOCX through an external converter (pandoc) with
//! citeproc-resolved citations.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Serialize;

use crate::error::Error;

/// Numbered superscript citations with a numbered reference list.
pub const DEFAULT_CSL: &str = "https://www.zotero.org/styles/vancouver-superscript";

/// Pandoc reader: markdown with a YAML title block and `[@key]` citations.
pub const MARKDOWN_READER: &str = "markdown+yaml_metadata_block+citations";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum BibFormat {
    BibTeX,
    CslJson,
}

impl BibFormat {
    pub fn extension(self) -> &'static str {
        match self {
            BibFormat::BibTeX => "bib",
            BibFormat::CslJson => "json",
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "bib" | "bibtex" => Some(BibFormat::BibTeX),
            "json" => Some(BibFormat::CslJson),
            _ => None,
        }
    }
}

/// Bibliography content handed to the converter unchanged.
#[derive(Clone, Debug)]
pub struct Bibliography {
    pub format: BibFormat,
    pub content: String,
}

impl Bibliography {
    pub fn bibtex(content: impl Into<String>) -> Self {
        Self {
            format: BibFormat::BibTeX,
            content: content.into(),
        }
    }

    /// CSL-JSON must be a JSON array of records.
    pub fn csl_json(content: impl Into<String>) -> Result<Self, Error> {
        let content = content.into();
        let value: serde_json::Value = serde_json::from_str(&content)
            .map_err(|e| Error::InvalidBibliography(format!("CSL-JSON does not parse: {e}")))?;
        let Some(records) = value.as_array() else {
            return Err(Error::InvalidBibliography(
                "CSL-JSON bibliography must be an array of records".into(),
            ));
        };
        if let Some(pos) = records.iter().position(|r| !r.is_object()) {
            return Err(Error::InvalidBibliography(format!(
                "CSL-JSON record {pos} is not an object"
            )));
        }
        log::debug!("CSL-JSON bibliography with {} records", records.len());
        Ok(Self {
            format: BibFormat::CslJson,
            content,
        })
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let format = BibFormat::from_path(path).ok_or_else(|| {
            Error::InvalidBibliography(format!(
                "{}: expected a .bib or .json file",
                path.display()
            ))
        })?;
        let content = std::fs::read_to_string(path)?;
        match format {
            BibFormat::BibTeX => Ok(Self::bibtex(content)),
            BibFormat::CslJson => Self::csl_json(content),
        }
    }
}

/// One markdown chapter, in output order.
#[derive(Clone, Debug)]
pub struct ChapterSource {
    pub name: String,
    pub markdown: String,
}

impl ChapterSource {
    pub fn new(name: impl Into<String>, markdown: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            markdown: markdown.into(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            name,
            markdown: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

#[derive(Clone, Debug)]
pub struct ConversionOptions {
    /// CSL style URL or path.
    pub csl: String,
    /// Title of the combined document.
    pub title: String,
    pub reference_section_title: String,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            csl: DEFAULT_CSL.to_string(),
            title: "My Book".to_string(),
            reference_section_title: "References".to_string(),
        }
    }
}

/// Turns one markdown unit into DOCX bytes.
pub trait Converter {
    fn convert(
        &self,
        unit: &str,
        markdown: &str,
        bibliography: &Bibliography,
        options: &ConversionOptions,
    ) -> Result<Vec<u8>, Error>;
}

/// Runs the `pandoc` binary with `--citeproc`.
#[derive(Clone, Debug)]
pub struct Pandoc {
    program: PathBuf,
}

impl Default for Pandoc {
    fn default() -> Self {
        Self {
            program: PathBuf::from("pandoc"),
        }
    }
}

impl Pandoc {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn args(
        input: &Path,
        output: &Path,
        bibliography: &Path,
        options: &ConversionOptions,
    ) -> Vec<String> {
        vec![
            input.display().to_string(),
            "--from".into(),
            MARKDOWN_READER.into(),
            "--to".into(),
            "docx".into(),
            "--output".into(),
            output.display().to_string(),
            "--citeproc".into(),
            format!("--csl={}", options.csl),
            format!("--bibliography={}", bibliography.display()),
            "--metadata".into(),
            "link-citations=true".into(),
            "--metadata".into(),
            format!("reference-section-title={}", options.reference_section_title),
        ]
    }
}

impl Converter for Pandoc {
    fn convert(
        &self,
        unit: &str,
        markdown: &str,
        bibliography: &Bibliography,
        options: &ConversionOptions,
    ) -> Result<Vec<u8>, Error> {
        let failed = |message: String| Error::Conversion {
            unit: unit.to_string(),
            message,
        };

        let dir = tempfile::tempdir()?;
        let input = dir.path().join("input.md");
        let output = dir.path().join("output.docx");
        let bib = dir
            .path()
            .join(format!("bibliography.{}", bibliography.format.extension()));
        std::fs::write(&input, markdown)?;
        std::fs::write(&bib, &bibliography.content)?;

        log::debug!("Running {} for {unit}", self.program.display());
        let result = Command::new(&self.program)
            .args(Self::args(&input, &output, &bib, options))
            .output()
            .map_err(|e| failed(format!("failed to run {}: {e}", self.program.display())))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(failed(format!(
                "pandoc exited with {}: {}",
                result.status,
                stderr.trim()
            )));
        }

        std::fs::read(&output).map_err(|e| failed(format!("no output produced: {e}")))
    }
}

fn yaml_quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// All chapters in one markdown source: a YAML title block, then the chapters
/// separated by horizontal rules.
pub fn combined_markdown(chapters: &[ChapterSource], title: &str) -> String {
    let mut parts = vec![
        "---".to_string(),
        format!("title: {}", yaml_quote(title)),
        "link-citations: true".to_string(),
        "---".to_string(),
        String::new(),
    ];
    for (i, chapter) in chapters.iter().enumerate() {
        if i > 0 {
            parts.push("\n***\n".to_string());
        }
        parts.push(chapter.markdown.clone());
    }
    parts.join("\n")
}

/// Convert every chapter into one document with a single reference list.
/// Any failure fails the whole conversion.
pub fn convert_combined(
    converter: &dyn Converter,
    chapters: &[ChapterSource],
    bibliography: &Bibliography,
    options: &ConversionOptions,
) -> Result<Vec<u8>, Error> {
    if chapters.is_empty() {
        return Err(Error::Conversion {
            unit: "combined document".into(),
            message: "no chapters to convert".into(),
        });
    }
    let markdown = combined_markdown(chapters, &options.title);
    let bytes = converter.convert("combined document", &markdown, bibliography, options)?;
    log::info!(
        "Converted {} chapter(s) into one document ({} bytes)",
        chapters.len(),
        bytes.len()
    );
    Ok(bytes)
}

/// What happens to the remaining chapters when one fails in per-chapter mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum FailurePolicy {
    /// Stop and report the first failure; nothing is delivered.
    #[default]
    Halt,
    /// Record the failure for that chapter and convert the rest.
    Isolate,
}

#[derive(Debug)]
pub struct ConvertedChapter {
    pub name: String,
    pub file_name: String,
    pub outcome: Result<Vec<u8>, Error>,
}

/// `chapter_02.docx`
pub fn converted_file_name(ordinal: usize) -> String {
    format!("chapter_{ordinal:02}.docx")
}

/// Convert each chapter on its own, each with its own reference list.
pub fn convert_per_chapter(
    converter: &dyn Converter,
    chapters: &[ChapterSource],
    bibliography: &Bibliography,
    options: &ConversionOptions,
    policy: FailurePolicy,
) -> Result<Vec<ConvertedChapter>, Error> {
    let mut converted = Vec::with_capacity(chapters.len());
    for (i, chapter) in chapters.iter().enumerate() {
        let outcome = match converter.convert(&chapter.name, &chapter.markdown, bibliography, options)
        {
            Ok(bytes) => {
                log::info!("Converted {} ({} bytes)", chapter.name, bytes.len());
                Ok(bytes)
            }
            Err(e) if policy == FailurePolicy::Halt => return Err(e),
            Err(e) => {
                log::warn!("Skipping {}: {e}", chapter.name);
                Err(e)
            }
        };
        converted.push(ConvertedChapter {
            name: chapter.name.clone(),
            file_name: converted_file_name(i + 1),
            outcome,
        });
    }
    Ok(converted)
}

/// Write the successful chapters into `dir`. Returns the written paths.
pub fn write_converted(chapters: &[ConvertedChapter], dir: &Path) -> Result<Vec<PathBuf>, Error> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    for chapter in chapters {
        if let Ok(bytes) = &chapter.outcome {
            let path = dir.join(&chapter.file_name);
            std::fs::write(&path, bytes)?;
            written.push(path);
        }
    }
    Ok(written)
}
