use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use docxide_notes::convert::{
    Bibliography, ChapterSource, ConversionOptions, DEFAULT_CSL, FailurePolicy, Pandoc,
    convert_combined, convert_per_chapter, write_converted,
};
use docxide_notes::{
    ChapterStrategy, CitationOptions, CitationStyle, Error, HeuristicOptions, Pipeline,
    notes::DEFAULT_MAX_RANGE_SPAN,
};

#[derive(Parser)]
#[command(
    name = "docxide-notes",
    version,
    about = "Inline numbered Notes/References citations into DOCX body text"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the font sizes used by body paragraphs, largest first
    Fonts {
        input: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// List paragraphs set in a given font size as chapter-start candidates
    Candidates {
        input: PathBuf,
        /// Font size in points
        #[arg(long)]
        size: f32,
        #[arg(long)]
        json: bool,
    },
    /// Show the chapter boundaries a strategy produces
    Chapters {
        input: PathBuf,
        #[command(flatten)]
        strategy: StrategyArgs,
        #[arg(long)]
        json: bool,
    },
    /// Inline citations chapter by chapter and write the rejoined document
    Process {
        input: PathBuf,
        /// Output DOCX
        #[arg(short, long)]
        output: PathBuf,
        #[command(flatten)]
        strategy: StrategyArgs,
        #[arg(long, value_enum, default_value_t = CitationStyle::Bracketed)]
        style: CitationStyle,
        /// Also rewrite parenthesized markers like (3)
        #[arg(long)]
        allow_parens: bool,
        /// Widest accepted citation range such as [1-5]
        #[arg(long, default_value_t = DEFAULT_MAX_RANGE_SPAN)]
        max_range_span: u32,
        /// Remove the Notes/References sections after inlining
        #[arg(long)]
        delete_notes: bool,
        /// Also write every processed chapter as its own DOCX into this directory
        #[arg(long)]
        chapters_dir: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Convert markdown chapters with [@key] citations to DOCX via pandoc
    Convert {
        /// Markdown files, one per chapter, in order
        #[arg(required = true)]
        chapters: Vec<PathBuf>,
        /// BibTeX (.bib) or CSL-JSON (.json) bibliography
        #[arg(short, long)]
        bibliography: PathBuf,
        /// Output DOCX, or output directory with --per-chapter
        #[arg(short, long)]
        output: PathBuf,
        /// CSL style URL or path
        #[arg(long, default_value = DEFAULT_CSL)]
        csl: String,
        /// Title of the combined document
        #[arg(long, default_value = "My Book")]
        title: String,
        /// One DOCX per chapter instead of one combined document
        #[arg(long)]
        per_chapter: bool,
        #[arg(long, value_enum, default_value_t = FailurePolicy::Halt)]
        on_failure: FailurePolicy,
        #[arg(long, default_value = "pandoc")]
        pandoc: PathBuf,
    },
}

#[derive(Args)]
#[group(multiple = false)]
struct StrategyArgs {
    /// Every paragraph in this font size starts a chapter
    #[arg(long)]
    font_size: Option<f32>,
    /// Comma-separated paragraph indices that start chapters
    #[arg(long, value_delimiter = ',')]
    select: Option<Vec<usize>>,
    /// Detect headings from style, size and text patterns
    #[arg(long)]
    heuristic: bool,
}

impl StrategyArgs {
    /// No flag means one chapter for the whole document.
    fn strategy(&self) -> ChapterStrategy {
        if let Some(size) = self.font_size {
            ChapterStrategy::FontSize(size)
        } else if let Some(selected) = &self.select {
            ChapterStrategy::Selected(selected.clone())
        } else if self.heuristic {
            ChapterStrategy::Heuristic(HeuristicOptions::default())
        } else {
            ChapterStrategy::Selected(Vec::new())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Error> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| Error::Io(std::io::Error::other(e)))?;
    println!("{text}");
    Ok(())
}

fn fonts(input: &Path, json: bool) -> Result<(), Error> {
    let report = Pipeline::load(input)?.font_sizes();
    if json {
        return print_json(&report);
    }
    for usage in &report {
        println!("{:>6.1}pt  {:>5} paragraph(s)", usage.size, usage.count);
        for example in &usage.examples {
            println!("          [{}] {}", example.index, example.text);
        }
    }
    Ok(())
}

fn candidates(input: &Path, size: f32, json: bool) -> Result<(), Error> {
    let candidates = Pipeline::load(input)?.candidates(size);
    if json {
        return print_json(&candidates);
    }
    if candidates.is_empty() {
        println!("No paragraphs set in {size}pt");
    }
    for c in &candidates {
        println!("{:>6}  {}", c.index, c.preview);
    }
    Ok(())
}

fn chapters(input: &Path, strategy: &ChapterStrategy, json: bool) -> Result<(), Error> {
    let segmented = Pipeline::load(input)?.segment(strategy)?;
    if json {
        return print_json(&segmented.boundaries());
    }
    for (i, b) in segmented.boundaries().iter().enumerate() {
        println!(
            "{:>3}. {:>6}..={:<6} ({} paragraphs)  {}",
            i + 1,
            b.start,
            b.end,
            b.paragraph_count(),
            b.title
        );
    }
    Ok(())
}

struct ProcessArgs<'a> {
    input: &'a Path,
    output: &'a Path,
    strategy: ChapterStrategy,
    options: CitationOptions,
    chapters_dir: Option<&'a Path>,
    json: bool,
}

fn process(args: ProcessArgs) -> Result<(), Error> {
    let processed = Pipeline::load(args.input)?
        .segment(&args.strategy)?
        .process(&args.options);

    if let Some(dir) = args.chapters_dir {
        let written = processed.write_chapters(dir)?;
        log::info!("Wrote {} chapter file(s) to {}", written.len(), dir.display());
    }

    let reports = processed.reports();
    let total = processed.total_replacements();
    docxide_notes::docx::write(&processed.rejoin(), args.output)?;

    if args.json {
        return print_json(&reports);
    }
    for r in &reports {
        println!(
            "{:<40} {:?}: {} reference(s), {} replacement(s)",
            r.title, r.status, r.references, r.replacements
        );
    }
    println!("{total} citation(s) inlined -> {}", args.output.display());
    Ok(())
}

struct ConvertArgs<'a> {
    chapters: &'a [PathBuf],
    bibliography: &'a Path,
    output: &'a Path,
    options: ConversionOptions,
    per_chapter: bool,
    on_failure: FailurePolicy,
    pandoc: &'a Path,
}

fn convert(args: ConvertArgs) -> Result<(), Error> {
    let bibliography = Bibliography::load(args.bibliography)?;
    let sources = args
        .chapters
        .iter()
        .map(|p| ChapterSource::load(p))
        .collect::<Result<Vec<_>, _>>()?;
    let pandoc = Pandoc::new(args.pandoc);

    if args.per_chapter {
        let converted = convert_per_chapter(
            &pandoc,
            &sources,
            &bibliography,
            &args.options,
            args.on_failure,
        )?;
        let written = write_converted(&converted, args.output)?;
        for chapter in &converted {
            if let Err(e) = &chapter.outcome {
                eprintln!("{}: {e}", chapter.name);
            }
        }
        println!(
            "{} of {} chapter(s) written to {}",
            written.len(),
            converted.len(),
            args.output.display()
        );
    } else {
        let bytes = convert_combined(&pandoc, &sources, &bibliography, &args.options)?;
        std::fs::write(args.output, bytes)?;
        println!("Wrote {}", args.output.display());
    }
    Ok(())
}

fn run(cli: Cli) -> Result<(), Error> {
    match cli.command {
        Command::Fonts { input, json } => fonts(&input, json),
        Command::Candidates { input, size, json } => candidates(&input, size, json),
        Command::Chapters {
            input,
            strategy,
            json,
        } => chapters(&input, &strategy.strategy(), json),
        Command::Process {
            input,
            output,
            strategy,
            style,
            allow_parens,
            max_range_span,
            delete_notes,
            chapters_dir,
            json,
        } => process(ProcessArgs {
            input: &input,
            output: &output,
            strategy: strategy.strategy(),
            options: CitationOptions {
                style,
                allow_parens,
                max_range_span,
                delete_notes,
            },
            chapters_dir: chapters_dir.as_deref(),
            json,
        }),
        Command::Convert {
            chapters,
            bibliography,
            output,
            csl,
            title,
            per_chapter,
            on_failure,
            pandoc,
        } => convert(ConvertArgs {
            chapters: &chapters,
            bibliography: &bibliography,
            output: &output,
            options: ConversionOptions {
                csl,
                title,
                ..ConversionOptions::default()
            },
            per_chapter,
            on_failure,
            pandoc: &pandoc,
        }),
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
