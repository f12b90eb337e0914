// pdftable - extract ruled tables from PDF pages
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use pdftable::{
    get_pdf_page_count, init_pdfium, logger, open_document, ParsedTablePage, PdfTableParser,
    Settings,
};

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// TOML settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Rendering DPI (overrides the config file)
    #[arg(long, global = true)]
    dpi: Option<u32>,

    /// Directory holding the pdfium library
    #[arg(long, global = true)]
    pdfium_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract table text from pages
    Parse {
        /// PDF file
        file: PathBuf,
        /// Page range, e.g. `3` or `2-5` (default: all pages)
        #[arg(long)]
        pages: Option<String>,
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },
    /// Save rendered pages as page_<n>.png
    Render {
        file: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        pages: Option<String>,
    },
    /// Save the intermediate detection images of each page
    Debug {
        file: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        pages: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Markdown,
    Text,
}

/// Parse `N` or `A-B` (1-based, inclusive). No range means every page.
fn parse_page_range(range: Option<&str>, page_count: usize) -> Result<(usize, usize)> {
    let Some(range) = range else {
        if page_count == 0 {
            bail!("document has no pages");
        }
        return Ok((1, page_count));
    };
    let (start, end) = match range.split_once('-') {
        Some((a, b)) => (a.trim(), b.trim()),
        None => (range.trim(), range.trim()),
    };
    let start: usize = start
        .parse()
        .with_context(|| format!("invalid start page in '{range}'"))?;
    let end: usize = end
        .parse()
        .with_context(|| format!("invalid end page in '{range}'"))?;
    Ok((start, end))
}

fn load_settings(args: &Args) -> Result<Settings> {
    let base = match &args.config {
        Some(path) => Settings::from_toml_file(path)?,
        None => Settings::default(),
    };
    let mut builder = base.to_builder();
    if let Some(dpi) = args.dpi {
        builder = builder.rendering_dpi(dpi);
    }
    if let Some(dir) = &args.pdfium_dir {
        builder = builder.pdfium_library_dir(dir);
    }
    Ok(builder.build()?)
}

fn print_page(page: &ParsedTablePage, format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(page)?),
        Format::Markdown => {
            println!("## Page {}\n", page.page_number());
            print!("{}", page.to_markdown());
            println!();
        }
        Format::Text => {
            println!("Page {}", page.page_number());
            for line in page.to_text_grid(120) {
                println!("{line}");
            }
        }
    }
    Ok(())
}

fn run(args: Args) -> Result<bool> {
    let settings = load_settings(&args)?;
    let pdfium = init_pdfium(settings.pdfium_library_dir())?;
    let parser = PdfTableParser::new(settings);

    let open = |file: &Path| {
        open_document(pdfium, file).with_context(|| format!("failed to open '{}'", file.display()))
    };

    match &args.command {
        Command::Parse {
            file,
            pages,
            format,
        } => {
            let document = open(file)?;
            let (start, end) = parse_page_range(pages.as_deref(), get_pdf_page_count(&document))?;
            let outcomes = parser.parse_pdf_pages(&document, start, end)?;

            let mut all_ok = true;
            for outcome in outcomes {
                match outcome.result {
                    Ok(page) => print_page(&page, *format)?,
                    Err(e) => {
                        all_ok = false;
                        eprintln!("page {}: {}", outcome.page_number, e);
                    }
                }
            }
            Ok(all_ok)
        }
        Command::Render { file, out, pages } => {
            let document = open(file)?;
            let (start, end) = parse_page_range(pages.as_deref(), get_pdf_page_count(&document))?;
            let written = parser
                .save_pdf_pages_as_png(&document, start, end, out)
                .context("failed to render pages")?;
            for path in written {
                println!("{}", path.display());
            }
            Ok(true)
        }
        Command::Debug { file, out, pages } => {
            let document = open(file)?;
            let (start, end) = parse_page_range(pages.as_deref(), get_pdf_page_count(&document))?;
            parser
                .save_pdf_pages_debug_images(&document, start, end, out)
                .context("failed to write debug images")?;
            println!("debug images written to {}", out.display());
            Ok(true)
        }
    }
}

fn main() -> ExitCode {
    logger::init();
    let args = Args::parse();

    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
