//! CLI tool for generating report outbrief decks from PowerPoint templates.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use outbrief_core::package::EXTENSION;
use outbrief_core::{
    export_deck, lint, ExportJob, ExportKind, ExportSettings, MappingManager, PlainTextConverter,
    ReportData,
};
use outbrief_pptx::{list_layouts, PptxReader, PptxWriter};
use serde_json::Value;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Generate outbrief slide decks from a report and a PowerPoint template.
#[derive(Parser, Debug)]
#[command(name = "outbrief")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a deck from a report and a template
    Export(ExportArgs),

    /// List the slide layouts of a template with their indices
    Layouts {
        /// Template file (.pptx)
        #[arg(short, long)]
        template: PathBuf,
    },

    /// Check a template and a slide mapping for problems
    Lint {
        /// Template file (.pptx)
        #[arg(short, long)]
        template: PathBuf,

        /// Slide mapping file (JSON)
        #[arg(short, long)]
        mapping: Option<PathBuf>,

        /// Exit with an error status when linting finds errors
        #[arg(long)]
        strict: bool,
    },

    /// Write the default slide mapping
    InitMapping {
        /// Output file (default: print to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct ExportArgs {
    /// Template file (.pptx)
    #[arg(short, long)]
    template: PathBuf,

    /// Report data file (JSON)
    #[arg(short, long)]
    report: PathBuf,

    /// Slide mapping file (JSON, default: built-in mapping)
    #[arg(short, long)]
    mapping: Option<PathBuf>,

    /// Export settings file (JSON)
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Date format, overriding the settings file (strftime syntax)
    #[arg(long)]
    date_format: Option<String>,

    /// Which slides to build: report or project
    #[arg(short, long, default_value = "report")]
    kind: ExportKind,

    /// Output file (default: the report name with a .pptx extension)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    match cli.command {
        Command::Export(args) => run_export(&args, cli.verbose),
        Command::Layouts { template } => run_layouts(&template),
        Command::Lint {
            template,
            mapping,
            strict,
        } => run_lint(&template, mapping.as_deref(), strict),
        Command::InitMapping { output } => run_init_mapping(output.as_deref()),
    }
}

fn run_export(args: &ExportArgs, verbose: bool) -> Result<()> {
    let data: ReportData = read_json(&args.report)?;
    let mapping = args.mapping.as_deref().map(read_json::<Value>).transpose()?;
    let mut settings = match &args.settings {
        Some(path) => read_json::<ExportSettings>(path)?,
        None => ExportSettings::default(),
    };
    if let Some(format) = &args.date_format {
        settings.date_format = format.clone();
    }
    log::debug!(
        "Exporting {} from {} using {}",
        args.kind,
        args.report.display(),
        args.template.display()
    );

    let job = ExportJob {
        template: &args.template,
        mapping: mapping.as_ref(),
        data: &data,
        settings: &settings,
        kind: args.kind,
        today: None,
    };
    let bytes = export_deck(&job, &PptxReader::new(), &PptxWriter::new(), &PlainTextConverter::new())
        .with_context(|| format!("Failed to export {}", args.template.display()))?;

    let output_path = get_output_path(&args.report, args.output.as_ref())?;
    write_output(&output_path, &bytes)?;
    if verbose {
        eprintln!("Written to: {}", output_path.display());
    }
    Ok(())
}

fn run_layouts(template: &Path) -> Result<()> {
    let layouts = list_layouts(template);
    if layouts.is_empty() {
        bail!("No layouts found in {}", template.display());
    }
    for (index, name) in layouts {
        println!("{}\t{}", index, name);
    }
    Ok(())
}

fn run_lint(template: &Path, mapping: Option<&Path>, strict: bool) -> Result<()> {
    let mapping = mapping.map(read_json::<Value>).transpose()?;
    if mapping.is_none() {
        log::debug!("No mapping given, linting the built-in mapping");
    }
    let (warnings, errors) = lint(&PptxReader::new(), template, mapping.as_ref()).into_parts();

    for warning in &warnings {
        println!("warning: {}", warning);
    }
    for error in &errors {
        println!("error: {}", error);
    }
    if warnings.is_empty() && errors.is_empty() {
        println!("No problems found");
    }

    if strict && !errors.is_empty() {
        bail!("Linting found {} errors", errors.len());
    }
    Ok(())
}

fn run_init_mapping(output: Option<&Path>) -> Result<()> {
    let document = serde_json::to_string_pretty(&MappingManager::default().to_value())
        .context("Failed to serialize the default mapping")?;
    match output {
        Some(path) => write_output(path, format!("{}\n", document).as_bytes()),
        None => {
            println!("{}", document);
            Ok(())
        }
    }
}

/// Read and deserialize a JSON file.
fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    serde_json::from_reader(std::io::BufReader::new(file))
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Determine the output path for a generated deck.
fn get_output_path(report_path: &Path, output: Option<&PathBuf>) -> Result<PathBuf> {
    if let Some(path) = output {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
        }
        return Ok(path.clone());
    }

    let stem = report_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("outbrief");
    let output_filename = format!("{}.{}", stem, EXTENSION);

    let output_path = if let Some(parent) = report_path.parent() {
        parent.join(output_filename)
    } else {
        PathBuf::from(output_filename)
    };

    Ok(output_path)
}

/// Write output to a file.
fn write_output(path: &Path, content: &[u8]) -> Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;

    file.write_all(content)
        .with_context(|| format!("Failed to write to {}", path.display()))?;

    Ok(())
}
