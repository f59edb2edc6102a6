use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use otl::archive::reconcile;
use otl::core::Document;
use otl::format_document;
use otl::storage::{Config, DocumentStore, FsStore};

#[derive(Debug, Parser)]
#[command(name = "otl", about = "VOTL outline tooling with a GTD archiver", version)]
struct Cli {
    /// Enable verbose logging for debugging.
    #[arg(long, global = true)]
    verbose: bool,
    /// Base directory against which outline file names are resolved.
    #[arg(long, global = true, env = "GTD_PATH", default_value = ".")]
    base_dir: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Move checked items from the active list into the archive.
    Archive(ArchiveArgs),

    /// Parse outline files and print their structure.
    Parse(ParseArgs),

    /// Reprint outline files in canonical form.
    Format(FormatArgs),
}

#[derive(Debug, Args)]
struct ArchiveArgs {
    /// Active task list to clean up, relative to the base directory.
    #[arg(default_value = "next_actions.otl")]
    infile: String,
    /// Archive file that receives completed items, relative to the base directory.
    #[arg(default_value = "archive.otl")]
    outfile: String,
}

#[derive(Debug, Args)]
struct ParseArgs {
    /// Outline files to parse.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Emit JSON instead of a debug representation.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct FormatArgs {
    /// Outline files to format.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Overwrite each file instead of printing to stdout.
    #[arg(long)]
    in_place: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbose = cli.verbose;
    let config = Config {
        base_dir: cli.base_dir,
    };
    match cli.command {
        Commands::Archive(args) => handle_archive(args, &config, verbose),
        Commands::Parse(args) => handle_parse(args, verbose),
        Commands::Format(args) => handle_format(args, verbose),
    }
}

fn handle_archive(args: ArchiveArgs, config: &Config, verbose: bool) -> Result<()> {
    let ArchiveArgs { infile, outfile } = args;
    let store = FsStore;
    let in_path = config.resolve(&infile);
    let out_path = config.resolve(&outfile);

    println!("Starting archiving from {infile} to {outfile}...");
    let mut active = store
        .load(&in_path)
        .with_context(|| format!("loading active list [{infile}]"))?;

    let mut archive = match store.load(&out_path) {
        Ok(doc) => doc,
        Err(err) if err.is_recoverable() => {
            println!(
                "No previous archive found at {outfile} or file is malformed, starting fresh."
            );
            if verbose {
                eprintln!("archive load: {err}");
            }
            Document::new()
        }
        Err(err) => return Err(err).with_context(|| format!("opening archive file [{outfile}]")),
    };

    let today = Local::now().date_naive();
    let report = reconcile(&mut active, &mut archive, today);
    for section in &report.sections {
        println!(
            "Archiving {} entries in heading: {}",
            section.moved, section.heading
        );
    }

    println!("Writing updated input file: {infile}");
    store
        .save(&active, &in_path)
        .context("writing updated active list")?;
    println!("Writing updated archive file: {outfile}");
    store
        .save(&archive, &out_path)
        .context("writing updated archive")?;

    println!("Archiving complete.");
    Ok(())
}

fn handle_parse(args: ParseArgs, verbose: bool) -> Result<()> {
    let ParseArgs { inputs, json } = args;
    let store = FsStore;

    let mut parsed = Vec::new();
    for path in inputs {
        if verbose {
            eprintln!("Parsing {:?}", path);
        }
        let doc = store
            .load(&path)
            .with_context(|| format!("parsing {:?}", path))?;
        parsed.push((path, doc));
    }

    if json {
        #[derive(serde::Serialize)]
        struct JsonOutput<'a> {
            path: String,
            outline: &'a Document,
        }

        let payload: Vec<JsonOutput<'_>> = parsed
            .iter()
            .map(|(path, doc)| JsonOutput {
                path: path.display().to_string(),
                outline: doc,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        for (idx, (path, doc)) in parsed.iter().enumerate() {
            if parsed.len() > 1 {
                println!("== {} ==", path.display());
            }
            println!("{:#?}", doc);
            if parsed.len() > 1 && idx + 1 < parsed.len() {
                println!();
            }
        }
    }
    Ok(())
}

fn handle_format(args: FormatArgs, verbose: bool) -> Result<()> {
    let FormatArgs { inputs, in_place } = args;
    let store = FsStore;
    let mut first = true;

    for path in &inputs {
        if verbose {
            eprintln!("Formatting {:?}", path);
        }
        let doc = store
            .load(path)
            .with_context(|| format!("parsing {:?}", path))?;
        let formatted = format_document(&doc);

        if in_place {
            fs::write(path, formatted.as_bytes())
                .with_context(|| format!("writing {:?}", path))?;
        } else {
            if !first {
                println!();
                println!("== {} ==", path.display());
            } else if inputs.len() > 1 {
                println!("== {} ==", path.display());
            }
            first = false;
            print!("{formatted}");
        }
    }

    Ok(())
}
