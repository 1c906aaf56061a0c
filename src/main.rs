//! fretsheet - fretboard diagram document tool.
//!
//! Thin command-line front end over the workspace engine, for working with
//! document files outside the editor:
//!
//! ```bash
//! fretsheet new chart.json       # write a fresh default document
//! fretsheet info chart.json      # print a summary of a document
//! fretsheet validate chart.json  # strict validation, exit 1 on failure
//! ```

use anyhow::{bail, Context, Result};
use fretsheet::{document, Session};
use std::path::PathBuf;

/// Parsed command-line invocation.
enum Command {
    New { path: PathBuf },
    Info { path: PathBuf },
    Validate { path: PathBuf },
}

impl Command {
    /// Parses command-line arguments.
    ///
    /// Kept by hand rather than pulling in an argument-parsing crate; the
    /// surface is three subcommands with one path each.
    fn parse() -> Result<Self> {
        let mut args = std::env::args().skip(1);
        let command = args.next().unwrap_or_default();
        if command.is_empty() || command == "--help" || command == "-h" {
            print_usage();
            std::process::exit(0);
        }

        let path = match args.next() {
            Some(p) => PathBuf::from(p),
            None => bail!("missing <path> argument for `{}`", command),
        };

        match command.as_str() {
            "new" => Ok(Command::New { path }),
            "info" => Ok(Command::Info { path }),
            "validate" => Ok(Command::Validate { path }),
            other => bail!("unknown command: {} (try --help)", other),
        }
    }
}

fn print_usage() {
    println!("fretsheet - fretboard diagram document tool");
    println!();
    println!("Usage:");
    println!("  fretsheet new <path>       Write a fresh default document");
    println!("  fretsheet info <path>      Print a summary of a document");
    println!("  fretsheet validate <path>  Validate a document (exit 1 on failure)");
}

fn main() -> Result<()> {
    let command = Command::parse()?;

    // Initialize logging (optional, for debugging)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match command {
        Command::New { path } => {
            let mut session = Session::new();
            session
                .create_grid(None)
                .context("Failed to create default grid")?;
            session
                .save_to_file(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote new document to {}", path.display());
        }
        Command::Info { path } => {
            let outcome = document::load_from_file(&path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            for warning in &outcome.warnings {
                eprintln!("warning: {}", warning);
            }
            let ws = outcome.workspace;
            println!(
                "canvas: {:?}, {}x{}{}",
                ws.canvas().orientation,
                ws.canvas().dimensions.width,
                ws.canvas().dimensions.height,
                if ws.canvas().locked { ", locked" } else { "" }
            );
            println!("grids: {}", ws.grids().len());
            for grid in ws.grids() {
                println!(
                    "  {}: frets {}-{}, {} strings, {} notes",
                    grid.id,
                    grid.config.start_fret,
                    grid.config.end_fret,
                    grid.config.string_count,
                    grid.note_count()
                );
            }
            match ws.root_note() {
                Some(root) => println!("root note: {}", root.note_id),
                None => println!("root note: none"),
            }
            println!("highlighted intervals: {}", ws.intervals().len());
        }
        Command::Validate { path } => match document::load_from_file(&path) {
            Ok(outcome) => {
                for warning in &outcome.warnings {
                    eprintln!("warning: {}", warning);
                }
                println!("{}: valid", path.display());
            }
            Err(e) => {
                eprintln!("{}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
