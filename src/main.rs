//! ftrace-import: Import and inspect ftrace/atrace text traces
//!
//! `import` parses a trace file and prints a summary of the resulting model
//! (human-readable or JSON); `detect` checks whether a file looks like an
//! ftrace text trace at all.

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use ftrace_import::{is_ftrace_text, FtraceImporter, ImportSummary, StderrFeedback};

#[derive(Parser)]
#[command(name = "ftrace-import")]
#[command(about = "Import and inspect ftrace/atrace text traces")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a trace file and print a model summary
    Import {
        /// Path to the ftrace text trace
        trace: PathBuf,

        /// Output format: summary, json
        #[arg(short, long, default_value = "summary")]
        format: String,
    },
    /// Check whether a file looks like an ftrace text trace
    Detect {
        /// Path to the candidate file
        trace: PathBuf,
    },
}

fn run_import(trace: PathBuf, format: String) -> Result<()> {
    if !trace.exists() {
        bail!("Trace file not found: {}", trace.display());
    }
    let file = File::open(&trace)
        .with_context(|| format!("Failed to open {}", trace.display()))?;

    let mut feedback = StderrFeedback;
    let fragment = FtraceImporter::new()
        .import(file, &mut feedback)
        .with_context(|| format!("Failed to import {}", trace.display()))?;
    let summary = ImportSummary::from_fragment(&fragment);

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&summary)?),
        "summary" => print_summary(&summary),
        other => bail!("Unknown format: {other} (expected summary or json)"),
    }
    Ok(())
}

fn print_summary(summary: &ImportSummary) {
    match (summary.global_start_time, summary.global_end_time) {
        (Some(start), Some(end)) => {
            println!("Trace window: {start:.6}s .. {end:.6}s ({:.6}s)", end - start);
        }
        _ => println!("Trace window: no events"),
    }
    if let Some(parent_ts) = summary.parent_timestamp {
        println!("Clock sync:   parent_ts={parent_ts}");
    }
    if let Some(realtime_ts) = summary.realtime_timestamp {
        println!("Clock sync:   realtime_ts={realtime_ts}");
    }
    println!(
        "Model:        {} processes, {} threads, {} slices",
        summary.process_count, summary.thread_count, summary.slice_count
    );
    println!();
    for process in &summary.processes {
        let id = process
            .id
            .map_or_else(|| "?".to_string(), |id| id.to_string());
        let name = process.name.as_deref().unwrap_or("<unnamed>");
        print!(
            "  {id:>7}  {name:<24} {} threads, {} slices",
            process.thread_count, process.slice_count
        );
        if !process.counters.is_empty() {
            print!(", counters: {}", process.counters.join(", "));
        }
        println!();
    }
}

fn run_detect(trace: &PathBuf) -> Result<bool> {
    let mut file = File::open(trace)
        .with_context(|| format!("Failed to open {}", trace.display()))?;
    // The sniffer only looks at the first 1000 bytes.
    let mut window = vec![0u8; 1024];
    let mut filled = 0;
    while filled < window.len() {
        let n = file.read(&mut window[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    window.truncate(filled);
    Ok(is_ftrace_text(&window))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Import { trace, format } => run_import(trace, format),
        Commands::Detect { trace } => {
            if run_detect(&trace)? {
                println!("{}: ftrace text trace", trace.display());
                Ok(())
            } else {
                eprintln!("{}: not an ftrace text trace", trace.display());
                std::process::exit(1);
            }
        }
    }
}
