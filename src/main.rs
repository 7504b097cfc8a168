use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;

use tinylang::{Limits, RunOutcome};

#[derive(Debug, Parser)]
#[command(name = "tinylang", version, about = "Run a tinylang program")]
struct Args {
    /// Source file to run.
    file: PathBuf,

    /// Print the outcome as a JSON object instead of raw output.
    #[arg(long)]
    json: bool,

    /// Report how long execution took.
    #[arg(long)]
    time: bool,

    #[arg(long, default_value_t = Limits::default().max_call_depth)]
    max_call_depth: usize,

    #[arg(long)]
    max_output_bytes: Option<usize>,

    /// Worker thread stack, in MiB.
    #[arg(
        long,
        default_value_t = (Limits::default().stack_size / MIB) as u64,
        value_parser = clap::value_parser!(u64).range(1..=4096)
    )]
    stack_size_mb: u64,
}

const MIB: usize = 1024 * 1024;

impl Args {
    fn limits(&self) -> Result<Limits> {
        let stack_size = usize::try_from(self.stack_size_mb)
            .ok()
            .and_then(|mb| mb.checked_mul(MIB))
            .with_context(|| format!("Stack size of {} MiB is too large", self.stack_size_mb))?;
        Ok(Limits {
            max_call_depth: self.max_call_depth,
            max_output_bytes: self.max_output_bytes,
            stack_size,
            ..Limits::default()
        })
    }
}

fn main() -> Result<ExitCode> {
    env_logger::init();
    let args = Args::parse();

    if !args.file.is_file() {
        eprintln!("Error: File not found at '{}'", args.file.display());
        return Ok(ExitCode::from(2));
    }
    let source = fs::read_to_string(&args.file)
        .with_context(|| format!("Reading {}", args.file.display()))?;

    let limits = args.limits()?;

    let started = Instant::now();
    let outcome = tinylang::run_with_limits(&source, &limits);
    let elapsed = started.elapsed();

    if args.json {
        let rendered = serde_json::to_string(&outcome).context("Serializing run outcome")?;
        println!("{rendered}");
    } else {
        report(&outcome)?;
        if args.time && outcome.is_success() {
            eprintln!("Execution finished in {:.6} seconds", elapsed.as_secs_f64());
        }
    }

    Ok(if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn report(outcome: &RunOutcome) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout
        .write_all(outcome.stdout.as_bytes())
        .context("Writing program output")?;
    stdout.flush().context("Flushing program output")?;
    if !outcome.stderr.is_empty() {
        eprintln!("{}", outcome.stderr);
    }
    Ok(())
}
