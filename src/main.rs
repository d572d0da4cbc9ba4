use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use hspsearch::api::{PrelimSearch, SearchOutcome};
use hspsearch::blastinput::{RpsArgs, SearchArgs};
use hspsearch::core::blast_options::SearchOptions;
use hspsearch::core::rps_files::RpsDatabase;
use hspsearch::core::seq_src::{read_fasta, InMemorySeqSrc, SeqSrc};
use hspsearch::report::{OutputConfig, TabularWriter};
use hspsearch::sequence::Alphabet;

#[derive(Parser)]
#[command(name = "hspsearch")]
#[command(version = "0.1.0")]
#[command(about = "Seed-and-extend preliminary sequence search", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search FASTA queries against a FASTA subject database
    Search(SearchArgs),

    /// Search queries against a profile database
    Rps(RpsArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let status = match cli.command {
        Commands::Search(args) => {
            init_logging(args.verbose);
            run_search(&args)?
        }
        Commands::Rps(args) => {
            init_logging(args.verbose);
            run_rps(&args)?
        }
    };
    if status != 0 {
        std::process::exit(status);
    }
    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn output(path: Option<&Path>) -> Result<Box<dyn Write + Send>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout())),
    })
}

fn alphabet(nucleotide: bool) -> Alphabet {
    if nucleotide {
        Alphabet::Nucleotide
    } else {
        Alphabet::Protein
    }
}

fn read_queries(path: &Path, nucleotide: bool) -> Result<(Vec<String>, Vec<Vec<u8>>)> {
    let records = read_fasta(path, alphabet(nucleotide))
        .with_context(|| format!("Failed to read queries from {}", path.display()))?;
    Ok(records.into_iter().unzip())
}

fn progress_bar(len: u64, verbose: u8) -> Result<ProgressBar> {
    if verbose == 0 {
        return Ok(ProgressBar::hidden());
    }
    let bar = ProgressBar::new(len);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")?,
    );
    Ok(bar)
}

/// Print the summary messages and hand back the exit status.
fn report(outcome: &SearchOutcome) -> i32 {
    for message in &outcome.summary.messages {
        eprintln!("hspsearch: {message}");
    }
    outcome.summary.status
}

fn run_search(args: &SearchArgs) -> Result<i32> {
    let options = SearchOptions::from(args);
    let program = options.program;
    let (query_ids, queries) = read_queries(&args.query, program.query_is_nucleotide())?;
    let src = InMemorySeqSrc::from_fasta(&args.subject, alphabet(program.subject_is_nucleotide()))
        .with_context(|| format!("Failed to read subjects from {}", args.subject.display()))?;
    let subject_ids = (0..src.num_sequences())
        .map(|oid| src.sequence_id(oid).unwrap_or_default().to_string())
        .collect();

    let bar = progress_bar(src.num_sequences() as u64, args.verbose)?;
    let ticker = bar.clone();
    let search = PrelimSearch::new(options, queries).with_progress(move |p| ticker.set_position(p.done));

    let config = if args.header {
        OutputConfig::with_header()
    } else {
        OutputConfig::default()
    };
    let mut table = TabularWriter::new(output(args.out.as_deref())?, config, query_ids, subject_ids);
    let outcome = search.run_with_formatter(&src, |list| {
        table.write_list(list)?;
        Ok(())
    });
    bar.finish_and_clear();
    table.flush().context("Failed to flush output")?;
    log::info!("{} HSP lines written", table.lines());
    Ok(report(&outcome))
}

fn run_rps(args: &RpsArgs) -> Result<i32> {
    let options = SearchOptions::from(args);
    let (query_ids, queries) = read_queries(&args.query, options.program.query_is_nucleotide())?;
    let db = RpsDatabase::open(&args.db)
        .with_context(|| format!("Failed to open profile database {}", args.db.display()))?;

    let bar = progress_bar(queries.len() as u64, args.verbose)?;
    let ticker = bar.clone();
    let search = PrelimSearch::new(options, queries).with_progress(move |p| ticker.set_position(p.done));
    let outcome = search.run_rps(&db);
    bar.finish_and_clear();

    let config = if args.header {
        OutputConfig::with_header()
    } else {
        OutputConfig::default()
    };
    let mut table = TabularWriter::new(output(args.out.as_deref())?, config, query_ids, Vec::new());
    table.write_results(&outcome.results)?;
    table.flush().context("Failed to flush output")?;
    Ok(report(&outcome))
}
