use clap::Args;
use std::path::PathBuf;

use crate::core::blast_hits::Capacity;
use crate::core::blast_options::{SearchOptions, StreamMode};
use crate::core::blast_program::ProgramType;

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    #[arg(short, long)]
    pub query: PathBuf,
    /// FASTA file of subject sequences
    #[arg(short, long)]
    pub subject: PathBuf,
    #[arg(short, long, value_enum, default_value_t = ProgramType::Blastp)]
    pub program: ProgramType,
    /// Seed word size (0 = program default)
    #[arg(short, long, default_value_t = 0)]
    pub word_size: usize,
    #[arg(short = 'n', long, default_value_t = 0)]
    pub num_threads: usize,
    #[arg(long, default_value_t = 10.0)]
    pub evalue: f64,
    #[arg(long, default_value_t = 500)]
    pub hitlist_size: usize,
    /// Maximum number of HSPs kept per subject (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    pub max_hsps_per_subject: usize,
    /// Maximum number of HSPs saved for one query/subject pair (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    pub hsp_num_max: usize,
    #[arg(long, default_value_t = 2)]
    pub reward: i32,
    #[arg(long, default_value_t = -3)]
    pub penalty: i32,
    /// Genetic code used for translated queries and subjects
    #[arg(long, default_value_t = 1)]
    pub gencode: u8,
    /// Subjects longer than this are searched in overlapping chunks
    #[arg(long, default_value_t = 5_000_000)]
    pub max_chunk: usize,
    #[arg(long, default_value_t = 100)]
    pub chunk_overlap: usize,
    /// Lists buffered between workers and the output writer (0 = collect
    /// everything and write sorted at the end)
    #[arg(long, default_value_t = 64)]
    pub stream_capacity: usize,
    #[arg(short, long)]
    pub out: Option<PathBuf>,
    /// Write a header line naming the columns
    #[arg(long, default_value_t = false)]
    pub header: bool,
    /// -v for progress and info messages, -vv for debug output
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl From<&SearchArgs> for SearchOptions {
    fn from(args: &SearchArgs) -> Self {
        let mut options = SearchOptions::for_program(args.program);
        if args.word_size > 0 {
            options.extension.word_size = args.word_size;
        }
        if args.program.is_nucleotide_search() {
            options.scoring.reward = args.reward;
            options.scoring.penalty = args.penalty;
        }
        options.hit_saving.evalue_cutoff = args.evalue;
        options.hit_saving.hitlist_size = args.hitlist_size;
        options.hit_saving.max_hsps_per_subject = (args.max_hsps_per_subject > 0).then_some(args.max_hsps_per_subject);
        if args.hsp_num_max > 0 {
            options.hit_saving.hsp_num_max = Capacity::AtMost(args.hsp_num_max);
        }
        options.genetic_code = args.gencode;
        options.chunk.max_chunk = args.max_chunk;
        options.chunk.overlap = args.chunk_overlap;
        options.num_threads = args.num_threads;
        options.stream = match args.stream_capacity {
            0 => StreamMode::Sorted,
            capacity => StreamMode::Fifo { capacity },
        };
        options
    }
}

#[derive(Args, Debug, Clone)]
pub struct RpsArgs {
    #[arg(short, long)]
    pub query: PathBuf,
    /// Base path of the profile database (`.loo`, `.rps` and `.aux` files)
    #[arg(short, long)]
    pub db: PathBuf,
    #[arg(short, long, value_enum, default_value_t = ProgramType::RpsBlast)]
    pub program: ProgramType,
    #[arg(short = 'n', long, default_value_t = 0)]
    pub num_threads: usize,
    #[arg(long, default_value_t = 10.0)]
    pub evalue: f64,
    #[arg(long, default_value_t = 500)]
    pub hitlist_size: usize,
    #[arg(long, default_value_t = 1)]
    pub gencode: u8,
    #[arg(short, long)]
    pub out: Option<PathBuf>,
    #[arg(long, default_value_t = false)]
    pub header: bool,
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl From<&RpsArgs> for SearchOptions {
    fn from(args: &RpsArgs) -> Self {
        let mut options = SearchOptions::for_program(args.program);
        options.hit_saving.evalue_cutoff = args.evalue;
        options.hit_saving.hitlist_size = args.hitlist_size;
        options.genetic_code = args.gencode;
        options.num_threads = args.num_threads;
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        search: SearchArgs,
    }

    #[test]
    fn test_defaults_follow_the_program() {
        let cli = Cli::parse_from(["hspsearch", "-q", "q.fa", "-s", "db.fa", "-p", "blastn"]);
        let options = SearchOptions::from(&cli.search);
        assert_eq!(options.program, ProgramType::Blastn);
        assert_eq!(options.extension.word_size, 11);
        assert_eq!((options.scoring.reward, options.scoring.penalty), (2, -3));
        assert_eq!(options.stream, StreamMode::Fifo { capacity: 64 });
        assert_eq!(options.hit_saving.max_hsps_per_subject, None);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::parse_from([
            "hspsearch", "-q", "q.fa", "-s", "db.fa", "-w", "2", "--evalue", "0.001",
            "--max-hsps-per-subject", "3", "--stream-capacity", "0", "-n", "4", "-vv",
        ]);
        let options = SearchOptions::from(&cli.search);
        assert_eq!(options.program, ProgramType::Blastp);
        assert_eq!(options.extension.word_size, 2);
        assert_eq!(options.hit_saving.evalue_cutoff, 0.001);
        assert_eq!(options.hit_saving.max_hsps_per_subject, Some(3));
        assert_eq!(options.stream, StreamMode::Sorted);
        assert_eq!(options.num_threads, 4);
        assert_eq!(cli.search.verbose, 2);
    }
}
