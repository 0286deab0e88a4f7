use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "clipmerge-rs",
    about = "Clip adapters from paired-end reads and merge overlapping mates",
    version
)]
pub struct Args {
    /// Forward reads, FASTQ (optionally gzipped); several files are read in order
    #[arg(long = "in1", value_name = "FASTQ", num_args = 1.., required = true)]
    pub forward: Vec<PathBuf>,

    /// Reverse reads, FASTQ (optionally gzipped); must pair up with --in1 record by record
    #[arg(long = "in2", value_name = "FASTQ", num_args = 1..)]
    pub reverse: Vec<PathBuf>,

    /// Output FASTQ; gzipped if the name ends in .gz; stdout if omitted
    #[arg(short = 'o', long = "out", value_name = "FASTQ")]
    pub output: Option<PathBuf>,

    /// Write unmerged forward and reverse reads to these two files instead
    #[arg(short = 'u', long = "unmerged", value_names = ["FORWARD", "REVERSE"], num_args = 2)]
    pub unmerged: Option<Vec<PathBuf>>,

    /// Write the statistics report to this file instead of stderr
    #[arg(long = "log", value_name = "FILE")]
    pub log: Option<PathBuf>,

    /// Forward read adapter sequence
    #[arg(short = 'f', long = "forward-adapter", default_value = crate::config::DEFAULT_FORWARD_ADAPTER)]
    pub forward_adapter: String,

    /// Reverse read adapter sequence
    #[arg(short = 'r', long = "reverse-adapter", default_value = crate::config::DEFAULT_REVERSE_ADAPTER)]
    pub reverse_adapter: String,

    /// Discard reads shorter than this after clipping and merging
    #[arg(short = 'l', long = "min-length", default_value_t = 25)]
    pub min_length: usize,

    /// Discard reads containing unknown (N) bases
    #[arg(short = 'n', long = "discard-n")]
    pub discard_n: bool,

    /// Minimum adapter alignment length; shorter hits are not clipped
    #[arg(short = 'm', long = "min-adapter-length", default_value_t = 8)]
    pub min_adapter_length: usize,

    /// Minimum number of overlapping bases required to merge a pair
    #[arg(short = 'p', long = "min-overlap", default_value_t = 10)]
    pub min_overlap: usize,

    /// Fraction of mismatches allowed in the overlap
    #[arg(short = 'e', long = "error-rate", default_value_t = 0.05)]
    pub error_rate: f64,

    /// Ignore base qualities when counting overlap mismatches
    #[arg(long = "no-qbmm")]
    pub no_quality_mismatches: bool,

    /// Skip adapter clipping; only merge
    #[arg(long = "no-clipping")]
    pub no_clipping: bool,

    /// Skip merging; only clip
    #[arg(long = "no-merging")]
    pub no_merging: bool,

    /// Drop reads whose mate did not survive clipping
    #[arg(long = "rm-no-partner")]
    pub remove_single_reads: bool,

    /// Disable 3' quality trimming of reads that are not merged
    #[arg(long = "no-quality-trimming")]
    pub no_quality_trimming: bool,

    /// Minimum base quality for 3' quality trimming
    #[arg(short = 'q', long = "min-base-quality", default_value_t = 20)]
    pub min_base_quality: i32,

    /// Phred score offset of the quality strings
    #[arg(long = "qo", default_value_t = 33)]
    pub phred_offset: u8,

    /// Discard merged reads with too many low-quality bases
    #[arg(long = "discard-bad-reads")]
    pub discard_bad_reads: bool,

    /// Fraction of bases in a merged read that must reach --min-qual-bad-reads
    #[arg(long = "qual-freq-bad-reads", default_value_t = 0.9)]
    pub good_quality_fraction: f64,

    /// Base quality threshold for --discard-bad-reads; 0 keeps every read
    #[arg(long = "min-qual-bad-reads", default_value_t = 0)]
    pub bad_read_quality: i32,

    /// Trim this many bases from the 5' end after clipping
    #[arg(long = "trim5p", default_value_t = 0)]
    pub trim_5p: usize,

    /// Trim this many bases from the 3' end after clipping
    #[arg(long = "trim3p", default_value_t = 0)]
    pub trim_3p: usize,

    /// Keep bases up to this 1-based position; overrides --trim3p
    #[arg(long = "last-base")]
    pub last_base: Option<usize>,

    /// Keep this many extra bases past the adapter start when clipping
    #[arg(long = "keep-delta", default_value_t = 0)]
    pub keep_delta: usize,

    /// Discard reads in which an adapter was found
    #[arg(long = "discard-clipped")]
    pub discard_clipped: bool,

    /// Discard reads in which no adapter was found
    #[arg(long = "discard-non-clipped")]
    pub discard_non_clipped: bool,

    /// Keep reads that consist of adapter only
    #[arg(long = "show-adapter-only")]
    pub show_adapter_only: bool,

    /// Do not print the per-direction clipping statistics
    #[arg(long = "no-clip-stats")]
    pub no_clip_stats: bool,

    /// Reject sequences containing U bases
    #[arg(long = "no-u")]
    pub no_u: bool,

    /// Reject sequences containing lowercase bases
    #[arg(long = "no-lowercase")]
    pub no_lowercase: bool,

    /// Capacity of each queue between the clip workers and the merge worker
    #[arg(long = "max-parallel-reads", default_value_t = 1000)]
    pub queue_capacity: usize,

    /// Set logging level to WARN
    #[arg(long)]
    pub quiet: bool,

    /// Set logging level to DEBUG
    #[arg(short = 'v', long)]
    pub verbose: bool,
}
