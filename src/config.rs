use crate::cli::Args;
use crate::clip::ClipSettings;
use crate::merge::OverlapSettings;
use crate::record::Alphabet;
use crate::trim::{EndTrimmer, QualityTrimmer};
use anyhow::{Result, bail};
use std::path::PathBuf;

pub const DEFAULT_FORWARD_ADAPTER: &str = "AGATCGGAAGAGCACACGTCTGAACTCCAGTCAC";
pub const DEFAULT_REVERSE_ADAPTER: &str = "AGATCGGAAGAGCGTCGTGTAGGGAAAGAGTGTA";

/// Separate files for unmerged forward and reverse reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatePairOutput {
    pub forward: PathBuf,
    pub reverse: PathBuf,
}

/// Immutable run configuration, shared by reference with every worker.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub forward_inputs: Vec<PathBuf>,
    pub reverse_inputs: Vec<PathBuf>,
    pub output: Option<PathBuf>,
    pub mate_pair_output: Option<MatePairOutput>,
    pub log: Option<PathBuf>,

    pub forward_adapter: Vec<u8>,
    pub reverse_adapter: Vec<u8>,
    pub min_merge_overlap: usize,
    pub min_sequence_length: usize,
    pub keep_sequences_with_n: bool,
    pub min_adapter_alignment_length: usize,
    pub error_rate_for_merging: f64,
    pub quality_aware_mismatches: bool,

    pub quality_trimming: bool,
    pub min_base_quality: i32,
    pub quality_offset: u8,

    /// Phred threshold of the post-merge quality gate; 0 disables the gate.
    pub discard_bad_quality_score: i32,
    pub min_good_quality_fraction: f64,

    pub trim_5p: usize,
    pub trim_3p: usize,
    pub last_base_to_keep: Option<usize>,

    pub queue_capacity: usize,
    pub remove_single_reads: bool,
    pub no_clipping: bool,
    pub no_merging: bool,
    pub keep_delta: usize,
    pub discard_clipped: bool,
    pub discard_non_clipped: bool,
    pub show_adapter_only: bool,
    pub show_clipping_stats: bool,
    pub allow_u: bool,
    pub allow_lowercase: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            forward_inputs: Vec::new(),
            reverse_inputs: Vec::new(),
            output: None,
            mate_pair_output: None,
            log: None,
            forward_adapter: DEFAULT_FORWARD_ADAPTER.as_bytes().to_vec(),
            reverse_adapter: DEFAULT_REVERSE_ADAPTER.as_bytes().to_vec(),
            min_merge_overlap: 10,
            min_sequence_length: 25,
            keep_sequences_with_n: true,
            min_adapter_alignment_length: 8,
            error_rate_for_merging: 0.05,
            quality_aware_mismatches: true,
            quality_trimming: true,
            min_base_quality: 20,
            quality_offset: 33,
            discard_bad_quality_score: 0,
            min_good_quality_fraction: 0.9,
            trim_5p: 0,
            trim_3p: 0,
            last_base_to_keep: None,
            queue_capacity: 1000,
            remove_single_reads: false,
            no_clipping: false,
            no_merging: false,
            keep_delta: 0,
            discard_clipped: false,
            discard_non_clipped: false,
            show_adapter_only: false,
            show_clipping_stats: true,
            allow_u: true,
            allow_lowercase: true,
        }
    }
}

impl Config {
    pub fn from_args(args: &Args) -> Result<Self> {
        let mate_pair_output = match args.unmerged.as_deref() {
            Some([forward, reverse]) => Some(MatePairOutput {
                forward: forward.clone(),
                reverse: reverse.clone(),
            }),
            Some(other) => bail!("--unmerged expects two files, got {}", other.len()),
            None => None,
        };

        let config = Self {
            forward_inputs: args.forward.clone(),
            reverse_inputs: args.reverse.clone(),
            output: args.output.clone(),
            mate_pair_output,
            log: args.log.clone(),
            forward_adapter: args.forward_adapter.as_bytes().to_vec(),
            reverse_adapter: args.reverse_adapter.as_bytes().to_vec(),
            min_merge_overlap: args.min_overlap,
            min_sequence_length: args.min_length,
            keep_sequences_with_n: !args.discard_n,
            min_adapter_alignment_length: args.min_adapter_length,
            error_rate_for_merging: args.error_rate,
            quality_aware_mismatches: !args.no_quality_mismatches,
            quality_trimming: !args.no_quality_trimming,
            min_base_quality: args.min_base_quality,
            quality_offset: args.phred_offset,
            discard_bad_quality_score: if args.discard_bad_reads { args.bad_read_quality } else { 0 },
            min_good_quality_fraction: args.good_quality_fraction,
            trim_5p: args.trim_5p,
            trim_3p: args.trim_3p,
            last_base_to_keep: args.last_base,
            queue_capacity: args.queue_capacity,
            remove_single_reads: args.remove_single_reads,
            no_clipping: args.no_clipping,
            no_merging: args.no_merging,
            keep_delta: args.keep_delta,
            discard_clipped: args.discard_clipped,
            discard_non_clipped: args.discard_non_clipped,
            show_adapter_only: args.show_adapter_only,
            show_clipping_stats: !args.no_clip_stats,
            allow_u: !args.no_u,
            allow_lowercase: !args.no_lowercase,
        };
        config.check()?;
        Ok(config)
    }

    /// Reject parameter combinations the pipeline cannot run with.
    pub fn check(&self) -> Result<()> {
        if self.forward_inputs.is_empty() {
            bail!("at least one forward input file is required");
        }
        if self.forward_adapter.is_empty() || self.reverse_adapter.is_empty() {
            bail!("adapter sequences must not be empty");
        }
        if !(0.0..=1.0).contains(&self.error_rate_for_merging) {
            bail!("merge error rate must be within [0, 1], got {}", self.error_rate_for_merging);
        }
        if !(0.0..=1.0).contains(&self.min_good_quality_fraction) {
            bail!(
                "good quality fraction must be within [0, 1], got {}",
                self.min_good_quality_fraction
            );
        }
        if self.queue_capacity == 0 {
            bail!("queue capacity must be at least 1");
        }
        Ok(())
    }

    pub fn is_paired(&self) -> bool {
        !self.reverse_inputs.is_empty()
    }

    pub fn discard_bad_quality_reads(&self) -> bool {
        self.discard_bad_quality_score > 0
    }

    pub fn alphabet(&self) -> Alphabet {
        Alphabet {
            allow_n: true,
            allow_u: self.allow_u,
            allow_lowercase: self.allow_lowercase,
        }
    }

    pub fn end_trimmer(&self) -> EndTrimmer {
        EndTrimmer {
            trim_5p: self.trim_5p,
            trim_3p: self.trim_3p,
            last_base: self.last_base_to_keep,
        }
    }

    pub fn quality_trimmer(&self) -> Option<QualityTrimmer> {
        self.quality_trimming.then_some(QualityTrimmer {
            min_quality: self.min_base_quality,
            offset: self.quality_offset,
        })
    }

    /// Clip settings for one direction. The clip-stage length floor is the
    /// minimum merge overlap, not the final minimum sequence length.
    pub fn clip_settings(&self, adapter: &[u8]) -> ClipSettings {
        ClipSettings {
            adapter: adapter.to_vec(),
            min_length: self.min_merge_overlap,
            minimum_adapter_length: self.min_adapter_alignment_length,
            keep_delta: self.keep_delta,
            discard_unknown: !self.keep_sequences_with_n,
            discard_clipped: self.discard_clipped,
            discard_non_clipped: self.discard_non_clipped,
            show_adapter_only: self.show_adapter_only,
            end_trimmer: self.end_trimmer(),
        }
    }

    pub fn overlap_settings(&self) -> OverlapSettings {
        OverlapSettings {
            min_overlap: self.min_merge_overlap,
            error_rate: self.error_rate_for_merging,
            quality_offset: self.quality_offset,
            quality_aware: self.quality_aware_mismatches,
        }
    }
}
