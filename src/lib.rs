//! clipmerge-rs: clip sequencing adapters from paired-end reads and merge
//! overlapping mates into single reads.
//!
//! # Library usage
//!
//! ```no_run
//! use clipmerge_rs::{ClipOutcome, ClipSettings, Clipper, Record};
//!
//! let mut clipper = Clipper::new(ClipSettings::for_adapter(b"AGATCGGAAGAGCACACGTCTGAACTCCAGTCAC"));
//! let read = Record::new("read1", b"ATTTAAGATCGGAA", b"IIIIIIIIIIIIII");
//! if let ClipOutcome::Kept(clipped) = clipper.clip(read) {
//!     assert_eq!(clipped.sequence, b"ATTTA");
//! }
//! ```

pub mod align;
pub mod cli;
pub mod clip;
pub mod config;
pub mod fastq;
pub mod merge;
pub mod pipeline;
pub mod record;
pub mod stats;
pub mod trim;

pub use align::{AlignmentEngine, AlignmentSummary, BoundaryPolicy, ScoringScheme};
pub use clip::{ClipOutcome, ClipSettings, Clipper, RejectReason, cutoff};
pub use config::Config;
pub use merge::{MergeOutcome, OverlapSettings, merge};
pub use pipeline::run;
pub use record::{QueueItem, Record, reverse_complement};
pub use stats::{PairOutcome, Statistics, StatsSnapshot};
