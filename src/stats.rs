//! Run statistics shared by the clip workers and the merge worker.
//!
//! Workers hold a `&Statistics` and bump atomic counters; `snapshot` takes a
//! plain copy once every worker has been joined.

use crate::clip::RejectReason;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct ClipCounters {
    input: AtomicU64,
    too_short: AtomicU64,
    adapter_only: AtomicU64,
    no_adapter_found: AtomicU64,
    adapter_found: AtomicU64,
    contains_unknown: AtomicU64,
}

impl ClipCounters {
    pub fn record_input(&self) {
        self.input.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejection(&self, reason: RejectReason) {
        let counter = match reason {
            RejectReason::TooShort => &self.too_short,
            RejectReason::AdapterOnly => &self.adapter_only,
            RejectReason::NoAdapterFound => &self.no_adapter_found,
            RejectReason::AdapterFound => &self.adapter_found,
            RejectReason::ContainsUnknown => &self.contains_unknown,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> ClipStats {
        ClipStats {
            input: self.input.load(Ordering::Relaxed),
            too_short: self.too_short.load(Ordering::Relaxed),
            adapter_only: self.adapter_only.load(Ordering::Relaxed),
            no_adapter_found: self.no_adapter_found.load(Ordering::Relaxed),
            adapter_found: self.adapter_found.load(Ordering::Relaxed),
            contains_unknown: self.contains_unknown.load(Ordering::Relaxed),
        }
    }
}

/// What became of one read pair (or one forward read in single-end mode).
/// Exactly one outcome is recorded per pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PairOutcome {
    FailedClipping,
    SingleForward,
    SingleForwardTooShort,
    SingleReverse,
    SingleReverseTooShort,
    Merged,
    MergedTooShort,
    MergedBadQuality,
    UnmergedPair,
    UnmergedForwardOnly,
    UnmergedReverseOnly,
    MateTooShort,
}

#[derive(Debug, Default)]
pub struct Statistics {
    pub forward_clip: ClipCounters,
    pub reverse_clip: ClipCounters,

    failed_clipping: AtomicU64,
    single_forward: AtomicU64,
    single_forward_too_short: AtomicU64,
    single_reverse: AtomicU64,
    single_reverse_too_short: AtomicU64,
    merged: AtomicU64,
    merged_too_short: AtomicU64,
    merged_bad_quality: AtomicU64,
    unmerged_pairs: AtomicU64,
    unmerged_forward_only: AtomicU64,
    unmerged_reverse_only: AtomicU64,
    mate_too_short: AtomicU64,

    unmerged_forward_too_short: AtomicU64,
    unmerged_reverse_too_short: AtomicU64,
    no_overlap: AtomicU64,
    overlap_sum: AtomicU64,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_outcome(&self, outcome: PairOutcome) {
        let counter = match outcome {
            PairOutcome::FailedClipping => &self.failed_clipping,
            PairOutcome::SingleForward => &self.single_forward,
            PairOutcome::SingleForwardTooShort => &self.single_forward_too_short,
            PairOutcome::SingleReverse => &self.single_reverse,
            PairOutcome::SingleReverseTooShort => &self.single_reverse_too_short,
            PairOutcome::Merged => &self.merged,
            PairOutcome::MergedTooShort => &self.merged_too_short,
            PairOutcome::MergedBadQuality => &self.merged_bad_quality,
            PairOutcome::UnmergedPair => &self.unmerged_pairs,
            PairOutcome::UnmergedForwardOnly => &self.unmerged_forward_only,
            PairOutcome::UnmergedReverseOnly => &self.unmerged_reverse_only,
            PairOutcome::MateTooShort => &self.mate_too_short,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_merged(&self, overlap: usize) {
        self.record_outcome(PairOutcome::Merged);
        self.overlap_sum.fetch_add(overlap as u64, Ordering::Relaxed);
    }

    pub fn record_no_overlap(&self) {
        self.no_overlap.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unmerged_too_short(&self, forward: bool) {
        let counter = if forward {
            &self.unmerged_forward_too_short
        } else {
            &self.unmerged_reverse_too_short
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            forward_clip: self.forward_clip.snapshot(),
            reverse_clip: self.reverse_clip.snapshot(),
            failed_clipping: load(&self.failed_clipping),
            single_forward: load(&self.single_forward),
            single_forward_too_short: load(&self.single_forward_too_short),
            single_reverse: load(&self.single_reverse),
            single_reverse_too_short: load(&self.single_reverse_too_short),
            merged: load(&self.merged),
            merged_too_short: load(&self.merged_too_short),
            merged_bad_quality: load(&self.merged_bad_quality),
            unmerged_pairs: load(&self.unmerged_pairs),
            unmerged_forward_only: load(&self.unmerged_forward_only),
            unmerged_reverse_only: load(&self.unmerged_reverse_only),
            mate_too_short: load(&self.mate_too_short),
            unmerged_forward_too_short: load(&self.unmerged_forward_too_short),
            unmerged_reverse_too_short: load(&self.unmerged_reverse_too_short),
            no_overlap: load(&self.no_overlap),
            overlap_sum: load(&self.overlap_sum),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClipStats {
    pub input: u64,
    pub too_short: u64,
    pub adapter_only: u64,
    pub no_adapter_found: u64,
    pub adapter_found: u64,
    pub contains_unknown: u64,
}

impl ClipStats {
    pub fn rejected(&self) -> u64 {
        self.too_short
            + self.adapter_only
            + self.no_adapter_found
            + self.adapter_found
            + self.contains_unknown
    }

    pub fn output(&self) -> u64 {
        self.input.saturating_sub(self.rejected())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub forward_clip: ClipStats,
    pub reverse_clip: ClipStats,
    pub failed_clipping: u64,
    pub single_forward: u64,
    pub single_forward_too_short: u64,
    pub single_reverse: u64,
    pub single_reverse_too_short: u64,
    pub merged: u64,
    pub merged_too_short: u64,
    pub merged_bad_quality: u64,
    pub unmerged_pairs: u64,
    pub unmerged_forward_only: u64,
    pub unmerged_reverse_only: u64,
    pub mate_too_short: u64,
    pub unmerged_forward_too_short: u64,
    pub unmerged_reverse_too_short: u64,
    pub no_overlap: u64,
    pub overlap_sum: u64,
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 10_000.0).round() / 100.0
}

impl StatsSnapshot {
    pub fn report(&self, clip_sections: bool) -> Report<'_> {
        Report {
            stats: self,
            clip_sections,
        }
    }

    /// Number of pairs (or single-end reads) that reached the merge worker.
    pub fn pairs(&self) -> u64 {
        self.failed_clipping
            + self.single_forward
            + self.single_forward_too_short
            + self.single_reverse
            + self.single_reverse_too_short
            + self.merged
            + self.merged_too_short
            + self.merged_bad_quality
            + self.unmerged_pairs
            + self.unmerged_forward_only
            + self.unmerged_reverse_only
            + self.mate_too_short
    }

    pub fn unmerged_forward_reads(&self) -> u64 {
        self.single_forward + self.unmerged_pairs + self.unmerged_forward_only
    }

    pub fn unmerged_reverse_reads(&self) -> u64 {
        self.single_reverse + self.unmerged_pairs + self.unmerged_reverse_only
    }

    pub fn usable_reads(&self) -> u64 {
        self.merged + self.unmerged_forward_reads() + self.unmerged_reverse_reads()
    }

    pub fn unmerged_pairs_total(&self) -> u64 {
        self.pairs() - self.merged
    }

    pub fn average_overlap(&self) -> f64 {
        if self.merged == 0 {
            return 0.0;
        }
        (self.overlap_sum as f64 / self.merged as f64 * 1000.0).round() / 1000.0
    }

    pub fn single_reads_removed(&self) -> u64 {
        self.unmerged_forward_too_short
            + self.unmerged_reverse_too_short
            + self.single_forward_too_short
            + self.single_reverse_too_short
            + self.merged_too_short
    }
}

fn write_clip_section(f: &mut fmt::Formatter<'_>, direction: &str, stats: &ClipStats) -> fmt::Result {
    writeln!(f, "[Clipping {direction}]")?;
    writeln!(f, "- Input reads: {}", stats.input)?;
    writeln!(f, "- Output reads: {}", stats.output())?;
    writeln!(f, "- Discarded too short: {}", stats.too_short)?;
    writeln!(f, "- Discarded adapter only: {}", stats.adapter_only)?;
    writeln!(f, "- Discarded non-clipped: {}", stats.no_adapter_found)?;
    writeln!(f, "- Discarded clipped: {}", stats.adapter_found)?;
    writeln!(f, "- Discarded containing N: {}", stats.contains_unknown)?;
    writeln!(f)
}

/// The end-of-run report, optionally without the per-direction clipping sections.
pub struct Report<'a> {
    stats: &'a StatsSnapshot,
    clip_sections: bool,
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats;
        if self.clip_sections && stats.forward_clip.input > 0 {
            write_clip_section(f, "forward", &stats.forward_clip)?;
        }
        if self.clip_sections && stats.reverse_clip.input > 0 {
            write_clip_section(f, "reverse", &stats.reverse_clip)?;
        }

        writeln!(f, "[Clipping both]")?;
        writeln!(f, "- Number of reads failed clipping: {}", stats.failed_clipping)?;
        writeln!(f)?;

        let pairs = stats.pairs();
        let ends = stats.usable_reads();
        writeln!(f, "[Merging]")?;
        writeln!(f, "- Number of usable reads in the output file(s): {ends}")?;
        writeln!(f, "- Number of usable forward reads with no pairing reverse read: {}", stats.single_forward)?;
        writeln!(f, "- Number of usable reverse reads with no pairing forward read: {}", stats.single_reverse)?;
        writeln!(f, "- Number of usable forward reads with too short reverse read: {}", stats.unmerged_forward_only)?;
        writeln!(f, "- Number of usable reverse reads with too short forward read: {}", stats.unmerged_reverse_only)?;
        writeln!(f, "- Number of usable not merged forward reads: {}", stats.unmerged_forward_reads())?;
        writeln!(f, "- Number of usable not merged reverse reads: {}", stats.unmerged_reverse_reads())?;
        writeln!(f, "- Number of merged reads discarded due to bad quality: {}", stats.merged_bad_quality)?;
        writeln!(f, "- Number of usable merged reads: {}", stats.merged)?;
        writeln!(
            f,
            "- Percentage of total input pairs resulting in usable merged reads: {} %",
            percent(stats.merged, pairs)
        )?;
        writeln!(f, "- Percentage of usable merged reads: {} %", percent(stats.merged, ends))?;
        writeln!(f, "- Average overlap region size: {}", stats.average_overlap())?;
        writeln!(f, "- Number of read pairs not merged (no overlap): {}", stats.no_overlap)?;
        writeln!(f)?;

        writeln!(f, "- Number of single reads removed: {}", stats.single_reads_removed())?;
        writeln!(f, "     ... not merged and too short forward read: {}", stats.unmerged_forward_too_short)?;
        writeln!(f, "     ... not merged and too short reverse read: {}", stats.unmerged_reverse_too_short)?;
        writeln!(f, "     ... too short forward read with no pairing reverse read: {}", stats.single_forward_too_short)?;
        writeln!(f, "     ... too short reverse read with no pairing forward read: {}", stats.single_reverse_too_short)?;
        writeln!(f, "     ... too short merged read: {}", stats.merged_too_short)?;
        writeln!(f)?;

        let unmerged = stats.unmerged_pairs_total();
        let mate_adapter_only = stats.single_forward + stats.single_reverse;
        let mate_too_short = stats.unmerged_forward_only + stats.unmerged_reverse_only + stats.mate_too_short;
        let no_partner_too_short = stats.single_forward_too_short + stats.single_reverse_too_short;
        writeln!(f, "[Unmerged breakdown]")?;
        writeln!(f, "- Number of pairs unmerged: {unmerged}")?;
        writeln!(f, "- Percentage of unmerged pairs failed clipping: {} %", percent(stats.failed_clipping, unmerged))?;
        writeln!(f, "- Percentage of unmerged pairs failed quality: {} %", percent(stats.merged_bad_quality, unmerged))?;
        writeln!(f, "- Percentage of unmerged pairs mate adapter only: {} %", percent(mate_adapter_only, unmerged))?;
        writeln!(f, "- Percentage of unmerged pairs mate too short: {} %", percent(mate_too_short, unmerged))?;
        writeln!(f, "- Percentage of unmerged pairs no overlap: {} %", percent(stats.unmerged_pairs, unmerged))?;
        writeln!(f, "- Percentage of unmerged pairs merged too short: {} %", percent(stats.merged_too_short, unmerged))?;
        writeln!(
            f,
            "- Percentage of unmerged pairs no partner too short: {} %",
            percent(no_partner_too_short, unmerged)
        )
    }
}
