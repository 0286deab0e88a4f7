//! Overlap detection and consensus building for forward/reverse mates.
//!
//! The reverse mate is reverse-complemented first, so both reads run along the
//! same strand. The overlap is a pure positional comparison; indels inside the
//! overlap are not modelled.

use crate::record::{Record, is_unknown, phred, reverse_complement};

/// Bases whose Phred score is below this count as unknown in quality-aware mode.
const LOW_QUALITY_AS_UNKNOWN: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlapSettings {
    pub min_overlap: usize,
    pub error_rate: f64,
    pub quality_offset: u8,
    pub quality_aware: bool,
}

impl Default for OverlapSettings {
    fn default() -> Self {
        Self {
            min_overlap: 10,
            error_rate: 0.05,
            quality_offset: 33,
            quality_aware: true,
        }
    }
}

/// Where the overlap starts in the first and second sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overlap {
    pub offset1: usize,
    pub offset2: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    Merged { record: Record, overlap: usize },
    NotMerged,
}

fn mismatch(a: u8, b: u8, qa: u8, qb: u8, settings: &OverlapSettings) -> usize {
    let (a, b) = if settings.quality_aware {
        let low = |q: u8| phred(q, settings.quality_offset) < LOW_QUALITY_AS_UNKNOWN;
        (if low(qa) { b'N' } else { a }, if low(qb) { b'N' } else { b })
    } else {
        (a, b)
    };
    if a == b || is_unknown(a) || is_unknown(b) {
        0
    } else {
        1
    }
}

fn window_mismatches(
    seq1: &[u8],
    seq2: &[u8],
    qual1: &[u8],
    qual2: &[u8],
    start1: usize,
    start2: usize,
    settings: &OverlapSettings,
) -> usize {
    let len = (seq1.len() - start1).min(seq2.len());
    (0..len)
        .map(|j| {
            mismatch(
                seq1[start1 + j],
                seq2[start2 + j],
                qual1[start1 + j],
                qual2[start2 + j],
                settings,
            )
        })
        .sum()
}

/// Find the offset pair that maximizes `overlap - mismatches` among windows
/// within the allowed error rate.
pub fn find_overlap(
    seq1: &[u8],
    seq2: &[u8],
    qual1: &[u8],
    qual2: &[u8],
    settings: &OverlapSettings,
) -> Option<Overlap> {
    let n = seq1.len();
    let m = seq2.len();
    if settings.min_overlap > n {
        return None;
    }

    let start = n.saturating_sub(m);
    let stop = n - settings.min_overlap + 1;
    let mut r_offset = m.saturating_sub(n);

    let mut best: Option<Overlap> = None;
    let mut best_matches = 0usize;
    let mut consider = |offset1: usize, offset2: usize, mismatches: usize| {
        let overlap = n - offset1;
        if mismatches as f64 <= overlap as f64 * settings.error_rate {
            let matches = overlap - mismatches;
            if matches > best_matches {
                best_matches = matches;
                best = Some(Overlap { offset1, offset2 });
            }
        }
    };

    for i in start..stop {
        // Shifted starts of a longer seq2 are only tried once, before the first
        // unshifted window.
        while r_offset > 0 {
            let mismatches = window_mismatches(seq1, seq2, qual1, qual2, i, r_offset, settings);
            consider(i, r_offset, mismatches);
            r_offset -= 1;
        }
        let mismatches = window_mismatches(seq1, seq2, qual1, qual2, i, 0, settings);
        consider(i, 0, mismatches);
    }
    best
}

/// Prefix of `seq1`, quality-voted overlap, then the rest of `seq2`.
/// Returns the consensus sequence, its qualities and the overlap length.
pub fn build_consensus(
    seq1: &[u8],
    seq2: &[u8],
    qual1: &[u8],
    qual2: &[u8],
    overlap: Overlap,
) -> (Vec<u8>, Vec<u8>, usize) {
    let Overlap { offset1, offset2 } = overlap;
    let len = (seq1.len() - offset1).min(seq2.len() - offset2);

    let mut seq = Vec::with_capacity(offset1 + seq2.len() - offset2);
    let mut qual = Vec::with_capacity(seq.capacity());
    seq.extend_from_slice(&seq1[..offset1]);
    qual.extend_from_slice(&qual1[..offset1]);

    for k in 0..len {
        let (i, j) = (offset1 + k, offset2 + k);
        if qual1[i] >= qual2[j] {
            seq.push(seq1[i]);
            qual.push(qual1[i]);
        } else {
            seq.push(seq2[j]);
            qual.push(qual2[j]);
        }
    }

    let tail = offset2 + len;
    if seq2.len() > tail {
        seq.extend_from_slice(&seq2[tail..]);
        qual.extend_from_slice(&qual2[tail..]);
    }
    (seq, qual, len)
}

pub fn merge(forward: &Record, reverse: &Record, settings: &OverlapSettings) -> MergeOutcome {
    let rev_seq = reverse_complement(&reverse.sequence);
    let rev_qual: Vec<u8> = reverse.quality.iter().rev().copied().collect();
    let (fwd_seq, fwd_qual) = (&forward.sequence, &forward.quality);

    let consensus = if let Some(overlap) = find_overlap(fwd_seq, &rev_seq, fwd_qual, &rev_qual, settings) {
        build_consensus(fwd_seq, &rev_seq, fwd_qual, &rev_qual, overlap)
    } else if let Some(overlap) = find_overlap(&rev_seq, fwd_seq, &rev_qual, fwd_qual, settings) {
        build_consensus(&rev_seq, fwd_seq, &rev_qual, fwd_qual, overlap)
    } else {
        return MergeOutcome::NotMerged;
    };

    let (sequence, quality, overlap) = consensus;
    MergeOutcome::Merged {
        record: Record {
            id: forward.id.clone(),
            sequence,
            separator: forward.separator.clone(),
            quality,
        },
        overlap,
    }
}
