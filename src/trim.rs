use crate::record::{Record, phred};

/// Fixed-position trimming applied at the end of the clip stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EndTrimmer {
    pub trim_5p: usize,
    pub trim_3p: usize,
    /// 1-based last base to keep; overrides `trim_3p` when set.
    pub last_base: Option<usize>,
}

impl EndTrimmer {
    /// Leaves the record untouched when the requested window would be empty.
    pub fn trim(&self, record: &mut Record) {
        let len = record.len();
        let first = self.trim_5p;
        let last = match self.last_base {
            Some(last_base) => last_base.min(len),
            None => len.saturating_sub(self.trim_3p),
        };
        if last <= first {
            return;
        }
        record.slice(first, last);
    }
}

/// Removes trailing bases whose quality is below `min_quality`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityTrimmer {
    pub min_quality: i32,
    pub offset: u8,
}

impl QualityTrimmer {
    pub fn trim(&self, record: &mut Record) {
        let keep = record
            .quality
            .iter()
            .rposition(|&q| phred(q, self.offset) >= self.min_quality)
            .map_or(0, |i| i + 1);
        record.truncate(keep);
    }
}

/// Fraction of bases with a Phred score below `min_quality`. Empty reads have none.
pub fn fraction_below_quality(record: &Record, min_quality: i32, offset: u8) -> f64 {
    if record.quality.is_empty() {
        return 0.0;
    }
    let bad = record
        .quality
        .iter()
        .filter(|&&q| phred(q, offset) < min_quality)
        .count();
    bad as f64 / record.quality.len() as f64
}
