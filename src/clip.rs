use crate::align::{AlignmentEngine, AlignmentSummary};
use crate::record::Record;
use crate::trim::EndTrimmer;

/// Where in the query the adapter starts, or `None` when the alignment does not
/// look like an adapter hit. The thresholds are empirical and fixed.
pub fn cutoff(summary: &AlignmentSummary, minimum_adapter_length: usize) -> Option<usize> {
    let size = summary.size();
    if size == 0 {
        return None;
    }
    if minimum_adapter_length > 0 && size < minimum_adapter_length {
        return None;
    }

    let percent_matches = summary.matches * 100 / size;
    let reaches_query_end = summary.query_end + 1 == summary.query_size;
    let near_query_end = summary.query_end + 2 >= summary.query_size;

    if reaches_query_end && summary.mismatches == 0 {
        return Some(summary.query_start);
    }
    if size > 5 && summary.target_start == 0 && percent_matches >= 75 {
        return Some(summary.query_start);
    }
    if size > 11 && percent_matches >= 80 {
        return Some(summary.query_start);
    }
    if near_query_end && size <= 5 && summary.matches >= 3 {
        return Some(summary.query_start);
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    TooShort,
    AdapterOnly,
    NoAdapterFound,
    AdapterFound,
    ContainsUnknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipOutcome {
    Kept(Record),
    Rejected(RejectReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipSettings {
    pub adapter: Vec<u8>,
    pub min_length: usize,
    pub minimum_adapter_length: usize,
    pub keep_delta: usize,
    pub discard_unknown: bool,
    pub discard_clipped: bool,
    pub discard_non_clipped: bool,
    pub show_adapter_only: bool,
    pub end_trimmer: EndTrimmer,
}

impl ClipSettings {
    pub fn for_adapter(adapter: &[u8]) -> Self {
        Self {
            adapter: adapter.to_vec(),
            min_length: 5,
            minimum_adapter_length: 0,
            keep_delta: 0,
            discard_unknown: true,
            discard_clipped: false,
            discard_non_clipped: false,
            show_adapter_only: false,
            end_trimmer: EndTrimmer::default(),
        }
    }
}

/// Clip-stage policy for one read direction. Owns its alignment buffers, so
/// each clip worker holds its own `Clipper`.
#[derive(Debug)]
pub struct Clipper {
    settings: ClipSettings,
    engine: AlignmentEngine,
}

impl Clipper {
    pub fn new(settings: ClipSettings) -> Self {
        Self {
            settings,
            engine: AlignmentEngine::new(),
        }
    }

    pub fn settings(&self) -> &ClipSettings {
        &self.settings
    }

    pub fn adapter_cutoff(&mut self, sequence: &[u8]) -> Option<usize> {
        let summary = self.engine.align(sequence, &self.settings.adapter);
        cutoff(&summary, self.settings.minimum_adapter_length)
    }

    pub fn clip(&mut self, mut record: Record) -> ClipOutcome {
        let cut = self.adapter_cutoff(&record.sequence);
        let s = &self.settings;

        match cut {
            Some(0) if !s.show_adapter_only => {
                return ClipOutcome::Rejected(RejectReason::AdapterOnly);
            }
            Some(i) if i > 0 => {
                let keep = (i + s.keep_delta).min(record.len());
                record.truncate(keep);
            }
            _ => {}
        }

        if record.len() < s.min_length {
            return ClipOutcome::Rejected(RejectReason::TooShort);
        }
        if cut.is_none() && s.discard_non_clipped {
            return ClipOutcome::Rejected(RejectReason::NoAdapterFound);
        }
        if cut.is_some_and(|i| i > 0) && s.discard_clipped {
            return ClipOutcome::Rejected(RejectReason::AdapterFound);
        }
        if s.discard_unknown && record.contains_unknown() {
            return ClipOutcome::Rejected(RejectReason::ContainsUnknown);
        }

        s.end_trimmer.trim(&mut record);
        if record.len() < s.min_length {
            return ClipOutcome::Rejected(RejectReason::TooShort);
        }
        record.separator = "+".to_string();
        ClipOutcome::Kept(record)
    }
}
