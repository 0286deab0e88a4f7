//! Semi-global alignment of a read (query) against an adapter (target).
//!
//! The query may start anywhere without penalty. The target may skip at most
//! a few of its leading bases for free; skipping more costs one gap per base.
//! Matrices are indexed `[query][target]` and kept between calls so a clip
//! worker aligning millions of same-length reads does not reallocate.

use crate::record::is_unknown;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    FromUpper,
    FromLeft,
    FromUpperLeft,
    FromNowhere,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchClass {
    Match,
    Mismatch,
    /// At least one of the two bases is unknown.
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringScheme {
    pub gap: f64,
    pub matched: f64,
    pub mismatch: f64,
    /// Exactly one base is unknown.
    pub neutral: f64,
    pub both_unknown: f64,
}

impl Default for ScoringScheme {
    fn default() -> Self {
        Self {
            gap: -5.0,
            matched: 1.0,
            mismatch: -1.0,
            neutral: 0.1,
            both_unknown: 0.0,
        }
    }
}

impl ScoringScheme {
    fn pair_score(&self, q: u8, t: u8) -> f64 {
        match (is_unknown(q), is_unknown(t)) {
            (true, true) => self.both_unknown,
            (true, false) | (false, true) => self.neutral,
            _ if q == t => self.matched,
            _ => self.mismatch,
        }
    }
}

/// How the target (adapter) border of the matrix is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryPolicy {
    /// The first `free_prefix + 1` target positions may be skipped for free;
    /// past that region, runs of query-consuming gaps are not allowed to
    /// outpace the target.
    AdapterPrefix { free_prefix: usize },
}

impl Default for BoundaryPolicy {
    fn default() -> Self {
        BoundaryPolicy::AdapterPrefix { free_prefix: 3 }
    }
}

impl BoundaryPolicy {
    fn target_border(&self, t: usize, gap: f64) -> f64 {
        match *self {
            BoundaryPolicy::AdapterPrefix { free_prefix } => {
                if t <= free_prefix {
                    0.0
                } else {
                    gap * (t - free_prefix) as f64
                }
            }
        }
    }

    fn left_allowed(&self, q: usize, t: usize) -> bool {
        match *self {
            BoundaryPolicy::AdapterPrefix { free_prefix } => {
                !(t > free_prefix && t - free_prefix > q)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignmentSummary {
    pub query_size: usize,
    pub target_size: usize,
    pub query_start: usize,
    pub query_end: usize,
    pub target_start: usize,
    pub target_end: usize,
    pub matches: usize,
    pub mismatches: usize,
    pub neutral_matches: usize,
    pub gaps: usize,
    pub score: f64,
    pub query_aligned: String,
    pub target_aligned: String,
}

impl AlignmentSummary {
    pub fn empty(query_size: usize, target_size: usize) -> Self {
        Self {
            query_size,
            target_size,
            ..Self::default()
        }
    }

    /// Number of aligned columns.
    pub fn size(&self) -> usize {
        self.matches + self.mismatches + self.neutral_matches + self.gaps
    }

    pub fn is_clean(&self) -> bool {
        self.matches >= 7 && self.mismatches == 0 && self.gaps == 0
    }
}

#[derive(Debug, Default)]
pub struct AlignmentEngine {
    scoring: ScoringScheme,
    policy: BoundaryPolicy,
    width: usize,
    height: usize,
    scores: Vec<f64>,
    origins: Vec<Origin>,
    classes: Vec<MatchClass>,
    query_border: Vec<f64>,
    target_border: Vec<f64>,
}

impl AlignmentEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scheme(scoring: ScoringScheme, policy: BoundaryPolicy) -> Self {
        Self {
            scoring,
            policy,
            ..Self::default()
        }
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn align(&mut self, query: &[u8], target: &[u8]) -> AlignmentSummary {
        if query.is_empty() || target.is_empty() {
            return AlignmentSummary::empty(query.len(), target.len());
        }

        self.resize(query.len(), target.len());
        self.classify(query, target);
        self.reset_borders();
        let (best_q, best_t) = self.populate(query, target);

        let first = self.backtrace(query, target, best_q, best_t);
        if first.is_clean() || self.near_sequence_end(best_q, best_t) {
            return first;
        }

        match self.boundary_anchor(self.score(best_q, best_t)) {
            Some((q, t)) => self.backtrace(query, target, q, t),
            None => first,
        }
    }

    #[inline]
    fn idx(&self, q: usize, t: usize) -> usize {
        q * self.height + t
    }

    fn score(&self, q: usize, t: usize) -> f64 {
        self.scores[self.idx(q, t)]
    }

    fn origin(&self, q: usize, t: usize) -> Origin {
        self.origins[self.idx(q, t)]
    }

    /// Score with the borders at index -1 on either axis.
    fn border_score(&self, q: isize, t: isize) -> f64 {
        match (q, t) {
            (-1, -1) => 0.0,
            (-1, t) => self.target_border[t as usize],
            (q, -1) => self.query_border[q as usize],
            (q, t) => self.score(q as usize, t as usize),
        }
    }

    fn resize(&mut self, width: usize, height: usize) {
        if self.width == width && self.height == height {
            return;
        }
        let cells = width * height;
        self.width = width;
        self.height = height;
        self.scores = vec![0.0; cells];
        self.origins = vec![Origin::FromNowhere; cells];
        self.classes = vec![MatchClass::Match; cells];
        self.query_border = vec![0.0; width];
        self.target_border = vec![0.0; height];
    }

    fn classify(&mut self, query: &[u8], target: &[u8]) {
        for (q, &qb) in query.iter().enumerate() {
            for (t, &tb) in target.iter().enumerate() {
                let class = if is_unknown(qb) || is_unknown(tb) {
                    MatchClass::Neutral
                } else if qb == tb {
                    MatchClass::Match
                } else {
                    MatchClass::Mismatch
                };
                let i = self.idx(q, t);
                self.classes[i] = class;
            }
        }
    }

    fn reset_borders(&mut self) {
        self.query_border.fill(0.0);
        for t in 0..self.height {
            self.target_border[t] = self.policy.target_border(t, self.scoring.gap);
        }
        self.origins.fill(Origin::FromNowhere);
    }

    /// Fill the score and origin matrices; returns the highest-scoring cell.
    fn populate(&mut self, query: &[u8], target: &[u8]) -> (usize, usize) {
        let gap = self.scoring.gap;
        let mut best = f64::NEG_INFINITY;
        let mut best_cell = (0, 0);

        for q in 0..self.width {
            for t in 0..self.height {
                let (qi, ti) = (q as isize, t as isize);
                let diag = self.border_score(qi - 1, ti - 1)
                    + self.scoring.pair_score(query[q], target[t]);
                let up = self.border_score(qi, ti - 1) + gap;
                let left = if self.policy.left_allowed(q, t) {
                    self.border_score(qi - 1, ti) + gap
                } else {
                    f64::NEG_INFINITY
                };

                // Order matters: ties keep the earlier candidate.
                let mut score = diag;
                let mut origin = Origin::FromUpperLeft;
                if up > score {
                    score = up;
                    origin = Origin::FromUpper;
                }
                if left > score {
                    score = left;
                    origin = Origin::FromLeft;
                }

                let i = self.idx(q, t);
                self.scores[i] = score;
                self.origins[i] = origin;

                if score > best {
                    best = score;
                    best_cell = (q, t);
                }
            }
        }
        best_cell
    }

    fn near_sequence_end(&self, q: usize, t: usize) -> bool {
        q + 2 >= self.width || t + 2 >= self.height
    }

    /// Look along the last two target rows and last two query columns for a
    /// valid cell scoring above `threshold`.
    fn boundary_anchor(&self, threshold: f64) -> Option<(usize, usize)> {
        let mut best = threshold;
        let mut found = None;

        let last_rows = self.height.saturating_sub(2)..self.height;
        for q in 0..self.width {
            for t in last_rows.clone() {
                if self.origin(q, t) != Origin::FromNowhere && self.score(q, t) > best {
                    best = self.score(q, t);
                    found = Some((q, t));
                }
            }
        }

        for q in self.width.saturating_sub(2)..self.width {
            for t in 0..self.height {
                if self.origin(q, t) != Origin::FromNowhere && self.score(q, t) > best {
                    best = self.score(q, t);
                    found = Some((q, t));
                }
            }
        }
        found
    }

    fn backtrace(&self, query: &[u8], target: &[u8], end_q: usize, end_t: usize) -> AlignmentSummary {
        let mut summary = AlignmentSummary {
            query_size: self.width,
            target_size: self.height,
            query_end: end_q,
            target_end: end_t,
            ..AlignmentSummary::default()
        };
        let mut query_aligned: Vec<u8> = Vec::new();
        let mut target_aligned: Vec<u8> = Vec::new();

        let mut q = end_q as isize;
        let mut t = end_t as isize;
        while q >= 0 && t >= 0 {
            let (qu, tu) = (q as usize, t as usize);
            let origin = self.origin(qu, tu);
            if origin == Origin::FromNowhere {
                break;
            }
            summary.query_start = qu;
            summary.target_start = tu;

            match origin {
                Origin::FromLeft => {
                    query_aligned.push(query[qu]);
                    target_aligned.push(b'-');
                    summary.gaps += 1;
                    summary.score += self.scoring.gap;
                    q -= 1;
                }
                Origin::FromUpper => {
                    query_aligned.push(b'-');
                    target_aligned.push(target[tu]);
                    summary.gaps += 1;
                    summary.score += self.scoring.gap;
                    t -= 1;
                }
                Origin::FromUpperLeft => {
                    query_aligned.push(query[qu]);
                    target_aligned.push(target[tu]);
                    match self.classes[self.idx(qu, tu)] {
                        MatchClass::Match => {
                            summary.matches += 1;
                            summary.score += self.scoring.matched;
                        }
                        MatchClass::Mismatch => {
                            summary.mismatches += 1;
                            summary.score += self.scoring.mismatch;
                        }
                        MatchClass::Neutral => {
                            summary.neutral_matches += 1;
                            summary.score += self.scoring.pair_score(query[qu], target[tu]);
                        }
                    }
                    q -= 1;
                    t -= 1;
                }
                Origin::FromNowhere => break,
            }
        }

        query_aligned.reverse();
        target_aligned.reverse();
        summary.query_aligned = String::from_utf8_lossy(&query_aligned).into_owned();
        summary.target_aligned = String::from_utf8_lossy(&target_aligned).into_owned();
        summary
    }
}
