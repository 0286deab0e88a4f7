use crate::clip::{ClipOutcome, Clipper};
use crate::config::Config;
use crate::fastq::{self, Destination, FastqSource, OutputSink};
use crate::merge::{self, MergeOutcome, OverlapSettings};
use crate::record::{QueueItem, Record};
use crate::stats::{ClipCounters, PairOutcome, Statistics, StatsSnapshot};
use crate::trim::{QualityTrimmer, fraction_below_quality};
use anyhow::{Result, anyhow};
use crossfire::mpmc;
use std::thread;

const PROGRESS_INTERVAL: u64 = 100_000;

/// Clip both read directions on their own threads and merge the pairs on a
/// third; only the merge worker writes output.
pub fn run(config: &Config) -> Result<StatsSnapshot> {
    fastq::check_readable(&config.forward_inputs)?;
    fastq::check_readable(&config.reverse_inputs)?;
    fastq::check_distinct(&config.forward_inputs, &config.reverse_inputs)?;
    let mut sink = OutputSink::open(config)?;
    let stats = Statistics::new();

    tracing::info!(
        forward_inputs = config.forward_inputs.len(),
        reverse_inputs = config.reverse_inputs.len(),
        clipping = !config.no_clipping,
        merging = !config.no_merging,
        min_overlap = config.min_merge_overlap,
        min_length = config.min_sequence_length,
        queue_capacity = config.queue_capacity,
        "starting clip and merge"
    );

    crossfire::detect_backoff_cfg();
    let (tx_fwd, rx_fwd) = mpmc::bounded_blocking::<QueueItem>(config.queue_capacity);
    let (tx_rev, rx_rev) = mpmc::bounded_blocking::<QueueItem>(config.queue_capacity);

    let stats_ref = &stats;
    let sink_ref = &mut sink;
    thread::scope(|scope| -> Result<()> {
        let forward = FastqSource::new(config.forward_inputs.clone(), config.alphabet());
        let forward_clipper =
            (!config.no_clipping).then(|| Clipper::new(config.clip_settings(&config.forward_adapter)));
        let forward_worker = scope.spawn(move || {
            clip_worker("forward", forward, forward_clipper, &stats_ref.forward_clip, |item| {
                tx_fwd.send(item).is_ok()
            })
        });

        let reverse_worker = if config.is_paired() {
            let reverse = FastqSource::new(config.reverse_inputs.clone(), config.alphabet());
            let reverse_clipper = (!config.no_clipping)
                .then(|| Clipper::new(config.clip_settings(&config.reverse_adapter)));
            Some(scope.spawn(move || {
                clip_worker("reverse", reverse, reverse_clipper, &stats_ref.reverse_clip, |item| {
                    tx_rev.send(item).is_ok()
                })
            }))
        } else {
            drop(tx_rev);
            None
        };

        let paired = config.is_paired();
        let merge_worker = scope.spawn(move || {
            let mut processor = PairProcessor::new(config, sink_ref, stats_ref);
            let pop_forward = || rx_fwd.recv().unwrap_or(QueueItem::Terminated);
            if paired {
                let pop_reverse = || rx_rev.recv().unwrap_or(QueueItem::Terminated);
                merge_pairs(&mut processor, pop_forward, pop_reverse)
            } else {
                drop(rx_rev);
                merge_single(&mut processor, pop_forward)
            }
        });

        // Clip workers stop on their own once the merge worker drops its queues.
        let merged = merge_worker
            .join()
            .map_err(|_| anyhow!("merge worker panicked"))?;
        let forward = forward_worker
            .join()
            .map_err(|_| anyhow!("forward clip worker panicked"))?;
        let reverse = match reverse_worker {
            Some(worker) => Some(
                worker
                    .join()
                    .map_err(|_| anyhow!("reverse clip worker panicked"))?,
            ),
            None => None,
        };

        let forward_records = forward?;
        let reverse_records = reverse.transpose()?;
        let pairs = merged?;
        tracing::debug!(
            forward_records,
            reverse_records = reverse_records.unwrap_or(0),
            pairs,
            "workers finished"
        );
        Ok(())
    })?;

    sink.finish()?;
    Ok(stats.snapshot())
}

/// Read, clip and enqueue one direction. Always ends the queue with
/// `Terminated`, also after a parse error, which is then returned.
pub fn clip_worker<I, P>(
    direction: &'static str,
    records: I,
    mut clipper: Option<Clipper>,
    counters: &ClipCounters,
    mut push: P,
) -> Result<u64>
where
    I: Iterator<Item = Result<Record>>,
    P: FnMut(QueueItem) -> bool,
{
    let mut count = 0u64;
    let mut failure = None;
    for record in records {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(direction, error = %e, "stopping clip worker");
                failure = Some(e);
                break;
            }
        };
        count += 1;
        counters.record_input();

        let item = match clipper.as_mut() {
            None => QueueItem::Record(record),
            Some(clipper) => match clipper.clip(record) {
                ClipOutcome::Kept(record) => QueueItem::Record(record),
                ClipOutcome::Rejected(reason) => {
                    counters.record_rejection(reason);
                    QueueItem::Rejected
                }
            },
        };
        if !push(item) {
            tracing::debug!(direction, count, "merge worker stopped, ending clip worker");
            return Ok(count);
        }
    }

    push(QueueItem::Terminated);
    if let Some(e) = failure {
        return Err(e);
    }
    tracing::debug!(direction, count, "clip worker done");
    Ok(count)
}

/// Pair the two queues positionally until either one terminates.
/// Returns the number of pairs processed.
pub fn merge_pairs<F, R>(processor: &mut PairProcessor<'_>, mut pop_forward: F, mut pop_reverse: R) -> Result<u64>
where
    F: FnMut() -> QueueItem,
    R: FnMut() -> QueueItem,
{
    let mut pairs = 0u64;
    loop {
        let forward = pop_forward();
        if matches!(forward, QueueItem::Terminated) {
            break;
        }
        let reverse = pop_reverse();
        match (forward, reverse) {
            (_, QueueItem::Terminated) | (QueueItem::Terminated, _) => {
                tracing::warn!(
                    pairs,
                    "reverse input ended before forward input, ignoring records without a mate"
                );
                break;
            }
            (QueueItem::Rejected, QueueItem::Rejected) => {
                processor.stats.record_outcome(PairOutcome::FailedClipping);
            }
            (QueueItem::Rejected, QueueItem::Record(reverse)) => processor.single(reverse, Mate::Reverse)?,
            (QueueItem::Record(forward), QueueItem::Rejected) => processor.single(forward, Mate::Forward)?,
            (QueueItem::Record(forward), QueueItem::Record(reverse)) => processor.pair(forward, reverse)?,
        }
        pairs += 1;
        if pairs % PROGRESS_INTERVAL == 0 {
            tracing::info!(pairs, "read pairs processed");
        }
    }
    Ok(pairs)
}

/// Single-end mode: every forward record is handled as a read without mate.
pub fn merge_single<F>(processor: &mut PairProcessor<'_>, mut pop_forward: F) -> Result<u64>
where
    F: FnMut() -> QueueItem,
{
    let mut reads = 0u64;
    loop {
        match pop_forward() {
            QueueItem::Terminated => break,
            QueueItem::Rejected => processor.stats.record_outcome(PairOutcome::FailedClipping),
            QueueItem::Record(record) => processor.single(record, Mate::Forward)?,
        }
        reads += 1;
        if reads % PROGRESS_INTERVAL == 0 {
            tracing::info!(reads, "reads processed");
        }
    }
    Ok(reads)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mate {
    Forward,
    Reverse,
}

impl Mate {
    fn tag(self) -> &'static str {
        match self {
            Mate::Forward => "F_",
            Mate::Reverse => "R_",
        }
    }

    fn destination(self) -> Destination {
        match self {
            Mate::Forward => Destination::MateForward,
            Mate::Reverse => Destination::MateReverse,
        }
    }
}

/// Merge-stage policy: decides, counts and writes what becomes of each pair.
pub struct PairProcessor<'a> {
    config: &'a Config,
    overlap: OverlapSettings,
    quality_trimmer: Option<QualityTrimmer>,
    sink: &'a mut OutputSink,
    stats: &'a Statistics,
}

impl<'a> PairProcessor<'a> {
    pub fn new(config: &'a Config, sink: &'a mut OutputSink, stats: &'a Statistics) -> Self {
        Self {
            config,
            overlap: config.overlap_settings(),
            quality_trimmer: config.quality_trimmer(),
            sink,
            stats,
        }
    }

    fn quality_trim(&self, record: &mut Record) {
        if let Some(trimmer) = &self.quality_trimmer {
            trimmer.trim(record);
        }
    }

    fn long_enough(&self, record: &Record) -> bool {
        record.len() >= self.config.min_sequence_length
    }

    /// A read whose mate was rejected during clipping.
    pub fn single(&mut self, mut record: Record, mate: Mate) -> Result<()> {
        self.quality_trim(&mut record);
        if !self.long_enough(&record) {
            self.stats.record_outcome(match mate {
                Mate::Forward => PairOutcome::SingleForwardTooShort,
                Mate::Reverse => PairOutcome::SingleReverseTooShort,
            });
            return Ok(());
        }
        self.stats.record_outcome(match mate {
            Mate::Forward => PairOutcome::SingleForward,
            Mate::Reverse => PairOutcome::SingleReverse,
        });
        if !self.config.remove_single_reads {
            self.sink.write(mate.destination(), &record, mate.tag())?;
        }
        Ok(())
    }

    pub fn pair(&mut self, forward: Record, reverse: Record) -> Result<()> {
        if self.config.no_merging {
            return self.unmerged(forward, reverse);
        }
        match merge::merge(&forward, &reverse, &self.overlap) {
            MergeOutcome::Merged { record, overlap } => self.merged(record, overlap),
            MergeOutcome::NotMerged => {
                self.stats.record_no_overlap();
                self.unmerged(forward, reverse)
            }
        }
    }

    fn merged(&mut self, record: Record, overlap: usize) -> Result<()> {
        let config = self.config;
        if config.discard_bad_quality_reads() {
            let bad = fraction_below_quality(&record, config.discard_bad_quality_score, config.quality_offset);
            if bad > 1.0 - config.min_good_quality_fraction {
                self.stats.record_outcome(PairOutcome::MergedBadQuality);
                return Ok(());
            }
        }
        if !self.long_enough(&record) {
            self.stats.record_outcome(PairOutcome::MergedTooShort);
            return Ok(());
        }
        self.stats.record_merged(overlap);
        self.sink.write(Destination::Main, &record, "M_")
    }

    fn unmerged(&mut self, mut forward: Record, mut reverse: Record) -> Result<()> {
        self.quality_trim(&mut forward);
        self.quality_trim(&mut reverse);

        let forward_ok = self.long_enough(&forward);
        if !forward_ok {
            self.stats.record_unmerged_too_short(true);
        }
        let reverse_ok = self.long_enough(&reverse);
        if !reverse_ok {
            self.stats.record_unmerged_too_short(false);
        }

        let keep_single = !self.config.remove_single_reads;
        let outcome = match (forward_ok, reverse_ok) {
            (true, true) => {
                let (forward_tag, reverse_tag) = if self.sink.has_mate_files() {
                    ("", "")
                } else {
                    (Mate::Forward.tag(), Mate::Reverse.tag())
                };
                self.sink.write(Destination::MateForward, &forward, forward_tag)?;
                self.sink.write(Destination::MateReverse, &reverse, reverse_tag)?;
                PairOutcome::UnmergedPair
            }
            (true, false) if keep_single => {
                self.sink.write(Destination::MateForward, &forward, Mate::Forward.tag())?;
                PairOutcome::UnmergedForwardOnly
            }
            (false, true) if keep_single => {
                self.sink.write(Destination::MateReverse, &reverse, Mate::Reverse.tag())?;
                PairOutcome::UnmergedReverseOnly
            }
            _ => PairOutcome::MateTooShort,
        };
        self.stats.record_outcome(outcome);
        Ok(())
    }
}
