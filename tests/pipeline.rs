/// End-to-end pipeline runs over small FASTQ files in a temporary directory.
///
/// The fragments below were chosen so that neither mate contains anything the
/// adapter aligner would clip, and each pair overlaps by exactly 20 bases.
use clipmerge_rs::config::{Config, MatePairOutput};
use clipmerge_rs::fastq::OutputSink;
use clipmerge_rs::pipeline::{PairProcessor, merge_pairs};
use clipmerge_rs::{QueueItem, Statistics, reverse_complement, run};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const FRAGMENTS: [&str; 4] = [
    "GCTAAAGACAATTACATAACATACACGTCAGCACGAAACTTGTTGGCCCAGTGTGAATCG",
    "CTTAAGGGTTAAGTAAGTGTGATGCATACGCCTTTACTTGCTGTGTCCACCCCATCGGAC",
    "TGGCATTTTTATTACACTCAGAAACAGAACTCGGGTAATTTTGACAGGTCACGCAGAGGC",
    "GCGCCCTCCTGAAGTGCGTGGACACTCGCTATGAATCTCTGATTTACCCACTCTGCCAAA",
];

const FORWARD_ADAPTER: &str = "AGATCGGAAGAGCACACGTCTGAACTCCAGTCAC";

// ── helpers ──────────────────────────────────────────────────────────────────

fn fastq(records: &[(String, Vec<u8>)]) -> Vec<u8> {
    let mut out = Vec::new();
    for (id, seq) in records {
        out.extend_from_slice(format!("@{id}\n").as_bytes());
        out.extend_from_slice(seq);
        out.extend_from_slice(b"\n+\n");
        out.extend(std::iter::repeat_n(b'I', seq.len()));
        out.push(b'\n');
    }
    out
}

fn forward_mates() -> Vec<(String, Vec<u8>)> {
    FRAGMENTS
        .iter()
        .enumerate()
        .map(|(i, f)| (format!("pair{i}/1"), f.as_bytes()[..40].to_vec()))
        .collect()
}

fn reverse_mates() -> Vec<(String, Vec<u8>)> {
    FRAGMENTS
        .iter()
        .enumerate()
        .map(|(i, f)| (format!("pair{i}/2"), reverse_complement(&f.as_bytes()[20..])))
        .collect()
}

/// `count` forward and reverse mates cycling through the fragments.
fn many_mates(count: usize) -> (Vec<(String, Vec<u8>)>, Vec<(String, Vec<u8>)>) {
    (0..count)
        .map(|i| {
            let fragment = FRAGMENTS[i % FRAGMENTS.len()].as_bytes();
            (
                (format!("pair{i}/1"), fragment[..40].to_vec()),
                (format!("pair{i}/2"), reverse_complement(&fragment[20..])),
            )
        })
        .unzip()
}

fn write_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("write fixture");
    path
}

/// (header, sequence) of every record in a plain FASTQ file.
fn read_fastq(path: &Path) -> Vec<(String, String)> {
    let text = fs::read_to_string(path).expect("read output");
    parse_fastq(&text)
}

fn parse_fastq(text: &str) -> Vec<(String, String)> {
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len() % 4, 0, "truncated FASTQ output");
    lines
        .chunks(4)
        .map(|rec| {
            assert_eq!(rec[2], "+");
            assert_eq!(rec[1].len(), rec[3].len());
            (rec[0].to_string(), rec[1].to_string())
        })
        .collect()
}

fn paired_config(dir: &TempDir) -> Config {
    let forward = write_file(dir.path(), "r1.fq", &fastq(&forward_mates()));
    let reverse = write_file(dir.path(), "r2.fq", &fastq(&reverse_mates()));
    Config {
        forward_inputs: vec![forward],
        reverse_inputs: vec![reverse],
        output: Some(dir.path().join("out.fq")),
        ..Config::default()
    }
}

// ── tests ────────────────────────────────────────────────────────────────────

#[test]
fn overlapping_pairs_are_merged() {
    let dir = TempDir::new().unwrap();
    let config = paired_config(&dir);

    let stats = run(&config).expect("pipeline run");
    assert_eq!(stats.pairs(), FRAGMENTS.len() as u64);
    assert_eq!(stats.merged, FRAGMENTS.len() as u64);
    assert_eq!(stats.average_overlap(), 20.0);
    assert_eq!(stats.forward_clip.input, 4);
    assert_eq!(stats.reverse_clip.input, 4);

    let records = read_fastq(&dir.path().join("out.fq"));
    assert_eq!(records.len(), FRAGMENTS.len());
    for (i, (header, seq)) in records.iter().enumerate() {
        assert_eq!(header, &format!("@M_pair{i}/1"));
        assert_eq!(seq, FRAGMENTS[i]);
    }
}

#[test]
fn every_pair_gets_exactly_one_outcome() {
    let dir = TempDir::new().unwrap();
    let mut forward = forward_mates();
    // Adapter-only forward read: rejected, the reverse mate survives alone.
    forward[1].1 = FORWARD_ADAPTER.as_bytes().to_vec();
    // Too short to survive the clip stage.
    forward[2].1 = b"ACGTAC".to_vec();
    let reverse = reverse_mates();
    let mut reverse_short = reverse.clone();
    reverse_short[2].1 = b"TTGCA".to_vec();

    let config = Config {
        forward_inputs: vec![write_file(dir.path(), "r1.fq", &fastq(&forward))],
        reverse_inputs: vec![write_file(dir.path(), "r2.fq", &fastq(&reverse_short))],
        output: Some(dir.path().join("out.fq")),
        ..Config::default()
    };

    let stats = run(&config).expect("pipeline run");
    assert_eq!(stats.pairs(), 4);
    assert_eq!(stats.merged, 2);
    assert_eq!(stats.single_reverse, 1);
    assert_eq!(stats.failed_clipping, 1);
    assert_eq!(stats.forward_clip.adapter_only, 1);
    assert_eq!(stats.forward_clip.too_short, 1);
    assert_eq!(stats.reverse_clip.too_short, 1);

    let headers: Vec<String> = read_fastq(&dir.path().join("out.fq"))
        .into_iter()
        .map(|(h, _)| h)
        .collect();
    assert_eq!(headers, vec!["@M_pair0/1", "@R_pair1/2", "@M_pair3/1"]);
}

#[test]
fn removing_single_reads_still_counts_them() {
    let dir = TempDir::new().unwrap();
    let mut forward = forward_mates();
    forward[0].1 = FORWARD_ADAPTER.as_bytes().to_vec();
    let config = Config {
        forward_inputs: vec![write_file(dir.path(), "r1.fq", &fastq(&forward))],
        reverse_inputs: vec![write_file(dir.path(), "r2.fq", &fastq(&reverse_mates()))],
        output: Some(dir.path().join("out.fq")),
        remove_single_reads: true,
        ..Config::default()
    };

    let stats = run(&config).expect("pipeline run");
    assert_eq!(stats.single_reverse, 1);
    assert_eq!(stats.merged, 3);
    let records = read_fastq(&dir.path().join("out.fq"));
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|(h, _)| h.starts_with("@M_")));
}

#[test]
fn no_merging_writes_mates_to_separate_files() {
    let dir = TempDir::new().unwrap();
    let mut config = paired_config(&dir);
    config.no_merging = true;
    config.mate_pair_output = Some(MatePairOutput {
        forward: dir.path().join("unmerged_1.fq"),
        reverse: dir.path().join("unmerged_2.fq"),
    });

    let stats = run(&config).expect("pipeline run");
    assert_eq!(stats.unmerged_pairs, 4);
    assert_eq!(stats.merged, 0);
    assert_eq!(stats.no_overlap, 0);

    assert!(read_fastq(&dir.path().join("out.fq")).is_empty());
    let forward = read_fastq(&dir.path().join("unmerged_1.fq"));
    let reverse = read_fastq(&dir.path().join("unmerged_2.fq"));
    assert_eq!(forward.len(), 4);
    assert_eq!(reverse.len(), 4);
    assert_eq!(forward[0].0, "@pair0/1");
    assert_eq!(reverse[0].0, "@pair0/2");
    assert_eq!(forward[0].1, &FRAGMENTS[0][..40]);
}

#[test]
fn unmerged_mates_are_tagged_in_main_output() {
    let dir = TempDir::new().unwrap();
    let mut config = paired_config(&dir);
    config.no_merging = true;

    run(&config).expect("pipeline run");
    let headers: Vec<String> = read_fastq(&dir.path().join("out.fq"))
        .into_iter()
        .map(|(h, _)| h)
        .collect();
    assert_eq!(headers.len(), 8);
    assert_eq!(headers[0], "@F_pair0/1");
    assert_eq!(headers[1], "@R_pair0/2");
}

#[test]
fn single_end_mode_emits_forward_reads() {
    let dir = TempDir::new().unwrap();
    let config = Config {
        forward_inputs: vec![write_file(dir.path(), "r1.fq", &fastq(&forward_mates()))],
        output: Some(dir.path().join("out.fq")),
        ..Config::default()
    };

    let stats = run(&config).expect("pipeline run");
    assert_eq!(stats.pairs(), 4);
    assert_eq!(stats.single_forward, 4);
    let records = read_fastq(&dir.path().join("out.fq"));
    assert_eq!(records.len(), 4);
    assert_eq!(records[3].0, "@F_pair3/1");
}

#[test]
fn several_input_files_form_one_stream() {
    let dir = TempDir::new().unwrap();
    let forward = forward_mates();
    let reverse = reverse_mates();
    let config = Config {
        forward_inputs: vec![
            write_file(dir.path(), "a1.fq", &fastq(&forward[..1])),
            write_file(dir.path(), "b1.fq", &fastq(&forward[1..])),
        ],
        reverse_inputs: vec![
            write_file(dir.path(), "a2.fq", &fastq(&reverse[..3])),
            write_file(dir.path(), "b2.fq", &fastq(&reverse[3..])),
        ],
        output: Some(dir.path().join("out.fq")),
        ..Config::default()
    };

    let stats = run(&config).expect("pipeline run");
    assert_eq!(stats.merged, 4);
}

#[test]
fn gzip_input_and_output() {
    let dir = TempDir::new().unwrap();
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&fastq(&forward_mates())).unwrap();
    let forward = write_file(dir.path(), "r1.fq.gz", &encoder.finish().unwrap());
    let reverse = write_file(dir.path(), "r2.fq", &fastq(&reverse_mates()));
    let output = dir.path().join("out.fq.gz");

    let config = Config {
        forward_inputs: vec![forward],
        reverse_inputs: vec![reverse],
        output: Some(output.clone()),
        ..Config::default()
    };
    let stats = run(&config).expect("pipeline run");
    assert_eq!(stats.merged, 4);

    let mut text = String::new();
    GzDecoder::new(fs::File::open(&output).unwrap())
        .read_to_string(&mut text)
        .unwrap();
    let records = parse_fastq(&text);
    assert_eq!(records.len(), 4);
    assert_eq!(records[2].1, FRAGMENTS[2]);
}

#[test]
fn unequal_stream_lengths_pair_positionally() {
    let dir = TempDir::new().unwrap();
    let reverse = reverse_mates();
    let config = Config {
        forward_inputs: vec![write_file(dir.path(), "r1.fq", &fastq(&forward_mates()))],
        reverse_inputs: vec![write_file(dir.path(), "r2.fq", &fastq(&reverse[..2]))],
        output: Some(dir.path().join("out.fq")),
        ..Config::default()
    };

    let stats = run(&config).expect("pipeline run");
    assert_eq!(stats.pairs(), 2);
    assert_eq!(stats.merged, 2);
}

#[test]
fn empty_inputs_produce_empty_output() {
    let dir = TempDir::new().unwrap();
    let config = Config {
        forward_inputs: vec![write_file(dir.path(), "r1.fq", b"")],
        reverse_inputs: vec![write_file(dir.path(), "r2.fq", b"")],
        output: Some(dir.path().join("out.fq")),
        ..Config::default()
    };

    let stats = run(&config).expect("pipeline run");
    assert_eq!(stats.pairs(), 0);
    assert!(read_fastq(&dir.path().join("out.fq")).is_empty());
}

#[test]
fn invalid_base_is_a_fatal_error() {
    let dir = TempDir::new().unwrap();
    let mut forward = forward_mates();
    forward[1].1[3] = b'X';
    let config = Config {
        forward_inputs: vec![write_file(dir.path(), "r1.fq", &fastq(&forward))],
        reverse_inputs: vec![write_file(dir.path(), "r2.fq", &fastq(&reverse_mates()))],
        output: Some(dir.path().join("out.fq")),
        ..Config::default()
    };

    let err = run(&config).unwrap_err();
    assert!(format!("{err:#}").contains("r1.fq"));
}

#[test]
fn missing_input_is_reported_by_path() {
    let dir = TempDir::new().unwrap();
    let config = Config {
        forward_inputs: vec![dir.path().join("does-not-exist.fq")],
        output: Some(dir.path().join("out.fq")),
        ..Config::default()
    };

    let err = run(&config).unwrap_err();
    assert!(format!("{err:#}").contains("does-not-exist.fq"));
}

#[test]
fn bad_quality_merged_reads_are_discarded() {
    let dir = TempDir::new().unwrap();
    let mut config = paired_config(&dir);
    // Every base is Phred 40, so a threshold above that fails every read.
    config.discard_bad_quality_score = 41;

    let stats = run(&config).expect("pipeline run");
    assert_eq!(stats.merged_bad_quality, 4);
    assert_eq!(stats.merged, 0);
    assert!(read_fastq(&dir.path().join("out.fq")).is_empty());
}

#[test]
fn single_slot_queues_merge_every_pair_in_order() {
    let dir = TempDir::new().unwrap();
    let (forward, reverse) = many_mates(60);
    let config = Config {
        forward_inputs: vec![write_file(dir.path(), "r1.fq", &fastq(&forward))],
        reverse_inputs: vec![write_file(dir.path(), "r2.fq", &fastq(&reverse))],
        output: Some(dir.path().join("out.fq")),
        queue_capacity: 1,
        ..Config::default()
    };

    let stats = run(&config).expect("pipeline run");
    assert_eq!(stats.pairs(), 60);
    assert_eq!(stats.merged, 60);

    let records = read_fastq(&dir.path().join("out.fq"));
    assert_eq!(records.len(), 60);
    for (i, (header, seq)) in records.iter().enumerate() {
        assert_eq!(header, &format!("@M_pair{i}/1"));
        assert_eq!(seq, FRAGMENTS[i % FRAGMENTS.len()]);
    }
}

#[test]
fn blocked_forward_worker_is_released_when_reverse_ends() {
    let dir = TempDir::new().unwrap();
    let (forward, reverse) = many_mates(50);
    for shorter in [1, 3] {
        let config = Config {
            forward_inputs: vec![write_file(dir.path(), "r1.fq", &fastq(&forward))],
            reverse_inputs: vec![write_file(dir.path(), "r2.fq", &fastq(&reverse[..shorter]))],
            output: Some(dir.path().join("out.fq")),
            queue_capacity: 1,
            ..Config::default()
        };

        let stats = run(&config).expect("pipeline run");
        assert_eq!(stats.pairs(), shorter as u64);
        assert_eq!(stats.merged, shorter as u64);
        assert_eq!(read_fastq(&dir.path().join("out.fq")).len(), shorter);
    }
}

#[test]
fn reverse_queue_is_untouched_once_forward_ends() {
    let dir = TempDir::new().unwrap();
    let config = Config {
        output: Some(dir.path().join("out.fq")),
        ..Config::default()
    };
    let mut sink = OutputSink::open(&config).unwrap();
    let stats = Statistics::new();
    let mut processor = PairProcessor::new(&config, &mut sink, &stats);

    let mut reverse_pops = 0;
    let pairs = merge_pairs(
        &mut processor,
        || QueueItem::Terminated,
        || {
            reverse_pops += 1;
            QueueItem::Terminated
        },
    )
    .unwrap();
    assert_eq!(pairs, 0);
    assert_eq!(reverse_pops, 0);
}

fn fastq_with_separator(id: &str, seq: &str, separator: &str) -> String {
    format!("@{id}\n{seq}\n{separator}\n{}\n", "I".repeat(seq.len()))
}

#[test]
fn separator_line_survives_without_clipping() {
    let dir = TempDir::new().unwrap();
    let seq = &FRAGMENTS[0][..40];
    let input = write_file(dir.path(), "r1.fq", fastq_with_separator("a/1", seq, "+a/1").as_bytes());

    let unclipped = Config {
        forward_inputs: vec![input.clone()],
        output: Some(dir.path().join("raw.fq")),
        no_clipping: true,
        ..Config::default()
    };
    run(&unclipped).expect("pipeline run");
    let text = fs::read_to_string(dir.path().join("raw.fq")).unwrap();
    assert_eq!(text, format!("@F_a/1\n{seq}\n+a/1\n{}\n", "I".repeat(40)));

    let clipped = Config {
        forward_inputs: vec![input],
        output: Some(dir.path().join("clipped.fq")),
        ..Config::default()
    };
    run(&clipped).expect("pipeline run");
    let text = fs::read_to_string(dir.path().join("clipped.fq")).unwrap();
    assert_eq!(text.lines().nth(2), Some("+"));
}
