use clipmerge_rs::merge::{Overlap, build_consensus, find_overlap};
use clipmerge_rs::{MergeOutcome, OverlapSettings, Record, merge, reverse_complement};
use proptest::prelude::*;

const FRAGMENT: &[u8] = b"ACGTTGCAAGGCTTACCGATGACTTGCAGT";

fn high(len: usize) -> Vec<u8> {
    vec![b'I'; len]
}

fn mate(id: &str, seq: &[u8], qual: &[u8]) -> Record {
    Record::new(id, seq, qual)
}

#[test]
fn overlapping_mates_merge_into_fragment() {
    let forward = mate("pair1/1", &FRAGMENT[..20], &high(20));
    let reverse = mate("pair1/2", &reverse_complement(&FRAGMENT[10..]), &high(20));

    let MergeOutcome::Merged { record, overlap } = merge(&forward, &reverse, &OverlapSettings::default()) else {
        panic!("mates should merge");
    };
    assert_eq!(overlap, 10);
    assert_eq!(record.sequence, FRAGMENT);
    assert_eq!(record.quality, high(30));
    assert_eq!(record.id, "pair1/1");
    assert_eq!(record.separator, forward.separator);
}

#[test]
fn overlap_offsets_for_direct_orientation() {
    let seq2 = FRAGMENT[10..].to_vec();
    let found = find_overlap(&FRAGMENT[..20], &seq2, &high(20), &high(20), &OverlapSettings::default());
    assert_eq!(found, Some(Overlap { offset1: 10, offset2: 0 }));
}

#[test]
fn swapped_orientation_is_tried_second() {
    let forward = mate("swap", &FRAGMENT[10..], &high(20));
    let reverse = mate("swap-r", &reverse_complement(&FRAGMENT[..20]), &high(20));

    let MergeOutcome::Merged { record, overlap } = merge(&forward, &reverse, &OverlapSettings::default()) else {
        panic!("mates should merge with roles swapped");
    };
    assert_eq!(overlap, 10);
    assert_eq!(record.sequence, FRAGMENT);
    assert_eq!(record.id, "swap");
}

#[test]
fn longer_reverse_mate_is_shifted() {
    let forward = mate("long", &FRAGMENT[5..20], &high(15));
    let reverse = mate("long-r", &reverse_complement(FRAGMENT), &high(30));

    let MergeOutcome::Merged { record, overlap } = merge(&forward, &reverse, &OverlapSettings::default()) else {
        panic!("mates should merge");
    };
    assert_eq!(overlap, 15);
    assert_eq!(record.sequence, &FRAGMENT[5..]);
}

#[test]
fn unrelated_mates_do_not_merge() {
    let forward = mate("a", &[b'A'; 20], &high(20));
    let reverse = mate("c", &[b'C'; 20], &high(20));
    assert_eq!(merge(&forward, &reverse, &OverlapSettings::default()), MergeOutcome::NotMerged);
}

#[test]
fn overlap_longer_than_read_is_never_found() {
    let settings = OverlapSettings {
        min_overlap: 25,
        ..OverlapSettings::default()
    };
    assert_eq!(find_overlap(&FRAGMENT[..20], &FRAGMENT[..20], &high(20), &high(20), &settings), None);
}

#[test]
fn low_quality_mismatch_tolerated_only_when_quality_aware() {
    let mut forward_seq = FRAGMENT[..20].to_vec();
    forward_seq[15] = b'A';
    let mut forward_qual = high(20);
    forward_qual[15] = b'#';
    let forward = mate("q", &forward_seq, &forward_qual);
    let reverse = mate("q-r", &reverse_complement(&FRAGMENT[10..]), &[b'5'; 20]);

    let MergeOutcome::Merged { record, .. } = merge(&forward, &reverse, &OverlapSettings::default()) else {
        panic!("low-quality mismatch should be ignored");
    };
    // The reverse mate wins the vote at the low-quality position.
    assert_eq!(record.sequence, FRAGMENT);
    assert_eq!(record.quality[15], b'5');

    let strict = OverlapSettings {
        quality_aware: false,
        ..OverlapSettings::default()
    };
    assert_eq!(merge(&forward, &reverse, &strict), MergeOutcome::NotMerged);
}

#[test]
fn consensus_ties_favour_first_sequence() {
    let (seq, qual, len) = build_consensus(
        b"AAAACC",
        b"GGTTTT",
        b"IIIIII",
        b"IIIIII",
        Overlap { offset1: 4, offset2: 0 },
    );
    assert_eq!(len, 2);
    assert_eq!(seq, b"AAAACCTTTT");
    assert_eq!(qual, b"IIIIIIIIII");
}

fn dna(len: std::ops::Range<usize>) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(prop::sample::select(b"ACGTN".to_vec()), len)
}

fn quals(len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(33u8..75, len)
}

#[test]
fn prop_consensus_length_and_bases() {
    proptest!(|(
        (seq1, qual1) in dna(1..60).prop_flat_map(|s| { let n = s.len(); (Just(s), quals(n)) }),
        (seq2, qual2) in dna(1..60).prop_flat_map(|s| { let n = s.len(); (Just(s), quals(n)) }),
        a in 0usize..60,
        b in 0usize..60
    )| {
        let offset1 = a % seq1.len();
        let offset2 = b % seq2.len();
        let overlap = Overlap { offset1, offset2 };
        let (seq, qual, len) = build_consensus(&seq1, &seq2, &qual1, &qual2, overlap);

        let expected_len = (seq1.len() - offset1).min(seq2.len() - offset2);
        prop_assert_eq!(len, expected_len);
        prop_assert_eq!(seq.len(), offset1 + len + (seq2.len() - offset2 - len));
        prop_assert_eq!(seq.len(), qual.len());
        prop_assert_eq!(&seq[..offset1], &seq1[..offset1]);
        for k in 0..len {
            let base = seq[offset1 + k];
            prop_assert!(base == seq1[offset1 + k] || base == seq2[offset2 + k]);
        }
    });
}
