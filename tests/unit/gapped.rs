//! Gapped searches with a plugged-in aligner.

use std::sync::Arc;

use hspsearch::core::blast_options::{ChunkOptions, SearchOptions};
use hspsearch::core::blast_program::ProgramType;
use hspsearch::core::seq_src::InMemorySeqSrc;
use hspsearch::sequence::Alphabet;
use hspsearch::PrelimSearch;

use crate::helpers::{encoded, encoded_dna, hsp_keys, random_dna, random_protein, subject_with, DiagonalAligner};

fn gapped_options(program: ProgramType) -> SearchOptions {
    let mut options = SearchOptions::for_program(program);
    options.scoring.gapped = true;
    options.hit_saving.evalue_cutoff = 1e-10;
    options
}

fn with_traceback() -> Arc<DiagonalAligner> {
    Arc::new(DiagonalAligner {
        traceback: true,
        shadows: false,
    })
}

#[test]
fn test_gapped_chunks_fuse_into_one_alignment() {
    let query = random_protein(300, 1);
    let subject = subject_with(50_000, 2, &[(9_850, &query[..])]);
    let src = InMemorySeqSrc::from_ascii("big", Alphabet::Protein, vec![("s", subject)]);

    let run = |chunk: ChunkOptions| {
        let mut options = gapped_options(ProgramType::Blastp);
        options.chunk = chunk;
        PrelimSearch::new(options, vec![encoded(&query)])
            .with_aligner(with_traceback())
            .run(&src)
            .into_result()
            .unwrap()
    };
    let whole = run(ChunkOptions::default());
    let chunked = run(ChunkOptions {
        max_chunk: 10_000,
        overlap: 100,
    });
    assert_eq!(hsp_keys(&chunked), hsp_keys(&whole));

    let lists = chunked.hitlist(0).unwrap().hsplists();
    let crossing: Vec<_> = lists[0]
        .hsps()
        .iter()
        .filter(|h| h.subject.offset < 10_050 && h.subject.end > 9_950)
        .collect();
    assert_eq!(crossing.len(), 1);
    let hsp = crossing[0];
    assert_eq!((hsp.query.offset, hsp.query.end), (0, 300));
    assert_eq!((hsp.subject.offset, hsp.subject.end), (9_850, 10_150));
    let script = hsp.edit_script.as_ref().unwrap();
    assert_eq!(script.extent(), (300, 300));
}

#[test]
fn test_gapped_chunk_size_does_not_change_results() {
    let query = random_protein(300, 11);
    let subject = subject_with(
        4_000,
        12,
        &[(150, &query[0..80]), (980, &query[100..190]), (2_430, &query[200..300])],
    );
    let src = InMemorySeqSrc::from_ascii("chunked", Alphabet::Protein, vec![("long", subject)]);

    let run = |max_chunk: usize| {
        let mut options = gapped_options(ProgramType::Blastp);
        options.chunk = ChunkOptions {
            max_chunk,
            overlap: 100,
        };
        let results = PrelimSearch::new(options, vec![encoded(&query)])
            .with_aligner(with_traceback())
            .run(&src)
            .into_result()
            .unwrap();
        hsp_keys(&results)
    };
    let expected = run(10_000);
    assert_eq!(expected.len(), 3);
    for max_chunk in [1_000, 500, 333] {
        assert_eq!(run(max_chunk), expected, "chunk size {max_chunk}");
    }
}

/// A 200 base query copied into the subject with one mismatch at base 100.
fn mismatched_copy() -> (Vec<u8>, InMemorySeqSrc) {
    let query = random_dna(200, 31);
    let mut copy = query.clone();
    copy[100] = if copy[100] == b'A' { b'C' } else { b'A' };
    let mut subject = random_dna(3_000, 32);
    subject[1_000..1_200].copy_from_slice(&copy);
    let src = InMemorySeqSrc::from_ascii("dna", Alphabet::Nucleotide, vec![("s", subject)]);
    (query, src)
}

#[test]
fn test_gapped_blastn_rounds_odd_scores_down() {
    let (query, src) = mismatched_copy();

    let mut ungapped = SearchOptions::for_program(ProgramType::Blastn);
    ungapped.hit_saving.evalue_cutoff = 1e-10;
    let plain = PrelimSearch::new(ungapped, vec![encoded_dna(&query)])
        .run(&src)
        .into_result()
        .unwrap();
    let plain_hsps = plain.hitlist(0).unwrap().hsplists()[0].hsps();
    assert_eq!(plain_hsps.len(), 1);
    // 199 matches at 2, one mismatch at -3
    assert_eq!(plain_hsps[0].score, 395);

    let aligner = Arc::new(DiagonalAligner {
        traceback: false,
        shadows: true,
    });
    let gapped = PrelimSearch::new(gapped_options(ProgramType::Blastn), vec![encoded_dna(&query)])
        .with_aligner(aligner)
        .run(&src)
        .into_result()
        .unwrap();
    let lists = gapped.hitlist(0).unwrap().hsplists();
    assert_eq!(lists.len(), 1);
    let hsps = lists[0].hsps();
    // the weaker copies sharing an endpoint are gone
    assert_eq!(hsps.len(), 1);
    let hsp = &hsps[0];
    assert_eq!(hsp.score, 394);
    assert_eq!((hsp.query.offset, hsp.query.end), (0, 200));
    assert_eq!((hsp.subject.offset, hsp.subject.end), (1_000, 1_200));
    assert!(hsps.iter().all(|h| h.score % 2 == 0));
}

#[test]
fn test_gapped_blastn_without_rounding_for_odd_reward() {
    let (query, src) = mismatched_copy();
    let mut options = gapped_options(ProgramType::Blastn);
    options.scoring.reward = 1;
    options.scoring.penalty = -2;
    options.scoring.gap_open = 2;
    options.scoring.gap_extend = 2;
    let aligner = Arc::new(DiagonalAligner {
        traceback: false,
        shadows: true,
    });
    let results = PrelimSearch::new(options, vec![encoded_dna(&query)])
        .with_aligner(aligner)
        .run(&src)
        .into_result()
        .unwrap();
    let hsps = results.hitlist(0).unwrap().hsplists()[0].hsps();
    assert_eq!(hsps.len(), 1);
    // 199 matches at 1, one mismatch at -2
    assert_eq!(hsps[0].score, 197);
}
