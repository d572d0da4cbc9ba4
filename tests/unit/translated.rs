//! Translated searches: subject frames, query frames and profile search of
//! nucleotide queries.

use hspsearch::core::blast_encoding::encode_protein;
use hspsearch::core::blast_hits::Hsp;
use hspsearch::core::blast_options::{ChunkOptions, LinkParams, SearchOptions};
use hspsearch::core::blast_program::ProgramType;
use hspsearch::core::rps_files::{RpsDatabase, RpsParams};
use hspsearch::core::seq_src::InMemorySeqSrc;
use hspsearch::sequence::Alphabet;
use hspsearch::PrelimSearch;

use crate::helpers::{back_translate, encoded, encoded_dna, hsp_keys, random_dna, random_protein, reverse_complement};

const CHUNK: ChunkOptions = ChunkOptions {
    max_chunk: 3_000,
    overlap: 100,
};

/// Subject whose minus strand reads, in frame -1, 2950 random codons and
/// then `coding`.
fn minus_strand_subject(coding: &[u8], seed: u64) -> Vec<u8> {
    let mut minus = random_dna(3 * 2_950, seed);
    minus.extend_from_slice(coding);
    minus.extend(random_dna(9_000, seed + 1));
    reverse_complement(&minus)
}

fn on_frame(hsps: &[Hsp], frame: i8) -> Vec<&Hsp> {
    hsps.iter().filter(|h| h.subject.frame == frame).collect()
}

#[test]
fn test_tblastn_links_minus_frame_hits_across_chunks() {
    let query = random_protein(160, 41);
    let mut coding = back_translate(&query[..80]);
    // ten tryptophans keep the two pieces on separate diagonals
    coding.extend_from_slice(&b"TGG".repeat(10));
    coding.extend(back_translate(&query[80..]));
    let subject = minus_strand_subject(&coding, 42);
    let src = InMemorySeqSrc::from_ascii("dna", Alphabet::Nucleotide, vec![("s", subject)]);

    let mut options = SearchOptions::for_program(ProgramType::Tblastn);
    options.hit_saving.evalue_cutoff = 1e-10;
    options.link = Some(LinkParams::ungapped());
    options.chunk = CHUNK;
    let results = PrelimSearch::new(options, vec![encoded(&query)])
        .run(&src)
        .into_result()
        .unwrap();

    let lists = results.hitlist(0).unwrap().hsplists();
    assert_eq!(lists.len(), 1);
    let hsps = on_frame(lists[0].hsps(), -1);
    assert_eq!(hsps.len(), 2);
    let (first, second) = if hsps[0].query.offset == 0 {
        (hsps[0], hsps[1])
    } else {
        (hsps[1], hsps[0])
    };
    // the first piece straddles the chunk boundary at 3000 and stays whole
    assert_eq!((first.query.offset, first.subject.offset), (0, 2_950));
    assert!(first.query.end >= 80 && first.subject.end >= 3_030);
    assert_eq!(second.query.end, 160);
    assert_eq!(second.subject.end, 3_120);
    assert_eq!((first.num, second.num), (2, 2));
    assert_eq!(first.evalue, second.evalue);
    assert!(first.evalue < 1e-10);
}

#[test]
fn test_tblastx_chunked_matches_whole_subject() {
    let protein = random_protein(120, 51);
    let coding = back_translate(&protein);
    let subject = minus_strand_subject(&coding, 52);
    let src = InMemorySeqSrc::from_ascii("dna", Alphabet::Nucleotide, vec![("s", subject)]);

    let run = |chunk: ChunkOptions| {
        let mut options = SearchOptions::for_program(ProgramType::Tblastx);
        options.hit_saving.evalue_cutoff = 1e-10;
        options.chunk = chunk;
        PrelimSearch::new(options, vec![encoded_dna(&coding)])
            .run(&src)
            .into_result()
            .unwrap()
    };
    let whole = run(ChunkOptions::default());
    let chunked = run(CHUNK);
    assert!(!hsp_keys(&whole).is_empty());
    assert_eq!(hsp_keys(&chunked), hsp_keys(&whole));

    let lists = chunked.hitlist(0).unwrap().hsplists();
    let direct: Vec<&Hsp> = lists[0]
        .hsps()
        .iter()
        .filter(|h| h.query.frame == 1 && h.subject.frame == -1)
        .collect();
    assert_eq!(direct.len(), 1);
    let hsp = direct[0];
    assert_eq!((hsp.query.offset, hsp.query.end), (0, 120));
    assert_eq!((hsp.subject.offset, hsp.subject.end), (2_950, 3_070));
    assert!(lists[0].hsps().iter().all(|h| h.is_linked()));
}

fn rps_database() -> RpsDatabase {
    let profiles: Vec<_> = [b"MKWVTFISLLFLFSSAYSRG", b"GHPWMKCYFEDWHRKMQTNL"]
        .iter()
        .map(|seq| {
            encode_protein(*seq)
                .into_iter()
                .map(|r| {
                    let mut row = [-2; hspsearch::core::blast_encoding::BLASTAA_SIZE];
                    row[r as usize] = 6;
                    row
                })
                .collect::<Vec<_>>()
        })
        .collect();
    let params = RpsParams {
        matrix_name: "BLOSUM62".to_string(),
        gap_open: 11,
        gap_extend: 1,
        ungapped_k: 0.13,
        ungapped_h: 0.4,
        max_db_seq_length: 20,
        db_length: 40,
        scale_factor: 1.0,
        karlin_k: vec![0.1; 2],
    };
    RpsDatabase::build(&profiles, params, 3, 11).unwrap()
}

#[test]
fn test_rpstblastn_finds_profile_on_minus_frame() {
    let db = rps_database();
    let mut minus = random_dna(30, 61);
    minus.extend(back_translate(b"GHPWMKCYFEDWHRKMQTNL"));
    minus.extend(random_dna(30, 62));
    let query = reverse_complement(&minus);

    let options = SearchOptions::for_program(ProgramType::RpsTblastn);
    let outcome = PrelimSearch::new(options, vec![encoded_dna(&query)]).run_rps(&db);
    assert!(outcome.summary.is_success());

    let lists = outcome.results.hitlist(0).unwrap().hsplists();
    assert_eq!(lists[0].oid, 1);
    let best = &lists[0].hsps()[0];
    assert_eq!(best.query.frame, -1);
    assert_eq!((best.query.offset, best.query.end), (10, 30));
    assert_eq!((best.subject.offset, best.subject.end), (0, 20));
    assert!(best.evalue.is_finite() && best.evalue < 1e-5);
}
