use hspsearch::core::blast_encoding::{encode_protein, BLASTAA_SIZE};
use hspsearch::core::blast_options::SearchOptions;
use hspsearch::core::blast_program::ProgramType;
use hspsearch::core::rps_files::{RpsDatabase, RpsParams};
use hspsearch::error::{STATUS_INCOMPATIBLE_PLATFORM, STATUS_MALFORMED_RPS};
use hspsearch::PrelimSearch;

const PROFILES: [&[u8]; 3] = [
    b"MKWVTFISLLFLFSSAYSRG",
    b"GHPWMKCYFEDWHRKMQTNL",
    b"QRSTVWYACDEFGHIKLMNP",
];

fn profile(seq: &[u8]) -> Vec<[i32; BLASTAA_SIZE]> {
    encode_protein(seq)
        .into_iter()
        .map(|r| {
            let mut row = [-2; BLASTAA_SIZE];
            row[r as usize] = 6;
            row
        })
        .collect()
}

fn database() -> RpsDatabase {
    let params = RpsParams {
        matrix_name: "BLOSUM62".to_string(),
        gap_open: 11,
        gap_extend: 1,
        ungapped_k: 0.13,
        ungapped_h: 0.4,
        max_db_seq_length: 20,
        db_length: 60,
        scale_factor: 1.0,
        karlin_k: vec![0.1; PROFILES.len()],
    };
    let profiles: Vec<_> = PROFILES.iter().map(|p| profile(p)).collect();
    RpsDatabase::build(&profiles, params, 3, 11).unwrap()
}

#[test]
fn test_search_against_written_database() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("profiles");
    let paths = database().write(&base).unwrap();
    assert!(paths.lookup.exists() && paths.pssm.exists() && paths.params.exists());

    let db = RpsDatabase::open(&base).unwrap();
    let queries = vec![
        encode_protein(b"PPPPQRSTVWYACDEFGHIKLMNPPPPP"),
        encode_protein(b"WWWWGHPWMKCYFEDWHRKMQTNLWWWW"),
    ];
    let options = SearchOptions::for_program(ProgramType::RpsBlast);
    let outcome = PrelimSearch::new(options, queries).run_rps(&db);
    assert!(outcome.summary.is_success());

    for (query_index, oid) in [(0, 2), (1, 1)] {
        let lists = outcome.results.hitlist(query_index).unwrap().hsplists();
        assert_eq!(lists[0].oid, oid, "query {query_index}");
        let best = &lists[0].hsps()[0];
        assert_eq!((best.subject.offset, best.subject.end), (0, 20));
        assert!(best.evalue.is_finite() && best.evalue < 1e-5);
        assert!(best.bit_score > 0.0);
    }
}

#[test]
fn test_lookup_from_other_byte_order_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("swapped");
    let paths = database().write(&base).unwrap();

    let mut bytes = std::fs::read(&paths.lookup).unwrap();
    bytes[0..4].reverse();
    std::fs::write(&paths.lookup, bytes).unwrap();

    let err = RpsDatabase::open(&base).unwrap_err();
    assert_eq!(err.status(), STATUS_INCOMPATIBLE_PLATFORM);
}

#[test]
fn test_truncated_profile_file_is_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("short");
    let paths = database().write(&base).unwrap();

    let bytes = std::fs::read(&paths.pssm).unwrap();
    std::fs::write(&paths.pssm, &bytes[..6]).unwrap();

    let err = RpsDatabase::open(&base).unwrap_err();
    assert_eq!(err.status(), STATUS_MALFORMED_RPS);
}
