//! Full searches through `PrelimSearch`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hspsearch::core::blast_options::{ChunkOptions, SearchOptions, StreamMode};
use hspsearch::core::blast_program::ProgramType;
use hspsearch::core::seq_src::InMemorySeqSrc;
use hspsearch::error::STATUS_INTERRUPTED;
use hspsearch::sequence::Alphabet;
use hspsearch::PrelimSearch;

use crate::helpers::{encoded, hsp_keys, random_protein, subject_with};

fn strict_options() -> SearchOptions {
    let mut options = SearchOptions::for_program(ProgramType::Blastp);
    options.hit_saving.evalue_cutoff = 1e-10;
    options
}

fn chunked_database(query: &[u8]) -> InMemorySeqSrc {
    let subjects = vec![
        (
            "long",
            subject_with(
                4_000,
                12,
                &[
                    (150, &query[0..80]),
                    (980, &query[100..190]),
                    (2_430, &query[200..300]),
                    (3_500, &query[40..120]),
                ],
            ),
        ),
        ("short", subject_with(700, 13, &[(300, &query[150..260])])),
    ];
    InMemorySeqSrc::from_ascii("chunked", Alphabet::Protein, subjects)
}

#[test]
fn test_chunk_size_does_not_change_results() {
    let query = random_protein(300, 11);
    let src = chunked_database(&query);

    let baseline = PrelimSearch::new(strict_options(), vec![encoded(&query)])
        .run(&src)
        .into_result()
        .unwrap();
    let expected = hsp_keys(&baseline);
    assert_eq!(expected.len(), 5);

    for max_chunk in [1_000, 777, 500, 333] {
        let mut options = strict_options();
        options.chunk = ChunkOptions {
            max_chunk,
            overlap: 100,
        };
        let results = PrelimSearch::new(options, vec![encoded(&query)])
            .run(&src)
            .into_result()
            .unwrap();
        assert_eq!(hsp_keys(&results), expected, "chunk size {max_chunk}");
    }
}

#[test]
fn test_alignment_across_chunk_boundary_stays_whole() {
    let query = random_protein(300, 1);
    let subject = subject_with(50_000, 2, &[(9_850, &query[..])]);
    let src = InMemorySeqSrc::from_ascii("big", Alphabet::Protein, vec![("s", subject)]);

    let mut options = strict_options();
    options.chunk = ChunkOptions {
        max_chunk: 10_000,
        overlap: 100,
    };
    let results = PrelimSearch::new(options, vec![encoded(&query)])
        .run(&src)
        .into_result()
        .unwrap();

    let lists = results.hitlist(0).unwrap().hsplists();
    assert_eq!(lists.len(), 1);
    let crossing: Vec<_> = lists[0]
        .hsps()
        .iter()
        .filter(|h| h.subject.offset < 10_050 && h.subject.end > 9_950)
        .collect();
    assert_eq!(crossing.len(), 1);
    let hsp = crossing[0];
    assert_eq!((hsp.query.offset, hsp.query.end), (0, 300));
    assert_eq!((hsp.subject.offset, hsp.subject.end), (9_850, 10_150));
}

fn threaded_database(queries: &[Vec<u8>]) -> InMemorySeqSrc {
    let subjects: Vec<(String, Vec<u8>)> = (0..12)
        .map(|i| {
            let query = &queries[i % queries.len()];
            let start = (i * 17) % 150;
            let piece = &query[start..start + 60 + i * 5];
            (format!("s{i}"), subject_with(600, 100 + i as u64, &[(200 + i * 10, piece)]))
        })
        .collect();
    InMemorySeqSrc::from_ascii("threads", Alphabet::Protein, subjects)
}

#[test]
fn test_thread_count_does_not_change_results() {
    let queries = vec![random_protein(250, 21), random_protein(250, 22)];
    let encoded_queries: Vec<Vec<u8>> = queries.iter().map(|q| encoded(q)).collect();
    let src = threaded_database(&queries);

    let run = |num_threads: usize, stream: StreamMode| {
        let mut options = strict_options();
        options.num_threads = num_threads;
        options.stream = stream;
        let outcome = PrelimSearch::new(options, encoded_queries.clone()).run(&src);
        assert!(outcome.summary.is_success());
        assert_eq!(outcome.summary.diagnostics.subjects_searched, 12);
        hsp_keys(&outcome.results)
    };

    let single = run(1, StreamMode::Sorted);
    assert_eq!(single.len(), 12);
    assert_eq!(run(4, StreamMode::Sorted), single);
    assert_eq!(run(4, StreamMode::Fifo { capacity: 2 }), single);
}

#[test]
fn test_interrupt_before_any_subject() {
    let query = random_protein(250, 21);
    let src = threaded_database(&[query.clone()]);
    let outcome = PrelimSearch::new(strict_options(), vec![encoded(&query)])
        .with_interrupt(|_| true)
        .run(&src);
    assert_eq!(outcome.summary.status, STATUS_INTERRUPTED);
    assert_eq!(outcome.results.num_hsplists(), 0);
}

#[test]
fn test_interrupt_keeps_only_finished_subjects() {
    let query = random_protein(250, 21);
    let src = threaded_database(&[query.clone()]);
    let progress_calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&progress_calls);
    let mut options = strict_options();
    options.num_threads = 1;
    let outcome = PrelimSearch::new(options, vec![encoded(&query)])
        .with_interrupt(|p| p.done >= 3)
        .with_progress(move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        })
        .run(&src);
    assert!(outcome.summary.is_interrupted());
    assert_eq!(progress_calls.load(Ordering::Relaxed), 3);
    assert_eq!(outcome.summary.diagnostics.subjects_searched, 3);
    assert!(outcome.results.iter().all(|(_, list)| list.oid < 3));
    assert_eq!(outcome.results.num_hsplists(), 3);
}

#[test]
fn test_formatter_output_matches_collected_results() {
    let query = random_protein(250, 21);
    let src = threaded_database(&[query.clone()]);
    let mut formatted = Vec::new();
    let mut options = strict_options();
    options.num_threads = 3;
    options.stream = StreamMode::Fifo { capacity: 1 };
    let outcome = PrelimSearch::new(options, vec![encoded(&query)])
        .run_with_formatter(&src, |list| {
            formatted.push((list.oid, list.len()));
            Ok(())
        });
    assert!(outcome.summary.is_success());
    formatted.sort_unstable();
    let mut collected: Vec<(usize, usize)> =
        outcome.results.iter().map(|(_, l)| (l.oid, l.len())).collect();
    collected.sort_unstable();
    assert_eq!(formatted, collected);
}
