//! HSP list, hit list and result container properties.

use hspsearch::core::blast_hitlist::HitList;
use hspsearch::core::blast_hits::{Capacity, Hsp, HspList, SeqSeg};
use hspsearch::core::blast_results::HspResults;

fn hsp(score: i32, evalue: f64, s_start: usize) -> Hsp {
    let mut hsp = Hsp::new(score, 0, SeqSeg::new(0, 0, 20), SeqSeg::new(0, s_start, s_start + 20));
    hsp.evalue = evalue;
    hsp
}

fn single_hsp_list(oid: usize, evalue: f64) -> HspList {
    let mut list = HspList::new(oid, 0, Capacity::Unbounded);
    list.save_hsp(hsp(100, evalue, 0));
    list
}

/// 1e-1, 1e-2, ... visited in a scrambled order.
fn scrambled_evalues(n: usize) -> Vec<(usize, f64)> {
    (0..n)
        .map(|i| (i * 7 + 3) % n)
        .map(|k| (k, 10f64.powi(-(k as i32) - 1)))
        .collect()
}

#[test]
fn test_hit_list_keeps_the_k_best() {
    for k in [1, 3, 5, 17] {
        let mut hit_list = HitList::new(k);
        let inserted = scrambled_evalues(40);
        for &(oid, evalue) in &inserted {
            hit_list.update(single_hsp_list(oid, evalue));
        }
        assert!(hit_list.len() <= k);

        let mut kept: Vec<usize> = hit_list.hsplists().iter().map(|l| l.oid).collect();
        kept.sort_unstable();
        // smaller e-value for larger oid
        let expected: Vec<usize> = (40 - k..40).collect();
        assert_eq!(kept, expected, "hit list size {k}");
    }
}

#[test]
fn test_hit_list_sorted_best_first() {
    let mut hit_list = HitList::new(4);
    for (oid, evalue) in scrambled_evalues(10) {
        hit_list.update(single_hsp_list(oid, evalue));
    }
    hit_list.sort_by_evalue();
    let evalues: Vec<f64> = hit_list.hsplists().iter().map(|l| l.best_evalue()).collect();
    assert!(evalues.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(hit_list.hsplists()[0].oid, 9);
}

#[test]
fn test_reap_is_monotone() {
    let evalues = [1e-30, 1e-5, 0.01, 0.5, 1.0, 9.99, 10.0, 10.01, 250.0];
    for cutoff in [1e-10, 0.01, 1.0, 10.0, 1000.0] {
        let mut list = HspList::new(0, 0, Capacity::Unbounded);
        for (i, &e) in evalues.iter().enumerate() {
            list.save_hsp(hsp(100 - i as i32, e, i * 30));
        }
        list.reap_by_evalue(cutoff);
        assert!(list.hsps().iter().all(|h| h.evalue <= cutoff));
        let expected = evalues.iter().filter(|&&e| e <= cutoff).count();
        assert_eq!(list.len(), expected, "cutoff {cutoff}");
    }
}

#[test]
fn test_merge_into_empty_list_is_identity() {
    for capacity in [Capacity::Unbounded, Capacity::AtMost(3)] {
        let mut chunk = HspList::new(4, 0, capacity);
        chunk.save_hsp(hsp(90, 1e-9, 500));
        chunk.save_hsp(hsp(70, 1e-6, 100));
        chunk.save_hsp(hsp(50, 1e-3, 900));
        let expected = chunk.clone();

        let mut combined = HspList::new(4, 0, capacity);
        combined.merge_chunk(chunk, 0, 100, true);
        assert_eq!(combined, expected);
    }
}

#[test]
fn test_results_prune_and_trim() {
    let mut results = HspResults::new(2, 10);
    for oid in 0..6 {
        let mut list = HspList::new(oid, oid % 2, Capacity::Unbounded);
        list.save_hsp(hsp(80, 1e-3 / (oid + 1) as f64, 0));
        list.save_hsp(hsp(40, 1e-1, 100));
        results.insert(list).unwrap();
    }
    assert_eq!(results.num_hsplists(), 6);
    results.trim_hsps_per_subject(1);
    assert_eq!(results.total_hsps(), 6);
    results.prune_by_size(2);
    assert_eq!(results.num_hsplists(), 4);
    assert!(results.hitlists().iter().all(|hl| hl.len() == 2));
}
