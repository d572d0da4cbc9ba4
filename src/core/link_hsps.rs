//! E-values for the HSPs of one subject.
//!
//! Without link parameters every HSP gets its own Karlin-Altschul e-value.
//! With them, HSPs of one query context and subject frame that follow each
//! other on both sequences are chained, and every chain member shares the
//! large-gap sum-statistics e-value of the chain.

use std::collections::BTreeMap;

use super::blast_hits::{Hsp, HspList};
use super::blast_options::LinkParams;
use super::blast_stat::{KarlinBlk, ScoreBlock};
use super::query_info::QueryInfo;
use crate::stats::{gap_decay_divisor, large_gap_sum_e, normalize_score};

/// Turns raw scores of one subject's HSPs into bit scores and e-values.
pub trait HspStatistics: Send + Sync {
    /// `subject_length` is the length of the searched subject frame.
    fn calculate(&self, list: &mut HspList, info: &QueryInfo, sbp: &ScoreBlock, subject_length: usize);
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct KarlinStatistics {
    link: Option<LinkParams>,
}

impl KarlinStatistics {
    pub fn new(link: Option<LinkParams>) -> Self {
        KarlinStatistics { link }
    }

    fn independent(&self, list: &mut HspList, info: &QueryInfo, sbp: &ScoreBlock, subject_length: usize) {
        for hsp in list.hsps_mut() {
            let Some(kbp) = sbp.kbp(hsp.context) else {
                continue;
            };
            let searchsp = search_space(info, hsp.context, subject_length);
            hsp.evalue = kbp.evalue(hsp.score, searchsp);
            hsp.bit_score = kbp.bit_score(hsp.score);
        }
    }

    fn linked(
        &self,
        link: &LinkParams,
        list: &mut HspList,
        info: &QueryInfo,
        sbp: &ScoreBlock,
        subject_length: usize,
    ) {
        let mut groups: BTreeMap<(usize, i8), Vec<usize>> = BTreeMap::new();
        for (i, hsp) in list.hsps().iter().enumerate() {
            groups.entry((hsp.context, hsp.subject.frame)).or_default().push(i);
        }

        let hsps = list.hsps_mut();
        for ((context, _), mut members) in groups {
            let Some(kbp) = sbp.kbp(context) else {
                continue;
            };
            members.sort_by_key(|&i| (hsps[i].query.offset, hsps[i].subject.offset));
            let query_length = info.context(context).query_length as f64;
            let searchsp = search_space(info, context, subject_length);

            while !members.is_empty() {
                let chain = best_chain(hsps, &members, kbp, link.overlap_size);
                let xsum: f64 = chain
                    .iter()
                    .map(|&i| normalize_score(hsps[i].score, kbp.lambda, kbp.log_k))
                    .sum();
                let n = chain.len();
                let mut evalue = large_gap_sum_e(
                    n as u32,
                    xsum,
                    query_length,
                    subject_length as f64,
                    searchsp,
                    gap_decay_divisor(link.gap_decay_rate, n),
                );
                if link.gap_prob > 0.0 && link.gap_prob < 1.0 {
                    evalue /= 1.0 - link.gap_prob;
                }
                for &i in &chain {
                    let hsp = &mut hsps[i];
                    hsp.evalue = evalue;
                    hsp.bit_score = kbp.bit_score(hsp.score);
                    hsp.num = n;
                }
                members.retain(|i| !chain.contains(i));
            }
        }
    }
}

impl HspStatistics for KarlinStatistics {
    fn calculate(&self, list: &mut HspList, info: &QueryInfo, sbp: &ScoreBlock, subject_length: usize) {
        match &self.link {
            Some(link) => self.linked(link, list, info, sbp, subject_length),
            None => self.independent(list, info, sbp, subject_length),
        }
        list.update_best_evalue();
    }
}

fn search_space(info: &QueryInfo, context: usize, subject_length: usize) -> f64 {
    let ctx = info.context(context);
    if ctx.eff_searchsp > 0.0 {
        ctx.eff_searchsp
    } else {
        ctx.query_length as f64 * subject_length as f64
    }
}

/// Whether `b` may follow `a` in a chain.
fn follows(a: &Hsp, b: &Hsp, overlap: usize) -> bool {
    a.query.offset < b.query.offset
        && a.subject.offset < b.subject.offset
        && a.query.end <= b.query.offset + overlap
        && a.subject.end <= b.subject.offset + overlap
}

/// Highest-scoring chain among `members` (sorted by query start), in
/// chain order.
fn best_chain(hsps: &[Hsp], members: &[usize], kbp: &KarlinBlk, overlap: usize) -> Vec<usize> {
    let n = members.len();
    let mut best = vec![0.0f64; n];
    let mut prev: Vec<Option<usize>> = vec![None; n];
    for i in 0..n {
        let hi = &hsps[members[i]];
        let own = normalize_score(hi.score, kbp.lambda, kbp.log_k);
        best[i] = own;
        for j in 0..i {
            if best[j] + own > best[i] && follows(&hsps[members[j]], hi, overlap) {
                best[i] = best[j] + own;
                prev[i] = Some(j);
            }
        }
    }
    let mut end = 0;
    for i in 1..n {
        if best[i] > best[end] {
            end = i;
        }
    }
    let mut chain = vec![members[end]];
    let mut cursor = prev[end];
    while let Some(j) = cursor {
        chain.push(members[j]);
        cursor = prev[j];
    }
    chain.reverse();
    chain
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::blast_encoding::encode_protein;
    use crate::core::blast_hits::{Capacity, SeqSeg};
    use crate::core::blast_options::ScoringOptions;
    use crate::core::blast_program::ProgramType;
    use crate::core::gencode_singleton::GeneticCode;
    use crate::core::query_info::build_query_block;

    fn setup() -> (QueryInfo, ScoreBlock) {
        let program = ProgramType::Blastp;
        let query = encode_protein(&[b'A'; 200]);
        let (_, mut info) = build_query_block(program, &[query], &GeneticCode::standard()).unwrap();
        let sbp = ScoreBlock::new(program, &ScoringOptions::for_program(program), 1).unwrap();
        info.set_search_spaces(sbp.kbps(), 100_000, 100);
        (info, sbp)
    }

    fn hsp(score: i32, q: usize, s: usize, len: usize) -> Hsp {
        Hsp::new(score, 0, SeqSeg::new(0, q, q + len), SeqSeg::new(0, s, s + len))
    }

    #[test]
    fn test_independent_evalues() {
        let (info, sbp) = setup();
        let mut list = HspList::new(0, 0, Capacity::Unbounded);
        list.save_hsp(hsp(60, 0, 0, 30));
        list.save_hsp(hsp(30, 50, 50, 20));
        KarlinStatistics::new(None).calculate(&mut list, &info, &sbp, 1000);
        let kbp = sbp.kbp(0).unwrap();
        let searchsp = info.context(0).eff_searchsp;
        assert_eq!(list.hsps()[0].evalue, kbp.evalue(60, searchsp));
        assert!(list.hsps()[0].evalue < list.hsps()[1].evalue);
        assert_eq!(list.best_evalue(), list.hsps()[0].evalue);
        assert!(list.hsps().iter().all(|h| !h.is_linked()));
    }

    #[test]
    fn test_colinear_hsps_share_one_evalue() {
        let (info, sbp) = setup();
        let mut list = HspList::new(0, 0, Capacity::Unbounded);
        list.save_hsp(hsp(40, 0, 100, 30));
        list.save_hsp(hsp(40, 40, 150, 30));
        // crosses the other two, so it cannot join their chain
        list.save_hsp(hsp(25, 100, 10, 20));
        KarlinStatistics::new(Some(LinkParams::ungapped())).calculate(&mut list, &info, &sbp, 1000);
        let h = list.hsps();
        assert_eq!((h[0].num, h[1].num, h[2].num), (2, 2, 1));
        assert_eq!(h[0].evalue, h[1].evalue);
        assert!(h[0].evalue < h[2].evalue);
    }
}
