//! Re-scoring of finished HSPs against the actual residues.
//!
//! Extension scores nucleotides on their two low bits, so ambiguity codes
//! look like ordinary bases there. Here every HSP is scored again with the
//! full matrix; ungapped HSPs shrink to their best-scoring piece and any HSP
//! falling below the cutoff is removed.

use super::blast_hits::{GapEditOp, Hsp, HspList};
use super::blast_stat::ScoreBlock;
use super::query_info::QueryInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReevaluateParams {
    pub cutoff: i32,
    pub gap_open: i32,
    pub gap_extend: i32,
    pub nucleotide: bool,
}

struct Residues<'a> {
    query: &'a [u8],
    subject: &'a [u8],
    sbp: &'a ScoreBlock,
    nucleotide: bool,
}

impl Residues<'_> {
    /// Score of query position `q` (absolute) against frame position `s`.
    #[inline]
    fn score(&self, q: usize, s: usize) -> i32 {
        let (q_res, s_res) = (self.query[q], self.subject[s]);
        if self.nucleotide {
            self.sbp.matrix().score(q_res, s_res)
        } else {
            self.sbp.score(q_res, s, s_res)
        }
    }

    #[inline]
    fn identical(&self, q: usize, s: usize) -> bool {
        let (q_res, s_res) = (self.query[q], self.subject[s]);
        q_res == s_res && (!self.nucleotide || q_res < 4)
    }
}

/// Re-score every HSP of `list` against the query block and the subject
/// frame sequence it was found in. Returns how many HSPs were removed.
pub fn reevaluate_hsp_list(
    list: &mut HspList,
    query: &[u8],
    info: &QueryInfo,
    subject: &[u8],
    sbp: &ScoreBlock,
    params: &ReevaluateParams,
) -> usize {
    let residues = Residues {
        query,
        subject,
        sbp,
        nucleotide: params.nucleotide,
    };
    let before = list.len();
    let keep: Vec<bool> = list
        .hsps_mut()
        .iter_mut()
        .map(|hsp| {
            let base = info.context(hsp.context).query_offset;
            let rescored = match hsp.edit_script {
                Some(_) => rescore_gapped(hsp, base, &residues, params),
                None if hsp.pattern.is_some() => rescore_whole(hsp, base, &residues),
                None => trim_ungapped(hsp, base, &residues, params.cutoff),
            };
            rescored && hsp.score >= params.cutoff
        })
        .collect();
    let mut keep = keep.into_iter();
    list.retain(|_| keep.next().unwrap_or(false));
    list.sort_by_score();
    before - list.len()
}

/// Shrink an ungapped HSP to its best-scoring piece. Pieces scoring below
/// the cutoff are never kept in favor of a later piece.
fn trim_ungapped(hsp: &mut Hsp, base: usize, r: &Residues<'_>, cutoff: i32) -> bool {
    let q0 = base + hsp.query.offset;
    let s0 = hsp.subject.offset;
    let len = hsp.query.len().min(hsp.subject.len());

    let mut sum = 0;
    let mut score = 0;
    let mut current_start = 0;
    let (mut best_start, mut best_end) = (0, 0);
    for i in 0..len {
        sum += r.score(q0 + i, s0 + i);
        if sum < 0 {
            sum = 0;
            current_start = i + 1;
            if score < cutoff {
                best_start = i + 1;
                best_end = i + 1;
                score = 0;
            }
        } else if sum > score {
            score = sum;
            best_start = current_start;
            best_end = i + 1;
        }
    }
    if score < cutoff || best_end == best_start {
        return false;
    }

    let q_offset = hsp.query.offset;
    hsp.query.offset = q_offset + best_start;
    hsp.query.end = q_offset + best_end;
    hsp.subject.offset = s0 + best_start;
    hsp.subject.end = s0 + best_end;
    hsp.query.gapped_start = hsp.query.gapped_start.clamp(hsp.query.offset, hsp.query.end - 1);
    hsp.subject.gapped_start = hsp.subject.gapped_start.clamp(hsp.subject.offset, hsp.subject.end - 1);
    hsp.score = score;
    hsp.num_ident = (best_start..best_end).filter(|&i| r.identical(q0 + i, s0 + i)).count();
    true
}

/// Score an ungapped HSP over its full span (pattern hits keep the pattern).
fn rescore_whole(hsp: &mut Hsp, base: usize, r: &Residues<'_>) -> bool {
    let q0 = base + hsp.query.offset;
    let s0 = hsp.subject.offset;
    let len = hsp.query.len().min(hsp.subject.len());
    hsp.score = (0..len).map(|i| r.score(q0 + i, s0 + i)).sum();
    hsp.num_ident = (0..len).filter(|&i| r.identical(q0 + i, s0 + i)).count();
    true
}

fn rescore_gapped(hsp: &mut Hsp, base: usize, r: &Residues<'_>, params: &ReevaluateParams) -> bool {
    let Some(script) = &hsp.edit_script else {
        return false;
    };
    let (mut q, mut s) = (base + hsp.query.offset, hsp.subject.offset);
    let mut score = 0;
    let mut ident = 0;
    for op in script.ops() {
        match *op {
            GapEditOp::Sub(n) => {
                for i in 0..n {
                    score += r.score(q + i, s + i);
                    ident += usize::from(r.identical(q + i, s + i));
                }
                q += n;
                s += n;
            }
            GapEditOp::Del(n) => {
                score -= params.gap_open + params.gap_extend * n as i32;
                s += n;
            }
            GapEditOp::Ins(n) => {
                score -= params.gap_open + params.gap_extend * n as i32;
                q += n;
            }
        }
    }
    hsp.score = score;
    hsp.num_ident = ident;
    true
}
