//! Scoring matrices, position-specific profiles and Karlin-Altschul blocks.
//!
//! The arithmetic here is deliberately small: ideal parameters come from
//! precomputed tables keyed by scoring scheme, and the effective search space
//! uses the classic length-adjustment fixed point.

use std::sync::Arc;

use super::blast_encoding::{BLASTAA_SIZE, BLASTNA_SIZE, NUCLEOTIDE_SENTINEL};
use super::blast_options::ScoringOptions;
use super::blast_program::ProgramType;
use crate::error::{Result, SearchError};

/// Score used for the sentinel row/column of protein matrices.
pub const DEFSCORE: i32 = -4;
/// Score of a profile boundary row; terminates any extension.
pub const SENTINEL_SCORE: i32 = -(1 << 20);

const BLOSUM62_SIZE: usize = 25;

/// NCBIstdaa code to BLOSUM62 row (`ARNDCQEGHILKMFPSTWYVBJZX*`).
const NCBISTDAA_TO_BLOSUM62: [usize; BLASTAA_SIZE] = [
    23, 0, 20, 4, 3, 6, 13, 7, 8, 9, 11, 10, 12, 2, 14, 5, 1, 15, 16, 19, 17, 23, 18, 22, 23, 24,
    23, 21,
];

#[rustfmt::skip]
static BLOSUM62: [i8; BLOSUM62_SIZE * BLOSUM62_SIZE] = [
     4, -1, -2, -2,  0, -1, -1,  0, -2, -1, -1, -1, -1, -2, -1,  1,  0, -3, -2,  0, -2, -1, -1, -1, -4,
    -1,  5,  0, -2, -3,  1,  0, -2,  0, -3, -2,  2, -1, -3, -2, -1, -1, -3, -2, -3, -1, -2,  0, -1, -4,
    -2,  0,  6,  1, -3,  0,  0,  0,  1, -3, -3,  0, -2, -3, -2,  1,  0, -4, -2, -3,  4, -3,  0, -1, -4,
    -2, -2,  1,  6, -3,  0,  2, -1, -1, -3, -4, -1, -3, -3, -1,  0, -1, -4, -3, -3,  4, -3,  1, -1, -4,
     0, -3, -3, -3,  9, -3, -4, -3, -3, -1, -1, -3, -1, -2, -3, -1, -1, -2, -2, -1, -3, -1, -3, -1, -4,
    -1,  1,  0,  0, -3,  5,  2, -2,  0, -3, -2,  1,  0, -3, -1,  0, -1, -2, -1, -2,  0, -2,  4, -1, -4,
    -1,  0,  0,  2, -4,  2,  5, -2,  0, -3, -3,  1, -2, -3, -1,  0, -1, -3, -2, -2,  1, -3,  4, -1, -4,
     0, -2,  0, -1, -3, -2, -2,  6, -2, -4, -4, -2, -3, -3, -2,  0, -2, -2, -3, -3, -1, -4, -2, -1, -4,
    -2,  0,  1, -1, -3,  0,  0, -2,  8, -3, -3, -1, -2, -1, -2, -1, -2, -2,  2, -3,  0, -3,  0, -1, -4,
    -1, -3, -3, -3, -1, -3, -3, -4, -3,  4,  2, -3,  1,  0, -3, -2, -1, -3, -1,  3, -3,  3, -3, -1, -4,
    -1, -2, -3, -4, -1, -2, -3, -4, -3,  2,  4, -2,  2,  0, -3, -2, -1, -2, -1,  1, -4,  3, -3, -1, -4,
    -1,  2,  0, -1, -3,  1,  1, -2, -1, -3, -2,  5, -1, -3, -1,  0, -1, -3, -2, -2,  0, -3,  1, -1, -4,
    -1, -1, -2, -3, -1,  0, -2, -3, -2,  1,  2, -1,  5,  0, -2, -1, -1, -1, -1,  1, -3,  2, -1, -1, -4,
    -2, -3, -3, -3, -2, -3, -3, -3, -1,  0,  0, -3,  0,  6, -4, -2, -2,  1,  3, -1, -3,  0, -3, -1, -4,
    -1, -2, -2, -1, -3, -1, -1, -2, -2, -3, -3, -1, -2, -4,  7, -1, -1, -4, -3, -2, -2, -3, -1, -1, -4,
     1, -1,  1,  0, -1,  0,  0,  0, -1, -2, -2,  0, -1, -2, -1,  4,  1, -3, -2, -2,  0, -2,  0, -1, -4,
     0, -1,  0, -1, -1, -1, -1, -2, -2, -1, -1, -1, -1, -2, -1,  1,  5, -2, -2,  0, -1, -1, -1, -1, -4,
    -3, -3, -4, -4, -2, -2, -3, -2, -2, -3, -2, -3, -1,  1, -4, -3, -2, 11,  2, -3, -4, -2, -2, -1, -4,
    -2, -2, -2, -3, -2, -1, -2, -3,  2, -1, -1, -2, -1,  3, -3, -2, -2,  2,  7, -1, -3, -1, -2, -1, -4,
     0, -3, -3, -3, -1, -2, -2, -3, -3,  3,  1, -2,  1, -1, -2, -2,  0, -3, -1,  4, -3,  2, -2, -1, -4,
    -2, -1,  4,  4, -3,  0,  1, -1,  0, -3, -4,  0, -3, -3, -2,  0, -1, -4, -3, -3,  4, -3,  0, -1, -4,
    -1, -2, -3, -3, -1, -2, -3, -4, -3,  3,  3, -3,  2,  0, -3, -2, -1, -2, -1,  2, -3,  3, -3, -1, -4,
    -1,  0,  0,  1, -3,  4,  4, -2,  0, -3, -3,  1, -1, -3, -1,  0, -1, -2, -2, -2,  0, -3,  4, -1, -4,
    -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -4,
    -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4,  1,
];

/// Square substitution matrix over an encoded alphabet.
#[derive(Debug, Clone)]
pub struct ScoreMatrix {
    name: String,
    size: usize,
    scores: Vec<i32>,
}

impl ScoreMatrix {
    /// BLOSUM62 laid out over NCBIstdaa codes. The gap/sentinel code scores
    /// `DEFSCORE` against everything.
    pub fn blosum62() -> Self {
        let mut scores = vec![DEFSCORE; BLASTAA_SIZE * BLASTAA_SIZE];
        for a in 1..BLASTAA_SIZE {
            for b in 1..BLASTAA_SIZE {
                let ra = NCBISTDAA_TO_BLOSUM62[a];
                let rb = NCBISTDAA_TO_BLOSUM62[b];
                scores[a * BLASTAA_SIZE + b] = BLOSUM62[ra * BLOSUM62_SIZE + rb] as i32;
            }
        }
        ScoreMatrix {
            name: "BLOSUM62".to_string(),
            size: BLASTAA_SIZE,
            scores,
        }
    }

    /// Reward/penalty matrix over BLASTNA codes. Ambiguity codes score as a
    /// mismatch; the sentinel scores `SENTINEL_SCORE`.
    pub fn nucleotide(reward: i32, penalty: i32) -> Self {
        let mut scores = vec![penalty; BLASTNA_SIZE * BLASTNA_SIZE];
        for a in 0..BLASTNA_SIZE {
            for b in 0..BLASTNA_SIZE {
                let s = if a as u8 == NUCLEOTIDE_SENTINEL || b as u8 == NUCLEOTIDE_SENTINEL {
                    SENTINEL_SCORE
                } else if a < 4 && b < 4 && a == b {
                    reward
                } else {
                    penalty
                };
                scores[a * BLASTNA_SIZE + b] = s;
            }
        }
        ScoreMatrix {
            name: format!("reward{reward}/penalty{penalty}"),
            size: BLASTNA_SIZE,
            scores,
        }
    }

    pub fn from_options(program: ProgramType, options: &ScoringOptions) -> Result<Self> {
        if program.is_nucleotide_search() {
            return Ok(Self::nucleotide(options.reward, options.penalty));
        }
        match options.matrix_name.to_ascii_uppercase().as_str() {
            "BLOSUM62" => Ok(Self::blosum62()),
            other => Err(SearchError::InvalidOptions(format!(
                "unsupported scoring matrix {other}"
            ))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn score(&self, a: u8, b: u8) -> i32 {
        let (a, b) = (a as usize, b as usize);
        if a < self.size && b < self.size {
            self.scores[a * self.size + b]
        } else {
            DEFSCORE
        }
    }

    /// Best score attainable in the row of residue `a`.
    pub fn row_max(&self, a: u8) -> i32 {
        let a = (a as usize).min(self.size - 1);
        self.scores[a * self.size..(a + 1) * self.size]
            .iter()
            .copied()
            .max()
            .unwrap_or(DEFSCORE)
    }
}

/// Position-specific scoring matrix: one row of NCBIstdaa scores per
/// position of the concatenated profile database.
#[derive(Debug, Clone, Default)]
pub struct Pssm {
    rows: Vec<[i32; BLASTAA_SIZE]>,
}

impl Pssm {
    pub fn new(rows: Vec<[i32; BLASTAA_SIZE]>) -> Self {
        Pssm { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[[i32; BLASTAA_SIZE]] {
        &self.rows
    }

    #[inline]
    pub fn score(&self, position: usize, residue: u8) -> i32 {
        match self.rows.get(position) {
            Some(row) => row.get(residue as usize).copied().unwrap_or(DEFSCORE),
            None => SENTINEL_SCORE,
        }
    }
}

/// Karlin-Altschul parameters for one context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KarlinBlk {
    pub lambda: f64,
    pub k: f64,
    pub log_k: f64,
    pub h: f64,
    pub alpha: f64,
    pub beta: f64,
}

impl KarlinBlk {
    pub fn new(lambda: f64, k: f64, h: f64, alpha: f64, beta: f64) -> Self {
        KarlinBlk {
            lambda,
            k,
            log_k: k.ln(),
            h,
            alpha,
            beta,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.lambda > 0.0 && self.k > 0.0 && self.h > 0.0
    }

    #[inline]
    pub fn bit_score(&self, raw: i32) -> f64 {
        (self.lambda * raw as f64 - self.log_k) / std::f64::consts::LN_2
    }

    #[inline]
    pub fn evalue(&self, raw: i32, searchsp: f64) -> f64 {
        searchsp * (-self.lambda * raw as f64 + self.log_k).exp()
    }

    /// Smallest raw score whose e-value does not exceed `evalue`.
    pub fn raw_cutoff(&self, evalue: f64, searchsp: f64) -> i32 {
        if evalue <= 0.0 || searchsp <= 0.0 {
            return i32::MAX;
        }
        ((self.log_k + searchsp.ln() - evalue.ln()) / self.lambda).ceil() as i32
    }
}

struct IdealEntry {
    gap_open: i32,
    gap_extend: i32,
    params: (f64, f64, f64, f64, f64),
}

const fn entry(gap_open: i32, gap_extend: i32, l: f64, k: f64, h: f64, a: f64, b: f64) -> IdealEntry {
    IdealEntry {
        gap_open,
        gap_extend,
        params: (l, k, h, a, b),
    }
}

/// First entry of each table is the ungapped parameter set.
const BLOSUM62_PARAMS: &[IdealEntry] = &[
    entry(0, 0, 0.3176, 0.134, 0.4012, 0.7916, -3.2),
    entry(11, 2, 0.297, 0.082, 0.27, 1.1, -10.0),
    entry(10, 2, 0.291, 0.075, 0.23, 1.3, -15.0),
    entry(9, 2, 0.279, 0.058, 0.19, 1.5, -19.0),
    entry(8, 2, 0.264, 0.045, 0.15, 1.8, -26.0),
    entry(7, 2, 0.239, 0.027, 0.10, 2.5, -46.0),
    entry(6, 2, 0.201, 0.012, 0.061, 3.3, -58.0),
    entry(13, 1, 0.292, 0.071, 0.23, 1.2, -11.0),
    entry(12, 1, 0.283, 0.059, 0.19, 1.5, -19.0),
    entry(11, 1, 0.267, 0.041, 0.14, 1.9, -30.0),
    entry(10, 1, 0.243, 0.024, 0.10, 2.5, -44.0),
    entry(9, 1, 0.206, 0.010, 0.052, 4.0, -87.0),
];

const NUCL_1_2_PARAMS: &[IdealEntry] = &[
    entry(0, 0, 1.28, 0.46, 0.85, 1.5, -2.0),
    entry(2, 2, 1.33, 0.62, 1.1, 1.2, 0.0),
    entry(1, 2, 1.30, 0.52, 0.93, 1.4, -2.0),
    entry(0, 2, 1.19, 0.34, 0.66, 1.8, -3.0),
    entry(3, 1, 1.32, 0.57, 1.0, 1.3, -1.0),
    entry(2, 1, 1.29, 0.49, 0.92, 1.4, -1.0),
    entry(1, 1, 1.14, 0.26, 0.52, 2.2, -5.0),
];

const NUCL_1_3_PARAMS: &[IdealEntry] = &[
    entry(0, 0, 1.374, 0.711, 1.31, 1.05, 0.0),
    entry(2, 2, 1.37, 0.70, 1.2, 1.1, 0.0),
    entry(1, 2, 1.35, 0.64, 1.1, 1.2, -1.0),
    entry(0, 2, 1.25, 0.42, 0.83, 1.5, -2.0),
    entry(2, 1, 1.34, 0.60, 1.1, 1.2, -1.0),
    entry(1, 1, 1.21, 0.34, 0.71, 1.7, -2.0),
];

const NUCL_2_3_PARAMS: &[IdealEntry] = &[
    entry(0, 0, 0.625, 0.41, 0.78, 0.8, -2.0),
    entry(4, 4, 0.63, 0.42, 0.84, 0.75, -2.0),
    entry(2, 4, 0.615, 0.37, 0.72, 0.85, -3.0),
    entry(3, 3, 0.615, 0.37, 0.68, 0.9, -3.0),
    entry(6, 2, 0.63, 0.42, 0.84, 0.75, -2.0),
    entry(5, 2, 0.625, 0.41, 0.78, 0.8, -2.0),
    entry(4, 2, 0.61, 0.35, 0.68, 0.9, -3.0),
    entry(2, 2, 0.515, 0.14, 0.33, 1.55, -9.0),
];

const NUCL_1_1_PARAMS: &[IdealEntry] = &[
    entry(0, 0, 1.09, 0.31, 0.55, 2.0, -2.0),
    entry(3, 2, 1.09, 0.31, 0.55, 2.0, -2.0),
    entry(2, 2, 1.07, 0.27, 0.49, 2.2, -3.0),
    entry(4, 1, 1.08, 0.28, 0.54, 2.0, -2.0),
    entry(3, 1, 1.06, 0.25, 0.46, 2.3, -4.0),
];

/// Ideal Karlin block for the scoring scheme. Gapped searches must use a
/// gap-cost pair present in the table.
pub fn ideal_karlin_blk(program: ProgramType, options: &ScoringOptions) -> Result<KarlinBlk> {
    let table = if program.is_nucleotide_search() {
        match (options.reward, options.penalty.abs()) {
            (1, 2) => NUCL_1_2_PARAMS,
            (1, 3) => NUCL_1_3_PARAMS,
            (2, 3) => NUCL_2_3_PARAMS,
            (1, 1) => NUCL_1_1_PARAMS,
            (r, p) => {
                return Err(SearchError::InvalidOptions(format!(
                    "no statistical parameters for reward {r} penalty -{p}"
                )))
            }
        }
    } else {
        BLOSUM62_PARAMS
    };

    let picked = if options.gapped {
        table
            .iter()
            .skip(1)
            .find(|e| e.gap_open == options.gap_open && e.gap_extend == options.gap_extend)
            .ok_or_else(|| {
                SearchError::InvalidOptions(format!(
                    "gap costs {}/{} are not supported for {}",
                    options.gap_open,
                    options.gap_extend,
                    program
                ))
            })?
    } else {
        &table[0]
    };
    let (l, k, h, a, b) = picked.params;
    Ok(KarlinBlk::new(l, k, h, a, b))
}

/// Length adjustment fixed point: the expected length of an HSP that is
/// removed from both sequences before computing the search space.
pub fn compute_length_adjustment(
    query_length: u64,
    db_length: u64,
    db_num_seqs: u64,
    kbp: &KarlinBlk,
) -> u64 {
    const MAX_ITERATIONS: usize = 20;

    let m = query_length as f64;
    let n = db_length as f64;
    let n_seqs = db_num_seqs.max(1) as f64;
    if m <= 0.0 || n <= 0.0 || !kbp.is_valid() {
        return 0;
    }
    let alpha_d_lambda = kbp.alpha / kbp.lambda;

    let a = n_seqs;
    let mb = m * n_seqs + n;
    let c = n * m - m.max(n) / kbp.k;
    if c < 0.0 {
        return 0;
    }
    let discriminant = mb * mb - 4.0 * a * c;
    if discriminant < 0.0 {
        return 0;
    }

    let mut ell_min = 0.0_f64;
    let mut ell_max = 2.0 * c / (mb + discriminant.sqrt());
    let mut ell_next = 0.0_f64;
    let mut converged = false;

    for i in 1..=MAX_ITERATIONS {
        let ell = ell_next;
        let ss = (m - ell) * (n - n_seqs * ell);
        let ell_bar = alpha_d_lambda * (kbp.log_k + ss.ln()) + kbp.beta;
        if ell_bar >= ell {
            ell_min = ell;
            if ell_bar - ell_min <= 1.0 {
                converged = true;
                break;
            }
            if ell_min == ell_max {
                break;
            }
        } else {
            ell_max = ell;
        }
        ell_next = if ell_min <= ell_bar && ell_bar <= ell_max {
            ell_bar
        } else if i == 1 {
            ell_max
        } else {
            (ell_min + ell_max) / 2.0
        };
    }

    let mut adjustment = ell_min.max(0.0) as u64;
    if converged {
        let ell_ceil = ell_min.ceil();
        if ell_ceil <= ell_max {
            let ss = (m - ell_ceil) * (n - n_seqs * ell_ceil);
            if alpha_d_lambda * (kbp.log_k + ss.ln()) + kbp.beta >= ell_ceil {
                adjustment = ell_ceil as u64;
            }
        }
    }
    adjustment
}

/// Effective search space for one context against the whole database.
pub fn effective_search_space(
    query_length: u64,
    db_length: u64,
    db_num_seqs: u64,
    kbp: &KarlinBlk,
) -> f64 {
    effective_search_space_capped(query_length, db_length, db_num_seqs, u64::MAX, kbp)
}

/// As `effective_search_space`, with the length adjustment limited to
/// `max_adjustment` (the longest database sequence).
pub fn effective_search_space_capped(
    query_length: u64,
    db_length: u64,
    db_num_seqs: u64,
    max_adjustment: u64,
    kbp: &KarlinBlk,
) -> f64 {
    let adj = compute_length_adjustment(query_length, db_length, db_num_seqs, kbp).min(max_adjustment);
    let min_query = (1.0 / kbp.k).max(1.0);
    let eff_query = (query_length.saturating_sub(adj) as f64).max(min_query);
    let eff_db = (db_length.saturating_sub(db_num_seqs.max(1) * adj) as f64).max(1.0);
    eff_query * eff_db
}

/// Everything needed to score residue pairs and turn raw scores into
/// statistics for one search.
#[derive(Debug, Clone)]
pub struct ScoreBlock {
    matrix: ScoreMatrix,
    pssm: Option<Arc<Pssm>>,
    kbp: Vec<KarlinBlk>,
    round_down: bool,
}

impl ScoreBlock {
    pub fn new(
        program: ProgramType,
        options: &ScoringOptions,
        num_contexts: usize,
    ) -> Result<Self> {
        let matrix = ScoreMatrix::from_options(program, options)?;
        let kbp = ideal_karlin_blk(program, options)?;
        Ok(ScoreBlock {
            matrix,
            pssm: None,
            kbp: vec![kbp; num_contexts],
            round_down: program.is_nucleotide_search() && options.gapped && options.reward == 2,
        })
    }

    pub fn matrix(&self) -> &ScoreMatrix {
        &self.matrix
    }

    pub fn kbp(&self, context: usize) -> Option<&KarlinBlk> {
        self.kbp.get(context)
    }

    pub fn kbps(&self) -> &[KarlinBlk] {
        &self.kbp
    }

    pub fn set_kbp(&mut self, context: usize, kbp: KarlinBlk) {
        if let Some(slot) = self.kbp.get_mut(context) {
            *slot = kbp;
        }
    }

    /// Gapped nucleotide scores with reward 2 must be even.
    pub fn round_down(&self) -> bool {
        self.round_down
    }

    pub fn has_pssm(&self) -> bool {
        self.pssm.is_some()
    }

    pub(crate) fn attach_pssm(&mut self, pssm: Arc<Pssm>) -> Option<Arc<Pssm>> {
        self.pssm.replace(pssm)
    }

    pub(crate) fn detach_pssm(&mut self) -> Option<Arc<Pssm>> {
        self.pssm.take()
    }

    /// Score a query residue against the subject residue at `s_pos`.
    ///
    /// With a profile attached the subject is the concatenated profile
    /// database and the row at `s_pos` scores the query residue.
    #[inline]
    pub fn score(&self, q_res: u8, s_pos: usize, s_res: u8) -> i32 {
        match &self.pssm {
            Some(pssm) => pssm.score(s_pos, q_res),
            None => self.matrix.score(q_res, s_res),
        }
    }
}
