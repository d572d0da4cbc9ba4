//! Word finding and ungapped extension.
//!
//! Seeds from the lookup table go through a per-diagonal tracker (two-hit
//! rule, suppression of seeds inside an earlier extension) and are then
//! extended without gaps under an X-drop rule. Extensions reaching the
//! ungapped cutoff become `InitHsp`s.

use std::ops::Range;

use super::blast_diagnostics::UngappedStats;
use super::blast_lookup::{LookupTable, WordHit};
use super::blast_options::ExtensionOptions;
use super::blast_stat::ScoreBlock;
use super::query_info::QueryInfo;

/// An ungapped extension that reached the cutoff. `q_off` is an absolute
/// query-block position, `s_off` is relative to the chunk window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitHsp {
    pub q_off: usize,
    pub s_off: usize,
    pub len: usize,
    pub score: i32,
    /// Pattern occurrence `(query position, length)` the seed came from.
    pub pattern: Option<(usize, usize)>,
}

#[derive(Debug, Clone, Default)]
pub struct InitHitList {
    hits: Vec<InitHsp>,
}

impl InitHitList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, hit: InitHsp) {
        self.hits.push(hit);
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn clear(&mut self) {
        self.hits.clear();
    }

    pub fn hits(&self) -> &[InitHsp] {
        &self.hits
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct DiagState {
    /// Subject position of the last unextended hit.
    last_hit: Option<usize>,
    /// Subject positions below this were covered by an extension.
    extended_to: usize,
}

/// Per-worker scratch, reused across chunks and subjects.
#[derive(Debug, Default)]
pub struct WordScratch {
    diags: Vec<DiagState>,
    word_hits: Vec<WordHit>,
    init_hits: InitHitList,
}

impl WordScratch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn init_hits(&self) -> &InitHitList {
        &self.init_hits
    }

    /// Forget everything about an abandoned subject.
    pub fn reset(&mut self) {
        self.diags.clear();
        self.word_hits.clear();
        self.init_hits.clear();
    }
}

/// Residues scored by one extension pass.
pub struct ExtendInput<'a> {
    /// Whole query block, sentinels included.
    pub query: &'a [u8],
    /// Current chunk window of the subject frame.
    pub subject: &'a [u8],
    /// Start of the window in its frame; addresses profile rows.
    pub subject_offset: usize,
    pub score_block: &'a ScoreBlock,
    /// Score the two low bits of each residue.
    pub nucleotide: bool,
}

impl ExtendInput<'_> {
    #[inline]
    fn score(&self, q: usize, s: usize) -> i32 {
        let (q_res, s_res) = (self.query[q], self.subject[s]);
        if self.nucleotide {
            self.score_block.matrix().score(q_res & 3, s_res & 3)
        } else {
            self.score_block.score(q_res, self.subject_offset + s, s_res)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Extension {
    q_start: usize,
    s_start: usize,
    len: usize,
    score: i32,
    /// One past the last subject position looked at.
    s_last: usize,
}

/// Extend `hit` both ways inside `q_range` and the subject window.
///
/// The best-scoring piece of the word is the starting point unless
/// `whole_word` is set, in which case the full seed is kept (pattern hits).
fn extend_ungapped(
    input: &ExtendInput<'_>,
    hit: WordHit,
    q_range: Range<usize>,
    x_drop: i32,
    whole_word: bool,
) -> Extension {
    let to_s = |q: usize| q + hit.s_pos - hit.q_pos;

    let (left, right, score) = if whole_word {
        let score = (0..hit.len).map(|i| input.score(hit.q_pos + i, hit.s_pos + i)).sum();
        (hit.q_pos, hit.q_pos + hit.len, score)
    } else {
        let mut sum = 0;
        let mut best = 0;
        let mut start = hit.q_pos;
        let (mut left, mut right) = (hit.q_pos, hit.q_pos);
        for i in 0..hit.len {
            sum += input.score(hit.q_pos + i, hit.s_pos + i);
            if sum > best {
                best = sum;
                left = start;
                right = hit.q_pos + i + 1;
            } else if sum <= 0 {
                sum = 0;
                start = hit.q_pos + i + 1;
            }
        }
        (left, right, best)
    };

    let s_left = to_s(left);
    let max_left = (left - q_range.start).min(s_left);
    let mut current = score;
    let mut best = score;
    let mut left_disp = 0;
    for i in 1..=max_left {
        current += input.score(left - i, s_left - i);
        if current > best {
            best = current;
            left_disp = i;
        }
        if best - current >= x_drop {
            break;
        }
    }

    let s_right = to_s(right);
    let max_right = (q_range.end - right).min(input.subject.len() - s_right);
    let mut current = best;
    let mut total = best;
    let mut right_disp = 0;
    let mut scanned = 0;
    for j in 0..max_right {
        current += input.score(right + j, s_right + j);
        scanned = j + 1;
        if current > total {
            total = current;
            right_disp = j + 1;
        }
        if current <= 0 || total - current >= x_drop {
            break;
        }
    }

    Extension {
        q_start: left - left_disp,
        s_start: s_left - left_disp,
        len: right - left + left_disp + right_disp,
        score: total,
        s_last: s_right + scanned,
    }
}

/// Scan the subject window, extend qualifying seeds and leave the
/// extensions reaching the cutoff in `scratch.init_hits()`. Returns their
/// number.
pub fn find_initial_hits(
    lookup: &LookupTable,
    input: &ExtendInput<'_>,
    info: &QueryInfo,
    options: &ExtensionOptions,
    scratch: &mut WordScratch,
    stats: &mut UngappedStats,
) -> usize {
    let WordScratch {
        diags,
        word_hits,
        init_hits,
    } = scratch;
    init_hits.clear();
    lookup.scan(input.query, input.subject, input.subject_offset, word_hits);
    stats.lookup_hits += word_hits.len() as u64;
    if word_hits.is_empty() {
        return 0;
    }

    let query_len = input.query.len();
    diags.clear();
    diags.resize(query_len + input.subject.len() + 1, DiagState::default());

    let pattern_search = matches!(lookup, LookupTable::Phi(_));
    let window = if pattern_search { 0 } else { options.two_hit_window };
    let word_size = lookup.word_size();

    for &hit in word_hits.iter() {
        let diag = &mut diags[hit.s_pos + query_len - hit.q_pos];
        if hit.s_pos < diag.extended_to {
            continue;
        }
        if window > 0 {
            match diag.last_hit.map(|last| hit.s_pos.saturating_sub(last)) {
                Some(d) if d < word_size => continue,
                Some(d) if d <= window => {}
                _ => {
                    diag.last_hit = Some(hit.s_pos);
                    continue;
                }
            }
        }
        let Some(context) = info.context_containing(hit.q_pos) else {
            continue;
        };
        let range = info.context(context).query_range();
        let ext = extend_ungapped(input, hit, range, options.xdrop_ungapped, pattern_search);
        stats.init_extends += 1;
        diag.extended_to = ext.s_last;
        diag.last_hit = Some(hit.s_pos);
        if ext.score >= options.ungapped_cutoff {
            stats.good_init_extends += 1;
            init_hits.push(InitHsp {
                q_off: ext.q_start,
                s_off: ext.s_start,
                len: ext.len,
                score: ext.score,
                pattern: pattern_search.then_some((hit.q_pos, hit.len)),
            });
        }
    }
    init_hits.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::blast_encoding::{encode_nucleotide, encode_protein};
    use crate::core::blast_lookup::WordLookup;
    use crate::core::blast_options::ScoringOptions;
    use crate::core::blast_program::ProgramType;
    use crate::core::gencode_singleton::GeneticCode;
    use crate::core::query_info::build_query_block;

    fn nucleotide_options(two_hit_window: usize) -> ExtensionOptions {
        ExtensionOptions {
            word_size: 8,
            word_threshold: 0,
            two_hit_window,
            xdrop_ungapped: 20,
            ungapped_cutoff: 10,
        }
    }

    #[test]
    fn test_one_hit_extension_stops_at_context_end() {
        let queries = vec![encode_nucleotide(b"ACGTACGGTTCAAGT")];
        let program = ProgramType::Blastn;
        let (block, info) = build_query_block(program, &queries, &GeneticCode::standard()).unwrap();
        let sbp = ScoreBlock::new(program, &ScoringOptions::for_program(program), info.num_contexts()).unwrap();
        let lookup = LookupTable::Nucleotide(WordLookup::nucleotide(&block, &info, 8));
        let subject = encode_nucleotide(b"TTTTACGGTTCATTTT");
        let input = ExtendInput {
            query: block.buffer(),
            subject: &subject,
            subject_offset: 0,
            score_block: &sbp,
            nucleotide: true,
        };
        let mut scratch = WordScratch::new();
        let mut stats = UngappedStats::default();
        let n = find_initial_hits(&lookup, &input, &info, &nucleotide_options(0), &mut scratch, &mut stats);
        assert_eq!(n, 1);
        assert_eq!(
            scratch.init_hits().hits()[0],
            InitHsp {
                q_off: 4,
                s_off: 3,
                len: 9,
                score: 18,
                pattern: None
            }
        );
        // the second seed on the diagonal lies inside the extension
        assert_eq!(stats.lookup_hits, 2);
        assert_eq!(stats.init_extends, 1);

        // a lone seed per diagonal never triggers a two-hit extension
        let mut stats = UngappedStats::default();
        let n = find_initial_hits(&lookup, &input, &info, &nucleotide_options(40), &mut scratch, &mut stats);
        assert_eq!(n, 0);
        assert_eq!(stats.init_extends, 0);
    }

    #[test]
    fn test_two_hit_extension_covers_identical_protein() {
        let seq = b"MKWCHYWRPFCWMHKEYWCD";
        let program = ProgramType::Blastp;
        let (block, info) =
            build_query_block(program, &[encode_protein(seq)], &GeneticCode::standard()).unwrap();
        let sbp = ScoreBlock::new(program, &ScoringOptions::for_program(program), 1).unwrap();
        let lookup = LookupTable::Protein(WordLookup::protein(&block, &info, 3, 11, sbp.matrix()));
        let subject = encode_protein(seq);
        let input = ExtendInput {
            query: block.buffer(),
            subject: &subject,
            subject_offset: 0,
            score_block: &sbp,
            nucleotide: false,
        };
        let mut scratch = WordScratch::new();
        let mut stats = UngappedStats::default();
        find_initial_hits(
            &lookup,
            &input,
            &info,
            &ExtensionOptions::for_program(program),
            &mut scratch,
            &mut stats,
        );
        let full = scratch
            .init_hits()
            .hits()
            .iter()
            .find(|h| h.s_off == 0 && h.q_off == 1)
            .copied()
            .unwrap();
        assert_eq!(full.len, seq.len());
        assert!(stats.good_init_extends >= 1);

        scratch.reset();
        assert!(scratch.init_hits().is_empty());
    }
}
