//! Lookup tables: where can a seed start?
//!
//! Every variant produces `WordHit`s, pairs of an absolute query-buffer
//! position and a subject position relative to the current chunk window.
//! Ordinary tables index the query and scan the subject; the profile table
//! indexes the profile database and scans the query.

use rustc_hash::FxHashMap;

use super::blast_encoding::{BLASTAA_SIZE, PROTEIN_SENTINEL};
use super::blast_options::SearchOptions;
use super::blast_stat::ScoreMatrix;
use super::phi_pattern::PhiPattern;
use super::query_info::QueryInfo;
use super::rps_files::RpsLookup;
use crate::error::{Result, SearchError};
use crate::sequence::{Alphabet, SequenceBlock};

/// Number of 2-bit nucleotide letters.
const NUCLEOTIDE_WORD_ALPHABET: u64 = 4;

/// One seed: the query and subject residues at these positions start
/// `len` matching (or neighboring) residues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordHit {
    pub q_pos: usize,
    pub s_pos: usize,
    pub len: usize,
}

/// Pack `residues` into one integer, or `None` if any residue is outside
/// the word alphabet.
#[inline]
pub fn word_code(residues: &[u8], alphabet: Alphabet) -> Option<u64> {
    let mut code = 0u64;
    for &r in residues {
        code = match alphabet {
            Alphabet::Nucleotide if r < 4 => code * NUCLEOTIDE_WORD_ALPHABET + r as u64,
            Alphabet::Protein if r != PROTEIN_SENTINEL && (r as usize) < BLASTAA_SIZE => {
                code * BLASTAA_SIZE as u64 + r as u64
            }
            _ => return None,
        };
    }
    Some(code)
}

/// Collect the codes of every protein word scoring at least `threshold`,
/// where `rows[i][r]` is the score of residue `r` at word position `i`.
pub(crate) fn neighborhood(rows: &[[i32; BLASTAA_SIZE]], threshold: i32, out: &mut Vec<u64>) {
    let mut suffix_max = vec![0i32; rows.len() + 1];
    for i in (0..rows.len()).rev() {
        let best = rows[i][1..].iter().copied().max().unwrap_or(0);
        suffix_max[i] = suffix_max[i + 1] + best;
    }
    fn walk(
        rows: &[[i32; BLASTAA_SIZE]],
        suffix_max: &[i32],
        threshold: i32,
        pos: usize,
        score: i32,
        code: u64,
        out: &mut Vec<u64>,
    ) {
        if pos == rows.len() {
            if score >= threshold {
                out.push(code);
            }
            return;
        }
        for r in 1..BLASTAA_SIZE {
            let s = score + rows[pos][r];
            if s + suffix_max[pos + 1] >= threshold {
                walk(rows, suffix_max, threshold, pos + 1, s, code * BLASTAA_SIZE as u64 + r as u64, out);
            }
        }
    }
    walk(rows, &suffix_max, threshold, 0, 0, 0, out);
}

/// Word table over the query block: word code to every query position
/// starting that word (or a word in its neighborhood).
#[derive(Debug, Clone)]
pub struct WordLookup {
    word_size: usize,
    alphabet: Alphabet,
    table: FxHashMap<u64, Vec<u32>>,
    num_entries: usize,
}

impl WordLookup {
    /// Exact nucleotide words of every context.
    pub fn nucleotide(query: &SequenceBlock, info: &QueryInfo, word_size: usize) -> Self {
        let mut lookup = WordLookup::empty(word_size, Alphabet::Nucleotide);
        let buffer = query.buffer();
        for ctx in info.contexts() {
            let range = ctx.query_range();
            if range.len() < word_size {
                continue;
            }
            for pos in range.start..=range.end - word_size {
                if let Some(code) = word_code(&buffer[pos..pos + word_size], Alphabet::Nucleotide) {
                    lookup.add(code, pos);
                }
            }
        }
        lookup
    }

    /// Protein words and their neighborhoods. A threshold of 0 indexes
    /// exact words only; the exact word is always indexed.
    pub fn protein(
        query: &SequenceBlock,
        info: &QueryInfo,
        word_size: usize,
        threshold: i32,
        matrix: &ScoreMatrix,
    ) -> Self {
        let mut lookup = WordLookup::empty(word_size, Alphabet::Protein);
        let buffer = query.buffer();
        let mut rows = vec![[0i32; BLASTAA_SIZE]; word_size];
        let mut neighbors = Vec::new();
        for ctx in info.contexts() {
            let range = ctx.query_range();
            if range.len() < word_size {
                continue;
            }
            for pos in range.start..=range.end - word_size {
                let word = &buffer[pos..pos + word_size];
                let Some(exact) = word_code(word, Alphabet::Protein) else {
                    continue;
                };
                neighbors.clear();
                if threshold > 0 {
                    for (row, &q) in rows.iter_mut().zip(word) {
                        for (r, cell) in row.iter_mut().enumerate() {
                            *cell = matrix.score(q, r as u8);
                        }
                    }
                    neighborhood(&rows, threshold, &mut neighbors);
                }
                if !neighbors.contains(&exact) {
                    neighbors.push(exact);
                }
                for &code in &neighbors {
                    lookup.add(code, pos);
                }
            }
        }
        lookup
    }

    fn empty(word_size: usize, alphabet: Alphabet) -> Self {
        WordLookup {
            word_size,
            alphabet,
            table: FxHashMap::default(),
            num_entries: 0,
        }
    }

    fn add(&mut self, code: u64, pos: usize) {
        self.table.entry(code).or_default().push(pos as u32);
        self.num_entries += 1;
    }

    pub fn word_size(&self) -> usize {
        self.word_size
    }

    pub fn num_entries(&self) -> usize {
        self.num_entries
    }

    /// Query positions indexed under `code`.
    pub fn positions(&self, code: u64) -> &[u32] {
        self.table.get(&code).map_or(&[], Vec::as_slice)
    }

    fn scan(&self, subject: &[u8], hits: &mut Vec<WordHit>) {
        let w = self.word_size;
        if subject.len() < w {
            return;
        }
        for s_pos in 0..=subject.len() - w {
            let Some(code) = word_code(&subject[s_pos..s_pos + w], self.alphabet) else {
                continue;
            };
            hits.extend(self.positions(code).iter().map(|&q| WordHit {
                q_pos: q as usize,
                s_pos,
                len: w,
            }));
        }
    }
}

/// Pattern occurrences of the query, paired with occurrences in the subject.
#[derive(Debug, Clone)]
pub struct PhiLookup {
    pattern: PhiPattern,
    /// `(absolute query position, length)` of every query occurrence.
    query_hits: Vec<(usize, usize)>,
}

impl PhiLookup {
    pub fn new(pattern: PhiPattern, query: &SequenceBlock, info: &QueryInfo) -> Result<Self> {
        let buffer = query.buffer();
        let query_hits: Vec<(usize, usize)> = info
            .contexts()
            .iter()
            .flat_map(|ctx| {
                let range = ctx.query_range();
                pattern
                    .find_all(&buffer[range.clone()])
                    .into_iter()
                    .map(move |(start, len)| (range.start + start, len))
            })
            .collect();
        if query_hits.is_empty() {
            return Err(SearchError::InvalidQueries(format!(
                "pattern {} does not occur in the query",
                pattern.source()
            )));
        }
        Ok(PhiLookup { pattern, query_hits })
    }

    pub fn pattern(&self) -> &PhiPattern {
        &self.pattern
    }

    pub fn query_hits(&self) -> &[(usize, usize)] {
        &self.query_hits
    }

    // Ungapped seeds need both occurrences to span the same length.
    fn scan(&self, subject: &[u8], hits: &mut Vec<WordHit>) {
        for (s_pos, s_len) in self.pattern.find_all(subject) {
            hits.extend(
                self.query_hits
                    .iter()
                    .filter(|&&(_, q_len)| q_len == s_len)
                    .map(|&(q_pos, len)| WordHit { q_pos, s_pos, len }),
            );
        }
    }
}

/// The seed source of a search.
#[derive(Debug, Clone)]
pub enum LookupTable {
    Nucleotide(WordLookup),
    Protein(WordLookup),
    Rps(RpsLookup),
    Phi(PhiLookup),
}

impl LookupTable {
    /// Index the query block for an ordinary (non-profile) search.
    pub fn build(
        options: &SearchOptions,
        query: &SequenceBlock,
        info: &QueryInfo,
        matrix: &ScoreMatrix,
    ) -> Result<Self> {
        let program = options.program;
        let ext = &options.extension;
        if program.is_rps() {
            return Err(SearchError::Internal(
                "profile searches use the database lookup table".to_string(),
            ));
        }
        if program.is_phi() {
            let source = options
                .phi_pattern
                .as_deref()
                .ok_or_else(|| SearchError::InvalidOptions(format!("{program} requires a pattern")))?;
            let pattern = PhiPattern::parse(source, query.alphabet())?;
            return Ok(LookupTable::Phi(PhiLookup::new(pattern, query, info)?));
        }
        let table = if program.is_nucleotide_search() {
            LookupTable::Nucleotide(WordLookup::nucleotide(query, info, ext.word_size))
        } else {
            LookupTable::Protein(WordLookup::protein(
                query,
                info,
                ext.word_size,
                ext.word_threshold,
                matrix,
            ))
        };
        log::debug!(
            "{program} lookup table: word size {}, {} entries",
            ext.word_size,
            table.num_entries()
        );
        Ok(table)
    }

    pub fn num_entries(&self) -> usize {
        match self {
            LookupTable::Nucleotide(l) | LookupTable::Protein(l) => l.num_entries(),
            LookupTable::Rps(l) => l.num_positions(),
            LookupTable::Phi(l) => l.query_hits().len(),
        }
    }

    /// Shortest seed the table can report.
    pub fn word_size(&self) -> usize {
        match self {
            LookupTable::Nucleotide(l) | LookupTable::Protein(l) => l.word_size(),
            LookupTable::Rps(l) => l.word_size(),
            LookupTable::Phi(l) => l.pattern().min_length(),
        }
    }

    /// Find all seeds between the query buffer and the subject window
    /// `subject`, which starts at `subject_offset` of its frame. Hits come
    /// back ordered by subject position.
    pub fn scan(&self, query: &[u8], subject: &[u8], subject_offset: usize, hits: &mut Vec<WordHit>) {
        hits.clear();
        match self {
            LookupTable::Nucleotide(l) | LookupTable::Protein(l) => l.scan(subject, hits),
            LookupTable::Phi(l) => l.scan(subject, hits),
            LookupTable::Rps(l) => {
                l.scan(query, subject_offset, subject.len(), hits);
                hits.sort_unstable_by_key(|h| (h.s_pos, h.q_pos));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::blast_encoding::{encode_nucleotide, encode_protein};
    use crate::core::blast_program::ProgramType;
    use crate::core::gencode_singleton::GeneticCode;
    use crate::core::query_info::build_query_block;

    #[test]
    fn test_word_code_rejects_ambiguity() {
        assert_eq!(word_code(&[0, 1, 2, 3], Alphabet::Nucleotide), Some(0b00_01_10_11));
        assert_eq!(word_code(&[0, 14], Alphabet::Nucleotide), None);
        assert_eq!(word_code(&[1, 0], Alphabet::Protein), None);
    }

    #[test]
    fn test_nucleotide_scan_finds_both_strands() {
        let queries = vec![encode_nucleotide(b"ACGTACGGTTCAAGT")];
        let (block, info) =
            build_query_block(ProgramType::Blastn, &queries, &GeneticCode::standard()).unwrap();
        let table = LookupTable::Nucleotide(WordLookup::nucleotide(&block, &info, 8));
        let mut hits = Vec::new();
        let subject = encode_nucleotide(b"TTTTACGGTTCAATTTT");
        table.scan(block.buffer(), &subject, 0, &mut hits);
        assert!(hits.contains(&WordHit { q_pos: 1 + 4, s_pos: 4, len: 8 }));

        // reverse complement of the subject word lands in the minus context
        let minus = encode_nucleotide(b"ATTGAACCGT");
        table.scan(block.buffer(), &minus, 0, &mut hits);
        assert!(hits.iter().all(|h| info.context_containing(h.q_pos) == Some(1)));
        assert!(!hits.is_empty());
    }

    #[test]
    fn test_protein_neighborhood_contains_exact_and_similar() {
        let queries = vec![encode_protein(b"WWWKV")];
        let (block, info) =
            build_query_block(ProgramType::Blastp, &queries, &GeneticCode::standard()).unwrap();
        let m = ScoreMatrix::blosum62();
        let lookup = WordLookup::protein(&block, &info, 3, 11, &m);
        let exact = word_code(&encode_protein(b"WWW"), Alphabet::Protein).unwrap();
        // WWK at 2 scores 11 + 11 - 3 = 19 against WWW
        assert_eq!(lookup.positions(exact), &[1, 2]);
        // WWY scores 11 + 11 + 2 = 24 against WWW
        let similar = word_code(&encode_protein(b"WWY"), Alphabet::Protein).unwrap();
        assert!(lookup.positions(similar).contains(&1));
        // AAA scores 0 against WWW
        let far = word_code(&encode_protein(b"AAA"), Alphabet::Protein).unwrap();
        assert!(!lookup.positions(far).contains(&1));
    }

    #[test]
    fn test_phi_pairs_occurrences() {
        let queries = vec![encode_protein(b"MMGAASCKK")];
        let (block, info) =
            build_query_block(ProgramType::PhiBlastp, &queries, &GeneticCode::standard()).unwrap();
        let pattern = PhiPattern::parse("G-x(2)-[ST]-C", Alphabet::Protein).unwrap();
        let table = LookupTable::Phi(PhiLookup::new(pattern, &block, &info).unwrap());
        let mut hits = Vec::new();
        table.scan(block.buffer(), &encode_protein(b"QGQQTCQ"), 0, &mut hits);
        assert_eq!(hits, vec![WordHit { q_pos: 3, s_pos: 1, len: 5 }]);
    }
}
