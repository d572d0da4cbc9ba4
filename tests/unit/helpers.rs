//! Test fixtures shared by the integration tests.

use hspsearch::core::blast_encoding::{encode_nucleotide, encode_protein};
use hspsearch::core::blast_extend::InitHitList;
use hspsearch::core::blast_gapalign::{ungapped_hsp_list, GappedAligner, GappedInput};
use hspsearch::core::blast_hits::{Capacity, GapEditOp, GapEditScript, HspList};
use hspsearch::core::blast_results::HspResults;

const AMINO_ACIDS: &[u8] = b"ACDEFGHIKLMNPQRSTVWY";

/// Deterministic pseudo-random protein of `len` residues (ASCII).
pub fn random_protein(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            AMINO_ACIDS[((state >> 33) % AMINO_ACIDS.len() as u64) as usize]
        })
        .collect()
}

/// Random background of `len` residues with `pieces` copied in at the given
/// offsets (ASCII).
pub fn subject_with(len: usize, seed: u64, pieces: &[(usize, &[u8])]) -> Vec<u8> {
    let mut subject = random_protein(len, seed);
    for &(offset, piece) in pieces {
        subject[offset..offset + piece.len()].copy_from_slice(piece);
    }
    subject
}

pub fn encoded(ascii: &[u8]) -> Vec<u8> {
    encode_protein(ascii)
}

pub fn encoded_dna(ascii: &[u8]) -> Vec<u8> {
    encode_nucleotide(ascii)
}

/// Deterministic pseudo-random DNA of `len` bases (ASCII).
pub fn random_dna(len: usize, seed: u64) -> Vec<u8> {
    random_protein(len, seed)
        .into_iter()
        .map(|aa| b"ACGT"[(aa % 4) as usize])
        .collect()
}

/// One fixed codon per residue, never a stop codon.
pub fn back_translate(protein: &[u8]) -> Vec<u8> {
    protein
        .iter()
        .flat_map(|&aa| {
            let codon: &[u8; 3] = match aa {
                b'A' => b"GCT",
                b'C' => b"TGT",
                b'D' => b"GAT",
                b'E' => b"GAA",
                b'F' => b"TTT",
                b'G' => b"GGT",
                b'H' => b"CAT",
                b'I' => b"ATT",
                b'K' => b"AAA",
                b'L' => b"CTG",
                b'M' => b"ATG",
                b'N' => b"AAT",
                b'P' => b"CCG",
                b'Q' => b"CAA",
                b'R' => b"CGT",
                b'S' => b"TCT",
                b'T' => b"ACC",
                b'V' => b"GTT",
                b'W' => b"TGG",
                _ => b"TAT",
            };
            codon.iter().copied()
        })
        .collect()
}

pub fn reverse_complement(dna: &[u8]) -> Vec<u8> {
    dna.iter()
        .rev()
        .map(|&b| match b {
            b'A' => b'T',
            b'C' => b'G',
            b'G' => b'C',
            b'T' => b'A',
            other => other,
        })
        .collect()
}

/// Stand-in gapped aligner: every initial hit becomes one gap-free HSP.
///
/// With `traceback` the HSPs carry a one-run edit script. With `shadows`
/// each HSP is accompanied by two weaker copies, one sharing its start and
/// one sharing its end.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiagonalAligner {
    pub traceback: bool,
    pub shadows: bool,
}

impl GappedAligner for DiagonalAligner {
    fn has_traceback(&self) -> bool {
        self.traceback
    }

    fn align(&self, input: &GappedInput<'_>, hits: &InitHitList, out: &mut HspList) -> hspsearch::Result<()> {
        let list = ungapped_hsp_list(hits, input.query_info, input.subject_frame, out.oid, Capacity::Unbounded);
        for hsp in list.into_hsps() {
            let mut emitted = vec![hsp.clone()];
            if self.shadows && hsp.query.len() > 2 {
                let mut same_start = hsp.clone();
                same_start.query.end -= 1;
                same_start.subject.end -= 1;
                same_start.score -= 1;
                let mut same_end = hsp;
                same_end.query.offset += 1;
                same_end.subject.offset += 1;
                same_end.score -= 1;
                emitted.extend([same_start, same_end]);
            }
            for mut hsp in emitted {
                if self.traceback {
                    hsp.edit_script = Some(GapEditScript::from_ops([GapEditOp::Sub(hsp.query.len())]));
                }
                out.save_hsp(hsp);
            }
        }
        Ok(())
    }
}

/// One HSP as seen by a caller.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct HspKey {
    pub query_index: usize,
    pub oid: usize,
    pub score: i32,
    pub query: (usize, usize),
    pub subject: (usize, usize),
    pub evalue_bits: u64,
}

/// Every HSP of `results`, sorted so that runs differing only in subject
/// order compare equal.
pub fn hsp_keys(results: &HspResults) -> Vec<HspKey> {
    let mut keys: Vec<HspKey> = results
        .iter()
        .flat_map(|(query_index, list)| {
            list.hsps().iter().map(move |h| HspKey {
                query_index,
                oid: list.oid,
                score: h.score,
                query: (h.query.offset, h.query.end),
                subject: (h.subject.offset, h.subject.end),
                evalue_bits: h.evalue.to_bits(),
            })
        })
        .collect();
    keys.sort();
    keys
}
