//! Frame translation of BLASTNA sequences.

use crate::core::blast_encoding::reverse_complement;
use crate::core::gencode_singleton::GeneticCode;

/// Number of codons read in `frame` from a nucleotide sequence of `nuc_len`.
pub fn frame_length(nuc_len: usize, frame: i8) -> usize {
    let shift = (frame.unsigned_abs() as usize).saturating_sub(1);
    nuc_len.saturating_sub(shift) / 3
}

/// Translate one reading frame. Frames 1..=3 read the plus strand starting
/// at offset `frame - 1`; frames -1..=-3 read the reverse complement.
pub fn translate_frame(seq: &[u8], frame: i8, code: &GeneticCode) -> Vec<u8> {
    debug_assert!(frame != 0 && frame.abs() <= 3);
    let shift = (frame.unsigned_abs() as usize).saturating_sub(1);
    let strand;
    let source: &[u8] = if frame > 0 {
        seq
    } else {
        strand = reverse_complement(seq);
        &strand
    };
    source
        .get(shift..)
        .unwrap_or(&[])
        .chunks_exact(3)
        .map(|c| code.translate_codon([c[0], c[1], c[2]]))
        .collect()
}

/// Map a half-open protein range in `frame` back to 1-based, inclusive
/// nucleotide coordinates on the plus strand. Minus-strand ranges come back
/// with `start > end`.
pub fn protein_to_nucleotide_range(
    start: usize,
    end: usize,
    frame: i8,
    nuc_len: usize,
) -> (usize, usize) {
    let shift = (frame.unsigned_abs() as usize).saturating_sub(1);
    let nuc_start = shift + 3 * start;
    let nuc_end = shift + 3 * end;
    if frame >= 0 {
        (nuc_start + 1, nuc_end)
    } else {
        (nuc_len - nuc_start, nuc_len - nuc_end + 1)
    }
}
