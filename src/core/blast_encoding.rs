//! Residue encodings used inside sequence blocks.
//!
//! Nucleotides are stored one base per byte in BLASTNA order:
//! `A C G T R Y M K W S B D H V N -` (codes 0..=15). Codes 0-3 are
//! unambiguous; anything above is an IUPAC ambiguity code.
//!
//! Proteins are stored in NCBIstdaa order (codes 0..=27) where code 0 is
//! the gap symbol and doubles as the sentinel byte.

/// Sentinel byte placed around protein sequences.
pub const PROTEIN_SENTINEL: u8 = 0;
/// Sentinel byte placed around nucleotide sequences.
pub const NUCLEOTIDE_SENTINEL: u8 = 15;
/// BLASTNA code for `N`.
pub const BLASTNA_N: u8 = 14;
/// NCBIstdaa code for `X`.
pub const NCBISTDAA_X: u8 = 21;
/// NCBIstdaa code for the stop codon `*`.
pub const NCBISTDAA_STOP: u8 = 25;
/// Size of the NCBIstdaa alphabet.
pub const BLASTAA_SIZE: usize = 28;
/// Size of the BLASTNA alphabet.
pub const BLASTNA_SIZE: usize = 16;

const IUPACNA_TO_BLASTNA: [u8; 128] = [
    15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15,
    15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15,
    15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15,
    15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15,
    15,  0, 10,  1, 11, 15, 15,  2, 12, 15, 15,  7, 15,  6, 14, 15,
    15, 15,  4,  9,  3,  3, 13,  8, 15,  5, 15, 15, 15, 15, 15, 15,
    15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15,
    15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15,
];

const BLASTNA_COMPLEMENT: [u8; BLASTNA_SIZE] = [3, 2, 1, 0, 5, 4, 7, 6, 8, 9, 13, 12, 11, 10, 14, 15];

const BLASTNA_TO_IUPACNA: &[u8; BLASTNA_SIZE] = b"ACGTRYMKWSBDHVN-";

const NCBISTDAA_TO_AMINOACID: &[u8; BLASTAA_SIZE] = b"-ABCDEFGHIKLMNPQRSTVWXYZU*OJ";

const AMINOACID_TO_NCBISTDAA: [u8; 128] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 25, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0,  1,  2,  3,  4,  5,  6,  7,  8,  9, 27, 10, 11, 12, 13, 26,
    14, 15, 16, 17, 18, 24, 19, 20, 21, 22, 23, 0, 0, 0, 0, 0,
    0,  1,  2,  3,  4,  5,  6,  7,  8,  9, 27, 10, 11, 12, 13, 26,
    14, 15, 16, 17, 18, 24, 19, 20, 21, 22, 23, 0, 0, 0, 0, 0,
];

/// Encode one IUPAC nucleotide letter to BLASTNA. Unknown letters become `-`.
#[inline]
pub fn iupacna_to_blastna(base: u8) -> u8 {
    let upper = base.to_ascii_uppercase() as usize;
    if upper < IUPACNA_TO_BLASTNA.len() {
        IUPACNA_TO_BLASTNA[upper]
    } else {
        NUCLEOTIDE_SENTINEL
    }
}

pub fn encode_nucleotide(seq: &[u8]) -> Vec<u8> {
    seq.iter().map(|&b| iupacna_to_blastna(b)).collect()
}

/// Encode one amino-acid letter to NCBIstdaa. Characters outside the
/// alphabet become `X`.
#[inline]
pub fn aminoacid_to_ncbistdaa(aa: u8) -> u8 {
    if aa < 128 {
        let code = AMINOACID_TO_NCBISTDAA[aa as usize];
        if code == 0 && aa != b'-' {
            NCBISTDAA_X
        } else {
            code
        }
    } else {
        NCBISTDAA_X
    }
}

pub fn encode_protein(seq: &[u8]) -> Vec<u8> {
    seq.iter().map(|&b| aminoacid_to_ncbistdaa(b)).collect()
}

#[inline]
pub fn complement_blastna(code: u8) -> u8 {
    BLASTNA_COMPLEMENT[(code & 0x0f) as usize]
}

/// Reverse complement of a BLASTNA-encoded sequence.
pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&c| complement_blastna(c)).collect()
}

#[inline]
pub fn is_ambiguous_blastna(code: u8) -> bool {
    code > 3
}

pub fn blastna_to_iupacna(code: u8) -> u8 {
    BLASTNA_TO_IUPACNA[(code & 0x0f) as usize]
}

pub fn ncbistdaa_to_aminoacid(code: u8) -> u8 {
    NCBISTDAA_TO_AMINOACID
        .get(code as usize)
        .copied()
        .unwrap_or(b'X')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nucleotide_round_trip_letters() {
        let enc = encode_nucleotide(b"ACGTNacgtu");
        assert_eq!(enc, vec![0, 1, 2, 3, 14, 0, 1, 2, 3, 3]);
        let back: Vec<u8> = enc.iter().map(|&c| blastna_to_iupacna(c)).collect();
        assert_eq!(&back, b"ACGTNACGTT");
    }

    #[test]
    fn test_reverse_complement_with_ambiguity() {
        let enc = encode_nucleotide(b"AACGRN");
        let rc = reverse_complement(&enc);
        let letters: Vec<u8> = rc.iter().map(|&c| blastna_to_iupacna(c)).collect();
        assert_eq!(&letters, b"NYCGTT");
    }

    #[test]
    fn test_protein_encoding() {
        assert_eq!(aminoacid_to_ncbistdaa(b'A'), 1);
        assert_eq!(aminoacid_to_ncbistdaa(b'w'), 20);
        assert_eq!(aminoacid_to_ncbistdaa(b'*'), NCBISTDAA_STOP);
        assert_eq!(aminoacid_to_ncbistdaa(b'#'), NCBISTDAA_X);
        assert_eq!(ncbistdaa_to_aminoacid(aminoacid_to_ncbistdaa(b'K')), b'K');
    }
}
