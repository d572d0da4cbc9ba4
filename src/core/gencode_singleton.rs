//! Genetic code tables for translating BLASTNA codons to NCBIstdaa residues.

use super::blast_encoding::{aminoacid_to_ncbistdaa, NCBISTDAA_X};
use crate::error::{Result, SearchError};

/// Codon letters in the order the genetic code strings enumerate them.
const TCAG_INDEX_OF_BLASTNA: [usize; 4] = [2, 1, 3, 0];

/// Translation table for one genetic code.
#[derive(Debug, Clone)]
pub struct GeneticCode {
    id: u8,
    /// NCBIstdaa residue per codon, indexed in TCAG order.
    table: [u8; 64],
}

impl GeneticCode {
    pub fn standard() -> Self {
        Self::from_table(1, STANDARD)
    }

    /// Supported ids: 1-6, 9-16, 21-31, 33.
    pub fn from_id(id: u8) -> Result<Self> {
        let table_str = match id {
            1 => STANDARD,
            2 => b"FFLLSSSSYY**CCWWLLLLPPPPHHQQRRRRIIMMTTTTNNKKSS**VVVVAAAADDEEGGGG",
            3 => b"FFLLSSSSYY**CCWWTTTTPPPPHHQQRRRRIIMMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
            4 => b"FFLLSSSSYY**CCWWLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
            5 => b"FFLLSSSSYY**CCWWLLLLPPPPHHQQRRRRIIMMTTTTNNKKSSSSVVVVAAAADDEEGGGG",
            6 => b"FFLLSSSSYYQQCC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
            9 => b"FFLLSSSSYY**CCWWLLLLPPPPHHQQRRRRIIIMTTTTNNNKSSSSVVVVAAAADDEEGGGG",
            10 => b"FFLLSSSSYY**CCCWLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
            11 => STANDARD,
            12 => b"FFLLSSSSYY**CC*WLLLSPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
            13 => b"FFLLSSSSYY**CCWWLLLLPPPPHHQQRRRRIIMMTTTTNNKKSSGGVVVVAAAADDEEGGGG",
            14 => b"FFLLSSSSYYY*CCWWLLLLPPPPHHQQRRRRIIIMTTTTNNNKSSSSVVVVAAAADDEEGGGG",
            15 => b"FFLLSSSSYY*QCC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
            16 => b"FFLLSSSSYY*LCC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
            21 => b"FFLLSSSSYY**CCWWLLLLPPPPHHQQRRRRIIMMTTTTNNNKSSSSVVVVAAAADDEEGGGG",
            22 => b"FFLLSS*SYY*LCC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
            23 => b"FF*LSSSSYY**CC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
            24 => b"FFLLSSSSYY**CCWWLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSSKVVVVAAAADDEEGGGG",
            25 => b"FFLLSSSSYY**CCGWLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
            26 => b"FFLLSSSSYY**CC*WLLLAPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
            27 | 28 => b"FFLLSSSSYYQQCCWWLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
            29 => b"FFLLSSSSYYYYCC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
            30 | 31 => b"FFLLSSSSYYEECC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
            33 => b"FFLLSSSSYYY*CCWWLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSSKVVVVAAAADDEEGGGG",
            _ => {
                return Err(SearchError::InvalidOptions(format!(
                    "genetic code {id} is not supported"
                )))
            }
        };
        Ok(Self::from_table(id, table_str))
    }

    fn from_table(id: u8, letters: &[u8; 64]) -> Self {
        let mut table = [NCBISTDAA_X; 64];
        for (slot, &aa) in table.iter_mut().zip(letters.iter()) {
            *slot = aminoacid_to_ncbistdaa(aa);
        }
        GeneticCode { id, table }
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    /// Translate one codon of BLASTNA codes. Any ambiguous base yields `X`.
    #[inline]
    pub fn translate_codon(&self, codon: [u8; 3]) -> u8 {
        let mut idx = 0usize;
        for b in codon {
            if b > 3 {
                return NCBISTDAA_X;
            }
            idx = (idx << 2) | TCAG_INDEX_OF_BLASTNA[b as usize];
        }
        self.table[idx]
    }
}

impl Default for GeneticCode {
    fn default() -> Self {
        Self::standard()
    }
}

const STANDARD: &[u8; 64] = b"FFLLSSSSYY**CC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG";
