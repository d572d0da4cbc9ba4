//! PROSITE-style patterns for pattern-hit searches.
//!
//! Elements are separated by `-`: a residue letter, `x` for any residue,
//! `[ST]` for one of a set, `{P}` for anything but a set, each optionally
//! followed by a repeat count `(n)` or range `(n,m)`. A trailing `.` is
//! accepted.

use crate::core::blast_encoding::{aminoacid_to_ncbistdaa, iupacna_to_blastna, BLASTAA_SIZE};
use crate::error::{Result, SearchError};
use crate::sequence::Alphabet;

#[derive(Debug, Clone, PartialEq, Eq)]
struct PatternElement {
    allowed: [bool; BLASTAA_SIZE],
    min: usize,
    max: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhiPattern {
    source: String,
    elements: Vec<PatternElement>,
}

fn invalid(pattern: &str, why: impl std::fmt::Display) -> SearchError {
    SearchError::InvalidOptions(format!("pattern {pattern:?}: {why}"))
}

fn encode_letter(letter: u8, alphabet: Alphabet) -> u8 {
    match alphabet {
        Alphabet::Protein => aminoacid_to_ncbistdaa(letter),
        Alphabet::Nucleotide => iupacna_to_blastna(letter),
    }
}

fn parse_repeat(pattern: &str, spec: &str) -> Result<(usize, usize)> {
    let parse = |s: &str| {
        s.trim()
            .parse::<usize>()
            .map_err(|_| invalid(pattern, format!("bad repeat count {s:?}")))
    };
    let (min, max) = match spec.split_once(',') {
        Some((lo, hi)) => (parse(lo)?, parse(hi)?),
        None => {
            let n = parse(spec)?;
            (n, n)
        }
    };
    if max == 0 || min > max {
        return Err(invalid(pattern, format!("empty repeat range ({spec})")));
    }
    Ok((min, max))
}

impl PhiPattern {
    pub fn parse(pattern: &str, alphabet: Alphabet) -> Result<Self> {
        let body = pattern.trim().trim_end_matches('.');
        if body.is_empty() {
            return Err(invalid(pattern, "empty pattern"));
        }
        let residues = match alphabet {
            Alphabet::Protein => 1..BLASTAA_SIZE,
            Alphabet::Nucleotide => 0..15,
        };

        let mut elements = Vec::new();
        for token in body.split('-') {
            let token = token.trim();
            let (head, repeat) = match token.find('(') {
                Some(open) => {
                    let close = token
                        .rfind(')')
                        .filter(|&c| c > open)
                        .ok_or_else(|| invalid(pattern, format!("unclosed repeat in {token:?}")))?;
                    (&token[..open], Some(&token[open + 1..close]))
                }
                None => (token, None),
            };
            let mut allowed = [false; BLASTAA_SIZE];
            let bytes = head.as_bytes();
            match bytes {
                [b'x'] | [b'X'] => residues.clone().for_each(|r| allowed[r] = true),
                [b'[', inner @ .., b']'] if !inner.is_empty() => {
                    for &l in inner {
                        allowed[encode_letter(l, alphabet) as usize] = true;
                    }
                }
                [b'{', inner @ .., b'}'] if !inner.is_empty() => {
                    residues.clone().for_each(|r| allowed[r] = true);
                    for &l in inner {
                        allowed[encode_letter(l, alphabet) as usize] = false;
                    }
                }
                [l] if l.is_ascii_alphabetic() => allowed[encode_letter(*l, alphabet) as usize] = true,
                _ => return Err(invalid(pattern, format!("unrecognised element {token:?}"))),
            }
            let (min, max) = match repeat {
                Some(spec) => parse_repeat(pattern, spec)?,
                None => (1, 1),
            };
            elements.push(PatternElement { allowed, min, max });
        }
        Ok(PhiPattern {
            source: pattern.to_string(),
            elements,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn min_length(&self) -> usize {
        self.elements.iter().map(|e| e.min).sum()
    }

    pub fn is_fixed_length(&self) -> bool {
        self.elements.iter().all(|e| e.min == e.max)
    }

    /// Length of the shortest match starting at `start`.
    pub fn match_at(&self, seq: &[u8], start: usize) -> Option<usize> {
        self.match_from(seq, 0, start).map(|end| end - start)
    }

    fn match_from(&self, seq: &[u8], element: usize, pos: usize) -> Option<usize> {
        let Some(e) = self.elements.get(element) else {
            return Some(pos);
        };
        let accepts = |i: usize| seq.get(i).is_some_and(|&r| e.allowed.get(r as usize) == Some(&true));
        if !(pos..pos + e.min).all(accepts) {
            return None;
        }
        let mut count = e.min;
        loop {
            if let Some(end) = self.match_from(seq, element + 1, pos + count) {
                return Some(end);
            }
            if count == e.max || !accepts(pos + count) {
                return None;
            }
            count += 1;
        }
    }

    /// Every `(start, length)` occurrence, one per start position.
    pub fn find_all(&self, seq: &[u8]) -> Vec<(usize, usize)> {
        let min = self.min_length();
        if seq.len() < min {
            return Vec::new();
        }
        (0..=seq.len() - min)
            .filter_map(|start| self.match_at(seq, start).map(|len| (start, len)))
            .collect()
    }
}
