//! Encoded sequence buffers.
//!
//! A `SequenceBlock` owns the residues of one query set or one subject. The
//! search engine narrows its view in place (frame, then chunk window) and
//! the view is restored to the original bounds before the block goes back to
//! the sequence source. Translated frames and the reverse strand are built
//! lazily and cached in the block.

pub mod translation;

use std::ops::{Deref, DerefMut};

use crate::core::blast_encoding::{reverse_complement, NUCLEOTIDE_SENTINEL, PROTEIN_SENTINEL};
use crate::core::gencode_singleton::GeneticCode;
use crate::error::{Result, SearchError};

pub use translation::{frame_length, protein_to_nucleotide_range, translate_frame};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alphabet {
    /// BLASTNA codes.
    Nucleotide,
    /// NCBIstdaa codes.
    Protein,
}

impl Alphabet {
    pub fn sentinel(self) -> u8 {
        match self {
            Alphabet::Nucleotide => NUCLEOTIDE_SENTINEL,
            Alphabet::Protein => PROTEIN_SENTINEL,
        }
    }
}

/// Cache slot of the untranslated reverse strand.
const REVERSE_STRAND_SLOT: usize = 6;

/// Index into the cached frame buffers: frames 1,2,3,-1,-2,-3.
fn frame_slot(frame: i8) -> Option<usize> {
    match frame {
        1..=3 => Some(frame as usize - 1),
        -3..=-1 => Some(2 + frame.unsigned_abs() as usize),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct View {
    frame: i8,
    /// `None` reads the original residues.
    slot: Option<usize>,
    offset: usize,
    len: usize,
}

#[derive(Debug, Clone)]
pub struct SequenceBlock {
    buffer: Vec<u8>,
    /// Position of the first residue in `buffer` (1 with sentinels).
    start: usize,
    length: usize,
    alphabet: Alphabet,
    original_frame: i8,
    view: View,
    /// Lazily built frame buffers (translations or the reverse strand).
    frames: [Option<Vec<u8>>; 7],
}

impl SequenceBlock {
    pub fn new(residues: Vec<u8>, alphabet: Alphabet) -> Self {
        let length = residues.len();
        Self::from_parts(residues, 0, length, alphabet)
    }

    /// Wrap `residues` in one sentinel byte on each side.
    pub fn with_sentinels(residues: Vec<u8>, alphabet: Alphabet) -> Self {
        let length = residues.len();
        let sentinel = alphabet.sentinel();
        let mut buffer = Vec::with_capacity(length + 2);
        buffer.push(sentinel);
        buffer.extend_from_slice(&residues);
        buffer.push(sentinel);
        Self::from_parts(buffer, 1, length, alphabet)
    }

    /// Take a prebuilt buffer (such as a concatenated query set) whose
    /// residues are addressed by absolute position.
    pub fn from_buffer(buffer: Vec<u8>, alphabet: Alphabet) -> Self {
        let length = buffer.len();
        Self::from_parts(buffer, 0, length, alphabet)
    }

    fn from_parts(buffer: Vec<u8>, start: usize, length: usize, alphabet: Alphabet) -> Self {
        let original_frame = match alphabet {
            Alphabet::Nucleotide => 1,
            Alphabet::Protein => 0,
        };
        SequenceBlock {
            buffer,
            start,
            length,
            alphabet,
            original_frame,
            view: View {
                frame: original_frame,
                slot: None,
                offset: 0,
                len: length,
            },
            frames: Default::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn alphabet(&self) -> Alphabet {
        self.alphabet
    }

    /// Original residues regardless of the current view.
    pub fn residues(&self) -> &[u8] {
        &self.buffer[self.start..self.start + self.length]
    }

    /// Whole buffer including sentinel bytes.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn frame(&self) -> i8 {
        self.view.frame
    }

    /// Residues of the current frame, ignoring the chunk window.
    pub fn frame_sequence(&self) -> &[u8] {
        match self.view.slot.and_then(|s| self.frames[s].as_deref()) {
            Some(frame) => frame,
            None => self.residues(),
        }
    }

    /// Residues visible through the current frame and chunk window.
    pub fn sequence(&self) -> &[u8] {
        let frame = self.frame_sequence();
        let end = (self.view.offset + self.view.len).min(frame.len());
        &frame[self.view.offset.min(end)..end]
    }

    /// Start of the chunk window within the current frame.
    pub fn window_offset(&self) -> usize {
        self.view.offset
    }

    /// Switch the view to `frame`, translating or reverse-complementing on
    /// first use. Protein blocks only accept frame 0.
    pub fn set_frame(&mut self, frame: i8, code: &GeneticCode, translate: bool) -> Result<()> {
        let slot = match (self.alphabet, frame, translate) {
            (Alphabet::Protein, 0, _) => None,
            (Alphabet::Nucleotide, 1, false) => None,
            (Alphabet::Nucleotide, -1, false) => Some(REVERSE_STRAND_SLOT),
            (Alphabet::Nucleotide, f, true) => Some(frame_slot(f).ok_or_else(|| {
                SearchError::Internal(format!("frame {f} is not a translation frame"))
            })?),
            (alphabet, f, _) => {
                return Err(SearchError::Internal(format!(
                    "frame {f} is not valid for a {alphabet:?} sequence"
                )))
            }
        };
        if let Some(s) = slot {
            if self.frames[s].is_none() {
                let built = if translate {
                    translate_frame(self.residues(), frame, code)
                } else {
                    reverse_complement(self.residues())
                };
                self.frames[s] = Some(built);
            }
        }
        self.view = View {
            frame,
            slot,
            offset: 0,
            len: 0,
        };
        self.view.len = self.frame_sequence().len();
        Ok(())
    }

    /// Narrow the view to `[offset, offset + len)` of the current frame.
    pub fn set_window(&mut self, offset: usize, len: usize) {
        let frame_len = self.frame_sequence().len();
        let offset = offset.min(frame_len);
        self.view.offset = offset;
        self.view.len = len.min(frame_len - offset);
    }

    /// Back to the original residues, frame and bounds.
    pub fn restore(&mut self) {
        self.view = View {
            frame: self.original_frame,
            slot: None,
            offset: 0,
            len: self.length,
        };
    }

    /// Drop cached frame buffers.
    pub fn release_translations(&mut self) {
        self.restore();
        self.frames = Default::default();
    }

    /// Borrow the block with a guard that restores the original view when
    /// it goes out of scope.
    pub fn scoped(&mut self) -> RestoreOnDrop<'_> {
        RestoreOnDrop { block: self }
    }
}

pub struct RestoreOnDrop<'a> {
    block: &'a mut SequenceBlock,
}

impl Deref for RestoreOnDrop<'_> {
    type Target = SequenceBlock;

    fn deref(&self) -> &SequenceBlock {
        &*self.block
    }
}

impl DerefMut for RestoreOnDrop<'_> {
    fn deref_mut(&mut self) -> &mut SequenceBlock {
        &mut *self.block
    }
}

impl Drop for RestoreOnDrop<'_> {
    fn drop(&mut self) {
        self.block.restore();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::blast_encoding::encode_nucleotide;

    #[test]
    fn test_sentinels_surround_residues() {
        let block = SequenceBlock::with_sentinels(vec![1, 2, 3], Alphabet::Protein);
        assert_eq!(block.buffer(), &[0, 1, 2, 3, 0]);
        assert_eq!(block.residues(), &[1, 2, 3]);
        assert_eq!(block.sequence(), &[1, 2, 3]);
    }

    #[test]
    fn test_window_then_restore() {
        let mut block = SequenceBlock::new((0..20).collect(), Alphabet::Protein);
        block.set_window(5, 10);
        assert_eq!(block.sequence(), &(5..15).collect::<Vec<u8>>()[..]);
        block.set_window(15, 10);
        assert_eq!(block.sequence().len(), 5);
        block.restore();
        assert_eq!(block.sequence().len(), 20);
    }

    #[test]
    fn test_translation_is_lazy_and_restored_by_guard() {
        let code = GeneticCode::standard();
        let mut block =
            SequenceBlock::new(encode_nucleotide(b"ATGGCCAAATAA"), Alphabet::Nucleotide);
        {
            let mut guard = block.scoped();
            guard.set_frame(1, &code, true).unwrap();
            assert_eq!(guard.sequence().len(), 4);
            guard.set_frame(-2, &code, true).unwrap();
            assert_eq!(guard.frame(), -2);
        }
        assert_eq!(block.frame(), 1);
        assert_eq!(block.sequence().len(), 12);
        assert!(block.frames[0].is_some());
        block.release_translations();
        assert!(block.frames.iter().all(Option::is_none));
    }

    #[test]
    fn test_protein_block_rejects_frames() {
        let code = GeneticCode::standard();
        let mut block = SequenceBlock::new(vec![1, 2, 3], Alphabet::Protein);
        assert!(block.set_frame(2, &code, true).is_err());
        block.set_frame(0, &code, false).unwrap();
    }

    #[test]
    fn test_minus_strand_view() {
        let code = GeneticCode::standard();
        let mut block = SequenceBlock::new(encode_nucleotide(b"AACG"), Alphabet::Nucleotide);
        block.set_frame(-1, &code, false).unwrap();
        assert_eq!(block.sequence(), &encode_nucleotide(b"CGTT")[..]);
    }
}
