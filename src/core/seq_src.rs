//! Subject sequence sources.
//!
//! Workers pull subject ids from one shared source through
//! `iterator_next`, which must be safe to call from several threads at
//! once. `InMemorySeqSrc` keeps an atomic cursor over encoded sequences
//! loaded from FASTA.

use std::fs::File;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use bio::io::fasta;

use super::blast_encoding::{encode_nucleotide, encode_protein};
use crate::error::{Result, SearchError};
use crate::sequence::{Alphabet, SequenceBlock};

/// Outcome of asking a source for the next subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeqSrcNext {
    Oid(usize),
    Eof,
    /// The source cannot continue; stops the whole search.
    Error(String),
}

pub trait SeqSrc: Send + Sync {
    fn name(&self) -> &str;

    /// Residues over all sequences.
    fn total_length(&self) -> u64;

    fn num_sequences(&self) -> usize;

    fn max_sequence_length(&self) -> usize;

    fn avg_sequence_length(&self) -> usize {
        match self.num_sequences() {
            0 => 0,
            n => (self.total_length() / n as u64) as usize,
        }
    }

    fn alphabet(&self) -> Alphabet;

    fn iterator_next(&self) -> SeqSrcNext;

    /// Start the next pass over the source from the first sequence.
    fn reset_iterator(&self);

    /// Subject `oid`, wrapped in sentinels. A failure here only skips the
    /// subject.
    fn get_sequence(&self, oid: usize) -> Result<SequenceBlock>;

    /// Hand a subject back once the search is done with it.
    fn release_sequence(&self, _block: SequenceBlock) {}

    fn sequence_id(&self, oid: usize) -> Option<&str>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SubjectRecord {
    id: String,
    residues: Vec<u8>,
}

#[derive(Debug)]
pub struct InMemorySeqSrc {
    name: String,
    alphabet: Alphabet,
    records: Vec<SubjectRecord>,
    total_length: u64,
    cursor: AtomicUsize,
}

impl InMemorySeqSrc {
    /// Sequences already in the alphabet's encoding, with their ids.
    pub fn new(name: impl Into<String>, alphabet: Alphabet, sequences: Vec<(String, Vec<u8>)>) -> Self {
        let records: Vec<SubjectRecord> = sequences
            .into_iter()
            .map(|(id, residues)| SubjectRecord { id, residues })
            .collect();
        let total_length = records.iter().map(|r| r.residues.len() as u64).sum();
        InMemorySeqSrc {
            name: name.into(),
            alphabet,
            records,
            total_length,
            cursor: AtomicUsize::new(0),
        }
    }

    /// ASCII sequences, encoded on the way in.
    pub fn from_ascii<I, S>(name: impl Into<String>, alphabet: Alphabet, sequences: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<u8>)>,
        S: Into<String>,
    {
        let encoded = sequences
            .into_iter()
            .map(|(id, seq)| (id.into(), encode(alphabet, &seq)))
            .collect();
        Self::new(name, alphabet, encoded)
    }

    pub fn from_fasta(path: &Path, alphabet: Alphabet) -> Result<Self> {
        let sequences = read_fasta(path, alphabet)?;
        log::debug!("loaded {} subjects from {}", sequences.len(), path.display());
        Ok(Self::new(path.display().to_string(), alphabet, sequences))
    }
}

impl SeqSrc for InMemorySeqSrc {
    fn name(&self) -> &str {
        &self.name
    }

    fn total_length(&self) -> u64 {
        self.total_length
    }

    fn num_sequences(&self) -> usize {
        self.records.len()
    }

    fn max_sequence_length(&self) -> usize {
        self.records.iter().map(|r| r.residues.len()).max().unwrap_or(0)
    }

    fn alphabet(&self) -> Alphabet {
        self.alphabet
    }

    fn iterator_next(&self) -> SeqSrcNext {
        let oid = self.cursor.fetch_add(1, Ordering::Relaxed);
        if oid < self.records.len() {
            SeqSrcNext::Oid(oid)
        } else {
            SeqSrcNext::Eof
        }
    }

    fn reset_iterator(&self) {
        self.cursor.store(0, Ordering::Relaxed);
    }

    fn get_sequence(&self, oid: usize) -> Result<SequenceBlock> {
        let record = self
            .records
            .get(oid)
            .ok_or_else(|| SearchError::SequenceSource(format!("{}: no subject {oid}", self.name)))?;
        if record.residues.is_empty() {
            return Err(SearchError::SequenceSource(format!(
                "{}: subject {} is empty",
                self.name, record.id
            )));
        }
        Ok(SequenceBlock::with_sentinels(record.residues.clone(), self.alphabet))
    }

    fn sequence_id(&self, oid: usize) -> Option<&str> {
        self.records.get(oid).map(|r| r.id.as_str())
    }
}

fn encode(alphabet: Alphabet, ascii: &[u8]) -> Vec<u8> {
    match alphabet {
        Alphabet::Nucleotide => encode_nucleotide(ascii),
        Alphabet::Protein => encode_protein(ascii),
    }
}

/// Read every record of a FASTA file as `(id, encoded residues)`.
pub fn read_fasta(path: &Path, alphabet: Alphabet) -> Result<Vec<(String, Vec<u8>)>> {
    let reader = fasta::Reader::new(File::open(path)?);
    reader
        .records()
        .map(|record| {
            let record = record?;
            Ok((record.id().to_string(), encode(alphabet, record.seq())))
        })
        .collect()
}
