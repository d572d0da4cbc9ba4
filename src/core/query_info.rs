//! Query context table and concatenated query block.
//!
//! All contexts (strands or translated frames of every query) live in one
//! buffer, each followed by a sentinel byte and the first one also preceded
//! by one:
//!
//! ```text
//! [S][context 0][S][context 1][S] ... [S]
//! ```
//!
//! `query_offset` of a context is the absolute buffer position of its first
//! residue, so the next context starts at `query_offset + query_length + 1`.

use std::ops::Range;

use super::blast_encoding::reverse_complement;
use super::blast_program::ProgramType;
use super::blast_stat::{effective_search_space, KarlinBlk};
use super::gencode_singleton::GeneticCode;
use crate::error::{Result, SearchError};
use crate::sequence::{translate_frame, Alphabet, SequenceBlock};

#[derive(Debug, Clone, PartialEq)]
pub struct ContextInfo {
    pub query_offset: usize,
    pub query_length: usize,
    pub query_index: usize,
    pub frame: i8,
    pub eff_searchsp: f64,
}

impl ContextInfo {
    pub fn query_range(&self) -> Range<usize> {
        self.query_offset..self.query_offset + self.query_length
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryInfo {
    contexts: Vec<ContextInfo>,
    /// Length of every caller query before strand/frame expansion.
    query_lengths: Vec<usize>,
    contexts_per_query: usize,
}

impl QueryInfo {
    pub fn num_queries(&self) -> usize {
        self.query_lengths.len()
    }

    pub fn num_contexts(&self) -> usize {
        self.contexts.len()
    }

    pub fn contexts(&self) -> &[ContextInfo] {
        &self.contexts
    }

    pub fn context(&self, index: usize) -> &ContextInfo {
        &self.contexts[index]
    }

    pub fn query_length(&self, query_index: usize) -> usize {
        self.query_lengths[query_index]
    }

    pub fn contexts_of_query(&self, query_index: usize) -> Range<usize> {
        let first = query_index * self.contexts_per_query;
        first..first + self.contexts_per_query
    }

    pub fn max_context_length(&self) -> usize {
        self.contexts.iter().map(|c| c.query_length).max().unwrap_or(0)
    }

    /// Context holding the absolute buffer position `pos`, or `None` for a
    /// sentinel byte.
    pub fn context_containing(&self, pos: usize) -> Option<usize> {
        let idx = self
            .contexts
            .partition_point(|c| c.query_offset <= pos)
            .checked_sub(1)?;
        let ctx = &self.contexts[idx];
        (pos < ctx.query_offset + ctx.query_length).then_some(idx)
    }

    /// Fill the effective search space of every context.
    pub fn set_search_spaces(&mut self, kbps: &[KarlinBlk], db_length: u64, db_num_seqs: u64) {
        for (ctx, kbp) in self.contexts.iter_mut().zip(kbps) {
            ctx.eff_searchsp = if ctx.query_length == 0 {
                0.0
            } else {
                effective_search_space(ctx.query_length as u64, db_length, db_num_seqs, kbp)
            };
        }
    }
}

/// Expand `queries` into the strands/frames `program` searches and lay them
/// out in one sentinel-separated block.
///
/// Queries come in the caller's alphabet: BLASTNA for nucleotide programs,
/// NCBIstdaa otherwise.
pub fn build_query_block(
    program: ProgramType,
    queries: &[Vec<u8>],
    code: &GeneticCode,
) -> Result<(SequenceBlock, QueryInfo)> {
    if queries.is_empty() {
        return Err(SearchError::InvalidQueries("no query sequences".to_string()));
    }
    if let Some(i) = queries.iter().position(|q| q.is_empty()) {
        return Err(SearchError::InvalidQueries(format!("query {i} is empty")));
    }

    let alphabet = if program.is_nucleotide_search() {
        Alphabet::Nucleotide
    } else {
        Alphabet::Protein
    };
    let sentinel = alphabet.sentinel();
    let frames = program.query_frames();

    let mut buffer = vec![sentinel];
    let mut contexts = Vec::with_capacity(queries.len() * frames.len());
    for (query_index, query) in queries.iter().enumerate() {
        for &frame in frames {
            let residues = if program.query_is_translated() {
                translate_frame(query, frame, code)
            } else if frame < 0 {
                reverse_complement(query)
            } else {
                query.clone()
            };
            contexts.push(ContextInfo {
                query_offset: buffer.len(),
                query_length: residues.len(),
                query_index,
                frame,
                eff_searchsp: 0.0,
            });
            buffer.extend_from_slice(&residues);
            buffer.push(sentinel);
        }
    }

    let info = QueryInfo {
        contexts,
        query_lengths: queries.iter().map(Vec::len).collect(),
        contexts_per_query: frames.len(),
    };
    Ok((SequenceBlock::from_buffer(buffer, alphabet), info))
}
