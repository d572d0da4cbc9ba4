//! Option bundles for a preliminary search.
//!
//! Every bundle has stock defaults; `SearchOptions::for_program` picks the
//! per-program values and `validate` rejects inconsistent combinations
//! before any subject is touched.

use super::blast_hits::Capacity;
use super::blast_program::ProgramType;
use super::gencode_singleton::GeneticCode;
use crate::error::{Result, SearchError};

pub const DEFAULT_EVALUE: f64 = 10.0;
pub const DEFAULT_HITLIST_SIZE: usize = 500;
/// Subjects longer than this are searched in overlapping chunks.
pub const DEFAULT_MAX_CHUNK: usize = 5_000_000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

pub const WORD_SIZE_PROT: usize = 3;
pub const WORD_SIZE_NUCL: usize = 11;
/// Neighborhood word threshold for protein lookup tables.
pub const WORD_THRESHOLD_PROT: i32 = 11;
pub const TWO_HIT_WINDOW_PROT: usize = 40;
/// Raw ungapped X-drop for BLOSUM62.
pub const X_DROP_UNGAPPED_PROT: i32 = 16;
/// Raw ungapped X-drop for reward 2 / penalty -3.
pub const X_DROP_UNGAPPED_NUCL: i32 = 22;
pub const UNGAPPED_CUTOFF_PROT: i32 = 20;
pub const UNGAPPED_CUTOFF_NUCL: i32 = 26;

pub const GAP_PROB_UNGAPPED: f64 = 0.5;
pub const GAP_PROB_GAPPED: f64 = 1.0;
pub const GAP_DECAY_RATE_UNGAPPED: f64 = 0.5;
pub const GAP_DECAY_RATE_GAPPED: f64 = 0.1;
pub const LINK_OVERLAP_SIZE: usize = 9;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoringOptions {
    pub matrix_name: String,
    pub reward: i32,
    pub penalty: i32,
    pub gap_open: i32,
    pub gap_extend: i32,
    /// Run the gapped aligner on initial hits.
    pub gapped: bool,
}

impl ScoringOptions {
    pub fn for_program(program: ProgramType) -> Self {
        if program.is_nucleotide_search() {
            ScoringOptions {
                matrix_name: String::new(),
                reward: 2,
                penalty: -3,
                gap_open: 5,
                gap_extend: 2,
                gapped: false,
            }
        } else {
            ScoringOptions {
                matrix_name: "BLOSUM62".to_string(),
                reward: 0,
                penalty: 0,
                gap_open: 11,
                gap_extend: 1,
                gapped: false,
            }
        }
    }
}

impl Default for ScoringOptions {
    fn default() -> Self {
        Self::for_program(ProgramType::Blastp)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionOptions {
    pub word_size: usize,
    /// Protein neighborhood threshold; 0 means exact word matches only.
    pub word_threshold: i32,
    /// Two hits on one diagonal within this window trigger extension;
    /// 0 extends every single hit.
    pub two_hit_window: usize,
    pub xdrop_ungapped: i32,
    /// Ungapped extensions scoring below this are discarded.
    pub ungapped_cutoff: i32,
}

impl ExtensionOptions {
    pub fn for_program(program: ProgramType) -> Self {
        if program.is_nucleotide_search() {
            ExtensionOptions {
                word_size: WORD_SIZE_NUCL,
                word_threshold: 0,
                two_hit_window: 0,
                xdrop_ungapped: X_DROP_UNGAPPED_NUCL,
                ungapped_cutoff: UNGAPPED_CUTOFF_NUCL,
            }
        } else {
            ExtensionOptions {
                word_size: WORD_SIZE_PROT,
                word_threshold: WORD_THRESHOLD_PROT,
                two_hit_window: TWO_HIT_WINDOW_PROT,
                xdrop_ungapped: X_DROP_UNGAPPED_PROT,
                ungapped_cutoff: UNGAPPED_CUTOFF_PROT,
            }
        }
    }
}

impl Default for ExtensionOptions {
    fn default() -> Self {
        Self::for_program(ProgramType::Blastp)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HitSavingOptions {
    pub evalue_cutoff: f64,
    /// Subjects kept per query.
    pub hitlist_size: usize,
    /// HSPs an HSP list may hold while a subject is being searched.
    pub hsp_num_max: Capacity,
    /// HSPs per subject kept in the final results; `None` keeps all.
    pub max_hsps_per_subject: Option<usize>,
    /// Upper bound on HSPs retained by a sorted stream.
    pub total_hsp_limit: Option<usize>,
}

impl Default for HitSavingOptions {
    fn default() -> Self {
        HitSavingOptions {
            evalue_cutoff: DEFAULT_EVALUE,
            hitlist_size: DEFAULT_HITLIST_SIZE,
            hsp_num_max: Capacity::Unbounded,
            max_hsps_per_subject: None,
            total_hsp_limit: None,
        }
    }
}

/// Chunking of oversized subjects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkOptions {
    pub max_chunk: usize,
    pub overlap: usize,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        ChunkOptions {
            max_chunk: DEFAULT_MAX_CHUNK,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// Sum-statistics linking parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkParams {
    pub gap_prob: f64,
    pub gap_decay_rate: f64,
    /// Overlap tolerated between consecutive linked HSPs.
    pub overlap_size: usize,
}

impl LinkParams {
    pub fn ungapped() -> Self {
        LinkParams {
            gap_prob: GAP_PROB_UNGAPPED,
            gap_decay_rate: GAP_DECAY_RATE_UNGAPPED,
            overlap_size: LINK_OVERLAP_SIZE,
        }
    }

    pub fn gapped() -> Self {
        LinkParams {
            gap_prob: GAP_PROB_GAPPED,
            gap_decay_rate: GAP_DECAY_RATE_GAPPED,
            ..Self::ungapped()
        }
    }
}

/// How the HSP stream holds finished subjects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamMode {
    /// Collect everything, read back sorted by query and e-value.
    #[default]
    Sorted,
    /// Hand lists to a reader in write order; writers block once `capacity`
    /// lists are waiting.
    Fifo { capacity: usize },
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub program: ProgramType,
    pub scoring: ScoringOptions,
    pub extension: ExtensionOptions,
    pub hit_saving: HitSavingOptions,
    pub chunk: ChunkOptions,
    pub link: Option<LinkParams>,
    pub genetic_code: u8,
    /// Worker threads; 0 means one per available CPU.
    pub num_threads: usize,
    pub stream: StreamMode,
    /// PROSITE-style pattern for PHI searches.
    pub phi_pattern: Option<String>,
    /// Overrides the database length used for the search space.
    pub db_length: Option<u64>,
}

impl SearchOptions {
    pub fn for_program(program: ProgramType) -> Self {
        let link = match program {
            ProgramType::Tblastx => Some(LinkParams::ungapped()),
            _ => None,
        };
        SearchOptions {
            program,
            scoring: ScoringOptions::for_program(program),
            extension: ExtensionOptions::for_program(program),
            hit_saving: HitSavingOptions::default(),
            chunk: ChunkOptions::default(),
            link,
            genetic_code: 1,
            num_threads: 1,
            stream: StreamMode::default(),
            phi_pattern: None,
            db_length: None,
        }
    }

    /// Resolved worker count.
    pub fn threads(&self) -> usize {
        if self.num_threads == 0 {
            num_cpus::get().max(1)
        } else {
            self.num_threads
        }
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(SearchError::InvalidOptions(msg));

        let ext = &self.extension;
        let word_range = if self.program.is_nucleotide_search() {
            4..=15
        } else {
            2..=5
        };
        if !word_range.contains(&ext.word_size) {
            return invalid(format!(
                "word size {} is outside {}..={} for {}",
                ext.word_size,
                word_range.start(),
                word_range.end(),
                self.program
            ));
        }
        if ext.xdrop_ungapped <= 0 {
            return invalid("ungapped X-drop must be positive".to_string());
        }
        if !(self.hit_saving.evalue_cutoff > 0.0) {
            return invalid(format!(
                "e-value cutoff {} must be positive",
                self.hit_saving.evalue_cutoff
            ));
        }
        if self.hit_saving.hitlist_size == 0 {
            return invalid("hit list size must be at least 1".to_string());
        }
        if self.hit_saving.hsp_num_max == Capacity::AtMost(0) {
            return invalid("HSP capacity must be at least 1".to_string());
        }
        if self.chunk.max_chunk == 0 || self.chunk.overlap >= self.chunk.max_chunk {
            return invalid(format!(
                "chunk overlap {} must be smaller than chunk size {}",
                self.chunk.overlap, self.chunk.max_chunk
            ));
        }
        if self.chunk.overlap < ext.word_size {
            return invalid(format!(
                "chunk overlap {} is shorter than the word size {}",
                self.chunk.overlap, ext.word_size
            ));
        }
        if let StreamMode::Fifo { capacity: 0 } = self.stream {
            return invalid("FIFO stream capacity must be at least 1".to_string());
        }
        if let Some(link) = &self.link {
            if !(0.0..1.0).contains(&link.gap_decay_rate) {
                return invalid("gap decay rate must lie in [0, 1)".to_string());
            }
        }
        if self.program.is_phi() && self.phi_pattern.is_none() {
            return invalid(format!("{} requires a pattern", self.program));
        }
        if self.program.query_is_translated() || self.program.subject_is_translated() {
            GeneticCode::from_id(self.genetic_code)?;
        }
        Ok(())
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::for_program(ProgramType::Blastp)
    }
}
