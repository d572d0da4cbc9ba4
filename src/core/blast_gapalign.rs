//! Gapped alignment seam and initial-hit conversion.
//!
//! The crate carries no dynamic-programming recurrence; a gapped search
//! plugs one in through `GappedAligner`. Ungapped searches turn initial
//! hits into HSPs directly with `ungapped_hsp_list`.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use super::blast_extend::InitHitList;
use super::blast_hits::{Capacity, Hsp, HspList, PatternInfo, SeqSeg};
use super::blast_options::ScoringOptions;
use super::blast_stat::{Pssm, ScoreBlock};
use super::query_info::QueryInfo;
use crate::error::Result;

/// Everything an aligner sees for one chunk window.
pub struct GappedInput<'a> {
    /// Whole query block, sentinels included.
    pub query: &'a [u8],
    pub query_info: &'a QueryInfo,
    /// Current chunk window of the subject frame.
    pub subject: &'a [u8],
    /// Start of the window in its frame.
    pub subject_offset: usize,
    pub subject_frame: i8,
    pub score_block: &'a ScoreBlock,
    pub scoring: &'a ScoringOptions,
}

/// Turns initial hits into gapped HSPs.
///
/// HSPs written to `out` use context-relative query offsets and
/// window-relative subject offsets.
pub trait GappedAligner: Send + Sync {
    /// Whether produced HSPs already carry a full edit script, so chunk
    /// results can be fused and re-scored.
    fn has_traceback(&self) -> bool {
        false
    }

    fn align(&self, input: &GappedInput<'_>, hits: &InitHitList, out: &mut HspList) -> Result<()>;
}

/// Scoring state one worker uses for gapped work: its own `ScoreBlock`
/// (profile rows may be attached to it) and the plugged-in aligner.
#[derive(Clone)]
pub struct GapAlignState {
    score_block: ScoreBlock,
    aligner: Option<Arc<dyn GappedAligner>>,
}

impl GapAlignState {
    pub fn new(score_block: ScoreBlock, aligner: Option<Arc<dyn GappedAligner>>) -> Self {
        GapAlignState {
            score_block,
            aligner,
        }
    }

    pub fn score_block(&self) -> &ScoreBlock {
        &self.score_block
    }

    pub fn aligner(&self) -> Option<&dyn GappedAligner> {
        self.aligner.as_deref()
    }

    /// Score with `pssm` until the guard is dropped, then go back to the
    /// previous scoring mode.
    pub fn with_pssm(&mut self, pssm: Arc<Pssm>) -> PssmGuard<'_> {
        let previous = self.score_block.attach_pssm(pssm);
        PssmGuard {
            state: self,
            previous,
        }
    }
}

impl std::fmt::Debug for GapAlignState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GapAlignState")
            .field("score_block", &self.score_block)
            .field("has_aligner", &self.aligner.is_some())
            .finish()
    }
}

pub struct PssmGuard<'a> {
    state: &'a mut GapAlignState,
    previous: Option<Arc<Pssm>>,
}

impl Deref for PssmGuard<'_> {
    type Target = GapAlignState;

    fn deref(&self) -> &GapAlignState {
        &*self.state
    }
}

impl DerefMut for PssmGuard<'_> {
    fn deref_mut(&mut self) -> &mut GapAlignState {
        &mut *self.state
    }
}

impl Drop for PssmGuard<'_> {
    fn drop(&mut self) {
        let sbp = &mut self.state.score_block;
        match self.previous.take() {
            Some(previous) => {
                sbp.attach_pssm(previous);
            }
            None => {
                sbp.detach_pssm();
            }
        }
    }
}

/// One ungapped HSP per initial hit, coordinates moved into the context
/// (query) and left relative to the window (subject).
pub fn ungapped_hsp_list(
    hits: &InitHitList,
    info: &QueryInfo,
    subject_frame: i8,
    oid: usize,
    capacity: Capacity,
) -> HspList {
    let mut list = HspList::new(oid, 0, capacity);
    for hit in hits.hits() {
        let Some(context) = info.context_containing(hit.q_off) else {
            continue;
        };
        let ctx = info.context(context);
        let q_start = hit.q_off - ctx.query_offset;
        let mut query = SeqSeg::new(ctx.frame, q_start, q_start + hit.len);
        let mut subject = SeqSeg::new(subject_frame, hit.s_off, hit.s_off + hit.len);
        query.gapped_start = q_start + hit.len / 2;
        subject.gapped_start = hit.s_off + hit.len / 2;
        let mut hsp = Hsp::new(hit.score, context, query, subject);
        hsp.pattern = hit.pattern.map(|(offset, length)| PatternInfo {
            offset: offset - ctx.query_offset,
            length,
        });
        list.save_hsp(hsp);
    }
    list
}
