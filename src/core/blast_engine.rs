//! Preliminary search of one subject and the worker loop that drives it.
//!
//! A subject is searched frame by frame; a frame longer than the chunk size
//! is searched in overlapping windows whose HSPs are fused afterwards. The
//! finished HSPs of a subject get statistics, are reaped by e-value, split
//! by query and written to the HSP stream in one go, so a (query, subject)
//! pair is never published partially.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use super::blast_diagnostics::{Diagnostics, RawCutoffs};
use super::blast_extend::{find_initial_hits, ExtendInput, WordScratch};
use super::blast_gapalign::{ungapped_hsp_list, GapAlignState, GappedAligner, GappedInput};
use super::blast_hits::HspList;
use super::blast_lookup::LookupTable;
use super::blast_options::{ExtensionOptions, SearchOptions};
use super::blast_stat::ScoreBlock;
use super::gencode_singleton::GeneticCode;
use super::hsp_stream::HspStream;
use super::link_hsps::{HspStatistics, KarlinStatistics};
use super::query_info::{build_query_block, QueryInfo};
use super::reevaluate::{reevaluate_hsp_list, ReevaluateParams};
use super::seq_src::{SeqSrc, SeqSrcNext};
use crate::error::{Result, SearchError};
use crate::sequence::{Alphabet, SequenceBlock};

/// Where a search stands when the interrupt or progress callback runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchProgress {
    /// Subject (query, for profile searches) being worked on.
    pub current: Option<usize>,
    /// Units finished by all workers so far.
    pub done: u64,
    pub total: u64,
}

/// Returns `true` to stop the search.
pub type InterruptFn = Arc<dyn Fn(&SearchProgress) -> bool + Send + Sync>;
/// Called after every finished subject (query, for profile searches).
pub type ProgressFn = Arc<dyn Fn(&SearchProgress) + Send + Sync>;

/// Cancellation and progress state shared by all workers of one search.
#[derive(Clone, Default)]
pub struct SearchControl {
    interrupt: Option<InterruptFn>,
    progress: Option<ProgressFn>,
    stop: Arc<AtomicBool>,
    done: Arc<AtomicU64>,
    total: u64,
}

impl SearchControl {
    pub fn new(interrupt: Option<InterruptFn>, progress: Option<ProgressFn>, total: u64) -> Self {
        SearchControl {
            interrupt,
            progress,
            total,
            ..Self::default()
        }
    }

    fn snapshot(&self, current: Option<usize>) -> SearchProgress {
        SearchProgress {
            current,
            done: self.done.load(Ordering::Relaxed),
            total: self.total,
        }
    }

    /// `Err(Interrupted)` once the caller asked to stop or a sibling
    /// worker gave up.
    pub fn check(&self, current: Option<usize>) -> Result<()> {
        if self.stop.load(Ordering::Acquire) {
            return Err(SearchError::Interrupted);
        }
        if let Some(interrupt) = &self.interrupt {
            if interrupt(&self.snapshot(current)) {
                if !self.stop.swap(true, Ordering::AcqRel) {
                    log::info!("search interrupted by caller");
                }
                return Err(SearchError::Interrupted);
            }
        }
        Ok(())
    }

    /// Ask every worker to stop at its next check.
    pub fn halt(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    pub fn finish_unit(&self, current: usize) {
        self.done.fetch_add(1, Ordering::Relaxed);
        if let Some(progress) = &self.progress {
            progress(&self.snapshot(Some(current)));
        }
    }
}

impl std::fmt::Debug for SearchControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchControl")
            .field("has_interrupt", &self.interrupt.is_some())
            .field("stopped", &self.is_stopped())
            .field("done", &self.done.load(Ordering::Relaxed))
            .field("total", &self.total)
            .finish()
    }
}

/// State one worker owns for the whole search.
#[derive(Debug)]
pub struct WorkerScratch {
    pub(crate) words: WordScratch,
    pub(crate) gap: GapAlignState,
    pub diagnostics: Diagnostics,
}

impl WorkerScratch {
    pub fn new(engine: &SearchEngine) -> Self {
        Self::from_parts(
            engine.score_block.clone(),
            engine.aligner.clone(),
            &engine.options.extension,
        )
    }

    pub(crate) fn from_parts(
        score_block: ScoreBlock,
        aligner: Option<Arc<dyn GappedAligner>>,
        ext: &ExtensionOptions,
    ) -> Self {
        let mut diagnostics = Diagnostics::new();
        diagnostics.cutoffs = RawCutoffs {
            x_drop_ungapped: ext.xdrop_ungapped,
            ungapped_cutoff: ext.ungapped_cutoff,
        };
        WorkerScratch {
            words: WordScratch::new(),
            gap: GapAlignState::new(score_block, aligner),
            diagnostics,
        }
    }

    pub(crate) fn subject(&mut self) -> SubjectScratch<'_> {
        SubjectScratch {
            words: &mut self.words,
            gap: &self.gap,
            diagnostics: &mut self.diagnostics,
        }
    }
}

/// Borrowed worker state for searching one subject.
pub(crate) struct SubjectScratch<'a> {
    pub(crate) words: &'a mut WordScratch,
    pub(crate) gap: &'a GapAlignState,
    pub(crate) diagnostics: &'a mut Diagnostics,
}

/// Read-only search setup shared by all workers.
pub struct SearchEngine {
    options: SearchOptions,
    query: SequenceBlock,
    query_info: QueryInfo,
    lookup: LookupTable,
    score_block: ScoreBlock,
    genetic_code: GeneticCode,
    statistics: Arc<dyn HspStatistics>,
    aligner: Option<Arc<dyn GappedAligner>>,
}

impl SearchEngine {
    /// Validate `options`, lay out the queries, build the lookup table and
    /// fill the search spaces for a database of `db_length` residues in
    /// `db_num_seqs` sequences.
    pub fn new(
        options: SearchOptions,
        queries: &[Vec<u8>],
        db_length: u64,
        db_num_seqs: u64,
        aligner: Option<Arc<dyn GappedAligner>>,
        statistics: Option<Arc<dyn HspStatistics>>,
    ) -> Result<Self> {
        options.validate()?;
        let program = options.program;
        if program.is_rps() {
            return Err(SearchError::InvalidOptions(format!(
                "{program} searches a profile database"
            )));
        }
        if options.scoring.gapped && aligner.is_none() {
            return Err(SearchError::InvalidOptions(
                "gapped search requested without a gapped aligner".to_string(),
            ));
        }
        let genetic_code = GeneticCode::from_id(options.genetic_code)?;
        let (query, mut query_info) = build_query_block(program, queries, &genetic_code)?;
        let score_block = ScoreBlock::new(program, &options.scoring, query_info.num_contexts())?;
        let lookup = LookupTable::build(&options, &query, &query_info, score_block.matrix())?;

        let mut db_length = options.db_length.unwrap_or(db_length);
        if program.subject_is_translated() {
            db_length /= 3;
        }
        query_info.set_search_spaces(score_block.kbps(), db_length, db_num_seqs);

        log::info!(
            "{program}: {} queries in {} contexts, {} lookup entries, chunk {}/{}",
            query_info.num_queries(),
            query_info.num_contexts(),
            lookup.num_entries(),
            options.chunk.max_chunk,
            options.chunk.overlap
        );
        let statistics = statistics.unwrap_or_else(|| Arc::new(KarlinStatistics::new(options.link)));
        Ok(SearchEngine {
            options,
            query,
            query_info,
            lookup,
            score_block,
            genetic_code,
            statistics,
            aligner,
        })
    }

    /// Assemble an engine from prepared parts, skipping validation.
    pub(crate) fn from_parts(
        options: SearchOptions,
        query: SequenceBlock,
        query_info: QueryInfo,
        lookup: LookupTable,
        score_block: ScoreBlock,
        genetic_code: GeneticCode,
        aligner: Option<Arc<dyn GappedAligner>>,
    ) -> Self {
        let statistics = Arc::new(KarlinStatistics::new(options.link));
        SearchEngine {
            options,
            query,
            query_info,
            lookup,
            score_block,
            genetic_code,
            statistics,
            aligner,
        }
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    pub fn query_info(&self) -> &QueryInfo {
        &self.query_info
    }

    pub fn score_block(&self) -> &ScoreBlock {
        &self.score_block
    }

    /// Alphabet subjects must come in.
    pub fn subject_alphabet(&self) -> Alphabet {
        if self.options.program.subject_is_nucleotide() {
            Alphabet::Nucleotide
        } else {
            Alphabet::Protein
        }
    }

    fn reevaluates(&self, gap: &GapAlignState) -> bool {
        !self.options.scoring.gapped || gap.aligner().is_some_and(|a| a.has_traceback())
    }

    /// Search the current frame of `subject`, chunk by chunk. HSP subject
    /// coordinates are frame coordinates.
    fn search_frame(
        &self,
        subject: &mut SequenceBlock,
        oid: usize,
        scratch: &mut SubjectScratch<'_>,
        control: &SearchControl,
    ) -> Result<HspList> {
        let chunk = self.options.chunk;
        let capacity = self.options.hit_saving.hsp_num_max;
        let gapped = self.options.scoring.gapped;
        let allow_merge = self.reevaluates(scratch.gap);
        let frame = subject.frame();
        let frame_len = subject.frame_sequence().len();
        let gap = scratch.gap;
        let sbp = gap.score_block();

        let mut combined = HspList::new(oid, 0, capacity);
        let mut offset = 0;
        loop {
            subject.set_window(offset, chunk.max_chunk);
            let window = subject.sequence();
            let input = ExtendInput {
                query: self.query.buffer(),
                subject: window,
                subject_offset: offset,
                score_block: sbp,
                nucleotide: self.options.program.is_nucleotide_search(),
            };
            let found = find_initial_hits(
                &self.lookup,
                &input,
                &self.query_info,
                &self.options.extension,
                scratch.words,
                &mut scratch.diagnostics.ungapped,
            );
            if found > 0 {
                let mut list = if gapped {
                    let aligner = gap.aligner().ok_or_else(|| {
                        SearchError::InvalidOptions("gapped search requested without a gapped aligner".to_string())
                    })?;
                    let gapped_input = GappedInput {
                        query: self.query.buffer(),
                        query_info: &self.query_info,
                        subject: window,
                        subject_offset: offset,
                        subject_frame: frame,
                        score_block: sbp,
                        scoring: &self.options.scoring,
                    };
                    let mut list = HspList::new(oid, 0, capacity);
                    aligner.align(&gapped_input, scratch.words.init_hits(), &mut list)?;
                    scratch.diagnostics.gapped.extensions += found as u64;
                    scratch.diagnostics.gapped.good_extensions += list.len() as u64;
                    list.purge_common_endpoints();
                    if sbp.round_down() {
                        list.round_down_odd_scores();
                    }
                    list.sort_by_score();
                    list
                } else {
                    ungapped_hsp_list(scratch.words.init_hits(), &self.query_info, frame, oid, capacity)
                };
                list.shift_subject(offset);
                combined.merge_chunk(list, offset, chunk.overlap, allow_merge);
            }

            if let Err(e) = control.check(Some(oid)) {
                scratch.words.reset();
                return Err(e);
            }
            if offset + chunk.max_chunk >= frame_len {
                break;
            }
            offset += chunk.max_chunk - chunk.overlap;
        }
        Ok(combined)
    }

    /// Search every frame of `subject` and return its HSPs, not yet split
    /// by query. The subject is back at its original view afterwards.
    ///
    /// A subject that cannot be translated fails with `SequenceSource`.
    pub(crate) fn search_subject(
        &self,
        subject: &mut SequenceBlock,
        oid: usize,
        scratch: &mut SubjectScratch<'_>,
        control: &SearchControl,
    ) -> Result<HspList> {
        let program = self.options.program;
        let translate = program.subject_is_translated();
        let params = ReevaluateParams {
            cutoff: self.options.extension.ungapped_cutoff,
            gap_open: self.options.scoring.gap_open,
            gap_extend: self.options.scoring.gap_extend,
            nucleotide: program.is_nucleotide_search(),
        };
        let reevaluate = self.reevaluates(scratch.gap);

        let mut result = HspList::new(oid, 0, self.options.hit_saving.hsp_num_max);
        let mut view = subject.scoped();
        for &frame in program.subject_frames() {
            view.set_frame(frame, &self.genetic_code, translate)
                .map_err(|e| SearchError::SequenceSource(format!("subject {oid} frame {frame}: {e}")))?;
            let mut list = self.search_frame(&mut view, oid, scratch, control)?;
            if reevaluate && !list.is_empty() {
                reevaluate_hsp_list(
                    &mut list,
                    self.query.buffer(),
                    &self.query_info,
                    view.frame_sequence(),
                    scratch.gap.score_block(),
                    &params,
                );
            }
            result.append(list);
            control.check(Some(oid))?;
        }
        Ok(result)
    }

    /// Statistics, e-value reaping and the split into one list per query.
    /// Lists left empty are dropped.
    pub(crate) fn finish_subject(
        &self,
        mut list: HspList,
        subject_length: usize,
        diagnostics: &mut Diagnostics,
    ) -> Vec<HspList> {
        if list.is_empty() {
            return Vec::new();
        }
        diagnostics.ungapped.num_seqs_passed += 1;
        if self.options.scoring.gapped {
            diagnostics.gapped.num_seqs_passed += 1;
        }
        let before = list.len();
        self.statistics
            .calculate(&mut list, &self.query_info, &self.score_block, subject_length);
        list.reap_by_evalue(self.options.hit_saving.evalue_cutoff);
        diagnostics.hsps_reaped += (before - list.len()) as u64;
        split_by_query(list, &self.query_info)
    }

    /// Search one subject from start to finish.
    pub(crate) fn search_one(
        &self,
        subject: &mut SequenceBlock,
        oid: usize,
        scratch: &mut WorkerScratch,
        control: &SearchControl,
    ) -> Result<Vec<HspList>> {
        let list = self.search_subject(subject, oid, &mut scratch.subject(), control)?;
        let subject_length = if self.options.program.subject_is_translated() {
            subject.len() / 3
        } else {
            subject.len()
        };
        Ok(self.finish_subject(list, subject_length, &mut scratch.diagnostics))
    }

    /// Pull subjects from `src` until it runs dry, publishing every finished
    /// subject to `stream`.
    ///
    /// Subjects that cannot be fetched or translated are skipped. Any other
    /// failure ends this worker; the in-flight subject is never published.
    pub fn run_worker(
        &self,
        src: &dyn SeqSrc,
        stream: &HspStream,
        scratch: &mut WorkerScratch,
        control: &SearchControl,
    ) -> Result<()> {
        loop {
            control.check(None)?;
            let oid = match src.iterator_next() {
                SeqSrcNext::Oid(oid) => oid,
                SeqSrcNext::Eof => return Ok(()),
                SeqSrcNext::Error(msg) => return Err(SearchError::SequenceSource(msg)),
            };
            let mut subject = match src.get_sequence(oid) {
                Ok(subject) => subject,
                Err(e) => {
                    log::warn!("skipping subject {oid}: {e}");
                    scratch.diagnostics.subjects_skipped += 1;
                    continue;
                }
            };
            let outcome = self.search_one(&mut subject, oid, scratch, control);
            src.release_sequence(subject);
            match outcome {
                Ok(lists) => {
                    scratch.diagnostics.subjects_searched += 1;
                    for list in lists {
                        stream.write(list)?;
                        scratch.diagnostics.hsplists_published += 1;
                    }
                }
                Err(SearchError::SequenceSource(msg)) => {
                    log::warn!("skipping subject {oid}: {msg}");
                    scratch.diagnostics.subjects_skipped += 1;
                    scratch.words.reset();
                }
                Err(e) => {
                    scratch.words.reset();
                    return Err(e);
                }
            }
            control.finish_unit(oid);
        }
    }
}

/// One list per query, in query order, each sorted by score.
pub(crate) fn split_by_query(list: HspList, info: &QueryInfo) -> Vec<HspList> {
    let oid = list.oid;
    let capacity = list.capacity();
    let mut by_query: BTreeMap<usize, HspList> = BTreeMap::new();
    for hsp in list.into_hsps() {
        let query_index = info.context(hsp.context).query_index;
        by_query
            .entry(query_index)
            .or_insert_with(|| HspList::new(oid, query_index, capacity))
            .save_hsp(hsp);
    }
    by_query
        .into_values()
        .map(|mut list| {
            list.sort_by_score();
            list.update_best_evalue();
            list
        })
        .collect()
}
