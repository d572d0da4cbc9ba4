//! Profile database search.
//!
//! The profiles are laid end to end into one pseudo-subject and each
//! caller query is scanned against it through the database's lookup table,
//! scoring with the profile rows. Workers take whole queries; the interrupt
//! predicate is consulted once per query.
//!
//! E-values cannot be computed while searching, so published HSPs carry raw
//! scores only. `finalize_rps_results` fills in e-values from the
//! database's parameters once the stream has been drained.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::blast_engine::{SearchControl, SearchEngine, SubjectScratch, WorkerScratch};
use super::blast_gapalign::GappedAligner;
use super::blast_hits::{Capacity, HspList};
use super::blast_lookup::LookupTable;
use super::blast_options::{ScoringOptions, SearchOptions};
use super::blast_results::HspResults;
use super::blast_stat::{effective_search_space_capped, ideal_karlin_blk, KarlinBlk, ScoreBlock};
use super::gencode_singleton::GeneticCode;
use super::hsp_stream::HspStream;
use super::query_info::{build_query_block, QueryInfo};
use super::rps_files::{RpsDatabase, RpsParams};
use crate::error::{Result, SearchError};
use crate::sequence::{Alphabet, SequenceBlock};

/// Setup shared by the workers of one profile search.
pub struct RpsSearch<'a> {
    db: &'a RpsDatabase,
    options: SearchOptions,
    queries: &'a [Vec<u8>],
    genetic_code: GeneticCode,
    /// Contexts of all queries, numbered the way published HSPs are.
    query_info: QueryInfo,
    score_block: ScoreBlock,
    subject: SequenceBlock,
    aligner: Option<Arc<dyn GappedAligner>>,
    next_query: AtomicUsize,
}

impl<'a> RpsSearch<'a> {
    pub fn new(
        db: &'a RpsDatabase,
        mut options: SearchOptions,
        queries: &'a [Vec<u8>],
        aligner: Option<Arc<dyn GappedAligner>>,
    ) -> Result<Self> {
        let program = options.program;
        if !program.is_rps() {
            return Err(SearchError::InvalidOptions(format!(
                "{program} cannot search a profile database"
            )));
        }
        apply_database_scoring(&mut options.scoring, db.params());
        let word_size = db.lookup().word_size();
        if options.extension.word_size != word_size {
            log::debug!(
                "using the profile database word size {word_size} instead of {}",
                options.extension.word_size
            );
            options.extension.word_size = word_size;
        }
        options.validate()?;
        if options.scoring.gapped && aligner.is_none() {
            return Err(SearchError::InvalidOptions(
                "gapped search requested without a gapped aligner".to_string(),
            ));
        }
        let genetic_code = GeneticCode::from_id(options.genetic_code)?;
        let (_, query_info) = build_query_block(program, queries, &genetic_code)?;
        let score_block = ScoreBlock::new(program, &options.scoring, program.contexts_per_query())?;
        let subject = SequenceBlock::from_buffer(db.profiles().db_sequence(), Alphabet::Protein);
        log::info!(
            "{program}: {} queries against {} profiles ({} positions)",
            queries.len(),
            db.profiles().num_profiles(),
            db.profiles().total_length()
        );
        Ok(RpsSearch {
            db,
            options,
            queries,
            genetic_code,
            query_info,
            score_block,
            subject,
            aligner,
            next_query: AtomicUsize::new(0),
        })
    }

    pub fn num_queries(&self) -> usize {
        self.queries.len()
    }

    pub fn query_info(&self) -> &QueryInfo {
        &self.query_info
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    pub fn new_scratch(&self) -> WorkerScratch {
        WorkerScratch::from_parts(
            self.score_block.clone(),
            self.aligner.clone(),
            &self.options.extension,
        )
    }

    /// Search one caller query against every profile. Returns one list per
    /// profile with hits, tagged with `query_index`.
    pub fn search_query(
        &self,
        query_index: usize,
        subject: &mut SequenceBlock,
        scratch: &mut WorkerScratch,
    ) -> Result<Vec<HspList>> {
        let query = self.queries.get(query_index).ok_or_else(|| {
            SearchError::Internal(format!("query {query_index} of {}", self.queries.len()))
        })?;
        let (block, info) = build_query_block(
            self.options.program,
            std::slice::from_ref(query),
            &self.genetic_code,
        )?;
        // the per-subject cap applies to each profile, after the split
        let mut engine_options = self.options.clone();
        engine_options.hit_saving.hsp_num_max = Capacity::Unbounded;
        let engine = SearchEngine::from_parts(
            engine_options,
            block,
            info,
            LookupTable::Rps(self.db.lookup().clone()),
            self.score_block.clone(),
            self.genetic_code.clone(),
            self.aligner.clone(),
        );

        let WorkerScratch {
            words,
            gap,
            diagnostics,
        } = scratch;
        let list = {
            let profile_scoring = gap.with_pssm(Arc::clone(self.db.profiles().pssm()));
            let mut sub = SubjectScratch {
                words: &mut *words,
                gap: &*profile_scoring,
                diagnostics: &mut *diagnostics,
            };
            engine.search_subject(subject, 0, &mut sub, &SearchControl::default())?
        };
        if !list.is_empty() {
            diagnostics.ungapped.num_seqs_passed += 1;
        }
        Ok(self.split_by_profile(list, query_index))
    }

    /// Move database coordinates into the profile each HSP lies in.
    fn split_by_profile(&self, list: HspList, query_index: usize) -> Vec<HspList> {
        let profiles = self.db.profiles();
        let first_context = query_index * self.options.program.contexts_per_query();
        let capacity = self.options.hit_saving.hsp_num_max;
        let mut by_profile: BTreeMap<usize, HspList> = BTreeMap::new();
        for mut hsp in list.into_hsps() {
            let Some((profile, _)) = profiles.locate(hsp.subject.offset) else {
                log::warn!("dropping HSP at database position {} outside any profile", hsp.subject.offset);
                continue;
            };
            let start = profiles.profile_start(profile);
            hsp.subject.offset -= start;
            hsp.subject.end -= start;
            hsp.subject.gapped_start = hsp.subject.gapped_start.saturating_sub(start);
            hsp.context += first_context;
            by_profile
                .entry(profile)
                .or_insert_with(|| HspList::new(profile, query_index, capacity))
                .save_hsp(hsp);
        }
        by_profile
            .into_values()
            .map(|mut list| {
                list.sort_by_score();
                list
            })
            .collect()
    }

    /// Take queries until none are left, publishing each query's lists.
    pub fn run_worker(&self, stream: &HspStream, scratch: &mut WorkerScratch, control: &SearchControl) -> Result<()> {
        let mut subject = self.subject.clone();
        loop {
            let query_index = self.next_query.fetch_add(1, Ordering::Relaxed);
            if query_index >= self.queries.len() {
                return Ok(());
            }
            control.check(Some(query_index))?;
            let lists = self.search_query(query_index, &mut subject, scratch)?;
            scratch.diagnostics.subjects_searched += 1;
            for list in lists {
                stream.write(list)?;
                scratch.diagnostics.hsplists_published += 1;
            }
            control.finish_unit(query_index);
        }
    }
}

/// Profile rows were scored with the database's matrix and gap costs, so
/// those replace the caller's. An unsupported matrix is rejected when the
/// score block is built.
fn apply_database_scoring(scoring: &mut ScoringOptions, params: &RpsParams) {
    let same = scoring.matrix_name.eq_ignore_ascii_case(&params.matrix_name)
        && scoring.gap_open == params.gap_open
        && scoring.gap_extend == params.gap_extend;
    if !same {
        log::info!(
            "profile database was built with {} {}/{}, overriding {} {}/{}",
            params.matrix_name,
            params.gap_open,
            params.gap_extend,
            scoring.matrix_name,
            scoring.gap_open,
            scoring.gap_extend
        );
    }
    scoring.matrix_name = params.matrix_name.clone();
    scoring.gap_open = params.gap_open;
    scoring.gap_extend = params.gap_extend;
}

/// Karlin block of one profile: the scaled ideal lambda with the profile's
/// own K for gapped searches, the database's ungapped K otherwise.
fn profile_karlin_blk(
    db: &RpsDatabase,
    ideal: &KarlinBlk,
    profile: usize,
    gapped: bool,
) -> Option<KarlinBlk> {
    let params = db.params();
    let profile_k = *params.karlin_k.get(profile)?;
    let k = if gapped { profile_k } else { params.ungapped_k };
    Some(KarlinBlk::new(
        ideal.lambda / params.scale_factor,
        k,
        params.ungapped_h,
        ideal.alpha,
        ideal.beta,
    ))
}

/// Compute e-values and bit scores for profile search results, reap by the
/// e-value cutoff and re-sort every hit list.
///
/// Reference: ncbi-blast blast_traceback.c BLAST_RPSTraceback
pub fn finalize_rps_results(
    results: &mut HspResults,
    db: &RpsDatabase,
    query_info: &QueryInfo,
    options: &SearchOptions,
) -> Result<()> {
    let ideal = ideal_karlin_blk(options.program, &options.scoring)?;
    let num_profiles = db.profiles().num_profiles() as u64;
    let db_length = db.params().db_length;
    let max_adjustment = db.params().max_db_seq_length as u64;
    let gapped = options.scoring.gapped;
    let cutoff = options.hit_saving.evalue_cutoff;
    let mut reaped = 0;
    for hit_list in results.hitlists_mut() {
        for list in hit_list.hsplists_mut() {
            let kbp = profile_karlin_blk(db, &ideal, list.oid, gapped).ok_or_else(|| {
                SearchError::Internal(format!("no Karlin K for profile {}", list.oid))
            })?;
            let before = list.len();
            for hsp in list.hsps_mut() {
                let query_length = query_info.context(hsp.context).query_length as u64;
                let searchsp =
                    effective_search_space_capped(query_length, db_length, num_profiles, max_adjustment, &kbp);
                hsp.evalue = kbp.evalue(hsp.score, searchsp);
                hsp.bit_score = kbp.bit_score(hsp.score);
            }
            list.reap_by_evalue(cutoff);
            list.sort_by_evalue();
            reaped += before - list.len();
        }
    }
    results.sort_by_evalue();
    log::debug!("profile e-values computed, {reaped} HSPs above {cutoff}");
    Ok(())
}
