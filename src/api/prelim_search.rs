//! Preliminary search driver.
//!
//! `PrelimSearch` holds the queries, options and plug-ins of one search and
//! runs it against a sequence source or a profile database. Workers publish
//! finished subjects to an `HspStream`; a reader collects them into
//! `HspResults`, optionally handing every list to a formatter first.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::core::blast_diagnostics::Diagnostics;
use crate::core::blast_engine::{
    InterruptFn, ProgressFn, SearchControl, SearchEngine, SearchProgress, WorkerScratch,
};
use crate::core::blast_gapalign::GappedAligner;
use crate::core::blast_hitlist::prelim_hitlist_size;
use crate::core::blast_hits::HspList;
use crate::core::blast_options::{SearchOptions, StreamMode};
use crate::core::blast_results::HspResults;
use crate::core::blast_rps::{finalize_rps_results, RpsSearch};
use crate::core::hsp_stream::HspStream;
use crate::core::link_hsps::HspStatistics;
use crate::core::rps_files::RpsDatabase;
use crate::core::seq_src::SeqSrc;
use crate::error::{Result, SearchError, STATUS_SUCCESS};

use super::thread_manager::{run_workers, WorkerOutcome};

/// Status, messages and counters of a finished search.
#[derive(Debug)]
pub struct SummaryReturn {
    pub status: i32,
    pub error: Option<SearchError>,
    pub messages: Vec<String>,
    pub diagnostics: Diagnostics,
    pub elapsed: Duration,
}

impl SummaryReturn {
    fn new(outcome: Result<()>, diagnostics: Diagnostics, started: Instant) -> Self {
        let mut messages = Vec::new();
        if diagnostics.subjects_skipped > 0 {
            messages.push(format!(
                "{} subjects could not be read and were skipped",
                diagnostics.subjects_skipped
            ));
        }
        let (status, error) = match outcome {
            Ok(()) => (STATUS_SUCCESS, None),
            Err(e) => {
                messages.push(e.to_string());
                (e.status(), Some(e))
            }
        };
        SummaryReturn {
            status,
            error,
            messages,
            diagnostics,
            elapsed: started.elapsed(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }

    pub fn is_interrupted(&self) -> bool {
        self.error.as_ref().is_some_and(SearchError::is_interrupted)
    }
}

/// Results of a search and how it ended. After a failure or an interruption
/// `results` holds only subjects that were finished before the search
/// stopped.
#[derive(Debug)]
pub struct SearchOutcome {
    pub results: HspResults,
    pub summary: SummaryReturn,
}

impl SearchOutcome {
    /// The results, or the error that stopped the search.
    pub fn into_result(self) -> Result<HspResults> {
        match self.summary.error {
            Some(e) => Err(e),
            None => Ok(self.results),
        }
    }
}

pub struct PrelimSearch {
    options: SearchOptions,
    queries: Vec<Vec<u8>>,
    interrupt: Option<InterruptFn>,
    progress: Option<ProgressFn>,
    aligner: Option<Arc<dyn GappedAligner>>,
    statistics: Option<Arc<dyn HspStatistics>>,
}

impl PrelimSearch {
    /// `queries` are encoded in the program's query alphabet.
    pub fn new(options: SearchOptions, queries: Vec<Vec<u8>>) -> Self {
        PrelimSearch {
            options,
            queries,
            interrupt: None,
            progress: None,
            aligner: None,
            statistics: None,
        }
    }

    /// Polled between chunks, frames and subjects; returning `true` stops
    /// the search.
    pub fn with_interrupt(
        mut self,
        interrupt: impl Fn(&SearchProgress) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.interrupt = Some(Arc::new(interrupt));
        self
    }

    pub fn with_progress(mut self, progress: impl Fn(&SearchProgress) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(progress));
        self
    }

    pub fn with_aligner(mut self, aligner: Arc<dyn GappedAligner>) -> Self {
        self.aligner = Some(aligner);
        self
    }

    pub fn with_statistics(mut self, statistics: Arc<dyn HspStatistics>) -> Self {
        self.statistics = Some(statistics);
        self
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    pub fn num_queries(&self) -> usize {
        self.queries.len()
    }

    fn hitlist_size(&self) -> usize {
        prelim_hitlist_size(self.options.hit_saving.hitlist_size, self.options.scoring.gapped)
    }

    fn empty_results(&self) -> HspResults {
        HspResults::new(self.queries.len(), self.hitlist_size())
    }

    fn engine(&self, src: &dyn SeqSrc) -> Result<SearchEngine> {
        let engine = SearchEngine::new(
            self.options.clone(),
            &self.queries,
            src.total_length(),
            src.num_sequences() as u64,
            self.aligner.clone(),
            self.statistics.clone(),
        )?;
        if src.alphabet() != engine.subject_alphabet() {
            return Err(SearchError::InvalidOptions(format!(
                "{} needs {:?} subjects but {} holds {:?} sequences",
                self.options.program,
                engine.subject_alphabet(),
                src.name(),
                src.alphabet()
            )));
        }
        Ok(engine)
    }

    fn failed(&self, error: SearchError, started: Instant) -> SearchOutcome {
        log::warn!("search setup failed: {error}");
        SearchOutcome {
            results: self.empty_results(),
            summary: SummaryReturn::new(Err(error), Diagnostics::new(), started),
        }
    }

    /// Search every subject of `src`.
    pub fn run(&self, src: &dyn SeqSrc) -> SearchOutcome {
        self.run_ordinary(src, None::<fn(&HspList) -> anyhow::Result<()>>)
    }

    /// Search every subject of `src`, handing each published list to
    /// `sink` on a separate thread while the workers run. A failing sink
    /// stops the search.
    pub fn run_with_formatter<F>(&self, src: &dyn SeqSrc, sink: F) -> SearchOutcome
    where
        F: FnMut(&HspList) -> anyhow::Result<()> + Send,
    {
        self.run_ordinary(src, Some(sink))
    }

    fn run_ordinary<F>(&self, src: &dyn SeqSrc, sink: Option<F>) -> SearchOutcome
    where
        F: FnMut(&HspList) -> anyhow::Result<()> + Send,
    {
        let started = Instant::now();
        let engine = match self.engine(src) {
            Ok(engine) => engine,
            Err(e) => return self.failed(e, started),
        };
        src.reset_iterator();
        let control = SearchControl::new(
            self.interrupt.clone(),
            self.progress.clone(),
            src.num_sequences() as u64,
        );
        log::info!(
            "searching {} ({} subjects) with {} threads",
            src.name(),
            src.num_sequences(),
            self.options.threads()
        );
        let (diagnostics, outcome, results) = self.drive(&control, sink, |stream| {
            let mut scratch = WorkerScratch::new(&engine);
            let outcome = engine.run_worker(src, stream, &mut scratch, &control);
            (scratch.diagnostics, outcome)
        });
        self.finish(results, outcome, diagnostics, started)
    }

    /// Search every query against the profiles of `db`. E-values are filled
    /// in once all queries are done.
    pub fn run_rps(&self, db: &RpsDatabase) -> SearchOutcome {
        let started = Instant::now();
        let search = match RpsSearch::new(db, self.options.clone(), &self.queries, self.aligner.clone()) {
            Ok(search) => search,
            Err(e) => return self.failed(e, started),
        };
        let control = SearchControl::new(
            self.interrupt.clone(),
            self.progress.clone(),
            search.num_queries() as u64,
        );
        let (diagnostics, outcome, mut results) = self.drive(
            &control,
            None::<fn(&HspList) -> anyhow::Result<()>>,
            |stream| {
                let mut scratch = search.new_scratch();
                let outcome = search.run_worker(stream, &mut scratch, &control);
                (scratch.diagnostics, outcome)
            },
        );
        let finalized = finalize_rps_results(&mut results, db, search.query_info(), search.options());
        let outcome = outcome.and(finalized);
        self.finish(results, outcome, diagnostics, started)
    }

    fn finish(
        &self,
        mut results: HspResults,
        outcome: Result<()>,
        diagnostics: Diagnostics,
        started: Instant,
    ) -> SearchOutcome {
        if let Some(max_hsps) = self.options.hit_saving.max_hsps_per_subject {
            results.trim_hsps_per_subject(max_hsps);
        }
        let summary = SummaryReturn::new(outcome, diagnostics, started);
        let d = &summary.diagnostics;
        log::info!(
            "{} subjects searched, {} skipped, {} lookup hits, {} extensions ({} kept), {} HSP lists in {:.2}s",
            d.subjects_searched,
            d.subjects_skipped,
            d.ungapped.lookup_hits,
            d.ungapped.init_extends,
            d.ungapped.good_init_extends,
            results.num_hsplists(),
            summary.elapsed.as_secs_f64()
        );
        SearchOutcome { results, summary }
    }

    /// Run the workers against a fresh stream and collect what they
    /// publish. A reader thread runs next to the workers when lists must be
    /// consumed while the search is going on.
    fn drive<W, F>(&self, control: &SearchControl, sink: Option<F>, work: W) -> (Diagnostics, Result<()>, HspResults)
    where
        W: Fn(&HspStream) -> WorkerOutcome + Sync,
        F: FnMut(&HspList) -> anyhow::Result<()> + Send,
    {
        let stream = HspStream::new(self.options.stream, self.options.hit_saving.total_hsp_limit);
        let threads = self.options.threads();
        let concurrent = sink.is_some() || matches!(self.options.stream, StreamMode::Fifo { .. });

        if !concurrent {
            let (diagnostics, outcome) = run_workers(threads, control, || work(&stream));
            stream.close();
            let mut results = self.empty_results();
            let drained = collect(&stream, &mut results, None::<F>);
            return (diagnostics, first_failure(drained, outcome), results);
        }

        let stream = &stream;
        std::thread::scope(|scope| {
            let reader = scope.spawn(move || {
                let mut results = self.empty_results();
                let drained = collect(stream, &mut results, sink);
                if drained.is_err() {
                    control.halt();
                    stream.close();
                }
                (results, drained)
            });
            let (diagnostics, outcome) = run_workers(threads, control, || work(stream));
            stream.close();
            let (results, drained) = reader.join().unwrap_or_else(|_| {
                (
                    self.empty_results(),
                    Err(SearchError::Internal("result reader panicked".to_string())),
                )
            });
            (diagnostics, first_failure(drained, outcome), results)
        })
    }
}

/// Read `stream` dry into `results`, showing every list to `sink` first.
fn collect<F>(stream: &HspStream, results: &mut HspResults, mut sink: Option<F>) -> Result<()>
where
    F: FnMut(&HspList) -> anyhow::Result<()>,
{
    while let Some(list) = stream.read() {
        if let Some(sink) = sink.as_mut() {
            sink(&list).map_err(sink_error)?;
        }
        results.insert(list)?;
    }
    results.sort_by_evalue();
    Ok(())
}

fn sink_error(e: anyhow::Error) -> SearchError {
    log::warn!("result formatter failed: {e:#}");
    match e.downcast::<std::io::Error>() {
        Ok(io) => SearchError::Io(io),
        Err(e) => SearchError::Internal(format!("result formatter: {e:#}")),
    }
}

/// A reader failure explains whatever the workers saw afterwards.
fn first_failure(reader: Result<()>, workers: Result<()>) -> Result<()> {
    reader.and(workers)
}
