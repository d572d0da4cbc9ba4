//! Fan-out of search workers.
//!
//! Every worker owns its scratch state and returns its own `Diagnostics`
//! together with its outcome; the values are reduced once all workers have
//! joined, so no accumulator is shared while the search runs.

use rayon::prelude::*;

use crate::core::blast_diagnostics::Diagnostics;
use crate::core::blast_engine::SearchControl;
use crate::error::{Result, SearchError};

/// What one worker hands back when it stops.
pub type WorkerOutcome = (Diagnostics, Result<()>);

/// Run `work` on `num_threads` workers and wait for all of them.
///
/// With one thread (or when no pool can be built) the worker runs inline on
/// the calling thread. A failing worker halts `control` so its siblings stop
/// at their next check.
pub fn run_workers<W>(num_threads: usize, control: &SearchControl, work: W) -> WorkerOutcome
where
    W: Fn() -> WorkerOutcome + Sync,
{
    let guarded = || {
        let (diagnostics, outcome) = work();
        if outcome.is_err() {
            control.halt();
        }
        (diagnostics, outcome)
    };

    let outcomes: Vec<WorkerOutcome> = if num_threads <= 1 {
        vec![guarded()]
    } else {
        match rayon::ThreadPoolBuilder::new().num_threads(num_threads).build() {
            Ok(pool) => pool.install(|| (0..num_threads).into_par_iter().map(|_| guarded()).collect()),
            Err(e) => {
                log::warn!("no worker pool ({e}); searching on the calling thread");
                vec![guarded()]
            }
        }
    };

    let diagnostics = Diagnostics::reduce(outcomes.iter().map(|(d, _)| d));
    let status = first_error(outcomes.into_iter().map(|(_, r)| r));
    (diagnostics, status)
}

/// Fold worker outcomes into one. A real failure wins over an interruption,
/// since siblings of a failed worker report `Interrupted` once halted.
pub fn first_error(outcomes: impl IntoIterator<Item = Result<()>>) -> Result<()> {
    let mut interrupted = false;
    for outcome in outcomes {
        match outcome {
            Ok(()) => {}
            Err(SearchError::Interrupted) => interrupted = true,
            Err(e) => return Err(e),
        }
    }
    if interrupted {
        Err(SearchError::Interrupted)
    } else {
        Ok(())
    }
}
