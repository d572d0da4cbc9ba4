//! Producer/consumer channel between search workers and whatever reads the
//! finished per-subject HSP lists.
//!
//! Workers `write` one list per (query, subject) pair. The thread manager
//! calls `close` once every worker has joined; readers then drain what is
//! left and see `None`.
//!
//! In FIFO mode lists come out in write order and a writer blocks while
//! `capacity` lists are waiting. In sorted mode nothing can be read before
//! the stream is closed; lists come out grouped by query, best first, and
//! an optional cap on the total number of HSPs evicts the globally worst
//! ones as lists arrive.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard};

use super::blast_hitlist::compare_hsp_lists;
use super::blast_hits::{evalue_compare_hsps, HspList};
use super::blast_options::StreamMode;
use super::blast_results::HspResults;
use crate::error::{Result, SearchError};

#[derive(Debug, Default)]
struct StreamState {
    queue: VecDeque<HspList>,
    closed: bool,
    total_hsps: usize,
    sorted: bool,
    writes: usize,
}

#[derive(Debug)]
pub struct HspStream {
    mode: StreamMode,
    total_hsp_limit: Option<usize>,
    state: Mutex<StreamState>,
    readable: Condvar,
    writable: Condvar,
}

impl HspStream {
    pub fn new(mode: StreamMode, total_hsp_limit: Option<usize>) -> Self {
        HspStream {
            mode,
            total_hsp_limit,
            state: Mutex::new(StreamState::default()),
            readable: Condvar::new(),
            writable: Condvar::new(),
        }
    }

    pub fn mode(&self) -> StreamMode {
        self.mode
    }

    // A worker panicking mid-write leaves the queue consistent, so a
    // poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, StreamState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Publish the finished list of one subject. Empty lists are accepted
    /// and dropped.
    pub fn write(&self, hsp_list: HspList) -> Result<()> {
        let mut state = self.lock();
        if let StreamMode::Fifo { capacity } = self.mode {
            while !state.closed && state.queue.len() >= capacity {
                state = self.writable.wait(state).unwrap_or_else(|e| e.into_inner());
            }
        }
        if state.closed {
            return Err(SearchError::Internal(format!(
                "write of subject {} to a closed HSP stream",
                hsp_list.oid
            )));
        }
        if hsp_list.is_empty() {
            return Ok(());
        }
        state.writes += 1;
        state.total_hsps += hsp_list.len();
        state.queue.push_back(hsp_list);
        if self.mode == StreamMode::Sorted {
            if let Some(limit) = self.total_hsp_limit {
                evict_worst(&mut state, limit);
            }
        }
        self.readable.notify_one();
        Ok(())
    }

    /// No more writes. Idempotent; wakes every blocked reader and writer.
    pub fn close(&self) {
        let mut state = self.lock();
        if !state.closed {
            state.closed = true;
            log::debug!(
                "HSP stream closed after {} writes, {} HSPs held",
                state.writes,
                state.total_hsps
            );
        }
        drop(state);
        self.readable.notify_all();
        self.writable.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// HSPs currently held by the stream.
    pub fn total_hsps(&self) -> usize {
        self.lock().total_hsps
    }

    /// Next list, blocking until one is available. `None` once the stream
    /// is closed and drained.
    pub fn read(&self) -> Option<HspList> {
        let mut state = self.wait_readable();
        let list = state.queue.pop_front()?;
        state.total_hsps -= list.len();
        drop(state);
        self.writable.notify_one();
        Some(list)
    }

    /// Every list of the next query that can be taken in one go. In sorted
    /// mode this is all of the query's lists.
    pub fn read_batch(&self) -> Option<Vec<HspList>> {
        let mut state = self.wait_readable();
        let first = state.queue.pop_front()?;
        let query_index = first.query_index;
        let mut batch = vec![first];
        while state
            .queue
            .front()
            .is_some_and(|l| l.query_index == query_index)
        {
            if let Some(list) = state.queue.pop_front() {
                batch.push(list);
            }
        }
        state.total_hsps -= batch.iter().map(HspList::len).sum::<usize>();
        drop(state);
        self.writable.notify_all();
        Some(batch)
    }

    fn wait_readable(&self) -> MutexGuard<'_, StreamState> {
        let mut state = self.lock();
        match self.mode {
            StreamMode::Fifo { .. } => {
                while state.queue.is_empty() && !state.closed {
                    state = self.readable.wait(state).unwrap_or_else(|e| e.into_inner());
                }
            }
            StreamMode::Sorted => {
                while !state.closed {
                    state = self.readable.wait(state).unwrap_or_else(|e| e.into_inner());
                }
                if !state.sorted {
                    state.queue.make_contiguous().sort_by(|a, b| {
                        a.query_index
                            .cmp(&b.query_index)
                            .then_with(|| compare_hsp_lists(a, b))
                    });
                    state.sorted = true;
                }
            }
        }
        state
    }

    /// Drain a closed stream into per-query hit lists.
    pub fn into_results(self, num_queries: usize, hitlist_size: usize) -> Result<HspResults> {
        if !self.is_closed() {
            return Err(SearchError::Internal(
                "HSP stream drained before it was closed".to_string(),
            ));
        }
        let mut results = HspResults::new(num_queries, hitlist_size);
        while let Some(list) = self.read() {
            results.insert(list)?;
        }
        results.sort_by_evalue();
        Ok(results)
    }
}

/// Drop the worst HSPs across all held lists until at most `limit` remain.
fn evict_worst(state: &mut StreamState, limit: usize) {
    if state.total_hsps <= limit {
        return;
    }
    for list in state.queue.iter_mut() {
        list.sort_by_evalue();
    }
    while state.total_hsps > limit {
        let worst = state
            .queue
            .iter()
            .enumerate()
            .filter_map(|(i, l)| l.hsps().last().map(|h| (i, h)))
            .max_by(|(_, a), (_, b)| evalue_compare_hsps(a, b))
            .map(|(i, _)| i);
        let Some(i) = worst else { break };
        let list = &mut state.queue[i];
        list.trim_to(list.len() - 1);
        list.update_best_evalue();
        state.total_hsps -= 1;
    }
    state.queue.retain(|l| !l.is_empty());
}
