//! Per-query hit list: the best HSP lists across all subjects.
//!
//! Until it is full the list simply collects. Once `hsplist_max` lists are
//! held it turns into a max-heap with the worst list on top, so a better
//! newcomer replaces the root in O(log n) and a worse one is dropped after
//! a single comparison.

use std::cmp::Ordering;

use super::blast_hits::{evalue_comp, HspList};

/// Best e-value ascending, then top score descending, then oid descending.
/// Empty lists sort last.
pub fn compare_hsp_lists(a: &HspList, b: &HspList) -> Ordering {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        _ => {}
    }
    evalue_comp(a.best_evalue(), b.best_evalue())
        .then_with(|| b.top_score().cmp(&a.top_score()))
        .then_with(|| b.oid.cmp(&a.oid))
}

/// Hit list size used during the preliminary stage, leaving headroom for
/// lists that lose HSPs during traceback.
pub fn prelim_hitlist_size(hitlist_size: usize, gapped_calculation: bool) -> usize {
    if gapped_calculation {
        (hitlist_size.saturating_mul(2).max(10)).min(hitlist_size.saturating_add(50))
    } else {
        hitlist_size
    }
}

fn sift_down(lists: &mut [HspList], start: usize) {
    let end = lists.len();
    let mut root = start;
    loop {
        let left = 2 * root + 1;
        if left >= end {
            break;
        }
        let right = left + 1;
        let mut larger = left;
        if right < end && compare_hsp_lists(&lists[left], &lists[right]) == Ordering::Less {
            larger = right;
        }
        if compare_hsp_lists(&lists[root], &lists[larger]) == Ordering::Less {
            lists.swap(root, larger);
            root = larger;
        } else {
            break;
        }
    }
}

fn make_heap(lists: &mut [HspList]) {
    for i in (0..lists.len() / 2).rev() {
        sift_down(lists, i);
    }
}

#[derive(Debug, Clone)]
pub struct HitList {
    hsplist_max: usize,
    /// Largest best e-value among held lists.
    worst_evalue: f64,
    /// Smallest top score among held lists.
    low_score: i32,
    heapified: bool,
    hsplists: Vec<HspList>,
}

impl HitList {
    pub fn new(hitlist_size: usize) -> Self {
        HitList {
            hsplist_max: hitlist_size,
            worst_evalue: 0.0,
            low_score: i32::MAX,
            heapified: false,
            hsplists: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.hsplists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hsplists.is_empty()
    }

    pub fn hsplist_max(&self) -> usize {
        self.hsplist_max
    }

    pub fn worst_evalue(&self) -> f64 {
        self.worst_evalue
    }

    pub fn low_score(&self) -> i32 {
        self.low_score
    }

    pub fn is_heapified(&self) -> bool {
        self.heapified
    }

    pub fn hsplists(&self) -> &[HspList] {
        &self.hsplists
    }

    pub fn hsplists_mut(&mut self) -> &mut [HspList] {
        &mut self.hsplists
    }

    pub fn into_hsplists(self) -> Vec<HspList> {
        self.hsplists
    }

    pub fn total_hsps(&self) -> usize {
        self.hsplists.iter().map(HspList::len).sum()
    }

    fn refresh_guards_from_root(&mut self) {
        if let Some(root) = self.hsplists.first() {
            self.worst_evalue = root.best_evalue();
            self.low_score = root.top_score();
        }
    }

    /// Offer one subject's HSP list. Returns `false` when the list was not
    /// good enough to be kept.
    ///
    /// Reference: ncbi-blast blast_hits.c Blast_HitListUpdate
    pub fn update(&mut self, mut hsp_list: HspList) -> bool {
        hsp_list.update_best_evalue();

        if self.hsplists.len() < self.hsplist_max {
            self.worst_evalue = self.worst_evalue.max(hsp_list.best_evalue());
            self.low_score = self.low_score.min(hsp_list.top_score());
            self.hsplists.push(hsp_list);
            return true;
        }
        if self.hsplist_max == 0 {
            return false;
        }

        if !self.heapified {
            for list in &mut self.hsplists {
                list.sort_by_evalue();
                list.update_best_evalue();
            }
            make_heap(&mut self.hsplists);
            self.heapified = true;
        }

        hsp_list.sort_by_evalue();
        if compare_hsp_lists(&self.hsplists[0], &hsp_list) == Ordering::Less {
            return false;
        }
        self.hsplists[0] = hsp_list;
        sift_down(&mut self.hsplists, 0);
        self.refresh_guards_from_root();
        true
    }

    /// Sort best first and drop trailing empty lists.
    pub fn sort_by_evalue(&mut self) {
        if self.hsplists.len() > 1 {
            self.hsplists.sort_by(compare_hsp_lists);
        }
        self.purge_empty();
        self.heapified = false;
    }

    /// Remove lists that lost all their HSPs.
    pub fn purge_empty(&mut self) {
        self.hsplists.retain(|l| !l.is_empty());
    }

    /// Keep at most `hitlist_size` lists; the list should be sorted first.
    pub fn prune_by_size(&mut self, hitlist_size: usize) {
        if self.hsplists.len() > hitlist_size {
            self.hsplists.truncate(hitlist_size);
            self.heapified = false;
        }
    }
}
