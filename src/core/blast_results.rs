//! Top-level result container: one hit list per query.

use super::blast_hitlist::HitList;
use super::blast_hits::HspList;
use crate::error::{Result, SearchError};

#[derive(Debug, Clone)]
pub struct HspResults {
    hitlists: Vec<HitList>,
}

impl HspResults {
    /// One empty hit list of `hitlist_size` per query. The number of
    /// queries is fixed from here on.
    pub fn new(num_queries: usize, hitlist_size: usize) -> Self {
        HspResults {
            hitlists: (0..num_queries).map(|_| HitList::new(hitlist_size)).collect(),
        }
    }

    pub fn num_queries(&self) -> usize {
        self.hitlists.len()
    }

    pub fn hitlist(&self, query_index: usize) -> Option<&HitList> {
        self.hitlists.get(query_index)
    }

    pub fn hitlists(&self) -> &[HitList] {
        &self.hitlists
    }

    pub fn hitlists_mut(&mut self) -> &mut [HitList] {
        &mut self.hitlists
    }

    /// Hand `hsp_list` to the hit list of its query. Empty lists are
    /// dropped.
    pub fn insert(&mut self, hsp_list: HspList) -> Result<bool> {
        if hsp_list.is_empty() {
            return Ok(false);
        }
        let num_queries = self.hitlists.len();
        let hit_list = self.hitlists.get_mut(hsp_list.query_index).ok_or_else(|| {
            SearchError::Internal(format!(
                "HSP list for query {} but only {} queries",
                hsp_list.query_index, num_queries
            ))
        })?;
        Ok(hit_list.update(hsp_list))
    }

    pub fn sort_by_evalue(&mut self) {
        for hit_list in &mut self.hitlists {
            hit_list.sort_by_evalue();
        }
    }

    pub fn prune_by_size(&mut self, hitlist_size: usize) {
        for hit_list in &mut self.hitlists {
            hit_list.prune_by_size(hitlist_size);
        }
    }

    /// Keep at most `max_hsps` HSPs (best e-value first) per subject.
    pub fn trim_hsps_per_subject(&mut self, max_hsps: usize) {
        for hit_list in &mut self.hitlists {
            for hsp_list in hit_list.hsplists_mut() {
                hsp_list.sort_by_evalue();
                hsp_list.trim_to(max_hsps);
            }
        }
    }

    pub fn num_hsplists(&self) -> usize {
        self.hitlists.iter().map(HitList::len).sum()
    }

    pub fn total_hsps(&self) -> usize {
        self.hitlists.iter().map(HitList::total_hsps).sum()
    }

    /// Every HSP list with the query it belongs to.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &HspList)> {
        self.hitlists
            .iter()
            .enumerate()
            .flat_map(|(q, hl)| hl.hsplists().iter().map(move |l| (q, l)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::blast_hits::{Capacity, Hsp, SeqSeg};

    fn list_with(query_index: usize, oid: usize, evalues: &[f64]) -> HspList {
        let mut list = HspList::new(oid, query_index, Capacity::Unbounded);
        for (i, &e) in evalues.iter().enumerate() {
            let mut hsp = Hsp::new(100 - i as i32, 0, SeqSeg::new(0, i, i + 5), SeqSeg::new(0, i, i + 5));
            hsp.evalue = e;
            list.save_hsp(hsp);
        }
        list
    }

    #[test]
    fn test_insert_routes_by_query() {
        let mut results = HspResults::new(2, 10);
        assert!(results.insert(list_with(1, 7, &[1e-3])).unwrap());
        assert!(!results.insert(list_with(0, 8, &[])).unwrap());
        assert_eq!(results.hitlist(0).unwrap().len(), 0);
        assert_eq!(results.hitlist(1).unwrap().len(), 1);
        assert!(results.insert(list_with(5, 1, &[1e-3])).is_err());
    }

    #[test]
    fn test_trim_and_count() {
        let mut results = HspResults::new(1, 10);
        results.insert(list_with(0, 1, &[1e-3, 1e-9, 1e-5])).unwrap();
        results.insert(list_with(0, 2, &[1e-4])).unwrap();
        assert_eq!(results.total_hsps(), 4);
        results.trim_hsps_per_subject(1);
        assert_eq!(results.total_hsps(), 2);
        results.sort_by_evalue();
        let firsts: Vec<f64> = results.iter().map(|(_, l)| l.hsps()[0].evalue).collect();
        assert_eq!(firsts, vec![1e-9, 1e-4]);
    }
}
