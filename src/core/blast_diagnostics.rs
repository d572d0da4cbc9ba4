//! Search counters. Each worker fills its own `Diagnostics`; the values are
//! merged once the workers have joined.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UngappedStats {
    /// Word hits returned by the lookup table.
    pub lookup_hits: u64,
    /// Ungapped extensions attempted.
    pub init_extends: u64,
    /// Ungapped extensions that reached the cutoff.
    pub good_init_extends: u64,
    /// Subjects with at least one good ungapped extension.
    pub num_seqs_passed: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GappedStats {
    pub extensions: u64,
    /// Gapped HSPs surviving the e-value reap.
    pub good_extensions: u64,
    pub num_seqs_passed: u64,
}

/// Raw score thresholds actually used by the search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawCutoffs {
    pub x_drop_ungapped: i32,
    pub ungapped_cutoff: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub ungapped: UngappedStats,
    pub gapped: GappedStats,
    pub cutoffs: RawCutoffs,
    pub subjects_searched: u64,
    /// Subjects that could not be fetched or translated.
    pub subjects_skipped: u64,
    pub hsplists_published: u64,
    pub hsps_reaped: u64,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold `other` into `self`. Counters add up; cutoffs are taken from
    /// whichever side has them set.
    pub fn merge(&mut self, other: &Diagnostics) {
        let u = &mut self.ungapped;
        u.lookup_hits += other.ungapped.lookup_hits;
        u.init_extends += other.ungapped.init_extends;
        u.good_init_extends += other.ungapped.good_init_extends;
        u.num_seqs_passed += other.ungapped.num_seqs_passed;

        let g = &mut self.gapped;
        g.extensions += other.gapped.extensions;
        g.good_extensions += other.gapped.good_extensions;
        g.num_seqs_passed += other.gapped.num_seqs_passed;

        if other.cutoffs != RawCutoffs::default() {
            self.cutoffs = other.cutoffs;
        }
        self.subjects_searched += other.subjects_searched;
        self.subjects_skipped += other.subjects_skipped;
        self.hsplists_published += other.hsplists_published;
        self.hsps_reaped += other.hsps_reaped;
    }

    /// Reduce per-worker values into one.
    pub fn reduce<'a>(parts: impl IntoIterator<Item = &'a Diagnostics>) -> Diagnostics {
        parts.into_iter().fold(Diagnostics::new(), |mut acc, d| {
            acc.merge(d);
            acc
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_adds_counters() {
        let mut a = Diagnostics::new();
        a.ungapped.lookup_hits = 10;
        a.subjects_searched = 2;
        let mut b = Diagnostics::new();
        b.ungapped.lookup_hits = 5;
        b.subjects_skipped = 1;
        b.cutoffs.ungapped_cutoff = 20;
        let total = Diagnostics::reduce([&a, &b]);
        assert_eq!(total.ungapped.lookup_hits, 15);
        assert_eq!(total.subjects_searched, 2);
        assert_eq!(total.subjects_skipped, 1);
        assert_eq!(total.cutoffs.ungapped_cutoff, 20);
    }
}
