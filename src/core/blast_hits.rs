//! HSPs and per-subject HSP lists.
//!
//! An `HspList` holds every alignment found between one query and one
//! subject (`oid`). It is built chunk by chunk and frame by frame, merged,
//! re-scored, reaped by e-value and finally handed to the HSP stream.

use std::cmp::Ordering;

use rustc_hash::FxHashSet;

/// How many HSPs a list may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Capacity {
    #[default]
    Unbounded,
    /// Fixed capacity; once full a new HSP only gets in by replacing the
    /// lowest-scoring one.
    AtMost(usize),
}

impl Capacity {
    pub fn admits(self, len: usize) -> bool {
        match self {
            Capacity::Unbounded => true,
            Capacity::AtMost(max) => len < max,
        }
    }

    pub fn limit(self) -> Option<usize> {
        match self {
            Capacity::Unbounded => None,
            Capacity::AtMost(max) => Some(max),
        }
    }
}

/// One edit operation of a gapped alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapEditOp {
    /// Aligned residues; consumes both sequences.
    Sub(usize),
    /// Gap in the query; consumes the subject only.
    Del(usize),
    /// Gap in the subject; consumes the query only.
    Ins(usize),
}

impl GapEditOp {
    fn len(self) -> usize {
        match self {
            GapEditOp::Sub(n) | GapEditOp::Del(n) | GapEditOp::Ins(n) => n,
        }
    }

    fn with_len(self, n: usize) -> Self {
        match self {
            GapEditOp::Sub(_) => GapEditOp::Sub(n),
            GapEditOp::Del(_) => GapEditOp::Del(n),
            GapEditOp::Ins(_) => GapEditOp::Ins(n),
        }
    }

    fn same_kind(self, other: GapEditOp) -> bool {
        std::mem::discriminant(&self) == std::mem::discriminant(&other)
    }
}

/// Traceback of a gapped alignment as run-length edit operations.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GapEditScript {
    ops: Vec<GapEditOp>,
}

impl GapEditScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ops(ops: impl IntoIterator<Item = GapEditOp>) -> Self {
        let mut script = Self::new();
        for op in ops {
            script.push(op);
        }
        script
    }

    /// Append `op`, folding it into the last run when the kind matches.
    pub fn push(&mut self, op: GapEditOp) {
        if op.len() == 0 {
            return;
        }
        match self.ops.last_mut() {
            Some(last) if last.same_kind(op) => *last = last.with_len(last.len() + op.len()),
            _ => self.ops.push(op),
        }
    }

    pub fn ops(&self) -> &[GapEditOp] {
        &self.ops
    }

    /// Residues consumed on (query, subject).
    pub fn extent(&self) -> (usize, usize) {
        self.ops.iter().fold((0, 0), |(q, s), op| match *op {
            GapEditOp::Sub(n) => (q + n, s + n),
            GapEditOp::Del(n) => (q, s + n),
            GapEditOp::Ins(n) => (q + n, s),
        })
    }

    /// Every aligned (query, subject) cell, starting from the given origin.
    pub fn aligned_cells(&self, q_start: usize, s_start: usize) -> Vec<(usize, usize)> {
        let (mut q, mut s) = (q_start, s_start);
        let mut cells = Vec::new();
        for op in &self.ops {
            match *op {
                GapEditOp::Sub(n) => {
                    cells.extend((0..n).map(|i| (q + i, s + i)));
                    q += n;
                    s += n;
                }
                GapEditOp::Del(n) => s += n,
                GapEditOp::Ins(n) => q += n,
            }
        }
        cells
    }

    /// Operations before the aligned cell `cell` (exclusive) and from it on.
    fn split_at_cell(
        &self,
        q_start: usize,
        s_start: usize,
        cell: (usize, usize),
    ) -> Option<(GapEditScript, GapEditScript)> {
        let (mut q, mut s) = (q_start, s_start);
        for (idx, op) in self.ops.iter().enumerate() {
            if let GapEditOp::Sub(n) = *op {
                if cell.0 >= q && cell.0 < q + n && cell.0 - q == cell.1.wrapping_sub(s) {
                    let i = cell.0 - q;
                    let mut head = GapEditScript::from_ops(self.ops[..idx].iter().copied());
                    head.push(GapEditOp::Sub(i));
                    let mut tail = GapEditScript::new();
                    tail.push(GapEditOp::Sub(n - i));
                    for &rest in &self.ops[idx + 1..] {
                        tail.push(rest);
                    }
                    return Some((head, tail));
                }
            }
            match *op {
                GapEditOp::Sub(n) => {
                    q += n;
                    s += n;
                }
                GapEditOp::Del(n) => s += n,
                GapEditOp::Ins(n) => q += n,
            }
        }
        None
    }
}

/// Position of a pattern occurrence inside the query (PHI searches).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternInfo {
    pub offset: usize,
    pub length: usize,
}

/// One side of an alignment. `offset..end` is half-open and measured in the
/// context (query) or frame (subject) the alignment lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeqSeg {
    pub frame: i8,
    pub offset: usize,
    pub end: usize,
    /// Where gapped extension started.
    pub gapped_start: usize,
}

impl SeqSeg {
    pub fn new(frame: i8, offset: usize, end: usize) -> Self {
        SeqSeg {
            frame,
            offset,
            end,
            gapped_start: offset,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.offset
    }
}

/// High-scoring pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Hsp {
    pub score: i32,
    pub num_ident: usize,
    pub bit_score: f64,
    pub evalue: f64,
    pub context: usize,
    pub query: SeqSeg,
    pub subject: SeqSeg,
    pub edit_script: Option<GapEditScript>,
    /// Number of HSPs in this HSP's sum-statistics group; 0 when unlinked.
    pub num: usize,
    pub pattern: Option<PatternInfo>,
}

impl Hsp {
    pub fn new(score: i32, context: usize, query: SeqSeg, subject: SeqSeg) -> Self {
        debug_assert!(query.end >= query.offset && subject.end >= subject.offset);
        Hsp {
            score,
            num_ident: 0,
            bit_score: 0.0,
            evalue: f64::MAX,
            context,
            query,
            subject,
            edit_script: None,
            num: 0,
            pattern: None,
        }
    }

    /// Query minus subject offset of the alignment start.
    pub fn diagonal(&self) -> isize {
        self.query.offset as isize - self.subject.offset as isize
    }

    pub fn shift_subject(&mut self, delta: usize) {
        self.subject.offset += delta;
        self.subject.end += delta;
        self.subject.gapped_start += delta;
    }

    pub fn is_linked(&self) -> bool {
        self.num > 0
    }
}

/// Orders e-values; anything below 1e-180 counts as equal.
pub fn evalue_comp(evalue1: f64, evalue2: f64) -> Ordering {
    const EPSILON: f64 = 1.0e-180;
    if evalue1 < EPSILON && evalue2 < EPSILON {
        Ordering::Equal
    } else {
        evalue1.partial_cmp(&evalue2).unwrap_or(Ordering::Equal)
    }
}

/// Score descending, then subject start ascending, subject end descending,
/// query start ascending, query end descending.
pub fn score_compare_hsps(a: &Hsp, b: &Hsp) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| a.subject.offset.cmp(&b.subject.offset))
        .then_with(|| b.subject.end.cmp(&a.subject.end))
        .then_with(|| a.query.offset.cmp(&b.query.offset))
        .then_with(|| b.query.end.cmp(&a.query.end))
        .then_with(|| a.context.cmp(&b.context))
}

pub fn evalue_compare_hsps(a: &Hsp, b: &Hsp) -> Ordering {
    evalue_comp(a.evalue, b.evalue).then_with(|| score_compare_hsps(a, b))
}

/// Try to fold `b` into `a`. Both must sit on the same context and subject
/// frame. Ungapped HSPs merge when they share a diagonal and overlap; HSPs
/// with traceback merge when their paths cross an aligned cell.
fn merge_two_hsps(a: &mut Hsp, b: &Hsp) -> bool {
    if a.context != b.context || a.subject.frame != b.subject.frame {
        return false;
    }
    match (&a.edit_script, &b.edit_script) {
        (None, None) => {
            if a.diagonal() != b.diagonal()
                || b.subject.offset > a.subject.end
                || a.subject.offset > b.subject.end
            {
                return false;
            }
            a.query.offset = a.query.offset.min(b.query.offset);
            a.query.end = a.query.end.max(b.query.end);
            a.subject.offset = a.subject.offset.min(b.subject.offset);
            a.subject.end = a.subject.end.max(b.subject.end);
            if b.score > a.score {
                a.score = b.score;
                a.num_ident = b.num_ident;
                a.query.gapped_start = b.query.gapped_start;
                a.subject.gapped_start = b.subject.gapped_start;
            }
            true
        }
        (Some(sa), Some(sb)) => {
            let b_cells: FxHashSet<(usize, usize)> = sb
                .aligned_cells(b.query.offset, b.subject.offset)
                .into_iter()
                .collect();
            let Some(common) = sa
                .aligned_cells(a.query.offset, a.subject.offset)
                .into_iter()
                .find(|cell| b_cells.contains(cell))
            else {
                return false;
            };
            let a_contains_b = a.query.offset <= b.query.offset
                && a.query.end >= b.query.end
                && a.subject.offset <= b.subject.offset
                && a.subject.end >= b.subject.end;
            if a_contains_b {
                return true;
            }
            let b_contains_a = b.query.offset <= a.query.offset
                && b.query.end >= a.query.end
                && b.subject.offset <= a.subject.offset
                && b.subject.end >= a.subject.end;
            if b_contains_a {
                *a = b.clone();
                return true;
            }
            let (Some((head, _)), Some((_, tail))) = (
                sa.split_at_cell(a.query.offset, a.subject.offset, common),
                sb.split_at_cell(b.query.offset, b.subject.offset, common),
            ) else {
                return false;
            };
            let mut spliced = head;
            for &op in tail.ops() {
                spliced.push(op);
            }
            a.query.end = b.query.end;
            a.subject.end = b.subject.end;
            a.score = a.score.max(b.score);
            a.edit_script = Some(spliced);
            true
        }
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HspList {
    pub oid: usize,
    pub query_index: usize,
    hsps: Vec<Hsp>,
    capacity: Capacity,
    best_evalue: f64,
}

impl HspList {
    pub fn new(oid: usize, query_index: usize, capacity: Capacity) -> Self {
        HspList {
            oid,
            query_index,
            hsps: Vec::new(),
            capacity,
            best_evalue: f64::MAX,
        }
    }

    pub fn len(&self) -> usize {
        self.hsps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hsps.is_empty()
    }

    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    pub fn hsps(&self) -> &[Hsp] {
        &self.hsps
    }

    pub fn hsps_mut(&mut self) -> &mut [Hsp] {
        &mut self.hsps
    }

    pub fn into_hsps(self) -> Vec<Hsp> {
        self.hsps
    }

    pub fn best_evalue(&self) -> f64 {
        self.best_evalue
    }

    /// Score of the first HSP; the list is expected to be sorted.
    pub fn top_score(&self) -> i32 {
        self.hsps.first().map_or(i32::MIN, |h| h.score)
    }

    /// Store `hsp`, replacing the lowest-scoring HSP when the list is full.
    /// Returns whether the HSP was kept.
    pub fn save_hsp(&mut self, hsp: Hsp) -> bool {
        if self.capacity.admits(self.hsps.len()) {
            self.hsps.push(hsp);
            return true;
        }
        let worst = self
            .hsps
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.score.cmp(&b.score))
            .map(|(i, h)| (i, h.score));
        match worst {
            Some((i, score)) if hsp.score > score => {
                self.hsps[i] = hsp;
                true
            }
            _ => false,
        }
    }

    pub fn retain(&mut self, keep: impl FnMut(&Hsp) -> bool) {
        self.hsps.retain(keep);
    }

    pub fn sort_by_score(&mut self) {
        if self.hsps.len() > 1 {
            self.hsps.sort_by(score_compare_hsps);
        }
    }

    pub fn sort_by_evalue(&mut self) {
        if self.hsps.len() > 1
            && self
                .hsps
                .windows(2)
                .any(|w| evalue_compare_hsps(&w[0], &w[1]) == Ordering::Greater)
        {
            self.hsps.sort_by(evalue_compare_hsps);
        }
    }

    /// Recompute the cached minimum e-value.
    pub fn update_best_evalue(&mut self) -> f64 {
        self.best_evalue = self
            .hsps
            .iter()
            .map(|h| h.evalue)
            .fold(f64::MAX, f64::min);
        self.best_evalue
    }

    /// Drop every HSP whose e-value exceeds `cutoff`.
    pub fn reap_by_evalue(&mut self, cutoff: f64) {
        self.hsps.retain(|h| h.evalue <= cutoff);
        self.update_best_evalue();
    }

    /// Keep the first `max_hsps` HSPs.
    pub fn trim_to(&mut self, max_hsps: usize) {
        self.hsps.truncate(max_hsps);
    }

    /// Remove HSPs sharing a start point, then HSPs sharing an end point,
    /// keeping the highest-scoring one of each group.
    ///
    /// Reference: ncbi-blast blast_hits.c Blast_HSPListPurgeHSPsWithCommonEndpoints
    pub fn purge_common_endpoints(&mut self) {
        if self.hsps.len() <= 1 {
            return;
        }
        self.hsps.sort_by(|a, b| {
            a.context
                .cmp(&b.context)
                .then_with(|| a.query.offset.cmp(&b.query.offset))
                .then_with(|| a.subject.offset.cmp(&b.subject.offset))
                .then_with(|| b.score.cmp(&a.score))
                .then_with(|| b.query.end.cmp(&a.query.end))
                .then_with(|| b.subject.end.cmp(&a.subject.end))
        });
        self.hsps.dedup_by(|later, kept| {
            later.context == kept.context
                && later.query.offset == kept.query.offset
                && later.subject.offset == kept.subject.offset
                && later.subject.frame == kept.subject.frame
        });

        self.hsps.sort_by(|a, b| {
            a.context
                .cmp(&b.context)
                .then_with(|| a.query.end.cmp(&b.query.end))
                .then_with(|| a.subject.end.cmp(&b.subject.end))
                .then_with(|| b.score.cmp(&a.score))
                .then_with(|| b.query.offset.cmp(&a.query.offset))
                .then_with(|| b.subject.offset.cmp(&a.subject.offset))
        });
        self.hsps.dedup_by(|later, kept| {
            later.context == kept.context
                && later.query.end == kept.query.end
                && later.subject.end == kept.subject.end
                && later.subject.frame == kept.subject.frame
        });
    }

    /// Make every score even by rounding odd ones down.
    pub fn round_down_odd_scores(&mut self) {
        for hsp in &mut self.hsps {
            hsp.score -= hsp.score & 1;
        }
    }

    /// Translate subject coordinates of a chunk into the whole frame.
    pub fn shift_subject(&mut self, delta: usize) {
        if delta == 0 {
            return;
        }
        for hsp in &mut self.hsps {
            hsp.shift_subject(delta);
        }
    }

    fn enforce_capacity(&mut self) {
        if let Some(max) = self.capacity.limit() {
            if self.hsps.len() > max {
                self.sort_by_score();
                self.hsps.truncate(max);
            }
        }
    }

    /// Move every HSP of `other` into this list (frame results of one
    /// subject). The best HSPs survive when capacity runs out.
    pub fn append(&mut self, other: HspList) {
        if self.hsps.is_empty() {
            self.hsps = other.hsps;
        } else {
            self.hsps.extend(other.hsps);
        }
        self.enforce_capacity();
    }

    /// Merge the HSPs of the chunk starting at `split_offset` into this
    /// combined list. HSPs of this list ending after the split and HSPs of
    /// the chunk starting before `split_offset + overlap` may be fused when
    /// `allow_merge` holds (ungapped search, or traceback already computed).
    ///
    /// Reference: ncbi-blast blast_hits.c Blast_HSPListsMerge
    pub fn merge_chunk(&mut self, chunk: HspList, split_offset: usize, overlap: usize, allow_merge: bool) {
        if self.hsps.is_empty() {
            self.hsps = chunk.hsps;
            self.enforce_capacity();
            return;
        }
        let mut leftovers = Vec::with_capacity(chunk.hsps.len());
        for incoming in chunk.hsps {
            let mergeable = allow_merge && incoming.subject.offset < split_offset + overlap;
            let merged = mergeable
                && self
                    .hsps
                    .iter_mut()
                    .filter(|kept| kept.subject.end > split_offset)
                    .any(|kept| merge_two_hsps(kept, &incoming));
            if !merged {
                leftovers.push(incoming);
            }
        }
        self.hsps.extend(leftovers);
        self.enforce_capacity();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hsp(score: i32, q: (usize, usize), s: (usize, usize)) -> Hsp {
        Hsp::new(score, 0, SeqSeg::new(0, q.0, q.1), SeqSeg::new(0, s.0, s.1))
    }

    #[test]
    fn test_capacity_replaces_worst() {
        let mut list = HspList::new(0, 0, Capacity::AtMost(2));
        assert!(list.save_hsp(hsp(10, (0, 5), (0, 5))));
        assert!(list.save_hsp(hsp(20, (0, 5), (10, 15))));
        assert!(!list.save_hsp(hsp(5, (0, 5), (20, 25))));
        assert!(list.save_hsp(hsp(30, (0, 5), (30, 35))));
        let mut scores: Vec<i32> = list.hsps().iter().map(|h| h.score).collect();
        scores.sort_unstable();
        assert_eq!(scores, vec![20, 30]);
    }

    #[test]
    fn test_reap_keeps_only_significant() {
        let mut list = HspList::new(0, 0, Capacity::Unbounded);
        for (score, evalue) in [(50, 1e-10), (20, 5.0), (10, 20.0)] {
            let mut h = hsp(score, (0, 5), (score as usize, score as usize + 5));
            h.evalue = evalue;
            list.save_hsp(h);
        }
        list.reap_by_evalue(10.0);
        assert_eq!(list.len(), 2);
        assert!(list.hsps().iter().all(|h| h.evalue <= 10.0));
        assert_eq!(list.best_evalue(), 1e-10);
    }

    #[test]
    fn test_purge_common_endpoints() {
        let mut list = HspList::new(0, 0, Capacity::Unbounded);
        list.save_hsp(hsp(30, (0, 10), (0, 10)));
        list.save_hsp(hsp(20, (0, 8), (0, 8)));
        list.save_hsp(hsp(25, (2, 10), (2, 10)));
        list.save_hsp(hsp(15, (40, 50), (40, 50)));
        list.purge_common_endpoints();
        let mut scores: Vec<i32> = list.hsps().iter().map(|h| h.score).collect();
        scores.sort_unstable();
        assert_eq!(scores, vec![15, 30]);
    }

    #[test]
    fn test_merge_into_empty_is_identity() {
        let mut chunk = HspList::new(3, 0, Capacity::Unbounded);
        chunk.save_hsp(hsp(40, (0, 20), (100, 120)));
        chunk.save_hsp(hsp(30, (5, 25), (300, 320)));
        let expected = chunk.clone();
        let mut combined = HspList::new(3, 0, Capacity::Unbounded);
        combined.merge_chunk(chunk, 0, 100, true);
        assert_eq!(combined.hsps(), expected.hsps());
    }

    #[test]
    fn test_ungapped_merge_across_split() {
        let mut combined = HspList::new(0, 0, Capacity::Unbounded);
        combined.save_hsp(hsp(40, (0, 60), (950, 1010)));
        let mut chunk = HspList::new(0, 0, Capacity::Unbounded);
        chunk.save_hsp(hsp(45, (50, 100), (1000, 1050)));
        combined.merge_chunk(chunk, 950, 100, true);
        assert_eq!(combined.len(), 1);
        let h = &combined.hsps()[0];
        assert_eq!((h.query.offset, h.query.end), (0, 100));
        assert_eq!((h.subject.offset, h.subject.end), (950, 1050));
        assert_eq!(h.score, 45);
    }

    #[test]
    fn test_no_merge_on_other_diagonal() {
        let mut combined = HspList::new(0, 0, Capacity::Unbounded);
        combined.save_hsp(hsp(40, (0, 60), (950, 1010)));
        let mut chunk = HspList::new(0, 0, Capacity::Unbounded);
        chunk.save_hsp(hsp(45, (10, 60), (1000, 1050)));
        combined.merge_chunk(chunk, 950, 100, true);
        assert_eq!(combined.len(), 2);
    }

    #[test]
    fn test_gapped_merge_splices_scripts() {
        let mut a = hsp(30, (0, 12), (100, 110));
        a.edit_script = Some(GapEditScript::from_ops([
            GapEditOp::Sub(4),
            GapEditOp::Ins(2),
            GapEditOp::Sub(6),
        ]));
        let mut b = hsp(28, (8, 20), (106, 118));
        b.edit_script = Some(GapEditScript::from_ops([GapEditOp::Sub(12)]));

        let mut combined = HspList::new(0, 0, Capacity::Unbounded);
        combined.save_hsp(a);
        let mut chunk = HspList::new(0, 0, Capacity::Unbounded);
        chunk.save_hsp(b);
        combined.merge_chunk(chunk, 100, 20, true);

        assert_eq!(combined.len(), 1);
        let merged = &combined.hsps()[0];
        assert_eq!((merged.query.offset, merged.query.end), (0, 20));
        assert_eq!((merged.subject.offset, merged.subject.end), (100, 118));
        let script = merged.edit_script.as_ref().unwrap();
        assert_eq!(
            script.ops(),
            &[GapEditOp::Sub(4), GapEditOp::Ins(2), GapEditOp::Sub(14)]
        );
        assert_eq!(script.extent(), (20, 18));
    }

    #[test]
    fn test_merge_respects_capacity() {
        let mut combined = HspList::new(0, 0, Capacity::AtMost(2));
        combined.save_hsp(hsp(10, (0, 5), (0, 5)));
        combined.save_hsp(hsp(20, (0, 5), (10, 15)));
        let mut chunk = HspList::new(0, 0, Capacity::Unbounded);
        chunk.save_hsp(hsp(30, (0, 5), (500, 505)));
        combined.merge_chunk(chunk, 400, 10, true);
        assert_eq!(combined.len(), 2);
        assert_eq!(combined.hsps()[0].score, 30);
        assert_eq!(combined.hsps()[1].score, 20);
    }

    #[test]
    fn test_round_down_odd_scores() {
        let mut list = HspList::new(0, 0, Capacity::Unbounded);
        list.save_hsp(hsp(7, (0, 5), (0, 5)));
        list.save_hsp(hsp(8, (0, 5), (9, 14)));
        list.round_down_odd_scores();
        assert!(list.hsps().iter().all(|h| h.score % 2 == 0));
    }
}
