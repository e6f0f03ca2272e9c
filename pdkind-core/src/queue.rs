//! The obligation priority queue of spec.md §4.5: a max-heap over
//! `(formula, depth, score)` with decrease/increase-key support, needed
//! for the activity-bumping heuristic ("Scoring bumps a lemma whenever it
//! is re-used to block a new counterexample").
//!
//! Grounded on the design note in spec.md §9: "a pairing or Fibonacci heap
//! with external handle map suffices; an amortized O(log n) binary heap
//! with lazy deletion is acceptable for the expected sizes." `std` has no
//! native decrease-key heap, so this uses `BinaryHeap` plus a
//! `rustc_hash`-backed handle map (the teacher's usual choice over
//! `BTreeMap` when hashing suffices) and treats superseded heap entries as
//! stale rather than removing them in place.

use pdkind_ir::Obligation;
use pdkind_term::Term;
use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// One heap entry. `version` ties it to the `Live` record current at the
/// time it was pushed; an entry whose version no longer matches its
/// formula's live record is stale and is discarded on pop.
#[derive(Clone, Copy, Debug)]
struct Entry {
    score: f64,
    depth: usize,
    formula: Term,
    version: u64,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.formula == other.formula && self.version == other.version
    }
}
impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    /// Max-heap on `score`; spec.md §4.5's "stable tie-break on (depth
    /// asc, formula id asc)" requires the smaller depth/id to pop first,
    /// so both compare *greater* here when scores tie.
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .partial_cmp(&other.score)
            .expect("obligation scores must never be NaN")
            .then_with(|| other.depth.cmp(&self.depth))
            .then_with(|| other.formula.cmp(&self.formula))
    }
}

struct Live {
    score: f64,
    depth: usize,
    attempts: usize,
    version: u64,
}

/// `spec.md` §4.5: `obligations: MaxPriorityQueue<(T, depth, score)>`
/// with handles allowing in-place score updates.
#[derive(Default)]
pub struct ObligationQueue {
    heap: BinaryHeap<Entry>,
    live: FxHashMap<Term, Live>,
}

impl ObligationQueue {
    pub fn new() -> Self {
        ObligationQueue::default()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn contains(&self, formula: Term) -> bool {
        self.live.contains_key(&formula)
    }

    /// Every formula currently queued, for GC root collection.
    pub fn formulas(&self) -> impl Iterator<Item = Term> + '_ {
        self.live.keys().copied()
    }

    /// Inserts `obl`, or — if its formula is already queued — collapses
    /// the duplicate into the existing entry, keeping the higher score
    /// and the larger attempt count (spec.md §4.5: "duplicates collapse").
    pub fn enqueue(&mut self, obl: Obligation) {
        let next_version = self.live.get(&obl.formula).map_or(0, |l| l.version + 1);
        let score = self
            .live
            .get(&obl.formula)
            .map_or(obl.score, |l| l.score.max(obl.score));
        let attempts = self
            .live
            .get(&obl.formula)
            .map_or(obl.attempts, |l| l.attempts.max(obl.attempts));
        self.live.insert(
            obl.formula,
            Live {
                score,
                depth: obl.depth,
                attempts,
                version: next_version,
            },
        );
        self.heap.push(Entry {
            score,
            depth: obl.depth,
            formula: obl.formula,
            version: next_version,
        });
    }

    /// Bumps `formula`'s score by `amount` (the VSIDS-like activity
    /// heuristic of spec.md §4.5), pushing a fresh heap entry rather than
    /// re-heapifying.
    pub fn bump_score(&mut self, formula: Term, amount: f64) {
        if let Some(live) = self.live.get_mut(&formula) {
            live.score += amount;
            live.version += 1;
            self.heap.push(Entry {
                score: live.score,
                depth: live.depth,
                formula,
                version: live.version,
            });
        }
    }

    /// `pop_obligation()`: removes and returns the highest-score
    /// obligation, skipping stale (superseded) heap entries.
    pub fn pop(&mut self) -> Option<Obligation> {
        while let Some(entry) = self.heap.pop() {
            let is_current = matches!(self.live.get(&entry.formula), Some(live) if live.version == entry.version);
            if !is_current {
                continue;
            }
            let live = self.live.remove(&entry.formula).expect("checked present above");
            let mut obl = Obligation::new(entry.formula, live.depth);
            obl.score = live.score;
            obl.attempts = live.attempts;
            return Some(obl);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::ObligationQueue;
    use pdkind_ir::Obligation;
    use pdkind_term::TermManager;

    #[test]
    fn pops_highest_score_first() {
        let mut tm = TermManager::new();
        let a = tm.mk_bool(true);
        let b = tm.mk_int(0);
        let mut q = ObligationQueue::new();
        q.enqueue(Obligation::new(a, 1).with_score(1.0));
        q.enqueue(Obligation::new(b, 1).with_score(5.0));
        assert_eq!(q.pop().unwrap().formula, b);
        assert_eq!(q.pop().unwrap().formula, a);
        assert!(q.pop().is_none());
    }

    #[test]
    fn duplicate_enqueue_collapses_and_keeps_max_score() {
        let mut tm = TermManager::new();
        let a = tm.mk_bool(true);
        let mut q = ObligationQueue::new();
        q.enqueue(Obligation::new(a, 1).with_score(1.0));
        q.enqueue(Obligation::new(a, 1).with_score(9.0));
        assert_eq!(q.len(), 1);
        let popped = q.pop().unwrap();
        assert_eq!(popped.score, 9.0);
        assert!(q.pop().is_none());
    }

    #[test]
    fn bump_score_reprioritizes() {
        let mut tm = TermManager::new();
        let a = tm.mk_bool(true);
        let b = tm.mk_int(0);
        let mut q = ObligationQueue::new();
        q.enqueue(Obligation::new(a, 1).with_score(1.0));
        q.enqueue(Obligation::new(b, 1).with_score(1.0));
        q.bump_score(a, 10.0);
        assert_eq!(q.pop().unwrap().formula, a);
    }
}
