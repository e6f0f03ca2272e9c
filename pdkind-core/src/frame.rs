//! The frame & obligation store of spec.md §4.5: an indexed sequence of
//! lemma sets with provenance, plus the obligation priority queue and its
//! "staged for the next frame" side table.
//!
//! An indexed table the outer loop owns exclusively, with `FxHashMap`-backed
//! lookups and no interior mutability — the driver is the only thing that
//! ever holds `&mut FrameStore`.

use crate::queue::ObligationQueue;
use pdkind_ir::{Obligation, Provenance};
use pdkind_term::{RelocationMap, Term};
use rustc_hash::FxHashMap;

/// `spec.md` §4.5: "frames: `[Set<T>]` indexed by level", plus the
/// provenance map, the live obligation queue, and the staging area for
/// lemmas discovered while pushing into the *next* frame.
#[derive(Default)]
pub struct FrameStore {
    frames: Vec<Vec<Term>>,
    membership: Vec<rustc_hash::FxHashSet<Term>>,
    provenance: FxHashMap<Term, Provenance>,
    obligations: ObligationQueue,
    next_obligations: Vec<Obligation>,
    current_level: usize,
}

impl FrameStore {
    pub fn new() -> Self {
        FrameStore::default()
    }

    pub fn current_level(&self) -> usize {
        self.current_level
    }

    /// The lemmas held at `level`, or an empty slice if that level has
    /// never been populated — `level` may legitimately run ahead of
    /// `frames.len()` between an `add_lemma` at `current_level + 1` and
    /// the `advance_frame()` that catches the level counter up to it.
    pub fn frame(&self, level: usize) -> &[Term] {
        self.frames.get(level).map_or(&[], Vec::as_slice)
    }

    pub fn provenance(&self, lemma: Term) -> Option<&Provenance> {
        self.provenance.get(&lemma)
    }

    pub fn frame_contains(&self, level: usize, lemma: Term) -> bool {
        self.membership.get(level).is_some_and(|set| set.contains(&lemma))
    }

    /// Every formula currently queued for pushing, for GC root collection.
    pub fn obligation_formulas(&self) -> impl Iterator<Item = Term> + '_ {
        self.obligations.formulas()
    }

    fn ensure_level(&mut self, level: usize) {
        while self.frames.len() <= level {
            self.frames.push(Vec::new());
            self.membership.push(rustc_hash::FxHashSet::default());
        }
    }

    /// `add_lemma(level, L, prov)`: idempotent — if `L` is already in
    /// `frame[level]` nothing happens (spec.md §4.5). Returns whether a
    /// new lemma was actually installed, so the driver knows whether to
    /// fire the *new-lemma* event.
    pub fn add_lemma(&mut self, level: usize, lemma: Term, prov: Provenance) -> bool {
        self.ensure_level(level);
        if self.membership[level].contains(&lemma) {
            return false;
        }
        self.membership[level].insert(lemma);
        self.frames[level].push(lemma);
        self.provenance.entry(lemma).or_insert(prov);
        true
    }

    /// Stages `obl` to be enqueued only once `advance_frame()` runs,
    /// rather than immediately — used for lemmas discovered while pushing
    /// into the *next* frame (spec.md §4.6 "stage dependent lemmas
    /// learned during the push in the next frame").
    pub fn stage_for_next_frame(&mut self, obl: Obligation) {
        self.next_obligations.push(obl);
    }

    /// `enqueue(obl)`: inserts into the live queue immediately, or bumps
    /// score on a duplicate.
    pub fn enqueue(&mut self, obl: Obligation) {
        self.obligations.enqueue(obl);
    }

    pub fn bump_score(&mut self, formula: Term, amount: f64) {
        self.obligations.bump_score(formula, amount);
    }

    /// `pop_obligation()`: removes and returns the highest-score
    /// obligation (stable tie-break on (depth asc, formula id asc),
    /// enforced by [`ObligationQueue`]'s own ordering).
    pub fn pop_obligation(&mut self) -> Option<Obligation> {
        self.obligations.pop()
    }

    pub fn queue_len(&self) -> usize {
        self.obligations.len()
    }

    pub fn queue_is_empty(&self) -> bool {
        self.obligations.is_empty()
    }

    /// `advance_frame()`: promotes every staged obligation into the live
    /// queue and increments the frame index. Returns the new level; the
    /// driver fires the *next-frame* event hook itself (spec.md §5:
    /// observers are driven by the caller, not embedded in the store).
    pub fn advance_frame(&mut self) -> usize {
        for obl in self.next_obligations.drain(..) {
            self.obligations.enqueue(obl);
        }
        self.current_level += 1;
        self.ensure_level(self.current_level);
        self.current_level
    }

    /// Whether `frame[a]` and `frame[b]` hold the same lemmas as sets —
    /// the driver's convergence check (spec.md §4.6: "if frame[k] and
    /// frame[k+1] have equal content (set equality), the property is
    /// proved").
    pub fn frames_equal(&self, a: usize, b: usize) -> bool {
        self.membership.get(a).cloned().unwrap_or_default()
            == self.membership.get(b).cloned().unwrap_or_default()
    }

    /// Every lemma term currently installed in any frame, for GC root
    /// collection.
    pub fn lemmas(&self) -> impl Iterator<Item = Term> + '_ {
        self.frames.iter().flatten().copied()
    }

    /// Every term referenced transitively by provenance records (parent
    /// and refutes links), for GC root collection.
    pub fn provenance_terms(&self) -> impl Iterator<Item = Term> + '_ {
        self.provenance
            .values()
            .flat_map(|p| p.parent.into_iter().chain(p.refutes))
    }

    pub fn staged_formulas(&self) -> impl Iterator<Item = Term> + '_ {
        self.next_obligations.iter().map(|o| o.formula)
    }

    /// Rewrites every stored `Term` through a GC relocation (frames,
    /// membership sets, provenance keys/values, the live queue, and the
    /// staged obligations alike — spec.md §9 "GC integration").
    pub fn relocate(&mut self, map: &RelocationMap) {
        for level in &mut self.frames {
            for t in level.iter_mut() {
                *t = map.get(*t);
            }
        }
        for set in &mut self.membership {
            *set = set.iter().map(|&t| map.get(t)).collect();
        }
        self.provenance = self
            .provenance
            .drain()
            .map(|(lemma, mut prov)| {
                prov.parent = prov.parent.map(|t| map.get(t));
                prov.refutes = prov.refutes.map(|t| map.get(t));
                (map.get(lemma), prov)
            })
            .collect();
        let mut queue = ObligationQueue::new();
        while let Some(mut obl) = self.obligations.pop() {
            obl.formula = map.get(obl.formula);
            queue.enqueue(obl);
        }
        self.obligations = queue;
        for obl in &mut self.next_obligations {
            obl.formula = map.get(obl.formula);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FrameStore;
    use pdkind_ir::Provenance;
    use pdkind_term::TermManager;

    #[test]
    fn add_lemma_is_idempotent() {
        let mut tm = TermManager::new();
        let l = tm.mk_bool(true);
        let mut store = FrameStore::new();
        assert!(store.add_lemma(0, l, Provenance::root()));
        assert!(!store.add_lemma(0, l, Provenance::root()));
        assert_eq!(store.frame(0), &[l]);
    }

    #[test]
    fn unallocated_frame_reads_as_empty() {
        let store = FrameStore::new();
        assert!(store.frame(7).is_empty());
    }

    #[test]
    fn advance_frame_promotes_staged_obligations() {
        use pdkind_ir::Obligation;
        let mut tm = TermManager::new();
        let f = tm.mk_bool(true);
        let mut store = FrameStore::new();
        assert!(store.queue_is_empty());
        store.stage_for_next_frame(Obligation::new(f, 1));
        assert!(store.queue_is_empty());
        let new_level = store.advance_frame();
        assert_eq!(new_level, 1);
        assert_eq!(store.queue_len(), 1);
    }

    #[test]
    fn frames_equal_compares_as_sets() {
        let mut tm = TermManager::new();
        let a = tm.mk_bool(true);
        let b = tm.mk_int(0);
        let mut store = FrameStore::new();
        store.add_lemma(0, a, Provenance::root());
        store.add_lemma(0, b, Provenance::root());
        store.add_lemma(1, b, Provenance::root());
        store.add_lemma(1, a, Provenance::root());
        assert!(store.frames_equal(0, 1));
    }
}
