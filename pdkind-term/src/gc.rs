use crate::Term;

/// Produced by [`crate::TermManager::gc`]. Maps every pre-collection
/// [`Term`] that survived collection to its post-collection handle.
///
/// Every structure the core owns that stores a `Term` (frames,
/// obligations, provenance, cex nodes — spec.md §9) must walk itself
/// through this map at the single quiescent point between outer-loop
/// iterations where GC is signaled (spec.md §4.1, §5).
pub struct RelocationMap {
    old_to_new: Vec<Option<Term>>,
}

impl RelocationMap {
    pub(crate) fn new(old_to_new: Vec<Option<Term>>) -> Self {
        RelocationMap { old_to_new }
    }

    /// Relocates `t`. Panics if `t` was not reachable from the roots
    /// passed to `gc` — callers must always pass every stored term as a
    /// root, or relocate before anything referencing it is dropped.
    pub fn get(&self, t: Term) -> Term {
        self.old_to_new
            .get(t.index())
            .and_then(|x| *x)
            .expect("term dropped by GC is still referenced")
    }
}

/// Implemented by anything the core stores that contains [`Term`]
/// references, so GC relocation can be driven generically over frames,
/// the obligation queue, provenance, and the counterexample DAG.
pub trait Relocate {
    fn relocate(&mut self, map: &RelocationMap);
}

impl Relocate for Term {
    fn relocate(&mut self, map: &RelocationMap) {
        *self = map.get(*self);
    }
}

impl<T: Relocate> Relocate for Vec<T> {
    fn relocate(&mut self, map: &RelocationMap) {
        for item in self.iter_mut() {
            item.relocate(map);
        }
    }
}

impl<T: Relocate> Relocate for Option<T> {
    fn relocate(&mut self, map: &RelocationMap) {
        if let Some(item) = self {
            item.relocate(map);
        }
    }
}
